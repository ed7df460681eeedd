use crate::config::Config;
use reqwest::Client;
use std::time::Duration;

pub fn build_gateway_client(config: &Config) -> Client {
    build_gateway_client_with_timeouts(config.request_timeout_secs, config.connect_timeout_secs)
}

pub fn build_gateway_client_with_timeouts(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}
