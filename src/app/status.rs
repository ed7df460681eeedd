use glitchary::Config;

pub fn render_status(config: &Config) -> String {
    let credential = match (&config.actor_id, &config.credential) {
        (Some(actor), Some(_)) => format!("actor {actor} (credential set)"),
        (Some(actor), None) => format!("actor {actor} (no credential)"),
        (None, Some(_)) => "credential set, no actor id".to_string(),
        (None, None) => "none".to_string(),
    };

    let lines = [
        "◆ Glitchary status".to_string(),
        String::new(),
        format!("version     {}", env!("CARGO_PKG_VERSION")),
        format!("config      {}", config.config_path.display()),
        format!("api         {}", config.api_base_url),
        format!(
            "timeouts    request {}s, connect {}s",
            config.request_timeout_secs, config.connect_timeout_secs
        ),
        format!("debounce    {}ms", config.search.debounce_ms),
        format!("session     {credential}"),
        format!("demo actor  {} ({})", config.demo.username, config.demo.actor_id),
        format!("log level   {}", config.log_level),
    ];
    lines.join("\n")
}
