//! Authenticated request gateway for the feed backend.
//!
//! Every network call the engine makes goes through [`RequestGateway`]. The
//! HTTP implementation reads the bearer credential from the shared
//! [`SessionHandle`](crate::auth::SessionHandle) at call time, so a demo or
//! anonymous session never sends an `Authorization` header.

pub mod http;
pub mod http_client;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpGateway;
pub use http_client::build_gateway_client;
pub use reqwest::Method;

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Status and decoded body of a backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_value(self.body.clone()).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Turn a non-2xx response into [`GatewayError::Status`].
    pub fn into_result(self) -> Result<Self, GatewayError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GatewayError::Status {
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }
}

#[async_trait]
pub trait RequestGateway: Send + Sync {
    /// Perform one call against the backend. `path` is relative to the API root
    /// and must start with `/`.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<GatewayResponse, GatewayError>;

    async fn get(&self, path: &str) -> Result<GatewayResponse, GatewayError> {
        self.call(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<GatewayResponse, GatewayError> {
        self.call(Method::POST, path, body).await
    }
}

/// Build a `/search?query=...` style path with the value form-encoded.
pub fn path_with_query(path: &str, key: &str, value: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{path}?{query}")
}
