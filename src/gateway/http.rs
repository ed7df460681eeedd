use super::{GatewayResponse, Method, RequestGateway, build_gateway_client};
use crate::auth::SessionHandle;
use crate::config::Config;
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;

/// [`RequestGateway`] over HTTP.
///
/// The credential is read from the session snapshot on every call rather than
/// cached, so sign-out and demo entry take effect for the very next request.
pub struct HttpGateway {
    base_url: String,
    session: SessionHandle,
    client: Client,
}

impl HttpGateway {
    pub fn new(base_url: &str, session: SessionHandle) -> Self {
        Self::with_client(base_url, session, Client::new())
    }

    pub fn from_config(config: &Config, session: SessionHandle) -> Self {
        Self::with_client(&config.api_base_url, session, build_gateway_client(config))
    }

    pub fn with_client(base_url: &str, session: SessionHandle, client: Client) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            session,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<String, GatewayError> {
        if !path.starts_with('/') {
            return Err(GatewayError::InvalidPath(path.to_string()));
        }
        Ok(format!("{}{path}", self.base_url))
    }
}

fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

#[async_trait]
impl RequestGateway for HttpGateway {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.url_for(path)?;
        let mut request = self.client.request(method.clone(), &url);

        if let Some(credential) = self.session.credential() {
            request = request.bearer_auth(credential);
        }

        match body {
            Some(body) if carries_body(&method) => {
                let payload =
                    serde_json::to_vec(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
                request = request
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(payload);
            }
            Some(_) => {
                tracing::debug!(%method, path, "dropping request body on read method");
            }
            None => {}
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::debug!(%method, path, status, "gateway call completed");
        Ok(GatewayResponse { status, body })
    }
}
