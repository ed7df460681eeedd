//! Scripted in-process gateway for unit tests.

use super::{GatewayResponse, Method, RequestGateway};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, Value),
    Transport(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path: String,
    delay: Duration,
    reply: Reply,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Answers calls from a fixed route table; unmatched calls get a 404.
#[derive(Debug, Default)]
pub(crate) struct ScriptedGateway {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.on_delayed(method, path, Duration::ZERO, status, body)
    }

    pub fn on_delayed(
        self,
        method: Method,
        path: &str,
        delay: Duration,
        status: u16,
        body: Value,
    ) -> Self {
        self.push(method, path, delay, Reply::Status(status, body));
        self
    }

    pub fn fail(self, method: Method, path: &str) -> Self {
        self.fail_delayed(method, path, Duration::ZERO)
    }

    pub fn fail_delayed(self, method: Method, path: &str, delay: Duration) -> Self {
        self.push(
            method,
            path,
            delay,
            Reply::Transport("connection reset".into()),
        );
        self
    }

    fn push(&self, method: Method, path: &str, delay: Duration, reply: Reply) {
        self.routes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Route {
                method,
                path: path.to_string(),
                delay,
                reply,
            });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl RequestGateway for ScriptedGateway {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<GatewayResponse, GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(RecordedCall {
                method: method.clone(),
                path: path.to_string(),
                body,
            });

        let route = self
            .routes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .find(|r| r.method == method && r.path == path)
            .cloned();

        let Some(route) = route else {
            return Ok(GatewayResponse::new(404, Value::Null));
        };

        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }

        match route.reply {
            Reply::Status(status, body) => Ok(GatewayResponse::new(status, body)),
            Reply::Transport(message) => Err(GatewayError::Transport(message)),
        }
    }
}
