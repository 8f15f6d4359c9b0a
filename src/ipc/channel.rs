//! Request/response bridge to the host application
//!
//! The host reaches the sensors through named channels. Each call carries a
//! method name and an optional payload and gets exactly one response back.
//! The transport carrying these values is not part of this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A method invocation from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: None,
        }
    }

    pub fn with_arguments(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments: Some(arguments),
        }
    }
}

/// Response sent back to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { value: Value },
    Error { code: String, message: String },
    /// Sentinel for methods and channels that do nothing
    NotImplemented,
}

impl MethodResponse {
    pub fn success(value: impl Into<Value>) -> Self {
        MethodResponse::Success {
            value: value.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A named channel answering method calls
#[async_trait]
pub trait MethodChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, call: MethodCall) -> MethodResponse;
}

/// Routes host calls to registered channels
#[derive(Default, Clone)]
pub struct Bridge {
    channels: HashMap<String, Arc<dyn MethodChannel>>,
}

impl Bridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, replacing any channel with the same name
    pub fn register<C: MethodChannel + 'static>(&mut self, channel: C) -> &mut Self {
        let name = channel.name().to_string();
        if self.channels.insert(name.clone(), Arc::new(channel)).is_some() {
            tracing::warn!("Channel {} replaced", name);
        }
        self
    }

    /// Names of the registered channels, sorted
    pub fn channel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch one call
    ///
    /// Unknown channels answer `NotImplemented` like unknown methods do.
    pub async fn invoke(&self, channel: &str, call: MethodCall) -> MethodResponse {
        match self.channels.get(channel) {
            Some(handler) => {
                tracing::debug!("{}::{}", channel, call.method);
                handler.handle(call).await
            }
            None => {
                tracing::debug!("No channel named {}", channel);
                MethodResponse::NotImplemented
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoChannel;

    #[async_trait]
    impl MethodChannel for EchoChannel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, call: MethodCall) -> MethodResponse {
            match call.method.as_str() {
                "echo" => MethodResponse::success(call.arguments.unwrap_or(Value::Null)),
                _ => MethodResponse::NotImplemented,
            }
        }
    }

    #[tokio::test]
    async fn routes_to_named_channel() {
        let mut bridge = Bridge::new();
        bridge.register(EchoChannel);

        let response = bridge
            .invoke("echo", MethodCall::with_arguments("echo", json!({"a": 1})))
            .await;

        assert_eq!(response, MethodResponse::success(json!({"a": 1})));
    }

    #[tokio::test]
    async fn unknown_channel_is_not_implemented() {
        let bridge = Bridge::new();
        let response = bridge.invoke("gyroscope", MethodCall::new("read")).await;
        assert_eq!(response, MethodResponse::NotImplemented);
    }

    #[test]
    fn response_wire_format() {
        assert_eq!(
            serde_json::to_value(MethodResponse::success(-40.0)).unwrap(),
            json!({"status": "success", "value": -40.0})
        );
        assert_eq!(
            serde_json::to_value(MethodResponse::NotImplemented).unwrap(),
            json!({"status": "not_implemented"})
        );
    }

    #[test]
    fn call_without_payload_parses() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"getNoiseLevel"}"#).unwrap();
        assert_eq!(call, MethodCall::new("getNoiseLevel"));
    }
}
