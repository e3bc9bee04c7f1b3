//! Tool capability contract shared by every memory backend.
//!
//! Backends are reachable only through two operations: capability discovery
//! and invocation by name with structured arguments. How a concrete
//! deployment launches or supervises the backend is outside this contract.

use crate::error::TwinResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A discovered operation on a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Operation name, unique within its backend.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the operation's arguments.
    #[serde(default = "default_schema")]
    pub input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object"})
}

/// The common result shape every backend response is translated into:
/// a success payload or an error payload. Transport failures, timeouts,
/// and backend-reported errors all surface as `Failure` so callers see
/// one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    /// The operation succeeded.
    Success {
        /// The operation's result payload.
        payload: serde_json::Value,
    },
    /// The operation failed.
    Failure {
        /// Backend- or transport-reported reason.
        message: String,
    },
}

impl ToolResponse {
    /// Build a success response.
    pub fn ok(payload: serde_json::Value) -> Self {
        Self::Success { payload }
    }

    /// Build a failure response.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The payload rendered as text, for responses that carry prose.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Success { payload } => Some(
                payload
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string()),
            ),
            Self::Failure { .. } => None,
        }
    }

    /// The failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failure { message } => Some(message),
            Self::Success { .. } => None,
        }
    }
}

/// A memory backend reachable through discovery and invocation.
///
/// One request/response exchange per call; implementations hold whatever
/// session state the exchange needs. No retries happen at this layer.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// The adapter name this backend is registered under.
    fn name(&self) -> &str;

    /// List the operations this backend exposes.
    async fn capabilities(&self) -> TwinResult<Vec<ToolDescriptor>>;

    /// Invoke an operation by name with structured arguments.
    async fn invoke(&self, op: &str, args: serde_json::Value) -> TwinResult<ToolResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_response_text_extraction() {
        let ok = ToolResponse::ok(serde_json::json!("Recorded question with no answer"));
        assert!(ok.is_success());
        assert_eq!(ok.text().unwrap(), "Recorded question with no answer");

        let structured = ToolResponse::ok(serde_json::json!({"count": 2}));
        assert_eq!(structured.text().unwrap(), r#"{"count":2}"#);

        let err = ToolResponse::fail("backend unreachable");
        assert!(!err.is_success());
        assert!(err.text().is_none());
        assert_eq!(err.error_message(), Some("backend unreachable"));
    }

    #[test]
    fn tool_descriptor_defaults_schema() {
        let json = r#"{"name": "find", "description": "Semantic search"}"#;
        let descriptor: ToolDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.input_schema["type"], "object");
    }
}
