mod client;
pub mod types;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

pub use client::OpenAIClient;
pub use types::*;

/// How the model is allowed to use the tool schema on a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Disabled,
}

impl ToolChoice {
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            ToolChoice::Auto => serde_json::Value::String("auto".into()),
            ToolChoice::Disabled => serde_json::Value::String("none".into()),
        }
    }
}

/// One chat-completion round trip. The orchestrator depends only on this
/// signature; transport, auth and retries live behind it.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        tool_choice: ToolChoice,
        cancel: &CancellationToken,
    ) -> Result<AssistantMessage, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmErrorKind {
    RateLimited,
    Server,
    Network,
    Timeout,
    Client,
    Deserialize,
    Unknown,
}

pub fn classify_error(status: Option<StatusCode>, err: &anyhow::Error) -> LlmErrorKind {
    if let Some(st) = status {
        if st == StatusCode::TOO_MANY_REQUESTS {
            return LlmErrorKind::RateLimited;
        }
        if st.is_server_error() {
            return LlmErrorKind::Server;
        }
        if st.is_client_error() {
            return LlmErrorKind::Client;
        }
    }
    if let Some(e) = err.downcast_ref::<reqwest::Error>() {
        if e.is_timeout() {
            return LlmErrorKind::Timeout;
        }
        if e.is_connect() || e.is_body() || e.is_request() {
            return LlmErrorKind::Network;
        }
    }
    LlmErrorKind::Unknown
}

pub(crate) fn should_retry(kind: &LlmErrorKind) -> bool {
    matches!(
        kind,
        LlmErrorKind::RateLimited
            | LlmErrorKind::Server
            | LlmErrorKind::Network
            | LlmErrorKind::Timeout
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_status() {
        let e = anyhow::anyhow!("x");
        assert_eq!(
            classify_error(Some(StatusCode::TOO_MANY_REQUESTS), &e),
            LlmErrorKind::RateLimited
        );
        assert_eq!(
            classify_error(Some(StatusCode::BAD_GATEWAY), &e),
            LlmErrorKind::Server
        );
        assert_eq!(
            classify_error(Some(StatusCode::BAD_REQUEST), &e),
            LlmErrorKind::Client
        );
    }

    #[test]
    fn retry_policy_covers_transients_only() {
        assert!(should_retry(&LlmErrorKind::RateLimited));
        assert!(should_retry(&LlmErrorKind::Server));
        assert!(should_retry(&LlmErrorKind::Network));
        assert!(should_retry(&LlmErrorKind::Timeout));
        assert!(!should_retry(&LlmErrorKind::Client));
        assert!(!should_retry(&LlmErrorKind::Deserialize));
        assert!(!should_retry(&LlmErrorKind::Unknown));
    }

    #[test]
    fn tool_choice_wire_values() {
        assert_eq!(ToolChoice::Auto.as_json(), serde_json::json!("auto"));
        assert_eq!(ToolChoice::Disabled.as_json(), serde_json::json!("none"));
    }
}
