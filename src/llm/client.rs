use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::LlmConfig;
use crate::llm::types::{AssistantMessage, ChatMessage, ChatRequest, ChatResponse, ToolDef};
use crate::llm::{ChatBackend, LlmError, LlmErrorKind, ToolChoice, classify_error, should_retry};

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    inner: reqwest::Client,
    llm_cfg: LlmConfig,
}

impl OpenAIClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let inner = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            inner,
            llm_cfg: LlmConfig::default(),
        })
    }

    pub fn with_llm_config(mut self, cfg: LlmConfig) -> Self {
        // Rebuild the reqwest client so the configured timeouts actually apply.
        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms));
        if let Ok(c) = builder.build() {
            self.inner = c;
        }
        self.llm_cfg = cfg;
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let mut base = self.base_url.trim_end_matches('/').to_string();
        if let Some(pos) = base.rfind("/v1") {
            base.truncate(pos);
            base = base.trim_end_matches('/').to_string();
        }
        format!("{base}/v1/chat/completions")
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse()?);
        headers.insert(AUTHORIZATION, format!("Bearer {}", self.api_key).parse()?);
        Ok(headers)
    }

    fn backoff_delay(&self, attempt: usize, retry_after_secs: Option<u64>) -> Duration {
        if self.llm_cfg.respect_retry_after
            && let Some(secs) = retry_after_secs
        {
            return Duration::from_secs(secs);
        }
        let base = self.llm_cfg.retry_base_ms;
        let exp = base.saturating_mul(1u64 << (attempt as u32 - 1));
        let jitter = self.llm_cfg.retry_jitter_ms as i64;
        let half = jitter / 2;
        let rnd = fastrand::i64(-half..=half).max(0) as u64;
        Duration::from_millis(exp.saturating_add(rnd))
    }

    async fn sleep_or_cancel(
        &self,
        wait: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), LlmError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LlmError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    async fn send_once(
        &self,
        req: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<AssistantMessage, SendFailure> {
        let url = self.endpoint();
        let headers = self
            .headers()
            .map_err(|e| SendFailure::Fatal(e.context("build request headers")))?;

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SendFailure::Cancelled),
            res = self.inner.post(&url).headers(headers).json(req).send() => {
                res.map_err(|e| {
                    let err = anyhow::Error::new(e).context("send chat request");
                    let kind = classify_error(None, &err);
                    SendFailure::Transient { err, kind, retry_after: None }
                })?
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SendFailure::Cancelled),
                res = resp.text() => res.unwrap_or_default(),
            };
            error!(status = %status.as_u16(), body = %body, "chat completion non-success status");
            let err = anyhow!("chat error: {status} - {body}");
            let kind = classify_error(Some(status), &err);
            return Err(SendFailure::Transient {
                err,
                kind,
                retry_after,
            });
        }

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SendFailure::Cancelled),
            res = resp.text() => res.map_err(|e| {
                let err = anyhow::Error::new(e).context("read chat response body");
                let kind = classify_error(None, &err);
                SendFailure::Transient { err, kind, retry_after: None }
            })?,
        };

        let body: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            error!(err = %e, "chat completion deserialize error");
            SendFailure::Transient {
                err: anyhow::Error::new(e).context("parse chat response"),
                kind: LlmErrorKind::Deserialize,
                retry_after: None,
            }
        })?;

        if let Some(usage) = &body.usage {
            debug!(
                prompt = usage.prompt_tokens,
                completion = usage.completion_tokens,
                total = usage.total_tokens,
                "token usage"
            );
        }

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| SendFailure::Fatal(anyhow!("no choices returned")))
    }
}

enum SendFailure {
    Cancelled,
    Transient {
        err: anyhow::Error,
        kind: LlmErrorKind,
        retry_after: Option<u64>,
    },
    Fatal(anyhow::Error),
}

#[async_trait::async_trait]
impl ChatBackend for OpenAIClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDef],
        tool_choice: ToolChoice,
        cancel: &CancellationToken,
    ) -> Result<AssistantMessage, LlmError> {
        let req = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: None,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.to_vec())
            },
            tool_choice: if tools.is_empty() {
                None
            } else {
                Some(tool_choice.as_json())
            },
        };
        if let Ok(payload) = serde_json::to_string(&req) {
            debug!(endpoint = %self.endpoint(), payload = %payload, "sending chat.completions payload");
        }

        let max_attempts = self.llm_cfg.max_retries.saturating_add(1);
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 1..=max_attempts {
            match self.send_once(&req, cancel).await {
                Ok(msg) => return Ok(msg),
                Err(SendFailure::Cancelled) => {
                    info!("chat completion cancelled");
                    return Err(LlmError::Cancelled);
                }
                Err(SendFailure::Fatal(err)) => return Err(LlmError::Transport(err)),
                Err(SendFailure::Transient {
                    err,
                    kind,
                    retry_after,
                }) => {
                    if should_retry(&kind) && attempt < max_attempts {
                        let wait = self.backoff_delay(attempt, retry_after);
                        warn!(attempt, kind = ?kind, wait_ms = %wait.as_millis(), "retrying chat completion");
                        self.sleep_or_cancel(wait, cancel).await?;
                        last_err = Some(err);
                        continue;
                    }
                    return Err(LlmError::Transport(err));
                }
            }
        }

        Err(LlmError::Transport(
            last_err.unwrap_or_else(|| anyhow!("chat completion failed")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{Expectation, Server, matchers::*, responders::*};

    fn test_client(server: &Server) -> OpenAIClient {
        OpenAIClient::new(server.url_str(""), "test-key", "gpt-test")
            .unwrap()
            .with_llm_config(LlmConfig {
                connect_timeout_ms: 5_000,
                request_timeout_ms: 5_000,
                max_retries: 1,
                retry_base_ms: 1,
                retry_jitter_ms: 0,
                respect_retry_after: false,
            })
    }

    #[tokio::test]
    async fn complete_happy_path() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v1/chat/completions"),
                request::headers(contains(key("authorization"))),
            ])
            .respond_with(json_encoded(serde_json::json!({
                "id": "test",
                "choices": [
                    {"index":0, "message": {"role":"assistant","content":"hello"}}
                ]
            }))),
        );

        let client = test_client(&server);
        let msg = client
            .complete(
                &[ChatMessage::user("hi")],
                &[],
                ToolChoice::Auto,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(msg.content.as_deref(), Some("hello"));
        assert!(msg.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn complete_retries_transient_server_errors() {
        let server = Server::run();
        // The server verifies on drop that exactly two requests arrived:
        // the original attempt plus one retry.
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .times(2)
                .respond_with(status_code(500).body("oops")),
        );

        let client = test_client(&server);
        let err = client
            .complete(
                &[ChatMessage::user("hi")],
                &[],
                ToolChoice::Auto,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("500"));
    }

    #[tokio::test]
    async fn complete_does_not_retry_on_400() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/v1/chat/completions"))
                .times(1)
                .respond_with(status_code(400).body("bad request")),
        );

        let client = test_client(&server);
        let err = client
            .complete(
                &[ChatMessage::user("hi")],
                &[],
                ToolChoice::Auto,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("400"));
    }

    #[tokio::test]
    async fn complete_reports_cancellation() {
        let server = Server::run();
        let client = test_client(&server);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .complete(&[ChatMessage::user("hi")], &[], ToolChoice::Auto, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }

    #[test]
    fn endpoint_normalization() {
        let c = OpenAIClient::new("https://api.example.com/v1/", "x", "m").unwrap();
        assert_eq!(c.endpoint(), "https://api.example.com/v1/chat/completions");
        let c2 = OpenAIClient::new("https://api.example.com/", "x", "m").unwrap();
        assert_eq!(c2.endpoint(), "https://api.example.com/v1/chat/completions");
    }
}
