use std::sync::mpsc::Sender;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::dispatch;
use crate::llm::types::{AssistantMessage, ChatMessage, ToolDef};
use crate::llm::{ChatBackend, LlmError, ToolChoice};
use crate::tools::ToolRegistry;

const PREVIEW_CHARS: usize = 500;

/// What the model decided to do with one completion round.
#[derive(Debug, Clone)]
pub enum AssistantTurn {
    Answer(String),
    ToolCalls {
        content: Option<String>,
        calls: Vec<crate::llm::types::ToolCall>,
    },
}

impl AssistantTurn {
    pub fn from_message(msg: AssistantMessage) -> Self {
        if msg.tool_calls.is_empty() {
            AssistantTurn::Answer(msg.content.unwrap_or_default())
        } else {
            AssistantTurn::ToolCalls {
                content: msg.content,
                calls: msg.tool_calls,
            }
        }
    }
}

/// Resolves one user turn: call the model, dispatch any requested tools,
/// feed the results back, repeat until the model answers in plain text or
/// the iteration budget runs out.
pub struct TurnRunner<'a> {
    pub backend: &'a dyn ChatBackend,
    pub registry: &'a ToolRegistry,
    pub schema: &'a [ToolDef],
    pub budget: usize,
    pub progress: Option<Sender<String>>,
}

impl TurnRunner<'_> {
    /// Appends every message this turn produces to `history` and returns the
    /// final answer text. On `Err` the caller is expected to roll `history`
    /// back to where the turn started.
    pub async fn run(
        &self,
        history: &mut Vec<ChatMessage>,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let mut last_content: Option<String> = None;

        for iteration in 1..=self.budget {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
            let msg = self
                .backend
                .complete(history, self.schema, ToolChoice::Auto, cancel)
                .await?;

            match AssistantTurn::from_message(msg) {
                AssistantTurn::Answer(text) => {
                    history.push(ChatMessage::assistant(text.clone()));
                    return Ok(text);
                }
                AssistantTurn::ToolCalls { content, calls } => {
                    debug!(iteration, calls = calls.len(), "dispatching tool calls");
                    if let Some(text) = &content
                        && !text.is_empty()
                    {
                        self.emit(text.clone());
                        last_content = Some(text.clone());
                    }
                    history.push(ChatMessage::assistant_with_calls(content, calls.clone()));
                    // Sequential on purpose: a later call may depend on an
                    // earlier one's side effects.
                    for call in &calls {
                        if cancel.is_cancelled() {
                            return Err(LlmError::Cancelled);
                        }
                        self.emit(format!(
                            "[tool] {}({})",
                            call.function.name,
                            preview(&call.function.arguments)
                        ));
                        let result = dispatch::execute(self.registry, call).await;
                        self.emit(format!(
                            "[tool] -> {}",
                            preview(&result.output)
                        ));
                        history.push(result.into_message());
                    }
                }
            }
        }

        // Budget exhausted while the model still wants tools: one last call
        // with tool use disabled so the turn ends with an answer.
        warn!(
            budget = self.budget,
            "tool iteration budget exhausted; requesting a final answer without tools"
        );
        match self
            .backend
            .complete(history, self.schema, ToolChoice::Disabled, cancel)
            .await
        {
            Ok(msg) => {
                let text = msg.content.unwrap_or_default();
                history.push(ChatMessage::assistant(text.clone()));
                Ok(text)
            }
            Err(LlmError::Cancelled) => Err(LlmError::Cancelled),
            Err(LlmError::Transport(err)) => {
                warn!(err = %err, "no-tools final call failed; returning best-effort answer");
                Ok(last_content.unwrap_or_else(|| {
                    "tool iteration budget exhausted before the request could be completed"
                        .to_string()
                }))
            }
        }
    }

    fn emit(&self, line: String) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(line);
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
