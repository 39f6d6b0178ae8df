use std::sync::Arc;
use std::sync::mpsc::Sender;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::agent::turn::TurnRunner;
use crate::llm::types::{ChatMessage, ToolDef};
use crate::llm::{ChatBackend, LlmError};
use crate::tools::ToolRegistry;

const SYSTEM_PROMPT: &str = "You are a helpful coding assistant working in the user's workspace. \
You can use these tools:\n\
- read: read a file with line numbers\n\
- write: write content to a file\n\
- edit: replace text in a file\n\
- glob: find files by name pattern\n\
- grep: search file contents with a regex\n\
- bash: run a shell command\n\
Pick the right tool for the request and work step by step when several are needed. \
Answer in plain text when you are done.";

/// One conversation. Owns the transcript replayed to the API on every call;
/// everything else (tools, backend) is shared and immutable.
pub struct Session {
    history: Vec<ChatMessage>,
    preamble_len: usize,
    registry: Arc<ToolRegistry>,
    schema: Vec<ToolDef>,
    budget: usize,
}

impl Session {
    pub fn new(registry: Arc<ToolRegistry>, memory: Option<String>, budget: usize) -> Self {
        let mut history = vec![ChatMessage::system(SYSTEM_PROMPT)];
        if let Some(memory) = memory {
            history.push(ChatMessage::system(memory));
        }
        let preamble_len = history.len();
        let schema = registry.schema();
        Self {
            history,
            preamble_len,
            registry,
            schema,
            budget,
        }
    }

    /// Run one user turn to completion. On failure (transport error or
    /// cancellation) the history is rolled back to where the turn started,
    /// so retrying the same input is safe.
    pub async fn turn(
        &mut self,
        backend: &dyn ChatBackend,
        user_text: &str,
        cancel: &CancellationToken,
        progress: Option<Sender<String>>,
    ) -> Result<String, LlmError> {
        let mark = self.history.len();
        self.history.push(ChatMessage::user(user_text));

        let runner = TurnRunner {
            backend,
            registry: self.registry.as_ref(),
            schema: &self.schema,
            budget: self.budget,
            progress,
        };
        match runner.run(&mut self.history, cancel).await {
            Ok(text) => {
                debug!(messages = self.history.len(), "turn completed");
                Ok(text)
            }
            Err(e) => {
                self.history.truncate(mark);
                Err(e)
            }
        }
    }

    /// Drop everything after the initial preamble.
    pub fn reset(&mut self) {
        self.history.truncate(self.preamble_len);
        info!("conversation history cleared");
    }

    /// Read-only tool listing for the /tools command.
    pub fn describe_tools(&self) -> String {
        let mut out = String::new();
        for tool in self.registry.iter() {
            out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            for p in tool.parameters() {
                let req = if p.required { "" } else { " (optional)" };
                out.push_str(&format!("    {}{req}: {}\n", p.name, p.description));
            }
        }
        out.pop();
        out
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn preamble_len(&self) -> usize {
        self.preamble_len
    }
}
