use serde_json::Value as JsonValue;
use tracing::debug;

use crate::llm::types::{ChatMessage, ToolCall};
use crate::tools::{ToolError, ToolRegistry};

/// Outcome of one tool call. Failures are data, not errors: the result is
/// appended to the conversation either way so the model can react.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub call_id: Option<String>,
    pub name: String,
    pub output: String,
    pub ok: bool,
}

impl ToolResult {
    pub fn into_message(self) -> ChatMessage {
        ChatMessage::tool(self.call_id, self.output)
    }
}

/// Execute one model-issued tool call. Never returns an error; every
/// failure mode (unknown tool, malformed arguments, handler failure) is
/// folded into a failed [`ToolResult`].
pub async fn execute(registry: &ToolRegistry, call: &ToolCall) -> ToolResult {
    let name = call.function.name.clone();

    if call.r#type != "function" {
        return failed(
            call,
            name,
            ToolError::Failed(format!("unsupported tool call type: {}", call.r#type)),
        );
    }

    let raw = call.function.arguments.trim();
    let args: JsonValue = if raw.is_empty() {
        JsonValue::Object(Default::default())
    } else {
        match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return failed(call, name, ToolError::InvalidArguments(e.to_string())),
        }
    };

    let Some(tool) = registry.get(&name) else {
        return failed(call, name.clone(), ToolError::Unknown(name));
    };

    match tool.invoke(args).await {
        Ok(output) => {
            debug!(tool = %name, "tool call succeeded");
            ToolResult {
                call_id: call.id.clone(),
                name,
                output,
                ok: true,
            }
        }
        Err(e) => failed(call, name, e),
    }
}

fn failed(call: &ToolCall, name: String, err: ToolError) -> ToolResult {
    debug!(tool = %name, err = %err, "tool call failed");
    ToolResult {
        call_id: call.id.clone(),
        name,
        output: format!("error: {err}"),
        ok: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParamSpec, Tool};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct AlwaysFails;

    #[async_trait]
    impl Tool for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }
        fn description(&self) -> &'static str {
            "fails"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![]
        }
        async fn invoke(&self, _args: JsonValue) -> Result<String, ToolError> {
            Err(ToolError::Failed("boom".into()))
        }
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn description(&self) -> &'static str {
            "echoes"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            vec![]
        }
        async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: Some(format!("call_{name}")),
            r#type: "function".into(),
            function: crate::llm::types::ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(Echo));
        reg.register(Arc::new(AlwaysFails));
        reg
    }

    #[tokio::test]
    async fn unknown_tool_becomes_failed_result() {
        let reg = registry();
        let res = execute(&reg, &call("delete_all", "{}")).await;
        assert!(!res.ok);
        assert!(res.output.contains("unknown tool: delete_all"));
        assert_eq!(res.call_id.as_deref(), Some("call_delete_all"));
    }

    #[tokio::test]
    async fn handler_failure_never_propagates() {
        let reg = registry();
        let res = execute(&reg, &call("always_fails", "{}")).await;
        assert!(!res.ok);
        assert!(res.output.contains("boom"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_contained() {
        let reg = registry();
        let res = execute(&reg, &call("echo", "{not json")).await;
        assert!(!res.ok);
        assert!(res.output.contains("invalid arguments"));
    }

    #[tokio::test]
    async fn empty_arguments_default_to_empty_object() {
        let reg = registry();
        let res = execute(&reg, &call("echo", "")).await;
        assert!(res.ok);
        assert_eq!(res.output, "");
    }

    #[tokio::test]
    async fn success_carries_output_and_call_id() {
        let reg = registry();
        let res = execute(&reg, &call("echo", r#"{"text":"hi"}"#)).await;
        assert!(res.ok);
        assert_eq!(res.output, "hi");
        let msg = res.into_message();
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_echo"));
    }
}
