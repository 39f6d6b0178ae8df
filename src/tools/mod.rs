mod bash;
mod common;
mod edit;
mod glob;
mod grep;
mod read;
mod write;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue, json};

use crate::llm::types::{ToolDef, ToolFunctionDef};

pub use common::Workspace;

/// Tool-level failures. All of these end up as failed tool results fed back
/// to the model; none of them abort a turn.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        ToolError::Failed(format!("{err:#}"))
    }
}

pub(crate) fn parse_args<T: serde::de::DeserializeOwned>(args: JsonValue) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }
}

/// Capability interface implemented by every tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Vec<ParamSpec>;
    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError>;
}

/// Ordered collection of tools. Immutable once built; lookups never panic.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// All six built-in tools, operating inside `workspace`.
    pub fn builtin(workspace: Workspace, bash_timeout: Duration) -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(read::ReadTool::new(workspace.clone())));
        reg.register(Arc::new(write::WriteTool::new(workspace.clone())));
        reg.register(Arc::new(edit::EditTool::new(workspace.clone())));
        reg.register(Arc::new(glob::GlobTool::new(workspace.clone())));
        reg.register(Arc::new(grep::GrepTool::new(workspace.clone())));
        reg.register(Arc::new(bash::BashTool::new(workspace, bash_timeout)));
        reg
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        if self.by_name.contains_key(name) {
            // Last registration wins so embedders can shadow a builtin.
            let idx = self.by_name[name];
            self.tools[idx] = tool;
            return;
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.by_name.get(name).map(|&i| self.tools[i].as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the registry as the function-calling schema the completion
    /// API expects. Tool order equals registration order.
    pub fn schema(&self) -> Vec<ToolDef> {
        self.iter()
            .map(|tool| {
                let mut properties = JsonMap::new();
                let mut required = Vec::new();
                for p in tool.parameters() {
                    properties.insert(
                        p.name.to_string(),
                        json!({"type": p.kind.json_type(), "description": p.description}),
                    );
                    if p.required {
                        required.push(p.name);
                    }
                }
                ToolDef {
                    kind: "function".to_string(),
                    function: ToolFunctionDef {
                        name: tool.name().to_string(),
                        description: tool.description().to_string(),
                        parameters: json!({
                            "type": "object",
                            "properties": properties,
                            "required": required,
                        }),
                    },
                }
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn builtin_registry() -> (tempfile::TempDir, ToolRegistry) {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf()).unwrap();
        let reg = ToolRegistry::builtin(ws, Duration::from_secs(60));
        (dir, reg)
    }

    #[test]
    fn builtin_has_six_tools_in_registration_order() {
        let (_dir, reg) = builtin_registry();
        let names: Vec<&str> = reg.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["read", "write", "edit", "glob", "grep", "bash"]);
    }

    #[test]
    fn get_unknown_tool_is_none() {
        let (_dir, reg) = builtin_registry();
        assert!(reg.get("delete_all").is_none());
        assert!(reg.get("read").is_some());
    }

    #[test]
    fn schema_is_deterministic_and_ordered() {
        let (_dir, reg) = builtin_registry();
        let a = serde_json::to_string(&reg.schema()).unwrap();
        let b = serde_json::to_string(&reg.schema()).unwrap();
        assert_eq!(a, b);

        let defs = reg.schema();
        assert_eq!(defs.len(), reg.len());
        for (def, tool) in defs.iter().zip(reg.iter()) {
            assert_eq!(def.kind, "function");
            assert_eq!(def.function.name, tool.name());
        }
    }

    #[test]
    fn schema_lists_required_params() {
        let (_dir, reg) = builtin_registry();
        let defs = reg.schema();
        let read = &defs[0].function.parameters;
        assert_eq!(read["type"], "object");
        assert_eq!(read["required"], serde_json::json!(["path"]));
        assert_eq!(read["properties"]["offset"]["type"], "integer");

        let edit = &defs[2].function.parameters;
        assert_eq!(edit["required"], serde_json::json!(["path", "old", "new"]));
        assert_eq!(edit["properties"]["all"]["type"], "boolean");
    }
}
