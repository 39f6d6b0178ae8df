use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::tools::{ParamKind, ParamSpec, Tool, ToolError, Workspace, parse_args};

pub struct EditTool {
    workspace: Workspace,
}

impl EditTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct EditArgs {
    path: String,
    old: String,
    new: String,
    #[serde(default)]
    all: bool,
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &'static str {
        "edit"
    }

    fn description(&self) -> &'static str {
        "Replace old with new in a file. old must match exactly once; pass all=true to replace every occurrence, or include more surrounding context to make it unique."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("path", ParamKind::String, "File path to edit."),
            ParamSpec::required("old", ParamKind::String, "Exact text to replace."),
            ParamSpec::required("new", ParamKind::String, "Replacement text."),
            ParamSpec::optional("all", ParamKind::Boolean, "Replace every occurrence."),
        ]
    }

    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: EditArgs = parse_args(args)?;
        let path = self.workspace.resolve(&args.path)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::Failed(format!("read {}: {e}", path.display())))?;

        let occurrences = content.matches(&args.old).count();
        if occurrences == 0 {
            return Err(ToolError::Failed(format!(
                "old text not found in {}",
                args.path
            )));
        }
        if occurrences > 1 && !args.all {
            return Err(ToolError::Failed(format!(
                "old text matches {occurrences} times in {}; pass all=true or make it unique",
                args.path
            )));
        }

        let (replaced, count) = if args.all {
            (content.replace(&args.old, &args.new), occurrences)
        } else {
            (content.replacen(&args.old, &args.new, 1), 1)
        };
        tokio::fs::write(&path, replaced)
            .await
            .map_err(|e| ToolError::Failed(format!("write {}: {e}", path.display())))?;

        Ok(format!("replaced {count} occurrence(s) in {}", args.path))
    }
}
