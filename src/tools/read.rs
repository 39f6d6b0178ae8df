use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::tools::{ParamKind, ParamSpec, Tool, ToolError, Workspace, parse_args};

pub struct ReadTool {
    workspace: Workspace,
}

impl ReadTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct ReadArgs {
    path: String,
    offset: Option<usize>,
    limit: Option<usize>,
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &'static str {
        "read"
    }

    fn description(&self) -> &'static str {
        "Read a text file and return its content with line numbers. Use offset (1-based first line) and limit (max lines) to page through large files."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("path", ParamKind::String, "File path, not a directory."),
            ParamSpec::optional("offset", ParamKind::Integer, "1-based line to start from."),
            ParamSpec::optional("limit", ParamKind::Integer, "Maximum number of lines to return."),
        ]
    }

    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: ReadArgs = parse_args(args)?;
        let path = self.workspace.resolve(&args.path)?;
        if path.is_dir() {
            return Err(ToolError::Failed(format!(
                "{} is a directory, not a file",
                args.path
            )));
        }
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::Failed(format!("read {}: {e}", path.display())))?;

        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Ok("(empty file)".to_string());
        }
        let start = args.offset.unwrap_or(1).max(1) - 1;
        let end = match args.limit {
            Some(limit) => lines.len().min(start.saturating_add(limit)),
            None => lines.len(),
        };
        if start >= lines.len() || end <= start {
            return Ok(format!(
                "(no lines: file has {} lines, offset was {})",
                lines.len(),
                start + 1
            ));
        }

        let mut out = String::new();
        for (i, line) in lines[start..end].iter().enumerate() {
            out.push_str(&format!("{:4} | {}\n", start + i + 1, line));
        }
        out.pop(); // trailing newline
        Ok(out)
    }
}
