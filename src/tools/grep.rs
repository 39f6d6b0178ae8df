use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::tools::common::walk_files;
use crate::tools::{ParamKind, ParamSpec, Tool, ToolError, Workspace, parse_args};

const MAX_MATCHES: usize = 50;

pub struct GrepTool {
    workspace: Workspace,
}

impl GrepTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct GrepArgs {
    pattern: String,
    path: Option<String>,
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Search file contents for a regular expression. Returns matching lines as path:line: text, capped at 50 matches."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pattern", ParamKind::String, "Regular expression to search for."),
            ParamSpec::optional("path", ParamKind::String, "File or directory to search; defaults to the workspace root."),
        ]
    }

    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: GrepArgs = parse_args(args)?;
        let re = regex::Regex::new(&args.pattern)
            .map_err(|e| ToolError::Failed(format!("bad regex: {e}")))?;
        let base = self.workspace.resolve(args.path.as_deref().unwrap_or("."))?;

        let files = if base.is_file() {
            vec![base.clone()]
        } else {
            walk_files(&base)
        };

        let root = self.workspace.root().to_path_buf();
        let mut hits = Vec::new();
        let mut truncated = false;
        'files: for file in files {
            // Binary or otherwise unreadable files are skipped, not errors.
            let Ok(text) = std::fs::read_to_string(&file) else {
                continue;
            };
            let rel = file.strip_prefix(&root).unwrap_or(&file);
            for (no, line) in text.lines().enumerate() {
                if re.is_match(line) {
                    hits.push(format!("{}:{}: {}", rel.display(), no + 1, line));
                    if hits.len() >= MAX_MATCHES {
                        truncated = true;
                        break 'files;
                    }
                }
            }
        }

        if hits.is_empty() {
            return Ok("(no matches)".to_string());
        }
        let mut out = hits.join("\n");
        if truncated {
            out.push_str(&format!("\n(truncated at {MAX_MATCHES} matches)"));
        }
        Ok(out)
    }
}
