use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::tools::common::walk_files;
use crate::tools::{ParamKind, ParamSpec, Tool, ToolError, Workspace, parse_args};

const MAX_RESULTS: usize = 500;

pub struct GlobTool {
    workspace: Workspace,
}

impl GlobTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct GlobArgs {
    pattern: String,
    path: Option<String>,
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &'static str {
        "glob"
    }

    fn description(&self) -> &'static str {
        "Find files whose name matches a glob pattern (e.g. *.md, src/**/*.rs), newest first by modification time."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pattern", ParamKind::String, "Glob pattern to match."),
            ParamSpec::optional("path", ParamKind::String, "Directory to search from; defaults to the workspace root."),
        ]
    }

    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: GlobArgs = parse_args(args)?;
        let base = self.workspace.resolve(args.path.as_deref().unwrap_or("."))?;
        if !base.is_dir() {
            return Err(ToolError::Failed(format!(
                "search path is not a directory: {}",
                base.display()
            )));
        }
        let pattern = glob::Pattern::new(&args.pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("bad glob pattern: {e}")))?;
        // A pattern with a separator matches the relative path; a bare one
        // matches the file name, like the classic fnmatch behavior.
        let match_full_path = args.pattern.contains('/');

        let mut matches: Vec<(String, SystemTime)> = Vec::new();
        for file in walk_files(&base) {
            let rel = file.strip_prefix(&base).unwrap_or(&file);
            let candidate = if match_full_path {
                rel.to_string_lossy().to_string()
            } else {
                file.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default()
            };
            if pattern.matches(&candidate) {
                let mtime = file
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                matches.push((rel.to_string_lossy().to_string(), mtime));
            }
        }

        if matches.is_empty() {
            return Ok("(no matching files)".to_string());
        }
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let total = matches.len();
        let mut out = String::new();
        for (path, mtime) in matches.into_iter().take(MAX_RESULTS) {
            let ts: DateTime<Utc> = mtime.into();
            out.push_str(&format!("{path} | {}\n", ts.format("%Y-%m-%d %H:%M:%S")));
        }
        if total > MAX_RESULTS {
            out.push_str(&format!("(truncated: showing {MAX_RESULTS} of {total} matches)"));
        } else {
            out.pop();
        }
        Ok(out)
    }
}
