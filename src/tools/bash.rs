use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio::process::Command;

use crate::tools::{ParamKind, ParamSpec, Tool, ToolError, Workspace, parse_args};

pub struct BashTool {
    workspace: Workspace,
    timeout: Duration,
}

impl BashTool {
    pub fn new(workspace: Workspace, timeout: Duration) -> Self {
        Self { workspace, timeout }
    }
}

#[derive(Debug, Deserialize)]
struct BashArgs {
    command: String,
}

fn render_output(stdout: &str, stderr: &str, code: Option<i32>) -> String {
    let mut out = stdout.to_string();
    if !stderr.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[stderr]: {stderr}"));
    }
    match code {
        Some(0) => {}
        Some(n) => {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[exit code]: {n}"));
        }
        None => {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("[terminated by signal]");
        }
    }
    if out.is_empty() {
        out.push_str("(no output)");
    }
    out
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &'static str {
        "bash"
    }

    fn description(&self) -> &'static str {
        "Run a shell command in the workspace root and return its stdout, stderr and exit status. Interactive commands are not supported."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "command",
            ParamKind::String,
            "Shell command to execute with bash -c.",
        )]
    }

    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: BashArgs = parse_args(args)?;
        let fut = Command::new("bash")
            .arg("-c")
            .arg(&args.command)
            .current_dir(self.workspace.root())
            .output();

        let output = tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                ToolError::Failed(format!(
                    "command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ToolError::Failed(format!("spawn bash: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let rendered = render_output(stdout.trim_end(), stderr.trim_end(), output.status.code());

        if output.status.success() {
            Ok(rendered)
        } else {
            // Failed commands still carry their full output so the model can
            // read the diagnostics and adjust.
            Err(ToolError::Failed(rendered))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn tool_in(dir: &std::path::Path, timeout: Duration) -> BashTool {
        BashTool::new(Workspace::new(dir.to_path_buf()).unwrap(), timeout)
    }

    #[tokio::test]
    async fn captures_stdout() {
        let dir = tempdir().unwrap();
        let out = tool_in(dir.path(), Duration::from_secs(10))
            .invoke(json!({"command": "echo hello"}))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn runs_in_workspace_root() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let out = tool_in(dir.path(), Duration::from_secs(10))
            .invoke(json!({"command": "ls"}))
            .await
            .unwrap();
        assert!(out.contains("marker.txt"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_failure_with_diagnostics() {
        let dir = tempdir().unwrap();
        let err = tool_in(dir.path(), Duration::from_secs(10))
            .invoke(json!({"command": "echo oops >&2; exit 3"}))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("[stderr]: oops"));
        assert!(text.contains("[exit code]: 3"));
    }

    #[tokio::test]
    async fn empty_output_is_reported() {
        let dir = tempdir().unwrap();
        let out = tool_in(dir.path(), Duration::from_secs(10))
            .invoke(json!({"command": "true"}))
            .await
            .unwrap();
        assert_eq!(out, "(no output)");
    }

    #[tokio::test]
    async fn timeout_is_a_contained_failure() {
        let dir = tempdir().unwrap();
        let err = tool_in(dir.path(), Duration::from_millis(100))
            .invoke(json!({"command": "sleep 5"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
