use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::tools::{ParamKind, ParamSpec, Tool, ToolError, Workspace, parse_args};

pub struct WriteTool {
    workspace: Workspace,
}

impl WriteTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &'static str {
        "write"
    }

    fn description(&self) -> &'static str {
        "Write content to a file, replacing anything already there. Parent directories are created as needed."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("path", ParamKind::String, "File path to write."),
            ParamSpec::required("content", ParamKind::String, "Full file content."),
        ]
    }

    async fn invoke(&self, args: JsonValue) -> Result<String, ToolError> {
        let args: WriteArgs = parse_args(args)?;
        let path = self.workspace.resolve(&args.path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::Failed(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &args.content)
            .await
            .map_err(|e| ToolError::Failed(format!("write {}: {e}", path.display())))?;
        Ok(format!(
            "wrote {} bytes to {}",
            args.content.len(),
            args.path
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_and_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let tool = WriteTool::new(Workspace::new(dir.path().to_path_buf()).unwrap());
        let out = tool
            .invoke(json!({"path": "sub/dir/f.txt", "content": "hello"}))
            .await
            .unwrap();
        assert!(out.contains("5 bytes"));
        assert_eq!(
            fs::read_to_string(dir.path().join("sub/dir/f.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn refuses_to_escape_workspace() {
        let dir = tempdir().unwrap();
        let tool = WriteTool::new(Workspace::new(dir.path().to_path_buf()).unwrap());
        let err = tool
            .invoke(json!({"path": "../evil.txt", "content": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("outside the workspace"));
    }
}
