use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::tools::ToolError;

/// Root directory the file tools operate in. Relative paths resolve against
/// it; resolved paths must stay inside it.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("resolve workspace root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let p = Path::new(raw);
        let joined = if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        };
        let cleaned = normalize(&joined);
        // Symlinked targets are compared by their real location.
        let checked = cleaned.canonicalize().unwrap_or(cleaned);
        if !checked.starts_with(&self.root) {
            return Err(ToolError::Failed(format!(
                "path is outside the workspace: {raw}"
            )));
        }
        Ok(checked)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Walk every file under `base`, honoring `.gitignore` and skipping hidden
/// entries, the same policy for both the glob and grep tools.
pub(crate) fn walk_files(base: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(base)
        .require_git(false)
        .build()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
