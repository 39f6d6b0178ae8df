use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Load the optional notes file injected ahead of the conversation. Only
/// the first `max_lines` lines are kept so a sprawling notes file cannot
/// crowd out the actual conversation.
pub fn load_memory(path: &Path, max_lines: usize) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read memory file {}", path.display()))?;
    let lines: Vec<&str> = text.lines().take(max_lines).collect();
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Ok(None);
    }
    debug!(path = %path.display(), lines = lines.len(), "loaded memory preamble");
    Ok(Some(format!(
        "Workspace notes from {}:\n{}",
        path.display(),
        lines.join("\n")
    )))
}
