use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::cli::Cli;

/// Runtime configuration, merged from defaults, an optional config file,
/// environment variables, then CLI flags (strongest last).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub project_root: PathBuf,
    pub memory_file: String,
    pub memory_max_lines: usize,
    pub max_tool_iterations: usize,
    pub bash_timeout_secs: u64,
    pub log_level: String,
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            memory_file: "AGENTS.md".to_string(),
            memory_max_lines: 200,
            max_tool_iterations: 10,
            bash_timeout_secs: 60,
            log_level: "warn".to_string(),
            llm: LlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_base_ms: u64,
    pub retry_jitter_ms: u64,
    pub respect_retry_after: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            request_timeout_ms: 120_000,
            max_retries: 3,
            retry_base_ms: 1_000,
            retry_jitter_ms: 500,
            respect_retry_after: true,
        }
    }
}

/// Shape of the optional TOML config file; every field overrides a default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub memory_file: Option<String>,
    pub memory_max_lines: Option<usize>,
    pub max_tool_iterations: Option<usize>,
    pub bash_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub llm: Option<PartialLlmConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PartialLlmConfig {
    pub connect_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub max_retries: Option<usize>,
    pub retry_base_ms: Option<u64>,
    pub retry_jitter_ms: Option<u64>,
    pub respect_retry_after: Option<bool>,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut cfg = AppConfig::default();
        if let Some(file) = read_file_config()? {
            apply_file(&mut cfg, file);
        }
        apply_env(&mut cfg);
        apply_cli(&mut cfg, cli);
        Ok(cfg)
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tinker").join("config.toml"))
}

fn read_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = config_file_path() else {
        return Ok(None);
    };
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let parsed: FileConfig =
        toml::from_str(&text).with_context(|| format!("parse config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(Some(parsed))
}

fn apply_file(cfg: &mut AppConfig, file: FileConfig) {
    if let Some(v) = file.base_url {
        cfg.base_url = v;
    }
    if let Some(v) = file.model {
        cfg.model = v;
    }
    if let Some(v) = file.api_key {
        cfg.api_key = Some(v);
    }
    if let Some(v) = file.memory_file {
        cfg.memory_file = v;
    }
    if let Some(v) = file.memory_max_lines {
        cfg.memory_max_lines = v;
    }
    if let Some(v) = file.max_tool_iterations {
        cfg.max_tool_iterations = v;
    }
    if let Some(v) = file.bash_timeout_secs {
        cfg.bash_timeout_secs = v;
    }
    if let Some(v) = file.log_level {
        cfg.log_level = v;
    }
    if let Some(llm) = file.llm {
        if let Some(v) = llm.connect_timeout_ms {
            cfg.llm.connect_timeout_ms = v;
        }
        if let Some(v) = llm.request_timeout_ms {
            cfg.llm.request_timeout_ms = v;
        }
        if let Some(v) = llm.max_retries {
            cfg.llm.max_retries = v;
        }
        if let Some(v) = llm.retry_base_ms {
            cfg.llm.retry_base_ms = v;
        }
        if let Some(v) = llm.retry_jitter_ms {
            cfg.llm.retry_jitter_ms = v;
        }
        if let Some(v) = llm.respect_retry_after {
            cfg.llm.respect_retry_after = v;
        }
    }
}

fn apply_env(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("OPENAI_BASE_URL") {
        cfg.base_url = v;
    }
    if let Ok(v) = std::env::var("OPENAI_MODEL") {
        cfg.model = v;
    }
    if let Ok(v) = std::env::var("OPENAI_API_KEY") {
        cfg.api_key = Some(v);
    }
    if let Ok(v) = std::env::var("TINKER_LOG") {
        cfg.log_level = v;
    }
}

fn apply_cli(cfg: &mut AppConfig, cli: &Cli) {
    if let Some(v) = &cli.base_url {
        cfg.base_url = v.clone();
    }
    if let Some(v) = &cli.model {
        cfg.model = v.clone();
    }
    if let Some(v) = &cli.api_key {
        cfg.api_key = Some(v.clone());
    }
    if let Some(v) = &cli.memory_file {
        cfg.memory_file = v.clone();
    }
    if let Some(v) = cli.max_tool_iterations {
        cfg.max_tool_iterations = v;
    }
    if let Some(v) = &cli.log_level {
        cfg.log_level = v.clone();
    }
}

#[cfg(test)]
mod tests;
