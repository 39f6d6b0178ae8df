use super::*;
use clap::Parser;

#[test]
fn defaults_are_sane() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.base_url, "https://api.openai.com/v1");
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.max_tool_iterations, 10);
    assert_eq!(cfg.bash_timeout_secs, 60);
    assert_eq!(cfg.memory_max_lines, 200);
    assert!(cfg.api_key.is_none());
}

#[test]
fn file_config_overrides_defaults() {
    let file: FileConfig = toml::from_str(
        r#"
        base_url = "http://localhost:8000/v1"
        model = "local-model"
        max_tool_iterations = 4

        [llm]
        max_retries = 0
        "#,
    )
    .unwrap();
    let mut cfg = AppConfig::default();
    apply_file(&mut cfg, file);
    assert_eq!(cfg.base_url, "http://localhost:8000/v1");
    assert_eq!(cfg.model, "local-model");
    assert_eq!(cfg.max_tool_iterations, 4);
    assert_eq!(cfg.llm.max_retries, 0);
    // Untouched fields keep their defaults.
    assert_eq!(cfg.llm.retry_base_ms, 1_000);
    assert_eq!(cfg.memory_file, "AGENTS.md");
}

#[test]
fn unknown_file_keys_are_rejected_gracefully() {
    // toml deny_unknown_fields is not set, so extra keys are simply ignored.
    let file: Result<FileConfig, _> = toml::from_str("something_else = 1");
    assert!(file.is_ok());
}

#[test]
fn cli_flags_win_over_file_config() {
    let file: FileConfig = toml::from_str(r#"model = "from-file""#).unwrap();
    let mut cfg = AppConfig::default();
    apply_file(&mut cfg, file);

    let cli = Cli::parse_from(["tinker", "--model", "from-cli", "--max-tool-iterations", "2"]);
    apply_cli(&mut cfg, &cli);
    assert_eq!(cfg.model, "from-cli");
    assert_eq!(cfg.max_tool_iterations, 2);
}

#[test]
fn cli_without_flags_changes_nothing() {
    let cli = Cli::parse_from(["tinker"]);
    let mut cfg = AppConfig::default();
    let before = format!("{cfg:?}");
    apply_cli(&mut cfg, &cli);
    assert_eq!(before, format!("{cfg:?}"));
}
