mod agent;
mod cli;
mod config;
mod llm;
mod logging;
mod memory;
mod tools;

use std::io::Write as _;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::agent::Session;
use crate::cli::{Cli, SlashCommand};
use crate::config::AppConfig;
use crate::llm::{LlmError, OpenAIClient};
use crate::tools::{ToolRegistry, Workspace};

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli)?;
    logging::init_logging(&cfg.log_level)?;

    let workspace = Workspace::new(cfg.project_root.clone())?;
    let registry = Arc::new(ToolRegistry::builtin(
        workspace,
        Duration::from_secs(cfg.bash_timeout_secs),
    ));
    let client = OpenAIClient::new(
        cfg.base_url.clone(),
        cfg.api_key.clone().unwrap_or_default(),
        cfg.model.clone(),
    )?
    .with_llm_config(cfg.llm.clone());

    let memory_path = cfg.project_root.join(&cfg.memory_file);
    let preamble = memory::load_memory(&memory_path, cfg.memory_max_lines)?;
    let memory_loaded = preamble.is_some();
    let mut session = Session::new(registry, preamble, cfg.max_tool_iterations);

    println!("tinker — tool-calling agent");
    println!("  model:  {}", cfg.model);
    println!("  api:    {}", cfg.base_url);
    println!("  .env:   {}", if dotenv_loaded { "loaded" } else { "not found" });
    println!(
        "  memory: {}",
        if memory_loaded {
            cfg.memory_file.as_str()
        } else {
            "none"
        }
    );
    if cfg.api_key.is_none() {
        println!("  warning: no API key configured (set OPENAI_API_KEY)");
    }
    cli::print_help();

    // Tool-call traces arrive over a channel while a turn is running; a
    // plain thread prints them so the async loop never blocks on stdout.
    let (progress_tx, progress_rx) = std::sync::mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in progress_rx {
            println!("{line}");
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            res = lines.next_line() => match res? {
                Some(l) => l,
                None => break, // EOF
            },
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match cli::parse_command(input) {
            Some(SlashCommand::Quit) => break,
            Some(SlashCommand::Help) => {
                cli::print_help();
                continue;
            }
            Some(SlashCommand::Tools) => {
                println!("{}", session.describe_tools());
                continue;
            }
            Some(SlashCommand::Clear) => {
                session.reset();
                println!("history cleared");
                continue;
            }
            None => {}
        }

        // Ctrl-C during a turn cancels the turn, not the program. The turn
        // future is always driven to completion so the session can roll the
        // transcript back cleanly.
        let cancel = CancellationToken::new();
        let mut turn = pin!(session.turn(&client, input, &cancel, Some(progress_tx.clone())));
        let result = loop {
            tokio::select! {
                res = &mut turn => break res,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n(cancelling...)");
                    cancel.cancel();
                }
            }
        };

        match result {
            Ok(answer) => println!("\n{answer}"),
            Err(LlmError::Cancelled) => println!("(turn cancelled; history unchanged)"),
            Err(LlmError::Transport(e)) => {
                error!(err = %format!("{e:#}"), "turn failed");
                println!("turn failed: {e:#}\nhistory unchanged; you can retry");
            }
        }
    }

    println!("bye");
    Ok(())
}
