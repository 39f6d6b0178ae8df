use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tinker",
    version,
    about = "Interactive tool-calling agent for OpenAI-compatible APIs"
)]
pub struct Cli {
    /// OpenAI-compatible API base URL (env: OPENAI_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Model name (env: OPENAI_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// API key (env: OPENAI_API_KEY recommended)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Notes file injected as a preamble, relative to the workspace root
    #[arg(long)]
    pub memory_file: Option<String>,

    /// Maximum tool-calling rounds per user turn
    #[arg(long)]
    pub max_tool_iterations: Option<usize>,

    /// Log level (error, warn, info, debug, trace; env: TINKER_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Tools,
    Clear,
    Quit,
}

pub fn parse_command(line: &str) -> Option<SlashCommand> {
    match line.trim() {
        "/help" => Some(SlashCommand::Help),
        "/tools" => Some(SlashCommand::Tools),
        "/clear" => Some(SlashCommand::Clear),
        "/quit" | "/exit" => Some(SlashCommand::Quit),
        _ => None,
    }
}

pub fn print_help() {
    println!(
        "/help   Show this help\n/tools  List available tools\n/clear  Clear conversation history\n/quit   Quit (also /exit or Ctrl-C at the prompt)"
    );
}
