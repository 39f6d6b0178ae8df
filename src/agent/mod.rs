mod dispatch;
mod session;
mod turn;

pub use dispatch::ToolResult;
pub use session::Session;
pub use turn::{AssistantTurn, TurnRunner};
