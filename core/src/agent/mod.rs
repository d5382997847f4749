pub mod loop_;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod state;

pub use loop_::{AgentLoop, Session, TurnOutcome};
pub use parser::{Action, Decision, parse_decision};
pub use prompt::{PromptBuilder, PromptConfig};
pub use registry::ToolRegistry;
pub use state::{ConversationState, EnginePhase, ToolCallRecord};
