pub mod agent;
pub mod config;
pub mod error;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, ConversationState, Decision, EnginePhase, Session, ToolRegistry, TurnOutcome};
pub use config::*;
pub use error::{EngineError, ToolError};
pub use providers::*;
pub use tools::*;
pub use traits::*;
