//! Error taxonomy for the engine.
//!
//! Two families: [`ToolError`] covers dispatch-time validation and handler
//! failures, which the loop records as failed tool results and feeds back to
//! the model. [`EngineError`] covers protocol and transport failures, which
//! abort the current turn and are reported to the caller.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{tool}' is missing required parameter '{parameter}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("parameter '{parameter}' of tool '{tool}' expects {expected}: {message}")]
    ParameterType {
        tool: String,
        parameter: String,
        expected: &'static str,
        message: String,
    },

    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid model response: {reason}")]
    InvalidResponse { raw: String, reason: String },

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("no final answer after {0} iterations")]
    LoopBudgetExceeded(usize),
}

impl EngineError {
    pub(crate) fn invalid(raw: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}
