use crate::agent::parser::{Decision, parse_decision};
use crate::agent::state::{ConversationState, EnginePhase};
use crate::agent::{PromptBuilder, ToolRegistry};
use crate::error::EngineError;
use crate::traits::{Provider, ToolCategory};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, error, info, info_span, warn};

pub const DEFAULT_MAX_LOOPS: usize = 20;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_TERMINATION_PHRASES: &[&str] = &[
    "exit",
    "quit",
    "bye",
    "goodbye",
    "done",
    "thanks, that's all",
];

pub const CLOSING_MESSAGE: &str = "Goodbye! Nothing else will be changed in this session.";

/// One conversation. The caller owns it and hands it to the engine on every
/// call, so a session can never be driven by two turns at once.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    state: ConversationState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: ConversationState::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }
}

/// How a call to [`AgentLoop::process_input`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answer(String),
    /// A confirmation-required tool asked this question; the next call to
    /// `process_input` on the same session resumes the turn.
    Suspended(String),
    /// The loop budget ran out before the model produced a final answer.
    TimedOut(String),
    /// The turn was aborted by a transport or protocol failure.
    Failed(EngineError),
}

impl TurnOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Answer(text) | Self::Suspended(text) | Self::TimedOut(text) => text.clone(),
            Self::Failed(e) => format!("Error: {e}"),
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    prompt_builder: PromptBuilder,
    tool_registry: Arc<ToolRegistry>,
    max_loops: usize,
    model_timeout: Duration,
    termination_phrases: Vec<String>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        prompt_builder: PromptBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            prompt_builder,
            tool_registry,
            max_loops: DEFAULT_MAX_LOOPS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            termination_phrases: DEFAULT_TERMINATION_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    pub fn with_max_loops(mut self, max: usize) -> Self {
        self.max_loops = max.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_termination_phrases(mut self, phrases: Vec<String>) -> Self {
        self.termination_phrases = phrases
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn reset(&self, session: &mut Session) {
        info!(session = %session.id, "session reset");
        session.state.reset();
    }

    pub fn history(&self, session: &Session) -> Vec<String> {
        session.state.history()
    }

    pub async fn process_input(&self, session: &mut Session, text: &str) -> TurnOutcome {
        let span = info_span!("turn", session = %session.id);
        self.run_turn(&mut session.state, text).instrument(span).await
    }

    async fn run_turn(&self, state: &mut ConversationState, text: &str) -> TurnOutcome {
        let resuming = state.is_suspended();
        state.push_user_message(text);
        state.reset_loop_count();

        if self.is_termination_phrase(text) {
            debug!("termination phrase, skipping the model");
            state.clear_questions();
            state.set_phase(EnginePhase::FinalAnswer);
            return TurnOutcome::Answer(CLOSING_MESSAGE.to_string());
        }

        if resuming {
            state.resume();
            debug!(question = ?state.answered_question(), "resuming suspended turn");
        } else {
            state.clear_questions();
        }
        state.set_phase(EnginePhase::Running);

        while state.loop_count() < self.max_loops {
            let iteration = state.next_loop();
            debug!(iteration, "rendering prompt");

            let prompt = self.prompt_builder.render(state, &self.tool_registry);
            let decision = match self.decide(state, &prompt).await {
                Ok(decision) => decision,
                Err(e) => {
                    error!(iteration, error = %e, "turn aborted");
                    state.set_phase(EnginePhase::Failed);
                    return TurnOutcome::Failed(e);
                }
            };

            if let Some(thought) = decision.thought() {
                debug!(iteration, thought, "model decision");
            }
            state.push_decision(decision.clone());

            let action = match decision {
                Decision::FinalAnswer { text, .. } => {
                    info!(iterations = iteration, "final answer");
                    state.set_phase(EnginePhase::FinalAnswer);
                    return TurnOutcome::Answer(text);
                }
                Decision::Action { action, .. } => action,
            };

            let tool_name = action.tool_name.as_str();
            match self.tool_registry.invoke(tool_name, &action.parameters).await {
                Ok(output) => {
                    info!(iteration, tool = tool_name, "tool call succeeded");
                    state.push_tool_call(tool_name, output.clone(), true);

                    if self.tool_registry.category(tool_name) == Some(ToolCategory::ConfirmationRequired) {
                        info!(tool = tool_name, "waiting for user confirmation");
                        state.suspend(output.clone());
                        return TurnOutcome::Suspended(output);
                    }
                }
                Err(e) => {
                    warn!(iteration, tool = tool_name, error = %e, "tool call failed");
                    state.push_tool_call(tool_name, e.to_string(), false);
                }
            }
        }

        warn!(error = %EngineError::LoopBudgetExceeded(self.max_loops), "loop budget exhausted");
        state.set_phase(EnginePhase::TimedOut);
        TurnOutcome::TimedOut(self.budget_message())
    }

    /// One model call, plus at most one corrective retry when the response
    /// breaks the protocol.
    async fn decide(&self, state: &ConversationState, prompt: &str) -> Result<Decision, EngineError> {
        let raw = self.complete(prompt).await?;

        let reason = match parse_decision(&raw) {
            Ok(decision) => return Ok(decision),
            Err(EngineError::InvalidResponse { reason, .. }) => reason,
            Err(e) => return Err(e),
        };

        warn!(%reason, "model response rejected, sending corrective prompt");
        let correction =
            self.prompt_builder
                .render_correction(state, &self.tool_registry, &raw, &reason);
        let retry = self.complete(&correction).await?;
        parse_decision(&retry)
    }

    async fn complete(&self, prompt: &str) -> Result<String, EngineError> {
        match tokio::time::timeout(self.model_timeout, self.provider.complete(prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(EngineError::ModelUnavailable(format!(
                "{} request failed: {e:#}",
                self.provider.name()
            ))),
            Err(_) => Err(EngineError::ModelUnavailable(format!(
                "{} did not answer within {}s",
                self.provider.name(),
                self.model_timeout.as_secs()
            ))),
        }
    }

    pub fn is_termination_phrase(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        self.termination_phrases.iter().any(|p| *p == text)
    }

    fn budget_message(&self) -> String {
        format!(
            "I stopped after {} steps without reaching a final answer. Please try a narrower request.",
            self.max_loops
        )
    }
}
