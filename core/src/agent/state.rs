use crate::agent::parser::Decision;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnginePhase {
    #[default]
    Idle,
    Running,
    FinalAnswer,
    /// Waiting for the user to answer a confirmation question.
    Suspended,
    TimedOut,
    Failed,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::FinalAnswer => "final_answer",
            Self::Suspended => "suspended",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub result: String,
    pub success: bool,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone)]
enum Event {
    User(usize),
    Decision(usize),
    Tool(usize),
}

/// Memory of one session. Only the execution loop that owns the session
/// mutates it.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    user_messages: Vec<String>,
    decisions: Vec<Decision>,
    tool_calls: Vec<ToolCallRecord>,
    results_by_tool: HashMap<String, Vec<String>>,
    timeline: Vec<Event>,
    loop_count: usize,
    phase: EnginePhase,
    pending_question: Option<String>,
    answered_question: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user_message(&mut self, text: impl Into<String>) {
        self.timeline.push(Event::User(self.user_messages.len()));
        self.user_messages.push(text.into());
    }

    pub fn push_decision(&mut self, decision: Decision) {
        self.timeline.push(Event::Decision(self.decisions.len()));
        self.decisions.push(decision);
    }

    pub fn push_tool_call(&mut self, tool_name: &str, result: String, success: bool) {
        self.results_by_tool
            .entry(tool_name.to_string())
            .or_default()
            .push(result.clone());
        self.timeline.push(Event::Tool(self.tool_calls.len()));
        self.tool_calls.push(ToolCallRecord {
            tool_name: tool_name.to_string(),
            result,
            success,
            timestamp: Local::now(),
        });
    }

    pub fn user_messages(&self) -> &[String] {
        &self.user_messages
    }

    pub fn latest_user_message(&self) -> Option<&str> {
        self.user_messages.last().map(String::as_str)
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    pub fn results_for(&self, tool_name: &str) -> &[String] {
        self.results_by_tool
            .get(tool_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn recent_tool_calls(&self, n: usize) -> &[ToolCallRecord] {
        let start = self.tool_calls.len().saturating_sub(n);
        &self.tool_calls[start..]
    }

    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    pub(crate) fn reset_loop_count(&mut self) {
        self.loop_count = 0;
    }

    pub(crate) fn next_loop(&mut self) -> usize {
        self.loop_count += 1;
        self.loop_count
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: EnginePhase) {
        self.phase = phase;
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.pending_question.as_deref()
    }

    pub(crate) fn suspend(&mut self, question: String) {
        self.pending_question = Some(question);
        self.phase = EnginePhase::Suspended;
    }

    /// Marks the pending question as answered by the latest user message.
    pub(crate) fn resume(&mut self) {
        self.answered_question = self.pending_question.take();
    }

    pub(crate) fn clear_questions(&mut self) {
        self.pending_question = None;
        self.answered_question = None;
    }

    /// The question the latest user message answers, if the current turn
    /// resumed a suspended one.
    pub fn answered_question(&self) -> Option<&str> {
        self.answered_question.as_deref()
    }

    pub fn is_suspended(&self) -> bool {
        self.phase == EnginePhase::Suspended
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Compact, prompt-friendly description of the session so far.
    pub fn summary(&self) -> String {
        let mut per_tool: Vec<_> = self
            .results_by_tool
            .iter()
            .map(|(name, results)| format!("{name} x{}", results.len()))
            .collect();
        per_tool.sort();

        let failed = self.tool_calls.iter().filter(|c| !c.success).count();
        let mut summary = format!(
            "{} user message(s), {} decision(s), {} tool call(s) ({} failed)",
            self.user_messages.len(),
            self.decisions.len(),
            self.tool_calls.len(),
            failed
        );
        if !per_tool.is_empty() {
            summary.push_str(&format!("; tools used: {}", per_tool.join(", ")));
        }
        summary
    }

    /// Chronological transcript, one line per event.
    pub fn history(&self) -> Vec<String> {
        self.timeline
            .iter()
            .map(|event| match *event {
                Event::User(i) => format!("user: {}", self.user_messages[i]),
                Event::Decision(i) => format!("assistant: {}", self.decisions[i].summary()),
                Event::Tool(i) => {
                    let call = &self.tool_calls[i];
                    let status = if call.success { "ok" } else { "error" };
                    format!("tool[{}] {}: {}", call.tool_name, status, call.result)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_results_per_tool_in_order() {
        let mut state = ConversationState::new();
        state.push_tool_call("scan_directory", "a".into(), true);
        state.push_tool_call("disk_usage", "b".into(), true);
        state.push_tool_call("scan_directory", "c".into(), false);

        assert_eq!(state.results_for("scan_directory"), ["a", "c"]);
        assert_eq!(state.results_for("disk_usage"), ["b"]);
        assert!(state.results_for("delete_path").is_empty());
        assert_eq!(state.recent_tool_calls(2).len(), 2);
        assert_eq!(state.recent_tool_calls(2)[0].tool_name, "disk_usage");
        assert_eq!(state.recent_tool_calls(10).len(), 3);
    }

    #[test]
    fn history_is_chronological() {
        let mut state = ConversationState::new();
        state.push_user_message("clean /tmp");
        state.push_decision(Decision::FinalAnswer {
            thought: None,
            text: "Done.".into(),
        });
        state.push_tool_call("notify_user", "hello".into(), true);

        assert_eq!(
            state.history(),
            [
                "user: clean /tmp",
                "assistant: answer: Done.",
                "tool[notify_user] ok: hello"
            ]
        );
    }

    #[test]
    fn summary_counts_failures() {
        let mut state = ConversationState::new();
        state.push_user_message("hi");
        state.push_tool_call("scan_directory", "x".into(), false);
        let summary = state.summary();
        assert!(summary.starts_with("1 user message(s), 0 decision(s), 1 tool call(s) (1 failed)"));
        assert!(summary.contains("scan_directory x1"));
    }

    #[test]
    fn loop_counter_and_reset() {
        let mut state = ConversationState::new();
        assert_eq!(state.next_loop(), 1);
        assert_eq!(state.next_loop(), 2);
        state.reset_loop_count();
        assert_eq!(state.loop_count(), 0);

        state.push_user_message("x");
        state.suspend("Delete?".into());
        assert!(state.is_suspended());
        state.push_user_message("yes");
        state.resume();
        assert_eq!(state.pending_question(), None);
        assert_eq!(state.answered_question(), Some("Delete?"));
        state.reset();
        assert!(state.history().is_empty());
        assert_eq!(state.phase(), EnginePhase::Idle);
        assert_eq!(state.pending_question(), None);
    }
}
