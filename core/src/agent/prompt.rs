use crate::agent::ToolRegistry;
use crate::agent::parser::RESPONSE_SCHEMA;
use crate::agent::state::ConversationState;
use crate::traits::{ToolCategory, ToolDefinition};
use std::fmt::Write;

pub const DEFAULT_MAX_PROMPT_CHARS: usize = 8_000;
pub const DEFAULT_RECENT_RESULTS: usize = 5;
pub const DEFAULT_RESULT_CHARS: usize = 600;

const EARLIER_REQUESTS: usize = 3;
const EARLIER_REQUEST_CHARS: usize = 200;
const OFFENDING_RESPONSE_CHARS: usize = 1_000;
const CONTEXT_HEADER: &str = "\n\n## Context\n\n";
const SECTION_SEPARATOR: &str = "\n\n";

const INSTRUCTIONS: &str = "You are sweep, an assistant that helps the user inspect and clean up their disk.
You work in steps. In every step you reply with exactly one JSON object and nothing else.

## Response Protocol

Reply with one of these two shapes:";

const HOUSE_RULES: &str = "\"thought\" is always required. Include either \"final_answer\" or \"action\", never both.
Use \"final_answer\" when the task is done or you need nothing more from the tools.
Use \"action\" to call exactly one tool; its result will appear in the context of the next step.

## Rules

- Call at most one tool per step.
- Use notify_user before a long scan and to report what you found after it.
- Never delete anything without asking first with ask_user and receiving a clear yes.
- Whitelisted paths must never be deleted.
- Escape backslashes in JSON strings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptConfig {
    /// Hard upper bound on the rendered prompt, in characters.
    pub max_chars: usize,
    pub recent_results: usize,
    pub result_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_PROMPT_CHARS,
            recent_results: DEFAULT_RECENT_RESULTS,
            result_chars: DEFAULT_RESULT_CHARS,
        }
    }
}

/// Renders the text sent to the model on every iteration.
///
/// Rendering is a pure function of the conversation state and the registry.
/// The instructions and the tool catalog are always kept whole; when the
/// prompt would exceed [`PromptConfig::max_chars`] the context block loses
/// its oldest sections first.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn render(&self, state: &ConversationState, tools: &ToolRegistry) -> String {
        let fixed = self.fixed_part(tools);
        let (sections, current) = self.context_sections(state);
        self.assemble(&fixed, sections, &current)
    }

    /// Prompt for the single retry after an unparseable response. The
    /// correction sits just before the current step and is cut in place
    /// rather than dropped; the current step always comes last.
    pub fn render_correction(
        &self,
        state: &ConversationState,
        tools: &ToolRegistry,
        offending: &str,
        reason: &str,
    ) -> String {
        let fixed = self.fixed_part(tools);
        let (mut sections, current) = self.context_sections(state);
        sections.push(format!(
            "### Correction\nYour previous response was rejected: {}\nPrevious response:\n<<<\n{}\n>>>\nReply again with exactly one JSON object matching:\n{}",
            reason,
            truncate_chars(offending, OFFENDING_RESPONSE_CHARS),
            RESPONSE_SCHEMA
        ));
        self.assemble(&fixed, sections, &current)
    }

    fn fixed_part(&self, tools: &ToolRegistry) -> String {
        format!(
            "{}\n\n{}\n\n{}\n\n{}",
            INSTRUCTIONS,
            RESPONSE_SCHEMA,
            HOUSE_RULES,
            render_catalog(&tools.describe())
        )
    }

    /// Older sections, oldest first, and the current step.
    fn context_sections(&self, state: &ConversationState) -> (Vec<String>, String) {
        let mut sections = Vec::new();

        let mut session = format!("### Session\n{}", state.summary());
        let messages = state.user_messages();
        let earlier = &messages[..messages.len().saturating_sub(1)];
        let shown = &earlier[earlier.len().saturating_sub(EARLIER_REQUESTS)..];
        if !shown.is_empty() {
            session.push_str("\nEarlier requests:");
            for message in shown {
                let _ = write!(session, "\n- {}", truncate_chars(message, EARLIER_REQUEST_CHARS));
            }
        }
        sections.push(session);

        let first_index = state
            .tool_calls()
            .len()
            .saturating_sub(self.config.recent_results);
        for (offset, call) in state
            .recent_tool_calls(self.config.recent_results)
            .iter()
            .enumerate()
        {
            let status = if call.success { "ok" } else { "error" };
            sections.push(format!(
                "### Tool result #{} {} ({})\n{}",
                first_index + offset + 1,
                call.tool_name,
                status,
                truncate_chars(&call.result, self.config.result_chars)
            ));
        }

        let mut current = format!("### Current step\nIteration: {}", state.loop_count());
        if let Some(question) = state.answered_question() {
            let _ = write!(current, "\nYou asked the user: {question}");
        }
        if let Some(message) = state.latest_user_message() {
            let _ = write!(current, "\nLatest user message: {message}");
        }
        (sections, current)
    }

    fn assemble(&self, fixed: &str, mut sections: Vec<String>, current: &str) -> String {
        let max = self.config.max_chars;
        let fixed_len = fixed.chars().count() + CONTEXT_HEADER.chars().count();
        if fixed_len >= max {
            return fixed.chars().take(max).collect();
        }
        let budget = max - fixed_len;

        // The current step carries the request and is never dropped. When it
        // alone is too long its tail is kept, which holds the user message.
        let current_len = current.chars().count();
        if current_len >= budget {
            let tail: String = current.chars().skip(current_len - budget).collect();
            return format!("{fixed}{CONTEXT_HEADER}{tail}");
        }

        let separator_len = SECTION_SEPARATOR.chars().count();
        let room = budget.saturating_sub(current_len + separator_len);
        let mut older = sections.join(SECTION_SEPARATOR);
        while sections.len() > 1 && older.chars().count() > room {
            sections.remove(0);
            older = sections.join(SECTION_SEPARATOR);
        }
        if older.chars().count() > room {
            older = truncate_chars(&older, room);
        }

        if older.is_empty() {
            format!("{fixed}{CONTEXT_HEADER}{current}")
        } else {
            format!("{fixed}{CONTEXT_HEADER}{older}{SECTION_SEPARATOR}{current}")
        }
    }
}

pub fn render_catalog(tools: &[&ToolDefinition]) -> String {
    let mut catalog = String::from("## Available Tools\n");

    for tool in tools {
        let _ = write!(catalog, "\n### {}\n{}\n", tool.name, tool.description);
        if tool.parameters.is_empty() {
            catalog.push_str("Parameters: none\n");
        } else {
            catalog.push_str("Parameters:\n");
            for param in &tool.parameters {
                let presence = match (&param.default, param.required) {
                    (_, true) => "required".to_string(),
                    (Some(default), false) => format!("optional, default {default}"),
                    (None, false) => "optional".to_string(),
                };
                let _ = writeln!(
                    catalog,
                    "- {} ({}, {}): {}",
                    param.name, param.kind, presence, param.description
                );
            }
        }
        if tool.category == ToolCategory::ConfirmationRequired {
            catalog.push_str("Pauses the session until the user answers.\n");
        }
    }

    catalog
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let truncated: String = text.chars().take(max - 3).collect();
    format!("{truncated}...")
}
