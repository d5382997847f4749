//! The model/engine protocol.
//!
//! Every model response must carry exactly one JSON object of the form
//!
//! ```json
//! {"thought": "...", "final_answer": "..."}
//! {"thought": "...", "action": {"tool_name": "...", "parameters": {...}}}
//! ```
//!
//! Prose around the object is tolerated, anything else is rejected with
//! [`EngineError::InvalidResponse`]. A response is never promoted to a final
//! answer just because it failed to parse.

use crate::error::EngineError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub tool_name: String,
    /// Raw values as the model sent them; the registry coerces them.
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    FinalAnswer {
        thought: Option<String>,
        text: String,
    },
    Action {
        thought: Option<String>,
        action: Action,
    },
}

impl Decision {
    pub fn thought(&self) -> Option<&str> {
        match self {
            Self::FinalAnswer { thought, .. } | Self::Action { thought, .. } => thought.as_deref(),
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalAnswer { .. })
    }

    /// One-line rendering used in history and prompt summaries.
    pub fn summary(&self) -> String {
        match self {
            Self::FinalAnswer { text, .. } => format!("answer: {text}"),
            Self::Action { action, .. } => format!(
                "call {}({})",
                action.tool_name,
                Value::Object(action.parameters.clone())
            ),
        }
    }
}

pub const RESPONSE_SCHEMA: &str = r#"{"thought": "<your reasoning>", "final_answer": "<message for the user>"}
or
{"thought": "<your reasoning>", "action": {"tool_name": "<tool name>", "parameters": {"<name>": <value>}}}"#;

pub fn parse_decision(raw: &str) -> Result<Decision, EngineError> {
    if raw.trim().is_empty() {
        return Err(EngineError::invalid(raw, "empty response"));
    }

    let object = extract_object(raw)
        .ok_or_else(|| EngineError::invalid(raw, "no JSON object found in response"))?;
    let normalized = escape_stray_backslashes(object);

    let value: Value = serde_json::from_str(&normalized)
        .map_err(|e| EngineError::invalid(raw, format!("malformed JSON: {e}")))?;
    let Value::Object(mut fields) = value else {
        return Err(EngineError::invalid(raw, "expected a JSON object"));
    };

    let thought = match take(&mut fields, "thought") {
        None => return Err(EngineError::invalid(raw, "missing required field 'thought'")),
        Some(Value::String(s)) => s,
        Some(_) => return Err(EngineError::invalid(raw, "'thought' must be a string")),
    };

    match (take(&mut fields, "final_answer"), take(&mut fields, "action")) {
        (Some(_), Some(_)) => Err(EngineError::invalid(
            raw,
            "response contains both 'final_answer' and 'action'",
        )),
        (None, None) => Err(EngineError::invalid(
            raw,
            "response contains neither 'final_answer' nor 'action'",
        )),
        (Some(Value::String(text)), None) => Ok(Decision::FinalAnswer {
            thought: Some(thought),
            text,
        }),
        (Some(_), None) => Err(EngineError::invalid(raw, "'final_answer' must be a string")),
        (None, Some(action)) => Ok(Decision::Action {
            thought: Some(thought),
            action: parse_action(raw, action)?,
        }),
    }
}

fn parse_action(raw: &str, action: Value) -> Result<Action, EngineError> {
    let Value::Object(mut action) = action else {
        return Err(EngineError::invalid(raw, "'action' must be an object"));
    };

    let tool_name = match take(&mut action, "tool_name") {
        None => return Err(EngineError::invalid(raw, "'action' is missing 'tool_name'")),
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => {
            return Err(EngineError::invalid(
                raw,
                "'tool_name' must be a non-empty string",
            ));
        }
    };

    let parameters = match take(&mut action, "parameters") {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(EngineError::invalid(raw, "'parameters' must be an object")),
    };

    Ok(Action {
        tool_name,
        parameters,
    })
}

/// Removes `key`, treating an explicit `null` like a missing field.
fn take(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key).filter(|v| !v.is_null())
}

fn extract_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Doubles every backslash that does not start a valid JSON escape, so that
/// Windows paths such as `C:\Users\me` survive decoding.
fn escape_stray_backslashes(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
            }
            Some('u')
                if chars.len() >= i + 6 && chars[i + 2..i + 6].iter().all(char::is_ascii_hexdigit) =>
            {
                out.extend(&chars[i..i + 6]);
                i += 6;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reason(raw: &str) -> String {
        match parse_decision(raw) {
            Err(EngineError::InvalidResponse { reason, raw: echoed }) => {
                assert_eq!(echoed, raw);
                reason
            }
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[test]
    fn final_answer() {
        let decision = parse_decision(r#"{"thought":"done","final_answer":"Cleanup finished."}"#).unwrap();
        assert_eq!(
            decision,
            Decision::FinalAnswer {
                thought: Some("done".into()),
                text: "Cleanup finished.".into()
            }
        );
        assert!(decision.is_final());
    }

    #[test]
    fn action_with_parameters() {
        let decision = parse_decision(
            r#"{"thought":"scan","action":{"tool_name":"scan_directory","parameters":{"path":"/tmp"}}}"#,
        )
        .unwrap();
        match decision {
            Decision::Action { thought, action } => {
                assert_eq!(thought.as_deref(), Some("scan"));
                assert_eq!(action.tool_name, "scan_directory");
                assert_eq!(action.parameters.get("path"), Some(&json!("/tmp")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn action_without_parameters() {
        let decision =
            parse_decision(r#"{"thought":"t","action":{"tool_name":"disk_usage"}}"#).unwrap();
        match decision {
            Decision::Action { action, .. } => assert!(action.parameters.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn prose_around_the_object_is_ignored() {
        let raw = "Sure! Here is my decision:\n```json\n{\"thought\":\"ok\",\"final_answer\":\"Hi {there}\"}\n```\nThanks.";
        let decision = parse_decision(raw).unwrap();
        assert_eq!(
            decision,
            Decision::FinalAnswer {
                thought: Some("ok".into()),
                text: "Hi {there}".into()
            }
        );
    }

    #[test]
    fn raw_windows_paths_are_tolerated() {
        let raw = r#"{"thought":"scan","action":{"tool_name":"scan_directory","parameters":{"path":"C:\Users\me\Downloads"}}}"#;
        match parse_decision(raw).unwrap() {
            Decision::Action { action, .. } => {
                assert_eq!(action.parameters["path"], json!(r"C:\Users\me\Downloads"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn valid_escapes_are_preserved() {
        let raw = r#"{"thought":"a\tb","final_answer":"line\nnext \u00e9 \"q\" C:\\x"}"#;
        match parse_decision(raw).unwrap() {
            Decision::FinalAnswer { thought, text } => {
                assert_eq!(thought.as_deref(), Some("a\tb"));
                assert_eq!(text, "line\nnext é \"q\" C:\\x");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn both_or_neither_is_rejected() {
        assert!(reason(
            r#"{"thought":"x","final_answer":"a","action":{"tool_name":"scan_directory"}}"#
        )
        .contains("both"));
        assert!(reason(r#"{"thought":"x"}"#).contains("neither"));
        assert!(reason(r#"{"thought":"x","final_answer":null,"action":null}"#).contains("neither"));
    }

    #[test]
    fn missing_thought_is_rejected() {
        assert!(reason(r#"{"final_answer":"a"}"#).contains("thought"));
        assert!(reason(r#"{"thought":5,"final_answer":"a"}"#).contains("thought"));
    }

    #[test]
    fn malformed_actions_are_rejected() {
        assert!(reason(r#"{"thought":"x","action":{"parameters":{}}}"#).contains("tool_name"));
        assert!(reason(r#"{"thought":"x","action":{"tool_name":""}}"#).contains("tool_name"));
        assert!(reason(r#"{"thought":"x","action":"scan"}"#).contains("object"));
        assert!(
            reason(r#"{"thought":"x","action":{"tool_name":"a","parameters":[1]}}"#)
                .contains("parameters")
        );
        assert!(reason(r#"{"thought":"x","final_answer":42}"#).contains("final_answer"));
    }

    #[test]
    fn prose_is_never_an_answer() {
        assert!(reason("The cleanup is complete.").contains("no JSON object"));
        assert!(reason("   ").contains("empty"));
        assert!(reason("} backwards {").contains("no JSON object"));
        assert!(reason(r#"{"thought": "unterminated"#).contains("no JSON object"));
        assert!(reason(r#"{"thought":"a","final_answer":"b"} {"thought":"c"}"#).contains("malformed"));
    }
}
