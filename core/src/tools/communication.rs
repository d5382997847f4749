use crate::traits::{ParamType, Parameter, Tool, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Where `notify_user` messages go. The CLI prints them; tests capture them.
#[derive(Clone)]
pub struct Notifier(Arc<dyn Fn(&str) + Send + Sync>);

impl Notifier {
    pub fn new(sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(sink))
    }

    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    pub fn send(&self, message: &str) {
        (self.0)(message)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Notifier")
    }
}

pub struct NotifyUserTool {
    notifier: Notifier,
}

impl NotifyUserTool {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ToolHandler for NotifyUserTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let message = args.str("message")?;
        info!(message, "notify_user");
        self.notifier.send(message);
        Ok(format!("User was told: {message}"))
    }
}

impl Tool for NotifyUserTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "notify_user",
            "Show a short progress message to the user without waiting for a reply",
        )
        .param(Parameter::required("message", ParamType::String, "Text to show"))
    }
}

/// Asks the user a question. The engine suspends the turn after this tool
/// and resumes it with the user's reply.
pub struct AskUserTool;

#[async_trait]
impl ToolHandler for AskUserTool {
    async fn call(&self, args: ToolArgs) -> anyhow::Result<String> {
        let question = args.str("question")?.trim();
        anyhow::ensure!(!question.is_empty(), "question must not be empty");
        Ok(question.to_string())
    }
}

impl Tool for AskUserTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "ask_user",
            "Ask the user a question, e.g. to confirm a deletion, and wait for the answer",
        )
        .param(Parameter::required("question", ParamType::String, "Question for the user"))
        .requires_confirmation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ParamValue, ToolCategory};
    use std::sync::Mutex;

    fn arg(name: &str, value: &str) -> ToolArgs {
        ToolArgs::new(vec![(name.into(), Some(ParamValue::String(value.into())))])
    }

    #[tokio::test]
    async fn notify_reaches_the_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tool = NotifyUserTool::new(Notifier::new(move |m| sink.lock().unwrap().push(m.to_string())));

        let out = tool.call(arg("message", "Scanning ~/Downloads")).await.unwrap();
        assert_eq!(out, "User was told: Scanning ~/Downloads");
        assert_eq!(*seen.lock().unwrap(), ["Scanning ~/Downloads"]);
    }

    #[tokio::test]
    async fn ask_returns_the_question() {
        assert_eq!(AskUserTool.definition().category, ToolCategory::ConfirmationRequired);
        let out = AskUserTool.call(arg("question", " Delete 4 files? ")).await.unwrap();
        assert_eq!(out, "Delete 4 files?");
        assert!(AskUserTool.call(arg("question", "  ")).await.is_err());
    }
}
