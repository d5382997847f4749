use crate::traits::Provider;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted provider for engine tests: replies are served in order and every
/// prompt is recorded.
pub(crate) struct MockProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    stall: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub(crate) fn new(responses: Vec<&str>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
            fallback: None,
            stall: false,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn repeating(response: &str) -> Self {
        Self {
            fallback: Some(response.to_string()),
            ..Self::new(vec![])
        }
    }

    pub(crate) fn stalled() -> Self {
        Self {
            stall: true,
            ..Self::new(vec![])
        }
    }

    pub(crate) fn push(&self, response: &str) {
        self.script.lock().unwrap().push_back(Ok(response.to_string()));
    }

    pub(crate) fn push_error(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if self.stall {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(Ok(text)), _) => Ok(text),
            (Some(Err(message)), _) => Err(anyhow::anyhow!(message)),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(anyhow::anyhow!("mock script exhausted")),
        }
    }
}
