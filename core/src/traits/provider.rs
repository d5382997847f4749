use async_trait::async_trait;

/// A language model reachable through a single prompt-in, text-out call.
///
/// Implementations should not retry on their own. The engine bounds every
/// call with its own timeout and drops the future when it expires, which
/// cancels the in-flight request.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
