use std::sync::Mutex;

use crate::application::ports::{LlmClient, LlmClientError, SamplingParams};

/// Canned completion service for tests and local wiring.
pub struct MockLlmClient {
    reply: MockReply,
    prompts: Mutex<Vec<String>>,
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    RateLimited,
    Unavailable(String),
}

impl MockLlmClient {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockReply::Text(text.into()))
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        prompt: &str,
        _sampling: &SamplingParams,
    ) -> Result<String, LlmClientError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::RateLimited => Err(LlmClientError::RateLimited),
            MockReply::Unavailable(msg) => Err(LlmClientError::ApiRequestFailed(msg.clone())),
        }
    }
}
