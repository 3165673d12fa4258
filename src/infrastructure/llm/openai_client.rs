use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{LlmClient, LlmClientError, SamplingParams};
use crate::infrastructure::observability::sanitize_prompt;
use crate::presentation::config::{LlmProvider, LlmSettings};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions client for OpenAI-compatible services.
pub struct OpenAiClient {
    client: Client,
    provider: LlmProvider,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// Client for api.openai.com.
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(OPENAI_BASE_URL, api_key, model)
    }

    /// Client for any server exposing `{base_url}/chat/completions`.
    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            provider: LlmProvider::OpenAi,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.provider {
            LlmProvider::Azure => request.header("api-key", &self.api_key),
            _ if self.api_key.is_empty() => request,
            _ => request.bearer_auth(&self.api_key),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        sampling: &SamplingParams,
    ) -> Result<String, LlmClientError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            prompt = %sanitize_prompt(prompt),
            "Sending chat completion request"
        );

        let request = self.client.post(&self.endpoint).json(&request_body);
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| LlmClientError::ApiRequestFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmClientError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::ApiRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmClientError::InvalidResponse("empty choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(chars = content.len(), "Chat completion received");

        Ok(content)
    }
}

pub fn create_llm_client(settings: &LlmSettings) -> Result<OpenAiClient, LlmClientError> {
    let endpoint = match settings.provider {
        LlmProvider::OpenAi => format!("{}/chat/completions", OPENAI_BASE_URL),
        LlmProvider::LmStudio => {
            let base_url = settings.base_url.as_deref().ok_or_else(|| {
                LlmClientError::Misconfigured("base_url required for lmstudio provider".to_string())
            })?;
            format!("{}/chat/completions", base_url.trim_end_matches('/'))
        }
        LlmProvider::Azure => {
            let endpoint = settings.azure_endpoint.as_deref().ok_or_else(|| {
                LlmClientError::Misconfigured(
                    "azure_endpoint required for azure provider".to_string(),
                )
            })?;
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                settings.chat_model,
                settings.azure_api_version
            )
        }
    };

    if settings.provider != LlmProvider::LmStudio && settings.api_key.is_empty() {
        return Err(LlmClientError::Misconfigured(
            "api_key required (set OPENAI_API_KEY or APP_LLM__API_KEY)".to_string(),
        ));
    }

    Ok(OpenAiClient {
        client: Client::new(),
        provider: settings.provider,
        endpoint,
        api_key: settings.api_key.clone(),
        model: settings.chat_model.clone(),
    })
}
