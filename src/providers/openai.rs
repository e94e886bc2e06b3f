use std::fmt;

use reqwest::Client;

use crate::config::{Config, ProviderSettings};
use crate::types::Prompt;

use super::{
    build_http_client, first_choice_content, handle_error_response, map_reqwest_error, ChatMessage,
    ChatRequest, ChatResponse, ProviderError,
};

/// Persona applied when a call carries no system instruction. Advisor
/// fan-out phases rely on this default.
const DEFAULT_SYSTEM_PROMPT: &str = "You are a coder and problem solver expert.";

/// OpenAI chat-completions binding
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    settings: ProviderSettings,
    timeout: u64,
    max_tokens: u32,
    temperature: f32,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never format the API key
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(settings: ProviderSettings, config: &Config) -> Result<Self, ProviderError> {
        let client = build_http_client(config.timeout)?;
        Ok(Self {
            client,
            settings,
            timeout: config.timeout,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Send one prompt to `model` and return the assistant's reply
    pub async fn chat(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        let system = prompt.system.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(system),
                ChatMessage::user(prompt.user.as_str()),
            ],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        let api_response: ChatResponse =
            response.json().await.map_err(|e| ProviderError::ParseError {
                message: format!("Failed to parse API response: {}", e),
            })?;

        first_choice_content(api_response)
    }
}
