use std::fmt;

use reqwest::Client;

use crate::config::{Config, ProviderSettings};
use crate::types::Prompt;

use super::{
    build_http_client, first_choice_content, handle_error_response, map_reqwest_error, ChatMessage,
    ChatRequest, ChatResponse, ProviderError,
};

/// Mistral binding. The wire protocol is chat-completions compatible, but the
/// system message is only sent when a prompt actually carries one, and the
/// sampling knobs are left to the provider's defaults.
#[derive(Clone)]
pub struct MistralClient {
    client: Client,
    settings: ProviderSettings,
    timeout: u64,
}

impl fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralClient")
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl MistralClient {
    pub fn new(settings: ProviderSettings, config: &Config) -> Result<Self, ProviderError> {
        let client = build_http_client(config.timeout)?;
        Ok(Self {
            client,
            settings,
            timeout: config.timeout,
        })
    }

    /// Send one prompt to `model` and return the assistant's reply
    pub async fn chat(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &prompt.system {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.push(ChatMessage::user(prompt.user.as_str()));

        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens: None,
            temperature: None,
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
