use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, ProviderSettings};
use crate::types::Prompt;

use super::{build_http_client, handle_error_response, map_reqwest_error, ProviderError};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Gemini `generateContent` binding. The protocol has no system role, so a
/// system instruction is flattened into the user text: instruction, blank
/// line, content — exactly that join, nothing reordered.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: ProviderSettings,
    timeout: u64,
    max_tokens: u32,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.settings.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(settings: ProviderSettings, config: &Config) -> Result<Self, ProviderError> {
        let client = build_http_client(config.timeout)?;
        Ok(Self {
            client,
            settings,
            timeout: config.timeout,
            max_tokens: config.max_tokens,
        })
    }

    /// Send one prompt to `model` (e.g. `models/gemini-1.5-pro-latest`) and
    /// return the first candidate's text
    pub async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: flatten_prompt(prompt),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        // The key travels as a query parameter, not a header
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.settings.base_url, model, self.settings.api_key
        );
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        let api_response: GenerateResponse =
            response.json().await.map_err(|e| ProviderError::ParseError {
                message: format!("Failed to parse API response: {}", e),
            })?;

        let candidate = api_response.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::ParseError {
                message: "No candidates in API response".to_string(),
            }
        })?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ProviderError::ParseError {
                message: "Empty candidate content in API response".to_string(),
            });
        }
        Ok(text)
    }
}

fn flatten_prompt(prompt: &Prompt) -> String {
    match &prompt.system {
        Some(system) => format!("{system}\n\n{}", prompt.user),
        None => prompt.user.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_joins_instruction_blank_line_content() {
        let prompt = Prompt::with_system("You are wise.", "Reverse a string.");
        assert_eq!(flatten_prompt(&prompt), "You are wise.\n\nReverse a string.");
    }

    #[test]
    fn flatten_without_system_is_the_user_text() {
        let prompt = Prompt::user("Reverse a string.");
        assert_eq!(flatten_prompt(&prompt), "Reverse a string.");
    }
}
