use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod gemini;
pub mod mistral;
pub mod openai;

pub use gemini::GeminiClient;
pub use mistral::MistralClient;
pub use openai::OpenAiClient;

/// Custom error types shared by all provider bindings
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider servers are currently busy. Please try again in a few moments.")]
    ServerBusy,

    #[error("Network connection failed: {message}")]
    NetworkError { message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {message}")]
    ParseError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl ProviderError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::ServerBusy => {
                "🚫 The provider's servers are currently busy. Please try again in a few moments."
                    .to_string()
            }
            ProviderError::NetworkError { .. } => {
                "🌐 Network connection failed. Please check your internet connection and try again."
                    .to_string()
            }
            ProviderError::Timeout { seconds } => {
                format!(
                    "⏰ Request timed out after {} seconds. The server might be overloaded.",
                    seconds
                )
            }
            ProviderError::ApiError { status, .. } => match *status {
                429 => {
                    "🚫 Rate limit exceeded. Please wait a moment before trying again.".to_string()
                }
                503 => "🚫 Service temporarily unavailable. Please try again later.".to_string(),
                502 | 504 => {
                    "🚫 Server gateway error. Please try again in a few moments.".to_string()
                }
                _ => format!("❌ API error ({}). Please try again later.", status),
            },
            ProviderError::ParseError { .. } => {
                "⚠️ Failed to parse server response. Please try again.".to_string()
            }
            ProviderError::ConfigError { message } => {
                format!("⚙️ Configuration error: {}", message)
            }
        }
    }
}

/// Chat message in the role-list protocol spoken by OpenAI and Mistral
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChatMessage,
}

/// Build the shared reqwest client every binding uses
pub(crate) fn build_http_client(timeout: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .user_agent("model_council/0.1.0")
        .build()
        .map_err(|e| ProviderError::ConfigError {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Map reqwest errors to our custom error types
pub(crate) fn map_reqwest_error(error: reqwest::Error, timeout: u64) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout { seconds: timeout };
    }

    if error.is_connect() {
        return ProviderError::NetworkError {
            message: "Failed to connect to server".to_string(),
        };
    }

    if error.is_request() {
        return ProviderError::NetworkError {
            message: "Request failed".to_string(),
        };
    }

    // Check for specific network-related errors
    let error_msg = error.to_string().to_lowercase();
    if error_msg.contains("dns") {
        return ProviderError::NetworkError {
            message: "DNS resolution failed".to_string(),
        };
    }

    if error_msg.contains("connection refused") {
        return ProviderError::NetworkError {
            message: "Connection refused by server".to_string(),
        };
    }

    if error_msg.contains("network") || error_msg.contains("connection") {
        return ProviderError::NetworkError {
            message: error.to_string(),
        };
    }

    ProviderError::NetworkError {
        message: format!("Request error: {}", error),
    }
}

/// Handle error responses from the server
pub(crate) async fn handle_error_response(
    status: StatusCode,
    response: reqwest::Response,
) -> ProviderError {
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::ServerBusy,
        StatusCode::SERVICE_UNAVAILABLE => ProviderError::ServerBusy,
        StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => ProviderError::ServerBusy,
        _ => ProviderError::ApiError {
            status: status.as_u16(),
            message: error_text,
        },
    }
}

/// Pull the first choice's content out of a chat-completions response
pub(crate) fn first_choice_content(response: ChatResponse) -> Result<String, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ParseError {
            message: "No choices in API response".to_string(),
        })?;

    if choice.message.content.is_empty() {
        return Err(ProviderError::ParseError {
            message: "Empty content in API response".to_string(),
        });
    }
    Ok(choice.message.content)
}
