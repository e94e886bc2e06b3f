use std::fmt;

use serde::{Deserialize, Serialize};

/// The three provider protocols a model can live behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Mistral => "Mistral",
            ProviderKind::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model in a roster: where it lives, what to request, and the display
/// name under which its answers are aggregated and cited in prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub id: String,
    pub name: String,
}

impl ModelSpec {
    pub fn new(provider: ProviderKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single request to one model. Immutable once built
#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            system: None,
            user: content.into(),
        }
    }

    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }
}

/// Result of one degradable model call. Failures stay tagged instead of
/// masquerading as answer text; consumers decide how to annotate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Answered { text: String },
    Failed { reason: String },
}

impl CallOutcome {
    pub fn answered(text: impl Into<String>) -> Self {
        CallOutcome::Answered { text: text.into() }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CallOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, CallOutcome::Answered { .. })
    }

    pub fn answered_text(&self) -> Option<&str> {
        match self {
            CallOutcome::Answered { text } => Some(text),
            CallOutcome::Failed { .. } => None,
        }
    }

    /// Text as it appears when this outcome is interpolated into a prompt or
    /// transcript: the answer itself, or the fixed unavailability annotation
    pub fn as_text(&self, model_name: &str) -> String {
        match self {
            CallOutcome::Answered { text } => text.clone(),
            CallOutcome::Failed { reason } => failure_annotation(model_name, reason),
        }
    }
}

/// The one fixed format under which a failed call ever appears in prose.
/// Prompts that receive annotated entries instruct models to disregard them.
pub fn failure_annotation(model_name: &str, reason: &str) -> String {
    format!("[unavailable] No response from {model_name}: {reason}")
}
