use std::fmt;

use tracing::{debug, warn};

use crate::config::Config;
use crate::providers::{GeminiClient, MistralClient, OpenAiClient, ProviderError};
use crate::types::{CallOutcome, ModelSpec, Prompt, ProviderKind};

/// Uniform call surface over the three provider bindings. Clients are built
/// once from validated configuration and reused for every call in a run.
pub struct ModelGateway {
    openai: OpenAiClient,
    mistral: MistralClient,
    gemini: GeminiClient,
}

impl fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelGateway")
            .field("openai", &self.openai)
            .field("mistral", &self.mistral)
            .field("gemini", &self.gemini)
            .finish()
    }
}

impl ModelGateway {
    /// Build the three provider clients from validated configuration
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        config.validate().map_err(|e| ProviderError::ConfigError {
            message: e.to_string(),
        })?;

        Ok(Self {
            openai: OpenAiClient::new(config.openai.clone(), config)?,
            mistral: MistralClient::new(config.mistral.clone(), config)?,
            gemini: GeminiClient::new(config.gemini.clone(), config)?,
        })
    }

    /// Strict call used for synthesis steps: failures surface to the caller
    pub async fn try_invoke(
        &self,
        spec: &ModelSpec,
        prompt: &Prompt,
    ) -> Result<String, ProviderError> {
        debug!("Invoking {} via {}", spec.name, spec.provider);
        match spec.provider {
            ProviderKind::OpenAi => self.openai.chat(&spec.id, prompt).await,
            ProviderKind::Mistral => self.mistral.chat(&spec.id, prompt).await,
            ProviderKind::Gemini => self.gemini.generate(&spec.id, prompt).await,
        }
    }

    /// Degrading call used for fan-out phases: a provider failure becomes a
    /// `Failed` outcome and the deliberation continues without this model
    pub async fn invoke(&self, spec: &ModelSpec, prompt: &Prompt) -> CallOutcome {
        match self.try_invoke(spec, prompt).await {
            Ok(text) => CallOutcome::answered(text),
            Err(e) => {
                warn!("Call to {} failed: {}", spec.name, e);
                CallOutcome::failed(e.to_string())
            }
        }
    }
}
