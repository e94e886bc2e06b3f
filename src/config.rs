use std::env;

use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Errors raised while loading or validating the runtime configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variables: {vars}")]
    MissingCredentials { vars: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Connection settings for a single provider
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
}

/// Runtime configuration: credentials and endpoints for the three providers
/// plus request knobs shared by every client
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: ProviderSettings,
    pub mistral: ProviderSettings,
    pub gemini: ProviderSettings,
    /// Request timeout in seconds, shared by every provider client
    pub timeout: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Config {
    /// Load configuration from the environment. Call after `dotenv`.
    ///
    /// All three API keys are required; a run must not start with a credential
    /// missing only to fail halfway through a deliberation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let openai_key = required_var("OPENAI_API_KEY", &mut missing);
        let mistral_key = required_var("MISTRAL_API_KEY", &mut missing);
        let gemini_key = required_var("GEMINI_API_KEY", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials {
                vars: missing.join(", "),
            });
        }

        let config = Self {
            openai: ProviderSettings {
                api_key: openai_key,
                base_url: var_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            },
            mistral: ProviderSettings {
                api_key: mistral_key,
                base_url: var_or("MISTRAL_BASE_URL", DEFAULT_MISTRAL_BASE_URL),
            },
            gemini: ProviderSettings {
                api_key: gemini_key,
                base_url: var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            },
            timeout: parsed_var("COUNCIL_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            max_tokens: parsed_var("COUNCIL_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            temperature: parsed_var("COUNCIL_TEMPERATURE", DEFAULT_TEMPERATURE)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that would otherwise surface mid-run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let providers = [
            ("OpenAI", &self.openai),
            ("Mistral", &self.mistral),
            ("Gemini", &self.gemini),
        ];
        for (label, settings) in providers {
            if settings.api_key.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("{label} API key is empty"),
                });
            }
            if !settings.base_url.starts_with("http") {
                return Err(ConfigError::Invalid {
                    message: format!(
                        "{label} base URL must start with http(s), got '{}'",
                        settings.base_url
                    ),
                });
            }
        }

        if self.timeout == 0 {
            return Err(ConfigError::Invalid {
                message: "timeout must be at least 1 second".to_string(),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid {
                message: "max_tokens must be positive".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid {
                message: format!("temperature must be within 0.0..=2.0, got {}", self.temperature),
            });
        }
        Ok(())
    }
}

fn required_var(name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            message: format!("{name} must be a number, got '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        let settings = |key: &str| ProviderSettings {
            api_key: key.to_string(),
            base_url: "https://example.test/v1".to_string(),
        };
        Config {
            openai: settings("sk-openai"),
            mistral: settings("sk-mistral"),
            gemini: settings("sk-gemini"),
            timeout: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let mut config = sample_config();
        config.mistral.api_key = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Mistral API key"));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut config = sample_config();
        config.gemini.base_url = "ftp://example.test".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Gemini base URL"));
    }

    #[test]
    fn validate_rejects_zero_timeout_and_wild_temperature() {
        let mut config = sample_config();
        config.timeout = 0;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
