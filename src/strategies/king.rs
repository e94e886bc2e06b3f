use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::aggregate::AnswerSet;
use crate::gateway::ModelGateway;
use crate::types::{ModelSpec, Prompt, ProviderKind};

use super::{
    ensure_usable, fan_out, synthesize, Architecture, ArchitectureKind, DeliberationObserver,
    Phase, StrategyError, UNAVAILABLE_NOTE,
};

const KING_SYSTEM: &str = "You are a wise and knowledgeable coder and problem solver king who \
     provides thoughtful answers to questions. You have several advisors who have provided \
     their input on the problem. Consider their perspectives and advice, but ultimately provide \
     your own well-reasoned response. If some advisors were more helpful than others, feel free \
     to acknowledge their contributions.";

/// The full advisory council heard before the king rules
pub fn king_advisors() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(ProviderKind::OpenAi, "gpt-4o", "GPT-4o (OpenAI)"),
        ModelSpec::new(ProviderKind::OpenAi, "gpt-4-turbo", "GPT-4 Turbo (OpenAI)"),
        ModelSpec::new(
            ProviderKind::Mistral,
            "open-mixtral-8x22b",
            "Mixtral 8x22B (Mistral)",
        ),
        ModelSpec::new(
            ProviderKind::Mistral,
            "mistral-large-latest",
            "Mistral Large (Mistral)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemini-2.0-pro-exp-02-05",
            "Gemini 2.0 Pro (Google)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemini-2.5-pro-exp-03-25",
            "Gemini 2.5 Pro (Google)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemini-2.5-flash-preview-04-17-thinking",
            "Gemini 2.5 Flash (Google)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemma-3-27b-it",
            "Gemma 3 27B (Google)",
        ),
    ]
}

fn default_authority() -> ModelSpec {
    ModelSpec::new(ProviderKind::OpenAi, "gpt-4o", "King GPT-4o")
}

/// Every advisor answers once, then a single authority model weighs the
/// advice and issues the ruling
pub struct King {
    gateway: Arc<ModelGateway>,
    advisors: Vec<ModelSpec>,
    authority: ModelSpec,
}

impl King {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            advisors: king_advisors(),
            authority: default_authority(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KingOutcome {
    pub advice: AnswerSet,
    pub final_answer: String,
}

fn build_rule_prompt(problem: &str, advice: &AnswerSet) -> String {
    let example = advice
        .iter()
        .next()
        .map(|a| a.model.as_str())
        .unwrap_or("<advisor>");
    let mut prompt = format!(
        "Advisors' Advice:\n{}\n\n\
         Problem: {problem}\n\n\
         Based on all the ADVISORS' ADVICE and the original PROBLEM, provide your comprehensive, \
         step-by-step solution. Acknowledge helpful contributions from specific advisors if \
         appropriate by referencing their names (e.g., 'As {example} pointed out, ...').",
        advice.render("Advice"),
    );
    if advice.answered_count() < advice.len() {
        prompt.push_str("\n\n");
        prompt.push_str(UNAVAILABLE_NOTE);
    }
    prompt
}

#[async_trait]
impl Architecture for King {
    type Outcome = KingOutcome;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::King
    }

    async fn deliberate(
        &self,
        problem: &str,
        observer: &dyn DeliberationObserver,
    ) -> Result<KingOutcome, StrategyError> {
        info!(
            "King: {} advisors report to {}",
            self.advisors.len(),
            self.authority.name
        );

        let advice = fan_out(
            &self.gateway,
            Phase::Advisors,
            &self.advisors,
            &Prompt::user(problem),
            observer,
        )
        .await;
        observer.on_answers(Phase::Advisors, &advice);
        ensure_usable(Phase::Advisors, &advice)?;
        info!(
            "King: {}/{} advisors answered",
            advice.answered_count(),
            advice.len()
        );

        let final_answer = synthesize(
            &self.gateway,
            Phase::Rule,
            &self.authority,
            &Prompt::with_system(KING_SYSTEM, build_rule_prompt(problem, &advice)),
            observer,
        )
        .await?;

        Ok(KingOutcome {
            advice,
            final_answer,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::aggregate::Answer;
    use crate::config::{Config, ProviderSettings};
    use crate::strategies::NoObserver;
    use crate::types::CallOutcome;

    #[test]
    fn rule_prompt_names_every_advisor_and_quotes_the_problem() {
        let advice = AnswerSet::from_entries(vec![
            Answer {
                model: "First Advisor".to_string(),
                outcome: CallOutcome::answered("sort the input"),
            },
            Answer {
                model: "Second Advisor".to_string(),
                outcome: CallOutcome::failed("rate limited"),
            },
        ]);
        let prompt = build_rule_prompt("Find the median.", &advice);

        assert!(prompt.contains("Advice from First Advisor:\nsort the input"));
        assert!(prompt.contains(
            "Advice from Second Advisor:\n[unavailable] No response from Second Advisor"
        ));
        assert!(prompt.contains("Problem: Find the median."));
        assert!(prompt.contains("'As First Advisor pointed out, ...'"));
        assert!(prompt.contains(UNAVAILABLE_NOTE));
    }

    fn config_for(uri: &str) -> Config {
        let settings = |key: &str| ProviderSettings {
            api_key: key.to_string(),
            base_url: uri.to_string(),
        };
        Config {
            openai: settings("test-key"),
            mistral: settings("test-key"),
            gemini: settings("test-key"),
            timeout: 5,
            max_tokens: 256,
            temperature: 0.3,
        }
    }

    fn chat_completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[tokio::test]
    async fn a_silent_advisor_is_annotated_in_the_kings_briefing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-adv"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion("binary search works")),
            )
            .mount(&server)
            .await;
        // The Gemini advisor never answers
        Mock::given(method("POST"))
            .and(path("/models/test-g:generateContent"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-king"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("So it is decided.")))
            .mount(&server)
            .await;

        let gateway = Arc::new(ModelGateway::new(&config_for(&server.uri())).unwrap());
        let strategy = King {
            gateway,
            advisors: vec![
                ModelSpec::new(ProviderKind::OpenAi, "model-adv", "Stable Advisor"),
                ModelSpec::new(ProviderKind::Gemini, "models/test-g", "Gemini Advisor"),
            ],
            authority: ModelSpec::new(ProviderKind::OpenAi, "model-king", "The King"),
        };

        let outcome = strategy
            .deliberate("Search a sorted list.", &NoObserver)
            .await
            .unwrap();

        assert_eq!(outcome.final_answer, "So it is decided.");
        assert_eq!(outcome.advice.len(), 2);
        assert_eq!(outcome.advice.answered_count(), 1);

        let requests = server.received_requests().await.unwrap();
        let king_body = requests
            .iter()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .find(|body| body.contains("model-king"))
            .unwrap();
        assert!(king_body.contains("binary search works"));
        assert!(king_body.contains("[unavailable] No response from Gemini Advisor"));
        assert!(king_body.contains("Search a sorted list."));
    }

    #[tokio::test]
    async fn a_failed_ruling_is_a_synthesis_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-adv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("advice")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-king"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = Arc::new(ModelGateway::new(&config_for(&server.uri())).unwrap());
        let strategy = King {
            gateway,
            advisors: vec![ModelSpec::new(
                ProviderKind::OpenAi,
                "model-adv",
                "Stable Advisor",
            )],
            authority: ModelSpec::new(ProviderKind::OpenAi, "model-king", "The King"),
        };

        let err = strategy
            .deliberate("Search a sorted list.", &NoObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Synthesis { ref model, .. } if model == "The King"
        ));
    }
}
