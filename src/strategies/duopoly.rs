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

const SUMMARIZER_SYSTEM: &str = "You are an expert at looking at a conversation between two \
     smart oracles and extracting the best answer to a problem from the conversation.";

/// Which oracle holds the floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    OracleOne,
    OracleTwo,
}

/// Even turns belong to the first oracle, odd turns to the second
pub fn next_speaker(turn: usize) -> Speaker {
    if turn % 2 == 0 {
        Speaker::OracleOne
    } else {
        Speaker::OracleTwo
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Utterance {
    pub turn: usize,
    pub speaker: Speaker,
    pub model: String,
    pub text: String,
}

/// Append-only record of the oracle exchange
#[derive(Debug, Default, Serialize)]
pub struct DebateLog {
    entries: Vec<Utterance>,
}

impl DebateLog {
    pub fn push(&mut self, utterance: Utterance) {
        self.entries.push(utterance);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last()
    }

    /// Transcript for the summarizer, one line per utterance
    pub fn joined(&self) -> String {
        self.iter()
            .map(|u| format!("{} said: {}", u.model, u.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The three advisors consulted before the oracles start arguing
pub fn duopoly_advisors() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(
            ProviderKind::OpenAi,
            "gpt-4-turbo-preview",
            "GPT-4 Turbo Preview (OpenAI)",
        ),
        ModelSpec::new(
            ProviderKind::Mistral,
            "mistral-small-latest",
            "Mistral Small (Mistral)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemini-1.5-flash-latest",
            "Gemini 1.5 Flash (Google)",
        ),
    ]
}

fn default_oracle_one() -> ModelSpec {
    ModelSpec::new(ProviderKind::OpenAi, "gpt-4o", "Oracle GPT-4o")
}

fn default_oracle_two() -> ModelSpec {
    ModelSpec::new(ProviderKind::Mistral, "open-mixtral-8x22b", "Oracle Mixtral")
}

fn default_summarizer() -> ModelSpec {
    ModelSpec::new(ProviderKind::OpenAi, "gpt-4-turbo", "Summarizer GPT-4 Turbo")
}

/// Advisors brief two oracles, the oracles argue for a fixed number of
/// exchanges, and a summarizer distills the discussion into the answer
pub struct Duopoly {
    gateway: Arc<ModelGateway>,
    advisors: Vec<ModelSpec>,
    oracle_one: ModelSpec,
    oracle_two: ModelSpec,
    summarizer: ModelSpec,
    exchanges: usize,
}

impl Duopoly {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            advisors: duopoly_advisors(),
            oracle_one: default_oracle_one(),
            oracle_two: default_oracle_two(),
            summarizer: default_summarizer(),
            exchanges: 3,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DuopolyOutcome {
    pub advice: AnswerSet,
    pub debate: DebateLog,
    pub final_answer: String,
}

fn oracle_system(me: &str, other: &str, problem: &str) -> String {
    format!(
        "You are {me}, a wise and knowledgeable coder and problem solver expert. Discuss and \
         push back at {other}, challenge their suggestions, and evaluate the best solutions \
         based on context from other advisors and the problem: {problem}"
    )
}

fn build_opening_prompt(one: &str, two: &str, problem: &str, advice: &AnswerSet) -> String {
    let mut prompt = format!(
        "ADVISORS' INSIGHTS:\n{}\n\n\
         Hello {one} and {two}. Let's discuss and find a solution to the PROBLEM while \
         challenging each other and taking the ADVISORS' INSIGHTS into consideration. Solve the \
         PROBLEM: {problem}",
        advice.render("Insight"),
    );
    if advice.answered_count() < advice.len() {
        prompt.push_str("\n\n");
        prompt.push_str(UNAVAILABLE_NOTE);
    }
    prompt
}

fn build_turn_prompt(me: &str, other: &str, previous: &str) -> String {
    format!(
        "{other} previously said: {previous}\n\n\
         Now, {me}, please respond considering the ongoing discussion, the initial advisors' \
         insights, and the problem."
    )
}

fn build_summary_prompt(
    one: &str,
    two: &str,
    problem: &str,
    advice: &AnswerSet,
    log: &DebateLog,
) -> String {
    format!(
        "Based on the following discussion between {one} and {two}, and the initial advisors' \
         insights, provide a comprehensive final answer to the original problem: {problem}\n\n\
         ADVISORS' INSIGHTS:\n{}\n\n\
         Full Discussion:\n{}",
        advice.render("Insight"),
        log.joined(),
    )
}

#[async_trait]
impl Architecture for Duopoly {
    type Outcome = DuopolyOutcome;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::Duopoly
    }

    async fn deliberate(
        &self,
        problem: &str,
        observer: &dyn DeliberationObserver,
    ) -> Result<DuopolyOutcome, StrategyError> {
        info!(
            "Duopoly: {} advisors brief {} and {}",
            self.advisors.len(),
            self.oracle_one.name,
            self.oracle_two.name
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

        let one = self.oracle_one.name.as_str();
        let two = self.oracle_two.name.as_str();
        let system_one = oracle_system(one, two, problem);
        let system_two = oracle_system(two, one, problem);
        let opening = build_opening_prompt(one, two, problem, &advice);

        let total_turns = self.exchanges * 2;
        let mut log = DebateLog::default();
        observer.on_phase_start(Phase::Debate, total_turns);
        for turn in 0..total_turns {
            let speaker = next_speaker(turn);
            let (spec, system, other) = match speaker {
                Speaker::OracleOne => (&self.oracle_one, &system_one, two),
                Speaker::OracleTwo => (&self.oracle_two, &system_two, one),
            };
            let user = match log.last() {
                None => opening.clone(),
                Some(previous) => build_turn_prompt(&spec.name, other, &previous.text),
            };
            let outcome = self
                .gateway
                .invoke(spec, &Prompt::with_system(system.clone(), user))
                .await;
            observer.on_model_done(Phase::Debate, &spec.name, outcome.is_answered());
            let utterance = Utterance {
                turn,
                speaker,
                model: spec.name.clone(),
                text: outcome.as_text(&spec.name),
            };
            observer.on_debate_turn(&utterance);
            log.push(utterance);
        }
        observer.on_phase_complete(Phase::Debate);
        info!("Duopoly: debate closed after {} turns", log.len());

        let final_answer = synthesize(
            &self.gateway,
            Phase::Summary,
            &self.summarizer,
            &Prompt::with_system(
                SUMMARIZER_SYSTEM,
                build_summary_prompt(one, two, problem, &advice, &log),
            ),
            observer,
        )
        .await?;

        Ok(DuopolyOutcome {
            advice,
            debate: log,
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
    fn speakers_alternate_starting_with_oracle_one() {
        let order: Vec<Speaker> = (0..6).map(next_speaker).collect();
        assert_eq!(
            order,
            vec![
                Speaker::OracleOne,
                Speaker::OracleTwo,
                Speaker::OracleOne,
                Speaker::OracleTwo,
                Speaker::OracleOne,
                Speaker::OracleTwo,
            ]
        );
    }

    #[test]
    fn opening_prompt_greets_both_oracles_and_carries_the_insights() {
        let advice = AnswerSet::from_entries(vec![Answer {
            model: "Advisor".to_string(),
            outcome: CallOutcome::answered("try a hash map"),
        }]);
        let prompt = build_opening_prompt("Oracle A", "Oracle B", "Count duplicates.", &advice);

        assert!(prompt.contains("Hello Oracle A and Oracle B."));
        assert!(prompt.contains("Insight from Advisor:\ntry a hash map"));
        assert!(prompt.contains("Solve the PROBLEM: Count duplicates."));
        assert!(!prompt.contains("[unavailable]"));
    }

    #[test]
    fn turn_prompt_quotes_the_previous_utterance() {
        let prompt = build_turn_prompt("Oracle B", "Oracle A", "use sorting instead");
        assert!(prompt.contains("Oracle A previously said: use sorting instead"));
        assert!(prompt.contains("Now, Oracle B, please respond"));
    }

    #[test]
    fn joined_transcript_keeps_utterance_order() {
        let mut log = DebateLog::default();
        for (turn, text) in ["first point", "counterpoint"].iter().enumerate() {
            log.push(Utterance {
                turn,
                speaker: next_speaker(turn),
                model: format!("Oracle {}", turn + 1),
                text: text.to_string(),
            });
        }
        assert_eq!(
            log.joined(),
            "Oracle 1 said: first point\nOracle 2 said: counterpoint"
        );
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
    async fn debate_runs_six_turns_and_feeds_the_summarizer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-advisor"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion("Advice text Alpha")),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-o1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("O1 position")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-o2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("O2 rebuttal")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-sum"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_completion("Final synthesis")),
            )
            .mount(&server)
            .await;

        let gateway = Arc::new(ModelGateway::new(&config_for(&server.uri())).unwrap());
        let strategy = Duopoly {
            gateway,
            advisors: vec![ModelSpec::new(
                ProviderKind::OpenAi,
                "model-advisor",
                "Advisor",
            )],
            oracle_one: ModelSpec::new(ProviderKind::OpenAi, "model-o1", "Oracle A"),
            oracle_two: ModelSpec::new(ProviderKind::Mistral, "model-o2", "Oracle B"),
            summarizer: ModelSpec::new(ProviderKind::OpenAi, "model-sum", "Summarizer"),
            exchanges: 3,
        };

        let outcome = strategy
            .deliberate("Count duplicates fast.", &NoObserver)
            .await
            .unwrap();

        assert_eq!(outcome.final_answer, "Final synthesis");
        assert_eq!(outcome.debate.len(), 6);
        for (turn, utterance) in outcome.debate.iter().enumerate() {
            assert_eq!(utterance.turn, turn);
            assert_eq!(utterance.speaker, next_speaker(turn));
            let expected = if turn % 2 == 0 { "Oracle A" } else { "Oracle B" };
            assert_eq!(utterance.model, expected);
        }

        let requests = server.received_requests().await.unwrap();
        let bodies: Vec<String> = requests
            .iter()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .collect();

        // Opening turn greets both oracles and includes the advice
        let first_o1 = bodies
            .iter()
            .find(|b| b.contains("model-o1"))
            .unwrap();
        assert!(first_o1.contains("Hello Oracle A and Oracle B."));
        assert!(first_o1.contains("Advice text Alpha"));

        // Later turns quote what the other oracle just said
        assert!(bodies
            .iter()
            .any(|b| b.contains("model-o1") && b.contains("previously said: O2 rebuttal")));
        assert!(bodies
            .iter()
            .any(|b| b.contains("model-o2") && b.contains("previously said: O1 position")));

        // The summarizer sees the advice and the whole transcript
        let summary_body = bodies.iter().find(|b| b.contains("model-sum")).unwrap();
        assert!(summary_body.contains("Advice text Alpha"));
        assert!(summary_body.contains("Oracle A said: O1 position"));
        assert!(summary_body.contains("Oracle B said: O2 rebuttal"));
    }

    #[tokio::test]
    async fn a_failed_turn_is_logged_and_the_debate_continues() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-advisor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("some advice")))
            .mount(&server)
            .await;
        // Oracle A never answers
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-o1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-o2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("O2 carries on")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("model-sum"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("wrap-up")))
            .mount(&server)
            .await;

        let gateway = Arc::new(ModelGateway::new(&config_for(&server.uri())).unwrap());
        let strategy = Duopoly {
            gateway,
            advisors: vec![ModelSpec::new(
                ProviderKind::OpenAi,
                "model-advisor",
                "Advisor",
            )],
            oracle_one: ModelSpec::new(ProviderKind::OpenAi, "model-o1", "Oracle A"),
            oracle_two: ModelSpec::new(ProviderKind::Mistral, "model-o2", "Oracle B"),
            summarizer: ModelSpec::new(ProviderKind::OpenAi, "model-sum", "Summarizer"),
            exchanges: 3,
        };

        let outcome = strategy
            .deliberate("Count duplicates.", &NoObserver)
            .await
            .unwrap();

        assert_eq!(outcome.debate.len(), 6);
        let first = outcome.debate.iter().next().unwrap();
        assert!(first.text.starts_with("[unavailable] No response from Oracle A"));
        // Oracle B's first turn answers the annotation, not a silence
        let second = outcome.debate.iter().nth(1).unwrap();
        assert_eq!(second.text, "O2 carries on");
        assert_eq!(outcome.final_answer, "wrap-up");
    }
}
