use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::aggregate::{collect, AnswerSet};
use crate::gateway::ModelGateway;
use crate::providers::ProviderError;
use crate::types::{ModelSpec, Prompt};

pub mod democracy;
pub mod duopoly;
pub mod king;

pub use democracy::Democracy;
pub use duopoly::Duopoly;
pub use king::King;

/// Which deliberation architecture drives a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureKind {
    Democracy,
    Duopoly,
    King,
}

impl ArchitectureKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArchitectureKind::Democracy => "Democracy",
            ArchitectureKind::Duopoly => "Duopoly",
            ArchitectureKind::King => "King",
        }
    }
}

impl fmt::Display for ArchitectureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Phases a strategy reports while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Solutions,
    Votes,
    Tally,
    Advisors,
    Debate,
    Summary,
    Rule,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Solutions => "solutions",
            Phase::Votes => "votes",
            Phase::Tally => "tally",
            Phase::Advisors => "advisors",
            Phase::Debate => "debate",
            Phase::Summary => "summary",
            Phase::Rule => "rule",
        }
    }

    /// Human heading used for banners and progress bars
    pub fn title(&self) -> &'static str {
        match self {
            Phase::Solutions => "Generating initial solutions",
            Phase::Votes => "Collecting votes",
            Phase::Tally => "Counting the votes",
            Phase::Advisors => "Consulting the advisors",
            Phase::Debate => "Oracle debate",
            Phase::Summary => "Summarizing the discussion",
            Phase::Rule => "The king deliberates",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// The terminal tally/summarize/rule call failed. Distinguished from a
    /// degradable per-model fault: there is no answer to fall back on.
    #[error("Synthesis call to {model} failed: {source}")]
    Synthesis {
        model: String,
        #[source]
        source: ProviderError,
    },

    #[error("Every model failed during the {phase} phase; nothing to deliberate on")]
    NoUsableAnswers { phase: Phase },
}

/// Receives lifecycle events while a strategy runs. The console observer
/// drives progress bars and narration from these; tests pass `NoObserver`.
pub trait DeliberationObserver: Send + Sync {
    fn on_phase_start(&self, _phase: Phase, _total: usize) {}
    fn on_model_done(&self, _phase: Phase, _model: &str, _ok: bool) {}
    fn on_answers(&self, _phase: Phase, _answers: &AnswerSet) {}
    fn on_debate_turn(&self, _utterance: &duopoly::Utterance) {}
    fn on_phase_complete(&self, _phase: Phase) {}
}

/// Observer that ignores every event
#[allow(dead_code)]
pub struct NoObserver;

impl DeliberationObserver for NoObserver {}

/// Common surface of the three deliberation strategies
#[async_trait]
pub trait Architecture {
    type Outcome: Serialize + Send + Sync;

    fn kind(&self) -> ArchitectureKind;

    /// Run the whole deliberation for one problem and produce its outcome,
    /// final answer included
    async fn deliberate(
        &self,
        problem: &str,
        observer: &dyn DeliberationObserver,
    ) -> Result<Self::Outcome, StrategyError>;
}

/// Appended to prompts whose rendered context contains failed entries
pub(crate) const UNAVAILABLE_NOTE: &str =
    "Note: entries marked [unavailable] received no response from their model. Disregard them.";

/// Fan one prompt out across a roster through the degrading gateway call
pub(crate) async fn fan_out(
    gateway: &Arc<ModelGateway>,
    phase: Phase,
    roster: &[ModelSpec],
    prompt: &Prompt,
    observer: &dyn DeliberationObserver,
) -> AnswerSet {
    let prompt = Arc::new(prompt.clone());
    let gateway = Arc::clone(gateway);
    collect(
        phase,
        roster,
        move |spec| {
            let gateway = Arc::clone(&gateway);
            let prompt = Arc::clone(&prompt);
            async move { gateway.invoke(&spec, &prompt).await }
        },
        observer,
    )
    .await
}

/// Run a single synthesis call through the strict gateway path, reporting it
/// to the observer as a one-entry phase
pub(crate) async fn synthesize(
    gateway: &ModelGateway,
    phase: Phase,
    model: &ModelSpec,
    prompt: &Prompt,
    observer: &dyn DeliberationObserver,
) -> Result<String, StrategyError> {
    observer.on_phase_start(phase, 1);
    let result = gateway.try_invoke(model, prompt).await;
    observer.on_model_done(phase, &model.name, result.is_ok());
    observer.on_phase_complete(phase);
    result.map_err(|source| StrategyError::Synthesis {
        model: model.name.clone(),
        source,
    })
}

/// A phase where every single model failed leaves nothing to deliberate on
pub(crate) fn ensure_usable(phase: Phase, answers: &AnswerSet) -> Result<(), StrategyError> {
    if answers.answered_count() == 0 {
        return Err(StrategyError::NoUsableAnswers { phase });
    }
    Ok(())
}
