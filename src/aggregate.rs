use std::future::Future;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::warn;

use crate::strategies::{DeliberationObserver, Phase};
use crate::types::{CallOutcome, ModelSpec};

/// One model's contribution to a phase
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Display name of the model that produced (or failed to produce) it
    pub model: String,
    pub outcome: CallOutcome,
}

impl Answer {
    /// Text as it appears in downstream prompts: the answer itself, or the
    /// fixed unavailability annotation for failed calls
    pub fn prompt_text(&self) -> String {
        self.outcome.as_text(&self.model)
    }
}

/// Ordered set of per-model outcomes for one phase. Entry order always
/// follows roster order, never completion order, so every prompt built from
/// a set is deterministic across runs.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSet {
    entries: Vec<Answer>,
}

impl AnswerSet {
    pub(crate) fn from_entries(entries: Vec<Answer>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.entries.iter()
    }

    /// How many entries actually carry an answer
    pub fn answered_count(&self) -> usize {
        self.entries.iter().filter(|a| a.outcome.is_answered()).count()
    }

    /// Join entries as `"<label> from <name>:\n<content>"` blocks separated
    /// by a blank line, in set order. This textual join is the only channel
    /// through which one phase's outputs reach the next prompt.
    pub fn render(&self, label: &str) -> String {
        self.entries
            .iter()
            .map(|answer| format!("{} from {}:\n{}", label, answer.model, answer.prompt_text()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Query every roster entry concurrently and return exactly one entry per
/// model, stabilized to roster order. A panicked task degrades to a failed
/// entry; the set size is always `roster.len()`.
pub async fn collect<F, Fut>(
    phase: Phase,
    roster: &[ModelSpec],
    invoke: F,
    observer: &dyn DeliberationObserver,
) -> AnswerSet
where
    F: Fn(ModelSpec) -> Fut,
    Fut: Future<Output = CallOutcome> + Send + 'static,
{
    observer.on_phase_start(phase, roster.len());

    let mut join_set = JoinSet::new();
    for (index, spec) in roster.iter().enumerate() {
        let future = invoke(spec.clone());
        join_set.spawn(async move { (index, future.await) });
    }

    let mut outcomes: Vec<Option<CallOutcome>> = vec![None; roster.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                observer.on_model_done(phase, &roster[index].name, outcome.is_answered());
                outcomes[index] = Some(outcome);
            }
            Err(e) => {
                warn!("A {phase} task did not complete: {e}");
            }
        }
    }

    let entries = roster
        .iter()
        .zip(outcomes)
        .map(|(spec, outcome)| Answer {
            model: spec.name.clone(),
            outcome: outcome
                .unwrap_or_else(|| CallOutcome::failed("task aborted before completion")),
        })
        .collect();

    observer.on_phase_complete(phase);
    AnswerSet::from_entries(entries)
}
