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

const SOLVER_SYSTEM: &str = "You are a coder and problem solver expert.";

const VOTER_SYSTEM: &str =
    "You are an AI expert evaluating solutions. Pick the best one from the options provided.";

const COUNTER_SYSTEM: &str = "You are an impartial vote counter. Your task is to accurately \
     count the votes described in the user prompt and declare the winning solution based only on \
     the votes provided. If there is a tie, state the tied solutions and their vote counts. \
     Present the winning solution text clearly.";

/// The six voting-roster models, two per provider
pub fn democracy_roster() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(ProviderKind::OpenAi, "gpt-4o-mini", "GPT-4o mini (OpenAI)"),
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
            ProviderKind::Mistral,
            "open-mixtral-8x22b",
            "Mixtral 8x22B (Mistral)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemini-1.5-flash-latest",
            "Gemini 1.5 Flash (Google)",
        ),
        ModelSpec::new(
            ProviderKind::Gemini,
            "models/gemini-1.5-pro-latest",
            "Gemini 1.5 Pro (Google)",
        ),
    ]
}

fn default_tally_model() -> ModelSpec {
    ModelSpec::new(ProviderKind::OpenAi, "gpt-4o", "GPT-4o (OpenAI)")
}

/// Every roster model proposes a solution, the same roster votes on the
/// proposals, and a designated counter model declares the winner
pub struct Democracy {
    gateway: Arc<ModelGateway>,
    roster: Vec<ModelSpec>,
    tally_model: ModelSpec,
}

impl Democracy {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            roster: democracy_roster(),
            tally_model: default_tally_model(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DemocracyOutcome {
    pub solutions: AnswerSet,
    pub votes: AnswerSet,
    pub tally: VoteTally,
    pub final_answer: String,
}

/// Deterministic preliminary count of the votes, computed before the
/// synthesis call so the counter model confirms a count instead of
/// inventing one
#[derive(Debug, Clone, Serialize)]
pub struct VoteTally {
    /// (candidate display name, votes received), in roster order
    pub counts: Vec<(String, usize)>,
    /// Every candidate at the maximum count; more than one means a tie
    pub leaders: Vec<String>,
    /// Votes that failed, named no candidate, or named several
    pub unattributed: usize,
}

impl VoteTally {
    /// Render the computed count for inclusion in the tally prompt
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .counts
            .iter()
            .map(|(name, count)| format!("{name}: {count} vote(s)"))
            .collect();
        if self.unattributed > 0 {
            lines.push(format!("Unattributed votes: {}", self.unattributed));
        }
        if self.leaders.len() > 1 {
            lines.push(format!("Tied at the top: {}", self.leaders.join(", ")));
        }
        lines.join("\n")
    }
}

/// Count votes by unambiguous mention: a vote is attributed to a candidate
/// only when exactly one candidate display name occurs in its text
pub fn tally_votes(solutions: &AnswerSet, votes: &AnswerSet) -> VoteTally {
    let candidates: Vec<&str> = solutions.iter().map(|a| a.model.as_str()).collect();
    let mut counts: Vec<usize> = vec![0; candidates.len()];
    let mut unattributed = 0;

    for vote in votes.iter() {
        let Some(text) = vote.outcome.answered_text() else {
            unattributed += 1;
            continue;
        };
        let mentioned: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, name)| text.contains(*name))
            .map(|(index, _)| index)
            .collect();
        match mentioned.as_slice() {
            [single] => counts[*single] += 1,
            _ => unattributed += 1,
        }
    }

    let max = counts.iter().copied().max().unwrap_or(0);
    let leaders = if max == 0 {
        Vec::new()
    } else {
        candidates
            .iter()
            .zip(&counts)
            .filter(|&(_, &count)| count == max)
            .map(|(name, _)| name.to_string())
            .collect()
    };

    VoteTally {
        counts: candidates
            .into_iter()
            .map(|name| name.to_string())
            .zip(counts)
            .collect(),
        leaders,
        unattributed,
    }
}

fn build_voting_prompt(problem: &str, solutions: &AnswerSet) -> String {
    let example = solutions
        .iter()
        .next()
        .map(|a| a.model.as_str())
        .unwrap_or("<model>");
    let mut prompt = format!(
        "Review the following SOLUTION OPTIONS provided by different AI advisors to address the \
         PROBLEM. Your task is to VOTE for the single best solution option.\n\n\
         PROBLEM:\n{problem}\n\n\
         SOLUTION OPTIONS:\n{}\n\n\
         Based on your expert analysis, which of the above solution options (e.g., 'Solution \
         Option from {example}') is the best? State your chosen option clearly.",
        solutions.render("Solution Option"),
    );
    if solutions.answered_count() < solutions.len() {
        prompt.push_str("\n\n");
        prompt.push_str(UNAVAILABLE_NOTE);
    }
    prompt
}

fn build_tally_prompt(
    problem: &str,
    solutions: &AnswerSet,
    votes: &AnswerSet,
    tally: &VoteTally,
) -> String {
    format!(
        "The following solutions were proposed for the problem: '{problem}'.\n\n\
         PROPOSED SOLUTIONS:\n{}\n\n\
         Subsequently, AI advisors cast their votes for the best solution. Here are their \
         votes:\n\n\
         VOTES CAST:\n{}\n\n\
         PRELIMINARY COUNT (computed mechanically from the votes above):\n{}\n\n\
         Based on these votes, please determine which solution received the most votes. Clearly \
         state the winning solution's text and the number of votes it received. If there is a \
         tie, list all tied solutions and their vote counts.",
        solutions.render("Solution Option"),
        votes.render("Vote"),
        tally.render(),
    )
}

#[async_trait]
impl Architecture for Democracy {
    type Outcome = DemocracyOutcome;

    fn kind(&self) -> ArchitectureKind {
        ArchitectureKind::Democracy
    }

    async fn deliberate(
        &self,
        problem: &str,
        observer: &dyn DeliberationObserver,
    ) -> Result<DemocracyOutcome, StrategyError> {
        info!(
            "Democracy: {} models will solve, then vote, then be counted",
            self.roster.len()
        );

        let solutions = fan_out(
            &self.gateway,
            Phase::Solutions,
            &self.roster,
            &Prompt::with_system(SOLVER_SYSTEM, problem),
            observer,
        )
        .await;
        observer.on_answers(Phase::Solutions, &solutions);
        ensure_usable(Phase::Solutions, &solutions)?;
        info!(
            "Democracy: {}/{} solutions generated",
            solutions.answered_count(),
            solutions.len()
        );

        let votes = fan_out(
            &self.gateway,
            Phase::Votes,
            &self.roster,
            &Prompt::with_system(VOTER_SYSTEM, build_voting_prompt(problem, &solutions)),
            observer,
        )
        .await;
        observer.on_answers(Phase::Votes, &votes);
        ensure_usable(Phase::Votes, &votes)?;

        let tally = tally_votes(&solutions, &votes);
        info!(
            "Democracy: preliminary count {:?}, {} unattributed",
            tally.counts, tally.unattributed
        );

        let final_answer = synthesize(
            &self.gateway,
            Phase::Tally,
            &self.tally_model,
            &Prompt::with_system(
                COUNTER_SYSTEM,
                build_tally_prompt(problem, &solutions, &votes, &tally),
            ),
            observer,
        )
        .await?;

        Ok(DemocracyOutcome {
            solutions,
            votes,
            tally,
            final_answer,
        })
    }
}
