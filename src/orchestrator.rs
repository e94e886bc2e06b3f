use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::console::{Console, ConsoleObserver};
use crate::gateway::ModelGateway;
use crate::report;
use crate::strategies::{Architecture, ArchitectureKind, Democracy, Duopoly, King};

/// Owns the provider gateway and drives one deliberation run end to end:
/// strategy execution, console narration, transcript and report artifacts
pub struct Orchestrator {
    gateway: Arc<ModelGateway>,
}

/// Everything a run leaves behind, saved as `deliberation.json`
#[derive(Debug, Serialize)]
struct RunTranscript<'a, T: Serialize> {
    run_id: String,
    architecture: &'static str,
    problem: &'a str,
    started_at: String,
    finished_at: String,
    outcome: &'a T,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Result<Self> {
        let gateway =
            ModelGateway::new(config).context("Failed to initialize provider clients")?;
        Ok(Self {
            gateway: Arc::new(gateway),
        })
    }

    pub async fn run(&self, kind: ArchitectureKind, problem: &str, out_dir: &Path) -> Result<()> {
        info!("Running the {} architecture", kind.label());
        Console::display_problem(problem);
        let observer = ConsoleObserver::new();
        let started_at = Utc::now().to_rfc3339();

        match kind {
            ArchitectureKind::Democracy => {
                let strategy = Democracy::new(Arc::clone(&self.gateway));
                let outcome = strategy.deliberate(problem, &observer).await?;
                self.finish(kind, problem, started_at, &outcome.final_answer, &outcome, out_dir)
                    .await
            }
            ArchitectureKind::Duopoly => {
                let strategy = Duopoly::new(Arc::clone(&self.gateway));
                let outcome = strategy.deliberate(problem, &observer).await?;
                self.finish(kind, problem, started_at, &outcome.final_answer, &outcome, out_dir)
                    .await
            }
            ArchitectureKind::King => {
                let strategy = King::new(Arc::clone(&self.gateway));
                let outcome = strategy.deliberate(problem, &observer).await?;
                self.finish(kind, problem, started_at, &outcome.final_answer, &outcome, out_dir)
                    .await
            }
        }
    }

    async fn finish<T: Serialize>(
        &self,
        kind: ArchitectureKind,
        problem: &str,
        started_at: String,
        final_answer: &str,
        outcome: &T,
        out_dir: &Path,
    ) -> Result<()> {
        Console::display_final(kind, final_answer);

        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        let transcript = RunTranscript {
            run_id: Uuid::new_v4().to_string(),
            architecture: kind.label(),
            problem,
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            outcome,
        };
        let transcript_path: PathBuf = out_dir.join("deliberation.json");
        let pretty = serde_json::to_string_pretty(&transcript)?;
        tokio::fs::write(&transcript_path, pretty)
            .await
            .with_context(|| format!("Failed to write {}", transcript_path.display()))?;
        info!("Saved deliberation transcript to {}", transcript_path.display());

        let report_path = report::write_report(out_dir, kind, final_answer)
            .await
            .context("Failed to write the HTML report")?;
        info!("Saved HTML report to {}", report_path.display());

        println!(
            "Artifacts:\n  {}\n  {}",
            report_path.display(),
            transcript_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_serializes_with_the_run_envelope() {
        #[derive(Serialize)]
        struct Outcome {
            final_answer: String,
        }

        let outcome = Outcome {
            final_answer: "use a heap".to_string(),
        };
        let transcript = RunTranscript {
            run_id: Uuid::new_v4().to_string(),
            architecture: ArchitectureKind::King.label(),
            problem: "Find the k largest elements.",
            started_at: "2025-05-01T10:00:00+00:00".to_string(),
            finished_at: "2025-05-01T10:01:00+00:00".to_string(),
            outcome: &outcome,
        };

        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json["architecture"], "King");
        assert_eq!(json["problem"], "Find the k largest elements.");
        assert_eq!(json["outcome"]["final_answer"], "use a heap");
        assert!(json["run_id"].is_string());
    }
}
