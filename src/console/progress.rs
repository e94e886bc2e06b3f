use std::sync::Mutex;

use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::aggregate::AnswerSet;
use crate::strategies::duopoly::Utterance;
use crate::strategies::{DeliberationObserver, Phase};

use super::render;

/// Observer that narrates a deliberation run with progress bars. Banner and
/// answer output goes through `MultiProgress::suspend` so it never tears an
/// active bar.
pub struct ConsoleObserver {
    multi: MultiProgress,
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bar: Mutex::new(None),
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliberationObserver for ConsoleObserver {
    fn on_phase_start(&self, phase: Phase, total: usize) {
        self.multi.suspend(|| render::display_phase_start(phase));
        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(Self::phase_style());
        bar.set_prefix(phase.title());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_model_done(&self, _phase: Phase, model: &str, ok: bool) {
        if let Ok(guard) = self.bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            let status = if ok {
                format!("{} {}", "✔".bright_green(), model)
            } else {
                format!("{} {}", "✖".bright_red(), model)
            };
            bar.set_message(status);
            bar.inc(1);
        }
    }

    fn on_answers(&self, phase: Phase, answers: &AnswerSet) {
        self.multi.suspend(|| render::display_answers(phase, answers));
    }

    fn on_debate_turn(&self, utterance: &Utterance) {
        self.multi.suspend(|| render::display_debate_turn(utterance));
    }

    fn on_phase_complete(&self, phase: Phase) {
        if let Ok(mut guard) = self.bar.lock()
            && let Some(bar) = guard.take()
        {
            bar.finish_with_message("complete".green().to_string());
        }
        self.multi.suspend(|| render::display_phase_complete(phase));
    }
}
