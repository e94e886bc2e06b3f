use anyhow::{Error, Result};
use colored::*;
use tokio::select;

use crate::strategies::ArchitectureKind;

mod input;
pub mod progress;
mod render;

pub use progress::ConsoleObserver;

/// Console interface for the council application
pub struct Console;

impl Console {
    /// Display a welcome banner
    pub fn display_welcome() {
        render::display_welcome();
    }

    /// Display the problem statement being deliberated on
    pub fn display_problem(problem: &str) {
        render::display_problem(problem);
    }

    /// Display the final answer produced by a run
    pub fn display_final(kind: ArchitectureKind, answer: &str) {
        render::display_final(kind, answer);
    }

    /// Display an error message with context-aware messaging
    pub fn display_error(error: &Error) {
        render::display_error(error);
    }

    /// Display a goodbye message
    pub fn display_goodbye() {
        render::display_goodbye();
    }

    /// Prompt the user for a problem statement. Returns `None` when the user
    /// quits or presses Ctrl+C.
    pub async fn collect_problem() -> Result<Option<String>> {
        println!(
            "{}",
            "ℹ️  Interactive mode: Enter the problem for the council to deliberate on. Type '/quit' or '/exit' to stop.".blue()
        );

        loop {
            select! {
                // Handle Ctrl+C gracefully
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    Self::display_goodbye();
                    return Ok(None);
                }
                line = input::prompt_user("🤔 Problem: ") => {
                    let line = line?;
                    if line.is_empty() {
                        continue;
                    }
                    if input::is_quit_command(&line) {
                        Self::display_goodbye();
                        return Ok(None);
                    }
                    return Ok(Some(line));
                }
            }
        }
    }
}
