use anyhow::Error;
use colored::*;

use crate::aggregate::AnswerSet;
use crate::providers::ProviderError;
use crate::strategies::duopoly::{Speaker, Utterance};
use crate::strategies::{ArchitectureKind, Phase};

const SNIPPET_LEN: usize = 300;

/// Truncate long model output for console display. Full text still lands in
/// the transcript and the report.
fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let cut: String = chars.by_ref().take(SNIPPET_LEN).collect();
    if chars.next().is_some() {
        format!("{cut}…")
    } else {
        cut
    }
}

pub fn display_welcome() {
    println!("{}", "👑 Model Council".bright_blue().bold());
    println!(
        "{}",
        "Three deliberation architectures (democracy, duopoly, king) pit OpenAI, Mistral and Gemini models against each other to answer one problem.".blue()
    );
    println!(
        "{}",
        "Make sure to set OPENAI_API_KEY, MISTRAL_API_KEY and GEMINI_API_KEY environment variables.\n".blue()
    );
}

pub fn display_problem(problem: &str) {
    println!("\n{}", "🧩 Problem Statement".bright_yellow().bold());
    println!(
        "{}",
        "┌─────────────────────────────────────────────────────────────".yellow()
    );
    for line in problem.lines() {
        println!("{} {}", "│".yellow(), line.white());
    }
    println!(
        "{}",
        "└─────────────────────────────────────────────────────────────\n".yellow()
    );
}

pub fn display_phase_start(phase: Phase) {
    println!(
        "\n{}",
        format!("💡 --- {} --- 💡", phase.title()).bright_yellow().bold()
    );
}

pub fn display_phase_complete(phase: Phase) {
    println!(
        "{}",
        format!("✅ --- {}: complete --- ✅", phase.title()).bright_green()
    );
}

pub fn display_answers(phase: Phase, answers: &AnswerSet) {
    let heading = match phase {
        Phase::Solutions => "📋 Proposed solutions",
        Phase::Votes => "🗳️  Votes cast",
        Phase::Advisors => "🧠 Advisors' opinions",
        _ => "📋 Responses",
    };
    println!("\n{}", heading.bright_cyan().bold());
    println!(
        "{}",
        "┌─────────────────────────────────────────────────────────────".cyan()
    );
    for answer in answers.iter() {
        let icon = if answer.outcome.is_answered() {
            "✔".bright_green()
        } else {
            "✖".bright_red()
        };
        println!(
            "{} {} {}",
            "│".cyan(),
            icon,
            answer.model.bright_white().bold()
        );
        for line in snippet(&answer.prompt_text()).lines() {
            println!("{}   {}", "│".cyan(), line.white());
        }
    }
    println!(
        "{}",
        "└─────────────────────────────────────────────────────────────\n".cyan()
    );
}

pub fn display_debate_turn(utterance: &Utterance) {
    let header = format!(
        "💬 Turn {}, {} said:",
        utterance.turn + 1,
        utterance.model
    );
    let header = match utterance.speaker {
        Speaker::OracleOne => header.bright_yellow().bold(),
        Speaker::OracleTwo => header.bright_cyan().bold(),
    };
    println!("\n{header}");
    for line in snippet(&utterance.text).lines() {
        println!("  {}", line.white());
    }
}

pub fn display_final(kind: ArchitectureKind, answer: &str) {
    println!(
        "\n{}",
        format!("🏆 --- Final Answer from the {} Architecture --- 🏆", kind.label())
            .bright_green()
            .bold()
    );
    println!(
        "{}",
        "┌─────────────────────────────────────────────────────────────".green()
    );
    for line in answer.lines() {
        println!("{} {}", "│".green(), line.white());
    }
    println!(
        "{}",
        "└─────────────────────────────────────────────────────────────\n".green()
    );
}

pub fn display_error(error: &Error) {
    // A provider fault may sit behind a synthesis or setup error; walk the
    // chain so its tip still gets shown
    let provider_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ProviderError>());
    if let Some(provider_error) = provider_error {
        display_provider_error(provider_error);
    } else {
        println!(
            "{} {}",
            "❌ Error:".bright_red().bold(),
            error.to_string().red()
        );
        println!(
            "{}",
            "Please check your configuration and try again.\n".red()
        );
    }
}

pub fn display_provider_error(error: &ProviderError) {
    let user_message = error.user_message();
    match error {
        ProviderError::ServerBusy => {
            println!("{}", user_message.bright_yellow().bold());
            println!(
                "{}",
                "💡 Tip: Try again in a few minutes when server load is lower.".yellow()
            );
        }
        ProviderError::NetworkError { .. } => {
            println!("{}", user_message.bright_red().bold());
            println!(
                "{}",
                "💡 Tip: Check your internet connection and firewall settings.".red()
            );
        }
        ProviderError::Timeout { .. } => {
            println!("{}", user_message.bright_yellow().bold());
            println!(
                "{}",
                "💡 Tip: The server might be overloaded. Try again later.".yellow()
            );
        }
        ProviderError::ApiError { status, .. } => {
            println!("{}", user_message.bright_red().bold());
            match *status {
                401 => println!(
                    "{}",
                    "💡 Tip: Check your OPENAI_API_KEY, MISTRAL_API_KEY and GEMINI_API_KEY environment variables.".red()
                ),
                403 => println!(
                    "{}",
                    "💡 Tip: Your API key may not have sufficient permissions.".red()
                ),
                429 => println!(
                    "{}",
                    "💡 Tip: You've hit the rate limit. Wait before trying again.".red()
                ),
                _ => println!(
                    "{}",
                    "💡 Tip: Check the provider's API documentation for more details.".red()
                ),
            }
        }
        ProviderError::ParseError { .. } => {
            println!("{}", user_message.bright_magenta().bold());
            println!(
                "{}",
                "💡 Tip: The server response was unexpected. Try rephrasing your query.".magenta()
            );
        }
        ProviderError::ConfigError { .. } => {
            println!("{}", user_message.bright_red().bold());
            println!(
                "{}",
                "💡 Tip: Check your environment variables and configuration.".red()
            );
        }
    }
    println!();
}

pub fn display_goodbye() {
    println!("{}", "👋 Goodbye!".bright_yellow().bold());
}
