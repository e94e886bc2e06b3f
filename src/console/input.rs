use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Read one line from stdin (async) and return it trimmed
pub async fn get_user_input() -> Result<String> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

/// Print a prompt without a trailing newline, flush, then read the reply
pub async fn prompt_user(prompt_text: &str) -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt_text.as_bytes()).await?;
    stdout.flush().await?;
    get_user_input().await
}

/// Check if the input is a quit command
pub fn is_quit_command(input_text: &str) -> bool {
    matches!(input_text.trim().to_lowercase().as_str(), "/quit" | "/exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_commands_are_case_insensitive() {
        assert!(is_quit_command("/quit"));
        assert!(is_quit_command("/EXIT"));
        assert!(is_quit_command("  /Quit  "));
        assert!(!is_quit_command("quit"));
        assert!(!is_quit_command("please /quit"));
    }
}
