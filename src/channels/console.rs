//! Console channel: a stdin/stdout adapter for local runs.
//!
//! Plays the role a chat platform adapter would: it classifies each typed
//! line into a [`UserInput`] (command, choice tap, or free text) before the
//! core sees it, and renders outbound choice lists as a plain option row.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::Agent;
use crate::channels::{Channel, Choice, Command, OutboundMessage, UserInput};
use crate::error::ChannelError;

/// Channel that prints to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

#[async_trait]
impl Channel for ConsoleChannel {
    async fn send(&self, _user_id: &str, message: &OutboundMessage) -> Result<(), ChannelError> {
        println!("{}", message.text);
        if !message.choices.is_empty() {
            let options: Vec<&str> = message.choices.iter().map(|c| c.label).collect();
            println!("  options: {}", options.join(" / "));
        }
        Ok(())
    }
}

/// Decide what a typed line means, given the choices the last prompt offered.
pub fn classify(line: &str, offered: &[Choice]) -> UserInput {
    let trimmed = line.trim();

    if trimmed.starts_with('/') {
        // Unknown slash commands fall through to help rather than being fed
        // to the questionnaire as answers.
        return UserInput::Command(Command::parse(trimmed).unwrap_or(Command::Help));
    }

    for choice in offered {
        if trimmed == choice.token || trimmed.eq_ignore_ascii_case(choice.label) {
            return UserInput::Choice(choice.token.to_string());
        }
    }

    UserInput::Text(trimmed.to_string())
}

/// Interactive loop for a single local user. Returns on EOF (Ctrl-D).
pub async fn run(agent: Arc<Agent>, user_id: &str) -> std::io::Result<()> {
    let channel = ConsoleChannel;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut offered: Vec<Choice> = Vec::new();

    println!("Vitalis console. /start to register, /help for commands, Ctrl-D to quit.");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let input = classify(&line, &offered);
        let reply = agent.handle(user_id, input).await;
        offered = reply.choices.clone();

        if let Err(e) = channel.send(user_id, &reply).await {
            tracing::warn!(user_id, error = %e, "Console send failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFERED: &[Choice] = &[
        Choice { token: "low", label: "Low" },
        Choice { token: "normal", label: "Normal" },
        Choice { token: "high", label: "High" },
    ];

    #[test]
    fn classify_commands() {
        assert_eq!(classify("/today", &[]), UserInput::Command(Command::Today));
        // Unknown slash commands route to help instead of the session.
        assert_eq!(classify("/wat", &[]), UserInput::Command(Command::Help));
    }

    #[test]
    fn classify_choice_by_token_or_label() {
        assert_eq!(
            classify("low", OFFERED),
            UserInput::Choice("low".to_string())
        );
        assert_eq!(
            classify("NORMAL", OFFERED),
            UserInput::Choice("normal".to_string())
        );
    }

    #[test]
    fn classify_free_text_when_nothing_matches() {
        assert_eq!(
            classify("7.5", OFFERED),
            UserInput::Text("7.5".to_string())
        );
        assert_eq!(classify("7.5", &[]), UserInput::Text("7.5".to_string()));
    }
}
