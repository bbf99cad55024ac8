//! Transport-facing message types and the outbound channel trait.
//!
//! The core never sees raw chat payloads: the transport adapter decides
//! whether an incoming message is a command, free text, or a tap on one of
//! the offered choices, and hands over a closed [`UserInput`] variant.
//! Outbound messages carry the prompt text plus an optional closed choice
//! list so the adapter can render a keyboard without the core knowing how.

pub mod console;
pub mod web;

use async_trait::async_trait;

use crate::error::ChannelError;

/// One selectable option: the stable token the core validates against and
/// the label the transport displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub token: &'static str,
    pub label: &'static str,
}

/// A message for one user, ready for the transport to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub text: String,
    /// Non-empty when the next expected answer is a closed selection.
    pub choices: Vec<Choice>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    pub fn with_choices(text: impl Into<String>, choices: &[(&'static str, &'static str)]) -> Self {
        Self {
            text: text.into(),
            choices: choices
                .iter()
                .map(|(token, label)| Choice { token, label })
                .collect(),
        }
    }
}

/// Commands a user can issue at any point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Today,
    Stats,
    Export,
    Help,
    Cancel,
}

impl Command {
    /// Parse a slash command; `None` when the text is not a known command.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "/start" => Some(Self::Start),
            "/today" => Some(Self::Today),
            "/stats" => Some(Self::Stats),
            "/export" => Some(Self::Export),
            "/help" => Some(Self::Help),
            "/cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Input already classified by the transport adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    Command(Command),
    /// Free-form text typed by the user.
    Text(String),
    /// The token of a tapped choice.
    Choice(String),
}

/// Outbound delivery surface the core and the reminder sweep send through.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, user_id: &str, message: &OutboundMessage) -> Result<(), ChannelError>;
}
