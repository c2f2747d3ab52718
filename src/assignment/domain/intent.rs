//! Command intent classification for comment text.
//!
//! Matching is a case-insensitive substring test against fixed phrase lists.
//! A release phrase wins over a claim phrase in the same comment.

use crate::tracker::domain::Login;
use serde::{Deserialize, Serialize};

const CLAIM_PHRASES: &[&str] = &[
    "/assign",
    "assign to me",
    "assign this to me",
    "assign it to me",
    "assign me this",
    "work on this",
    "i can try fixing this",
    "i am interested in doing this",
    "be assigned this",
    "i am interested in contributing",
];

const RELEASE_PREFIX: &str = "/unassign";

/// What a comment asks the reconciler to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandIntent {
    /// Assign the commenter.
    Claim,
    /// Release the commenter's claim.
    Release,
    /// Nothing actionable.
    NoOp,
}

/// Kind of account that authored a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    /// A person, including imported (mannequin) accounts.
    Human,
    /// An automation account.
    Bot,
}

impl ActorKind {
    /// Maps the tracker's account type string.
    ///
    /// `User` and `Mannequin` are human; anything else is treated as a bot.
    #[must_use]
    pub fn from_account_type(account_type: &str) -> Self {
        match account_type {
            "User" | "Mannequin" => Self::Human,
            _ => Self::Bot,
        }
    }
}

/// A classified command with its actor and source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Classified intent.
    pub intent: CommandIntent,
    /// The commenter.
    pub actor: Login,
    /// Raw comment body.
    pub raw_text: String,
}

/// Classifies comment text.
#[must_use]
pub fn classify_intent(text: &str, actor_kind: ActorKind) -> CommandIntent {
    if actor_kind == ActorKind::Bot {
        return CommandIntent::NoOp;
    }
    let normalized = text.trim().to_lowercase();
    if normalized.starts_with(RELEASE_PREFIX) {
        return CommandIntent::Release;
    }
    if CLAIM_PHRASES
        .iter()
        .any(|phrase| normalized.contains(phrase))
    {
        return CommandIntent::Claim;
    }
    CommandIntent::NoOp
}

/// Classifies a comment into a [`Command`].
#[must_use]
pub fn classify_command(text: &str, actor: Login, actor_kind: ActorKind) -> Command {
    Command {
        intent: classify_intent(text, actor_kind),
        actor,
        raw_text: text.to_owned(),
    }
}
