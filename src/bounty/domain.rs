//! Bounty commands, labels and the summary comment marker.

use crate::tracker::domain::{CommentId, IssueComment};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

/// Token identifying the bounty summary comment.
pub const BOUNTY_SUMMARY_TOKEN: &str = "claimwarden:bounty";

static COMMAND: LazyLock<Regex> = LazyLock::new(command_pattern);
static SUMMARY: LazyLock<Regex> = LazyLock::new(summary_pattern);

#[expect(
    clippy::expect_used,
    reason = "the pattern is a compile-time constant covered by tests"
)]
fn command_pattern() -> Regex {
    Regex::new(r"/bounty\s+\$(\d+)").expect("bounty command pattern should compile")
}

#[expect(
    clippy::expect_used,
    reason = "the pattern is a compile-time constant covered by tests"
)]
fn summary_pattern() -> Regex {
    Regex::new(r"<!-- claimwarden:bounty last=(\d+) -->")
        .expect("bounty summary pattern should compile")
}

/// Errors raised while interpreting bounty commands.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BountyDomainError {
    /// The amount is zero or does not fit in 64 bits.
    #[error("invalid bounty amount '{0}'")]
    InvalidAmount(String),

    /// Adding the amount would overflow the running total.
    #[error("bounty total overflows: {current} + {amount}")]
    Overflow {
        /// Total before the command.
        current: u64,
        /// Amount requested.
        amount: u64,
    },
}

/// A parsed `/bounty $N` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BountyCommand {
    amount: u64,
}

impl BountyCommand {
    /// Finds the first bounty command in `text`.
    ///
    /// Returns `Ok(None)` when the text carries no command.
    ///
    /// # Errors
    ///
    /// Returns [`BountyDomainError::InvalidAmount`] when the amount is zero or
    /// too large.
    pub fn parse(text: &str) -> Result<Option<Self>, BountyDomainError> {
        let Some(digits) = COMMAND
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str())
        else {
            return Ok(None);
        };
        match digits.parse::<u64>() {
            Ok(amount) if amount > 0 => Ok(Some(Self { amount })),
            _ => Err(BountyDomainError::InvalidAmount(digits.to_owned())),
        }
    }

    /// Returns the amount.
    #[must_use]
    pub const fn amount(self) -> u64 {
        self.amount
    }
}

/// The running bounty carried as a `<prefix><total>` label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BountyLabel {
    name: String,
    total: u64,
}

impl BountyLabel {
    /// Finds the bounty label among `labels`.
    ///
    /// Only labels made of `prefix` followed by decimal digits qualify. When
    /// several qualify the largest total wins.
    #[must_use]
    pub fn find(labels: &BTreeSet<String>, prefix: &str) -> Option<Self> {
        labels
            .iter()
            .filter_map(|name| {
                let digits = name.strip_prefix(prefix)?;
                if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
                    return None;
                }
                Some(Self {
                    total: digits.parse().ok()?,
                    name: name.clone(),
                })
            })
            .max_by_key(|label| label.total)
    }

    /// Builds the label for `total`.
    #[must_use]
    pub fn for_total(prefix: &str, total: u64) -> Self {
        Self {
            name: format!("{prefix}{total}"),
            total,
        }
    }

    /// Returns the label after adding `amount`.
    ///
    /// # Errors
    ///
    /// Returns [`BountyDomainError::Overflow`] when the total would overflow.
    pub fn add(
        current: Option<&Self>,
        prefix: &str,
        amount: u64,
    ) -> Result<Self, BountyDomainError> {
        let base = current.map_or(0, |label| label.total);
        let total = base.checked_add(amount).ok_or(BountyDomainError::Overflow {
            current: base,
            amount,
        })?;
        Ok(Self::for_total(prefix, total))
    }

    /// Returns the label name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the total.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }
}

/// Hidden marker closing the bounty summary comment. It records the last
/// command comment applied so a redelivered command is not counted twice.
#[must_use]
pub fn summary_marker(last_applied: CommentId) -> String {
    format!("<!-- {BOUNTY_SUMMARY_TOKEN} last={last_applied} -->")
}

/// Locates the bounty summary comment and the last command it recorded.
#[must_use]
pub fn find_summary(comments: &[IssueComment]) -> Option<(&IssueComment, CommentId)> {
    comments.iter().find_map(|comment| {
        let last = SUMMARY
            .captures(&comment.body)?
            .get(1)?
            .as_str()
            .parse::<u64>()
            .ok()?;
        Some((comment, CommentId::new(last)))
    })
}
