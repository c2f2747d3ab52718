//! Bounties raised with `/bounty $N` comments.
//!
//! The running total lives in a `<prefix><total>` label on the item, and a
//! single summary comment is kept up to date beside it.

pub mod domain;
mod service;

pub use domain::{BountyCommand, BountyDomainError, BountyLabel};
pub use service::{BountyError, BountyOutcome, BountyService};
