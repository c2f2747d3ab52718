//! Issue tracker model shared by the claim and bounty workflows.
//!
//! The tracker is the only source of truth: no state is persisted locally,
//! and every run rebuilds its view from items, comments, timelines and
//! change requests. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contract in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
