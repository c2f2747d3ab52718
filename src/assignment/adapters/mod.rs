//! Adapters feeding the claim workflow.

mod github_events;

pub use github_events::parse_webhook;
