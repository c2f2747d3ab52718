//! Claim staleness evaluation.

use chrono::{DateTime, Duration, Utc};

/// Returns `true` once `threshold` has fully elapsed since `reference`.
///
/// `reference` must be the claim's assignment time. A reference in the
/// future is never stale.
#[must_use]
pub fn is_stale(reference: DateTime<Utc>, threshold: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(reference) >= threshold
}
