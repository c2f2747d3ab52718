//! Free-text issue reference extraction.
//!
//! Recognises a closing verb followed by an item reference, in any of the
//! three forms the tracker links automatically: `#12`, `owner/repo#12` and
//! `https://host/owner/repo/issues/12`. Qualified forms are kept only when
//! they point at the given repository.

use super::{IssueNumber, RepositoryFullName};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static CLOSING_REFERENCE: LazyLock<Regex> = LazyLock::new(closing_reference_pattern);

#[expect(
    clippy::expect_used,
    reason = "the pattern is a compile-time constant covered by tests"
)]
fn closing_reference_pattern() -> Regex {
    Regex::new(concat!(
        r"(?i)\b(?:close[sd]?|fix(?:e[sd])?|resolve[sd]?)\b:?\s+",
        r"(?:",
        r"https?://[^\s/]+/(?P<url_repo>[\w.-]+/[\w.-]+)/issues/(?P<url_number>\d+)\b",
        r"|",
        r"(?P<qualified_repo>[\w.-]+/[\w.-]+)?#(?P<number>\d+)\b",
        r")",
    ))
    .expect("closing reference pattern is valid")
}

/// Extracts the set of items in `repository` that `body` declares closed.
///
/// Zero and unparsable numbers are skipped rather than reported.
#[must_use]
pub fn extract_issue_references(
    body: &str,
    repository: &RepositoryFullName,
) -> BTreeSet<IssueNumber> {
    CLOSING_REFERENCE
        .captures_iter(body)
        .filter_map(|captures| {
            let (scope, number) = match captures.name("url_number") {
                Some(number) => (captures.name("url_repo"), number),
                None => (captures.name("qualified_repo"), captures.name("number")?),
            };
            if let Some(scope) = scope {
                if !repository.matches(scope.as_str()) {
                    return None;
                }
            }
            let value = number.as_str().parse::<u64>().ok()?;
            IssueNumber::new(value).ok()
        })
        .collect()
}
