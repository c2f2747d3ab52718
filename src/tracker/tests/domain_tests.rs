//! Validation and derived-value tests for tracker domain types.

use crate::tracker::domain::{
    ChangeRequest, ChangeRequestState, CrossReferenceSource, IssueNumber, ItemState, Login,
    PullRequestNumber, RepositoryFullName, TimelineEvent, TrackerDomainError, WorkItem,
    claimed_at,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::{fixture, rstest};

#[fixture]
fn repository() -> RepositoryFullName {
    RepositoryFullName::new("acme/widgets").expect("valid repository")
}

#[fixture]
fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn login(value: &str) -> Login {
    Login::new(value).expect("valid login")
}

#[rstest]
#[case("owner-only")]
#[case("a/b/c")]
#[case("/repo")]
#[case("owner/ repo")]
fn repository_name_rejects_malformed_values(#[case] raw: &str) {
    assert_eq!(
        RepositoryFullName::new(raw),
        Err(TrackerDomainError::InvalidRepository(raw.to_owned()))
    );
}

#[rstest]
fn repository_name_exposes_segments_and_matches_case_insensitively(
    repository: RepositoryFullName,
) {
    assert_eq!(repository.owner(), "acme");
    assert_eq!(repository.name(), "widgets");
    assert!(repository.matches("ACME/Widgets"));
    assert!(!repository.matches("acme/gadgets"));
}

#[rstest]
fn numbers_reject_zero() {
    assert_eq!(
        IssueNumber::new(0),
        Err(TrackerDomainError::InvalidIssueNumber(0))
    );
    assert_eq!(
        PullRequestNumber::new(0),
        Err(TrackerDomainError::InvalidPullRequestNumber(0))
    );
}

#[rstest]
#[case("@alice", "alice")]
#[case("  bob ", "bob")]
fn login_strips_mention_prefix_and_whitespace(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(login(raw).as_str(), expected);
}

#[rstest]
#[case("")]
#[case("@")]
#[case("two words")]
fn login_rejects_blank_or_spaced_values(#[case] raw: &str) {
    assert!(matches!(
        Login::new(raw),
        Err(TrackerDomainError::InvalidLogin(_))
    ));
}

#[rstest]
fn work_item_deduplicates_assignees_and_drops_blank_labels(epoch: DateTime<Utc>) {
    let item = WorkItem::new(IssueNumber::new(5).expect("valid number"), epoch)
        .with_labels(["bug", "  ", "assigned"])
        .with_assignees([login("alice"), login("@alice"), login("bob")]);

    assert_eq!(item.assignees(), &[login("alice"), login("bob")]);
    assert!(item.has_label("assigned"));
    assert_eq!(item.labels().len(), 2);
    assert!(item.is_assigned_to(&login("bob")));
    assert_eq!(item.state(), ItemState::Open);
}

#[rstest]
#[case("open", ItemState::Open)]
#[case("CLOSED", ItemState::Closed)]
fn item_state_parses_tracker_values(#[case] raw: &str, #[case] expected: ItemState) {
    assert_eq!(ItemState::try_from(raw), Ok(expected));
}

#[rstest]
fn change_request_close_and_reopen_track_timestamps(
    repository: RepositoryFullName,
    epoch: DateTime<Utc>,
) {
    let opened = ChangeRequest::new(
        PullRequestNumber::new(10).expect("valid number"),
        repository,
        login("alice"),
        epoch,
    );
    let merged = opened.clone().closed(true, epoch + Duration::hours(3));
    assert_eq!(merged.state(), ChangeRequestState::Merged);
    assert_eq!(merged.closed_at(), Some(epoch + Duration::hours(3)));

    let reopened = opened.closed(false, epoch).reopened();
    assert!(reopened.is_open());
    assert_eq!(reopened.closed_at(), None);
}

#[rstest]
fn change_request_blank_body_is_absent(repository: RepositoryFullName, epoch: DateTime<Utc>) {
    let change_request = ChangeRequest::new(
        PullRequestNumber::new(3).expect("valid number"),
        repository.clone(),
        login("alice"),
        epoch,
    )
    .with_body("   ");
    assert_eq!(change_request.body(), None);
    assert!(change_request.referenced_items(&repository).is_empty());
}

#[rstest]
fn cross_reference_links_only_same_repository_change_requests(repository: RepositoryFullName) {
    let event = |number, repo: &str, is_change_request| TimelineEvent::CrossReferenced {
        source: CrossReferenceSource {
            number,
            repository: repo.to_owned(),
            is_change_request,
        },
        created_at: Utc::now(),
    };

    assert_eq!(
        event(8, "Acme/Widgets", true).linked_change_request(&repository),
        Some(PullRequestNumber::new(8).expect("valid number"))
    );
    assert_eq!(
        event(8, "other/fork", true).linked_change_request(&repository),
        None
    );
    assert_eq!(
        event(8, "acme/widgets", false).linked_change_request(&repository),
        None
    );
}

#[rstest]
fn connection_events_are_not_links_on_their_own(repository: RepositoryFullName) {
    let number = PullRequestNumber::new(8).expect("valid number");
    let event = TimelineEvent::Connected {
        change_request: Some(number),
        created_at: Utc::now(),
    };

    assert_eq!(event.linked_change_request(&repository), None);
    assert_eq!(event.connected_change_request(), Some(number));
}

#[rstest]
fn claimed_at_uses_latest_assignment_of_the_claimant(epoch: DateTime<Utc>) {
    let alice = login("alice");
    let events = vec![
        TimelineEvent::Assigned {
            assignee: alice.clone(),
            created_at: epoch,
        },
        TimelineEvent::Unassigned {
            assignee: alice.clone(),
            created_at: epoch + Duration::hours(1),
        },
        TimelineEvent::Assigned {
            assignee: login("bob"),
            created_at: epoch + Duration::hours(2),
        },
        TimelineEvent::Assigned {
            assignee: alice.clone(),
            created_at: epoch + Duration::hours(5),
        },
    ];

    assert_eq!(
        claimed_at(&events, &alice),
        Some(epoch + Duration::hours(5))
    );
    assert_eq!(claimed_at(&events, &login("carol")), None);
}
