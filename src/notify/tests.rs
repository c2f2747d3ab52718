//! Tests for best-effort delivery and the in-memory notifiers.

use super::{
    ChatMessage, ChatNotifier, MockChatNotifier, NotifierError, memory::RecordingNotifier,
    notify_best_effort,
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn best_effort_swallows_delivery_failures() {
    let mut notifier = MockChatNotifier::new();
    notifier
        .expect_send()
        .withf(|message: &ChatMessage| message.text() == "claimed")
        .times(1)
        .returning(|_| Err(NotifierError::Rejected(500)));

    notify_best_effort(&notifier, ChatMessage::new("claimed")).await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn recording_notifier_shares_log_between_clones() {
    let notifier = RecordingNotifier::new();
    let handle = notifier.clone();
    notifier
        .send(&ChatMessage::new("released").with_channel("#claims"))
        .await
        .expect("recording never fails");

    let sent = handle.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent.first().and_then(ChatMessage::channel), Some("#claims"));
}

#[rstest]
fn message_serialises_without_absent_channel() {
    let payload = serde_json::to_value(ChatMessage::new("hi")).expect("serialisable");
    assert_eq!(payload, serde_json::json!({ "text": "hi" }));
}
