//! Classifier and context integration tests
//!
//! Classification is driven through snapshots produced by a real
//! `ContextManager`, so back-fill and expiry are exercised together.

use chrono::{DateTime, Duration, Utc};

use parley::context::{ContextManager, ContextSnapshot};
use parley::core::types::{MessageSource, Role};
use parley::intent::{IntentClassifier, IntentKind, Slot};
use parley::orchestrator::StateDelta;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn test_send_round_trip() {
    let classifier = IntentClassifier::new().unwrap();
    let mut ctx = ContextManager::default();

    let intent = classifier.classify("message Juliana that I'm running late", &ctx.get_context());
    assert_eq!(intent.kind, IntentKind::SendMessage);
    assert_eq!(intent.contact(), Some("Juliana"));
    assert_eq!(intent.content(), Some("I'm running late"));
}

#[test]
fn test_pronoun_follows_applied_delta() {
    let classifier = IntentClassifier::new().unwrap();
    let mut ctx = ContextManager::default();
    ctx.apply(&StateDelta {
        monitored_contact: Some("Paulo".into()),
        ..StateDelta::new().with_last_contact("Paulo")
    });

    let intent = classifier.classify("read her chat", &ctx.get_context());
    assert_eq!(intent.kind, IntentKind::ReadHistory);
    assert_eq!(intent.contact(), Some("Paulo"));
}

#[test]
fn test_monitor_correction_needs_previous_monitor() {
    let classifier = IntentClassifier::new().unwrap();
    let mut ctx = ContextManager::default();

    let before = classifier.classify("Juliana Costa", &ctx.get_context());
    assert_ne!(before.kind, IntentKind::Monitor);

    ctx.apply(&StateDelta::new().with_last_intent(IntentKind::Monitor));
    let after = classifier.classify("Juliana Costa", &ctx.get_context());
    assert_eq!(after.kind, IntentKind::Monitor);
    assert_eq!(after.contact(), Some("Juliana Costa"));
}

#[test]
fn test_idle_expiry_drops_backfill_source() {
    let classifier = IntentClassifier::new().unwrap();
    let mut ctx = ContextManager::default();
    ctx.add_message_at(Role::User, "monitor Ana", MessageSource::Text, t0());
    ctx.apply_at(
        &StateDelta {
            monitored_contact: Some("Ana".into()),
            ..StateDelta::new().with_last_contact("Ana")
        },
        t0(),
    );
    ctx.enable_autopilot_at("Ana", Some("sweet"), Some(240), t0());

    let later = t0() + Duration::minutes(45);
    ctx.add_message_at(Role::User, "stop monitoring", MessageSource::Text, later);
    let snapshot = ctx.get_context_at(later);

    assert!(snapshot.monitored_contacts.is_empty());
    assert!(snapshot.last_contact.is_none());
    assert!(snapshot.autopilot_for("Ana").is_some());

    let intent = classifier.classify("stop monitoring", &snapshot);
    assert_eq!(intent.kind, IntentKind::MonitorDisable);
    assert_eq!(intent.contact(), None);
}

#[test]
fn test_compound_clauses_classify_independently() {
    let classifier = IntentClassifier::new().unwrap();
    let ctx = ContextManager::default().get_context();

    let parts = classifier.split_compound("message Paulo hello and monitor his chat");
    assert_eq!(parts.len(), 2);

    let first = classifier.classify(&parts[0], &ctx);
    assert_eq!(first.kind, IntentKind::SendMessage);
    assert_eq!(first.contact(), Some("Paulo"));
    assert_eq!(first.content(), Some("hello"));

    let second = classifier.classify(&parts[1], &ctx);
    assert_eq!(second.kind, IntentKind::Monitor);
}

#[test]
fn test_keyword_fallback_keeps_raw_text() {
    let classifier = IntentClassifier::new().unwrap();
    let intent = classifier.classify("read my chat history", &ContextManager::default().get_context());
    assert_eq!(intent.kind, IntentKind::ReadHistory);
    assert!(intent.confidence < 0.7);
    assert_eq!(intent.entity(Slot::Raw), Some("read my chat history"));
}

#[test]
fn test_unknown_text_is_conversation() {
    let classifier = IntentClassifier::new().unwrap();
    let intent = classifier.classify(
        "the sky looked strange this morning",
        &ContextManager::default().get_context(),
    );
    assert_eq!(intent.kind, IntentKind::Conversation);
    assert_eq!(intent.confidence, 0.5);
}

#[test]
fn test_pronouns_prefer_monitored_contact_for_every_kind() {
    let classifier = IntentClassifier::new().unwrap();
    let ctx = ContextSnapshot {
        last_contact: Some("Paulo".into()),
        monitored_contacts: vec!["Ana".into()],
        ..ContextSnapshot::default()
    };

    let cases = [
        ("message her saying I'm late", IntentKind::SendMessage),
        ("did she reply", IntentKind::CheckMessages),
        ("read her chat", IntentKind::ReadHistory),
        ("monitor her chat", IntentKind::Monitor),
        ("don't monitor her anymore", IntentKind::MonitorDisable),
        ("reply to her saying I'm on my way", IntentKind::Reply),
        ("keep her entertained", IntentKind::AutopilotEnable),
        ("stop replying to her", IntentKind::AutopilotDisable),
        ("set the tone for her to funny", IntentKind::AutopilotSetTone),
    ];
    for (text, kind) in cases {
        let intent = classifier.classify(text, &ctx);
        assert_eq!(intent.kind, kind, "{}", text);
        assert_eq!(intent.contact(), Some("Ana"), "{}", text);
    }
}

#[test]
fn test_pronoun_falls_back_to_last_contact() {
    let classifier = IntentClassifier::new().unwrap();
    let ctx = ContextSnapshot {
        last_contact: Some("Paulo".into()),
        ..ContextSnapshot::default()
    };
    let intent = classifier.classify("monitor her chat", &ctx);
    assert_eq!(intent.kind, IntentKind::Monitor);
    assert_eq!(intent.contact(), Some("Paulo"));
}

#[test]
fn test_how_to_questions_stay_conversation() {
    let classifier = IntentClassifier::new().unwrap();
    let ctx = ContextManager::default().get_context();
    for text in ["tell me how to get to the airport", "can you tell me how to cook rice"] {
        let intent = classifier.classify(text, &ctx);
        assert_eq!(intent.kind, IntentKind::Conversation, "{}", text);
        assert!(intent.entities.is_empty(), "{}", text);
    }
}
