use chrono::{Duration, TimeZone, Utc};
use receipt_rewards_core::{
    command::{CommandOutcome, UserCommand},
    engine::RewardEngine,
    error::RewardError,
    event::EngineEvent,
    observer::RecordingObserver,
    snapshot::{AccountSnapshot, SNAPSHOT_VERSION},
};

#[test]
fn snapshot_restores_the_saved_account() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test("snapshot".into(), 5).unwrap();
    engine.open_account("alice", now).unwrap();
    engine.scan_receipt("alice", now).unwrap();
    engine.grant_shield("alice").unwrap();
    engine.save_snapshot("alice", now).unwrap();
    let saved = engine.account("alice").unwrap().clone();

    engine.scan_receipt("alice", now + Duration::hours(2)).unwrap();
    engine.set_wallet_balance("alice", 0).unwrap();
    assert_ne!(engine.account("alice").unwrap(), &saved);

    assert!(engine.restore_snapshot("alice").unwrap());
    assert_eq!(engine.account("alice").unwrap(), &saved);
    assert!(!engine.restore_snapshot("bob").unwrap());
}

#[test]
fn observers_and_polling_see_the_same_events() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test("observer".into(), 5).unwrap();
    let observer = RecordingObserver::default();
    let seen = observer.seen.clone();
    engine.register_observer(Box::new(observer));

    engine.open_account("alice", now).unwrap();
    engine.scan_receipt("alice", now).unwrap();

    let drained = engine.drain_events();
    assert_eq!(*seen.lock().unwrap(), drained);
    assert!(matches!(drained[0], EngineEvent::AccountOpened { .. }));
    assert!(engine.drain_events().is_empty());
}

#[test]
fn commands_dispatch_to_engine_operations() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test("commands".into(), 5).unwrap();

    let json = r#"{"cmd":"open_account","user_id":"alice"}"#;
    let cmd: UserCommand = serde_json::from_str(json).unwrap();
    assert!(matches!(engine.apply(cmd, now).unwrap(), CommandOutcome::AccountOpened));

    let outcome = engine
        .apply(UserCommand::ScanReceipt { user_id: "alice".into() }, now)
        .unwrap();
    assert!(matches!(outcome, CommandOutcome::ReceiptRewarded { .. }));

    let outcome = engine.apply(UserCommand::Spin { user_id: "alice".into() }, now).unwrap();
    assert!(matches!(outcome, CommandOutcome::SpinStarted { .. }));

    let err = engine
        .apply(UserCommand::OpenAccount { user_id: "alice".into() }, now)
        .unwrap_err();
    assert!(matches!(err, RewardError::AccountExists { .. }));
}

#[test]
fn observer_only_engine_keeps_no_event_queue() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test("no-polling".into(), 5).unwrap().without_polling();
    let observer = RecordingObserver::default();
    let seen = observer.seen.clone();
    engine.register_observer(Box::new(observer));

    engine.open_account("alice", now).unwrap();
    for hour in 0..50 {
        engine.scan_receipt("alice", now + Duration::hours(hour)).unwrap();
    }

    assert!(engine.drain_events().is_empty());
    let observed = seen.lock().unwrap().len();
    assert!(observed >= 51, "observer saw {observed} events");
    assert_eq!(
        engine.store().event_count("no-polling", "receipt_rewarded").unwrap(),
        50
    );
}

#[test]
fn snapshot_from_unknown_version_is_rejected() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test("snapshot-version".into(), 5).unwrap();
    engine.open_account("alice", now).unwrap();

    let future = AccountSnapshot {
        version: SNAPSHOT_VERSION + 1,
        session_id: engine.session_id.clone(),
        user_id: "alice".into(),
        saved_at: now,
        account: engine.account("alice").unwrap().clone(),
    };
    let json = serde_json::to_string(&future).unwrap();
    engine
        .store()
        .save_snapshot("snapshot-version", "alice", &now.to_rfc3339(), &json)
        .unwrap();

    let err = engine.restore_snapshot("alice").unwrap_err();
    assert!(matches!(
        err,
        RewardError::SnapshotVersion { found, expected }
            if found == SNAPSHOT_VERSION + 1 && expected == SNAPSHOT_VERSION
    ));
}

#[test]
fn failed_event_log_write_leaves_account_unchanged() {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test("log-failure".into(), 5).unwrap();
    engine.open_account("alice", now).unwrap();
    engine.set_wallet_balance("alice", 1_000).unwrap();
    engine.drain_events();
    let before = engine.account("alice").unwrap().clone();

    // No session row exists for this id, so every event insert violates
    // the foreign key and the batch is rolled back.
    engine.session_id = "unregistered-session".into();

    assert!(matches!(
        engine.scan_receipt("alice", now),
        Err(RewardError::Database(_))
    ));
    assert!(matches!(
        engine.redeem_coupon("alice", "coffee_voucher"),
        Err(RewardError::Database(_))
    ));
    assert_eq!(engine.account("alice").unwrap(), &before);
    assert!(engine.drain_events().is_empty());
    assert_eq!(engine.store().event_count("log-failure", "receipt_rewarded").unwrap(), 0);
}
