use chrono::{DateTime, Duration, TimeZone, Utc};
use receipt_rewards_core::{engine::RewardEngine, event::EngineEvent};

fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 5, 9, 0, 0).unwrap()
}

fn week(n: i64) -> DateTime<Utc> {
    monday() + Duration::days(n * 7 + 1)
}

fn make_engine(session: &str) -> RewardEngine {
    let mut engine = RewardEngine::build_test(session.into(), 21).unwrap();
    engine.open_account("alice", monday()).unwrap();
    engine
}

#[test]
fn missed_week_without_shield_resets_streak() {
    let mut engine = make_engine("streak-reset");
    engine.scan_receipt("alice", week(0)).unwrap();
    engine.scan_receipt("alice", week(1)).unwrap();
    // Week 2 skipped.
    engine.scan_receipt("alice", week(3)).unwrap();

    let account = engine.account("alice").unwrap();
    assert_eq!(account.streak.week_count, 1);
    assert_eq!(account.streak.current_week, 1);
    assert!(engine
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::StreakReset { lost_week_count: 2, .. })));
}

#[test]
fn shield_absorbs_exactly_one_missed_week() {
    let mut engine = make_engine("streak-shield");
    engine.scan_receipt("alice", week(0)).unwrap();
    engine.scan_receipt("alice", week(1)).unwrap();
    engine.grant_shield("alice").unwrap();
    engine.scan_receipt("alice", week(3)).unwrap();

    let account = engine.account("alice").unwrap();
    assert_eq!(account.streak.week_count, 3);
    assert!(!account.streak.has_shield);
    let events = engine.drain_events();
    assert_eq!(
        events.iter().filter(|e| matches!(e, EngineEvent::ShieldConsumed { .. })).count(),
        1
    );
    assert!(!events.iter().any(|e| matches!(e, EngineEvent::StreakReset { .. })));
}

#[test]
fn fourth_consecutive_week_pays_cash_reward() {
    let mut engine = make_engine("streak-cash");
    for n in 0..3 {
        engine.scan_receipt("alice", week(n)).unwrap();
    }
    assert_eq!(engine.account("alice").unwrap().streak.weeks_until_cash(), Some(1));

    let reward = engine.scan_receipt("alice", week(3)).unwrap();
    assert_eq!(reward.breakdown.streak_cash_cents, 100);
    assert_eq!(reward.breakdown.streak_spins, 0);
    assert!(engine.account("alice").unwrap().badges.contains("four_week_streak"));
}

#[test]
fn roll_over_without_scan_reports_reset() {
    let mut engine = make_engine("streak-rollover");
    engine.scan_receipt("alice", week(0)).unwrap();
    let events = engine.roll_over("alice", week(3)).unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], EngineEvent::StreakReset { lost_week_count: 1, .. }));
    assert_eq!(engine.account("alice").unwrap().streak.week_count, 0);
}

#[test]
fn at_risk_at_end_of_unscanned_week() {
    let mut engine = make_engine("streak-risk");
    let sunday_morning = monday() + Duration::days(6) + Duration::hours(1);
    assert!(engine.is_at_risk("alice", sunday_morning).unwrap());
    assert!(!engine.is_at_risk("alice", monday() + Duration::days(2)).unwrap());

    engine.scan_receipt("alice", monday() + Duration::days(3)).unwrap();
    assert!(!engine.is_at_risk("alice", sunday_morning).unwrap());
    // Next week's Sunday, still nothing scanned that week.
    assert!(engine.is_at_risk("alice", sunday_morning + Duration::days(7)).unwrap());
}

#[test]
fn shield_survives_a_missed_week_with_no_streak_to_protect() {
    let mut engine = make_engine("streak-shield-fresh");
    engine.grant_shield("alice").unwrap();

    let reward = engine.scan_receipt("alice", monday() + Duration::days(8)).unwrap();
    let account = engine.account("alice").unwrap();
    assert_eq!(account.streak.current_week, 1);
    assert_eq!(account.streak.week_count, 1);
    assert!(account.streak.has_shield);
    assert_eq!(reward.breakdown.streak_spins, 1);
    assert!(!engine
        .drain_events()
        .iter()
        .any(|e| matches!(e, EngineEvent::ShieldConsumed { .. } | EngineEvent::StreakReset { .. })));
}
