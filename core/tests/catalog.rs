use chrono::{TimeZone, Utc};
use receipt_rewards_core::{
    engine::RewardEngine,
    error::RewardError,
    event::EngineEvent,
};

fn make_engine(session: &str) -> RewardEngine {
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
    let mut engine = RewardEngine::build_test(session.into(), 31).unwrap();
    engine.open_account("alice", now).unwrap();
    engine
}

#[test]
fn insufficient_balance_rejects_redemption_without_mutation() {
    let mut engine = make_engine("coupon-insufficient");
    engine.set_wallet_balance("alice", 299).unwrap();
    let before = engine.account("alice").unwrap().clone();

    let err = engine.redeem_coupon("alice", "coffee_voucher").unwrap_err();
    assert!(matches!(
        err,
        RewardError::InsufficientFunds { requested: 300, available: 299 }
    ));
    assert_eq!(engine.account("alice").unwrap(), &before);
    assert_eq!(
        engine.store().event_count("coupon-insufficient", "coupon_redeemed").unwrap(),
        0
    );
}

#[test]
fn redemption_debits_wallet_and_records_ownership() {
    let mut engine = make_engine("coupon-ok");
    engine.set_wallet_balance("alice", 1_000).unwrap();

    let redemption = engine.redeem_coupon("alice", "coffee_voucher").unwrap();
    assert_eq!(redemption.balance_cents, 700);
    assert!(uuid::Uuid::parse_str(&redemption.redemption_id).is_ok());

    let account = engine.account("alice").unwrap();
    assert_eq!(account.wallet.balance(), 700);
    assert!(account.coupons.contains("coffee_voucher"));

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        EngineEvent::CouponRedeemed { cost_cents: 300, balance_cents: 700, .. }
    )));
}

#[test]
fn owned_and_unknown_coupons_are_rejected() {
    let mut engine = make_engine("coupon-errors");
    engine.set_wallet_balance("alice", 1_000).unwrap();
    engine.redeem_coupon("alice", "coffee_voucher").unwrap();

    assert!(matches!(
        engine.redeem_coupon("alice", "coffee_voucher"),
        Err(RewardError::CouponAlreadyOwned { .. })
    ));
    assert!(matches!(
        engine.redeem_coupon("alice", "free_car"),
        Err(RewardError::UnknownCoupon { .. })
    ));
    assert_eq!(engine.account("alice").unwrap().wallet.balance(), 700);
}
