//! Coupon and badge catalog.
//!
//! Coupons are bought with wallet balance and owned at most once.
//! Badges unlock from account progress and are never revoked.

use crate::{
    account::RewardAccount,
    error::{RewardError, RewardResult},
    tier::TierTable,
    types::Cents,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub coupon_id: String,
    pub name: String,
    pub cost_cents: Cents,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum BadgeUnlock {
    ReceiptsScanned { count: u64 },
    StreakWeeks { weeks: u32 },
    TierReached { tier_id: String },
    SpinsResolved { count: u64 },
    JackpotHit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Badge {
    pub badge_id: String,
    pub name: String,
    pub unlock: BadgeUnlock,
}

impl Badge {
    pub fn is_satisfied(&self, account: &RewardAccount, tiers: &TierTable) -> bool {
        match &self.unlock {
            BadgeUnlock::ReceiptsScanned { count } => account.stats.lifetime_receipts >= *count,
            BadgeUnlock::StreakWeeks { weeks } => account.streak.week_count >= *weeks,
            BadgeUnlock::TierReached { tier_id } => match tiers.rank_of(tier_id) {
                Some(required) => account.tier_rank(tiers) >= required,
                None => false,
            },
            BadgeUnlock::SpinsResolved { count } => account.stats.spins_resolved >= *count,
            BadgeUnlock::JackpotHit => account.stats.jackpots_hit > 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub coupons: Vec<Coupon>,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl Catalog {
    pub fn validate(&self, tiers: &TierTable) -> RewardResult<()> {
        let mut seen = HashSet::new();
        for coupon in &self.coupons {
            if !seen.insert(coupon.coupon_id.as_str()) {
                return Err(RewardError::invalid_config(format!(
                    "duplicate coupon id '{}'",
                    coupon.coupon_id
                )));
            }
        }
        let mut seen = HashSet::new();
        for badge in &self.badges {
            if !seen.insert(badge.badge_id.as_str()) {
                return Err(RewardError::invalid_config(format!(
                    "duplicate badge id '{}'",
                    badge.badge_id
                )));
            }
            if let BadgeUnlock::TierReached { tier_id } = &badge.unlock {
                if tiers.get(tier_id).is_none() {
                    return Err(RewardError::invalid_config(format!(
                        "badge '{}' refers to unknown tier '{tier_id}'",
                        badge.badge_id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn coupon(&self, coupon_id: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|c| c.coupon_id == coupon_id)
    }

    /// Badges satisfied by `account` that it does not own yet, in catalog order.
    pub fn newly_unlocked<'a>(&'a self, account: &RewardAccount, tiers: &TierTable) -> Vec<&'a Badge> {
        self.badges
            .iter()
            .filter(|b| !account.badges.contains(&b.badge_id) && b.is_satisfied(account, tiers))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CouponRedemption {
    pub redemption_id: String,
    pub coupon_id: String,
    pub cost_cents: Cents,
    pub balance_cents: Cents,
}

/// Debit the coupon's cost and take ownership. No mutation on failure.
pub fn redeem_coupon(account: &mut RewardAccount, coupon: &Coupon) -> RewardResult<Cents> {
    if account.coupons.contains(&coupon.coupon_id) {
        return Err(RewardError::CouponAlreadyOwned {
            coupon_id: coupon.coupon_id.clone(),
        });
    }
    let balance = account.wallet.debit(coupon.cost_cents)?;
    account.coupons.insert(coupon.coupon_id.clone());
    account.stats.coupons_redeemed += 1;
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardConfig;
    use chrono::{TimeZone, Utc};

    fn account(config: &RewardConfig) -> RewardAccount {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();
        RewardAccount::new("alice".into(), &config.tiers, &config.streak, now)
    }

    fn coupon(cost: Cents) -> Coupon {
        Coupon {
            coupon_id: "coffee".into(),
            name: "Free coffee".into(),
            cost_cents: cost,
            description: String::new(),
        }
    }

    #[test]
    fn redemption_debits_and_takes_ownership() {
        let config = RewardConfig::default_test();
        let mut acct = account(&config);
        acct.wallet.set_balance(500);
        assert_eq!(redeem_coupon(&mut acct, &coupon(300)).unwrap(), 200);
        assert!(acct.coupons.contains("coffee"));
        assert_eq!(acct.stats.coupons_redeemed, 1);
    }

    #[test]
    fn insufficient_balance_changes_nothing() {
        let config = RewardConfig::default_test();
        let mut acct = account(&config);
        acct.wallet.set_balance(299);
        let before = acct.clone();
        let err = redeem_coupon(&mut acct, &coupon(300)).unwrap_err();
        assert!(matches!(err, RewardError::InsufficientFunds { .. }));
        assert_eq!(acct, before);
    }

    #[test]
    fn coupon_cannot_be_owned_twice() {
        let config = RewardConfig::default_test();
        let mut acct = account(&config);
        acct.wallet.set_balance(1_000);
        redeem_coupon(&mut acct, &coupon(300)).unwrap();
        let err = redeem_coupon(&mut acct, &coupon(300)).unwrap_err();
        assert!(matches!(err, RewardError::CouponAlreadyOwned { .. }));
        assert_eq!(acct.wallet.balance(), 700);
    }

    #[test]
    fn badge_rules_read_account_progress() {
        let config = RewardConfig::default_test();
        let mut acct = account(&config);
        let first_scan = Badge {
            badge_id: "first".into(),
            name: "First receipt".into(),
            unlock: BadgeUnlock::ReceiptsScanned { count: 1 },
        };
        let silver = Badge {
            badge_id: "silver".into(),
            name: "Silver".into(),
            unlock: BadgeUnlock::TierReached { tier_id: "silver".into() },
        };
        assert!(!first_scan.is_satisfied(&acct, &config.tiers));
        acct.stats.lifetime_receipts = 1;
        assert!(first_scan.is_satisfied(&acct, &config.tiers));

        assert!(!silver.is_satisfied(&acct, &config.tiers));
        acct.tier = acct.tier.with_receipts(&config.tiers, 5);
        assert!(silver.is_satisfied(&acct, &config.tiers));
    }
}
