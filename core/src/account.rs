//! Per-user aggregate state. Everything the engine mutates for one user
//! lives here so multi-aggregate operations can run on a staged clone.

use crate::{
    clock::MonthKey,
    spin_pool::SpinTokenPool,
    spin_wheel::SpinWheel,
    streak::{StreakConfig, StreakData},
    tier::{TierProgress, TierTable},
    types::UserId,
    wallet::WalletLedger,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountStats {
    pub lifetime_receipts: u64,
    pub spins_resolved:    u64,
    pub jackpots_hit:      u64,
    pub coupons_redeemed:  u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardAccount {
    pub user_id: UserId,
    pub wallet:  WalletLedger,
    pub spins:   SpinTokenPool,
    pub tier:    TierProgress,
    pub streak:  StreakData,
    pub wheel:   SpinWheel,
    pub coupons: BTreeSet<String>,
    pub badges:  BTreeSet<String>,
    pub stats:   AccountStats,
}

impl RewardAccount {
    pub fn new(
        user_id: UserId,
        tiers: &TierTable,
        streak_config: &StreakConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            wallet:  WalletLedger::new(),
            spins:   SpinTokenPool::new(),
            tier:    TierProgress::new(tiers, MonthKey::of(now)),
            streak:  StreakData::new(streak_config, now),
            wheel:   SpinWheel::default(),
            coupons: BTreeSet::new(),
            badges:  BTreeSet::new(),
            stats:   AccountStats::default(),
        }
    }

    pub fn tier_rank(&self, tiers: &TierTable) -> usize {
        tiers.rank_of(&self.tier.tier(tiers).tier_id).unwrap_or(0)
    }
}
