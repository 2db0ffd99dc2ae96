//! Tier progression: maps the month's receipt count onto the tier ladder.
//!
//! The current tier is a pure function of `receipts_this_month`;
//! it is stored on the progress record only for display and for
//! detecting upward crossings.

use crate::{
    clock::MonthKey,
    error::{RewardError, RewardResult},
    types::Cents,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTier {
    pub tier_id: String,
    pub label: String,
    pub min_receipts_this_month: u32,
    pub cash_multiplier: f64,
    pub spins_per_receipt: u32,
    pub bonus_label: String,
    /// One-time cash bonus when a scan moves the user into this tier.
    #[serde(default)]
    pub crossing_bonus_cents: Cents,
    #[serde(default)]
    pub crossing_bonus_spins: u32,
}

/// The validated tier ladder, ascending by threshold.
#[derive(Debug, Clone)]
pub struct TierTable {
    pub(crate) tiers: Vec<UserTier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<UserTier>) -> RewardResult<Self> {
        if tiers.is_empty() {
            return Err(RewardError::invalid_config("tier table is empty"));
        }
        tiers.sort_by_key(|t| t.min_receipts_this_month);

        if tiers[0].min_receipts_this_month != 0 {
            return Err(RewardError::invalid_config(
                "tier table has no base tier with threshold 0",
            ));
        }

        for pair in tiers.windows(2) {
            if pair[0].min_receipts_this_month == pair[1].min_receipts_this_month {
                return Err(RewardError::invalid_config(format!(
                    "tiers '{}' and '{}' share threshold {}",
                    pair[0].tier_id, pair[1].tier_id, pair[1].min_receipts_this_month
                )));
            }
        }
        let mut ids = HashSet::new();
        for tier in &tiers {
            if !ids.insert(tier.tier_id.clone()) {
                return Err(RewardError::invalid_config(format!(
                    "duplicate tier id '{}'",
                    tier.tier_id
                )));
            }
            if !tier.cash_multiplier.is_finite() || tier.cash_multiplier < 1.0 {
                return Err(RewardError::invalid_config(format!(
                    "tier '{}' cash multiplier {} must be >= 1.0",
                    tier.tier_id, tier.cash_multiplier
                )));
            }
            if tier.spins_per_receipt == 0 {
                return Err(RewardError::invalid_config(format!(
                    "tier '{}' must grant at least one spin per receipt",
                    tier.tier_id
                )));
            }
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[UserTier] {
        &self.tiers
    }

    pub fn base(&self) -> &UserTier {
        &self.tiers[0]
    }

    /// Highest tier whose threshold is met. Total because the base tier has threshold 0.
    pub fn tier_for(&self, receipts_this_month: u32) -> &UserTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_receipts_this_month <= receipts_this_month)
            .unwrap_or(&self.tiers[0])
    }

    pub fn get(&self, tier_id: &str) -> Option<&UserTier> {
        self.tiers.iter().find(|t| t.tier_id == tier_id)
    }

    /// Position on the ladder; the base tier is rank 0.
    pub fn rank_of(&self, tier_id: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t.tier_id == tier_id)
    }

    pub fn next(&self, tier_id: &str) -> Option<&UserTier> {
        self.rank_of(tier_id).and_then(|rank| self.tiers.get(rank + 1))
    }
}

/// Perks in force for the receipt just recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPerks {
    pub cash_multiplier: f64,
    pub spins_per_receipt: u32,
    pub crossing: Option<TierCrossing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCrossing {
    pub from_tier: String,
    pub to_tier: String,
    pub bonus_cents: Cents,
    pub bonus_spins: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierProgress {
    pub current_tier: String,
    pub receipts_this_month: u32,
    pub month: MonthKey,
}

impl TierProgress {
    pub fn new(table: &TierTable, month: MonthKey) -> Self {
        Self {
            current_tier: table.base().tier_id.clone(),
            receipts_this_month: 0,
            month,
        }
    }

    pub fn tier<'a>(&self, table: &'a TierTable) -> &'a UserTier {
        table.tier_for(self.receipts_this_month)
    }

    /// 0 when already at the top tier.
    pub fn receipts_needed_for_next_tier(&self, table: &TierTable) -> u32 {
        let current = self.tier(table);
        table
            .next(&current.tier_id)
            .map(|next| next.min_receipts_this_month.saturating_sub(self.receipts_this_month))
            .unwrap_or(0)
    }

    /// Fraction of the way from the current tier's threshold to the next one.
    pub fn progress_to_next_tier(&self, table: &TierTable) -> f64 {
        let current = self.tier(table);
        match table.next(&current.tier_id) {
            Some(next) => {
                let span = next.min_receipts_this_month - current.min_receipts_this_month;
                let done = self.receipts_this_month - current.min_receipts_this_month;
                f64::from(done) / f64::from(span)
            }
            None => 1.0,
        }
    }

    pub fn record_receipt_scanned(&self, table: &TierTable) -> (TierProgress, TierPerks) {
        let receipts = self.receipts_this_month.saturating_add(1);
        let old_rank = table.rank_of(&self.current_tier).unwrap_or(0);
        let tier = table.tier_for(receipts);
        let new_rank = table.rank_of(&tier.tier_id).unwrap_or(0);

        let crossing = (new_rank > old_rank).then(|| TierCrossing {
            from_tier: self.current_tier.clone(),
            to_tier: tier.tier_id.clone(),
            bonus_cents: tier.crossing_bonus_cents,
            bonus_spins: tier.crossing_bonus_spins,
        });

        let progress = TierProgress {
            current_tier: tier.tier_id.clone(),
            receipts_this_month: receipts,
            month: self.month,
        };
        let perks = TierPerks {
            cash_multiplier: tier.cash_multiplier,
            spins_per_receipt: tier.spins_per_receipt,
            crossing,
        };
        (progress, perks)
    }

    /// Tier is recomputed from the zeroed count, so it drops to the base tier.
    pub fn reset_for_new_month(&self, table: &TierTable, month: MonthKey) -> TierProgress {
        TierProgress::new(table, month)
    }

    /// Used by the sync collaborator; tier follows the count.
    pub fn with_receipts(&self, table: &TierTable, receipts_this_month: u32) -> TierProgress {
        TierProgress {
            current_tier: table.tier_for(receipts_this_month).tier_id.clone(),
            receipts_this_month,
            month: self.month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(id: &str, min: u32, mult: f64, spins: u32) -> UserTier {
        UserTier {
            tier_id: id.into(),
            label: id.into(),
            min_receipts_this_month: min,
            cash_multiplier: mult,
            spins_per_receipt: spins,
            bonus_label: String::new(),
            crossing_bonus_cents: 0,
            crossing_bonus_spins: 0,
        }
    }

    fn ladder() -> TierTable {
        TierTable::new(vec![
            tier("gold", 15, 1.5, 2),
            tier("bronze", 0, 1.0, 1),
            tier("platinum", 30, 2.0, 3),
            tier("silver", 5, 1.2, 1),
        ])
        .unwrap()
    }

    fn october() -> MonthKey {
        MonthKey { year: 2026, month: 10 }
    }

    #[test]
    fn tier_for_is_monotone_and_starts_at_base() {
        let table = ladder();
        assert_eq!(table.tier_for(0).tier_id, "bronze");
        let mut last_rank = 0;
        for count in 0..60 {
            let rank = table.rank_of(&table.tier_for(count).tier_id).unwrap();
            assert!(rank >= last_rank, "tier dropped at count {count}");
            last_rank = rank;
        }
        assert_eq!(table.tier_for(4).tier_id, "bronze");
        assert_eq!(table.tier_for(5).tier_id, "silver");
        assert_eq!(table.tier_for(29).tier_id, "gold");
        assert_eq!(table.tier_for(500).tier_id, "platinum");
    }

    #[test]
    fn table_without_base_tier_is_rejected() {
        let err = TierTable::new(vec![tier("silver", 5, 1.2, 1)]).unwrap_err();
        assert!(matches!(err, RewardError::InvalidConfiguration { .. }));
    }

    #[test]
    fn duplicate_thresholds_and_bad_multipliers_are_rejected() {
        assert!(TierTable::new(vec![tier("a", 0, 1.0, 1), tier("b", 0, 1.1, 1)]).is_err());
        assert!(TierTable::new(vec![tier("a", 0, 0.9, 1)]).is_err());
        assert!(TierTable::new(vec![tier("a", 0, 1.0, 0)]).is_err());
        assert!(TierTable::new(vec![]).is_err());
    }

    #[test]
    fn receipts_needed_counts_down_to_next_threshold() {
        let table = ladder();
        let progress = TierProgress::new(&table, october()).with_receipts(&table, 3);
        assert_eq!(progress.receipts_needed_for_next_tier(&table), 2);
        assert!((progress.progress_to_next_tier(&table) - 0.6).abs() < 1e-9);

        let top = progress.with_receipts(&table, 40);
        assert_eq!(top.receipts_needed_for_next_tier(&table), 0);
        assert_eq!(top.progress_to_next_tier(&table), 1.0);
    }

    #[test]
    fn crossing_reported_only_on_the_upgrading_receipt() {
        let mut table_tiers = ladder().tiers().to_vec();
        table_tiers[1].crossing_bonus_cents = 100;
        let table = TierTable::new(table_tiers).unwrap();

        let progress = TierProgress::new(&table, october()).with_receipts(&table, 4);
        let (upgraded, perks) = progress.record_receipt_scanned(&table);
        assert_eq!(upgraded.current_tier, "silver");
        let crossing = perks.crossing.expect("crossing into silver");
        assert_eq!(crossing.from_tier, "bronze");
        assert_eq!(crossing.bonus_cents, 100);
        assert_eq!(perks.cash_multiplier, 1.2);

        let (_, perks) = upgraded.record_receipt_scanned(&table);
        assert!(perks.crossing.is_none());
    }

    #[test]
    fn month_reset_drops_back_to_base_tier() {
        let table = ladder();
        let progress = TierProgress::new(&table, october()).with_receipts(&table, 20);
        assert_eq!(progress.current_tier, "gold");
        let november = MonthKey { year: 2026, month: 11 };
        let reset = progress.reset_for_new_month(&table, november);
        assert_eq!(reset.receipts_this_month, 0);
        assert_eq!(reset.current_tier, "bronze");
        assert_eq!(reset.month, november);
    }
}
