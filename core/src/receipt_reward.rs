//! Receipt reward calculator: the bundle paid out for one scanned receipt.
//!
//! Order of evaluation:
//!   1. tier progress and streak advance (on staged copies)
//!   2. base cash × tier multiplier, tier spins
//!   3. streak week reward, tier crossing bonus
//!   4. mystery bonus roll
//!   5. commit everything to the account
//!
//! Any failure before step 5 leaves the account untouched.

use crate::{
    account::RewardAccount,
    config::RewardConfig,
    error::RewardResult,
    mystery::MysteryBonusType,
    rng::RandomSource,
    streak::{StreakReward, StreakScan},
    tier::TierCrossing,
    types::{cents_to_euros, Cents},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardBreakdown {
    pub base_cash_cents:     Cents,
    pub streak_cash_cents:   Cents,
    pub crossing_cash_cents: Cents,
    pub mystery_cash_cents:  Cents,
    pub tier_spins:          u32,
    pub streak_spins:        u32,
    pub crossing_spins:      u32,
    pub mystery_spins:       u32,
}

/// What the presentation layer reveals after a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardEvent {
    pub coins_awarded_cents: Cents,
    pub spins_awarded:       u32,
    pub mystery_bonus:       MysteryBonusType,
    pub breakdown:           RewardBreakdown,
}

impl RewardEvent {
    pub fn coins_awarded(&self) -> f64 {
        cents_to_euros(self.coins_awarded_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptOutcome {
    pub reward:   RewardEvent,
    pub crossing: Option<TierCrossing>,
    pub streak:   StreakScan,
}

pub fn on_receipt_scanned(
    config: &RewardConfig,
    account: &mut RewardAccount,
    now: DateTime<Utc>,
    rng: &mut dyn RandomSource,
) -> RewardResult<ReceiptOutcome> {
    let (tier, perks) = account.tier.record_receipt_scanned(&config.tiers);
    let (streak, streak_scan) = account.streak.record_qualifying_scan(&config.streak, now);

    let mut breakdown = RewardBreakdown {
        base_cash_cents: (config.receipt.base_cash_cents as f64 * perks.cash_multiplier).round()
            as Cents,
        tier_spins: perks.spins_per_receipt,
        ..Default::default()
    };

    match streak_scan.reward {
        Some(StreakReward::Cash { cents }) => breakdown.streak_cash_cents = cents,
        Some(StreakReward::Spins { count }) => breakdown.streak_spins = count,
        None => {}
    }

    if let Some(crossing) = &perks.crossing {
        breakdown.crossing_cash_cents = crossing.bonus_cents;
        breakdown.crossing_spins = crossing.bonus_spins;
    }

    let mystery_bonus = config.mystery.roll(rng)?;
    breakdown.mystery_cash_cents = mystery_bonus.cash_cents();
    breakdown.mystery_spins = mystery_bonus.spins();

    let coins_awarded_cents = breakdown
        .base_cash_cents
        .saturating_add(breakdown.streak_cash_cents)
        .saturating_add(breakdown.crossing_cash_cents)
        .saturating_add(breakdown.mystery_cash_cents);
    let spins_awarded = breakdown
        .tier_spins
        .saturating_add(breakdown.streak_spins)
        .saturating_add(breakdown.crossing_spins)
        .saturating_add(breakdown.mystery_spins);

    // Commit.
    account.tier = tier;
    account.streak = streak;
    account.wallet.credit(coins_awarded_cents);
    account.spins.grant(spins_awarded);
    account.stats.lifetime_receipts += 1;

    log::info!(
        "user={} receipt: +{coins_awarded_cents}c +{spins_awarded} spins tier={} week_count={} mystery={:?}",
        account.user_id,
        account.tier.current_tier,
        account.streak.week_count,
        mystery_bonus
    );

    Ok(ReceiptOutcome {
        reward: RewardEvent {
            coins_awarded_cents,
            spins_awarded,
            mystery_bonus,
            breakdown,
        },
        crossing: perks.crossing,
        streak: streak_scan,
    })
}
