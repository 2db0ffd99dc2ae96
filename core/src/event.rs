//! Engine events: every accepted state transition is reported here.
//!
//! RULE: Observers learn about state changes ONLY through events.
//! Variants are added over time and never removed or reordered.

use crate::{
    clock::MonthKey,
    mystery::MysteryBonusType,
    spin_wheel::SpinResult,
    types::{Cents, SessionId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    // ── Account lifecycle ──────────────────────────
    AccountOpened {
        user_id: UserId,
        at: DateTime<Utc>,
    },
    StateSynced {
        user_id: UserId,
        field: String,
    },

    // ── Receipts and tiers ─────────────────────────
    ReceiptRewarded {
        user_id: UserId,
        at: DateTime<Utc>,
        coins_awarded_cents: Cents,
        spins_awarded: u32,
        mystery_bonus: MysteryBonusType,
        balance_cents: Cents,
    },
    TierChanged {
        user_id: UserId,
        from_tier: String,
        to_tier: String,
        receipts_this_month: u32,
    },
    MonthReset {
        user_id: UserId,
        month: MonthKey,
        previous_receipts: u32,
    },

    // ── Streak ─────────────────────────────────────
    StreakWeekCompleted {
        user_id: UserId,
        week: u8,
        week_count: u32,
    },
    StreakReset {
        user_id: UserId,
        lost_week_count: u32,
    },
    ShieldConsumed {
        user_id: UserId,
        missed_week: u8,
    },

    // ── Spin wheel ─────────────────────────────────
    SpinStarted {
        user_id: UserId,
        result: SpinResult,
        total_rotation_degrees: f64,
        spins_left: u32,
    },
    SpinRevealed {
        user_id: UserId,
        result: SpinResult,
    },

    // ── Catalog ────────────────────────────────────
    CouponRedeemed {
        user_id: UserId,
        coupon_id: String,
        redemption_id: String,
        cost_cents: Cents,
        balance_cents: Cents,
    },
    BadgeUnlocked {
        user_id: UserId,
        badge_id: String,
    },
}

impl EngineEvent {
    /// Stable name used for the event_type column in reward_event_log.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AccountOpened { .. }       => "account_opened",
            Self::StateSynced { .. }         => "state_synced",
            Self::ReceiptRewarded { .. }     => "receipt_rewarded",
            Self::TierChanged { .. }         => "tier_changed",
            Self::MonthReset { .. }          => "month_reset",
            Self::StreakWeekCompleted { .. } => "streak_week_completed",
            Self::StreakReset { .. }         => "streak_reset",
            Self::ShieldConsumed { .. }      => "shield_consumed",
            Self::SpinStarted { .. }         => "spin_started",
            Self::SpinRevealed { .. }        => "spin_revealed",
            Self::CouponRedeemed { .. }      => "coupon_redeemed",
            Self::BadgeUnlocked { .. }       => "badge_unlocked",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::AccountOpened { user_id, .. }
            | Self::StateSynced { user_id, .. }
            | Self::ReceiptRewarded { user_id, .. }
            | Self::TierChanged { user_id, .. }
            | Self::MonthReset { user_id, .. }
            | Self::StreakWeekCompleted { user_id, .. }
            | Self::StreakReset { user_id, .. }
            | Self::ShieldConsumed { user_id, .. }
            | Self::SpinStarted { user_id, .. }
            | Self::SpinRevealed { user_id, .. }
            | Self::CouponRedeemed { user_id, .. }
            | Self::BadgeUnlocked { user_id, .. } => user_id,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub session_id: SessionId,
    pub seq: u64,
    pub user_id: UserId,
    pub event_type: String,
    pub payload: String, // JSON-serialized EngineEvent
}
