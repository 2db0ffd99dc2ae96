use crate::{
    catalog::CouponRedemption,
    receipt_reward::RewardEvent,
    spin_wheel::{SpinOutcome, SpinResult},
    types::{Cents, UserId},
};
use serde::{Deserialize, Serialize};

/// All commands the presentation layer or sync collaborator can issue.
/// Variants are added over time and never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum UserCommand {
    // ── Presentation layer ────────────────────────
    OpenAccount { user_id: UserId },
    ScanReceipt { user_id: UserId },
    Spin { user_id: UserId },
    FinishSpin { user_id: UserId },
    AcknowledgeSpin { user_id: UserId },
    RedeemCoupon { user_id: UserId, coupon_id: String },
    RollOver { user_id: UserId },

    // ── Sync collaborator ─────────────────────────
    SetWalletBalance { user_id: UserId, balance_cents: Cents },
    SetSpinTokens { user_id: UserId, tokens: u32 },
    SetReceiptsThisMonth { user_id: UserId, receipts: u32 },
    GrantShield { user_id: UserId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    AccountOpened,
    ReceiptRewarded { reward: RewardEvent },
    SpinStarted { spin: SpinOutcome },
    SpinRevealed { result: SpinResult },
    SpinAcknowledged,
    CouponRedeemed { redemption: CouponRedemption },
    RolledOver { events: usize },
    Synced,
}
