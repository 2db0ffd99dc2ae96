use crate::types::Cents;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardError {
    #[error("Insufficient balance: requested {requested} cents, available {available} cents")]
    InsufficientFunds { requested: Cents, available: Cents },

    #[error("No spins available")]
    NoSpinsAvailable,

    #[error("A spin is already in progress")]
    SpinInProgress,

    #[error("No resolved spin to reveal")]
    NoSpinToReveal,

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Random source returned {value}, expected a value in [0, {upper})")]
    InvalidRandomDraw { value: f64, upper: f64 },

    #[error("Account '{user_id}' not found")]
    UnknownAccount { user_id: String },

    #[error("Account '{user_id}' already exists")]
    AccountExists { user_id: String },

    #[error("Coupon '{coupon_id}' not found")]
    UnknownCoupon { coupon_id: String },

    #[error("Coupon '{coupon_id}' already owned")]
    CouponAlreadyOwned { coupon_id: String },

    #[error("Snapshot version {found} is not supported (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RewardError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration { reason: reason.into() }
    }
}

pub type RewardResult<T> = Result<T, RewardError>;
