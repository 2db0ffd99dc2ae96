//! Snapshot serialization: one user's full reward state to/from JSON.
//!
//! A snapshot captures everything needed to resume the account in a
//! later session. The sync collaborator decides when to take one.

use crate::{
    account::RewardAccount,
    types::{SessionId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub version:    u32,
    pub session_id: SessionId,
    pub user_id:    UserId,
    pub saved_at:   DateTime<Utc>,
    pub account:    RewardAccount,
}
