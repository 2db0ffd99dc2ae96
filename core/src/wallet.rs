//! Wallet ledger: a non-negative balance in cents.
//!
//! The balance only changes through `credit` and `debit`.
//! `set_balance` exists for the sync collaborator.

use crate::{
    error::{RewardError, RewardResult},
    types::{cents_to_euros, Cents},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletLedger {
    balance: Cents,
}

impl WalletLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: Cents) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> Cents {
        self.balance
    }

    pub fn balance_euros(&self) -> f64 {
        cents_to_euros(self.balance)
    }

    /// Always succeeds. Saturates at `Cents::MAX`.
    pub fn credit(&mut self, amount: Cents) -> Cents {
        self.balance = self.balance.saturating_add(amount);
        self.balance
    }

    /// Fails without mutation if `amount` exceeds the balance.
    pub fn debit(&mut self, amount: Cents) -> RewardResult<Cents> {
        if amount > self.balance {
            return Err(RewardError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    pub fn set_balance(&mut self, balance: Cents) {
        self.balance = balance;
    }
}
