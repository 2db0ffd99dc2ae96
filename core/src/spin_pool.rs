//! Spin token pool: count of free spins available to a user.

use crate::error::{RewardError, RewardResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpinTokenPool {
    available: u32,
}

impl SpinTokenPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(available: u32) -> Self {
        Self { available }
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn grant(&mut self, n: u32) -> u32 {
        self.available = self.available.saturating_add(n);
        self.available
    }

    /// Fails without mutation when the pool is empty.
    pub fn consume_one(&mut self) -> RewardResult<()> {
        if self.available == 0 {
            return Err(RewardError::NoSpinsAvailable);
        }
        self.available -= 1;
        Ok(())
    }

    pub fn set_available(&mut self, available: u32) {
        self.available = available;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_from_empty_pool_fails_without_mutation() {
        let mut pool = SpinTokenPool::new();
        assert!(matches!(pool.consume_one(), Err(RewardError::NoSpinsAvailable)));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn grant_then_consume_each_token_once() {
        let mut pool = SpinTokenPool::new();
        pool.grant(2);
        pool.consume_one().unwrap();
        pool.consume_one().unwrap();
        assert!(pool.consume_one().is_err());
        assert_eq!(pool.available(), 0);
    }
}
