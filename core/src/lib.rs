//! Receipt rewards core: wallet, spins, tiers, streaks and the spin
//! wheel for a receipt-scanning rewards programme.
//!
//! The engine is deterministic: given the same seed, config and
//! sequence of calls it produces the same event log.

pub mod account;
pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod mystery;
pub mod observer;
pub mod receipt_reward;
pub mod rng;
pub mod snapshot;
pub mod spin_pool;
pub mod spin_wheel;
pub mod store;
pub mod streak;
pub mod tier;
pub mod types;
pub mod wallet;
