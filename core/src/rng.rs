//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through a `RandomSource`, and the engine's
//! own sources are `RewardRng` streams derived from one master seed.
//!
//! Each draw site gets its own stream, seeded deterministically
//! from (master_seed XOR slot_index * golden ratio). This means:
//!   - Adding a new slot never changes existing slots' streams.
//!   - Each slot's stream is fully reproducible in isolation.

use crate::error::{RewardError, RewardResult};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// The injection seam for every random decision in the engine.
/// Tests substitute scripted implementations.
pub trait RandomSource {
    /// Draw a raw u64 (full range).
    fn next_u64(&mut self) -> u64;

    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a float in [0.0, upper).
    fn draw_below(&mut self, upper: f64) -> f64 {
        self.next_f64() * upper
    }

    /// Roll an integer in [lo, hi]. Callers guarantee lo <= hi.
    fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let span = u64::from(hi - lo) + 1;
        lo + (self.next_u64() % span) as u32
    }
}

/// Check that a draw honours the [0, upper) contract.
pub fn checked_draw(rng: &mut dyn RandomSource, upper: f64) -> RewardResult<f64> {
    let value = rng.draw_below(upper);
    if value.is_finite() && value >= 0.0 && value < upper {
        Ok(value)
    } else {
        Err(RewardError::InvalidRandomDraw { value, upper })
    }
}

/// A named, seedable RNG stream.
pub struct RewardRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl RewardRng {
    /// Create a stream from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Fill 16 bytes, used to build deterministic identifiers.
    pub fn next_bytes16(&mut self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        self.inner.fill_bytes(&mut bytes);
        bytes
    }
}

impl RandomSource for RewardRng {
    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }
}

/// Seed holder for a single engine session.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_slot(&self, slot: RngSlot) -> RewardRng {
        RewardRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every slot's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngSlot {
    SpinWheel = 0,
    Rotation = 1,
    Mystery = 2,
    Catalog = 3,
    // Add new slots here, append only.
}

impl RngSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SpinWheel => "spin_wheel",
            Self::Rotation => "rotation",
            Self::Mystery => "mystery",
            Self::Catalog => "catalog",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let bank_a = RngBank::new(12345);
        let bank_b = RngBank::new(12345);
        let mut a = bank_a.for_slot(RngSlot::SpinWheel);
        let mut b = bank_b.for_slot(RngSlot::SpinWheel);
        for _ in 0..32 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn slots_are_independent_streams() {
        let bank = RngBank::new(12345);
        let mut wheel = bank.for_slot(RngSlot::SpinWheel);
        let mut mystery = bank.for_slot(RngSlot::Mystery);
        assert_ne!(wheel.next_u64(), mystery.next_u64());
        assert_eq!(mystery.name, "mystery");
    }

    #[test]
    fn unit_draws_stay_in_range() {
        let mut rng = RngBank::new(7).for_slot(RngSlot::Rotation);
        for _ in 0..1_000 {
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f), "out of range: {f}");
            let n = rng.range_inclusive(5, 8);
            assert!((5..=8).contains(&n), "out of range: {n}");
        }
    }

    struct Broken;

    impl RandomSource for Broken {
        fn next_u64(&mut self) -> u64 { 0 }
        fn draw_below(&mut self, upper: f64) -> f64 { upper }
    }

    #[test]
    fn checked_draw_rejects_out_of_contract_values() {
        let err = checked_draw(&mut Broken, 10.0).unwrap_err();
        assert!(matches!(err, RewardError::InvalidRandomDraw { .. }));
    }
}
