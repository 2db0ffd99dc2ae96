//! Spin wheel resolver: weighted prize draw plus landing geometry.
//!
//! State machine per user:
//!   idle → spinning → resolved → idle
//!
//! The prize is decided, the token consumed and the wallet credited
//! when the spin starts. `spinning` only guards against double
//! submission while the presentation layer animates.

use crate::{
    error::{RewardError, RewardResult},
    rng::{checked_draw, RandomSource},
    spin_pool::SpinTokenPool,
    types::{euros_to_cents, Cents},
    wallet::WalletLedger,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpinSegment {
    /// 0-based; also the segment's angular position on the wheel.
    pub id: u32,
    pub label: String,
    pub value_euros: f64,
    pub is_jackpot: bool,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WheelConfig {
    pub segments: Vec<SpinSegment>,
    #[serde(default = "default_min_rotations")]
    pub min_full_rotations: u32,
    #[serde(default = "default_max_rotations")]
    pub max_full_rotations: u32,
}

fn default_min_rotations() -> u32 { 5 }
fn default_max_rotations() -> u32 { 8 }

impl WheelConfig {
    pub fn validate(&self) -> RewardResult<()> {
        validate_segments(&self.segments)?;
        if self.min_full_rotations > self.max_full_rotations {
            return Err(RewardError::invalid_config(format!(
                "full rotation range {}..={} is empty",
                self.min_full_rotations, self.max_full_rotations
            )));
        }
        Ok(())
    }
}

fn validate_segments(segments: &[SpinSegment]) -> RewardResult<()> {
    if segments.is_empty() {
        return Err(RewardError::invalid_config("spin wheel has no segments"));
    }
    for (index, segment) in segments.iter().enumerate() {
        if segment.id as usize != index {
            return Err(RewardError::invalid_config(format!(
                "segment at position {index} has id {}; ids must be 0..n in order",
                segment.id
            )));
        }
        if !segment.weight.is_finite() || segment.weight <= 0.0 {
            return Err(RewardError::invalid_config(format!(
                "segment {} weight {} must be positive",
                segment.id, segment.weight
            )));
        }
        if !segment.value_euros.is_finite() || segment.value_euros < 0.0 {
            return Err(RewardError::invalid_config(format!(
                "segment {} value {} must be non-negative",
                segment.id, segment.value_euros
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpinResult {
    pub segment_index: u32,
    pub is_jackpot: bool,
    pub value_euros: f64,
}

impl SpinResult {
    pub fn value_cents(&self) -> Cents {
        euros_to_cents(self.value_euros)
    }
}

/// Weighted categorical draw over `segments` in id order.
pub fn resolve(segments: &[SpinSegment], rng: &mut dyn RandomSource) -> RewardResult<SpinResult> {
    validate_segments(segments)?;

    let total_weight: f64 = segments.iter().map(|s| s.weight).sum();
    let r = checked_draw(rng, total_weight)?;

    let mut cumulative = 0.0;
    let mut winner = &segments[segments.len() - 1];
    for segment in segments {
        cumulative += segment.weight;
        if cumulative > r {
            winner = segment;
            break;
        }
    }

    log::debug!(
        "spin: draw {r:.4} of {total_weight:.4} -> segment {} ({})",
        winner.id, winner.label
    );

    Ok(SpinResult {
        segment_index: winner.id,
        is_jackpot: winner.is_jackpot,
        value_euros: winner.value_euros,
    })
}

/// Absolute rotation that lands the centre of `segment_index` under the
/// 12 o'clock pointer after a whole number of extra turns.
/// Segment k spans [k * angle, (k + 1) * angle) clockwise from the pointer.
pub fn rotation_angle_to_land(
    segment_index: u32,
    segment_count: u32,
    current_rotation_degrees: f64,
    min_full_rotations: u32,
    max_full_rotations: u32,
    rng: &mut dyn RandomSource,
) -> RewardResult<f64> {
    if segment_count == 0 || segment_index >= segment_count {
        return Err(RewardError::invalid_config(format!(
            "segment {segment_index} is not on a wheel of {segment_count}"
        )));
    }
    if min_full_rotations > max_full_rotations {
        return Err(RewardError::invalid_config(format!(
            "full rotation range {min_full_rotations}..={max_full_rotations} is empty"
        )));
    }

    let segment_angle = 360.0 / f64::from(segment_count);
    let target_stop = 360.0 - (f64::from(segment_index) + 0.5) * segment_angle;
    let current_normalized = current_rotation_degrees.rem_euclid(360.0);

    let mut extra_degrees = target_stop - current_normalized;
    if extra_degrees < 0.0 {
        extra_degrees += 360.0;
    }

    let full_rotations = rng.range_inclusive(min_full_rotations, max_full_rotations);
    Ok(current_rotation_degrees + f64::from(full_rotations) * 360.0 + extra_degrees)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpinOutcome {
    pub result: SpinResult,
    pub total_rotation_degrees: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WheelState {
    #[default]
    Idle,
    Spinning { outcome: SpinOutcome },
    Resolved { result: SpinResult },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpinWheel {
    pub state: WheelState,
    pub rotation_degrees: f64,
}

impl SpinWheel {
    pub fn is_spinning(&self) -> bool {
        matches!(self.state, WheelState::Spinning { .. })
    }

    /// Consume a token, decide the prize and credit it.
    /// Any failure leaves the pool, wallet and wheel untouched.
    pub fn spin(
        &mut self,
        config: &WheelConfig,
        pool: &mut SpinTokenPool,
        wallet: &mut WalletLedger,
        wheel_rng: &mut dyn RandomSource,
        rotation_rng: &mut dyn RandomSource,
    ) -> RewardResult<SpinOutcome> {
        if self.is_spinning() {
            return Err(RewardError::SpinInProgress);
        }
        if pool.available() == 0 {
            return Err(RewardError::NoSpinsAvailable);
        }

        let result = resolve(&config.segments, wheel_rng)?;
        let total_rotation_degrees = rotation_angle_to_land(
            result.segment_index,
            config.segments.len() as u32,
            self.rotation_degrees,
            config.min_full_rotations,
            config.max_full_rotations,
            rotation_rng,
        )?;

        pool.consume_one()?;
        wallet.credit(result.value_cents());

        let outcome = SpinOutcome { result, total_rotation_degrees };
        self.rotation_degrees = total_rotation_degrees;
        self.state = WheelState::Spinning { outcome };
        Ok(outcome)
    }

    /// Spinning → resolved. Returns the prize for the reveal.
    pub fn finish(&mut self) -> RewardResult<SpinResult> {
        match self.state {
            WheelState::Spinning { outcome } => {
                self.state = WheelState::Resolved { result: outcome.result };
                Ok(outcome.result)
            }
            _ => Err(RewardError::NoSpinToReveal),
        }
    }

    /// Resolved → idle. No-op in any other state.
    pub fn acknowledge(&mut self) {
        if let WheelState::Resolved { .. } = self.state {
            self.state = WheelState::Idle;
        }
    }
}
