//! Mystery bonus: a secondary weighted roll made alongside every receipt.

use crate::{
    error::{RewardError, RewardResult},
    rng::{checked_draw, RandomSource},
    types::Cents,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MysteryBonusType {
    CashBonus { amount_cents: Cents },
    SpinToken,
    Nothing,
}

impl MysteryBonusType {
    pub fn cash_cents(&self) -> Cents {
        match self {
            Self::CashBonus { amount_cents } => *amount_cents,
            _ => 0,
        }
    }

    pub fn spins(&self) -> u32 {
        match self {
            Self::SpinToken => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MysteryOutcome {
    pub bonus: MysteryBonusType,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysteryTable {
    pub outcomes: Vec<MysteryOutcome>,
}

impl MysteryTable {
    pub fn validate(&self) -> RewardResult<()> {
        if self.outcomes.is_empty() {
            return Err(RewardError::invalid_config("mystery bonus table is empty"));
        }
        for (index, outcome) in self.outcomes.iter().enumerate() {
            if !outcome.weight.is_finite() || outcome.weight <= 0.0 {
                return Err(RewardError::invalid_config(format!(
                    "mystery outcome {index} weight {} must be positive",
                    outcome.weight
                )));
            }
        }
        Ok(())
    }

    /// Probability of each outcome, in table order.
    pub fn probabilities(&self) -> Vec<(MysteryBonusType, f64)> {
        let total: f64 = self.outcomes.iter().map(|o| o.weight).sum();
        self.outcomes.iter().map(|o| (o.bonus, o.weight / total)).collect()
    }

    /// `Nothing` is an ordinary outcome, not an error.
    pub fn roll(&self, rng: &mut dyn RandomSource) -> RewardResult<MysteryBonusType> {
        self.validate()?;
        let total: f64 = self.outcomes.iter().map(|o| o.weight).sum();
        let r = checked_draw(rng, total)?;

        let mut cumulative = 0.0;
        for outcome in &self.outcomes {
            cumulative += outcome.weight;
            if cumulative > r {
                return Ok(outcome.bonus);
            }
        }
        Ok(self.outcomes[self.outcomes.len() - 1].bonus)
    }
}
