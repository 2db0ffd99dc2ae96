use crate::{
    catalog::{Badge, BadgeUnlock, Catalog, Coupon},
    error::RewardResult,
    mystery::{MysteryBonusType, MysteryOutcome, MysteryTable},
    spin_wheel::{SpinSegment, WheelConfig},
    streak::{StreakConfig, StreakReward, WeeklyReward},
    tier::{TierTable, UserTier},
    types::Cents,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRewardConfig {
    /// Cash per scanned receipt before the tier multiplier.
    pub base_cash_cents: Cents,
}

#[derive(Debug, Clone, Deserialize)]
struct TiersFile {
    tiers: Vec<UserTier>,
}

#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub tiers:   TierTable,
    pub streak:  StreakConfig,
    pub wheel:   WheelConfig,
    pub mystery: MysteryTable,
    pub receipt: ReceiptRewardConfig,
    pub catalog: Catalog,
}

fn read_json<T: DeserializeOwned>(data_dir: &str, file: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{file}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}

impl RewardConfig {
    /// Load from the data/ directory.
    /// In tests, use RewardConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let tiers_file: TiersFile = read_json(data_dir, "tiers.json")?;
        let config = Self {
            tiers:   TierTable::new(tiers_file.tiers)?,
            streak:  read_json(data_dir, "streak.json")?,
            wheel:   read_json(data_dir, "wheel.json")?,
            mystery: read_json(data_dir, "mystery.json")?,
            receipt: read_json(data_dir, "receipt.json")?,
            catalog: read_json(data_dir, "catalog.json")?,
        };
        config.validate()?;

        log::info!(
            "config: loaded {} tiers, {} wheel segments, {} mystery outcomes, {} coupons, {} badges from {data_dir}",
            config.tiers.tiers().len(),
            config.wheel.segments.len(),
            config.mystery.outcomes.len(),
            config.catalog.coupons.len(),
            config.catalog.badges.len(),
        );
        Ok(config)
    }

    /// Tier table validation happens in `TierTable::new`.
    pub fn validate(&self) -> RewardResult<()> {
        self.streak.validate()?;
        self.wheel.validate()?;
        self.mystery.validate()?;
        self.catalog.validate(&self.tiers)?;
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let tier = |id: &str, label: &str, min: u32, mult: f64, spins: u32| UserTier {
            tier_id: id.into(),
            label: label.into(),
            min_receipts_this_month: min,
            cash_multiplier: mult,
            spins_per_receipt: spins,
            bonus_label: format!("{mult:.1}x cash"),
            crossing_bonus_cents: 0,
            crossing_bonus_spins: 0,
        };
        let mut gold = tier("gold", "Gold", 15, 1.5, 2);
        gold.crossing_bonus_spins = 1;
        let mut platinum = tier("platinum", "Platinum", 30, 2.0, 3);
        platinum.crossing_bonus_cents = 100;

        // Already ascending; covered by default_test_config_is_valid.
        let tiers = TierTable {
            tiers: vec![
                tier("bronze", "Bronze", 0, 1.0, 1),
                tier("silver", "Silver", 5, 1.2, 1),
                gold,
                platinum,
            ],
        };

        let segment = |id: u32, label: &str, value: f64, weight: f64| SpinSegment {
            id,
            label: label.into(),
            value_euros: value,
            is_jackpot: false,
            weight,
        };
        let mut jackpot = segment(7, "JACKPOT", 25.0, 0.5);
        jackpot.is_jackpot = true;

        Self {
            tiers,
            streak: StreakConfig {
                weekly_rewards: vec![
                    WeeklyReward { week: 1, label: "1 Spin".into(), reward: StreakReward::Spins { count: 1 } },
                    WeeklyReward { week: 2, label: "1 Spin".into(), reward: StreakReward::Spins { count: 1 } },
                    WeeklyReward { week: 3, label: "2 Spins".into(), reward: StreakReward::Spins { count: 2 } },
                    WeeklyReward { week: 4, label: "€1.00".into(), reward: StreakReward::Cash { cents: 100 } },
                ],
                at_risk_threshold_hours: 24,
            },
            wheel: WheelConfig {
                segments: vec![
                    segment(0, "€0.10", 0.10, 30.0),
                    segment(1, "€0.25", 0.25, 25.0),
                    segment(2, "€0.50", 0.50, 18.0),
                    segment(3, "€1", 1.0, 12.0),
                    segment(4, "€0.15", 0.15, 8.0),
                    segment(5, "€2", 2.0, 4.0),
                    segment(6, "€5", 5.0, 2.5),
                    jackpot,
                ],
                min_full_rotations: 5,
                max_full_rotations: 8,
            },
            mystery: MysteryTable {
                outcomes: vec![
                    MysteryOutcome { bonus: MysteryBonusType::Nothing, weight: 80.0 },
                    MysteryOutcome { bonus: MysteryBonusType::SpinToken, weight: 12.0 },
                    MysteryOutcome { bonus: MysteryBonusType::CashBonus { amount_cents: 25 }, weight: 6.0 },
                    MysteryOutcome { bonus: MysteryBonusType::CashBonus { amount_cents: 100 }, weight: 2.0 },
                ],
            },
            receipt: ReceiptRewardConfig { base_cash_cents: 50 },
            catalog: Catalog {
                coupons: vec![
                    Coupon {
                        coupon_id: "coffee_voucher".into(),
                        name: "Free coffee".into(),
                        cost_cents: 300,
                        description: "One hot drink at a partner café".into(),
                    },
                    Coupon {
                        coupon_id: "grocery_5".into(),
                        name: "€5 grocery voucher".into(),
                        cost_cents: 500,
                        description: String::new(),
                    },
                ],
                badges: vec![
                    Badge {
                        badge_id: "first_receipt".into(),
                        name: "First Receipt".into(),
                        unlock: BadgeUnlock::ReceiptsScanned { count: 1 },
                    },
                    Badge {
                        badge_id: "four_week_streak".into(),
                        name: "Regular".into(),
                        unlock: BadgeUnlock::StreakWeeks { weeks: 4 },
                    },
                    Badge {
                        badge_id: "silver_member".into(),
                        name: "Silver Member".into(),
                        unlock: BadgeUnlock::TierReached { tier_id: "silver".into() },
                    },
                    Badge {
                        badge_id: "spinner".into(),
                        name: "Spinner".into(),
                        unlock: BadgeUnlock::SpinsResolved { count: 10 },
                    },
                    Badge {
                        badge_id: "jackpot".into(),
                        name: "Jackpot!".into(),
                        unlock: BadgeUnlock::JackpotHit,
                    },
                ],
            },
        }
    }
}
