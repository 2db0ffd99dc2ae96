//! Streak tracker: a rolling 4-week cycle of weekly scan activity.
//!
//! Lifecycle of one cycle:
//!   week 1 → week 2 → week 3 → week 4 → (fresh cycle) week 1
//!
//! A week is completed by its first qualifying scan. A week that ends
//! uncompleted either burns the shield or resets the streak.

use crate::{
    clock::{week_end, week_length, week_start, weeks_between},
    error::{RewardError, RewardResult},
    types::Cents,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const CYCLE_WEEKS: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakReward {
    Cash { cents: Cents },
    Spins { count: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyReward {
    pub week: u8,
    pub label: String,
    pub reward: StreakReward,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakConfig {
    pub weekly_rewards: Vec<WeeklyReward>,
    /// A week with no scan is at risk once less than this much of it remains.
    pub at_risk_threshold_hours: i64,
}

impl StreakConfig {
    pub fn validate(&self) -> RewardResult<()> {
        for week in 1..=CYCLE_WEEKS as u8 {
            let n = self.weekly_rewards.iter().filter(|r| r.week == week).count();
            if n != 1 {
                return Err(RewardError::invalid_config(format!(
                    "weekly reward table must define week {week} exactly once, found {n}"
                )));
            }
        }
        if self.weekly_rewards.len() != CYCLE_WEEKS {
            return Err(RewardError::invalid_config(format!(
                "weekly reward table has {} entries, expected {CYCLE_WEEKS}",
                self.weekly_rewards.len()
            )));
        }
        if !(0..=24 * 7).contains(&self.at_risk_threshold_hours) {
            return Err(RewardError::invalid_config(format!(
                "at-risk threshold {}h is outside one week",
                self.at_risk_threshold_hours
            )));
        }
        Ok(())
    }

    pub fn weekly_reward(&self, week: u8) -> Option<&WeeklyReward> {
        self.weekly_rewards.iter().find(|r| r.week == week)
    }

    pub fn at_risk_threshold(&self) -> Duration {
        Duration::hours(self.at_risk_threshold_hours)
    }

    fn fresh_cycle(&self) -> [CycleEntry; CYCLE_WEEKS] {
        std::array::from_fn(|i| {
            let week = i as u8 + 1;
            let reward = self.weekly_reward(week);
            CycleEntry {
                week,
                is_cash: matches!(reward.map(|r| r.reward), Some(StreakReward::Cash { .. })),
                completed: false,
                label: reward.map(|r| r.label.clone()).unwrap_or_default(),
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleEntry {
    pub week: u8,
    pub is_cash: bool,
    pub completed: bool,
    pub label: String,
}

/// A change to the streak caused by time passing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakChange {
    ShieldConsumed { missed_week: u8 },
    Reset { lost_week_count: u32 },
    CycleRestarted,
}

/// Result of a qualifying scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakScan {
    pub changes: Vec<StreakChange>,
    /// Set when this scan completed a week.
    pub completed_week: Option<u8>,
    pub reward: Option<StreakReward>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreakData {
    pub week_count: u32,
    pub current_cycle: [CycleEntry; CYCLE_WEEKS],
    /// 1-based index into `current_cycle`.
    pub current_week: u8,
    pub week_started_at: DateTime<Utc>,
    pub has_shield: bool,
    pub is_at_risk: bool,
    pub last_qualifying_scan_at: Option<DateTime<Utc>>,
}

impl StreakData {
    pub fn new(config: &StreakConfig, now: DateTime<Utc>) -> Self {
        Self {
            week_count: 0,
            current_cycle: config.fresh_cycle(),
            current_week: 1,
            week_started_at: week_start(now),
            has_shield: false,
            is_at_risk: false,
            last_qualifying_scan_at: None,
        }
    }

    pub fn current_entry(&self) -> &CycleEntry {
        &self.current_cycle[self.cycle_slot()]
    }

    fn cycle_slot(&self) -> usize {
        usize::from(self.current_week.clamp(1, CYCLE_WEEKS as u8)) - 1
    }

    fn has_progress(&self) -> bool {
        self.week_count > 0 || self.current_cycle.iter().any(|e| e.completed)
    }

    fn restart_cycle(&mut self, config: &StreakConfig) {
        self.current_cycle = config.fresh_cycle();
        self.current_week = 1;
    }

    /// Walk every week boundary between the current week and `now`,
    /// applying the missed-week law to each elapsed week.
    pub fn advance_to(&mut self, config: &StreakConfig, now: DateTime<Utc>) -> Vec<StreakChange> {
        let mut changes = Vec::new();

        while weeks_between(self.week_started_at, now) > 0 {
            let missed = !self.current_entry().completed;
            self.week_started_at += week_length();

            if missed {
                // With nothing to lose the shield is kept.
                if self.has_shield && self.has_progress() {
                    self.has_shield = false;
                    changes.push(StreakChange::ShieldConsumed {
                        missed_week: self.current_week,
                    });
                } else {
                    if self.has_progress() {
                        changes.push(StreakChange::Reset {
                            lost_week_count: self.week_count,
                        });
                    }
                    self.week_count = 0;
                    self.restart_cycle(config);
                    continue;
                }
            }

            if usize::from(self.current_week) >= CYCLE_WEEKS {
                self.restart_cycle(config);
                changes.push(StreakChange::CycleRestarted);
            } else {
                self.current_week += 1;
            }
        }

        self.refresh_risk(config, now);
        changes
    }

    pub fn record_qualifying_scan(
        &self,
        config: &StreakConfig,
        now: DateTime<Utc>,
    ) -> (StreakData, StreakScan) {
        let mut next = self.clone();
        let mut scan = StreakScan {
            changes: next.advance_to(config, now),
            ..Default::default()
        };

        let slot = next.cycle_slot();
        if !next.current_cycle[slot].completed {
            next.current_cycle[slot].completed = true;
            next.week_count = next.week_count.saturating_add(1);
            scan.completed_week = Some(next.current_week);
            scan.reward = config.weekly_reward(next.current_week).map(|r| r.reward);
        }
        next.last_qualifying_scan_at = Some(now);
        next.is_at_risk = false;

        (next, scan)
    }

    pub fn refresh_risk(&mut self, config: &StreakConfig, now: DateTime<Utc>) {
        self.is_at_risk = !self.current_entry().completed
            && is_at_risk(now, self.last_qualifying_scan_at, config.at_risk_threshold());
    }

    /// Next cash week at or after the current week that is not yet completed.
    pub fn next_cash_week(&self) -> Option<u8> {
        self.current_cycle
            .iter()
            .find(|e| e.week >= self.current_week && e.is_cash && !e.completed)
            .map(|e| e.week)
    }

    pub fn weeks_until_cash(&self) -> Option<u8> {
        self.next_cash_week().map(|w| w - self.current_week)
    }

    pub fn grant_shield(&mut self) {
        self.has_shield = true;
    }
}

/// True iff the week containing `now` has no qualifying scan yet and less
/// than `threshold` of it remains.
pub fn is_at_risk(
    now: DateTime<Utc>,
    last_qualifying_scan_at: Option<DateTime<Utc>>,
    threshold: Duration,
) -> bool {
    let scanned_this_week = last_qualifying_scan_at
        .map(|t| week_start(t) == week_start(now))
        .unwrap_or(false);
    !scanned_this_week && week_end(now) - now < threshold
}
