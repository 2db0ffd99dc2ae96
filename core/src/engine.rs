//! The reward engine: the single context object that owns every
//! user's reward state for one session.
//!
//! RULES:
//!   - All mutations for a user are serialized through `&mut self`.
//!   - Every multi-aggregate operation runs on a staged clone of the
//!     account and commits only after it fully succeeds.
//!   - The event batch is persisted before the staged account is
//!     committed; a store failure aborts the whole operation.
//!   - All randomness flows through the RngBank.

use crate::{
    account::RewardAccount,
    catalog::{redeem_coupon, CouponRedemption},
    clock::MonthKey,
    command::{CommandOutcome, UserCommand},
    config::RewardConfig,
    error::{RewardError, RewardResult},
    event::{EngineEvent, EventLogEntry},
    observer::RewardObserver,
    receipt_reward::{on_receipt_scanned, RewardEvent},
    rng::{RewardRng, RngBank, RngSlot},
    snapshot::{AccountSnapshot, SNAPSHOT_VERSION},
    spin_wheel::{SpinOutcome, SpinResult},
    store::RewardStore,
    streak::StreakChange,
    types::{Cents, SessionId, UserId},
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub struct RewardEngine {
    pub session_id: SessionId,
    pub rng_bank:   RngBank,
    config:         RewardConfig,
    store:          RewardStore,
    accounts:       BTreeMap<UserId, RewardAccount>,
    observers:      Vec<Box<dyn RewardObserver>>,
    /// `None` when polling is disabled; observers still see every event.
    pending:        Option<Vec<EngineEvent>>,
    seq:            u64,
    wheel_rng:      RewardRng,
    rotation_rng:   RewardRng,
    mystery_rng:    RewardRng,
    catalog_rng:    RewardRng,
}

impl RewardEngine {
    /// The session row must already exist in `store`.
    pub fn new(session_id: SessionId, seed: u64, config: RewardConfig, store: RewardStore) -> Self {
        let rng_bank = RngBank::new(seed);
        Self {
            wheel_rng:    rng_bank.for_slot(RngSlot::SpinWheel),
            rotation_rng: rng_bank.for_slot(RngSlot::Rotation),
            mystery_rng:  rng_bank.for_slot(RngSlot::Mystery),
            catalog_rng:  rng_bank.for_slot(RngSlot::Catalog),
            rng_bank,
            config,
            store,
            accounts: BTreeMap::new(),
            observers: Vec::new(),
            pending: Some(Vec::new()),
            seq: 0,
            session_id,
        }
    }

    /// Load config from `data_dir`, record the session and wire the engine.
    pub fn build(
        session_id: SessionId,
        seed: u64,
        store: RewardStore,
        data_dir: &str,
        started_at: DateTime<Utc>,
    ) -> RewardResult<Self> {
        let config = RewardConfig::load(data_dir)?;
        store.insert_session(&session_id, seed, env!("CARGO_PKG_VERSION"), &started_at.to_rfc3339())?;
        log::info!("session={session_id} engine: built with seed {seed}");
        Ok(Self::new(session_id, seed, config, store))
    }

    /// In-memory store and `RewardConfig::default_test()`.
    pub fn build_test(session_id: SessionId, seed: u64) -> RewardResult<Self> {
        let store = RewardStore::in_memory()?;
        store.migrate()?;
        store.insert_session(&session_id, seed, "0.1.0-test", "1970-01-01T00:00:00+00:00")?;
        Ok(Self::new(session_id, seed, RewardConfig::default_test(), store))
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn store(&self) -> &RewardStore {
        &self.store
    }

    pub fn register_observer(&mut self, observer: Box<dyn RewardObserver>) {
        log::debug!("session={} engine: observer '{}' registered", self.session_id, observer.name());
        self.observers.push(observer);
    }

    /// Stop queueing events for `drain_events`. For callers that only
    /// observe through registered observers.
    pub fn without_polling(mut self) -> Self {
        self.pending = None;
        self
    }

    /// Take every event published since the last drain.
    /// Always empty when polling is disabled.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.pending.as_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn account(&self, user_id: &str) -> RewardResult<&RewardAccount> {
        self.accounts
            .get(user_id)
            .ok_or_else(|| RewardError::UnknownAccount { user_id: user_id.to_string() })
    }

    pub fn accounts(&self) -> impl Iterator<Item = &RewardAccount> {
        self.accounts.values()
    }

    fn staged(&self, user_id: &str) -> RewardResult<RewardAccount> {
        self.account(user_id).cloned()
    }

    // ── Account lifecycle ──────────────────────────────────────

    pub fn open_account(&mut self, user_id: &str, now: DateTime<Utc>) -> RewardResult<&RewardAccount> {
        if self.accounts.contains_key(user_id) {
            return Err(RewardError::AccountExists { user_id: user_id.to_string() });
        }
        let account = RewardAccount::new(user_id.to_string(), &self.config.tiers, &self.config.streak, now);
        let events = vec![EngineEvent::AccountOpened { user_id: user_id.to_string(), at: now }];
        self.commit(account, events)?;
        log::info!("user={user_id} account: opened");
        self.account(user_id)
    }

    // ── Receipts ───────────────────────────────────────────────

    pub fn scan_receipt(&mut self, user_id: &str, now: DateTime<Utc>) -> RewardResult<RewardEvent> {
        let mut account = self.staged(user_id)?;
        let mut events = Vec::new();
        roll_over_account(&self.config, &mut account, now, &mut events);

        let tier_before = account.tier.current_tier.clone();
        let outcome = on_receipt_scanned(&self.config, &mut account, now, &mut self.mystery_rng)?;

        push_streak_changes(user_id, &outcome.streak.changes, &mut events);
        if let Some(week) = outcome.streak.completed_week {
            events.push(EngineEvent::StreakWeekCompleted {
                user_id: user_id.to_string(),
                week,
                week_count: account.streak.week_count,
            });
        }
        if account.tier.current_tier != tier_before {
            events.push(EngineEvent::TierChanged {
                user_id: user_id.to_string(),
                from_tier: tier_before,
                to_tier: account.tier.current_tier.clone(),
                receipts_this_month: account.tier.receipts_this_month,
            });
        }
        events.push(EngineEvent::ReceiptRewarded {
            user_id: user_id.to_string(),
            at: now,
            coins_awarded_cents: outcome.reward.coins_awarded_cents,
            spins_awarded: outcome.reward.spins_awarded,
            mystery_bonus: outcome.reward.mystery_bonus,
            balance_cents: account.wallet.balance(),
        });
        unlock_badges(&self.config, &mut account, &mut events);

        self.commit(account, events)?;
        Ok(outcome.reward)
    }

    // ── Rollover ───────────────────────────────────────────────

    /// Apply month reset and missed weeks up to `now`.
    pub fn roll_over(&mut self, user_id: &str, now: DateTime<Utc>) -> RewardResult<Vec<EngineEvent>> {
        let mut account = self.staged(user_id)?;
        let mut events = Vec::new();
        roll_over_account(&self.config, &mut account, now, &mut events);
        self.commit(account, events.clone())?;
        Ok(events)
    }

    /// Evaluated against `now` without committing any rollover.
    pub fn is_at_risk(&self, user_id: &str, now: DateTime<Utc>) -> RewardResult<bool> {
        let mut streak = self.account(user_id)?.streak.clone();
        streak.advance_to(&self.config.streak, now);
        Ok(streak.is_at_risk)
    }

    // ── Spin wheel ─────────────────────────────────────────────

    pub fn begin_spin(&mut self, user_id: &str) -> RewardResult<SpinOutcome> {
        let mut account = self.staged(user_id)?;
        let spin = account.wheel.spin(
            &self.config.wheel,
            &mut account.spins,
            &mut account.wallet,
            &mut self.wheel_rng,
            &mut self.rotation_rng,
        );
        let outcome = match spin {
            Ok(o) => o,
            Err(e) => {
                log::warn!("user={user_id} spin: rejected: {e}");
                return Err(e);
            }
        };

        let events = vec![EngineEvent::SpinStarted {
            user_id: user_id.to_string(),
            result: outcome.result,
            total_rotation_degrees: outcome.total_rotation_degrees,
            spins_left: account.spins.available(),
        }];
        log::info!(
            "user={user_id} spin: segment {} ({}c) jackpot={} rotation={:.1}",
            outcome.result.segment_index,
            outcome.result.value_cents(),
            outcome.result.is_jackpot,
            outcome.total_rotation_degrees
        );
        self.commit(account, events)?;
        Ok(outcome)
    }

    /// Reveal the prize of the in-flight spin.
    pub fn finish_spin(&mut self, user_id: &str) -> RewardResult<SpinResult> {
        let mut account = self.staged(user_id)?;
        let result = account.wheel.finish()?;
        account.stats.spins_resolved += 1;
        if result.is_jackpot {
            account.stats.jackpots_hit += 1;
        }

        let mut events = vec![EngineEvent::SpinRevealed { user_id: user_id.to_string(), result }];
        unlock_badges(&self.config, &mut account, &mut events);
        self.commit(account, events)?;
        Ok(result)
    }

    pub fn acknowledge_spin(&mut self, user_id: &str) -> RewardResult<()> {
        let mut account = self.staged(user_id)?;
        account.wheel.acknowledge();
        self.commit(account, Vec::new())
    }

    // ── Catalog ────────────────────────────────────────────────

    pub fn redeem_coupon(&mut self, user_id: &str, coupon_id: &str) -> RewardResult<CouponRedemption> {
        let coupon = self
            .config
            .catalog
            .coupon(coupon_id)
            .cloned()
            .ok_or_else(|| RewardError::UnknownCoupon { coupon_id: coupon_id.to_string() })?;

        let mut account = self.staged(user_id)?;
        let balance_cents = match redeem_coupon(&mut account, &coupon) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("user={user_id} coupon: {coupon_id} rejected: {e}");
                return Err(e);
            }
        };

        let redemption_id = uuid::Builder::from_random_bytes(self.catalog_rng.next_bytes16())
            .into_uuid()
            .to_string();
        let redemption = CouponRedemption {
            redemption_id: redemption_id.clone(),
            coupon_id: coupon.coupon_id.clone(),
            cost_cents: coupon.cost_cents,
            balance_cents,
        };
        let events = vec![EngineEvent::CouponRedeemed {
            user_id: user_id.to_string(),
            coupon_id: coupon.coupon_id,
            redemption_id,
            cost_cents: coupon.cost_cents,
            balance_cents,
        }];
        log::info!("user={user_id} coupon: redeemed {coupon_id} for {}c", redemption.cost_cents);
        self.commit(account, events)?;
        Ok(redemption)
    }

    // ── Sync collaborator ──────────────────────────────────────

    pub fn set_wallet_balance(&mut self, user_id: &str, balance: Cents) -> RewardResult<()> {
        let mut account = self.staged(user_id)?;
        account.wallet.set_balance(balance);
        self.commit(account, vec![synced(user_id, "wallet_balance")])
    }

    pub fn set_spin_tokens(&mut self, user_id: &str, tokens: u32) -> RewardResult<()> {
        let mut account = self.staged(user_id)?;
        account.spins.set_available(tokens);
        self.commit(account, vec![synced(user_id, "spin_tokens")])
    }

    pub fn set_receipts_this_month(&mut self, user_id: &str, receipts: u32) -> RewardResult<()> {
        let mut account = self.staged(user_id)?;
        account.tier = account.tier.with_receipts(&self.config.tiers, receipts);
        self.commit(account, vec![synced(user_id, "receipts_this_month")])
    }

    pub fn grant_shield(&mut self, user_id: &str) -> RewardResult<()> {
        let mut account = self.staged(user_id)?;
        account.streak.grant_shield();
        self.commit(account, vec![synced(user_id, "shield")])
    }

    pub fn save_snapshot(&self, user_id: &str, now: DateTime<Utc>) -> RewardResult<()> {
        let snapshot = AccountSnapshot {
            version:    SNAPSHOT_VERSION,
            session_id: self.session_id.clone(),
            user_id:    user_id.to_string(),
            saved_at:   now,
            account:    self.account(user_id)?.clone(),
        };
        let json = serde_json::to_string(&snapshot)?;
        self.store.save_snapshot(&self.session_id, user_id, &now.to_rfc3339(), &json)?;
        log::debug!("user={user_id} snapshot: saved");
        Ok(())
    }

    /// Replace in-memory state with the latest stored snapshot.
    /// Returns false when no snapshot exists.
    pub fn restore_snapshot(&mut self, user_id: &str) -> RewardResult<bool> {
        let Some(json) = self.store.latest_snapshot(user_id)? else {
            return Ok(false);
        };
        let snapshot: AccountSnapshot = serde_json::from_str(&json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RewardError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        self.commit(snapshot.account, vec![synced(user_id, "snapshot")])?;
        log::info!("user={user_id} snapshot: restored from session {}", snapshot.session_id);
        Ok(true)
    }

    // ── Commands ───────────────────────────────────────────────

    pub fn apply(&mut self, command: UserCommand, now: DateTime<Utc>) -> RewardResult<CommandOutcome> {
        let outcome = match command {
            UserCommand::OpenAccount { user_id } => {
                self.open_account(&user_id, now)?;
                CommandOutcome::AccountOpened
            }
            UserCommand::ScanReceipt { user_id } => CommandOutcome::ReceiptRewarded {
                reward: self.scan_receipt(&user_id, now)?,
            },
            UserCommand::Spin { user_id } => CommandOutcome::SpinStarted {
                spin: self.begin_spin(&user_id)?,
            },
            UserCommand::FinishSpin { user_id } => CommandOutcome::SpinRevealed {
                result: self.finish_spin(&user_id)?,
            },
            UserCommand::AcknowledgeSpin { user_id } => {
                self.acknowledge_spin(&user_id)?;
                CommandOutcome::SpinAcknowledged
            }
            UserCommand::RedeemCoupon { user_id, coupon_id } => CommandOutcome::CouponRedeemed {
                redemption: self.redeem_coupon(&user_id, &coupon_id)?,
            },
            UserCommand::RollOver { user_id } => CommandOutcome::RolledOver {
                events: self.roll_over(&user_id, now)?.len(),
            },
            UserCommand::SetWalletBalance { user_id, balance_cents } => {
                self.set_wallet_balance(&user_id, balance_cents)?;
                CommandOutcome::Synced
            }
            UserCommand::SetSpinTokens { user_id, tokens } => {
                self.set_spin_tokens(&user_id, tokens)?;
                CommandOutcome::Synced
            }
            UserCommand::SetReceiptsThisMonth { user_id, receipts } => {
                self.set_receipts_this_month(&user_id, receipts)?;
                CommandOutcome::Synced
            }
            UserCommand::GrantShield { user_id } => {
                self.grant_shield(&user_id)?;
                CommandOutcome::Synced
            }
        };
        Ok(outcome)
    }

    // ── Commit ─────────────────────────────────────────────────

    /// Persist the event batch, then swap in the staged account and notify.
    fn commit(&mut self, account: RewardAccount, events: Vec<EngineEvent>) -> RewardResult<()> {
        let entries = events
            .iter()
            .enumerate()
            .map(|(i, event)| -> RewardResult<EventLogEntry> {
                Ok(EventLogEntry {
                    id:         None,
                    session_id: self.session_id.clone(),
                    seq:        self.seq + i as u64 + 1,
                    user_id:    event.user_id().to_string(),
                    event_type: event.event_type().to_string(),
                    payload:    serde_json::to_string(event)?,
                })
            })
            .collect::<RewardResult<Vec<_>>>()?;
        if !entries.is_empty() {
            self.store.append_events(&entries)?;
        }

        self.seq += entries.len() as u64;
        self.accounts.insert(account.user_id.clone(), account);
        for event in &events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }
        if let Some(pending) = self.pending.as_mut() {
            pending.extend(events);
        }
        Ok(())
    }
}

fn synced(user_id: &str, field: &str) -> EngineEvent {
    EngineEvent::StateSynced { user_id: user_id.to_string(), field: field.to_string() }
}

fn roll_over_account(
    config: &RewardConfig,
    account: &mut RewardAccount,
    now: DateTime<Utc>,
    events: &mut Vec<EngineEvent>,
) {
    let month = MonthKey::of(now);
    if month > account.tier.month {
        let previous_receipts = account.tier.receipts_this_month;
        let from_tier = account.tier.current_tier.clone();
        account.tier = account.tier.reset_for_new_month(&config.tiers, month);
        events.push(EngineEvent::MonthReset {
            user_id: account.user_id.clone(),
            month,
            previous_receipts,
        });
        if from_tier != account.tier.current_tier {
            events.push(EngineEvent::TierChanged {
                user_id: account.user_id.clone(),
                from_tier,
                to_tier: account.tier.current_tier.clone(),
                receipts_this_month: 0,
            });
        }
        log::info!("user={} tier: month reset to {month}", account.user_id);
    }

    let changes = account.streak.advance_to(&config.streak, now);
    push_streak_changes(&account.user_id, &changes, events);
}

fn push_streak_changes(user_id: &str, changes: &[StreakChange], events: &mut Vec<EngineEvent>) {
    for change in changes {
        match change {
            StreakChange::ShieldConsumed { missed_week } => {
                log::info!("user={user_id} streak: shield consumed for week {missed_week}");
                events.push(EngineEvent::ShieldConsumed {
                    user_id: user_id.to_string(),
                    missed_week: *missed_week,
                });
            }
            StreakChange::Reset { lost_week_count } => {
                log::info!("user={user_id} streak: reset after {lost_week_count} weeks");
                events.push(EngineEvent::StreakReset {
                    user_id: user_id.to_string(),
                    lost_week_count: *lost_week_count,
                });
            }
            StreakChange::CycleRestarted => {
                log::debug!("user={user_id} streak: new cycle");
            }
        }
    }
}

fn unlock_badges(config: &RewardConfig, account: &mut RewardAccount, events: &mut Vec<EngineEvent>) {
    let unlocked: Vec<String> = config
        .catalog
        .newly_unlocked(account, &config.tiers)
        .into_iter()
        .map(|b| b.badge_id.clone())
        .collect();
    for badge_id in unlocked {
        log::info!("user={} badge: unlocked {badge_id}", account.user_id);
        account.badges.insert(badge_id.clone());
        events.push(EngineEvent::BadgeUnlocked {
            user_id: account.user_id.clone(),
            badge_id,
        });
    }
}
