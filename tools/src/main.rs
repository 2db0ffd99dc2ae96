//! reward-runner: headless driver for the receipt reward engine.
//!
//! Usage:
//!   reward-runner --seed 12345 --weeks 12 --scans-per-week 3 --db run.db
//!   reward-runner --seed 12345 --ipc-mode

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use receipt_rewards_core::{
    clock::week_start,
    command::{CommandOutcome, UserCommand},
    engine::RewardEngine,
    event::EngineEvent,
    store::RewardStore,
    types::cents_to_euros,
};
use std::env;
use std::io::{self, BufRead, Write};

const SIM_USER: &str = "sim-user";

#[derive(serde::Serialize)]
struct IpcReply {
    outcome: CommandOutcome,
    events: Vec<EngineEvent>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let weeks = parse_arg(&args, "--weeks", 12i64);
    let scans_per_week = parse_arg(&args, "--scans-per-week", 3i64).max(1);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    if !ipc_mode {
        println!("Receipt Rewards: reward-runner");
        println!("  seed:           {seed}");
        println!("  weeks:          {weeks}");
        println!("  scans per week: {scans_per_week}");
        println!("  db:             {db}");
        println!("  data_dir:       {data_dir}");
        println!();
    }

    let store = if db == ":memory:" { RewardStore::in_memory()? } else { RewardStore::open(db)? };
    store.migrate()?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let engine = RewardEngine::build(session_id, seed, store, data_dir, started_at)?;
    // Simulation reads the store, never the event queue.
    let mut engine = if ipc_mode { engine } else { engine.without_polling() };

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        let start = week_start(started_at);
        run_simulation(&mut engine, start, weeks, scans_per_week)?;
        print_summary(&engine)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut RewardEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let reply = serde_json::from_str::<UserCommand>(&buffer)
            .map_err(anyhow::Error::from)
            .and_then(|cmd| Ok(engine.apply(cmd, Utc::now())?));

        let line = match reply {
            Ok(outcome) => serde_json::to_string(&IpcReply {
                outcome,
                events: engine.drain_events(),
            })?,
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        };
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Scan evenly through each week, spend every spin, and buy each coupon
/// once the balance allows.
fn run_simulation(
    engine: &mut RewardEngine,
    start: DateTime<Utc>,
    weeks: i64,
    scans_per_week: i64,
) -> Result<()> {
    engine.open_account(SIM_USER, start)?;
    let step = Duration::hours(24 * 7 / scans_per_week);

    for week in 0..weeks {
        for scan in 0..scans_per_week {
            let now = start + Duration::weeks(week) + step * scan as i32 + Duration::hours(9);
            engine.scan_receipt(SIM_USER, now)?;

            while engine.account(SIM_USER)?.spins.available() > 0 {
                engine.begin_spin(SIM_USER)?;
                engine.finish_spin(SIM_USER)?;
                engine.acknowledge_spin(SIM_USER)?;
            }

            let affordable: Vec<String> = {
                let account = engine.account(SIM_USER)?;
                engine
                    .config()
                    .catalog
                    .coupons
                    .iter()
                    .filter(|c| !account.coupons.contains(&c.coupon_id))
                    .filter(|c| c.cost_cents <= account.wallet.balance())
                    .map(|c| c.coupon_id.clone())
                    .take(1)
                    .collect()
            };
            for coupon_id in affordable {
                engine.redeem_coupon(SIM_USER, &coupon_id)?;
            }
        }
        log::debug!("user={SIM_USER} runner: week {} done", week + 1);
    }
    Ok(())
}

fn print_summary(engine: &RewardEngine) -> Result<()> {
    let account = engine.account(SIM_USER)?;
    let session_id = &engine.session_id;
    let tiers = &engine.config().tiers;
    let store = engine.store();

    println!("=== RUN SUMMARY ===");
    println!("  session_id:       {session_id}");
    println!("  receipts:         {}", account.stats.lifetime_receipts);
    println!("  balance:          €{:.2}", cents_to_euros(account.wallet.balance()));
    println!("  spins left:       {}", account.spins.available());
    println!("  spins resolved:   {}", account.stats.spins_resolved);
    println!("  jackpots:         {}", account.stats.jackpots_hit);
    println!(
        "  tier:             {} ({} receipts this month, {} to next)",
        account.tier.tier(tiers).label,
        account.tier.receipts_this_month,
        account.tier.receipts_needed_for_next_tier(tiers)
    );
    println!(
        "  streak:           {} weeks (cycle week {}, shield: {})",
        account.streak.week_count, account.streak.current_week, account.streak.has_shield
    );
    println!("  streak resets:    {}", store.event_count(session_id, "streak_reset")?);
    println!("  tier changes:     {}", store.event_count(session_id, "tier_changed")?);

    println!();
    println!("=== COUPONS ===");
    if account.coupons.is_empty() {
        println!("  (none redeemed)");
    }
    for coupon_id in &account.coupons {
        println!("  {coupon_id}");
    }

    println!();
    println!("=== BADGES ===");
    if account.badges.is_empty() {
        println!("  (none unlocked)");
    }
    for badge_id in &account.badges {
        println!("  {badge_id}");
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
