//! frame-sim: drives a FrameScheduler from a simulated host loop.
//!
//! Producer threads submit synthetic tasks at a steady rate while the main
//! thread plays the consumer, calling `process_frame` once per tick. Useful
//! for tuning frame budgets and boost constants against a given load.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use framequeue::{FrameScheduler, Priority, SchedulerConfig, StopReason};
use framequeue_core::config::{load_dotenv, Config};

// ── CLI ─────────────────────────────────────────────────────────────

/// Simulated host loop for the frame scheduler.
#[derive(Parser, Debug)]
#[command(name = "frame-sim", version, about)]
struct Cli {
    /// Scheduler TOML config (defaults used when absent).
    #[arg(long, env = "FRAMEQUEUE_SCHEDULER_CONFIG")]
    config: Option<PathBuf>,

    /// Number of producer threads.
    #[arg(long, default_value_t = 4)]
    producers: usize,

    /// Host ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Tick period in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Delay between submissions per producer, in microseconds.
    #[arg(long, default_value_t = 4_000)]
    submit_interval_us: u64,

    /// Busy work per task, in microseconds.
    #[arg(long, default_value_t = 300)]
    task_us: u64,

    /// Make every Nth task panic (0 = never).
    #[arg(long, default_value_t = 0)]
    fault_every: u64,

    /// Print final statistics as JSON.
    #[arg(long)]
    json: bool,
}

/// Burn CPU for `d` without yielding, like a real short callback would.
fn busy_work(d: Duration) {
    let start = Instant::now();
    while start.elapsed() < d {
        std::hint::spin_loop();
    }
}

fn load_scheduler_config(cli: &Cli, env: &Config) -> anyhow::Result<SchedulerConfig> {
    let base = match cli.config.as_ref().or(env.scheduler_config.as_ref()) {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("loading scheduler config from {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    base.with_env_overrides(&env.profile)
        .context("applying FRAMEQUEUE_* overrides")
}

fn spawn_producer(
    index: usize,
    scheduler: Arc<FrameScheduler>,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    cli: &Cli,
) -> thread::JoinHandle<u64> {
    let interval = Duration::from_micros(cli.submit_interval_us);
    let work = Duration::from_micros(cli.task_us);
    let fault_every = cli.fault_every;

    thread::spawn(move || {
        let mut submitted = 0u64;
        while !stop.load(Ordering::Relaxed) {
            let n = submitted + index as u64;
            let priority = Priority::ALL[(n % Priority::ALL.len() as u64) as usize];
            let faulty = fault_every > 0 && n % fault_every == 0;
            let accepted = scheduler.queue_task(
                move || {
                    busy_work(work);
                    if faulty {
                        panic!("simulated task fault");
                    }
                },
                priority,
            );
            if accepted {
                submitted += 1;
            } else {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            thread::sleep(interval);
        }
        submitted
    })
}

fn main() -> anyhow::Result<()> {
    load_dotenv();
    let env = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&env.log_filter)),
        )
        .init();

    let cli = Cli::parse();
    env.log_summary();

    let config = load_scheduler_config(&cli, &env)?;
    let scheduler = Arc::new(FrameScheduler::new(config)?);
    let stop = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicU64::new(0));

    let producers: Vec<_> = (0..cli.producers)
        .map(|i| spawn_producer(i, Arc::clone(&scheduler), Arc::clone(&stop), Arc::clone(&dropped), &cli))
        .collect();

    info!("Simulating {} ticks of {}ms with {} producers", cli.ticks, cli.tick_ms, cli.producers);

    let tick = Duration::from_millis(cli.tick_ms);
    let mut deadline_frames = 0u64;
    let mut worst_frame = Duration::ZERO;
    for _ in 0..cli.ticks {
        let tick_start = Instant::now();
        let report = scheduler.process_frame();
        if report.stop_reason == StopReason::Deadline {
            deadline_frames += 1;
        }
        worst_frame = worst_frame.max(report.elapsed);
        if let Some(rest) = tick.checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    stop.store(true, Ordering::Relaxed);
    let mut submitted = 0;
    for handle in producers {
        match handle.join() {
            Ok(n) => submitted += n,
            Err(_) => warn!("Producer thread panicked"),
        }
    }

    let stats = scheduler.snapshot();
    scheduler.dispose();

    if cli.json {
        let mut out = stats.to_json().context("serializing scheduler statistics")?;
        out["environment"] = env.summary();
        out["submitted"] = submitted.into();
        out["dropped_by_producers"] = dropped.load(Ordering::Relaxed).into();
        out["deadline_frames"] = deadline_frames.into();
        out["worst_frame_ms"] = (worst_frame.as_secs_f64() * 1000.0).into();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        info!(
            submitted,
            processed = stats.processed_total,
            faulted = stats.faulted_total,
            rejected = stats.rejected_total,
            left_queued = stats.queued,
            rate = stats.rate,
            deadline_frames,
            worst_frame_ms = worst_frame.as_secs_f64() * 1000.0,
            "Simulation finished"
        );
    }
    Ok(())
}
