//! Printer Simulator CLI
//!
//! Run deterministic simulation scenarios against the printer engine.

use clap::Parser;
use printer_core::{PrinterConfig, PrinterEngine, SimulationClock};
use printer_env::{ActorId, SpatialKey, TokioContext};
use printer_sim::scenarios::ScenarioId;
use printer_sim::{Backend, ScenarioResult, ScenarioRunner, SimError, SimHost};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Printer Deterministic Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "printer-sim")]
#[command(about = "Run deterministic simulation scenarios for the printer engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (lifecycle, accrual, storage_cap, friends, upgrade_race, orphans, restart, chaos, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Sweeps in the chaos scenario
    #[arg(short, long, default_value = "500")]
    ticks: u64,

    /// Players in the chaos scenario
    #[arg(short, long, default_value = "6")]
    players: usize,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device store: memory, json:<dir> or sled:<dir>
    #[arg(short, long, default_value = "memory")]
    backend: Backend,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Run one fueled device on the wall clock for this many seconds instead of scenarios
    #[arg(long, value_name = "SECS")]
    live: Option<u64>,
}

fn load_config(path: Option<&PathBuf>) -> PrinterConfig {
    let Some(path) = path else {
        return PrinterConfig::default();
    };
    match PrinterConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}; using defaults", e);
            PrinterConfig::default()
        }
    }
}

/// Drives a real-time engine with the Tokio context until `secs` elapse.
///
/// Returns the number of sweeps the clock completed.
fn run_live(config: PrinterConfig, backend: &Backend, secs: u64) -> Result<u64, SimError> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        let host = SimHost::shared();
        let engine = Arc::new(PrinterEngine::open(config, backend.open()?, host.collaborators())?);

        let owner = ActorId::from_seed(1);
        let key = SpatialKey::new("live", 0, 64, 0);
        host.set_block(&key);
        host.give_items(owner, &engine.config().fuel_resource, 1);
        if !engine.is_protected(&key) {
            if let Err(e) = engine.place(owner, &key, 1) {
                warn!("Live device not placed: {}", e);
            }
        }
        if let Err(e) = engine.add_fuel(owner, &key) {
            warn!("Live device not fueled: {}", e);
        }

        let (stop, shutdown) = watch::channel(false);
        let clock = SimulationClock::new(engine.clone(), TokioContext::shared());
        info!(period_secs = clock.period().as_secs(), secs, "Running live");
        let finished = clock.start(shutdown);

        tokio::time::sleep(Duration::from_secs(secs)).await;
        let _ = stop.send(true);
        let sweeps = finished.await.unwrap_or(0);

        if let Some(device) = engine.device(&key) {
            info!(
                fuel = %device.fuel_clock(),
                stored = device.stored_earnings(),
                "Live device"
            );
        }
        for notification in host.take_inbox(owner) {
            info!(?notification, "Owner notified");
        }
        engine.shutdown()?;
        Ok::<u64, SimError>(sweeps)
    })
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Some(secs) = args.live {
        match run_live(load_config(args.config.as_ref()), &args.backend, secs) {
            Ok(sweeps) => {
                info!("Live run finished after {} sweeps", sweeps);
                return;
            }
            Err(e) => {
                error!("Live run failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if !args.json {
        info!("Printer Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios:");
                for id in ScenarioId::all() {
                    eprintln!("  {:<14} {}", id.name(), id.description());
                }
                std::process::exit(2);
            }
        }
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let config = load_config(args.config.as_ref());

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed)
            .with_config(config.clone())
            .with_backend(args.backend.clone())
            .with_ticks(args.ticks)
            .with_players(args.players);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "devices": r.final_device_count,
                    "metrics": r.metrics,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to render summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
