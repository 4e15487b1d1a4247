//! Legacy scheduler compatibility runner
//!
//! This binary:
//! 1. Starts a tick-driven region host with two worlds
//! 2. Registers the single-context legacy scheduler as the host's scheduler
//!    service
//! 3. Installs the compatibility scheduler in its place
//! 4. Loads demo modules that only speak the legacy API
//! 5. Ticks until Ctrl-C (or `RUN_TICKS`), then restores the original
//!
//! Configuration (environment):
//! - `TARGET_TPS` - ticks per second (default 20)
//! - `RUN_TICKS` - stop after this many ticks
//! - `PURGE_EVERY_TICKS` - forget finished shadow tasks this often (default 100)
//! - `REGION_THREADS` - region worker threads (default: available cores)
//! - `COMPAT_*` - see `CompatConfig::from_env`

mod modules;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use legacy_scheduler::{MainThreadScheduler, SchedulerRef, SchedulerSlot, ServiceSlot};
use rgb_compat::{CompatConfig, SchedulerManager};
use rgb_spatial::{BlockPos, WorldId};
use rgb_tick::TickScheduler;
use tracing::{error, info, warn};

use crate::modules::ModuleHost;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("compat_runner=info".parse()?)
                .add_directive("rgb_compat=info".parse()?),
        )
        .init();

    info!("Starting compatibility runner");

    // Configuration
    let target_tps: f32 = env_or("TARGET_TPS", 20.0_f32).max(1.0);
    let run_ticks: Option<u64> = std::env::var("RUN_TICKS")
        .ok()
        .and_then(|v| v.parse().ok());
    let purge_every: u64 = env_or("PURGE_EVERY_TICKS", 100_u64).max(1);
    let threads: usize = env_or(
        "REGION_THREADS",
        thread::available_parallelism().map_or(4, |n| n.get()),
    );
    let config = CompatConfig::from_env();
    info!("Config: {:?}, {} region threads", config, threads);

    // Host. This thread becomes the privileged thread.
    let host = Arc::new(TickScheduler::new(threads)?.with_tick_duration(config.tick_duration));
    host.load_world(WorldId(0), BlockPos::new(0, 64, 0));
    host.load_world(WorldId(1), BlockPos::new(16, 70, 16));

    // The scheduler service modules were written against
    let legacy = Arc::new(MainThreadScheduler::new());
    let slot = Arc::new(ServiceSlot::new(legacy.clone()));

    let manager = SchedulerManager::new(slot.clone(), host.clone(), config);
    let proxy = match manager.install() {
        Ok(proxy) => Some(proxy),
        Err(e) => {
            error!("Failed to install compatibility scheduler, running unadapted: {}", e);
            None
        }
    };

    // Modules look the scheduler up the same way they always did
    let scheduler: SchedulerRef = slot.load()?;
    let mut modules = ModuleHost::new(scheduler);
    for extension in modules::demo() {
        modules.load(extension);
    }
    info!("Loaded modules: {:?}", modules.names());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    // Run tick loop
    let target_delta = Duration::from_secs_f32(1.0 / target_tps);
    let mut tick: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let start = Instant::now();

        let report = host.tick();
        // Work that bypassed adaptation still needs the old main loop
        legacy.tick();
        tick += 1;

        if tick.is_multiple_of(purge_every) {
            if let Some(proxy) = &proxy {
                let purged = proxy.purge_finished();
                info!(
                    "Tick {}: {} task(s) ran, purged {} finished, {} shadow task(s) tracked",
                    tick,
                    report.total(),
                    purged,
                    proxy.registry().len()
                );
            }
        }

        if run_ticks.is_some_and(|limit| tick >= limit) {
            info!("Reached RUN_TICKS={}", tick);
            break;
        }

        // Sleep to maintain target TPS
        let elapsed = start.elapsed();
        if elapsed < target_delta {
            thread::sleep(target_delta - elapsed);
        } else {
            warn!("Tick {} took {:?}, over budget", tick, elapsed);
        }
    }

    // Cleanup
    info!("Shutting down...");
    modules.disable_all();
    if manager.is_installed() {
        if let Err(e) = manager.restore() {
            warn!("Failed to restore original scheduler: {}", e);
        }
    }
    let cancelled = host.shutdown();
    info!("Cancelled {} pending host task(s)", cancelled);

    Ok(())
}
