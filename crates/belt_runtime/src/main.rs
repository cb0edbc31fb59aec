//! Belt Runtime
//!
//! Headless host: loads settings, lays out a grid of belts, seeds items and
//! drives the simulation for a fixed number of ticks while logging
//! throughput.

mod layout;

use anyhow::{Context, Result};
use belt_core::scheduler::{PHASE_ADVANCE, PHASE_TRANSFER};
use belt_core::{Simulation, TickStats};
use belt_services::Settings;
use clap::Parser;
use layout::Layout;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "belts")]
#[command(version, about = "Run a headless conveyor belt simulation")]
struct Args {
    /// JSON settings file; defaults apply when omitted
    #[arg(long, short = 's')]
    settings: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long)]
    ticks: Option<u64>,

    /// Parties per tick, the main thread included
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Belts per row
    #[arg(long)]
    columns: Option<usize>,

    #[arg(long)]
    rows: Option<usize>,

    /// Progress units per tick
    #[arg(long)]
    dt: Option<f32>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    dump_settings: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(ticks) = self.ticks {
            settings.run.ticks = ticks;
        }
        if let Some(workers) = self.workers {
            settings.simulation.workers = workers;
        }
        if let Some(columns) = self.columns {
            settings.run.layout.columns = columns;
        }
        if let Some(rows) = self.rows {
            settings.run.layout.rows = rows;
        }
        if let Some(dt) = self.dt {
            settings.run.dt = dt;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::from_env().context("reading settings from the environment")?,
    };
    args.apply(&mut settings);
    settings.validate().context("invalid settings")?;

    if args.dump_settings {
        println!("{}", settings.to_json()?);
        return Ok(());
    }

    tracing::info!("Belts v{}", belt_core::VERSION);
    run(&settings)
}

fn run(settings: &Settings) -> Result<()> {
    let mut sim = Simulation::new(settings.simulation.clone()).context("starting simulation")?;
    let layout = Layout::build(&mut sim, &settings.run.layout).context("building layout")?;
    layout.seed(&mut sim, &settings.run.layout);

    let items = sim.item_count();
    tracing::info!(
        workers = sim.workers(),
        lanes = sim.lane_count(),
        hands = sim.hand_count(),
        items,
        "running {} ticks",
        settings.run.ticks
    );

    let mut window = TickStats::default();
    for tick in 1..=settings.run.ticks {
        let stats = sim.tick(settings.run.dt)?;
        window.delivered += stats.delivered;
        window.blocked += stats.blocked;
        window.newly_stuck += stats.newly_stuck;

        if settings.run.report_every > 0 && tick % settings.run.report_every == 0 {
            tracing::info!(
                tick,
                tick_ms = format_args!("{:.3}", sim.tick_time_ms()),
                delivered = window.delivered,
                blocked = window.blocked,
                stuck = window.newly_stuck,
                "progress"
            );
            window = TickStats::default();
        }
    }

    let timer = sim.tick_timer();
    let (min_ms, max_ms) = timer.tick_time_range_ms();
    let profiler = sim.profiler();
    tracing::info!(
        ticks = sim.time().tick_count(),
        simulated = sim.time().elapsed(),
        items = sim.item_count(),
        delivered = sim.events().get("delivered"),
        avg_ms = format_args!("{:.3}", timer.tick_time_ms()),
        min_ms = format_args!("{:.3}", min_ms),
        max_ms = format_args!("{:.3}", max_ms),
        advance_ms = format_args!("{:.3}", profiler.average(PHASE_ADVANCE).as_secs_f64() * 1000.0),
        transfer_ms = format_args!("{:.3}", profiler.average(PHASE_TRANSFER).as_secs_f64() * 1000.0),
        "run complete"
    );

    if sim.item_count() != items {
        tracing::warn!(before = items, after = sim.item_count(), "item count drifted");
    }
    Ok(())
}
