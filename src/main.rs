use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::collections::BTreeMap;

use delivery_sim::simulation::{RatingCriteria, SimWorld, TestWorldConfig};

#[derive(Parser)]
#[command(name = "delivery_sim")]
#[command(about = "Headless food delivery simulation")]
struct Cli {
    /// Number of ticks per simulation run
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Number of runs whose scores are averaged
    #[arg(long, default_value = "3")]
    runs: u64,

    /// Seed of the first run; later runs use the following seeds
    #[arg(long)]
    seed: Option<u64>,

    /// Orders placed per run
    #[arg(long, default_value = "200")]
    orders: usize,

    /// Vehicles based at every restaurant
    #[arg(long, default_value = "2")]
    vehicles: usize,

    /// Weight capacity of every vehicle
    #[arg(long, default_value = "1.0")]
    capacity: f64,

    /// Log a summary every N ticks (0 only logs at the end of a run)
    #[arg(long, default_value = "0")]
    summary_every: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!(
        "Running {} simulation(s) of {} ticks each ({} orders, {} vehicles per restaurant)",
        cli.runs, cli.ticks, cli.orders, cli.vehicles
    );

    let mut totals: BTreeMap<RatingCriteria, f64> = BTreeMap::new();
    for run in 0..cli.runs {
        let config = TestWorldConfig {
            order_count: cli.orders,
            vehicles_per_restaurant: cli.vehicles,
            vehicle_capacity: cli.capacity,
            seed: cli.seed.map(|seed| seed.wrapping_add(run)),
            ..TestWorldConfig::default()
        };
        let mut world = SimWorld::build_test_world(&config)
            .with_context(|| format!("Failed to build world for run {}", run + 1))?;

        run_headless(&mut world, cli.ticks, cli.summary_every)
            .with_context(|| format!("Run {} failed", run + 1))?;

        info!("--- Run {} finished ---", run + 1);
        world.print_summary();
        for (criteria, score) in world.scores() {
            *totals.entry(criteria).or_insert(0.0) += score;
        }
    }

    info!("=== SIMULATION COMPLETE ===");
    info!("Runs: {}", cli.runs);
    for (criteria, total) in &totals {
        info!("Average {}: {:.4}", criteria, total / cli.runs as f64);
    }
    Ok(())
}

/// Runs one world to completion, logging intermediate summaries
fn run_headless(world: &mut SimWorld, ticks: u64, summary_every: u64) -> Result<()> {
    let mut remaining = ticks;
    while remaining > 0 {
        let batch = if summary_every == 0 {
            remaining
        } else {
            summary_every.min(remaining)
        };
        world.run(batch)?;
        remaining -= batch;

        if summary_every > 0 && remaining > 0 {
            info!("--- After tick {} ---", world.current_tick());
            world.print_summary();
        }
    }
    Ok(())
}
