//! Headless runner for the flora ecosystem simulation.
//!
//! Plays the role of the external scheduler: it drives the engine one tick
//! at a time on a fixed cadence and reports a summary. Rendering and cursor
//! handling belong to a separate presentation layer and are not done here.

use anyhow::Result;
use clap::Parser;
use flora_core::SimConfig;
use flora_world::Simulation;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "flora", about = "Run the flora ecosystem simulation headlessly")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Delay between ticks in milliseconds (0 runs flat out)
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Capacity shared by every resource counter
    #[arg(long, default_value_t = 10)]
    resource_cap: u32,

    /// Age beyond which a cell dies
    #[arg(long, default_value_t = 50)]
    death_age: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = SimConfig {
        resource_cap: args.resource_cap,
        death_age: args.death_age,
    };

    let mut sim = Simulation::new(config)?;
    info!(ticks = args.ticks, interval_ms = args.interval_ms, "starting run");

    if args.interval_ms == 0 {
        sim.run(args.ticks);
    } else {
        let interval = Duration::from_millis(args.interval_ms);
        for i in 0..args.ticks {
            sim.tick();

            if (i + 1) % 100 == 0 {
                let stats = sim.population();
                info!(
                    tick = sim.tick_count(),
                    living = stats.living,
                    dead = stats.dead,
                    "population snapshot"
                );
            }
            std::thread::sleep(interval);
        }
    }

    let stats = sim.population();
    let summary = serde_json::json!({
        "ticks": sim.tick_count(),
        "living": stats.living,
        "dead": stats.dead,
        "tiles": stats.tiles,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
