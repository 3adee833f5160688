use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use traffic_manager::simulation::{policy_from_name, RoadId, SimConfig, SimEvent, SimWorld};

/// Simulated seconds between two scripted waves
const WAVE_INTERVAL_SECS: f64 = 3600.0;

#[derive(Parser)]
#[command(name = "traffic_manager")]
#[command(about = "Headless multi-lane road traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "2000")]
    ticks: u64,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Ticks per frame (1, 2 or 30 in the game)
    #[arg(long, default_value = "1")]
    speed: u32,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Organic traffic: `scheduled` commuters or the `demand` curve
    #[arg(long, default_value = "scheduled")]
    policy: String,

    /// Keep a money ledger and put a speed camera on the busiest road
    #[arg(long)]
    economy: bool,

    /// Send the level's scripted waves
    #[arg(long)]
    waves: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,traffic_manager=info"),
    )
    .init();

    let cli = Cli::parse();
    run_headless(&cli)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    if cli.speed == 0 {
        bail!("A paused simulation never finishes; use --speed 1 or more");
    }
    if cli.delta <= 0.0 {
        bail!("--delta must be positive");
    }

    let config = SimConfig {
        seed: cli.seed,
        ..SimConfig::default()
    };
    let mut world = SimWorld::create_demo_world(config).context("Failed to build demo level")?;

    let policy = policy_from_name(&cli.policy)
        .with_context(|| format!("Unknown dispatch policy {:?}", cli.policy))?;
    world.set_policy(policy);
    if world.policy_name() == "scheduled" {
        world.populate_commuters();
    }

    if cli.economy {
        world.enable_economy();
        world.add_speed_camera(RoadId(0))?;
    }

    let mut last_wave_secs = 0.0;
    if cli.waves {
        world.next_wave()?;
    }

    info!(
        "Running {} ticks of {}s at speed {} from {}",
        cli.ticks,
        cli.delta,
        cli.speed,
        world.clock.display()
    );
    world.set_speed(cli.speed);

    let mut last_hour = 0;
    while world.stats.ticks < cli.ticks {
        for event in world.frame(cli.delta) {
            if let SimEvent::Crashed { a, b, .. } = event {
                warn!("Crash between {} and {} at {}", a, b, world.clock.display());
            }
        }

        let elapsed = world.clock.elapsed_secs();
        let hour = (elapsed / 3600.0) as u64;
        if hour > last_hour {
            last_hour = hour;
            info!(
                "{} - in transit: {}, arrived: {}, crashed: {}",
                world.clock.display(),
                world.in_transit(),
                world.stats.arrived,
                world.stats.crashed
            );
        }

        if cli.waves
            && world.queued_vehicles() == 0
            && elapsed - last_wave_secs >= WAVE_INTERVAL_SECS
            && world.next_wave()?
        {
            last_wave_secs = elapsed;
        }
    }

    world.log_summary();
    world
        .check_invariants()
        .context("Simulation ended in an inconsistent state")?;
    Ok(())
}
