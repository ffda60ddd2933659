//! # engine_app
//!
//! A small simulation driven by the ECS world: bodies drift with constant
//! velocity, expire after their lifetime, and are walked front to back each
//! tick.
//!
//! ## Startup Sequence
//!
//! 1. Load [`TickConfig`] from the JSON file named by `ENGINE_APP_CONFIG`, or
//!    use the defaults.
//! 2. Spawn the configured number of bodies and admit the demo systems.
//! 3. Enter the fixed-timestep tick loop.

mod config;
mod demo;
mod tick;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tick::{TickConfig, TickLoop};

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let config: TickConfig = config::load()?;
    info!(
        tick_rate = config.tick_rate,
        max_ticks = config.max_ticks,
        bodies = config.bodies,
        "engine app starting"
    );

    let world = demo::build_world(config.bodies);
    info!(
        entities = world.entity_count(),
        systems = world.system_count(),
        "world ready"
    );

    let mut tick_loop = TickLoop::new(config, world);
    tick_loop.run()?;

    info!(
        ticks = tick_loop.tick_id(),
        remaining = tick_loop.world().entity_count(),
        "engine app shut down"
    );
    Ok(())
}
