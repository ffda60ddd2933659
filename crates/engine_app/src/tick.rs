//! Fixed-timestep tick loop.
//!
//! Each tick is one [`World::update`]: pending entity and system changes are
//! flushed, then every active system runs in order.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use engine_ecs::World;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Number of bodies spawned into the demo world.
    pub bodies: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 600,
            bodies: 64,
        }
    }
}

impl TickConfig {
    /// Override the tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Override the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Override the number of demo bodies.
    #[must_use]
    pub fn with_bodies(mut self, bodies: usize) -> Self {
        self.bodies = bodies;
        self
    }

    /// Check that the configuration can drive a tick loop.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.tick_rate.is_finite() && self.tick_rate > 0.0,
            "tick_rate must be a positive finite number, got {}",
            self.tick_rate
        );
        Ok(())
    }
}

/// The tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    config: TickConfig,
    world: World,
}

impl TickLoop {
    /// Create a tick loop driving `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns a mutable reference to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Run one tick of the simulation.
    pub fn tick(&mut self, dt: f64) {
        self.tick_id += 1;
        self.world.update(dt);

        debug!(
            tick_id = self.tick_id,
            dt,
            entities = self.world.entity_count(),
            systems = self.world.system_count(),
            "tick complete"
        );
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    ///
    /// # Errors
    ///
    /// Fails without ticking if the configuration does not pass
    /// [`TickConfig::validate`].
    pub fn run(&mut self) -> Result<()> {
        self.config.validate()?;
        let tick_duration = Duration::try_from_secs_f64(1.0 / self.config.tick_rate)
            .with_context(|| format!("tick_rate {} is out of range", self.config.tick_rate))?;
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            let dt = tick_duration.as_secs_f64();
            self.tick(dt);

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
