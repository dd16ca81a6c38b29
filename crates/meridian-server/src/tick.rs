//! Fixed-timestep tick loop driving interval systems.
//!
//! Each call to [`TickLoop::tick`]:
//!
//! 1. Advances every registered system's [`IntervalScheduler`] by `fixed_dt`,
//!    in registration order.
//! 2. For each scheduler that reports a pass due, runs one pass of its system
//!    over the entities matching the system's aspect.
//! 3. Advances the tick counter.
//!
//! Systems mutate the [`ServerContext`] directly. Outgoing diffs and messages
//! accumulate in the context's dispatcher and message queue until the owner
//! of the loop flushes them.
//!
//! # Example
//!
//! ```
//! use meridian_server::prelude::*;
//! use meridian_server::tick::{TickConfig, TickLoop};
//!
//! let ctx = ServerContext::new(World::new());
//! let mut tick_loop = TickLoop::new(ctx, TickConfig::from_rate(20));
//!
//! tick_loop.run_ticks(20);
//! assert_eq!(tick_loop.tick_count(), 20);
//! assert!((tick_loop.sim_time() - 1.0).abs() < 1e-9);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ConfigError;
use crate::context::ServerContext;
use crate::interval::{IntervalScheduler, PassReport};
use crate::system::IntervalSystem;

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-timestep tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// Defaults to 60 Hz.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

impl TickConfig {
    /// A config ticking `hz` times per second. A rate of 0 is passed through
    /// as an infinite step and rejected by [`TickLoop::new`].
    pub fn from_rate(hz: u32) -> Self {
        Self {
            fixed_dt: 1.0 / f64::from(hz),
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// What the last tick did and how long it took.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system that ran a pass, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Pass reports of the systems that ran this tick.
    pub passes: Vec<(String, PassReport)>,
    /// Total time for the tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// RegisteredSystem
// ---------------------------------------------------------------------------

struct RegisteredSystem {
    system: Arc<dyn IntervalSystem>,
    scheduler: IntervalScheduler,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

/// The fixed-timestep loop.
///
/// Given the same initial context, the same systems in the same order, and a
/// seeded random source, the loop produces identical results across runs:
/// systems run in registration order, each pass visits entities in index
/// order, and simulation time is derived from the tick count rather than
/// accumulated.
pub struct TickLoop {
    ctx: ServerContext,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    fixed_dt: f64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// Create a loop around `ctx`.
    ///
    /// # Panics
    ///
    /// Panics unless `config.fixed_dt` is positive and finite.
    pub fn new(ctx: ServerContext, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            ctx,
            systems: Vec::new(),
            tick_counter: 0,
            fixed_dt: config.fixed_dt,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Register `system` to run every `interval_secs` seconds of simulation
    /// time. Systems run in registration order within a tick.
    ///
    /// Fails if the interval is not positive and finite.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(
        &mut self,
        system: Arc<dyn IntervalSystem>,
        interval_secs: f64,
    ) -> Result<(), ConfigError> {
        let name = system.name().to_owned();
        assert!(
            !self.systems.iter().any(|s| s.system.name() == name),
            "duplicate system name: {name:?}"
        );
        let scheduler = IntervalScheduler::new(&name, system.aspect(), interval_secs)?;
        debug!(system = %name, interval_secs, "system registered");
        self.systems.push(RegisteredSystem { system, scheduler });
        Ok(())
    }

    /// Execute one tick. Returns the number of entities processed.
    pub fn tick(&mut self) -> usize {
        let tick_start = Instant::now();
        let mut diagnostics = TickDiagnostics::default();
        let mut processed = 0;

        for registered in &mut self.systems {
            if !registered.scheduler.advance(self.fixed_dt) {
                continue;
            }
            let sys_start = Instant::now();
            let system = &registered.system;
            let report = registered
                .scheduler
                .run_pass(&mut self.ctx, |entity, ctx| system.process(entity, ctx));
            let name = system.name().to_owned();
            diagnostics.system_times.push((name.clone(), sys_start.elapsed()));
            processed += report.processed;
            diagnostics.passes.push((name, report));
        }

        self.tick_counter += 1;
        diagnostics.total_time = tick_start.elapsed();
        self.last_diagnostics = diagnostics;
        processed
    }

    /// Run `count` ticks. Returns the total number of entities processed.
    pub fn run_ticks(&mut self, count: u64) -> u64 {
        let mut total = 0u64;
        for _ in 0..count {
            total += self.tick() as u64;
        }
        total
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Current simulation time in seconds, computed as
    /// `tick_count * fixed_dt`.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Mutable access to the context, for setup, player actions, and
    /// flushing outgoing queues between ticks.
    pub fn context_mut(&mut self) -> &mut ServerContext {
        &mut self.ctx
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.system.name()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
