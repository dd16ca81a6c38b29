//! Fixed-interval scheduling of per-entity processing.
//!
//! An [`IntervalScheduler`] is fed simulation time through
//! [`advance`](IntervalScheduler::advance). Once at least one interval has
//! accumulated it reports that a pass is due, and
//! [`run_pass`](IntervalScheduler::run_pass) then visits every entity that
//! matches the scheduler's [`Aspect`] at that moment.
//!
//! # Pass semantics
//!
//! - The set of candidates is taken once, at the start of the pass.
//! - Each candidate is re-checked immediately before it is processed. An
//!   entity despawned, or no longer matching because of something processed
//!   earlier in the same pass, is skipped rather than visited.
//! - No entity is visited twice in one pass; entities that start matching
//!   mid-pass wait for the next one.
//! - A failure processing one entity is logged and recorded in the
//!   [`PassReport`]; the remaining entities are still processed.

use meridian_ecs::aspect::Aspect;
use meridian_ecs::entity::EntityId;
use tracing::{trace, warn};

use crate::config::{validate_interval, ConfigError};
use crate::context::ServerContext;
use crate::SystemError;

// ---------------------------------------------------------------------------
// PassReport
// ---------------------------------------------------------------------------

/// What happened during one pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Entities whose processing returned `Ok`.
    pub processed: usize,
    /// Candidates that no longer matched when their turn came.
    pub skipped: usize,
    /// Entities whose processing failed, with the rendered error.
    pub failures: Vec<(EntityId, String)>,
}

impl PassReport {
    /// Entities the processing callback was invoked for.
    pub fn visited(&self) -> usize {
        self.processed + self.failures.len()
    }
}

// ---------------------------------------------------------------------------
// IntervalScheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    name: String,
    aspect: Aspect,
    interval: f64,
    accumulated: f64,
    passes: u64,
}

impl IntervalScheduler {
    /// Create a scheduler firing every `interval_secs` seconds.
    ///
    /// Fails with [`ConfigError::InvalidConfiguration`] unless the interval
    /// is positive and finite.
    pub fn new(name: &str, aspect: Aspect, interval_secs: f64) -> Result<Self, ConfigError> {
        validate_interval(interval_secs)?;
        Ok(Self {
            name: name.to_owned(),
            aspect,
            interval: interval_secs,
            accumulated: 0.0,
            passes: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aspect(&self) -> &Aspect {
        &self.aspect
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Time accumulated towards the next pass.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Number of passes this scheduler has reported due.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Add `dt` seconds. Returns `true` if a pass is now due.
    ///
    /// At most one pass is reported per call. One interval is subtracted when
    /// it fires and the remainder carries over, so the long-run rate matches
    /// the interval whatever the tick length. Negative or non-finite `dt` is
    /// ignored.
    pub fn advance(&mut self, dt: f64) -> bool {
        if !(dt >= 0.0 && dt.is_finite()) {
            return false;
        }
        self.accumulated += dt;
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated -= self.interval;
        if self.accumulated >= self.interval {
            // A step longer than two intervals still yields a single pass.
            self.accumulated %= self.interval;
        }
        self.passes += 1;
        true
    }

    /// Run `process` once for every entity currently matching the aspect.
    pub fn run_pass<F>(&self, ctx: &mut ServerContext, mut process: F) -> PassReport
    where
        F: FnMut(EntityId, &mut ServerContext) -> Result<(), SystemError>,
    {
        let candidates = ctx.world.entities_matching(&self.aspect);
        trace!(system = %self.name, candidates = candidates.len(), "interval pass start");

        let mut report = PassReport::default();
        for entity in candidates {
            if !ctx.world.matches(entity, &self.aspect) {
                report.skipped += 1;
                continue;
            }
            match process(entity, ctx) {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(
                        system = %self.name,
                        entity = ?entity,
                        error = %e,
                        "entity processing failed, continuing pass"
                    );
                    report.failures.push((entity, e.to_string()));
                }
            }
        }

        trace!(
            system = %self.name,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failures.len(),
            "interval pass end"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
