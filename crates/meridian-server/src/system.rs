//! The interface between gameplay systems and the scheduler.

use meridian_ecs::aspect::Aspect;
use meridian_ecs::entity::EntityId;

use crate::context::ServerContext;
use crate::SystemError;

/// A system that processes every entity matching its aspect once per
/// interval.
///
/// Systems hold configuration, not per-entity state. Per-entity state lives
/// in components so that the aspect can see it. `process` takes `&self` so
/// that the same system can also serve direct entry points (player actions)
/// between passes.
pub trait IntervalSystem: Send + Sync {
    /// Unique name, used for registration, diagnostics, and logs.
    fn name(&self) -> &str;

    /// Which entities the scheduler hands to [`process`](Self::process).
    fn aspect(&self) -> Aspect;

    /// Advance one entity by one interval.
    ///
    /// An error affects only this entity; the pass continues with the next.
    fn process(&self, entity: EntityId, ctx: &mut ServerContext) -> Result<(), SystemError>;
}
