//! Meridian Server -- interval-driven gameplay systems on top of
//! [`meridian_ecs`] and [`meridian_net`].
//!
//! The [`TickLoop`](tick::TickLoop) advances simulation time in fixed steps.
//! Each registered [`IntervalSystem`](system::IntervalSystem) owns an
//! [`IntervalScheduler`](interval::IntervalScheduler) that decides when the
//! system's interval has elapsed and then runs one pass over every entity
//! matching the system's aspect. Systems mutate the world directly and report
//! what changed through the update dispatcher and the message queue held in
//! the [`ServerContext`](context::ServerContext).
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use meridian_server::prelude::*;
//!
//! let mut world = World::new();
//! register_components(&mut world);
//! let player = world.spawn_with(Mana::new(50, 100));
//!
//! let meditate = Arc::new(MeditateSystem::new(MeditationConfig::default()).unwrap());
//! let ctx = ServerContext::new(world).with_rng(Box::new(SeededRandom::new(7)));
//! let mut tick_loop = TickLoop::new(ctx, TickConfig::default());
//! tick_loop
//!     .add_system(meditate.clone(), meditate.interval_secs())
//!     .unwrap();
//!
//! let outcome = meditate.toggle(player, tick_loop.context_mut()).unwrap();
//! assert_eq!(outcome, ToggleOutcome::Started);
//!
//! tick_loop.run_ticks(600);
//! let mana = tick_loop.context().world.get_component::<Mana>(player).unwrap();
//! assert!(mana.min <= mana.max);
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod config;
pub mod context;
pub mod interval;
pub mod meditate;
pub mod presentation;
pub mod rng;
pub mod system;
pub mod tick;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors a system can raise while processing one entity.
///
/// The scheduler isolates these per entity: they are logged and reported,
/// and the rest of the pass carries on.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Ecs(#[from] meridian_ecs::EcsError),

    /// A system-specific fault.
    #[error("{0}")]
    Fault(String),
}

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use meridian_ecs;
pub use meridian_net;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common server usage.
pub mod prelude {
    pub use meridian_ecs::prelude::*;
    pub use meridian_net::prelude::*;

    pub use crate::components::{register_components, CombatKind, CombatMessage, Mana, Meditating};
    pub use crate::config::{ConfigError, MeditationConfig, ServerConfig};
    pub use crate::context::ServerContext;
    pub use crate::interval::{IntervalScheduler, PassReport};
    pub use crate::meditate::{apply_recovery, MeditateSystem, ToggleOutcome, MEDITATE_SYSTEM_NAME};
    pub use crate::presentation::{
        ChannelPresentation, EffectId, EffectSink, NullPresentation, Playback, PresentationEvent,
        SoundId, SoundSink,
    };
    pub use crate::rng::{LocalRandom, RandomSource, SeededRandom, SequenceRandom};
    pub use crate::system::IntervalSystem;
    pub use crate::tick::{TickConfig, TickDiagnostics, TickLoop};
    pub use crate::SystemError;
}
