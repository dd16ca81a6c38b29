//! Meridian Net -- differential entity updates and console notifications.
//!
//! This crate sits between the simulation and the network transport. Systems
//! describe what changed on an entity with an
//! [`EntityUpdateBuilder`](update::EntityUpdateBuilder), hand the finished
//! [`EntityUpdate`](update::EntityUpdate) to the
//! [`UpdateDispatcher`](dispatch::UpdateDispatcher) together with an
//! [`UpdateScope`](dispatch::UpdateScope), and queue human-readable messages
//! on the [`MessageQueue`](notification::MessageQueue). Nothing here touches
//! a socket: both queues are flushed into sinks owned by the transport,
//! typically the sending half of a `crossbeam-channel`.
//!
//! # Example
//!
//! ```
//! use meridian_ecs::prelude::*;
//! use meridian_net::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Mana { min: i32, max: i32 }
//!
//! let mut world = World::new();
//! world.register_component::<Mana>("mana");
//! let entity = world.spawn_with(Mana { min: 60, max: 100 });
//!
//! let mut update = EntityUpdateBuilder::of(entity);
//! update.upsert(world.registry(), &Mana { min: 60, max: 100 }).unwrap();
//!
//! let mut dispatcher = UpdateDispatcher::new();
//! dispatcher.add(update.build(), UpdateScope::Entity);
//! assert_eq!(dispatcher.len(), 1);
//! ```

#![deny(unsafe_code)]

pub mod dispatch;
pub mod notification;
pub mod update;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when handing queued data to the transport.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The transport's receiving side is gone. Undelivered items stay queued.
    #[error("transport closed with {pending} item(s) still queued")]
    TransportClosed { pending: usize },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::dispatch::{DispatchStats, ScopedUpdate, UpdateDispatcher, UpdateScope, UpdateSink};
    pub use crate::notification::{
        ConsoleMessage, MessageKind, MessageQueue, Notification, NotificationSink,
    };
    pub use crate::update::{ComponentSnapshot, EntityUpdate, EntityUpdateBuilder};
    pub use crate::NetError;
}
