//! Meridian ECS -- sparse component storage with aspect-based entity selection.
//!
//! This crate provides the entity/component layer that the Meridian server's
//! periodic systems are built on. Every component type gets its own sparse
//! store keyed by [`EntityId`](entity::EntityId), and every entity carries a
//! [`ComponentMask`](aspect::ComponentMask) so that an
//! [`Aspect`](aspect::Aspect) can be evaluated as a plain set test.
//!
//! # Quick Start
//!
//! ```
//! use meridian_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Mana { min: i32, max: i32 }
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Meditating;
//!
//! let mut world = World::new();
//! world.register_component::<Mana>("mana");
//! world.register_component::<Meditating>("meditating");
//!
//! let entity = world.spawn_with(Mana { min: 10, max: 100 });
//! let aspect = Aspect::new().all::<Mana>().all::<Meditating>();
//! assert!(!world.matches(entity, &aspect));
//!
//! world.insert_component(entity, Meditating).unwrap();
//! assert_eq!(world.entities_matching(&aspect), vec![entity]);
//! ```

#![deny(unsafe_code)]

pub mod aspect;
pub mod component;
pub mod entity;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {0:?} does not exist (stale or never allocated)")]
    StaleEntity(entity::EntityId),

    /// A component type was referenced that has not been registered.
    #[error("component type '{0}' not registered")]
    UnknownComponent(String),

    /// The entity is alive but lacks a component the caller required.
    #[error("entity {entity:?} has no '{component}' component")]
    MissingComponent {
        entity: entity::EntityId,
        component: String,
    },

    /// A component value could not be converted to its wire form.
    #[error("failed to serialize component '{component}': {details}")]
    Serialization { component: String, details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::aspect::{Aspect, ComponentMask, ResolvedAspect};
    pub use crate::component::{
        Component, ComponentInfo, ComponentRegistry, ComponentStore, ComponentTypeId,
    };
    pub use crate::entity::EntityId;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
