//! Per-entity update diffs.
//!
//! An [`EntityUpdateBuilder`] accumulates, for one entity, the component
//! values to upsert on observers and the component types they should drop.
//! [`build`](EntityUpdateBuilder::build) freezes the accumulated operations
//! into an [`EntityUpdate`] and leaves the builder empty.
//!
//! # Staging rules
//!
//! - Upserting a type that is already staged replaces the staged value in
//!   place, keeping its original position in the upsert sequence.
//! - Removing a type drops any staged upsert of that type.
//! - Upserting a type that is staged for removal cancels the removal.
//!
//! Operation order decides: the last operation on a type wins, and a diff
//! never carries both an upsert and a removal for the same type.
//!
//! ```
//! use meridian_ecs::prelude::*;
//! use meridian_net::update::EntityUpdateBuilder;
//!
//! #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
//! struct Meditating;
//!
//! let mut world = World::new();
//! world.register_component::<Meditating>("meditating");
//! let e = world.spawn();
//!
//! let mut notify = EntityUpdateBuilder::of(e);
//! notify.upsert(world.registry(), &Meditating).unwrap();
//! notify.remove::<Meditating>(world.registry()).unwrap();
//!
//! let update = notify.build();
//! assert!(update.upserts().is_empty());
//! assert_eq!(update.removals().len(), 1);
//! assert!(notify.is_empty());
//! ```

use std::collections::BTreeSet;

use meridian_ecs::component::{Component, ComponentRegistry, ComponentTypeId};
use meridian_ecs::entity::EntityId;
use meridian_ecs::EcsError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ComponentSnapshot
// ---------------------------------------------------------------------------

/// A serialized component value as it travels to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    pub component: ComponentTypeId,
    /// Registered component name.
    pub name: String,
    pub value: serde_json::Value,
}

impl ComponentSnapshot {
    /// Serialize `value` using its registration in `registry`.
    pub fn of<T: Component>(registry: &ComponentRegistry, value: &T) -> Result<Self, EcsError> {
        let component = registered_id::<T>(registry)?;
        let name = registry.name_of(component).to_owned();
        let value = serde_json::to_value(value).map_err(|e| EcsError::Serialization {
            component: name.clone(),
            details: e.to_string(),
        })?;
        Ok(Self {
            component,
            name,
            value,
        })
    }
}

// ---------------------------------------------------------------------------
// EntityUpdate
// ---------------------------------------------------------------------------

/// An immutable diff for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    entity: EntityId,
    upserts: Vec<ComponentSnapshot>,
    removals: BTreeSet<ComponentTypeId>,
}

impl EntityUpdate {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Staged upserts, in first-staged order.
    pub fn upserts(&self) -> &[ComponentSnapshot] {
        &self.upserts
    }

    pub fn removals(&self) -> &BTreeSet<ComponentTypeId> {
        &self.removals
    }

    /// The upserted snapshot for `component`, if any.
    pub fn upsert_for(&self, component: ComponentTypeId) -> Option<&ComponentSnapshot> {
        self.upserts.iter().find(|s| s.component == component)
    }

    pub fn removes(&self, component: ComponentTypeId) -> bool {
        self.removals.contains(&component)
    }

    /// `true` when the diff carries nothing. Empty diffs are never sent.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    pub(crate) fn into_parts(self) -> (EntityId, Vec<ComponentSnapshot>, BTreeSet<ComponentTypeId>) {
        (self.entity, self.upserts, self.removals)
    }
}

// ---------------------------------------------------------------------------
// EntityUpdateBuilder
// ---------------------------------------------------------------------------

/// Accumulates one entity's diff during a unit of work.
///
/// A system may keep several builders for the same entity at once (for
/// example one for the owning client and one for every observer) and build
/// and dispatch each independently.
#[derive(Debug, Clone)]
pub struct EntityUpdateBuilder {
    entity: EntityId,
    upserts: Vec<ComponentSnapshot>,
    removals: BTreeSet<ComponentTypeId>,
}

impl EntityUpdateBuilder {
    /// Open an empty accumulator for `entity`.
    pub fn of(entity: EntityId) -> Self {
        Self {
            entity,
            upserts: Vec::new(),
            removals: BTreeSet::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Stage `value` as an upsert.
    pub fn upsert<T: Component>(
        &mut self,
        registry: &ComponentRegistry,
        value: &T,
    ) -> Result<&mut Self, EcsError> {
        let snapshot = ComponentSnapshot::of(registry, value)?;
        Ok(self.upsert_snapshot(snapshot))
    }

    /// Stage an already-serialized snapshot as an upsert.
    pub fn upsert_snapshot(&mut self, snapshot: ComponentSnapshot) -> &mut Self {
        self.removals.remove(&snapshot.component);
        match self
            .upserts
            .iter_mut()
            .find(|s| s.component == snapshot.component)
        {
            Some(staged) => *staged = snapshot,
            None => self.upserts.push(snapshot),
        }
        self
    }

    /// Stage removal of component type `T`.
    pub fn remove<T: Component>(
        &mut self,
        registry: &ComponentRegistry,
    ) -> Result<&mut Self, EcsError> {
        let component = registered_id::<T>(registry)?;
        Ok(self.remove_type(component))
    }

    /// Stage removal of `component`.
    pub fn remove_type(&mut self, component: ComponentTypeId) -> &mut Self {
        self.upserts.retain(|s| s.component != component);
        self.removals.insert(component);
        self
    }

    /// `true` if nothing has been staged since creation or the last build.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }

    /// Freeze the staged operations and reset the accumulator.
    pub fn build(&mut self) -> EntityUpdate {
        EntityUpdate {
            entity: self.entity,
            upserts: std::mem::take(&mut self.upserts),
            removals: std::mem::take(&mut self.removals),
        }
    }
}

fn registered_id<T: Component>(registry: &ComponentRegistry) -> Result<ComponentTypeId, EcsError> {
    registry
        .lookup::<T>()
        .ok_or_else(|| EcsError::UnknownComponent(std::any::type_name::<T>().to_owned()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
