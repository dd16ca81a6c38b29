//! The [`World`] owns the entity allocator, the component registry, one sparse
//! store per registered component type, and a [`ComponentMask`] per alive
//! entity.
//!
//! Stores and masks are updated together on every insert, remove, and
//! despawn; the mask is the single source of truth for "does entity X have
//! component Y" when evaluating an [`Aspect`].

use std::collections::HashMap;

use tracing::debug;

use crate::aspect::{Aspect, ComponentMask};
use crate::component::{Component, ComponentRegistry, ComponentStore, ComponentTypeId, ErasedStore};
use crate::entity::{EntityAllocator, EntityId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The top-level entity/component container.
pub struct World {
    allocator: EntityAllocator,
    registry: ComponentRegistry,
    /// Indexed by `ComponentTypeId::index()`.
    stores: Vec<Box<dyn ErasedStore>>,
    masks: HashMap<EntityId, ComponentMask>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.masks.len())
            .field("component_types", &self.registry.len())
            .finish()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            stores: Vec::new(),
            masks: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Register a component type and create its store.
    pub fn register_component<T: Component>(&mut self, name: &str) -> ComponentTypeId {
        let id = self.registry.register::<T>(name);
        if id.index() == self.stores.len() {
            self.stores.push(Box::new(ComponentStore::<T>::new()));
        }
        id
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Spawn an entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        self.masks.insert(entity, ComponentMask::new());
        entity
    }

    /// Spawn an entity carrying a single component.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not registered; spawning unregistered data is a
    /// setup bug, not a runtime condition.
    pub fn spawn_with<T: Component>(&mut self, component: T) -> EntityId {
        let entity = self.spawn();
        if let Err(e) = self.insert_component(entity, component) {
            panic!("spawn_with: {e}");
        }
        entity
    }

    /// Despawn an entity, dropping all its components and recycling the id.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        let Some(mask) = self.masks.remove(&entity) else {
            debug!(entity = ?entity, "despawn of stale entity");
            return Err(EcsError::StaleEntity(entity));
        };
        for (idx, store) in self.stores.iter_mut().enumerate() {
            if mask.contains(ComponentTypeId(idx as u32)) {
                store.erase(entity);
            }
        }
        self.allocator.deallocate(entity);
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.masks.len()
    }

    // -- component access ---------------------------------------------------

    /// Insert or overwrite a component. Returns the previous value, if any.
    pub fn insert_component<T: Component>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> Result<Option<T>, EcsError> {
        let type_id = self.type_id_of::<T>()?;
        let mask = self.mask_mut(entity)?;
        mask.insert(type_id);
        Ok(store_mut::<T>(&mut self.stores, type_id).insert(entity, value))
    }

    /// Remove a component. Removing an absent component is a no-op that
    /// returns `Ok(None)`.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<T>, EcsError> {
        let type_id = self.type_id_of::<T>()?;
        let mask = self.mask_mut(entity)?;
        mask.remove(type_id);
        Ok(store_mut::<T>(&mut self.stores, type_id).remove(entity))
    }

    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let type_id = self.registry.lookup::<T>()?;
        self.stores[type_id.index()]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()?
            .get(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        let type_id = self.registry.lookup::<T>()?;
        self.stores[type_id.index()]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()?
            .get_mut(entity)
    }

    fn mask_mut(&mut self, entity: EntityId) -> Result<&mut ComponentMask, EcsError> {
        match self.masks.get_mut(&entity) {
            Some(mask) => Ok(mask),
            None => {
                debug!(entity = ?entity, "component write on stale entity");
                Err(EcsError::StaleEntity(entity))
            }
        }
    }

    /// Like [`get_component`](Self::get_component), but distinguishes a
    /// stale entity from a missing component.
    pub fn require_component<T: Component>(&self, entity: EntityId) -> Result<&T, EcsError> {
        if !self.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        self.get_component::<T>(entity)
            .ok_or_else(|| EcsError::MissingComponent {
                entity,
                component: self.component_name::<T>(),
            })
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        match (self.masks.get(&entity), self.registry.lookup::<T>()) {
            (Some(mask), Some(type_id)) => mask.contains(type_id),
            _ => false,
        }
    }

    /// Current component set of an alive entity.
    pub fn component_mask(&self, entity: EntityId) -> Option<&ComponentMask> {
        self.masks.get(&entity)
    }

    /// Serialize one component of an entity to its wire form.
    ///
    /// Returns `Ok(None)` if the entity lacks the component.
    pub fn snapshot_component(
        &self,
        entity: EntityId,
        type_id: ComponentTypeId,
    ) -> Result<Option<serde_json::Value>, EcsError> {
        let store = self.stores.get(type_id.index()).ok_or_else(|| {
            EcsError::UnknownComponent(format!("{type_id:?}"))
        })?;
        store.snapshot(entity).transpose().map_err(|e| EcsError::Serialization {
            component: self.registry.name_of(type_id).to_owned(),
            details: e.to_string(),
        })
    }

    // -- aspect evaluation --------------------------------------------------

    /// Evaluate `aspect` against the entity's current components.
    pub fn matches(&self, entity: EntityId, aspect: &Aspect) -> bool {
        let Some(mask) = self.masks.get(&entity) else {
            return false;
        };
        aspect
            .resolve(&self.registry)
            .is_some_and(|resolved| resolved.matches(mask))
    }

    /// Every alive entity matching `aspect`, each once, ordered by index.
    pub fn entities_matching(&self, aspect: &Aspect) -> Vec<EntityId> {
        let Some(resolved) = aspect.resolve(&self.registry) else {
            return Vec::new();
        };
        let mut matching: Vec<EntityId> = self
            .masks
            .iter()
            .filter(|(_, mask)| resolved.matches(mask))
            .map(|(entity, _)| *entity)
            .collect();
        matching.sort_unstable_by_key(|e| e.index());
        matching
    }

    // -- helpers ------------------------------------------------------------

    fn type_id_of<T: Component>(&self) -> Result<ComponentTypeId, EcsError> {
        self.registry
            .lookup::<T>()
            .ok_or_else(|| EcsError::UnknownComponent(std::any::type_name::<T>().to_owned()))
    }

    fn component_name<T: Component>(&self) -> String {
        match self.registry.lookup::<T>() {
            Some(id) => self.registry.name_of(id).to_owned(),
            None => std::any::type_name::<T>().to_owned(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed access to a store the registry says holds `T`.
fn store_mut<T: Component>(
    stores: &mut [Box<dyn ErasedStore>],
    type_id: ComponentTypeId,
) -> &mut ComponentStore<T> {
    match stores[type_id.index()]
        .as_any_mut()
        .downcast_mut::<ComponentStore<T>>()
    {
        Some(store) => store,
        None => unreachable!("store for {type_id:?} does not hold the registered type"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
