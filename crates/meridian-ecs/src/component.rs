//! Component registration and sparse per-type storage.
//!
//! Every component type is registered at runtime in a [`ComponentRegistry`],
//! which assigns it a [`ComponentTypeId`] and a unique string name. The name
//! is what travels in update payloads; the id indexes masks and stores.
//!
//! Values live in a [`ComponentStore`], one per registered type: a sparse map
//! from [`EntityId`] to `T`. The world keeps the stores type-erased behind
//! [`ErasedStore`] so it can drop or serialize an entity's components without
//! knowing their concrete types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Bound satisfied by every storable component type.
///
/// Components must be serializable because their snapshots are what update
/// diffs carry to clients.
pub trait Component:
    Clone + Send + Sync + 'static + Serialize + for<'de> Deserialize<'de>
{
}

impl<T> Component for T where
    T: Clone + Send + Sync + 'static + Serialize + for<'de> Deserialize<'de>
{
}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque identifier for a registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    /// Dense index, assigned in registration order.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata recorded for each registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentTypeId,
    /// Name used in wire payloads and logs.
    pub name: String,
    pub type_id: TypeId,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Maps Rust types to [`ComponentTypeId`]s and names.
///
/// Registering the same Rust type twice returns the original id. Reusing a
/// name for a different type is a programming error and panics.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`. Idempotent per Rust type.
    pub fn register<T: Component>(&mut self, name: &str) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        if self.by_name.contains_key(name) {
            panic!("component name '{name}' is already registered for a different type");
        }

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: name.to_owned(),
            type_id: rust_type_id,
        });
        self.by_type.insert(rust_type_id, id);
        self.by_name.insert(name.to_owned(), id);
        id
    }

    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.lookup_type_id(TypeId::of::<T>())
    }

    /// Look up by Rust [`TypeId`]; used to resolve aspects.
    pub fn lookup_type_id(&self, type_id: TypeId) -> Option<ComponentTypeId> {
        self.by_type.get(&type_id).copied()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Registered name of `id`, or `"<unregistered>"`.
    pub fn name_of(&self, id: ComponentTypeId) -> &str {
        self.get_info(id)
            .map(|info| info.name.as_str())
            .unwrap_or("<unregistered>")
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered component types, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// ComponentStore
// ---------------------------------------------------------------------------

/// Sparse storage for one component type.
#[derive(Debug)]
pub struct ComponentStore<T> {
    values: HashMap<EntityId, T>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<T: Component> ComponentStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` for `entity`, returning whatever was there before.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.values.insert(entity, value)
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.values.get(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.values.get_mut(&entity)
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        self.values.remove(&entity)
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.values.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(entity, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.values.iter().map(|(e, v)| (*e, v))
    }
}

// ---------------------------------------------------------------------------
// ErasedStore
// ---------------------------------------------------------------------------

/// Object-safe view of a [`ComponentStore`] used by the world.
pub(crate) trait ErasedStore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Drop the entity's value, if any. Returns whether one was present.
    fn erase(&mut self, entity: EntityId) -> bool;
    /// Serialize the entity's value, if any.
    fn snapshot(&self, entity: EntityId) -> Option<Result<serde_json::Value, serde_json::Error>>;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn erase(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn snapshot(&self, entity: EntityId) -> Option<Result<serde_json::Value, serde_json::Error>> {
        self.get(entity).map(serde_json::to_value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Mana {
        min: i32,
        max: i32,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Meditating;

    #[test]
    fn same_type_registers_once() {
        let mut reg = ComponentRegistry::new();
        let a = reg.register::<Mana>("mana");
        let b = reg.register::<Mana>("mana_again");
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.name_of(a), "mana");
    }

    #[test]
    fn lookups_agree() {
        let mut reg = ComponentRegistry::new();
        let mana = reg.register::<Mana>("mana");
        let med = reg.register::<Meditating>("meditating");
        assert_ne!(mana, med);
        assert_eq!(reg.lookup::<Meditating>(), Some(med));
        assert_eq!(reg.lookup_by_name("mana"), Some(mana));
        assert_eq!(reg.registered_names(), vec!["mana", "meditating"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn name_collision_panics() {
        let mut reg = ComponentRegistry::new();
        reg.register::<Mana>("x");
        reg.register::<Meditating>("x");
    }

    #[test]
    fn store_insert_returns_previous() {
        let mut store = ComponentStore::new();
        let e = EntityId::new(3, 0);
        assert_eq!(store.insert(e, Mana { min: 1, max: 2 }), None);
        assert_eq!(
            store.insert(e, Mana { min: 2, max: 2 }),
            Some(Mana { min: 1, max: 2 })
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(e), Some(Mana { min: 2, max: 2 }));
        assert!(store.is_empty());
    }

    #[test]
    fn erased_snapshot_serializes_value() {
        let mut store = ComponentStore::new();
        let e = EntityId::new(0, 0);
        store.insert(e, Mana { min: 5, max: 9 });
        let erased: &dyn ErasedStore = &store;
        let json = erased.snapshot(e).unwrap().unwrap();
        assert_eq!(json, serde_json::json!({"min": 5, "max": 9}));
        assert!(erased.snapshot(EntityId::new(1, 0)).is_none());
    }
}
