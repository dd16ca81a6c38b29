//! Aspects: predicates over the set of component types an entity has.
//!
//! An [`Aspect`] is written against Rust types and resolved against a
//! [`ComponentRegistry`] into a [`ResolvedAspect`], a pair of
//! [`ComponentMask`]s. Matching an entity is then a superset test against its
//! required mask and a disjointness test against its excluded mask.
//!
//! Nothing here is cached per entity. The world evaluates the aspect against
//! the entity's current mask every time it is asked, so a component added or
//! removed a moment ago is always reflected.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::component::{ComponentRegistry, ComponentTypeId};

// ---------------------------------------------------------------------------
// ComponentMask
// ---------------------------------------------------------------------------

/// Growable bitset of [`ComponentTypeId`]s.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ComponentMask {
    words: Vec<u64>,
}

impl ComponentMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ComponentTypeId) {
        let (word, bit) = Self::slot(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    pub fn remove(&mut self, id: ComponentTypeId) {
        let (word, bit) = Self::slot(id);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !bit;
        }
    }

    pub fn contains(&self, id: ComponentTypeId) -> bool {
        let (word, bit) = Self::slot(id);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// `true` if every bit set in `other` is also set in `self`.
    pub fn is_superset(&self, other: &ComponentMask) -> bool {
        other.words.iter().enumerate().all(|(i, &theirs)| {
            let ours = self.words.get(i).copied().unwrap_or(0);
            ours & theirs == theirs
        })
    }

    /// `true` if no bit is set in both masks.
    pub fn is_disjoint(&self, other: &ComponentMask) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Number of component types present.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    fn slot(id: ComponentTypeId) -> (usize, u64) {
        let idx = id.index();
        (idx / 64, 1u64 << (idx % 64))
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = self.words.iter().enumerate().flat_map(|(w, bits)| {
            (0..64).filter(move |b| bits & (1u64 << b) != 0).map(move |b| w * 64 + b)
        });
        f.debug_set().entries(ids).finish()
    }
}

// ---------------------------------------------------------------------------
// Aspect
// ---------------------------------------------------------------------------

/// A component type referenced by an [`Aspect`].
#[derive(Clone, Copy, PartialEq, Eq)]
struct TypeRef {
    id: TypeId,
    name: &'static str,
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Required and excluded component types, by Rust type.
///
/// Built with chained calls and immutable afterwards:
///
/// ```
/// # use meridian_ecs::aspect::Aspect;
/// # #[derive(Clone)] struct Mana; #[derive(Clone)] struct Meditating; #[derive(Clone)] struct Dead;
/// let aspect = Aspect::new().all::<Meditating>().all::<Mana>().exclude::<Dead>();
/// assert_eq!(aspect.required_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aspect {
    all: Vec<TypeRef>,
    exclude: Vec<TypeRef>,
}

impl Aspect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `T` to be present.
    pub fn all<T: 'static>(mut self) -> Self {
        push_unique(&mut self.all, type_ref::<T>());
        self
    }

    /// Require `T` to be absent.
    pub fn exclude<T: 'static>(mut self) -> Self {
        push_unique(&mut self.exclude, type_ref::<T>());
        self
    }

    pub fn required_count(&self) -> usize {
        self.all.len()
    }

    pub fn excluded_count(&self) -> usize {
        self.exclude.len()
    }

    /// Resolve against `registry`.
    ///
    /// Returns `None` when a required type was never registered: no entity
    /// can carry it, so the aspect matches nothing. Unregistered excluded
    /// types are vacuously absent and simply dropped.
    pub fn resolve(&self, registry: &ComponentRegistry) -> Option<ResolvedAspect> {
        let mut required = ComponentMask::new();
        for t in &self.all {
            required.insert(registry.lookup_type_id(t.id)?);
        }
        let mut excluded = ComponentMask::new();
        for id in self.exclude.iter().filter_map(|t| registry.lookup_type_id(t.id)) {
            excluded.insert(id);
        }
        Some(ResolvedAspect { required, excluded })
    }
}

fn type_ref<T: 'static>() -> TypeRef {
    TypeRef {
        id: TypeId::of::<T>(),
        name: type_name::<T>(),
    }
}

fn push_unique(list: &mut Vec<TypeRef>, t: TypeRef) {
    if !list.contains(&t) {
        list.push(t);
    }
}

// ---------------------------------------------------------------------------
// ResolvedAspect
// ---------------------------------------------------------------------------

/// An [`Aspect`] expressed as masks over registered component ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAspect {
    required: ComponentMask,
    excluded: ComponentMask,
}

impl ResolvedAspect {
    pub fn matches(&self, mask: &ComponentMask) -> bool {
        mask.is_superset(&self.required) && mask.is_disjoint(&self.excluded)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct A;
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct B;
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct C;

    fn registry() -> (ComponentRegistry, [ComponentTypeId; 3]) {
        let mut reg = ComponentRegistry::new();
        let a = reg.register::<A>("a");
        let b = reg.register::<B>("b");
        let c = reg.register::<C>("c");
        (reg, [a, b, c])
    }

    #[test]
    fn mask_tracks_membership() {
        let (_, [a, b, c]) = registry();
        let mut mask = ComponentMask::new();
        mask.insert(a);
        mask.insert(c);
        assert!(mask.contains(a) && !mask.contains(b) && mask.contains(c));
        assert_eq!(mask.len(), 2);
        mask.remove(a);
        mask.remove(a);
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn mask_spans_multiple_words() {
        let far = ComponentTypeId(130);
        let mut mask = ComponentMask::new();
        mask.insert(far);
        assert!(mask.contains(far));
        assert!(!mask.contains(ComponentTypeId(2)));
        assert!(ComponentMask::new().is_disjoint(&mask));
        assert!(!ComponentMask::new().is_superset(&mask));
    }

    #[test]
    fn required_and_excluded() {
        let (reg, [a, b, c]) = registry();
        let resolved = Aspect::new()
            .all::<A>()
            .all::<B>()
            .exclude::<C>()
            .resolve(&reg)
            .unwrap();

        let mut mask = ComponentMask::new();
        mask.insert(a);
        assert!(!resolved.matches(&mask));
        mask.insert(b);
        assert!(resolved.matches(&mask));
        mask.insert(c);
        assert!(!resolved.matches(&mask));
    }

    #[test]
    fn unregistered_required_type_matches_nothing() {
        #[derive(Clone)]
        struct Unknown;
        let (reg, _) = registry();
        assert!(Aspect::new().all::<A>().all::<Unknown>().resolve(&reg).is_none());
    }

    #[test]
    fn unregistered_excluded_type_is_ignored() {
        #[derive(Clone)]
        struct Unknown;
        let (reg, [a, _, _]) = registry();
        let resolved = Aspect::new()
            .all::<A>()
            .exclude::<Unknown>()
            .resolve(&reg)
            .unwrap();
        let mut mask = ComponentMask::new();
        mask.insert(a);
        assert!(resolved.matches(&mask));
    }

    #[test]
    fn duplicate_requirements_collapse() {
        let aspect = Aspect::new().all::<A>().all::<A>();
        assert_eq!(aspect.required_count(), 1);
    }
}
