//! Scoped hand-off of entity updates to the transport.
//!
//! The [`UpdateDispatcher`] is a FIFO queue of [`ScopedUpdate`]s. Systems
//! [`add`](UpdateDispatcher::add) finished diffs during a tick; the server
//! [`flush`](UpdateDispatcher::flush)es the queue into an [`UpdateSink`]
//! owned by the transport, which decides which connections an
//! [`UpdateScope`] reaches.
//!
//! A single queue keeps submission order for every entity. Empty diffs are
//! dropped on the way in and never reach a sink.

use std::collections::{BTreeSet, VecDeque};

use meridian_ecs::component::ComponentTypeId;
use meridian_ecs::entity::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::update::{ComponentSnapshot, EntityUpdate};
use crate::NetError;

// ---------------------------------------------------------------------------
// UpdateScope
// ---------------------------------------------------------------------------

/// Who receives an update. Affects fan-out only, never diff content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateScope {
    /// Only the client controlling the entity.
    Entity,
    /// Every client currently observing the entity, the owner included.
    All,
}

// ---------------------------------------------------------------------------
// ScopedUpdate
// ---------------------------------------------------------------------------

/// Wire payload handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedUpdate {
    /// [`EntityId::to_raw`] of the updated entity.
    pub entity_id: u64,
    pub upserts: Vec<ComponentSnapshot>,
    pub removals: BTreeSet<ComponentTypeId>,
    pub scope: UpdateScope,
}

impl ScopedUpdate {
    pub fn new(update: EntityUpdate, scope: UpdateScope) -> Self {
        let (entity, upserts, removals) = update.into_parts();
        Self {
            entity_id: entity.to_raw(),
            upserts,
            removals,
            scope,
        }
    }

    pub fn entity(&self) -> EntityId {
        EntityId::from_raw(self.entity_id)
    }
}

// ---------------------------------------------------------------------------
// UpdateSink
// ---------------------------------------------------------------------------

/// Receiving end of the dispatcher, implemented by the transport.
pub trait UpdateSink {
    /// Accept one update. On error the update is handed back.
    fn send(&self, update: ScopedUpdate) -> Result<(), ScopedUpdate>;
}

impl UpdateSink for crossbeam_channel::Sender<ScopedUpdate> {
    fn send(&self, update: ScopedUpdate) -> Result<(), ScopedUpdate> {
        crossbeam_channel::Sender::send(self, update).map_err(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// DispatchStats
// ---------------------------------------------------------------------------

/// Running counters, useful for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Non-empty updates accepted by [`UpdateDispatcher::add`].
    pub queued: u64,
    /// Empty updates discarded by [`UpdateDispatcher::add`].
    pub dropped_empty: u64,
    /// Updates delivered to a sink.
    pub flushed: u64,
}

// ---------------------------------------------------------------------------
// UpdateDispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct UpdateDispatcher {
    queue: VecDeque<ScopedUpdate>,
    stats: DispatchStats,
}

impl UpdateDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `update` for delivery to `scope`. Empty updates are dropped.
    pub fn add(&mut self, update: EntityUpdate, scope: UpdateScope) {
        if update.is_empty() {
            debug!(entity = ?update.entity(), ?scope, "dropping empty entity update");
            self.stats.dropped_empty += 1;
            return;
        }
        self.stats.queued += 1;
        self.queue.push_back(ScopedUpdate::new(update, scope));
    }

    /// Queued updates, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &ScopedUpdate> {
        self.queue.iter()
    }

    /// Queued updates for one entity, in submission order.
    pub fn pending_for(&self, entity: EntityId) -> impl Iterator<Item = &ScopedUpdate> {
        let raw = entity.to_raw();
        self.queue.iter().filter(move |u| u.entity_id == raw)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Take every queued update without going through a sink.
    pub fn drain(&mut self) -> Vec<ScopedUpdate> {
        self.queue.drain(..).collect()
    }

    /// Deliver queued updates to `sink` in FIFO order.
    ///
    /// Stops at the first rejected update; it and everything after it stay
    /// queued for the next flush. Returns how many were delivered.
    pub fn flush(&mut self, sink: &dyn UpdateSink) -> Result<usize, NetError> {
        let mut delivered = 0;
        while let Some(update) = self.queue.pop_front() {
            if let Err(rejected) = sink.send(update) {
                self.queue.push_front(rejected);
                warn!(
                    delivered,
                    pending = self.queue.len(),
                    "update transport rejected delivery"
                );
                return Err(NetError::TransportClosed {
                    pending: self.queue.len(),
                });
            }
            delivered += 1;
            self.stats.flushed += 1;
        }
        Ok(delivered)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::EntityUpdateBuilder;
    use meridian_ecs::component::ComponentRegistry;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Mana {
        min: i32,
        max: i32,
    }

    fn registry() -> ComponentRegistry {
        let mut reg = ComponentRegistry::new();
        reg.register::<Mana>("mana");
        reg
    }

    fn mana_update(reg: &ComponentRegistry, entity: EntityId, min: i32) -> EntityUpdate {
        let mut b = EntityUpdateBuilder::of(entity);
        b.upsert(reg, &Mana { min, max: 100 }).unwrap();
        b.build()
    }

    #[test]
    fn empty_updates_are_dropped() {
        let mut dispatcher = UpdateDispatcher::new();
        dispatcher.add(EntityUpdateBuilder::of(EntityId::new(0, 0)).build(), UpdateScope::All);
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.stats().dropped_empty, 1);
        assert_eq!(dispatcher.stats().queued, 0);
    }

    #[test]
    fn same_entity_order_is_preserved() {
        let reg = registry();
        let a = EntityId::new(1, 0);
        let b = EntityId::new(2, 0);
        let mut dispatcher = UpdateDispatcher::new();
        dispatcher.add(mana_update(&reg, a, 10), UpdateScope::Entity);
        dispatcher.add(mana_update(&reg, b, 99), UpdateScope::All);
        dispatcher.add(mana_update(&reg, a, 20), UpdateScope::Entity);

        let mins: Vec<_> = dispatcher
            .pending_for(a)
            .map(|u| u.upserts[0].value["min"].clone())
            .collect();
        assert_eq!(mins, vec![serde_json::json!(10), serde_json::json!(20)]);
    }

    #[test]
    fn scope_is_carried_not_applied() {
        let reg = registry();
        let e = EntityId::new(4, 2);
        let mut dispatcher = UpdateDispatcher::new();
        dispatcher.add(mana_update(&reg, e, 1), UpdateScope::Entity);
        dispatcher.add(mana_update(&reg, e, 1), UpdateScope::All);

        let drained = dispatcher.drain();
        assert_eq!(drained[0].scope, UpdateScope::Entity);
        assert_eq!(drained[1].scope, UpdateScope::All);
        assert_eq!(drained[0].upserts, drained[1].upserts);
        assert_eq!(drained[0].entity(), e);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn flush_delivers_through_channel() {
        let reg = registry();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut dispatcher = UpdateDispatcher::new();
        dispatcher.add(mana_update(&reg, EntityId::new(0, 0), 5), UpdateScope::Entity);
        dispatcher.add(mana_update(&reg, EntityId::new(1, 0), 6), UpdateScope::All);

        assert_eq!(dispatcher.flush(&tx).unwrap(), 2);
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.stats().flushed, 2);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn flush_to_closed_transport_keeps_queue() {
        let reg = registry();
        let (tx, rx) = crossbeam_channel::unbounded::<ScopedUpdate>();
        drop(rx);
        let mut dispatcher = UpdateDispatcher::new();
        dispatcher.add(mana_update(&reg, EntityId::new(0, 0), 5), UpdateScope::Entity);

        assert!(matches!(
            dispatcher.flush(&tx),
            Err(NetError::TransportClosed { pending: 1 })
        ));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn payload_serializes_with_raw_entity_id() {
        let reg = registry();
        let e = EntityId::new(3, 1);
        let payload = ScopedUpdate::new(mana_update(&reg, e, 7), UpdateScope::All);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["entity_id"], serde_json::json!(e.to_raw()));
        assert_eq!(json["scope"], serde_json::json!("All"));
        assert_eq!(json["upserts"][0]["name"], serde_json::json!("mana"));
    }
}
