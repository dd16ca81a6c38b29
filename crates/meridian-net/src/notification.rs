//! Console notifications queued per entity.
//!
//! A [`ConsoleMessage`] is a catalog key plus positional arguments; turning it
//! into localized text is the client's business. Messages are queued per
//! entity and drained by the transport as [`Notification`] payloads,
//! independently of the update diff stream.

use std::collections::{HashMap, VecDeque};

use meridian_ecs::entity::EntityId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::NetError;

// ---------------------------------------------------------------------------
// ConsoleMessage
// ---------------------------------------------------------------------------

/// Severity of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
    Combat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub kind: MessageKind,
    /// Message catalog key, e.g. `"MEDITATE_START"`.
    pub key: String,
    pub args: Vec<String>,
}

impl ConsoleMessage {
    pub fn new(kind: MessageKind, key: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind,
            key: key.into(),
            args,
        }
    }

    pub fn info(key: impl Into<String>) -> Self {
        Self::new(MessageKind::Info, key, Vec::new())
    }

    pub fn warning(key: impl Into<String>) -> Self {
        Self::new(MessageKind::Warning, key, Vec::new())
    }

    pub fn error(key: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, key, Vec::new())
    }

    pub fn combat(key: impl Into<String>) -> Self {
        Self::new(MessageKind::Combat, key, Vec::new())
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Wire payload handed to the console/message collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// [`EntityId::to_raw`] of the recipient.
    pub entity_id: u64,
    pub severity: MessageKind,
    pub message_key: String,
    pub args: Vec<String>,
}

impl Notification {
    pub fn new(entity: EntityId, message: ConsoleMessage) -> Self {
        Self {
            entity_id: entity.to_raw(),
            severity: message.kind,
            message_key: message.key,
            args: message.args,
        }
    }
}

/// Receiving end of the message queue, implemented by the transport.
pub trait NotificationSink {
    /// Accept one notification. On error the notification is handed back.
    fn send(&self, notification: Notification) -> Result<(), Notification>;
}

impl NotificationSink for crossbeam_channel::Sender<Notification> {
    fn send(&self, notification: Notification) -> Result<(), Notification> {
        crossbeam_channel::Sender::send(self, notification).map_err(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// MessageQueue
// ---------------------------------------------------------------------------

/// Per-entity FIFO queues of console messages.
///
/// [`drain`](Self::drain) visits entities in the order their first pending
/// message arrived, and each entity's messages in arrival order.
#[derive(Debug, Default)]
pub struct MessageQueue {
    queues: HashMap<EntityId, VecDeque<ConsoleMessage>>,
    /// Entities with pending messages, by first arrival.
    order: VecDeque<EntityId>,
    len: usize,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: EntityId, message: ConsoleMessage) {
        let queue = self.queues.entry(entity).or_default();
        if queue.is_empty() {
            self.order.push_back(entity);
        }
        queue.push_back(message);
        self.len += 1;
    }

    /// Pending messages for `entity`, oldest first.
    pub fn pending_for(&self, entity: EntityId) -> impl Iterator<Item = &ConsoleMessage> {
        self.queues.get(&entity).into_iter().flatten()
    }

    /// Take every pending message for `entity`.
    pub fn drain_entity(&mut self, entity: EntityId) -> Vec<ConsoleMessage> {
        let Some(queue) = self.queues.remove(&entity) else {
            return Vec::new();
        };
        self.order.retain(|e| *e != entity);
        self.len -= queue.len();
        queue.into()
    }

    /// Take every pending message as wire payloads.
    pub fn drain(&mut self) -> Vec<Notification> {
        let mut out = Vec::with_capacity(self.len);
        while let Some(entity) = self.order.pop_front() {
            if let Some(queue) = self.queues.remove(&entity) {
                out.extend(queue.into_iter().map(|m| Notification::new(entity, m)));
            }
        }
        self.len = 0;
        out
    }

    /// Deliver every pending message to `sink`, in [`drain`](Self::drain)
    /// order. If the sink rejects a message, it and all later ones are
    /// requeued.
    pub fn flush(&mut self, sink: &dyn NotificationSink) -> Result<usize, NetError> {
        let mut pending = self.drain().into_iter();
        let mut delivered = 0;
        while let Some(notification) = pending.next() {
            if let Err(rejected) = sink.send(notification) {
                let remaining: Vec<Notification> =
                    std::iter::once(rejected).chain(pending).collect();
                let count = remaining.len();
                for n in remaining {
                    self.requeue(n);
                }
                warn!(delivered, pending = count, "notification transport rejected delivery");
                return Err(NetError::TransportClosed { pending: count });
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn requeue(&mut self, n: Notification) {
        let message = ConsoleMessage::new(n.severity, n.message_key, n.args);
        self.add(EntityId::from_raw(n.entity_id), message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_kind_and_args() {
        let msg = ConsoleMessage::info("MANA_RECOVERED").with_arg(10);
        assert_eq!(msg.kind, MessageKind::Info);
        assert_eq!(msg.key, "MANA_RECOVERED");
        assert_eq!(msg.args, vec!["10".to_owned()]);
        assert_eq!(ConsoleMessage::combat("HIT").kind, MessageKind::Combat);
    }

    #[test]
    fn per_entity_order_is_preserved() {
        let a = EntityId::new(0, 0);
        let b = EntityId::new(1, 0);
        let mut q = MessageQueue::new();
        q.add(a, ConsoleMessage::info("MEDITATE_START"));
        q.add(b, ConsoleMessage::info("MANA_FULL"));
        q.add(a, ConsoleMessage::info("MEDITATE_STOP"));
        assert_eq!(q.len(), 3);

        let keys: Vec<_> = q.pending_for(a).map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["MEDITATE_START", "MEDITATE_STOP"]);

        let drained = q.drain();
        let order: Vec<_> = drained
            .iter()
            .map(|n| (n.entity_id, n.message_key.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (a.to_raw(), "MEDITATE_START"),
                (a.to_raw(), "MEDITATE_STOP"),
                (b.to_raw(), "MANA_FULL"),
            ]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn drain_entity_leaves_others() {
        let a = EntityId::new(0, 0);
        let b = EntityId::new(1, 0);
        let mut q = MessageQueue::new();
        q.add(a, ConsoleMessage::info("X"));
        q.add(b, ConsoleMessage::info("Y"));

        assert_eq!(q.drain_entity(a).len(), 1);
        assert!(q.drain_entity(a).is_empty());
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain()[0].entity_id, b.to_raw());
    }

    #[test]
    fn flush_to_closed_channel_requeues() {
        let a = EntityId::new(0, 0);
        let (tx, rx) = crossbeam_channel::unbounded::<Notification>();
        drop(rx);
        let mut q = MessageQueue::new();
        q.add(a, ConsoleMessage::info("ONE"));
        q.add(a, ConsoleMessage::info("TWO"));

        assert!(matches!(
            q.flush(&tx),
            Err(NetError::TransportClosed { pending: 2 })
        ));
        let keys: Vec<_> = q.pending_for(a).map(|m| m.key.clone()).collect();
        assert_eq!(keys, vec!["ONE", "TWO"]);
    }

    #[test]
    fn flush_delivers_in_order() {
        let a = EntityId::new(0, 0);
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut q = MessageQueue::new();
        q.add(a, ConsoleMessage::info("ONE").with_arg("x"));
        assert_eq!(q.flush(&tx).unwrap(), 1);
        let n = rx.try_recv().unwrap();
        assert_eq!(n.message_key, "ONE");
        assert_eq!(n.args, vec!["x"]);
        assert_eq!(n.severity, MessageKind::Info);
    }
}
