//! Visual-effect and sound collaborators.
//!
//! Effects and sounds are owned by other subsystems. Gameplay code only asks
//! for them to start or stop on an entity, identified by opaque ids. Calls are
//! fire-and-forget: a collaborator that cannot deliver simply drops the
//! request, and duplicate removals are harmless on the receiving side.

use crossbeam_channel::{Receiver, Sender};
use meridian_ecs::entity::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Opaque visual effect identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(pub u32);

/// Opaque sound identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(pub u32);

/// How many times an effect plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Playback {
    Once,
    Repeat(u32),
    /// Plays until explicitly removed.
    LoopForever,
}

pub trait EffectSink: Send {
    fn add_effect(&mut self, entity: EntityId, effect: EffectId, playback: Playback);
    fn remove_effect(&mut self, entity: EntityId, effect: EffectId);
}

pub trait SoundSink: Send {
    fn add(&mut self, entity: EntityId, sound: SoundId, looping: bool);
    fn remove(&mut self, entity: EntityId, sound: SoundId);
}

// ---------------------------------------------------------------------------
// PresentationEvent
// ---------------------------------------------------------------------------

/// One collaborator call, as forwarded by [`ChannelPresentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationEvent {
    EffectAdded {
        entity: EntityId,
        effect: EffectId,
        playback: Playback,
    },
    EffectRemoved {
        entity: EntityId,
        effect: EffectId,
    },
    SoundAdded {
        entity: EntityId,
        sound: SoundId,
        looping: bool,
    },
    SoundRemoved {
        entity: EntityId,
        sound: SoundId,
    },
}

// ---------------------------------------------------------------------------
// ChannelPresentation
// ---------------------------------------------------------------------------

/// Forwards every call over a channel to whichever thread owns the real
/// effect and sound subsystems.
#[derive(Debug, Clone)]
pub struct ChannelPresentation {
    tx: Sender<PresentationEvent>,
}

impl ChannelPresentation {
    /// Create a forwarder and the receiver its events arrive on.
    pub fn new() -> (Self, Receiver<PresentationEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    fn forward(&self, event: PresentationEvent) {
        if self.tx.send(event).is_err() {
            debug!(?event, "presentation receiver gone, dropping event");
        }
    }
}

impl EffectSink for ChannelPresentation {
    fn add_effect(&mut self, entity: EntityId, effect: EffectId, playback: Playback) {
        self.forward(PresentationEvent::EffectAdded {
            entity,
            effect,
            playback,
        });
    }

    fn remove_effect(&mut self, entity: EntityId, effect: EffectId) {
        self.forward(PresentationEvent::EffectRemoved { entity, effect });
    }
}

impl SoundSink for ChannelPresentation {
    fn add(&mut self, entity: EntityId, sound: SoundId, looping: bool) {
        self.forward(PresentationEvent::SoundAdded {
            entity,
            sound,
            looping,
        });
    }

    fn remove(&mut self, entity: EntityId, sound: SoundId) {
        self.forward(PresentationEvent::SoundRemoved { entity, sound });
    }
}

// ---------------------------------------------------------------------------
// NullPresentation
// ---------------------------------------------------------------------------

/// Discards every call. Used when no presentation subsystem is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl EffectSink for NullPresentation {
    fn add_effect(&mut self, _entity: EntityId, _effect: EffectId, _playback: Playback) {}
    fn remove_effect(&mut self, _entity: EntityId, _effect: EffectId) {}
}

impl SoundSink for NullPresentation {
    fn add(&mut self, _entity: EntityId, _sound: SoundId, _looping: bool) {}
    fn remove(&mut self, _entity: EntityId, _sound: SoundId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_forwards_in_call_order() {
        let (mut presentation, rx) = ChannelPresentation::new();
        let e = EntityId::new(1, 0);
        presentation.add_effect(e, EffectId(4), Playback::LoopForever);
        presentation.add(e, SoundId(18), true);
        presentation.remove_effect(e, EffectId(4));
        SoundSink::remove(&mut presentation, e, SoundId(18));

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                PresentationEvent::EffectAdded {
                    entity: e,
                    effect: EffectId(4),
                    playback: Playback::LoopForever
                },
                PresentationEvent::SoundAdded {
                    entity: e,
                    sound: SoundId(18),
                    looping: true
                },
                PresentationEvent::EffectRemoved {
                    entity: e,
                    effect: EffectId(4)
                },
                PresentationEvent::SoundRemoved {
                    entity: e,
                    sound: SoundId(18)
                },
            ]
        );
    }

    #[test]
    fn closed_receiver_is_not_an_error() {
        let (mut presentation, rx) = ChannelPresentation::new();
        drop(rx);
        presentation.add_effect(EntityId::new(0, 0), EffectId(1), Playback::Once);
    }
}
