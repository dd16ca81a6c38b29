//! World-scoped state handed to every system call.
//!
//! There are no process-wide singletons: everything a system may touch lives
//! in one [`ServerContext`] owned by the tick loop and passed explicitly.
//! Dropping the context tears all of it down together.

use meridian_ecs::world::World;
use meridian_net::dispatch::UpdateDispatcher;
use meridian_net::notification::MessageQueue;

use crate::presentation::{EffectSink, NullPresentation, SoundSink};
use crate::rng::{LocalRandom, RandomSource};

pub struct ServerContext {
    pub world: World,
    /// Outgoing entity diffs.
    pub updates: UpdateDispatcher,
    /// Outgoing console messages.
    pub messages: MessageQueue,
    pub effects: Box<dyn EffectSink>,
    pub sounds: Box<dyn SoundSink>,
    pub rng: Box<dyn RandomSource>,
}

impl ServerContext {
    /// Wrap `world` with empty queues, no presentation, and the calling
    /// thread's generator.
    pub fn new(world: World) -> Self {
        Self {
            world,
            updates: UpdateDispatcher::new(),
            messages: MessageQueue::new(),
            effects: Box::new(NullPresentation),
            sounds: Box::new(NullPresentation),
            rng: Box::new(LocalRandom),
        }
    }

    pub fn with_effects(mut self, effects: Box<dyn EffectSink>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_sounds(mut self, sounds: Box<dyn SoundSink>) -> Self {
        self.sounds = sounds;
        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("world", &self.world)
            .field("pending_updates", &self.updates.len())
            .field("pending_messages", &self.messages.len())
            .finish()
    }
}
