//! Gameplay components shared by the server systems.

use meridian_ecs::world::World;
use serde::{Deserialize, Serialize};

/// A bounded mana pool. `min` is the current amount, `max` the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mana {
    pub min: i32,
    pub max: i32,
}

impl Mana {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn is_full(&self) -> bool {
        self.min >= self.max
    }
}

/// Marker: the entity is meditating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meditating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatKind {
    Physical,
    Magic,
}

/// Floating combat text shown above an entity. Only ever sent in diffs,
/// never stored on the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatMessage {
    pub text: String,
    pub kind: CombatKind,
}

impl CombatMessage {
    pub fn magic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CombatKind::Magic,
        }
    }

    pub fn physical(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: CombatKind::Physical,
        }
    }
}

/// Register every server component type with `world`.
pub fn register_components(world: &mut World) {
    world.register_component::<Mana>("mana");
    world.register_component::<Meditating>("meditating");
    world.register_component::<CombatMessage>("combat_message");
}
