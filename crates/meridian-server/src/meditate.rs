//! Meditation: a toggled status that recovers mana on an interval.
//!
//! An entity is meditating exactly when it carries the [`Meditating`]
//! marker. While meditating, each pass flips a fair coin and on success
//! restores a fixed share of the entity's max mana. Meditation ends either
//! when the player toggles it off or automatically once mana is full. Both
//! paths share one teardown so the looping effect and sound started on entry
//! are always stopped exactly once.

use meridian_ecs::aspect::Aspect;
use meridian_ecs::entity::EntityId;
use meridian_net::dispatch::UpdateScope;
use meridian_net::notification::ConsoleMessage;
use meridian_net::update::EntityUpdateBuilder;
use tracing::debug;

use crate::components::{CombatMessage, Mana, Meditating};
use crate::config::{ConfigError, MeditationConfig};
use crate::context::ServerContext;
use crate::presentation::Playback;
use crate::system::IntervalSystem;
use crate::SystemError;

pub const MEDITATE_SYSTEM_NAME: &str = "meditate";

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Meditation began.
    Started,
    /// Meditation ended.
    Stopped,
    /// Mana was already full; the player was told and nothing else happened.
    ManaFull,
    AlreadyActive,
    AlreadyInactive,
    /// The entity is gone or has no mana pool.
    Ignored,
}

/// Raise `mana.min` by `fraction` of `mana.max`, clamped to `max`.
///
/// The new value is truncated toward zero before clamping. Returns the
/// amount actually gained.
pub fn apply_recovery(mana: &mut Mana, fraction: f64) -> i32 {
    let before = mana.min;
    let target = (f64::from(mana.min) + f64::from(mana.max) * fraction).trunc() as i32;
    mana.min = target.min(mana.max);
    mana.min - before
}

#[derive(Debug, Clone)]
pub struct MeditateSystem {
    config: MeditationConfig,
}

impl MeditateSystem {
    pub fn new(config: MeditationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MeditationConfig {
        &self.config
    }

    /// Seconds between recovery passes.
    pub fn interval_secs(&self) -> f64 {
        self.config.interval_secs
    }

    /// Player action: start meditating if inactive, stop if active.
    pub fn toggle(
        &self,
        entity: EntityId,
        ctx: &mut ServerContext,
    ) -> Result<ToggleOutcome, SystemError> {
        if ctx.world.has_component::<Meditating>(entity) {
            self.toggle_off(entity, ctx)
        } else {
            self.toggle_on(entity, ctx)
        }
    }

    pub fn toggle_on(
        &self,
        entity: EntityId,
        ctx: &mut ServerContext,
    ) -> Result<ToggleOutcome, SystemError> {
        if !ctx.world.is_alive(entity) {
            debug!(entity = ?entity, "meditate toggle on stale entity ignored");
            return Ok(ToggleOutcome::Ignored);
        }
        if ctx.world.has_component::<Meditating>(entity) {
            return Ok(ToggleOutcome::AlreadyActive);
        }
        let Some(mana) = ctx.world.get_component::<Mana>(entity).copied() else {
            debug!(entity = ?entity, "meditate toggle on entity without mana ignored");
            return Ok(ToggleOutcome::Ignored);
        };
        if mana.is_full() {
            ctx.messages
                .add(entity, ConsoleMessage::info(&self.config.full_key));
            return Ok(ToggleOutcome::ManaFull);
        }

        ctx.world.insert_component(entity, Meditating)?;
        ctx.effects
            .add_effect(entity, self.config.loop_effect, Playback::LoopForever);
        ctx.sounds.add(entity, self.config.loop_sound, true);
        ctx.messages
            .add(entity, ConsoleMessage::info(&self.config.start_key));

        let mut notify = EntityUpdateBuilder::of(entity);
        notify.upsert(ctx.world.registry(), &Meditating)?;
        ctx.updates.add(notify.build(), UpdateScope::All);

        debug!(entity = ?entity, mana = mana.min, max = mana.max, "meditation started");
        Ok(ToggleOutcome::Started)
    }

    pub fn toggle_off(
        &self,
        entity: EntityId,
        ctx: &mut ServerContext,
    ) -> Result<ToggleOutcome, SystemError> {
        if !ctx.world.has_component::<Meditating>(entity) {
            return Ok(ToggleOutcome::AlreadyInactive);
        }

        let mut notify = EntityUpdateBuilder::of(entity);
        notify.remove::<Meditating>(ctx.world.registry())?;
        self.stop_meditation(entity, ctx)?;
        ctx.messages
            .add(entity, ConsoleMessage::info(&self.config.stop_key));
        ctx.updates.add(notify.build(), UpdateScope::All);

        debug!(entity = ?entity, "meditation stopped");
        Ok(ToggleOutcome::Stopped)
    }

    /// Teardown shared by toggle-off and auto-stop.
    fn stop_meditation(&self, entity: EntityId, ctx: &mut ServerContext) -> Result<(), SystemError> {
        ctx.effects.remove_effect(entity, self.config.loop_effect);
        ctx.sounds.remove(entity, self.config.loop_sound);
        ctx.world.remove_component::<Meditating>(entity)?;
        Ok(())
    }
}

impl IntervalSystem for MeditateSystem {
    fn name(&self) -> &str {
        MEDITATE_SYSTEM_NAME
    }

    fn aspect(&self) -> Aspect {
        Aspect::new().all::<Meditating>().all::<Mana>()
    }

    fn process(&self, entity: EntityId, ctx: &mut ServerContext) -> Result<(), SystemError> {
        let Some(mut mana) = ctx.world.get_component::<Mana>(entity).copied() else {
            debug!(entity = ?entity, "meditating entity lost its mana pool");
            return Ok(());
        };

        let mut update = EntityUpdateBuilder::of(entity);
        let mut notify = EntityUpdateBuilder::of(entity);

        // Stage both diffs before touching the world so a snapshot error
        // leaves the entity as it was.
        let mut recovered = None;
        if !mana.is_full() && ctx.rng.next_bool() {
            let delta = apply_recovery(&mut mana, self.config.recovery_fraction);
            let registry = ctx.world.registry();
            update.upsert(registry, &mana)?;
            notify.upsert(registry, &CombatMessage::magic(format!("+{delta}")))?;
            recovered = Some(delta);
        }
        if mana.is_full() {
            notify.remove::<Meditating>(ctx.world.registry())?;
        }

        if let Some(delta) = recovered {
            ctx.world.insert_component(entity, mana)?;
            ctx.messages.add(
                entity,
                ConsoleMessage::info(&self.config.recovered_key).with_arg(delta),
            );
        }

        if mana.is_full() {
            ctx.messages
                .add(entity, ConsoleMessage::info(&self.config.stop_key));
            self.stop_meditation(entity, ctx)?;
            debug!(entity = ?entity, "mana full, meditation ended");
        }

        if !update.is_empty() {
            ctx.updates.add(update.build(), UpdateScope::Entity);
        }
        if !notify.is_empty() {
            ctx.updates.add(notify.build(), UpdateScope::All);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
