//! Property tests for mana recovery and the meditation lifecycle.

use std::sync::Arc;

use meridian_server::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]

    #[test]
    fn recovery_never_overshoots(
        max in 1..100_000i32,
        share in 0.0..1.0f64,
        fraction in 0.001..=1.0f64,
    ) {
        let min = (f64::from(max) * share) as i32;
        let mut mana = Mana::new(min, max);
        let delta = apply_recovery(&mut mana, fraction);

        prop_assert!(mana.min <= mana.max);
        prop_assert!(delta >= 0);
        prop_assert_eq!(mana.min, min + delta);
    }

    #[test]
    fn meditating_implies_not_full(
        pools in prop::collection::vec((0..500i32, 1..500i32), 1..12),
        seed in any::<u64>(),
        ticks in 1..400u64,
    ) {
        let mut world = World::new();
        register_components(&mut world);
        let entities: Vec<_> = pools
            .iter()
            .map(|&(min, max)| world.spawn_with(Mana::new(min.min(max), max)))
            .collect();

        let meditate = Arc::new(MeditateSystem::new(MeditationConfig::default()).unwrap());
        let ctx = ServerContext::new(world).with_rng(Box::new(SeededRandom::new(seed)));
        let mut tick_loop = TickLoop::new(ctx, TickConfig::from_rate(8));
        tick_loop.add_system(meditate.clone(), 0.5).unwrap();
        for &e in &entities {
            meditate.toggle(e, tick_loop.context_mut()).unwrap();
        }

        tick_loop.run_ticks(ticks);

        let ctx = tick_loop.context_mut();
        for &e in &entities {
            let mana = *ctx.world.get_component::<Mana>(e).unwrap();
            prop_assert!(mana.min <= mana.max);
            if ctx.world.has_component::<Meditating>(e) {
                prop_assert!(!mana.is_full());
            }
        }
        for update in ctx.updates.drain() {
            prop_assert!(!update.upserts.is_empty() || !update.removals.is_empty());
            let meditating = ctx.world.registry().lookup::<Meditating>().unwrap();
            let upserted = update.upserts.iter().any(|s| s.component == meditating);
            prop_assert!(!(upserted && update.removals.contains(&meditating)));
        }
    }
}
