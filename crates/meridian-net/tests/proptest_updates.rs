//! Property tests for diff staging and dispatch.
//!
//! Random interleavings of upserts and removals must never produce a diff
//! that both upserts and removes the same component type, the final state of
//! each type must follow the last operation applied to it, and the dispatcher
//! must never hold an empty diff.

use std::collections::HashMap;

use meridian_ecs::prelude::*;
use meridian_net::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Mana {
    min: i32,
    max: i32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Meditating;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Health(u32);

#[derive(Debug, Clone)]
enum Stage {
    UpsertMana(i32),
    UpsertMarker,
    UpsertHealth(u32),
    Remove(u8),
}

fn stage_strategy() -> impl Strategy<Value = Stage> {
    prop_oneof![
        (0..100i32).prop_map(Stage::UpsertMana),
        Just(Stage::UpsertMarker),
        any::<u32>().prop_map(Stage::UpsertHealth),
        (0..3u8).prop_map(Stage::Remove),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Last {
    Upsert,
    Remove,
}

fn world() -> (World, [ComponentTypeId; 3]) {
    let mut world = World::new();
    let mana = world.register_component::<Mana>("mana");
    let marker = world.register_component::<Meditating>("meditating");
    let health = world.register_component::<Health>("health");
    (world, [mana, marker, health])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn staged_diffs_follow_last_operation(stages in prop::collection::vec(stage_strategy(), 0..30)) {
        let (mut world, ids) = world();
        let entity = world.spawn();
        let reg = world.registry();

        let mut builder = EntityUpdateBuilder::of(entity);
        let mut last: HashMap<ComponentTypeId, Last> = HashMap::new();
        for stage in &stages {
            match stage {
                Stage::UpsertMana(v) => {
                    builder.upsert(reg, &Mana { min: *v, max: 100 }).unwrap();
                    last.insert(ids[0], Last::Upsert);
                }
                Stage::UpsertMarker => {
                    builder.upsert(reg, &Meditating).unwrap();
                    last.insert(ids[1], Last::Upsert);
                }
                Stage::UpsertHealth(v) => {
                    builder.upsert(reg, &Health(*v)).unwrap();
                    last.insert(ids[2], Last::Upsert);
                }
                Stage::Remove(i) => {
                    builder.remove_type(ids[*i as usize]);
                    last.insert(ids[*i as usize], Last::Remove);
                }
            }
        }

        prop_assert_eq!(builder.is_empty(), stages.is_empty());
        let update = builder.build();
        prop_assert!(builder.is_empty());

        for id in ids {
            let upserted = update.upsert_for(id).is_some();
            let removed = update.removes(id);
            prop_assert!(!(upserted && removed), "contradictory diff for {:?}", id);
            match last.get(&id) {
                Some(Last::Upsert) => prop_assert!(upserted),
                Some(Last::Remove) => prop_assert!(removed),
                None => prop_assert!(!upserted && !removed),
            }
        }
        let mut seen: Vec<_> = update.upserts().iter().map(|s| s.component).collect();
        seen.dedup();
        prop_assert_eq!(seen.len(), update.upserts().len());
    }

    #[test]
    fn dispatcher_never_queues_empty_diffs(stage_counts in prop::collection::vec(0..3usize, 1..20)) {
        let (mut world, _) = world();
        let entity = world.spawn();
        let mut dispatcher = UpdateDispatcher::new();
        let mut expected = 0;

        for count in &stage_counts {
            let mut builder = EntityUpdateBuilder::of(entity);
            for i in 0..*count {
                builder.upsert(world.registry(), &Health(i as u32)).unwrap();
            }
            if *count > 0 {
                expected += 1;
            }
            dispatcher.add(builder.build(), UpdateScope::All);
        }

        prop_assert_eq!(dispatcher.len(), expected);
        prop_assert!(dispatcher.pending().all(|u| !u.upserts.is_empty() || !u.removals.is_empty()));
        prop_assert_eq!(
            dispatcher.stats().dropped_empty as usize,
            stage_counts.len() - expected
        );
    }
}
