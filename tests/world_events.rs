mod common;

use common::{engine_with, seeded_config, CharacterBuilder};
use idlerpg::engine::{Alignment, Character, Engine, FlavorTable, MonsterTable, WorldEvent};
use idlerpg::storage::{CharacterStore, MemoryStore};

const MONSTERS: &str = include_str!("../data/monsters.txt");
const EVENTS: &str = include_str!("../data/events.txt");

fn crowd() -> Vec<Character> {
    (1..=8u64)
        .map(|id| {
            let alignment = match id {
                1..=4 => Alignment::Good,
                5 | 6 => Alignment::Evil,
                _ => Alignment::Neutral,
            };
            CharacterBuilder::new(id)
                .online()
                .level(20 + id as u32)
                .gear(10 * id as u32)
                .alignment(alignment)
                .next_ttl(80_000)
                .build()
        })
        .collect()
}

fn populated(seed: u64) -> Engine<MemoryStore> {
    engine_with(seeded_config(seed), crowd()).with_tables(
        MonsterTable::parse(MONSTERS).expect("monster table"),
        FlavorTable::parse(EVENTS),
    )
}

#[test]
fn shipped_tables_parse() {
    let monsters = MonsterTable::parse(MONSTERS).unwrap();
    assert_eq!(monsters.len(), 25);
    assert_eq!(monsters.name_for(1), "Rabid Squirrel");
    let flavor = FlavorTable::parse(EVENTS);
    assert_eq!(flavor.count(idlerpg::engine::tables::GODSEND_GENERIC), 10);
    assert_eq!(flavor.count(idlerpg::engine::tables::CALAMITY_GENERIC), 10);
}

#[test]
fn every_event_narrates_in_a_busy_world() {
    for seed in 0..25 {
        for event in WorldEvent::ALL {
            if event == WorldEvent::Evilness {
                // a failed theft attempt is silent
                continue;
            }
            let mut engine = populated(seed);
            engine.dispatch(event).unwrap();
            let lines = engine.drain_narration();
            assert!(!lines.is_empty(), "{} was silent with seed {}", event, seed);
        }
    }
}

#[test]
fn events_never_touch_offline_characters() {
    let mut characters = crowd();
    let sleeper = CharacterBuilder::new(99)
        .level(40)
        .gear(100)
        .alignment(Alignment::Good)
        .next_ttl(12_345)
        .build();
    characters.push(sleeper.clone());
    for seed in 0..10 {
        let mut engine = engine_with(seeded_config(seed), characters.clone());
        for event in WorldEvent::ALL {
            engine.dispatch(event).unwrap();
        }
        let after = engine.store().get(99).unwrap();
        assert_eq!(after.next_ttl, sleeper.next_ttl);
        assert_eq!(after.items, sleeper.items);
    }
}

#[test]
fn steals_and_drops_never_create_items() {
    for seed in 0..25 {
        let mut engine = populated(seed);
        let before: i64 = engine.store().load_all().unwrap().iter().map(|c| c.item_sum()).sum();
        engine.dispatch(WorldEvent::RandomSteal).unwrap();
        engine.dispatch(WorldEvent::Evilness).unwrap();
        let after: i64 = engine.store().load_all().unwrap().iter().map(|c| c.item_sum()).sum();
        assert_eq!(before, after, "seed {}", seed);
    }
}

#[test]
fn lone_challenger_finds_nobody() {
    let mut engine = engine_with(
        seeded_config(7),
        vec![CharacterBuilder::new(1).online().level(30).build()],
    );
    assert!(engine.random_challenge(1).unwrap().is_none());
    let lines = engine.drain_narration();
    assert!(lines[0].contains("nobody felt like being defeated"));
}
