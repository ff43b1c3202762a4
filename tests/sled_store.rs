mod common;

use common::{seeded_config, CharacterBuilder};
use idlerpg::engine::{Engine, GameError, Item, ItemSlot};
use idlerpg::storage::{CharacterQuery, CharacterStore, SledCharacterStore};
use tempfile::TempDir;

#[test]
fn characters_survive_a_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("characters");
    {
        let store = SledCharacterStore::open(&path).unwrap();
        let mut engine = Engine::new(seeded_config(41), store).unwrap();
        engine.register(1, "alice").unwrap();
        engine.set_online(1, true).unwrap();
        engine.advance(60);
        engine.into_store().flush().unwrap();
    }

    let store = SledCharacterStore::open(&path).unwrap();
    let alice = store.get(1).unwrap();
    assert_eq!(alice.username, "alice");
    assert!(alice.online);
    assert_eq!(alice.idled, 60);
    assert_eq!(store.query(&CharacterQuery::online()).unwrap(), vec![1]);
}

#[test]
fn item_strings_round_trip_through_the_store() {
    let dir = TempDir::new().unwrap();
    let mut store = SledCharacterStore::open(dir.path()).unwrap();
    let mut c = CharacterBuilder::new(7).level(40).build();
    let unique: Item = "a75".parse().unwrap();
    c.items.set(ItemSlot::Amulet, unique);
    store.upsert(&c).unwrap();
    assert_eq!(store.get(7).unwrap(), c);
}

#[test]
fn a_corrupt_record_is_reported_and_skipped() {
    let dir = TempDir::new().unwrap();
    let mut store = SledCharacterStore::open(dir.path()).unwrap();
    store
        .upsert(&CharacterBuilder::new(1).online().next_ttl(900).build())
        .unwrap();
    store.put_raw(2, b"definitely not bincode").unwrap();

    assert!(matches!(store.get(2), Err(GameError::DataCorruption(_))));
    assert!(store.load_all().is_err());
    assert_eq!(store.query(&CharacterQuery::all()).unwrap(), vec![1]);

    let mut engine = Engine::new(seeded_config(42), store).unwrap();
    let report = engine.advance(30);
    assert_eq!(report.online, 1);
    assert_eq!(engine.store().get(1).unwrap().next_ttl, 870);
}
