#![allow(dead_code)]

use idlerpg::config::GameConfig;
use idlerpg::engine::{Alignment, Character, CharacterId, Engine, Item, ItemSlot};
use idlerpg::storage::MemoryStore;

pub fn seeded_config(seed: u64) -> GameConfig {
    GameConfig {
        seed: Some(seed),
        ..GameConfig::default()
    }
}

pub fn engine_with(config: GameConfig, characters: Vec<Character>) -> Engine<MemoryStore> {
    Engine::new(config, MemoryStore::with_characters(characters)).expect("engine")
}

/// Builder for characters placed straight into a store, skipping registration.
pub struct CharacterBuilder {
    character: Character,
}

impl CharacterBuilder {
    pub fn new(id: CharacterId) -> Self {
        Self {
            character: Character::new(id, &format!("idler{}", id), 600),
        }
    }

    pub fn online(mut self) -> Self {
        self.character.online = true;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.character.level = level;
        self
    }

    pub fn next_ttl(mut self, ttl: i64) -> Self {
        self.character.next_ttl = ttl;
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.character.alignment = alignment;
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.character.x = x;
        self.character.y = y;
        self
    }

    /// Every slot gets an item of `level`, so the item sum is ten times that.
    pub fn gear(mut self, level: u32) -> Self {
        for slot in ItemSlot::ALL {
            self.character.items.set(slot, Item::plain(level));
        }
        self
    }

    pub fn build(self) -> Character {
        self.character
    }
}
