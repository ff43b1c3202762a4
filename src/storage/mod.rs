//! # Storage Module - Character Persistence Layer
//!
//! The simulation reads and writes characters through the [`CharacterStore`]
//! contract and never assumes a particular backend.
//!
//! ## Backends
//!
//! - [`MemoryStore`] - ordered in-memory map, used by tests and headless simulations
//! - [`SledCharacterStore`] - durable sled tree with bincode-encoded records
//!
//! ## Queries
//!
//! [`CharacterQuery`] filters are conjunctive; an unset filter does not constrain.
//!
//! ```rust
//! use idlerpg::storage::{CharacterQuery, CharacterStore, MemoryStore};
//! use idlerpg::engine::Character;
//!
//! let mut store = MemoryStore::new();
//! let mut alice = Character::new(1, "alice", 600);
//! alice.online = true;
//! store.upsert(&alice).unwrap();
//! let online = store.query(&CharacterQuery::online()).unwrap();
//! assert_eq!(online, vec![1]);
//! ```

pub mod kv;

use std::collections::BTreeMap;

use crate::engine::errors::GameError;
use crate::engine::types::{Alignment, Character, CharacterId};

pub use kv::SledCharacterStore;

/// Key-value access to characters, keyed by character id.
///
/// Implementations must offer read-your-writes; listing order must be stable
/// (ascending id) so seeded simulations replay identically.
pub trait CharacterStore {
    fn load_all(&self) -> Result<Vec<Character>, GameError>;
    fn get(&self, id: CharacterId) -> Result<Character, GameError>;
    fn upsert(&mut self, character: &Character) -> Result<(), GameError>;
    fn query(&self, filter: &CharacterQuery) -> Result<Vec<CharacterId>, GameError>;

    /// Push buffered writes to durable storage. Called once per tick.
    fn flush(&self) -> Result<(), GameError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterQuery {
    pub online: Option<bool>,
    pub alignment: Option<Alignment>,
    pub min_level: Option<u32>,
    pub max_level: Option<u32>,
    pub min_item_sum: Option<i64>,
    pub max_item_sum: Option<i64>,
    pub exclude_name: Option<String>,
}

impl CharacterQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn online() -> Self {
        Self {
            online: Some(true),
            ..Self::default()
        }
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn level_at_least(mut self, level: u32) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn level_at_most(mut self, level: u32) -> Self {
        self.max_level = Some(level);
        self
    }

    pub fn item_sum_between(mut self, min: i64, max: i64) -> Self {
        self.min_item_sum = Some(min);
        self.max_item_sum = Some(max);
        self
    }

    pub fn excluding_name(mut self, name: &str) -> Self {
        self.exclude_name = Some(name.to_string());
        self
    }

    pub fn matches(&self, c: &Character) -> bool {
        if self.online.is_some_and(|online| c.online != online) {
            return false;
        }
        if self.alignment.is_some_and(|a| c.alignment != a) {
            return false;
        }
        if self.min_level.is_some_and(|min| c.level < min) {
            return false;
        }
        if self.max_level.is_some_and(|max| c.level > max) {
            return false;
        }
        let sum = c.item_sum();
        if self.min_item_sum.is_some_and(|min| sum < min) {
            return false;
        }
        if self.max_item_sum.is_some_and(|max| sum > max) {
            return false;
        }
        if self
            .exclude_name
            .as_deref()
            .is_some_and(|name| c.username == name)
        {
            return false;
        }
        true
    }
}

/// In-memory store; iteration follows ascending character id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    characters: BTreeMap<CharacterId, Character>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters<I: IntoIterator<Item = Character>>(characters: I) -> Self {
        Self {
            characters: characters.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

impl CharacterStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Character>, GameError> {
        Ok(self.characters.values().cloned().collect())
    }

    fn get(&self, id: CharacterId) -> Result<Character, GameError> {
        self.characters
            .get(&id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("character: {}", id)))
    }

    fn upsert(&mut self, character: &Character) -> Result<(), GameError> {
        self.characters.insert(character.id, character.clone());
        Ok(())
    }

    fn query(&self, filter: &CharacterQuery) -> Result<Vec<CharacterId>, GameError> {
        Ok(self
            .characters
            .values()
            .filter(|c| filter.matches(c))
            .map(|c| c.id)
            .collect())
    }
}
