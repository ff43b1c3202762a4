//! Idle RPG simulation engine.
//! Characters level up by idling; the world throws fights, items and divine
//! whims at them along the way. Everything here is driven by [`Engine::advance`]
//! and writes back through a [`crate::storage::CharacterStore`].

pub mod combat;
pub mod duration;
pub mod economy;
pub mod errors;
pub mod events;
pub mod item;
pub mod map;
pub mod penalty;
pub mod progression;
pub mod scheduler;
pub mod tables;
pub mod types;
pub mod world;

pub use combat::{roll_sum, DuelKind, DuelOutcome, RollModifiers, RollSum};
pub use duration::format_duration;
pub use economy::{UniqueItem, UNIQUE_ITEMS};
pub use errors::GameError;
pub use item::Item;
pub use map::{CollisionTracker, ItemDrop, MapSimulator};
pub use penalty::PenaltyKind;
pub use progression::base_time_to_level;
pub use scheduler::{EventScheduler, HourlyGate, PopulationCounts, WorldEvent};
pub use tables::{FlavorTable, MonsterTable};
pub use types::*;
pub use world::{Engine, TickReport};
