//! # idlerpg - Tick-Driven Idle RPG Simulation
//!
//! An idle role-playing game where characters advance by doing nothing. Every
//! few seconds the world ticks: clocks run down, characters level up, wander a
//! wrap-around map, bump into each other and fight, find and lose items, and
//! get caught up in random acts of gods, monsters and celebrities.
//!
//! ## Features
//!
//! - **Progression**: geometric level curve (linear past level 60) with time
//!   penalties for chatting, leaving or changing activity.
//! - **Combat**: roll-vs-sum duels with alignment, hero and potion modifiers,
//!   critical strikes and item drops.
//! - **World Events**: population-scaled random events with a second tier that
//!   needs enough of the world online.
//! - **Persistence**: characters in a sled tree, one bincode record each.
//! - **Async Loop**: Tokio fixed-delay tick loop with a serialized adapter handle.
//!
//! ## Quick Start
//!
//! ```rust
//! use idlerpg::config::GameConfig;
//! use idlerpg::engine::Engine;
//! use idlerpg::storage::MemoryStore;
//!
//! let config = GameConfig { seed: Some(7), ..GameConfig::default() };
//! let mut engine = Engine::new(config, MemoryStore::new()).unwrap();
//! engine.register(1, "alice").unwrap();
//! engine.set_online(1, true).unwrap();
//! let report = engine.advance(3);
//! assert_eq!(report.online, 1);
//! for line in engine.drain_narration() {
//!     println!("{}", line);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - simulation: progression, combat, economy, map, scheduler
//! - [`storage`] - character store contract and backends
//! - [`server`] - tick loop and adapter handle
//! - [`config`] - TOML configuration
//! - [`metrics`] - process-wide counters
//! - [`logutil`] - logger setup

pub mod config;
pub mod engine;
pub mod logutil;
pub mod metrics;
pub mod server;
pub mod storage;
