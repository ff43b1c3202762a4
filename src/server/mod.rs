//! # Game Server - Tick Loop and Adapter Handle
//!
//! [`GameServer`] drives the engine on a fixed delay: one tick runs to
//! completion, its narration is forwarded to the announce channel, then the
//! loop sleeps for `tick_interval_secs`. Ticks never overlap; the engine sits
//! behind an async mutex that adapter calls through [`EngineHandle`] share, so
//! a presence change arriving mid-tick waits for the tick to finish.
//!
//! ```rust,no_run
//! use idlerpg::config::Config;
//! use idlerpg::server::{open_engine, GameServer};
//! use tokio::sync::{mpsc, watch};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let engine = open_engine(&config)?;
//!     let (announce_tx, mut announce_rx) = mpsc::unbounded_channel();
//!     let (_stop_tx, stop_rx) = watch::channel(false);
//!     let server = GameServer::new(engine, config.game.tick_interval_secs, announce_tx);
//!     tokio::spawn(async move {
//!         while let Some(line) = announce_rx.recv().await {
//!             println!("{}", line);
//!         }
//!     });
//!     server.run(stop_rx).await
//! }
//! ```

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};

use crate::config::Config;
use crate::engine::penalty::PenaltyKind;
use crate::engine::tables::{FlavorTable, MonsterTable};
use crate::engine::{Alignment, Character, CharacterId, Engine, GameError, TickReport, WorldEvent};
use crate::logutil::one_line;
use crate::metrics;
use crate::storage::{CharacterStore, SledCharacterStore};

/// Open the sled store and lookup tables named in `config`. A missing table
/// file is logged and replaced by an empty table.
pub fn open_engine(config: &Config) -> Result<Engine<SledCharacterStore>> {
    let db_path = config.storage.character_db_path();
    let store = SledCharacterStore::open(&db_path)
        .with_context(|| format!("opening character store at {}", db_path.display()))?;
    let engine = Engine::new(config.game.clone(), store)?;
    Ok(engine.with_tables(
        load_monsters(&config.tables.monsters_file),
        load_flavor(&config.tables.events_file),
    ))
}

pub fn load_monsters(path: &str) -> MonsterTable {
    match MonsterTable::load(path) {
        Ok(table) => {
            debug!("loaded {} monsters from {}", table.len(), path);
            table
        }
        Err(e) => {
            warn!("monster table {} unusable: {}", path, e);
            MonsterTable::default()
        }
    }
}

pub fn load_flavor(path: &str) -> FlavorTable {
    match FlavorTable::load(path) {
        Ok(table) => table,
        Err(e) => {
            warn!("flavor table {} unusable: {}", path, e);
            FlavorTable::default()
        }
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct GameServer<S: CharacterStore + Send + 'static> {
    engine: Arc<Mutex<Engine<S>>>,
    tick_interval: Duration,
    announce_tx: mpsc::UnboundedSender<String>,
}

impl<S: CharacterStore + Send + 'static> GameServer<S> {
    pub fn new(
        engine: Engine<S>,
        tick_interval_secs: u64,
        announce_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tick_interval: Duration::from_secs(tick_interval_secs.max(1)),
            announce_tx,
        }
    }

    /// Same as [`GameServer::new`] with a custom delay, for tests that cannot wait seconds.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn handle(&self) -> EngineHandle<S> {
        EngineHandle {
            engine: Arc::clone(&self.engine),
            announce_tx: self.announce_tx.clone(),
        }
    }

    /// Run one tick against the wall clock and forward its narration.
    pub async fn tick_once(&self) -> TickReport {
        let mut engine = self.engine.lock().await;
        let report = engine.tick_at(unix_now());
        forward(&self.announce_tx, engine.drain_narration());
        report
    }

    /// Tick until `shutdown` turns true (or its sender goes away). A tick in
    /// flight always finishes first.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "game server started, ticking every {:?}",
            self.tick_interval
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.tick_once().await;
            if report.level_ups > 0 || !report.events.is_empty() {
                debug!(
                    "tick: {} events, {} level-ups",
                    report.events.len(),
                    report.level_ups
                );
            }
            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.engine.lock().await.store().flush()?;
        let stats = metrics::snapshot();
        info!(
            "game server stopped after {} ticks ({} level-ups, {} duels, {} critical strikes, {} item drops)",
            stats.ticks, stats.level_ups, stats.duels, stats.critical_strikes, stats.item_drops
        );
        Ok(())
    }
}

fn forward(tx: &mpsc::UnboundedSender<String>, lines: Vec<String>) {
    for line in lines {
        debug!("announce: {}", one_line(&line));
        if tx.send(line).is_err() {
            debug!("announce channel closed; narration dropped");
        }
    }
}

/// What a chat front end calls into. Each call takes the engine lock, so calls
/// are serialized with each other and with ticks.
pub struct EngineHandle<S: CharacterStore + Send + 'static> {
    engine: Arc<Mutex<Engine<S>>>,
    announce_tx: mpsc::UnboundedSender<String>,
}

impl<S: CharacterStore + Send + 'static> Clone for EngineHandle<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            announce_tx: self.announce_tx.clone(),
        }
    }
}

impl<S: CharacterStore + Send + 'static> EngineHandle<S> {
    async fn with_engine<T>(
        &self,
        f: impl FnOnce(&mut Engine<S>) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut engine = self.engine.lock().await;
        let result = f(&mut *engine);
        forward(&self.announce_tx, engine.drain_narration());
        result
    }

    pub async fn register(&self, id: CharacterId, username: &str) -> Result<Character, GameError> {
        self.with_engine(|e| e.register(id, username)).await
    }

    /// A chat message of `length` characters.
    pub async fn on_message(&self, id: CharacterId, length: usize) -> Result<i64, GameError> {
        self.with_engine(|e| e.penalize(id, PenaltyKind::Message { length }))
            .await
    }

    pub async fn on_presence(&self, id: CharacterId, online: bool) -> Result<Option<i64>, GameError> {
        self.with_engine(|e| e.set_online(id, online)).await
    }

    pub async fn on_activity_change(&self, id: CharacterId) -> Result<i64, GameError> {
        self.with_engine(|e| e.penalize(id, PenaltyKind::Activity))
            .await
    }

    pub async fn set_alignment(&self, id: CharacterId, alignment: Alignment) -> Result<(), GameError> {
        self.with_engine(|e| e.set_alignment(id, alignment)).await
    }

    /// Fire a world event immediately (operator command).
    pub async fn trigger(&self, event: WorldEvent) -> Result<(), GameError> {
        info!("operator triggered {}", event);
        metrics::record_event(event.name());
        self.with_engine(|e| e.dispatch(event)).await
    }

    pub async fn top_players(&self, count: usize) -> Result<Vec<Character>, GameError> {
        self.with_engine(|e| e.top_players(count)).await
    }
}
