//! The simulation engine: owns the store, RNG, map and tables, and drives one
//! tick at a time.

use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::GameConfig;
use crate::engine::duration::format_duration;
use crate::engine::errors::GameError;
use crate::engine::map::MapSimulator;
use crate::engine::penalty::PenaltyKind;
use crate::engine::progression::base_time_to_level;
use crate::engine::scheduler::{EventScheduler, HourlyGate, PopulationCounts, WorldEvent};
use crate::engine::tables::{FlavorTable, MonsterTable};
use crate::engine::types::{Alignment, Character, CharacterId};
use crate::metrics;
use crate::storage::{CharacterQuery, CharacterStore};

/// Fraction of online characters at level 25+ above which the hourly report
/// also stages a challenge.
const HOURLY_CHALLENGE_RATIO: f64 = 0.15;
const HOURLY_CHALLENGE_LEVEL: u32 = 25;
const TOP_PLAYERS: usize = 5;

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub elapsed: i64,
    pub online: usize,
    pub events: Vec<WorldEvent>,
    pub collisions: usize,
    pub level_ups: usize,
    pub hourly_report: bool,
}

pub struct Engine<S: CharacterStore> {
    pub(crate) config: GameConfig,
    pub(crate) store: S,
    pub(crate) rng: StdRng,
    pub(crate) map: MapSimulator,
    pub(crate) monsters: MonsterTable,
    pub(crate) flavor: FlavorTable,
    scheduler: EventScheduler,
    hourly: HourlyGate,
    last_tick: Option<i64>,
    narration: Vec<String>,
}

impl<S: CharacterStore> Engine<S> {
    /// Build an engine. Seeded from `config.seed` when present, otherwise from entropy.
    pub fn new(config: GameConfig, store: S) -> Result<Self, GameError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            map: MapSimulator::new(config.map_width, config.map_height),
            scheduler: EventScheduler::new(config.tick_interval_secs, config.quorum_ratio),
            config,
            store,
            rng,
            monsters: MonsterTable::default(),
            flavor: FlavorTable::default(),
            hourly: HourlyGate::new(),
            last_tick: None,
            narration: Vec::new(),
        })
    }

    pub fn with_tables(mut self, monsters: MonsterTable, flavor: FlavorTable) -> Self {
        self.monsters = monsters;
        self.flavor = flavor;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn map(&self) -> &MapSimulator {
        &self.map
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub(crate) fn announce(&mut self, line: String) {
        trace!("narration: {}", line);
        self.narration.push(line);
    }

    /// Position in the narration buffer, for [`Engine::commit`] to roll back to.
    pub(crate) fn narration_mark(&self) -> usize {
        self.narration.len()
    }

    /// Write `after` record by record. When a write fails, every record already
    /// written goes back to its `before` twin (matched by index) and narration
    /// produced since `mark` is withdrawn, so the event leaves no partial trace.
    pub(crate) fn commit(
        &mut self,
        before: &[Character],
        after: &[Character],
        mark: usize,
    ) -> Result<(), GameError> {
        for (written, character) in after.iter().enumerate() {
            if let Err(e) = self.store.upsert(character) {
                for original in &before[..written] {
                    if let Err(undo) = self.store.upsert(original) {
                        error!("character {} left half-updated: {}", original.id, undo);
                    }
                }
                self.narration.truncate(mark);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Take every narration line produced since the last drain.
    pub fn drain_narration(&mut self) -> Vec<String> {
        std::mem::take(&mut self.narration)
    }

    /// Run one tick at wall-clock `now` (unix seconds). The first call only
    /// establishes the baseline; a clock that went backwards counts as zero.
    pub fn tick_at(&mut self, now: i64) -> TickReport {
        let elapsed = match self.last_tick {
            Some(previous) => (now - previous).max(0),
            None => 0,
        };
        self.last_tick = Some(now);
        self.advance(elapsed)
    }

    /// Run one tick covering `elapsed` seconds.
    ///
    /// Order: world events, movement and collisions, the hourly report, then
    /// clock decay and level-ups. A failure inside one step is logged and the
    /// rest of the tick carries on.
    pub fn advance(&mut self, elapsed: i64) -> TickReport {
        let elapsed = elapsed.max(0);
        metrics::record_tick();
        let mut report = TickReport {
            elapsed,
            ..TickReport::default()
        };
        let hour_passed = self.hourly.advance(elapsed);
        let online = match self.store.query(&CharacterQuery::online()) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("tick skipped, cannot list online characters: {}", e);
                return report;
            }
        };
        report.online = online.len();
        if online.is_empty() {
            return report;
        }

        match self.population_counts(online.len()) {
            Ok(counts) => {
                let events = self.scheduler.roll(&counts, &mut self.rng);
                for event in &events {
                    metrics::record_event(event.name());
                    if let Err(e) = self.dispatch(*event) {
                        warn!("{} abandoned: {}", event, e);
                    }
                }
                report.events = events;
            }
            Err(e) => warn!("world events skipped: {}", e),
        }

        report.collisions = self.move_players(&online);

        if hour_passed {
            report.hourly_report = true;
            if let Err(e) = self.hourly_report(&online) {
                warn!("hourly report abandoned: {}", e);
            }
        }

        report.level_ups = self.progress_characters(&online, elapsed);
        if let Err(e) = self.store.flush() {
            warn!("tick writes not flushed: {}", e);
        }
        debug!(
            "tick: {}s, {} online, {} events, {} collisions, {} level-ups",
            elapsed,
            report.online,
            report.events.len(),
            report.collisions,
            report.level_ups
        );
        report
    }

    fn population_counts(&self, online: usize) -> Result<PopulationCounts, GameError> {
        Ok(PopulationCounts {
            total: self.store.query(&CharacterQuery::all())?.len(),
            online,
            online_good: self
                .store
                .query(&CharacterQuery::online().alignment(Alignment::Good))?
                .len(),
            online_evil: self
                .store
                .query(&CharacterQuery::online().alignment(Alignment::Evil))?
                .len(),
        })
    }

    /// A uniformly chosen online character, if anyone is online.
    pub(crate) fn random_online(&mut self) -> Result<Option<CharacterId>, GameError> {
        self.random_matching(&CharacterQuery::online())
    }

    pub(crate) fn random_matching(
        &mut self,
        filter: &CharacterQuery,
    ) -> Result<Option<CharacterId>, GameError> {
        let ids = self.store.query(filter)?;
        Ok(ids.choose(&mut self.rng).copied())
    }

    fn hourly_report(&mut self, online: &[CharacterId]) -> Result<(), GameError> {
        let top = self.top_players(TOP_PLAYERS)?;
        if !top.is_empty() {
            self.announce("Idle RPG Top Players:".to_string());
            for (rank, c) in top.iter().enumerate() {
                self.announce(format!(
                    "#{} {}, the level {} {}. Next level in {}.",
                    rank + 1,
                    c.username,
                    c.level,
                    c.charclass,
                    format_duration(c.next_ttl)
                ));
            }
        }
        let veterans = self
            .store
            .query(&CharacterQuery::online().level_at_least(HOURLY_CHALLENGE_LEVEL))?
            .len();
        if veterans as f64 / online.len() as f64 > HOURLY_CHALLENGE_RATIO {
            if let Some(id) = online.choose(&mut self.rng).copied() {
                self.random_challenge(id)?;
            }
        }
        Ok(())
    }

    /// Highest level first, then least time remaining. Unreadable records are skipped.
    pub fn top_players(&self, count: usize) -> Result<Vec<Character>, GameError> {
        let mut all: Vec<Character> = Vec::new();
        for id in self.store.query(&CharacterQuery::all())? {
            match self.store.get(id) {
                Ok(c) => all.push(c),
                Err(e) => warn!("ranking skips character {}: {}", id, e),
            }
        }
        all.sort_by(|a, b| b.level.cmp(&a.level).then(a.next_ttl.cmp(&b.next_ttl)));
        all.truncate(count);
        Ok(all)
    }

    /// Fetch a character, creating it with starting values on first contact.
    pub fn register(&mut self, id: CharacterId, username: &str) -> Result<Character, GameError> {
        match self.store.get(id) {
            Ok(c) => Ok(c),
            Err(GameError::NotFound(_)) => {
                let mut c = Character::new(id, username, base_time_to_level(&self.config, 0));
                c.x = self.rng.gen_range(0..self.map.width());
                c.y = self.rng.gen_range(0..self.map.height());
                self.store.upsert(&c)?;
                info!("registered {} ({})", username, id);
                self.announce(format!(
                    "Welcome {}, the newest {}! Next level in {}.",
                    c.username,
                    c.charclass,
                    format_duration(c.next_ttl)
                ));
                Ok(c)
            }
            Err(e) => Err(e),
        }
    }

    /// Presence change. Coming online is announced; going offline costs a
    /// status penalty. Returns the penalty applied, if any.
    pub fn set_online(&mut self, id: CharacterId, online: bool) -> Result<Option<i64>, GameError> {
        let mut c = self.store.get(id)?;
        if c.online == online {
            return Ok(None);
        }
        c.online = online;
        if online {
            c.last_login = chrono::Utc::now();
            self.store.upsert(&c)?;
            self.announce(format!(
                "{}, the level {} {}, is now online. {} reaches level {} in {}.",
                c.username,
                c.level,
                c.charclass,
                c.he_she(true),
                c.level + 1,
                format_duration(c.next_ttl)
            ));
            return Ok(None);
        }
        self.store.upsert(&c)?;
        self.penalize(id, PenaltyKind::Status).map(Some)
    }

    pub fn set_alignment(&mut self, id: CharacterId, alignment: Alignment) -> Result<(), GameError> {
        let mut c = self.store.get(id)?;
        c.alignment = alignment;
        self.store.upsert(&c)?;
        self.announce(format!("{} is now {}.", c.username, alignment));
        Ok(())
    }
}
