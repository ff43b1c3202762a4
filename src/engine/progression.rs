//! Level curve, per-tick clock decay and the level-up transition.

use log::{info, warn};

use crate::config::GameConfig;
use crate::engine::duration::format_duration;
use crate::engine::errors::GameError;
use crate::engine::types::{Character, CharacterId};
use crate::engine::world::Engine;
use crate::metrics;
use crate::storage::CharacterStore;

/// Levels above this grow linearly instead of geometrically.
pub const GEOMETRIC_LEVEL_CAP: u32 = 60;
const SECONDS_PER_LEVEL_PAST_CAP: i64 = 86400;
/// Fight counters stop resetting on level-up from this level on.
const FIGHT_RESET_LEVEL: u32 = 200;

/// Seconds needed to climb from `level` to `level + 1`.
pub fn base_time_to_level(config: &GameConfig, level: u32) -> i64 {
    if level <= GEOMETRIC_LEVEL_CAP {
        return (config.rpbase * config.rpstep.powi(level as i32)) as i64;
    }
    let capped = config.rpbase * config.rpstep.powi(GEOMETRIC_LEVEL_CAP as i32);
    (capped + (SECONDS_PER_LEVEL_PAST_CAP * (level - GEOMETRIC_LEVEL_CAP) as i64) as f64) as i64
}

/// Run the clock down by `elapsed` seconds. Returns true when a level-up is due.
pub fn decay(character: &mut Character, elapsed: i64) -> bool {
    character.next_ttl -= elapsed;
    character.idled += elapsed;
    character.next_ttl < 1
}

/// Apply exactly one level-up. A still-negative remainder is not carried over;
/// the new clock starts from the full base time of the new level.
pub fn level_up(config: &GameConfig, character: &mut Character) {
    character.level += 1;
    character.next_ttl = base_time_to_level(config, character.level);
    character.challenge_time = 0;
    character.slay_time = 0;
    if character.level < FIGHT_RESET_LEVEL {
        character.fights.this_level = 0;
    }
    character.bet = 0;
    character.pot = 0;
}

/// "alice reaches level 4 in 0 days, 01:02:03."
pub fn next_level_line(character: &Character) -> String {
    format!(
        "{} reaches level {} in {}.",
        character.username,
        character.level + 1,
        format_duration(character.next_ttl)
    )
}

impl<S: CharacterStore> Engine<S> {
    /// Decay every online character's clock and level up whoever ran out.
    /// At most one level-up per character per call. Returns how many leveled.
    pub(crate) fn progress_characters(&mut self, online: &[CharacterId], elapsed: i64) -> usize {
        let mut level_ups = 0;
        for id in online {
            match self.progress_character(*id, elapsed) {
                Ok(true) => level_ups += 1,
                Ok(false) => {}
                Err(e) => warn!("progression for character {} abandoned: {}", id, e),
            }
        }
        level_ups
    }

    fn progress_character(&mut self, id: CharacterId, elapsed: i64) -> Result<bool, GameError> {
        let mut character = self.store.get(id)?;
        if !decay(&mut character, elapsed) {
            self.store.upsert(&character)?;
            return Ok(false);
        }
        level_up(&self.config, &mut character);
        self.store.upsert(&character)?;
        metrics::record_level_up();
        info!("{} reached level {}", character.username, character.level);
        self.announce(format!(
            "{}, {}, has attained level {}! {} reaches level {} in {}.",
            character.username,
            character.charclass,
            character.level,
            character.he_she(true),
            character.level + 1,
            format_duration(character.next_ttl)
        ));
        self.after_level_up(id);
        Ok(true)
    }

    /// Rewards and risks that come with a new level. Each one stands alone:
    /// a failure in one does not stop the others.
    fn after_level_up(&mut self, id: CharacterId) {
        if let Err(e) = self.find_item(id) {
            warn!("item find for {} abandoned: {}", id, e);
        }
        if let Err(e) = self.find_gold(id) {
            warn!("gold find for {} abandoned: {}", id, e);
        }
        if let Err(e) = self.random_challenge(id) {
            warn!("level-up challenge for {} abandoned: {}", id, e);
        }
        if let Err(e) = self.monster_attack_player(id) {
            warn!("level-up monster for {} abandoned: {}", id, e);
        }
    }
}
