//! Time penalties for not idling: talking in the game channel, going offline,
//! or changing activity.

use log::debug;

use crate::config::GameConfig;
use crate::engine::duration::format_duration;
use crate::engine::errors::GameError;
use crate::engine::progression::GEOMETRIC_LEVEL_CAP;
use crate::engine::types::{Character, CharacterId};
use crate::engine::world::Engine;
use crate::storage::CharacterStore;

const PRESENCE_PENALTY_FACTOR: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyKind {
    /// A chat message of `length` characters.
    Message { length: usize },
    /// Presence went from online to offline.
    Status,
    /// Activity/game status changed.
    Activity,
}

impl PenaltyKind {
    fn reason(&self) -> &'static str {
        match self {
            PenaltyKind::Message { .. } => "a message",
            PenaltyKind::Status => "going offline",
            PenaltyKind::Activity => "activity change",
        }
    }
}

/// Penalty magnitude before the presence factor is applied.
pub fn penalty_base(config: &GameConfig, level: u32) -> f64 {
    if level <= GEOMETRIC_LEVEL_CAP {
        config.rpbase * config.rppenstep.powi(level as i32)
    } else {
        config.rpbase * config.rppenstep.powi(GEOMETRIC_LEVEL_CAP as i32)
            + 86400.0 * (level - GEOMETRIC_LEVEL_CAP) as f64
    }
}

/// Seconds of penalty for `kind` at `level`, always within `[0, limitpen]`.
pub fn penalty_seconds(config: &GameConfig, level: u32, kind: PenaltyKind) -> i64 {
    let raw = match kind {
        PenaltyKind::Message { length } => length as f64 * config.rppenstep.powi(level as i32),
        PenaltyKind::Status | PenaltyKind::Activity => {
            PRESENCE_PENALTY_FACTOR * penalty_base(config, level) / config.rpbase
        }
    };
    // float -> int casts saturate, so an astronomically large raw value still clamps cleanly
    (raw as i64).clamp(0, config.limitpen.max(0))
}

/// Apply a penalty to the record and its matching accumulator.
pub fn apply_penalty(config: &GameConfig, character: &mut Character, kind: PenaltyKind) -> i64 {
    let pen = penalty_seconds(config, character.level, kind);
    match kind {
        PenaltyKind::Message { .. } => character.penalties.message += pen,
        PenaltyKind::Status => character.penalties.status += pen,
        PenaltyKind::Activity => character.penalties.activity += pen,
    }
    character.next_ttl += pen;
    pen
}

impl<S: CharacterStore> Engine<S> {
    /// Penalize a character and announce it. Returns the seconds added.
    pub fn penalize(&mut self, id: CharacterId, kind: PenaltyKind) -> Result<i64, GameError> {
        let mut character = self.store.get(id)?;
        let pen = apply_penalty(&self.config, &mut character, kind);
        self.store.upsert(&character)?;
        debug!("{} penalized {}s for {}", character.username, pen, kind.reason());
        self.announce(format!(
            "Penalty of {} added to {}'s timer for {}.",
            format_duration(pen),
            character.username,
            kind.reason()
        ));
        Ok(pen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huge_message_clamps_to_limit() {
        let config = GameConfig::default();
        let pen = penalty_seconds(&config, 100, PenaltyKind::Message { length: 100_000 });
        assert_eq!(pen, config.limitpen);
    }

    #[test]
    fn message_penalty_scales_with_length_and_level() {
        let config = GameConfig::default();
        assert_eq!(
            penalty_seconds(&config, 0, PenaltyKind::Message { length: 12 }),
            12
        );
        assert_eq!(
            penalty_seconds(&config, 2, PenaltyKind::Message { length: 10 }),
            25
        );
        assert_eq!(penalty_seconds(&config, 5, PenaltyKind::Message { length: 0 }), 0);
    }

    #[test]
    fn presence_penalty_uses_level_curve() {
        let config = GameConfig::default();
        assert_eq!(penalty_seconds(&config, 0, PenaltyKind::Status), 30);
        assert_eq!(penalty_seconds(&config, 1, PenaltyKind::Activity), 48);
        assert_eq!(
            penalty_seconds(&config, 200, PenaltyKind::Status),
            config.limitpen
        );
    }

    #[test]
    fn accumulators_follow_kind() {
        let config = GameConfig::default();
        let mut c = Character::new(3, "carol", 100);
        let a = apply_penalty(&config, &mut c, PenaltyKind::Message { length: 5 });
        let b = apply_penalty(&config, &mut c, PenaltyKind::Status);
        assert_eq!(c.penalties.message, a);
        assert_eq!(c.penalties.status, b);
        assert_eq!(c.penalties.activity, 0);
        assert_eq!(c.next_ttl, 100 + a + b);
    }
}
