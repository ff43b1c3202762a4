//! Combat resolution: roll-vs-sum with alignment, hero and potion modifiers,
//! one-on-one duels with critical strikes, and the fights that build on them
//! (monsters, challenges, celebrities, team and group battles, monster hunts).

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::duration::format_duration;
use crate::engine::errors::GameError;
use crate::engine::progression::next_level_line;
use crate::engine::types::{Alignment, Character, CharacterId};
use crate::engine::world::Engine;
use crate::metrics;
use crate::storage::{CharacterQuery, CharacterStore};

/// Which bonuses apply to a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollModifiers {
    pub alignment: bool,
    pub hero: bool,
    pub potions: bool,
}

impl RollModifiers {
    pub const ALL: Self = Self {
        alignment: true,
        hero: true,
        potions: true,
    };
    pub const ALIGNMENT_ONLY: Self = Self {
        alignment: true,
        hero: false,
        potions: false,
    };
    pub const NONE: Self = Self {
        alignment: false,
        hero: false,
        potions: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollSum {
    pub roll: i64,
    pub sum: i64,
    /// `[roll/sum]`
    pub show_sum: String,
    /// Name plus hero/potion annotations.
    pub show_text: String,
    /// True when a potion was consumed, so the character must be written back.
    pub consumed_potion: bool,
}

impl RollSum {
    /// Rolled at least 85% of the sum.
    fn is_high(&self) -> bool {
        self.sum > 0 && self.roll * 100 >= self.sum * 85
    }

    /// Rolled at most 15% of the sum.
    fn is_low(&self) -> bool {
        self.sum > 0 && self.roll * 100 <= self.sum * 15
    }
}

/// Item sum, optionally scaled for alignment (evil ×0.9, good ×1.1, truncated).
pub fn aligned_sum(character: &Character, use_alignment: bool) -> i64 {
    let sum = character.item_sum();
    if !use_alignment {
        return sum;
    }
    match character.alignment {
        Alignment::Evil => sum * 9 / 10,
        Alignment::Good => sum * 11 / 10,
        Alignment::Neutral => sum,
    }
}

/// Roll against a character's sum. Potion use mutates the character's stock.
///
/// Invariant: `0 <= roll <= sum` once every modifier has been applied.
pub fn roll_sum<R: Rng>(character: &mut Character, mods: RollModifiers, rng: &mut R) -> RollSum {
    let mut sum = aligned_sum(character, mods.alignment);
    let mut roll = if sum > 0 { rng.gen_range(1..=sum) } else { 0 };
    let mut show_text = character.username.clone();
    let mut consumed_potion = false;

    if mods.hero && character.hero {
        let factor = character.hero_level as i64 + 102;
        show_text.push_str(&format!(
            ", with {} level {} Hero",
            character.his_her(false),
            character.hero_level
        ));
        sum = sum * factor / 100;
        roll = roll * factor / 100;
    }
    if mods.potions {
        let p = &mut character.potions;
        if p.power > 0 && p.power_load != 0 {
            show_text.push_str(" plus a power-potion");
            sum = sum * 110 / 100;
            roll = roll * 110 / 100;
            p.power -= 1;
            if p.power_load > 0 {
                p.power_load -= 1;
            }
            consumed_potion = true;
        }
        if p.luck > 0 && p.luck_load != 0 {
            show_text.push_str(" plus a luck-potion");
            let luck = sum * rng.gen_range(5..=10) / 100;
            roll = (roll + luck).min(sum);
            p.luck -= 1;
            if p.luck_load > 0 {
                p.luck_load -= 1;
            }
            consumed_potion = true;
        }
    }
    RollSum {
        roll,
        sum,
        show_sum: format!("[{}/{}]", roll, sum),
        show_text,
        consumed_potion,
    }
}

/// A winner that rolled high against a loser that rolled low earns a
/// critical-strike attempt.
pub fn is_decisive(winner: &RollSum, loser: &RollSum) -> bool {
    winner.is_high() && loser.is_low()
}

/// One-in-N odds of a critical strike for the attacker's alignment.
pub fn critical_strike_odds(alignment: Alignment) -> u32 {
    match alignment {
        Alignment::Evil => 20,
        Alignment::Neutral => 35,
        Alignment::Good => 50,
    }
}

pub fn critical_strike_lands<R: Rng>(alignment: Alignment, rng: &mut R) -> bool {
    rng.gen_range(1..=critical_strike_odds(alignment)) == 1
}

/// `pct` percent of `seconds`, never negative.
pub fn percent_of(pct: i64, seconds: i64) -> i64 {
    (seconds * pct / 100).max(0)
}

/// Duel flavors between two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelKind {
    /// Two characters met on the same map cell.
    Collision,
    /// A deliberate challenge (on level-up or the hourly draw).
    Challenge,
}

impl DuelKind {
    pub fn modifiers(&self) -> RollModifiers {
        match self {
            DuelKind::Collision => RollModifiers::ALIGNMENT_ONLY,
            DuelKind::Challenge => RollModifiers::ALL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelOutcome {
    pub winner: CharacterId,
    pub loser: CharacterId,
    pub gain: i64,
    pub critical_strike: bool,
    pub item_taken: bool,
}

/// Celebrities and their strength (0-15).
pub const CELEBRITIES: &[(&str, u32)] = &[
    ("Humpty Dumpty", 0),
    ("Tweedledee", 0),
    ("Tweedledum", 0),
    ("Cheshire Cat", 1),
    ("Oompa Loompa", 1),
    ("Bilbo Baggins", 2),
    ("Hermione Granger", 2),
    ("Princess Buttercup", 2),
    ("Frodo Baggins", 3),
    ("Samwise Gamgee", 3),
    ("Gollum", 4),
    ("Circe", 4),
    ("Robin Hood", 5),
    ("Harry Potter", 5),
    ("Shrek", 6),
    ("Princess Fiona", 6),
    ("Conan", 7),
    ("Harry Dresden", 7),
    ("Captain Jack Sparrow", 7),
    ("Medusa", 8),
    ("King Arthur", 8),
    ("Joan of Arc", 8),
    ("Merlin", 9),
    ("Richard Rahl", 9),
    ("Van Helsing", 9),
    ("Saruman", 10),
    ("Belgarath", 10),
    ("Dread Pirate Roberts", 10),
    ("Severus Snape", 11),
    ("Zeddicus Zu'l Zorander", 11),
    ("Albus Dumbledore", 12),
    ("Lord Voldemort", 13),
    ("Gandalf the Grey", 15),
    ("Elminster", 15),
];

impl<S: CharacterStore> Engine<S> {
    /// Resolve a duel between two characters and write both back.
    ///
    /// The attacker wins ties. Time moved is a percentage of the attacker's clock:
    /// `max(defenderLevel/4, 7)%` on a win, `max(defenderLevel/7, 7)%` on a loss.
    /// A decisive win earns one critical-strike attempt; if it misses, an item-drop
    /// attempt follows instead.
    pub fn resolve_duel(
        &mut self,
        attacker_id: CharacterId,
        defender_id: CharacterId,
        kind: DuelKind,
    ) -> Result<DuelOutcome, GameError> {
        let mut attacker = self.store.get(attacker_id)?;
        let mut defender = self.store.get(defender_id)?;
        let before = [attacker.clone(), defender.clone()];
        let mark = self.narration_mark();
        let mods = kind.modifiers();
        let a = roll_sum(&mut attacker, mods, &mut self.rng);
        let d = roll_sum(&mut defender, mods, &mut self.rng);
        let attacker_won = a.roll >= d.roll;
        let pct = if attacker_won {
            (defender.level as i64 / 4).max(7)
        } else {
            (defender.level as i64 / 7).max(7)
        };
        let gain = percent_of(pct, attacker.next_ttl);

        let opening = match kind {
            DuelKind::Collision => format!(
                "{} {} has come upon {} {}",
                a.show_text, a.show_sum, defender.username, d.show_sum
            ),
            DuelKind::Challenge => format!(
                "{} {} has challenged {} {} in combat",
                a.show_text, a.show_sum, defender.username, d.show_sum
            ),
        };
        let verdict = self.duel_verdict(kind, attacker_won, &a, &d, &attacker, &defender);

        let (winner, loser, win_roll, lose_roll) = if attacker_won {
            (&mut attacker, &mut defender, &a, &d)
        } else {
            (&mut defender, &mut attacker, &d, &a)
        };
        winner.fight_won(gain);
        loser.fight_lost(gain);
        let direction = if attacker_won { "removed from" } else { "added to" };
        let attacker_after = if attacker_won { &*winner } else { &*loser };
        let clock_line = format!(
            "{} is {} {}'s clock. {}",
            format_duration(gain),
            direction,
            attacker_after.username,
            next_level_line(attacker_after)
        );
        self.announce(format!("{} {}\n{}", opening, verdict, clock_line));

        let mut critical_strike = false;
        let mut item_taken = false;
        if is_decisive(win_roll, lose_roll) {
            critical_strike = self.try_critical_strike(winner, loser);
            if !critical_strike {
                item_taken = self.try_item_drop(winner, loser);
            }
        }
        let outcome = DuelOutcome {
            winner: winner.id,
            loser: loser.id,
            gain,
            critical_strike,
            item_taken,
        };
        self.commit(&before, &[attacker, defender], mark)?;
        metrics::record_duel();
        debug!(
            "duel {:?}: {} beat {} for {}s",
            kind, outcome.winner, outcome.loser, gain
        );
        Ok(outcome)
    }

    fn duel_verdict(
        &mut self,
        kind: DuelKind,
        attacker_won: bool,
        a: &RollSum,
        d: &RollSum,
        attacker: &Character,
        defender: &Character,
    ) -> String {
        if kind == DuelKind::Challenge {
            return if attacker_won { "and won!" } else { "and lost!" }.to_string();
        }
        let big_fight = a.sum > 299 && d.sum > 299;
        if attacker_won {
            if a.roll < 51 && big_fight {
                "and won!".to_string()
            } else if d.roll + 300 < a.roll && d.sum > 299 {
                format!("and straight stomped them in combat! {} cries!", defender.username)
            } else {
                ["and wins!", "and rocked it!", "and gave 'em what was coming!"]
                    [self.rng.gen_range(0..3)]
                .to_string()
            }
        } else if d.roll < 51 && big_fight {
            "and loses!".to_string()
        } else if a.roll + 300 < d.roll && a.sum > 299 {
            format!(
                "and brought bronze weapons to an iron fight! {} cries.",
                attacker.username
            )
        } else {
            [
                "and got flexed on in combat!",
                "and realized it was a bad decision!",
                "and didn't wake up till the next morning!",
            ][self.rng.gen_range(0..3)]
            .to_string()
        }
    }

    /// One critical-strike attempt by `attacker` on `defender`: on success the
    /// defender's clock grows by 5-25%.
    pub(crate) fn try_critical_strike(
        &mut self,
        attacker: &Character,
        defender: &mut Character,
    ) -> bool {
        if !critical_strike_lands(attacker.alignment, &mut self.rng) {
            return false;
        }
        let gain = percent_of(self.rng.gen_range(5..=25), defender.next_ttl);
        defender.next_ttl += gain;
        defender.fights.time_lost += gain;
        metrics::record_critical_strike();
        self.announce(format!(
            "{} has dealt {} a Critical Strike! {} is added to {}'s clock. {}",
            attacker.username,
            defender.username,
            format_duration(gain),
            defender.username,
            next_level_line(defender)
        ));
        true
    }

    /// A random online character is set upon by a monster.
    pub fn monster_attack(&mut self) -> Result<(), GameError> {
        let Some(id) = self.random_online()? else {
            return Ok(());
        };
        self.monster_attack_player(id)
    }

    /// Fight a monster scaled to the character's own sum. Usually 85-115% strength
    /// (gain 12%, lose 9%); one time in five an easy 30-50% monster (gain 7%,
    /// lose 10%), otherwise one in five a hard 150-170% one (gain 22%, lose 5%).
    pub fn monster_attack_player(&mut self, id: CharacterId) -> Result<(), GameError> {
        let mut character = self.store.get(id)?;
        let mine = roll_sum(&mut character, RollModifiers::ALL, &mut self.rng);
        let (mut gain, mut loss) = (12, 9);
        let mut monster_sum = (self.rng.gen_range(0..=30) + 85) * mine.sum / 100;
        if self.rng.gen_range(1..=5) == 1 {
            monster_sum = (self.rng.gen_range(0..=20) + 30) * mine.sum / 100;
            (gain, loss) = (7, 10);
        } else if self.rng.gen_range(1..=5) == 1 {
            monster_sum = (self.rng.gen_range(0..=20) + 150) * mine.sum / 100;
            (gain, loss) = (22, 5);
        }
        let monster_sum = monster_sum.max(1);
        let monster_roll = self.rng.gen_range(0..=monster_sum);
        let monster_name = self.monsters.name_for(monster_sum).to_string();
        let output = format!(
            "{} {} has been set upon by a {} [{}/{}]",
            mine.show_text, mine.show_sum, monster_name, monster_roll, monster_sum
        );
        if mine.roll >= monster_roll {
            let gain = percent_of(gain, character.next_ttl);
            character.fight_won(gain);
            self.announce(format!(
                "{} and won! {} is removed from {}'s clock. {}",
                output,
                format_duration(gain),
                character.username,
                next_level_line(&character)
            ));
        } else {
            let loss = percent_of(loss, character.next_ttl);
            character.fight_lost(loss);
            self.announce(format!(
                "{} and lost! {} is added to {}'s clock. {}",
                output,
                format_duration(loss),
                character.username,
                next_level_line(&character)
            ));
        }
        self.store.upsert(&character)
    }

    /// Challenge an online character of similar strength: at most ten levels
    /// higher and an item sum within 15% either way.
    pub fn random_challenge(&mut self, id: CharacterId) -> Result<Option<DuelOutcome>, GameError> {
        let challenger = self.store.get(id)?;
        let sum = challenger.item_sum();
        let filter = CharacterQuery::online()
            .level_at_most(challenger.level + 10)
            .item_sum_between(sum * 85 / 100, sum * 115 / 100)
            .excluding_name(&challenger.username);
        let opponents: Vec<CharacterId> = self
            .store
            .query(&filter)?
            .into_iter()
            .filter(|other| *other != id)
            .collect();
        let Some(&opponent) = opponents.choose(&mut self.rng) else {
            self.announce(format!(
                "{} issued a challenge, but nobody felt like being defeated.",
                challenger.username
            ));
            return Ok(None);
        };
        self.resolve_duel(id, opponent, DuelKind::Challenge).map(Some)
    }

    /// A random online character fights a legendary celebrity.
    pub fn celebrity_fight(&mut self) -> Result<(), GameError> {
        let Some(id) = self.random_online()? else {
            return Ok(());
        };
        let mut character = self.store.get(id)?;
        let (celebrity, strength) = CELEBRITIES[self.rng.gen_range(0..CELEBRITIES.len())];
        let opp_sum = 150 * (strength as i64 + 1);
        let mine = roll_sum(&mut character, RollModifiers::ALIGNMENT_ONLY, &mut self.rng);
        let opp_roll = self.rng.gen_range(1..=opp_sum);
        let output = format!(
            "{} {} fights with the legendary {} [{}/{}] and",
            mine.show_text, mine.show_sum, celebrity, opp_roll, opp_sum
        );
        let gain = opp_sum * character.level as i64 / 10;
        if mine.roll >= opp_roll {
            character.fight_won(gain);
            character.add_gold(10);
            self.announce(format!(
                "{} wins! {} removed from {}'s time and 10 gold added. {}",
                output,
                format_duration(gain),
                character.username,
                next_level_line(&character)
            ));
        } else {
            character.fight_lost(gain);
            self.announce(format!(
                "{} lost! {} added to {}'s time. {}",
                output,
                format_duration(gain),
                character.username,
                next_level_line(&character)
            ));
        }
        self.store.upsert(&character)
    }

    /// Three against three. The winning team is accelerated by 20% of the
    /// smallest clock among them; the losers are delayed by the same amount.
    pub fn team_battle(&mut self) -> Result<(), GameError> {
        let online = self.store.query(&CharacterQuery::online())?;
        if online.len() < 6 {
            debug!("team battle skipped: only {} online", online.len());
            return Ok(());
        }
        let picked: Vec<CharacterId> = online.choose_multiple(&mut self.rng, 6).copied().collect();
        let mut team_a = self.load_all_of(&picked[..3])?;
        let mut team_b = self.load_all_of(&picked[3..])?;
        let before: Vec<Character> = team_a.iter().chain(team_b.iter()).cloned().collect();
        let mark = self.narration_mark();
        let (roll_a, sum_a) = self.pooled_roll(&mut team_a, RollModifiers::ALIGNMENT_ONLY);
        let (roll_b, sum_b) = self.pooled_roll(&mut team_b, RollModifiers::ALIGNMENT_ONLY);
        let a_won = roll_a >= roll_b;
        let (winners, losers) = if a_won {
            (&mut team_a, &mut team_b)
        } else {
            (&mut team_b, &mut team_a)
        };
        let fastest = winners.iter().map(|c| c.next_ttl).min().unwrap_or(0);
        let gain = percent_of(20, fastest);
        for c in winners.iter_mut() {
            c.fight_won(gain);
        }
        for c in losers.iter_mut() {
            c.fight_lost(gain);
        }
        self.announce(format!(
            "{} [{}/{}] have team battled {} [{}/{}] and {}! {} is {} their clocks.",
            names(&team_a),
            roll_a,
            sum_a,
            names(&team_b),
            roll_b,
            sum_b,
            if a_won { "won" } else { "lost" },
            format_duration(gain),
            if a_won { "removed from" } else { "added to" },
        ));
        team_a.append(&mut team_b);
        self.commit(&before, &team_a, mark)
    }

    /// A champion takes on up to three others at once.
    pub fn group_battle(&mut self) -> Result<(), GameError> {
        let online = self.store.query(&CharacterQuery::online())?;
        if online.len() < 2 {
            return Ok(());
        }
        let picked: Vec<CharacterId> = online
            .choose_multiple(&mut self.rng, online.len().min(4))
            .copied()
            .collect();
        let mut champion = self.store.get(picked[0])?;
        let mut group = self.load_all_of(&picked[1..])?;
        let before: Vec<Character> = std::iter::once(&champion).chain(group.iter()).cloned().collect();
        let mark = self.narration_mark();
        let mine = roll_sum(&mut champion, RollModifiers::ALL, &mut self.rng);
        let (group_roll, group_sum) = self.pooled_roll(&mut group, RollModifiers::ALIGNMENT_ONLY);
        let opening = format!(
            "{} {} stood alone against {} [{}/{}]",
            mine.show_text,
            mine.show_sum,
            names(&group),
            group_roll,
            group_sum
        );
        if mine.roll >= group_roll {
            let gain = percent_of(15, champion.next_ttl);
            champion.fight_won(gain);
            for c in group.iter_mut() {
                let loss = percent_of(10, c.next_ttl);
                c.fight_lost(loss);
            }
            self.announce(format!(
                "{} and prevailed! {} is removed from {}'s clock; the group is slowed by 10%.",
                opening,
                format_duration(gain),
                champion.username
            ));
        } else {
            let fastest = group.iter().map(|c| c.next_ttl).min().unwrap_or(0);
            let gain = percent_of(15, fastest);
            for c in group.iter_mut() {
                c.fight_won(gain);
            }
            let loss = percent_of(10, champion.next_ttl);
            champion.fight_lost(loss);
            self.announce(format!(
                "{} and was overwhelmed! {} is added to {}'s clock; the group gains {}.",
                opening,
                format_duration(loss),
                champion.username,
                format_duration(gain)
            ));
        }
        group.insert(0, champion);
        self.commit(&before, &group, mark)
    }

    /// Up to three hunters pool their strength against one monster.
    pub fn monster_hunt(&mut self) -> Result<(), GameError> {
        let online = self.store.query(&CharacterQuery::online())?;
        if online.is_empty() {
            return Ok(());
        }
        let picked: Vec<CharacterId> = online
            .choose_multiple(&mut self.rng, online.len().min(3))
            .copied()
            .collect();
        let mut hunters = self.load_all_of(&picked)?;
        let before = hunters.clone();
        let mark = self.narration_mark();
        let (roll, sum) = self.pooled_roll(&mut hunters, RollModifiers::ALL);
        let monster_sum = ((self.rng.gen_range(0..=30) + 85) * sum / 100).max(1);
        let monster_roll = self.rng.gen_range(0..=monster_sum);
        let monster = self.monsters.name_for(monster_sum).to_string();
        let opening = format!(
            "{} [{}/{}] went hunting a {} [{}/{}]",
            names(&hunters),
            roll,
            sum,
            monster,
            monster_roll,
            monster_sum
        );
        if roll >= monster_roll {
            for c in hunters.iter_mut() {
                let gain = percent_of(10, c.next_ttl);
                c.fight_won(gain);
            }
            self.announce(format!(
                "{} and slew it! 10% of their time is removed from their clocks.",
                opening
            ));
        } else {
            for c in hunters.iter_mut() {
                let loss = percent_of(5, c.next_ttl);
                c.fight_lost(loss);
            }
            self.announce(format!(
                "{} and fled in terror! 5% is added to their clocks.",
                opening
            ));
        }
        self.commit(&before, &hunters, mark)
    }

    fn pooled_roll(&mut self, members: &mut [Character], mods: RollModifiers) -> (i64, i64) {
        members.iter_mut().fold((0, 0), |(roll, sum), c| {
            let r = roll_sum(c, mods, &mut self.rng);
            (roll + r.roll, sum + r.sum)
        })
    }

    pub(crate) fn load_all_of(&self, ids: &[CharacterId]) -> Result<Vec<Character>, GameError> {
        ids.iter().map(|id| self.store.get(*id)).collect()
    }
}

fn names(characters: &[Character]) -> String {
    let names: Vec<&str> = characters.iter().map(|c| c.username.as_str()).collect();
    match names.len() {
        0 => String::new(),
        1 => names[0].to_string(),
        n => format!("{} and {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::item::Item;
    use crate::engine::types::ItemSlot;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn armed(sum_per_slot: u32) -> Character {
        let mut c = Character::new(1, "alice", 10_000);
        for slot in ItemSlot::ALL {
            c.items.set(slot, Item::plain(sum_per_slot));
        }
        c
    }

    #[test]
    fn zero_sum_rolls_zero() {
        let mut c = Character::new(1, "nobody", 600);
        let mut rng = StdRng::seed_from_u64(3);
        let r = roll_sum(&mut c, RollModifiers::ALL, &mut rng);
        assert_eq!((r.roll, r.sum), (0, 0));
        assert_eq!(r.show_sum, "[0/0]");
    }

    #[test]
    fn alignment_scales_sum() {
        let mut c = armed(10);
        assert_eq!(aligned_sum(&c, true), 100);
        c.alignment = Alignment::Good;
        assert_eq!(aligned_sum(&c, true), 110);
        c.alignment = Alignment::Evil;
        assert_eq!(aligned_sum(&c, true), 90);
        assert_eq!(aligned_sum(&c, false), 100);
    }

    #[test]
    fn roll_never_exceeds_sum_with_every_modifier() {
        let mut rng = StdRng::seed_from_u64(99);
        for trial in 0..5_000u32 {
            let mut c = armed(trial % 37);
            c.alignment = [Alignment::Good, Alignment::Neutral, Alignment::Evil][trial as usize % 3];
            c.hero = trial % 2 == 0;
            c.hero_level = trial % 9;
            c.potions.power = trial % 2;
            c.potions.luck = (trial / 2) % 2;
            let r = roll_sum(&mut c, RollModifiers::ALL, &mut rng);
            assert!(r.roll >= 0, "negative roll {:?}", r);
            assert!(r.roll <= r.sum, "roll above sum {:?}", r);
        }
    }

    #[test]
    fn hero_and_power_potion_scale_sum() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = armed(10);
        c.hero = true;
        c.hero_level = 3;
        c.potions.power = 2;
        c.potions.power_load = 1;
        let r = roll_sum(&mut c, RollModifiers::ALL, &mut rng);
        // 100 * 105% = 105, then * 110% = 115
        assert_eq!(r.sum, 115);
        assert!(r.show_text.contains("Hero"));
        assert!(r.show_text.contains("power-potion"));
        assert!(r.consumed_potion);
        assert_eq!(c.potions.power, 1);
        assert_eq!(c.potions.power_load, 0);

        // load exhausted: potion no longer usable
        let r = roll_sum(&mut c, RollModifiers::ALL, &mut rng);
        assert_eq!(r.sum, 105);
        assert!(!r.consumed_potion);
        assert_eq!(c.potions.power, 1);
    }

    #[test]
    fn luck_potion_only_moves_roll() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut c = armed(10);
        c.potions.luck = 1;
        let r = roll_sum(&mut c, RollModifiers::ALL, &mut rng);
        assert_eq!(r.sum, 100);
        assert!(r.roll <= 100);
        assert_eq!(c.potions.luck, 0);
        assert_eq!(c.potions.luck_load, -1);
    }

    #[test]
    fn potions_untouched_without_potion_modifier() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut c = armed(10);
        c.potions.luck = 1;
        c.potions.power = 1;
        roll_sum(&mut c, RollModifiers::ALIGNMENT_ONLY, &mut rng);
        assert_eq!((c.potions.power, c.potions.luck), (1, 1));
    }

    #[test]
    fn decisive_needs_high_and_low() {
        let r = |roll, sum| RollSum {
            roll,
            sum,
            show_sum: String::new(),
            show_text: String::new(),
            consumed_potion: false,
        };
        assert!(is_decisive(&r(85, 100), &r(15, 100)));
        assert!(!is_decisive(&r(84, 100), &r(15, 100)));
        assert!(!is_decisive(&r(90, 100), &r(16, 100)));
        assert!(!is_decisive(&r(0, 0), &r(0, 100)));
    }

    #[test]
    fn critical_strike_rate_matches_neutral_odds() {
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 100_000;
        let hits = (0..trials)
            .filter(|_| critical_strike_lands(Alignment::Neutral, &mut rng))
            .count();
        let rate = hits as f64 / trials as f64;
        let expected = 1.0 / 35.0;
        // ~6 standard deviations of a binomial with p = 1/35
        assert!((rate - expected).abs() < 0.003, "rate {} vs {}", rate, expected);
    }

    fn duelists() -> (Character, Character) {
        let mut attacker = armed(50);
        attacker.level = 60;
        attacker.alignment = Alignment::Evil;
        attacker.next_ttl = 100_000;
        let mut defender = armed(60);
        defender.id = 2;
        defender.username = "bob".into();
        defender.level = 20;
        defender.alignment = Alignment::Good;
        defender.next_ttl = 100_000;
        (attacker, defender)
    }

    #[test]
    fn decisive_duels_strike_or_take_an_item_but_never_both() {
        use crate::config::GameConfig;
        use crate::storage::MemoryStore;

        let (attacker, defender) = duelists();
        let config = GameConfig {
            seed: Some(77),
            ..GameConfig::default()
        };
        let mut engine = Engine::new(config, MemoryStore::new()).unwrap();
        let (mut strikes, mut drops) = (0, 0);
        for _ in 0..20_000 {
            engine.store.upsert(&attacker).unwrap();
            engine.store.upsert(&defender).unwrap();
            let outcome = engine.resolve_duel(1, 2, DuelKind::Collision).unwrap();
            engine.drain_narration();
            assert!(!(outcome.critical_strike && outcome.item_taken), "{:?}", outcome);

            let winner = engine.store.get(outcome.winner).unwrap();
            let loser = engine.store.get(outcome.loser).unwrap();
            let after_fight = 100_000 + outcome.gain;
            if outcome.critical_strike {
                strikes += 1;
                let extra = loser.next_ttl - after_fight;
                assert!(extra >= after_fight * 5 / 100, "extra {}", extra);
                assert!(extra <= after_fight * 25 / 100, "extra {}", extra);
                assert_eq!(loser.fights.time_lost, outcome.gain + extra);
            } else {
                assert_eq!(loser.next_ttl, after_fight);
            }
            if outcome.item_taken {
                drops += 1;
                // only the attacker's gear is worse, so only it can gain
                assert_eq!(winner.id, 1);
                let changed: Vec<ItemSlot> = ItemSlot::ALL
                    .into_iter()
                    .filter(|slot| winner.items.get(*slot) != attacker.items.get(*slot))
                    .collect();
                assert_eq!(changed.len(), 1);
                assert_eq!(winner.items.get(changed[0]).level, 60);
                assert_eq!(loser.items.get(changed[0]).level, 50);
            } else {
                assert_eq!(engine.store.get(1).unwrap().items, attacker.items);
                assert_eq!(engine.store.get(2).unwrap().items, defender.items);
            }
        }
        assert!(strikes > 0, "no critical strike in 20000 duels");
        assert!(drops > 0, "no item drop in 20000 duels");
    }

    #[test]
    fn critical_strike_adds_five_to_twenty_five_percent() {
        use crate::config::GameConfig;
        use crate::storage::MemoryStore;

        let (attacker, defender) = duelists();
        let config = GameConfig {
            seed: Some(78),
            ..GameConfig::default()
        };
        let mut engine = Engine::new(config, MemoryStore::new()).unwrap();
        let mut landed = 0;
        for _ in 0..2_000 {
            let mut target = defender.clone();
            if engine.try_critical_strike(&attacker, &mut target) {
                landed += 1;
                let extra = target.next_ttl - 100_000;
                assert!((5_000..=25_000).contains(&extra), "extra {}", extra);
                assert_eq!(target.fights.time_lost, extra);
            } else {
                assert_eq!(target, defender);
            }
        }
        // evil attackers land one in twenty
        assert!((50..=160).contains(&landed), "landed {}", landed);
    }

    #[test]
    fn percent_of_is_floored_at_zero() {
        assert_eq!(percent_of(10, 1000), 100);
        assert_eq!(percent_of(10, -1000), 0);
    }

    #[test]
    fn names_are_joined_naturally() {
        let a = Character::new(1, "a", 1);
        let b = Character::new(2, "b", 1);
        let c = Character::new(3, "c", 1);
        assert_eq!(names(&[a.clone()]), "a");
        assert_eq!(names(&[a, b, c]), "a, b and c");
    }
}
