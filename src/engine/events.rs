//! World-event dispatch plus the events driven by the gods and by alignment.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::engine::combat::percent_of;
use crate::engine::duration::format_duration;
use crate::engine::economy::{random_slot, swap_if_better};
use crate::engine::errors::GameError;
use crate::engine::progression::next_level_line;
use crate::engine::scheduler::WorldEvent;
use crate::engine::types::{Alignment, CharacterId};
use crate::engine::world::Engine;
use crate::storage::{CharacterQuery, CharacterStore};

impl<S: CharacterStore> Engine<S> {
    /// Run one world event now, whether scheduled or triggered by an operator.
    pub fn dispatch(&mut self, event: WorldEvent) -> Result<(), GameError> {
        debug!("event: {}", event);
        match event {
            WorldEvent::MonsterHunt => self.monster_hunt(),
            WorldEvent::HandOfGod => self.hand_of_god(),
            WorldEvent::GroupBattle => self.group_battle(),
            WorldEvent::TeamBattle => self.team_battle(),
            WorldEvent::Calamity => self.calamity(),
            WorldEvent::Godsend => self.godsend(),
            WorldEvent::CelebrityFight => self.celebrity_fight(),
            WorldEvent::RandomGold => self.random_gold(),
            WorldEvent::MonsterAttack => self.monster_attack(),
            WorldEvent::RandomSteal => self.random_steal(),
            WorldEvent::Evilness => self.evilness(),
            WorldEvent::Goodness => self.goodness(),
        }
    }

    /// Four times in five the gods speed a random online character along by
    /// 4-75% of its clock; otherwise they slow it down by the same measure.
    pub fn hand_of_god(&mut self) -> Result<(), GameError> {
        let Some(id) = self.random_online()? else {
            return Ok(());
        };
        let mut c = self.store.get(id)?;
        let amount = percent_of(self.rng.gen_range(4..=75), c.next_ttl);
        if self.rng.gen_range(1..=5) > 1 {
            c.next_ttl -= amount;
            self.announce(format!(
                "Verily I say unto thee, the Heavens have burst forth, and the blessed hand of God carried {} {} toward level {}. {}",
                c.username,
                format_duration(amount),
                c.level + 1,
                next_level_line(&c)
            ));
        } else {
            c.next_ttl += amount;
            self.announce(format!(
                "Thereupon He stretched out His little finger among them and consumed {} with fire, slowing the heathen {} from level {}. {}",
                c.username,
                format_duration(amount),
                c.level + 1,
                next_level_line(&c)
            ));
        }
        self.store.upsert(&c)
    }

    /// Two online good characters pray together; each loses 5-12% of its clock.
    pub fn goodness(&mut self) -> Result<(), GameError> {
        let good = self
            .store
            .query(&CharacterQuery::online().alignment(Alignment::Good))?;
        if good.len() < 2 {
            return Ok(());
        }
        let pair: Vec<CharacterId> = good.choose_multiple(&mut self.rng, 2).copied().collect();
        let mut first = self.store.get(pair[0])?;
        let mut second = self.store.get(pair[1])?;
        let before = [first.clone(), second.clone()];
        let mark = self.narration_mark();
        let pct = self.rng.gen_range(5..=12);
        first.next_ttl -= percent_of(pct, first.next_ttl);
        second.next_ttl -= percent_of(pct, second.next_ttl);
        self.announce(format!(
            "{} and {} have not let the iniquities of evil poison them. Together they have prayed, and the light now shines upon them. {}% of their time is removed from their clocks.",
            first.username, second.username, pct
        ));
        self.announce(next_level_line(&first));
        self.announce(next_level_line(&second));
        self.commit(&before, &[first, second], mark)
    }

    /// An online evil character either robs an online good one (one time in
    /// two) or is forsaken by its god and loses 1-5% of progress.
    pub fn evilness(&mut self) -> Result<(), GameError> {
        let Some(id) = self.random_matching(&CharacterQuery::online().alignment(Alignment::Evil))?
        else {
            return Ok(());
        };
        let mut villain = self.store.get(id)?;
        if self.rng.gen_bool(0.5) {
            let Some(target) =
                self.random_matching(&CharacterQuery::online().alignment(Alignment::Good))?
            else {
                return Ok(());
            };
            let mut victim = self.store.get(target)?;
            let before = [villain.clone(), victim.clone()];
            let mark = self.narration_mark();
            let slot = random_slot(&mut self.rng);
            if let Some((taken, given)) = swap_if_better(&mut villain, &mut victim, slot) {
                self.announce(format!(
                    "{} stole {}'s level {} {} while {} was praying! {} leaves {} old level {} {} behind.",
                    villain.username,
                    victim.username,
                    taken.level,
                    slot,
                    victim.he_she(false),
                    villain.he_she(true),
                    villain.his_her(false),
                    given.level,
                    slot
                ));
                self.commit(&before, &[villain, victim], mark)?;
            }
            return Ok(());
        }
        let amount = percent_of(self.rng.gen_range(1..=5), villain.next_ttl);
        villain.next_ttl += amount;
        self.announce(format!(
            "{} is forsaken by {} evil god. {} is added to {} clock. {}",
            villain.username,
            villain.his_her(false),
            format_duration(amount),
            villain.his_her(false),
            next_level_line(&villain)
        ));
        self.store.upsert(&villain)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GameConfig;
    use crate::engine::item::Item;
    use crate::engine::types::{Character, ItemSlot};
    use crate::storage::{CharacterStore, MemoryStore};

    use super::*;

    fn online(id: CharacterId, alignment: Alignment, ttl: i64) -> Character {
        let mut c = Character::new(id, &format!("p{}", id), ttl);
        c.online = true;
        c.alignment = alignment;
        c
    }

    fn engine(characters: Vec<Character>, seed: u64) -> Engine<MemoryStore> {
        let config = GameConfig {
            seed: Some(seed),
            ..GameConfig::default()
        };
        Engine::new(config, MemoryStore::with_characters(characters)).expect("engine")
    }

    #[test]
    fn every_event_tolerates_an_empty_world() {
        let mut e = engine(Vec::new(), 1);
        for event in WorldEvent::ALL {
            e.dispatch(event).expect("no-op");
        }
        assert!(e.drain_narration().is_empty());
    }

    #[test]
    fn goodness_speeds_up_both_good_characters() {
        for seed in 0..20 {
            let mut e = engine(
                vec![
                    online(1, Alignment::Good, 10_000),
                    online(2, Alignment::Good, 20_000),
                    online(3, Alignment::Evil, 10_000),
                ],
                seed,
            );
            e.goodness().unwrap();
            let a = e.store().get(1).unwrap().next_ttl;
            let b = e.store().get(2).unwrap().next_ttl;
            assert!((8_800..=9_500).contains(&a), "seed {} ttl {}", seed, a);
            assert!((17_600..=19_000).contains(&b), "seed {} ttl {}", seed, b);
            assert_eq!(e.store().get(3).unwrap().next_ttl, 10_000);
        }
    }

    #[test]
    fn hand_of_god_moves_the_clock_within_bounds() {
        for seed in 0..50 {
            let mut e = engine(vec![online(1, Alignment::Neutral, 10_000)], seed);
            e.hand_of_god().unwrap();
            let ttl = e.store().get(1).unwrap().next_ttl;
            let moved = (ttl - 10_000).abs();
            assert!((400..=7_500).contains(&moved), "seed {} moved {}", seed, moved);
        }
    }

    #[test]
    fn evilness_never_downgrades_the_thief() {
        for seed in 0..50 {
            let mut villain = online(1, Alignment::Evil, 10_000);
            let mut saint = online(2, Alignment::Good, 10_000);
            for slot in ItemSlot::ALL {
                villain.items.set(slot, Item::plain(5));
                saint.items.set(slot, Item::plain(if slot == ItemSlot::Ring { 50 } else { 1 }));
            }
            let mut e = engine(vec![villain, saint], seed);
            e.evilness().unwrap();
            let v = e.store().get(1).unwrap();
            let s = e.store().get(2).unwrap();
            assert_eq!(v.item_sum() + s.item_sum(), 50 + 50 + 9);
            assert!(v.item_sum() >= 50);
            assert!(v.next_ttl >= 10_000 && v.next_ttl <= 10_500);
        }
    }
}
