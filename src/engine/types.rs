//! Character record and the small value types hanging off it.
//!
//! Records are explicit: every field is declared, deserialization rejects unknown
//! fields and requires all known ones, so a store row either maps onto a
//! [`Character`] completely or fails to load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::item::Item;

pub type CharacterId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Good,
    #[default]
    Neutral,
    Evil,
}

impl Alignment {
    /// Parse the short chat-command form (`g`, `n`, `e`) as well as the full words.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g" | "good" => Some(Alignment::Good),
            "n" | "neutral" => Some(Alignment::Neutral),
            "e" | "evil" => Some(Alignment::Evil),
            _ => None,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Alignment::Good => "good",
            Alignment::Neutral => "neutral",
            Alignment::Evil => "evil",
        };
        f.write_str(label)
    }
}

/// The ten equipment slots every character always has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSlot {
    Ring,
    Amulet,
    Charm,
    Weapon,
    Helm,
    Tunic,
    Gloves,
    Legs,
    Shield,
    Boots,
}

impl ItemSlot {
    pub const ALL: [ItemSlot; 10] = [
        ItemSlot::Ring,
        ItemSlot::Amulet,
        ItemSlot::Charm,
        ItemSlot::Weapon,
        ItemSlot::Helm,
        ItemSlot::Tunic,
        ItemSlot::Gloves,
        ItemSlot::Legs,
        ItemSlot::Shield,
        ItemSlot::Boots,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ItemSlot::Ring => "ring",
            ItemSlot::Amulet => "amulet",
            ItemSlot::Charm => "charm",
            ItemSlot::Weapon => "weapon",
            ItemSlot::Helm => "helm",
            ItemSlot::Tunic => "tunic",
            ItemSlot::Gloves => "gloves",
            ItemSlot::Legs => "legs",
            ItemSlot::Shield => "shield",
            ItemSlot::Boots => "boots",
        }
    }
}

impl fmt::Display for ItemSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Inventory {
    pub ring: Item,
    pub amulet: Item,
    pub charm: Item,
    pub weapon: Item,
    pub helm: Item,
    pub tunic: Item,
    pub gloves: Item,
    pub legs: Item,
    pub shield: Item,
    pub boots: Item,
}

impl Inventory {
    pub fn get(&self, slot: ItemSlot) -> Item {
        match slot {
            ItemSlot::Ring => self.ring,
            ItemSlot::Amulet => self.amulet,
            ItemSlot::Charm => self.charm,
            ItemSlot::Weapon => self.weapon,
            ItemSlot::Helm => self.helm,
            ItemSlot::Tunic => self.tunic,
            ItemSlot::Gloves => self.gloves,
            ItemSlot::Legs => self.legs,
            ItemSlot::Shield => self.shield,
            ItemSlot::Boots => self.boots,
        }
    }

    /// Put `item` in `slot`, returning whatever was there before.
    pub fn set(&mut self, slot: ItemSlot, item: Item) -> Item {
        let target = match slot {
            ItemSlot::Ring => &mut self.ring,
            ItemSlot::Amulet => &mut self.amulet,
            ItemSlot::Charm => &mut self.charm,
            ItemSlot::Weapon => &mut self.weapon,
            ItemSlot::Helm => &mut self.helm,
            ItemSlot::Tunic => &mut self.tunic,
            ItemSlot::Gloves => &mut self.gloves,
            ItemSlot::Legs => &mut self.legs,
            ItemSlot::Shield => &mut self.shield,
            ItemSlot::Boots => &mut self.boots,
        };
        std::mem::replace(target, item)
    }

    pub fn sum(&self) -> i64 {
        ItemSlot::ALL
            .iter()
            .map(|slot| self.get(*slot).level as i64)
            .sum()
    }
}

/// Power and luck potions. A `*_load` of -1 means the stock never runs out of uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Potions {
    pub power: u32,
    pub power_load: i32,
    pub luck: u32,
    pub luck_load: i32,
}

impl Default for Potions {
    fn default() -> Self {
        Self {
            power: 0,
            power_load: -1,
            luck: 0,
            luck_load: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FightRecord {
    pub won: u32,
    pub lost: u32,
    /// Seconds removed from the clock by winning.
    pub time_gained: i64,
    /// Seconds added to the clock by losing or being struck.
    pub time_lost: i64,
    /// Fights fought at the current level; reset on level-up below level 200.
    pub this_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Penalties {
    pub message: i64,
    pub status: i64,
    pub activity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Character {
    pub id: CharacterId,
    pub username: String,
    pub is_admin: bool,
    pub charclass: String,
    pub sex: String,
    pub level: u32,
    /// Seconds to the next level. Negative only transiently, before the level-up runs.
    pub next_ttl: i64,
    pub idled: i64,
    pub online: bool,
    pub alignment: Alignment,
    pub x: i32,
    pub y: i32,
    pub items: Inventory,
    pub gold: i64,
    pub bank: i64,
    pub potions: Potions,
    pub hero: bool,
    pub hero_level: u32,
    pub engineer: bool,
    pub engineer_level: u32,
    pub fights: FightRecord,
    pub penalties: Penalties,
    pub challenge_time: i64,
    pub slay_time: i64,
    pub bet: i64,
    pub pot: i64,
    pub created: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl Character {
    pub fn new(id: CharacterId, username: &str, next_ttl: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: username.to_string(),
            is_admin: false,
            charclass: "IdleRPG Player".to_string(),
            sex: "not set".to_string(),
            level: 0,
            next_ttl,
            idled: 0,
            online: false,
            alignment: Alignment::Neutral,
            x: 0,
            y: 0,
            items: Inventory::default(),
            gold: 0,
            bank: 0,
            potions: Potions::default(),
            hero: false,
            hero_level: 0,
            engineer: false,
            engineer_level: 0,
            fights: FightRecord::default(),
            penalties: Penalties::default(),
            challenge_time: 0,
            slay_time: 0,
            bet: 0,
            pot: 0,
            created: now,
            last_login: now,
        }
    }

    pub fn item_sum(&self) -> i64 {
        self.items.sum()
    }

    /// Won a fight: `gain` seconds come off the clock.
    pub fn fight_won(&mut self, gain: i64) {
        self.next_ttl -= gain;
        self.fights.time_gained += gain;
        self.fights.won += 1;
        self.fights.this_level += 1;
    }

    /// Lost a fight: `loss` seconds go on the clock.
    pub fn fight_lost(&mut self, loss: i64) {
        self.next_ttl += loss;
        self.fights.time_lost += loss;
        self.fights.lost += 1;
        self.fights.this_level += 1;
    }

    pub fn add_gold(&mut self, amount: i64) -> i64 {
        self.gold += amount;
        self.gold
    }

    pub fn he_she(&self, capitalized: bool) -> &'static str {
        pick(
            capitalized,
            match self.sex.as_str() {
                "male" => ("he", "He"),
                "female" => ("she", "She"),
                _ => ("they", "They"),
            },
        )
    }

    pub fn his_her(&self, capitalized: bool) -> &'static str {
        pick(
            capitalized,
            match self.sex.as_str() {
                "male" => ("his", "His"),
                "female" => ("her", "Her"),
                _ => ("their", "Their"),
            },
        )
    }

    pub fn him_her(&self) -> &'static str {
        match self.sex.as_str() {
            "male" => "him",
            "female" => "her",
            _ => "them",
        }
    }
}

fn pick(capitalized: bool, forms: (&'static str, &'static str)) -> &'static str {
    if capitalized {
        forms.1
    } else {
        forms.0
    }
}
