//! Toroidal world map: random-walk movement, items lying on cells, and
//! per-tick collision detection.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rand::Rng;
use std::collections::HashMap;

use crate::engine::combat::DuelKind;
use crate::engine::errors::GameError;
use crate::engine::item::Item;
use crate::engine::types::{Character, CharacterId, ItemSlot};
use crate::engine::world::Engine;
use crate::storage::CharacterStore;

pub type Position = (i32, i32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDrop {
    pub slot: ItemSlot,
    pub item: Item,
    pub dropped_at: DateTime<Utc>,
}

/// An item a character picked up, and what it left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pickup {
    pub slot: ItemSlot,
    pub found: Item,
    pub replaced: Item,
}

/// Map dimensions plus the items lying around, keyed by cell.
///
/// Cells are created on first drop and never removed.
#[derive(Debug, Clone)]
pub struct MapSimulator {
    width: i32,
    height: i32,
    cells: HashMap<Position, Vec<ItemDrop>>,
}

impl MapSimulator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.clamp(1, i32::MAX as u32) as i32,
            height: height.clamp(1, i32::MAX as u32) as i32,
            cells: HashMap::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Fold any coordinate into `[0, width) x [0, height)`.
    pub fn wrap(&self, x: i32, y: i32) -> Position {
        (x.rem_euclid(self.width), y.rem_euclid(self.height))
    }

    /// Move one step in each axis (-1, 0 or +1), wrapping at the edges.
    pub fn step<R: Rng>(&self, character: &mut Character, rng: &mut R) -> Position {
        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        let (x, y) = self.wrap(character.x.wrapping_add(dx), character.y.wrapping_add(dy));
        character.x = x;
        character.y = y;
        (x, y)
    }

    /// Leave an item on a cell. Level-0 items are discarded; returns whether
    /// anything was placed.
    pub fn drop_item(
        &mut self,
        x: i32,
        y: i32,
        slot: ItemSlot,
        item: Item,
        at: DateTime<Utc>,
    ) -> bool {
        if item.level == 0 {
            return false;
        }
        let pos = self.wrap(x, y);
        self.cells.entry(pos).or_default().push(ItemDrop {
            slot,
            item,
            dropped_at: at,
        });
        true
    }

    pub fn items_at(&self, x: i32, y: i32) -> &[ItemDrop] {
        self.cells
            .get(&self.wrap(x, y))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn drop_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// Take every item on the character's cell that beats what it wears in that
    /// slot, leaving the replaced item in its place. Drops are visited in
    /// insertion order, so a later, even better drop can still be taken.
    pub fn pick_up(&mut self, character: &mut Character, at: DateTime<Utc>) -> Vec<Pickup> {
        let pos = self.wrap(character.x, character.y);
        let Some(drops) = self.cells.get_mut(&pos) else {
            return Vec::new();
        };
        let mut pickups = Vec::new();
        let mut i = 0;
        while i < drops.len() {
            let current = character.items.get(drops[i].slot);
            if drops[i].item.level > current.level {
                let taken = drops.remove(i);
                character.items.set(taken.slot, taken.item);
                if current.level > 0 {
                    drops.push(ItemDrop {
                        slot: taken.slot,
                        item: current,
                        dropped_at: at,
                    });
                }
                pickups.push(Pickup {
                    slot: taken.slot,
                    found: taken.item,
                    replaced: current,
                });
            } else {
                i += 1;
            }
        }
        pickups
    }
}

#[derive(Debug, Clone, Copy)]
struct Occupant {
    id: CharacterId,
    battled: bool,
}

/// Who stands where during a single tick.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    cells: HashMap<Position, Occupant>,
}

impl CollisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` arriving at `pos`. Returns the resident character the first
    /// time someone lands on an occupied cell; later arrivals on the same cell
    /// this tick pass through without a fight.
    pub fn arrive(&mut self, pos: Position, id: CharacterId) -> Option<CharacterId> {
        match self.cells.get_mut(&pos) {
            None => {
                self.cells.insert(
                    pos,
                    Occupant {
                        id,
                        battled: false,
                    },
                );
                None
            }
            Some(occupant) if occupant.battled || occupant.id == id => None,
            Some(occupant) => {
                occupant.battled = true;
                Some(occupant.id)
            }
        }
    }
}

impl<S: CharacterStore> Engine<S> {
    /// Move every online character one step, let it pick up items, and fight
    /// whoever already stands on the new cell.
    pub(crate) fn move_players(&mut self, online: &[CharacterId]) -> usize {
        let mut tracker = CollisionTracker::new();
        let mut duels = 0;
        for id in online {
            let pos = match self.move_one(*id) {
                Ok(pos) => pos,
                Err(e) => {
                    warn!("movement for character {} abandoned: {}", id, e);
                    continue;
                }
            };
            let Some(occupant) = tracker.arrive(pos, *id) else {
                continue;
            };
            debug!("{} walked into {} at {:?}", id, occupant, pos);
            match self.resolve_duel(*id, occupant, DuelKind::Collision) {
                Ok(_) => duels += 1,
                Err(e) => warn!("collision fight {} vs {} abandoned: {}", id, occupant, e),
            }
        }
        duels
    }

    fn move_one(&mut self, id: CharacterId) -> Result<Position, GameError> {
        let mut character = self.store.get(id)?;
        let pos = self.map.step(&mut character, &mut self.rng);
        let pickups = self.map.pick_up(&mut character, Utc::now());
        self.store.upsert(&character)?;
        for p in pickups {
            self.announce(format!(
                "{} found a level {} {} on the ground! {} old level {} {} is left behind.",
                character.username,
                p.found.level,
                p.slot,
                character.his_her(true),
                p.replaced.level,
                p.slot
            ));
        }
        Ok(pos)
    }
}
