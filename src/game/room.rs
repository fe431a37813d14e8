//! Rooms and their type-specific payloads.

use super::{Direction, GridPos};
use crate::encounter::Hazard;
use crate::generation::{Enemy, RunItem, ShopOffer, Treasure};
use crate::Stat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a room is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomType {
    Start,
    Combat,
    Event,
    Treasure,
    Shop,
    Rest,
    Shrine,
    Boss,
    Empty,
}

impl RoomType {
    /// Rooms that must be fought through before the player may push onward.
    pub fn is_hostile(self) -> bool {
        matches!(self, RoomType::Combat | RoomType::Boss)
    }
}

/// Random events resolved when the player interacts with an event room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Restores a share of health
    HealingFountain,
    /// Pays out pending gold
    ForgottenCache,
    /// Springs for a share of max health as true damage
    HiddenTrap,
    /// Grants pending experience
    WanderingSage,
    /// Adds a random run item
    CursedIdol,
}

impl EventKind {
    pub fn all() -> [EventKind; 5] {
        [
            EventKind::HealingFountain,
            EventKind::ForgottenCache,
            EventKind::HiddenTrap,
            EventKind::WanderingSage,
            EventKind::CursedIdol,
        ]
    }
}

/// A shrine grants one temporary bonus for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blessing {
    Might,
    Fortitude,
    Fortune,
    Precision,
}

impl Blessing {
    pub fn all() -> [Blessing; 4] {
        [
            Blessing::Might,
            Blessing::Fortitude,
            Blessing::Fortune,
            Blessing::Precision,
        ]
    }

    /// The blessing expressed as a stackable run item.
    pub fn as_run_item(self) -> RunItem {
        let (name, stat, value) = match self {
            Blessing::Might => ("Blessing of Might", Stat::Damage, 4),
            Blessing::Fortitude => ("Blessing of Fortitude", Stat::Defense, 3),
            Blessing::Fortune => ("Blessing of Fortune", Stat::GoldFind, 25),
            Blessing::Precision => ("Blessing of Precision", Stat::HitChance, 5),
        };
        RunItem::flat(name, stat, value)
    }
}

/// Type-specific room content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoomPayload {
    Nothing,
    Hostile {
        enemies: Vec<Enemy>,
        hazards: Vec<Hazard>,
    },
    Treasure(Treasure),
    Shop(Vec<ShopOffer>),
    Rest {
        /// Fraction of max health restored
        heal_fraction: f64,
    },
    Shrine(Blessing),
    Event(EventKind),
}

/// One cell of the dungeon grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub pos: GridPos,
    pub room_type: RoomType,
    pub discovered: bool,
    pub visited: bool,
    pub cleared: bool,
    /// Neighbouring rooms by exit direction. Always mirrored on the other side.
    connections: BTreeMap<Direction, GridPos>,
    pub payload: RoomPayload,
}

impl Room {
    /// Creates an unconnected room. START rooms begin cleared.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{GridPos, Room, RoomType};
    ///
    /// let room = Room::new(GridPos::new(1, 1), RoomType::Start);
    /// assert!(room.cleared);
    /// assert!(room.exits().next().is_none());
    /// ```
    pub fn new(pos: GridPos, room_type: RoomType) -> Self {
        Self {
            pos,
            room_type,
            discovered: false,
            visited: false,
            cleared: room_type == RoomType::Start,
            connections: BTreeMap::new(),
            payload: RoomPayload::Nothing,
        }
    }

    pub fn with_payload(mut self, payload: RoomPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Neighbour in `direction`, if a passage exists.
    pub fn neighbour(&self, direction: Direction) -> Option<GridPos> {
        self.connections.get(&direction).copied()
    }

    pub fn exits(&self) -> impl Iterator<Item = (Direction, GridPos)> + '_ {
        self.connections.iter().map(|(d, p)| (*d, *p))
    }

    pub fn exit_count(&self) -> usize {
        self.connections.len()
    }

    /// One half of a mutual connection. Only [`super::DungeonMap::connect`] calls this.
    pub(crate) fn link(&mut self, direction: Direction, other: GridPos) {
        self.connections.insert(direction, other);
    }

    /// Whether leaving this room is gated on clearing it first.
    pub fn blocks_exit(&self) -> bool {
        self.room_type.is_hostile() && !self.cleared
    }

    pub fn enemies(&self) -> &[Enemy] {
        match &self.payload {
            RoomPayload::Hostile { enemies, .. } => enemies,
            _ => &[],
        }
    }

    pub fn hazards(&self) -> &[Hazard] {
        match &self.payload {
            RoomPayload::Hostile { hazards, .. } => hazards,
            _ => &[],
        }
    }

    /// Takes the payload out, leaving [`RoomPayload::Nothing`].
    pub fn take_payload(&mut self) -> RoomPayload {
        std::mem::replace(&mut self.payload, RoomPayload::Nothing)
    }

    /// Marks the room cleared and drops any remaining enemies.
    pub fn mark_cleared(&mut self) {
        self.cleared = true;
        if let RoomPayload::Hostile { enemies, .. } = &mut self.payload {
            enemies.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_defaults() {
        let room = Room::new(GridPos::new(0, 0), RoomType::Combat);
        assert!(!room.cleared);
        assert!(!room.visited);
        assert!(room.blocks_exit());
        assert!(room.enemies().is_empty());
    }

    #[test]
    fn test_take_payload() {
        let mut room = Room::new(GridPos::new(0, 0), RoomType::Rest)
            .with_payload(RoomPayload::Rest { heal_fraction: 0.5 });
        assert_eq!(
            room.take_payload(),
            RoomPayload::Rest { heal_fraction: 0.5 }
        );
        assert_eq!(room.payload, RoomPayload::Nothing);
    }

    #[test]
    fn test_blessing_run_items() {
        let item = Blessing::Might.as_run_item();
        assert_eq!(item.bonuses.flat(Stat::Damage), 4);
    }
}
