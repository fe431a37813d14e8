//! The navigable room graph of one depth.

use super::room::{Room, RoomType};
use super::{Direction, GridPos};
use crate::utils::{hop_distances, reachable_set, shortest_route};
use crate::{ActionError, DelveError, DelveResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A 2D grid of optional rooms plus the player's current room.
///
/// Connections are stored on the rooms as grid positions and are always mutual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonMap {
    pub depth: u32,
    width: i32,
    height: i32,
    cells: Vec<Option<Room>>,
    start: GridPos,
    current: GridPos,
}

impl DungeonMap {
    /// Creates a map containing only `start_room`, which becomes the current room.
    ///
    /// Call [`Self::enter_start`] after wiring connections so the start room's
    /// neighbours are discovered.
    pub fn new(width: i32, height: i32, depth: u32, start_room: Room) -> DelveResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(DelveError::InvalidState(format!(
                "map size {width}x{height} is empty"
            )));
        }
        let start = start_room.pos;
        let mut map = Self {
            depth,
            width,
            height,
            cells: vec![None; (width * height) as usize],
            start,
            current: start,
        };
        map.place(start_room)?;
        Ok(map)
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
            None
        } else {
            Some((pos.y * self.width + pos.x) as usize)
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        self.index(pos).is_some()
    }

    /// Puts a room into an empty, in-bounds cell.
    pub fn place(&mut self, room: Room) -> DelveResult<()> {
        let pos = room.pos;
        let index = self
            .index(pos)
            .ok_or_else(|| DelveError::InvalidState(format!("room {pos} is out of bounds")))?;
        if self.cells[index].is_some() {
            return Err(DelveError::InvalidState(format!("cell {pos} already holds a room")));
        }
        self.cells[index] = Some(room);
        Ok(())
    }

    pub fn room(&self, pos: GridPos) -> Option<&Room> {
        self.index(pos).and_then(|i| self.cells[i].as_ref())
    }

    pub(crate) fn room_mut(&mut self, pos: GridPos) -> Option<&mut Room> {
        self.index(pos).and_then(|i| self.cells[i].as_mut())
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.room(pos).is_some()
    }

    pub fn start_position(&self) -> GridPos {
        self.start
    }

    pub fn current_position(&self) -> GridPos {
        self.current
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.room(self.current)
    }

    pub(crate) fn current_room_mut(&mut self) -> Option<&mut Room> {
        self.room_mut(self.current)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.cells.iter().flatten()
    }

    pub fn room_count(&self) -> usize {
        self.rooms().count()
    }

    pub fn count_of(&self, room_type: RoomType) -> usize {
        self.rooms().filter(|r| r.room_type == room_type).count()
    }

    pub fn boss_position(&self) -> Option<GridPos> {
        self.rooms()
            .find(|r| r.room_type == RoomType::Boss)
            .map(|r| r.pos)
    }

    /// Connects two grid-adjacent rooms in both directions.
    pub fn connect(&mut self, a: GridPos, direction: Direction, b: GridPos) -> DelveResult<()> {
        if a.step(direction) != b {
            return Err(DelveError::InvalidState(format!(
                "{b} is not {direction:?} of {a}"
            )));
        }
        if !self.is_occupied(a) || !self.is_occupied(b) {
            return Err(DelveError::InvalidState(format!(
                "cannot connect {a} and {b}: missing room"
            )));
        }
        if let Some(room) = self.room_mut(a) {
            room.link(direction, b);
        }
        if let Some(room) = self.room_mut(b) {
            room.link(direction.opposite(), a);
        }
        Ok(())
    }

    /// Positions connected to `pos`.
    pub fn neighbours(&self, pos: GridPos) -> Vec<GridPos> {
        self.room(pos)
            .map(|r| r.exits().map(|(_, p)| p).collect())
            .unwrap_or_default()
    }

    /// Walks through the exit in `direction`.
    ///
    /// Refused when there is no passage, or when the current room is an uncleared
    /// combat room and the destination has not been visited yet (retreating is allowed).
    pub fn move_to(&mut self, direction: Direction) -> Result<GridPos, ActionError> {
        let room = self.current_room().ok_or(ActionError::NoConnection)?;
        let target = room.neighbour(direction).ok_or(ActionError::NoConnection)?;
        let destination_visited = self.room(target).is_some_and(|r| r.visited);
        if room.blocks_exit() && !destination_visited {
            return Err(ActionError::RoomNotCleared);
        }
        self.enter(target);
        debug!("Moved {:?} to {}", direction, target);
        Ok(target)
    }

    /// Puts the player back in START once the layout is wired.
    pub fn enter_start(&mut self) {
        self.enter(self.start);
    }

    /// Makes `pos` current, marking it visited and discovering its neighbours.
    pub(crate) fn enter(&mut self, pos: GridPos) {
        self.current = pos;
        let neighbours = self.neighbours(pos);
        if let Some(room) = self.room_mut(pos) {
            room.visited = true;
            room.discovered = true;
            if !room.room_type.is_hostile() {
                room.cleared = true;
            }
        }
        for next in neighbours {
            if let Some(room) = self.room_mut(next) {
                room.discovered = true;
            }
        }
    }

    /// Every room reachable from START through connections.
    pub fn reachable_from_start(&self) -> HashSet<GridPos> {
        reachable_set(self.start, |pos| self.neighbours(*pos))
    }

    /// No orphan rooms: everything placed is reachable from START.
    pub fn is_fully_connected(&self) -> bool {
        self.reachable_from_start().len() == self.room_count()
    }

    /// Checks that every connection is mirrored by its neighbour.
    pub fn connections_are_mutual(&self) -> bool {
        self.rooms().all(|room| {
            room.exits().all(|(dir, other)| {
                self.room(other)
                    .and_then(|r| r.neighbour(dir.opposite()))
                    .is_some_and(|back| back == room.pos)
            })
        })
    }

    /// Shortest room-to-room route, both ends included.
    pub fn route(&self, from: GridPos, to: GridPos) -> Option<Vec<GridPos>> {
        shortest_route(&from, |pos| self.neighbours(*pos), |pos| *pos == to)
    }

    /// Route from `from` to the nearest room matching `goal`.
    pub fn route_to_nearest(
        &self,
        from: GridPos,
        goal: impl Fn(&Room) -> bool,
    ) -> Option<Vec<GridPos>> {
        shortest_route(
            &from,
            |pos| self.neighbours(*pos),
            |pos| self.room(*pos).is_some_and(&goal),
        )
    }

    /// Hop distance from `from` to every reachable room.
    pub fn distances_from(&self, from: GridPos) -> HashMap<GridPos, usize> {
        hop_distances(&from, |pos| self.neighbours(*pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S - C - B in a row, with a treasure room south of the combat room.
    fn small_map() -> DungeonMap {
        let mut map =
            DungeonMap::new(3, 2, 2, Room::new(GridPos::new(0, 0), RoomType::Start)).unwrap();
        map.place(Room::new(GridPos::new(1, 0), RoomType::Combat)).unwrap();
        map.place(Room::new(GridPos::new(2, 0), RoomType::Boss)).unwrap();
        map.place(Room::new(GridPos::new(1, 1), RoomType::Treasure)).unwrap();
        map.connect(GridPos::new(0, 0), Direction::East, GridPos::new(1, 0))
            .unwrap();
        map.connect(GridPos::new(1, 0), Direction::East, GridPos::new(2, 0))
            .unwrap();
        map.connect(GridPos::new(1, 0), Direction::South, GridPos::new(1, 1))
            .unwrap();
        map.enter_start();
        map
    }

    #[test]
    fn test_connections_are_mutual() {
        let map = small_map();
        assert!(map.connections_are_mutual());
        let west = map.room(GridPos::new(1, 0)).unwrap().neighbour(Direction::West);
        assert_eq!(west, Some(GridPos::new(0, 0)));
    }

    #[test]
    fn test_connect_rejects_non_adjacent() {
        let mut map = small_map();
        assert!(map
            .connect(GridPos::new(0, 0), Direction::East, GridPos::new(2, 0))
            .is_err());
        assert!(map
            .connect(GridPos::new(0, 0), Direction::South, GridPos::new(0, 1))
            .is_err());
    }

    #[test]
    fn test_entering_discovers_neighbours() {
        let mut map = small_map();
        assert!(map.room(GridPos::new(1, 0)).unwrap().discovered);
        assert!(!map.room(GridPos::new(2, 0)).unwrap().discovered);
        map.move_to(Direction::East).unwrap();
        assert!(map.room(GridPos::new(2, 0)).unwrap().discovered);
        assert!(map.current_room().unwrap().visited);
    }

    #[test]
    fn test_uncleared_combat_room_blocks_forward_but_not_retreat() {
        let mut map = small_map();
        map.move_to(Direction::East).unwrap();
        assert_eq!(map.move_to(Direction::East), Err(ActionError::RoomNotCleared));
        assert_eq!(map.move_to(Direction::North), Err(ActionError::NoConnection));
        assert_eq!(map.move_to(Direction::West), Ok(GridPos::new(0, 0)));
    }

    #[test]
    fn test_reachability_and_routes() {
        let mut map = small_map();
        assert!(map.is_fully_connected());
        map.place(Room::new(GridPos::new(0, 1), RoomType::Empty)).unwrap();
        assert!(!map.is_fully_connected());

        let route = map.route(GridPos::new(0, 0), GridPos::new(1, 1)).unwrap();
        assert_eq!(route.len(), 3);
        assert_eq!(map.distances_from(GridPos::new(0, 0))[&GridPos::new(2, 0)], 2);
        assert_eq!(map.boss_position(), Some(GridPos::new(2, 0)));
    }
}
