//! Slot and reinforcement bookkeeping for a multi-enemy battle.
//!
//! Generic over the enemy type so the rules can be exercised without combat numbers.

use crate::config;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An enemy waiting to join, with the turn it becomes eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedReinforcement<E> {
    pub enemy: E,
    pub join_turn: u32,
    pub zone: u8,
    arrival: u64,
}

/// Fixed battle slots plus a time-delayed reinforcement queue.
///
/// An enemy is owned either by a slot or by the queue, never both. Reinforcements
/// join in `(join_turn, arrival)` order, and a blocked head of the queue holds back
/// everything behind it.
///
/// # Examples
///
/// ```
/// use delve::MultiBattleState;
///
/// let mut battle = MultiBattleState::new();
/// battle.add_initial_enemy("goblin").unwrap();
/// assert_eq!(battle.add_reinforcement("archer", 1), 2);
/// battle.process_turn();
/// assert_eq!(battle.active_count(), 1);
/// battle.process_turn();
/// assert_eq!(battle.active_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBattleState<E> {
    slots: Vec<Option<E>>,
    queue: VecDeque<QueuedReinforcement<E>>,
    turn: u32,
    active: bool,
    arrivals: u64,
}

impl<E> Default for MultiBattleState<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> MultiBattleState<E> {
    pub fn new() -> Self {
        Self {
            slots: (0..config::MAX_ACTIVE_ENEMIES).map(|_| None).collect(),
            queue: VecDeque::new(),
            turn: 0,
            active: false,
            arrivals: 0,
        }
    }

    /// Puts the enemy the player engaged into slot 0 and starts the battle.
    pub fn add_initial_enemy(&mut self, enemy: E) -> Result<usize, crate::ActionError> {
        if self.slots[0].is_some() {
            warn!("Initial enemy added to a battle that already has one");
            return Err(crate::ActionError::BattleInProgress);
        }
        self.slots[0] = Some(enemy);
        self.active = true;
        Ok(0)
    }

    /// Queues an enemy `zone` bands away. Returns the turn it becomes eligible.
    ///
    /// Zones are clamped to `1..=MAX_REINFORCEMENT_ZONE`; each zone adds
    /// `TURNS_PER_ZONE` turns of delay.
    pub fn add_reinforcement(&mut self, enemy: E, zone: u8) -> u32 {
        let zone = zone.clamp(1, config::MAX_REINFORCEMENT_ZONE);
        let join_turn = self.turn + zone as u32 * config::TURNS_PER_ZONE;
        let entry = QueuedReinforcement {
            enemy,
            join_turn,
            zone,
            arrival: self.arrivals,
        };
        self.arrivals += 1;
        // Earliest join turn first; arrival order only breaks ties.
        let at = self
            .queue
            .iter()
            .position(|q| (q.join_turn, q.arrival) > (entry.join_turn, entry.arrival))
            .unwrap_or(self.queue.len());
        self.queue.insert(at, entry);
        self.active = true;
        debug!("Reinforcement from zone {} queued for turn {}", zone, join_turn);
        join_turn
    }

    /// Advances the turn counter and lets due reinforcements into free slots.
    ///
    /// Returns the slots that were filled. Stops at the first due entry that finds no
    /// free slot; it stays at the head of the queue.
    pub fn process_turn(&mut self) -> Vec<usize> {
        if !self.active {
            warn!("process_turn called on an inactive battle");
            return Vec::new();
        }
        self.turn += 1;
        let mut joined = Vec::new();
        while self
            .queue
            .front()
            .is_some_and(|q| q.join_turn <= self.turn)
        {
            let Some(slot) = self.free_slot() else {
                debug!("Reinforcement blocked on turn {}: all slots full", self.turn);
                break;
            };
            if let Some(entry) = self.queue.pop_front() {
                self.slots[slot] = Some(entry.enemy);
                joined.push(slot);
            }
        }
        joined
    }

    /// Clears `slot`, returning its occupant.
    pub fn remove_enemy(&mut self, slot: usize) -> Option<E> {
        let removed = self.slots.get_mut(slot).and_then(Option::take);
        self.refresh_active();
        removed
    }

    /// Removes every enemy, queued or active. Used when the player flees.
    pub fn drain(&mut self) -> Vec<E> {
        let mut all: Vec<E> = self.slots.iter_mut().filter_map(Option::take).collect();
        all.extend(self.queue.drain(..).map(|q| q.enemy));
        self.active = false;
        all
    }

    fn refresh_active(&mut self) {
        self.active = self.slots.iter().any(Option::is_some) || !self.queue.is_empty();
    }

    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn enemy(&self, slot: usize) -> Option<&E> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn enemy_mut(&mut self, slot: usize) -> Option<&mut E> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Occupied slots with their index.
    pub fn active_enemies(&self) -> impl Iterator<Item = (usize, &E)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|e| (i, e)))
    }

    pub fn active_enemies_mut(&mut self) -> impl Iterator<Item = (usize, &mut E)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|e| (i, e)))
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn queued(&self) -> impl Iterator<Item = &QueuedReinforcement<E>> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn current_turn(&self) -> u32 {
        self.turn
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_enemy_takes_slot_zero() {
        let mut battle = MultiBattleState::new();
        assert_eq!(battle.add_initial_enemy(1), Ok(0));
        assert!(battle.is_active());
        assert_eq!(battle.enemy(0), Some(&1));
        assert!(battle.add_initial_enemy(2).is_err());
    }

    #[test]
    fn test_zone_delays() {
        let mut battle = MultiBattleState::new();
        battle.add_initial_enemy(0).unwrap();
        let turns: Vec<u32> = (1..=4).map(|z| battle.add_reinforcement(z, z as u8)).collect();
        assert_eq!(turns, vec![2, 4, 6, 8]);
        assert_eq!(battle.add_reinforcement(9, 7), 8);
    }

    #[test]
    fn test_five_reinforcements_four_slots() {
        let mut battle = MultiBattleState::new();
        for id in 0..5 {
            battle.add_reinforcement(id, 1);
        }
        assert!(battle.process_turn().is_empty());
        let joined = battle.process_turn();
        assert_eq!(joined, vec![0, 1, 2, 3]);
        assert_eq!(battle.active_count(), 4);
        assert_eq!(battle.queue_len(), 1);
        assert_eq!(battle.queued().next().map(|q| q.enemy), Some(4));
    }

    #[test]
    fn test_blocked_head_holds_back_queue() {
        let mut battle = MultiBattleState::new();
        for id in 0..4 {
            battle.add_reinforcement(id, 1);
        }
        battle.add_reinforcement(10, 1);
        battle.add_reinforcement(20, 2);
        battle.process_turn();
        battle.process_turn();
        assert_eq!(battle.active_count(), 4);

        battle.process_turn();
        battle.process_turn();
        // Zone 2 entry is due, but the zone 1 entry ahead of it is still blocked.
        assert_eq!(
            battle.queued().map(|q| q.enemy).collect::<Vec<_>>(),
            vec![10, 20]
        );

        battle.remove_enemy(2);
        assert_eq!(battle.process_turn(), vec![2]);
        assert_eq!(battle.enemy(2), Some(&10));
        assert_eq!(battle.queue_len(), 1);
    }

    #[test]
    fn test_battle_ends_when_empty() {
        let mut battle = MultiBattleState::new();
        battle.add_initial_enemy("a").unwrap();
        battle.add_reinforcement("b", 1);
        assert_eq!(battle.remove_enemy(0), Some("a"));
        assert!(battle.is_active());
        battle.process_turn();
        battle.process_turn();
        assert_eq!(battle.remove_enemy(0), Some("b"));
        assert!(!battle.is_active());
        assert!(battle.process_turn().is_empty());
        assert_eq!(battle.current_turn(), 2);
    }

    #[test]
    fn test_drain_takes_everything() {
        let mut battle = MultiBattleState::new();
        battle.add_initial_enemy(1).unwrap();
        battle.add_reinforcement(2, 3);
        let mut all = battle.drain();
        all.sort();
        assert_eq!(all, vec![1, 2]);
        assert!(!battle.is_active());
        assert_eq!(battle.active_count(), 0);
    }

    #[test]
    fn test_nearer_reinforcement_joins_first() {
        let mut battle = MultiBattleState::new();
        battle.add_initial_enemy("goblin").unwrap();
        assert_eq!(battle.add_reinforcement("ogre", 4), 8);
        assert_eq!(battle.add_reinforcement("minion", 1), 2);
        let order: Vec<_> = battle.queued().map(|q| q.enemy).collect();
        assert_eq!(order, vec!["minion", "ogre"]);
    }
}
