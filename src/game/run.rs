//! One dungeon run: the map, the playing character, and rewards not yet banked.
//!
//! Gold, experience, loot and jewels won inside the dungeon sit in [`PendingRewards`]
//! until the run escapes or clears a depth and descends. Dying throws them away.

use super::map::DungeonMap;
use super::progression::{DungeonProgression, RunOutcome, RunSummary};
use super::room::{Blessing, EventKind, RoomPayload};
use super::{Direction, GridPos};
use crate::generation::depth_scale;
use crate::{
    ActionError, Battle, BattleOutcome, Character, ConfiguredAbility, DelveResult, Enemy,
    EncounterEvent, EntityId, Item, PlayerIntent, PotionKind, RoomEncounter, RoomGridGenerator,
    RunBonuses, RunItem, Stat, TurnReport, Treasure,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Share of max health restored by a healing fountain
const FOUNTAIN_HEAL_FRACTION: f64 = 0.3;

/// Share of max health a hidden trap takes
const TRAP_DAMAGE_FRACTION: f64 = 0.15;

/// Rewards won during the run and not yet given to the character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingRewards {
    pub gold: u64,
    pub experience: u64,
    pub jewels: u64,
    pub scrap: u64,
    pub items: Vec<Item>,
    pub potions: u32,
}

impl PendingRewards {
    pub fn is_empty(&self) -> bool {
        self.gold == 0
            && self.experience == 0
            && self.jewels == 0
            && self.scrap == 0
            && self.items.is_empty()
            && self.potions == 0
    }
}

/// Counters for the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub rooms_cleared: u32,
    pub enemies_killed: u32,
    pub bosses_killed: u32,
    pub highest_depth: u32,
}

/// A run item and how many copies the run holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunItemStack {
    pub item: RunItem,
    pub stacks: u32,
}

/// An active dungeon run.
///
/// Owns the character for the duration of the run; take it back with
/// [`DungeonRun::into_character`] once the run is over.
#[derive(Debug, Clone)]
pub struct DungeonRun {
    character: Character,
    map: DungeonMap,
    generator: RoomGridGenerator,
    permanent_bonuses: RunBonuses,
    run_items: BTreeMap<String, RunItemStack>,
    pending: PendingRewards,
    stats: RunStats,
    gold_committed: u64,
    experience_committed: u64,
    encounter: Option<RoomEncounter>,
    battle: Option<Battle>,
    clock_ms: u64,
    outcome: Option<RunOutcome>,
}

impl DungeonRun {
    /// Generates `depth` and puts `character` in its start room at full health.
    ///
    /// Permanent upgrades from `progression` become the base of the run bonuses.
    pub fn begin(
        mut character: Character,
        progression: &DungeonProgression,
        generator: &RoomGridGenerator,
        depth: u32,
        rng: &mut StdRng,
    ) -> DelveResult<Self> {
        let depth = depth.max(1);
        let map = generator.generate_depth(depth, rng)?;
        let permanent_bonuses = progression.upgrade_bonuses();
        character.set_run_bonuses(permanent_bonuses.clone());
        character.restore_full();
        info!("{} enters the dungeon at depth {}", character.name, depth);

        let mut run = Self {
            character,
            map,
            generator: generator.clone(),
            permanent_bonuses,
            run_items: BTreeMap::new(),
            pending: PendingRewards::default(),
            stats: RunStats {
                highest_depth: depth,
                ..Default::default()
            },
            gold_committed: 0,
            experience_committed: 0,
            encounter: None,
            battle: None,
            clock_ms: 0,
            outcome: None,
        };
        run.enter_room();
        Ok(run)
    }

    pub fn character(&self) -> &Character {
        &self.character
    }

    /// Hands the character back. Meant for after the run has ended.
    pub fn into_character(self) -> Character {
        if self.outcome.is_none() {
            warn!("Character taken from a run that has not ended");
        }
        self.character
    }

    pub fn map(&self) -> &DungeonMap {
        &self.map
    }

    pub fn depth(&self) -> u32 {
        self.map.depth
    }

    pub fn pending(&self) -> &PendingRewards {
        &self.pending
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref()
    }

    pub fn encounter(&self) -> Option<&RoomEncounter> {
        self.encounter.as_ref()
    }

    pub fn run_items(&self) -> impl Iterator<Item = &RunItemStack> {
        self.run_items.values()
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    fn ensure_active(&self) -> Result<(), ActionError> {
        if self.outcome.is_some() {
            return Err(ActionError::RunOver);
        }
        Ok(())
    }

    /// Active and not in the middle of a battle.
    fn ensure_exploring(&self) -> Result<(), ActionError> {
        self.ensure_active()?;
        if self.battle.is_some() {
            return Err(ActionError::BattleInProgress);
        }
        Ok(())
    }

    fn enter_room(&mut self) {
        self.encounter = self
            .map
            .current_room()
            .filter(|room| room.blocks_exit())
            .map(RoomEncounter::for_room);
    }

    /// Walks through an exit of the current room.
    pub fn move_to(&mut self, direction: Direction) -> Result<GridPos, ActionError> {
        self.ensure_exploring()?;
        let pos = self.map.move_to(direction)?;
        self.enter_room();
        Ok(pos)
    }

    /// Advances the room's real-time layer by `dt_ms`.
    ///
    /// A battle triggered by an enemy reaching the player starts immediately, and
    /// dying to a hazard or projectile ends the run.
    pub fn tick_encounter(
        &mut self,
        intent: Option<PlayerIntent>,
        dt_ms: u64,
    ) -> Result<Vec<EncounterEvent>, ActionError> {
        self.ensure_exploring()?;
        self.clock_ms += dt_ms;
        self.character.advance_clock(self.clock_ms);
        let Some(encounter) = self.encounter.as_mut() else {
            return Ok(Vec::new());
        };
        let events = encounter.tick(
            intent,
            self.clock_ms,
            dt_ms as f32 / 1000.0,
            &mut self.character,
        );
        for event in &events {
            match event {
                EncounterEvent::BattleStarted { .. } => self.start_battle_from_encounter(event)?,
                EncounterEvent::PlayerDefeated => {
                    self.die()?;
                    break;
                }
                _ => {}
            }
        }
        Ok(events)
    }

    /// Starts a battle against the nearest enemy in the room, pulling in its neighbours.
    pub fn engage_current_room(&mut self) -> Result<(), ActionError> {
        self.ensure_exploring()?;
        let event = self
            .encounter
            .as_mut()
            .and_then(RoomEncounter::engage_nearest)
            .ok_or(ActionError::InvalidTarget)?;
        self.start_battle_from_encounter(&event)
    }

    /// Turns a [`EncounterEvent::BattleStarted`] into a battle against the room's enemies.
    pub fn start_battle_from_encounter(&mut self, event: &EncounterEvent) -> Result<(), ActionError> {
        self.ensure_exploring()?;
        let EncounterEvent::BattleStarted {
            initiator,
            reinforcements,
        } = event
        else {
            return Err(ActionError::InvalidTarget);
        };
        let room = self.map.current_room().ok_or(ActionError::InvalidTarget)?;
        let find = |id: &EntityId| room.enemies().iter().find(|e| e.id == *id).cloned();
        let initial = find(initiator).ok_or(ActionError::InvalidTarget)?;
        let queued: Vec<(Enemy, u8)> = reinforcements
            .iter()
            .filter_map(|(id, zone)| find(id).map(|e| (e, *zone)))
            .collect();
        self.battle = Some(Battle::start(initial, queued, &mut self.character));
        Ok(())
    }

    /// One round of the current battle, with an ability or a basic attack.
    pub fn battle_attack(
        &mut self,
        ability: Option<&ConfiguredAbility>,
        target_slot: usize,
        rng: &mut StdRng,
    ) -> Result<TurnReport, ActionError> {
        self.ensure_active()?;
        let battle = self.battle.as_mut().ok_or(ActionError::BattleInactive)?;
        let report = match ability {
            Some(ability) => battle.player_attack(&mut self.character, ability, target_slot, rng)?,
            None => battle.basic_attack(&mut self.character, target_slot, rng)?,
        };
        if battle.is_over() {
            self.settle_battle(rng);
        }
        Ok(report)
    }

    /// Runs from the current battle back to the room entrance.
    pub fn flee_battle(&mut self, rng: &mut StdRng) -> Result<(), ActionError> {
        self.ensure_active()?;
        let battle = self.battle.as_mut().ok_or(ActionError::BattleInactive)?;
        battle.flee(&mut self.character)?;
        self.settle_battle(rng);
        Ok(())
    }

    /// Books kills, clears the room if it is empty, and ends the battle.
    fn settle_battle(&mut self, rng: &mut StdRng) {
        let Some(mut battle) = self.battle.take() else {
            return;
        };
        let outcome = battle.outcome();
        match outcome {
            BattleOutcome::Ongoing => {
                warn!("Tried to settle a battle that is still running");
                self.battle = Some(battle);
                return;
            }
            BattleOutcome::Defeat => {
                if let Err(e) = self.die() {
                    warn!("Could not end run after defeat: {}", e);
                }
                return;
            }
            BattleOutcome::Victory | BattleOutcome::Fled => {}
        }

        let defeated = battle.take_defeated();
        let ids: Vec<EntityId> = defeated.iter().map(|e| e.id).collect();
        for enemy in &defeated {
            self.reward_kill(enemy, rng);
        }

        let now = self.clock_ms;
        if let Some(encounter) = self.encounter.as_mut() {
            if outcome == BattleOutcome::Fled {
                encounter.flee(now);
            }
            encounter.resolve_defeated(&ids, now);
        }

        let Some(room) = self.map.current_room_mut() else {
            return;
        };
        let emptied = match &mut room.payload {
            RoomPayload::Hostile { enemies, .. } => {
                enemies.retain(|e| !ids.contains(&e.id));
                enemies.is_empty()
            }
            _ => false,
        };
        if emptied && !room.cleared {
            room.mark_cleared();
            self.stats.rooms_cleared += 1;
            info!("Room {} cleared", room.pos);
        }
    }

    fn with_find_bonus(&self, amount: u64, stat: Stat) -> u64 {
        let percent =
            self.character.flat_bonus(stat) as f64 + self.character.percent_bonus(stat);
        (amount as f64 * (1.0 + percent.max(0.0) / 100.0)).round() as u64
    }

    fn reward_kill(&mut self, enemy: &Enemy, rng: &mut StdRng) {
        self.stats.enemies_killed += 1;
        let gold = self.with_find_bonus(enemy.gold, Stat::GoldFind);
        let experience = self.with_find_bonus(enemy.experience, Stat::ExperienceGain);
        self.pending.gold += gold;
        self.pending.experience += experience;
        if enemy.is_boss {
            self.stats.bosses_killed += 1;
            let depth = self.depth();
            let drop = self.generator.loot().random_equipment(depth, rng);
            self.pending.items.push(drop);
            self.pending.jewels += 1 + depth as u64 / 3;
            info!("{} slain", enemy.name);
        }
    }

    /// Takes the current room's payload if `wanted` accepts it, leaving it otherwise.
    fn take_payload(&mut self, wanted: fn(&RoomPayload) -> bool) -> Result<RoomPayload, ActionError> {
        self.ensure_exploring()?;
        let room = self
            .map
            .current_room_mut()
            .ok_or(ActionError::NothingToCollect)?;
        if !wanted(&room.payload) {
            return Err(ActionError::NothingToCollect);
        }
        Ok(room.take_payload())
    }

    /// Loots a treasure room. Currency and loot go to the pending pile; run items apply now.
    pub fn collect_treasure(&mut self) -> Result<Treasure, ActionError> {
        let RoomPayload::Treasure(treasure) =
            self.take_payload(|p| matches!(p, RoomPayload::Treasure(_)))?
        else {
            return Err(ActionError::NothingToCollect);
        };
        let gold = self.with_find_bonus(treasure.gold, Stat::GoldFind);
        self.pending.gold += gold;
        self.pending.scrap += treasure.scrap;
        self.pending.jewels += treasure.jewels;
        self.pending.potions += treasure.potions;
        self.pending.items.extend(treasure.items.iter().cloned());
        for item in &treasure.run_items {
            self.add_run_item(item.clone());
        }
        debug!("Collected {} gold of treasure", treasure.gold);
        Ok(treasure)
    }

    /// Uses a rest room. Returns the health restored.
    pub fn rest(&mut self) -> Result<i32, ActionError> {
        let RoomPayload::Rest { heal_fraction } =
            self.take_payload(|p| matches!(p, RoomPayload::Rest { .. }))?
        else {
            return Err(ActionError::NothingToCollect);
        };
        let max_health = self.character.max_health() as f64;
        let max_resource = self.character.resource().max() as f64;
        let healed = self.character.heal((max_health * heal_fraction).round() as i32);
        self.character
            .restore_resource((max_resource * heal_fraction).round() as i32);
        info!("{} rested and recovered {} health", self.character.name, healed);
        Ok(healed)
    }

    /// Accepts a shrine's blessing as a run item.
    pub fn pray_at_shrine(&mut self) -> Result<Blessing, ActionError> {
        let RoomPayload::Shrine(blessing) =
            self.take_payload(|p| matches!(p, RoomPayload::Shrine(_)))?
        else {
            return Err(ActionError::NothingToCollect);
        };
        self.add_run_item(blessing.as_run_item());
        Ok(blessing)
    }

    /// Buys offer `index` of the current shop with gold won this run.
    pub fn buy_from_shop(&mut self, index: usize) -> Result<RunItem, ActionError> {
        self.ensure_exploring()?;
        let available = self.pending.gold;
        let room = self
            .map
            .current_room_mut()
            .ok_or(ActionError::NothingToCollect)?;
        let RoomPayload::Shop(offers) = &mut room.payload else {
            return Err(ActionError::NothingToCollect);
        };
        let offer = offers
            .get(index)
            .ok_or_else(|| ActionError::InvalidSelection(format!("no shop offer {index}")))?;
        if offer.price > available {
            return Err(ActionError::InsufficientGold {
                needed: offer.price,
                available,
            });
        }
        let offer = offers.remove(index);
        self.pending.gold -= offer.price;
        info!("Bought {} for {} gold", offer.item.name, offer.price);
        self.add_run_item(offer.item.clone());
        Ok(offer.item)
    }

    /// Resolves the current room's event.
    pub fn resolve_event(&mut self, rng: &mut StdRng) -> Result<EventKind, ActionError> {
        let RoomPayload::Event(kind) = self.take_payload(|p| matches!(p, RoomPayload::Event(_)))?
        else {
            return Err(ActionError::NothingToCollect);
        };
        let depth = self.depth();
        let max_health = self.character.max_health() as f64;
        match kind {
            EventKind::HealingFountain => {
                self.character
                    .heal((max_health * FOUNTAIN_HEAL_FRACTION).round() as i32);
            }
            EventKind::ForgottenCache => {
                let gold = (25.0 * depth_scale(depth)).round() as u64;
                let gold = self.with_find_bonus(gold, Stat::GoldFind);
                self.pending.gold += gold;
            }
            EventKind::HiddenTrap => {
                // Traps wound but never kill.
                let damage = ((max_health * TRAP_DAMAGE_FRACTION).round() as i32).max(1);
                let damage = damage.min(self.character.health() - 1).max(0);
                self.character.take_true_damage(damage);
            }
            EventKind::WanderingSage => {
                let experience = self.with_find_bonus(20 * depth as u64, Stat::ExperienceGain);
                self.pending.experience += experience;
            }
            EventKind::CursedIdol => {
                let item = self.generator.loot().random_run_item(rng);
                self.add_run_item(item);
            }
        }
        debug!("Event resolved: {:?}", kind);
        Ok(kind)
    }

    /// Adds a run item, stacking copies by name, and refreshes the character's bonuses.
    pub fn add_run_item(&mut self, item: RunItem) {
        let stack = self
            .run_items
            .entry(item.name.clone())
            .or_insert_with(|| RunItemStack { item, stacks: 0 });
        stack.stacks += 1;
        debug!("{} x{}", stack.item.name, stack.stacks);
        self.refresh_run_bonuses();
    }

    fn refresh_run_bonuses(&mut self) {
        let mut total = self.permanent_bonuses.clone();
        for stack in self.run_items.values() {
            total.absorb(&stack.item.bonuses, stack.stacks);
        }
        self.character.set_run_bonuses(total);
    }

    /// Banks pending rewards and moves to the next depth. The boss must be dead.
    pub fn descend(&mut self, rng: &mut StdRng) -> DelveResult<u32> {
        self.ensure_exploring()?;
        let boss_cleared = self
            .map
            .boss_position()
            .and_then(|pos| self.map.room(pos))
            .is_some_and(|room| room.cleared);
        if !boss_cleared {
            return Err(ActionError::RoomNotCleared.into());
        }
        let next = self.depth() + 1;
        let map = self.generator.generate_depth(next, rng)?;
        self.commit_pending();
        self.map = map;
        self.stats.highest_depth = self.stats.highest_depth.max(next);
        self.enter_room();
        info!("{} descends to depth {}", self.character.name, next);
        Ok(next)
    }

    /// Leaves the dungeon alive, banking everything.
    pub fn escape_successfully(&mut self) -> Result<RunSummary, ActionError> {
        self.ensure_exploring()?;
        self.commit_pending();
        Ok(self.finish(RunOutcome::Escaped))
    }

    /// Ends the run in death. Pending rewards are lost and the character wakes up healed.
    pub fn die(&mut self) -> Result<RunSummary, ActionError> {
        self.ensure_active()?;
        self.discard_pending();
        info!("{} died at depth {}", self.character.name, self.depth());
        Ok(self.finish(RunOutcome::Died))
    }

    /// Walks out without banking anything. Not counted as a death.
    pub fn abandon(&mut self) -> Result<RunSummary, ActionError> {
        self.ensure_active()?;
        if let Some(battle) = self.battle.as_mut() {
            if let Err(err) = battle.flee(&mut self.character) {
                warn!("Abandoning with a battle that would not end: {}", err);
            }
        }
        self.discard_pending();
        Ok(self.finish(RunOutcome::Abandoned))
    }

    fn commit_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return;
        }
        info!(
            "Committing {} gold, {} experience and {} items",
            pending.gold,
            pending.experience,
            pending.items.len()
        );
        self.character.add_gold(pending.gold);
        self.character.gain_experience(pending.experience);
        self.character.add_jewels(pending.jewels);
        self.character.add_scrap(pending.scrap);
        self.character.add_potions(PotionKind::Health, pending.potions);
        for item in pending.items {
            self.character.add_to_inventory(item);
        }
        self.gold_committed += pending.gold;
        self.experience_committed += pending.experience;
    }

    fn discard_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            info!(
                "Discarding {} gold and {} experience",
                pending.gold, pending.experience
            );
        }
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunSummary {
        self.battle = None;
        self.encounter = None;
        self.run_items.clear();
        self.character.reset_run_bonuses();
        if outcome == RunOutcome::Died {
            self.character.restore_full();
        }
        self.character.set_in_boss_fight(false);
        self.outcome = Some(outcome);
        self.build_summary(outcome)
    }

    /// The final report, once the run has ended.
    pub fn summary(&self) -> Option<RunSummary> {
        self.outcome.map(|outcome| self.build_summary(outcome))
    }

    fn build_summary(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            outcome,
            depth_reached: self.stats.highest_depth,
            enemies_killed: self.stats.enemies_killed,
            bosses_killed: self.stats.bosses_killed,
            rooms_cleared: self.stats.rooms_cleared,
            gold_committed: self.gold_committed,
            experience_committed: self.experience_committed,
        }
    }
}
