//! # Autopilot
//!
//! Plays a [`DungeonRun`] without input: routes to the nearest unvisited room over the
//! room graph, fights whatever is there with the best affordable ability, takes every
//! room's reward, and descends or escapes once the boss is dead.

use super::room::{RoomPayload, RoomType};
use super::run::DungeonRun;
use super::progression::RunSummary;
use super::GridPos;
use crate::{ActionError, Battle, ConfiguredAbility, ContentRegistry, DelveResult, TurnReport};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::Arc;

/// Real time let pass while waiting for enemies to come off cooldown
const WAIT_MS: u64 = 500;

/// Tuning for an [`Autopilot`].
#[derive(Debug, Clone)]
pub struct AutopilotConfig {
    /// Descend until this depth, then escape
    pub target_depth: u32,
    /// Escape early below this share of max health
    pub retreat_health: f64,
    /// Abandon the run after this many steps
    pub max_steps: u32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            target_depth: 3,
            retreat_health: 0.25,
            max_steps: 20_000,
        }
    }
}

/// What one autopilot step did.
#[derive(Debug, Clone, PartialEq)]
pub enum AutopilotStep {
    Attacked(TurnReport),
    Engaged,
    Waited,
    Moved(GridPos),
    Looted(RoomType),
    Descended(u32),
    Finished(RunSummary),
}

/// Reward the current room offers.
enum Loot {
    Treasure,
    Rest,
    Shrine,
    Event,
    /// Index of the cheapest affordable offer
    Shop(Option<usize>),
    Nothing,
}

/// Headless player.
#[derive(Debug, Clone)]
pub struct Autopilot {
    registry: Arc<ContentRegistry>,
    pub config: AutopilotConfig,
    shops_visited: HashSet<GridPos>,
    depth: u32,
}

impl Autopilot {
    pub fn new(registry: Arc<ContentRegistry>, config: AutopilotConfig) -> Self {
        Self {
            registry,
            config,
            shops_visited: HashSet::new(),
            depth: 0,
        }
    }

    /// Steps until the run ends. Gives up and abandons after `max_steps`.
    pub fn play(&mut self, run: &mut DungeonRun, rng: &mut StdRng) -> DelveResult<RunSummary> {
        for _ in 0..self.config.max_steps {
            if let AutopilotStep::Finished(summary) = self.step(run, rng)? {
                return Ok(summary);
            }
        }
        warn!("Autopilot ran out of steps at depth {}", run.depth());
        Ok(run.abandon()?)
    }

    /// Takes one action.
    pub fn step(&mut self, run: &mut DungeonRun, rng: &mut StdRng) -> DelveResult<AutopilotStep> {
        if let Some(summary) = run.summary() {
            return Ok(AutopilotStep::Finished(summary));
        }
        if run.depth() != self.depth {
            self.depth = run.depth();
            self.shops_visited.clear();
        }

        if let Some(battle) = run.battle() {
            let Some(target) = battle.first_target() else {
                debug!("No enemy in reach on turn {}", battle.turn());
                return Ok(AutopilotStep::Waited);
            };
            let ability = self.best_ability(run, battle);
            let report = run.battle_attack(ability.as_ref(), target, rng)?;
            return Ok(AutopilotStep::Attacked(report));
        }

        let Some(room) = run.map().current_room() else {
            return Err(crate::DelveError::InvalidState(
                "run has no current room".to_string(),
            ));
        };
        let (pos, room_type, blocked) = (room.pos, room.room_type, room.blocks_exit());
        let loot = match &room.payload {
            RoomPayload::Treasure(_) => Loot::Treasure,
            RoomPayload::Rest { .. } => Loot::Rest,
            RoomPayload::Shrine(_) => Loot::Shrine,
            RoomPayload::Event(_) => Loot::Event,
            RoomPayload::Shop(offers) if !self.shops_visited.contains(&pos) => {
                let gold = run.pending().gold;
                Loot::Shop(
                    offers
                        .iter()
                        .enumerate()
                        .filter(|(_, offer)| offer.price <= gold)
                        .min_by_key(|(_, offer)| offer.price)
                        .map(|(index, _)| index),
                )
            }
            _ => Loot::Nothing,
        };

        if blocked {
            return match run.engage_current_room() {
                Ok(()) => Ok(AutopilotStep::Engaged),
                Err(ActionError::InvalidTarget) => {
                    run.tick_encounter(None, WAIT_MS)?;
                    Ok(AutopilotStep::Waited)
                }
                Err(e) => Err(e.into()),
            };
        }

        let looted = match loot {
            Loot::Treasure => run.collect_treasure().map(|_| true)?,
            Loot::Rest => run.rest().map(|_| true)?,
            Loot::Shrine => run.pray_at_shrine().map(|_| true)?,
            Loot::Event => run.resolve_event(rng).map(|_| true)?,
            Loot::Shop(choice) => {
                self.shops_visited.insert(pos);
                match choice {
                    Some(index) => run.buy_from_shop(index).map(|_| true)?,
                    None => false,
                }
            }
            Loot::Nothing => false,
        };
        if looted {
            return Ok(AutopilotStep::Looted(room_type));
        }

        let character = run.character();
        if character.health_ratio() < self.config.retreat_health {
            info!("Autopilot retreating at {:.0}% health", character.health_ratio() * 100.0);
            return Ok(AutopilotStep::Finished(run.escape_successfully()?));
        }

        let boss_dead = run
            .map()
            .boss_position()
            .and_then(|p| run.map().room(p))
            .is_some_and(|r| r.cleared);
        if boss_dead {
            if run.depth() < self.config.target_depth {
                return Ok(AutopilotStep::Descended(run.descend(rng)?));
            }
            return Ok(AutopilotStep::Finished(run.escape_successfully()?));
        }

        match self.next_step_towards_unvisited(run, pos) {
            Some(direction) => {
                let to = run.move_to(direction)?;
                debug!("Autopilot moved to {}", to);
                Ok(AutopilotStep::Moved(to))
            }
            None => {
                warn!("Autopilot found nowhere left to go");
                Ok(AutopilotStep::Finished(run.escape_successfully()?))
            }
        }
    }

    fn next_step_towards_unvisited(&self, run: &DungeonRun, from: GridPos) -> Option<super::Direction> {
        let route = run.map().route_to_nearest(from, |room| !room.visited)?;
        let next = *route.get(1)?;
        from.direction_to(next)
    }

    /// Highest-damage ability that is off cooldown and affordable, if any.
    fn best_ability(&self, run: &DungeonRun, battle: &Battle) -> Option<ConfiguredAbility> {
        let character = run.character();
        let available = character.resource().current() as f64;
        character
            .loadout()
            .iter()
            .filter_map(|selection| ConfiguredAbility::from_selection(&self.registry, selection).ok())
            .filter(|ability| battle.cooldown(ability.id()) == 0 && ability.final_cost() <= available)
            .max_by(|a, b| a.final_damage().total_cmp(&b.final_damage()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Character, CharacterClass, DungeonProgression, RoomGridGenerator, RunOutcome};
    use rand::SeedableRng;

    fn run_for(class: CharacterClass, seed: u64) -> (DungeonRun, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let run = DungeonRun::begin(
            Character::new("Auto", class),
            &DungeonProgression::new(),
            &RoomGridGenerator::for_testing(seed),
            1,
            &mut rng,
        )
        .unwrap();
        (run, rng)
    }

    #[test]
    fn test_autopilot_finishes_a_run() {
        let registry = ContentRegistry::builtin().unwrap();
        for (seed, class) in [(1, CharacterClass::Warrior), (2, CharacterClass::Rogue)] {
            let (mut run, mut rng) = run_for(class, seed);
            let mut pilot = Autopilot::new(registry.clone(), AutopilotConfig::default());
            let summary = pilot.play(&mut run, &mut rng).unwrap();
            assert!(run.is_over());
            assert!(summary.depth_reached >= 1);
            if summary.outcome == RunOutcome::Escaped {
                assert!(summary.enemies_killed > 0);
            }
        }
    }

    #[test]
    fn test_autopilot_survives_many_seeds() {
        let registry = ContentRegistry::builtin().unwrap();
        let classes = [CharacterClass::Warrior, CharacterClass::Rogue, CharacterClass::Mage];
        for seed in 1..=24u64 {
            let (mut run, mut rng) = run_for(classes[seed as usize % 3], seed);
            let mut pilot = Autopilot::new(registry.clone(), AutopilotConfig::default());
            let summary = pilot.play(&mut run, &mut rng);
            assert!(summary.is_ok(), "seed {} failed: {:?}", seed, summary);
            assert!(run.is_over());
        }
    }

    #[test]
    fn test_first_step_leaves_start() {
        let registry = ContentRegistry::builtin().unwrap();
        let (mut run, mut rng) = run_for(CharacterClass::Mage, 3);
        let mut pilot = Autopilot::new(registry, AutopilotConfig::default());
        assert!(matches!(
            pilot.step(&mut run, &mut rng).unwrap(),
            AutopilotStep::Moved(_)
        ));
    }

    #[test]
    fn test_step_after_end_reports_summary() {
        let registry = ContentRegistry::builtin().unwrap();
        let (mut run, mut rng) = run_for(CharacterClass::Warrior, 4);
        run.abandon().unwrap();
        let mut pilot = Autopilot::new(registry, AutopilotConfig::default());
        assert!(matches!(
            pilot.step(&mut run, &mut rng).unwrap(),
            AutopilotStep::Finished(_)
        ));
    }
}
