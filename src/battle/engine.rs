//! Turn resolution for a battle against up to four enemies at once.
//!
//! A round runs in a fixed order: the player's action and its on-hit effects, kill
//! resolution, enemy status ticks, enemy attacks, buff expiry, cooldowns, class resource
//! regeneration, reinforcements, and finally the outcome check. When the last active
//! enemy falls while reinforcements are still on their way, turns keep passing until one
//! of them takes a slot.

use super::effects::{Combatant, StatusKind};
use super::state::MultiBattleState;
use crate::{
    config, ActionError, Character, ConfiguredAbility, Enemy, EnemyArchetype, EntityId,
    ResolvedEffects,
};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;

/// Chance per turn that a summoner calls a minion instead of attacking
const SUMMON_CHANCE: f64 = 0.3;

/// Minions one summoner may call per battle
const MAX_SUMMONS: u32 = 2;

/// Lowest chance an attack can have to land, in percent
const MIN_HIT_CHANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Ongoing,
    Victory,
    Defeat,
    Fled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub slot: usize,
    pub enemy_id: EntityId,
    pub damage: i32,
    pub critical: bool,
    pub missed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyAttack {
    pub enemy_id: EntityId,
    pub damage: i32,
    pub dodged: bool,
}

/// Everything that happened in one round.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub hits: Vec<HitReport>,
    pub chain_damage: i32,
    pub healed: i32,
    pub self_damage: i32,
    pub kills: Vec<EntityId>,
    pub dot_damage: i32,
    pub enemy_attacks: Vec<EnemyAttack>,
    pub summoned: u32,
    pub joined: Vec<usize>,
    pub expired_buffs: Vec<String>,
    pub outcome: BattleOutcome,
}

impl TurnReport {
    fn new() -> Self {
        Self {
            hits: Vec::new(),
            chain_damage: 0,
            healed: 0,
            self_damage: 0,
            kills: Vec::new(),
            dot_damage: 0,
            enemy_attacks: Vec::new(),
            summoned: 0,
            joined: Vec::new(),
            expired_buffs: Vec::new(),
            outcome: BattleOutcome::Ongoing,
        }
    }

    pub fn damage_dealt(&self) -> i32 {
        self.hits.iter().map(|h| h.damage).sum::<i32>() + self.chain_damage + self.dot_damage
    }
}

/// What the player does this round.
enum PlayerAction<'a> {
    Basic,
    Ability(&'a ConfiguredAbility),
}

/// One battle, from engagement to victory, defeat or flight.
#[derive(Debug, Clone)]
pub struct Battle {
    state: MultiBattleState<Combatant>,
    cooldowns: BTreeMap<String, u32>,
    defeated: Vec<Enemy>,
    outcome: BattleOutcome,
    summons: BTreeMap<EntityId, u32>,
}

impl Battle {
    /// Starts a battle with the engaged enemy in slot 0 and the rest queued by zone.
    pub fn start(initial: Enemy, reinforcements: Vec<(Enemy, u8)>, character: &mut Character) -> Self {
        let boss_fight = initial.is_boss || reinforcements.iter().any(|(e, _)| e.is_boss);
        info!(
            "Battle against {} with {} reinforcements queued",
            initial.name,
            reinforcements.len()
        );
        let mut state = MultiBattleState::new();
        if state.add_initial_enemy(Combatant::new(initial)).is_err() {
            warn!("Fresh battle rejected its initial enemy");
        }
        for (enemy, zone) in reinforcements {
            state.add_reinforcement(Combatant::new(enemy), zone);
        }
        character.set_in_boss_fight(boss_fight);
        Self {
            state,
            cooldowns: BTreeMap::new(),
            defeated: Vec::new(),
            outcome: BattleOutcome::Ongoing,
            summons: BTreeMap::new(),
        }
    }

    pub fn outcome(&self) -> BattleOutcome {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome != BattleOutcome::Ongoing
    }

    pub fn state(&self) -> &MultiBattleState<Combatant> {
        &self.state
    }

    pub fn turn(&self) -> u32 {
        self.state.current_turn()
    }

    /// Turns left before `ability_id` can be used again.
    pub fn cooldown(&self, ability_id: &str) -> u32 {
        self.cooldowns.get(ability_id).copied().unwrap_or(0)
    }

    /// Lowest occupied slot, the default target.
    pub fn first_target(&self) -> Option<usize> {
        self.state.active_enemies().map(|(slot, _)| slot).next()
    }

    /// Enemies killed so far. Drains the list.
    pub fn take_defeated(&mut self) -> Vec<Enemy> {
        std::mem::take(&mut self.defeated)
    }

    /// A free weapon attack.
    pub fn basic_attack(
        &mut self,
        character: &mut Character,
        target_slot: usize,
        rng: &mut StdRng,
    ) -> Result<TurnReport, ActionError> {
        self.round(character, PlayerAction::Basic, target_slot, rng)
    }

    /// Uses a configured ability on `target_slot`.
    ///
    /// Refused without spending anything if the ability is cooling down, the target slot
    /// is empty, or the character cannot pay the cost.
    pub fn player_attack(
        &mut self,
        character: &mut Character,
        ability: &ConfiguredAbility,
        target_slot: usize,
        rng: &mut StdRng,
    ) -> Result<TurnReport, ActionError> {
        self.round(character, PlayerAction::Ability(ability), target_slot, rng)
    }

    /// Leaves the battle. Always succeeds; surviving enemies are handed back.
    pub fn flee(&mut self, character: &mut Character) -> Result<Vec<Enemy>, ActionError> {
        if self.is_over() {
            warn!("Flee requested after the battle ended");
            return Err(ActionError::BattleInactive);
        }
        self.outcome = BattleOutcome::Fled;
        character.set_in_boss_fight(false);
        let survivors: Vec<Enemy> = self.state.drain().into_iter().map(|c| c.enemy).collect();
        info!("{} fled from {} enemies", character.name, survivors.len());
        Ok(survivors)
    }

    fn round(
        &mut self,
        character: &mut Character,
        action: PlayerAction<'_>,
        target_slot: usize,
        rng: &mut StdRng,
    ) -> Result<TurnReport, ActionError> {
        if self.is_over() || !self.state.is_active() {
            warn!("Attack requested on an inactive battle");
            return Err(ActionError::BattleInactive);
        }
        if !self.state.enemy(target_slot).is_some_and(Combatant::is_alive) {
            return Err(ActionError::InvalidTarget);
        }
        if let PlayerAction::Ability(ability) = action {
            let turns = self.cooldown(ability.id());
            if turns > 0 {
                return Err(ActionError::OnCooldown { turns });
            }
            character.spend_resource(ability.final_cost())?;
        }

        let mut report = TurnReport::new();
        let reset_cooldown = self.player_action(character, &action, target_slot, rng, &mut report);

        for (_, combatant) in self.state.active_enemies_mut() {
            report.dot_damage += combatant.tick_statuses();
        }
        self.resolve_kills(character, &mut report);

        self.enemy_attacks(character, rng, &mut report);
        if !character.is_alive() {
            info!("{} was defeated on turn {}", character.name, self.turn());
            self.finish(character, BattleOutcome::Defeat);
            report.outcome = self.outcome;
            return Ok(report);
        }

        report.expired_buffs = character.tick_buffs();
        self.tick_cooldowns();
        if let PlayerAction::Ability(ability) = action {
            if !reset_cooldown && ability.final_cooldown() > 0 {
                self.cooldowns
                    .insert(ability.id().to_string(), ability.final_cooldown());
            }
        }
        character.turn_regen();

        report.joined = self.state.process_turn();
        // Empty slots with a non-empty queue: let turns pass until someone arrives.
        while self.state.active_count() == 0 && self.state.queue_len() > 0 {
            report.expired_buffs.extend(character.tick_buffs());
            self.tick_cooldowns();
            character.turn_regen();
            report.joined.extend(self.state.process_turn());
        }
        if !report.joined.is_empty() {
            debug!("Reinforcements joined in slots {:?}", report.joined);
        }
        if !self.state.is_active() {
            info!("{} won the battle on turn {}", character.name, self.turn());
            self.finish(character, BattleOutcome::Victory);
        }
        report.outcome = self.outcome;
        Ok(report)
    }

    fn tick_cooldowns(&mut self) {
        for turns in self.cooldowns.values_mut() {
            *turns = turns.saturating_sub(1);
        }
        self.cooldowns.retain(|_, turns| *turns > 0);
    }

    fn finish(&mut self, character: &mut Character, outcome: BattleOutcome) {
        self.outcome = outcome;
        character.set_in_boss_fight(false);
    }

    /// The player's strike, its on-hit effects and killing blows.
    ///
    /// Returns whether an on-kill trigger reset the ability's cooldown.
    fn player_action(
        &mut self,
        character: &mut Character,
        action: &PlayerAction<'_>,
        target_slot: usize,
        rng: &mut StdRng,
        report: &mut TurnReport,
    ) -> bool {
        let basic = ResolvedEffects {
            targets: 1,
            hits: 1,
            self_damage_percent: 0.0,
            heal_percent: 0.0,
            hit_bonus: 0.0,
            damage_types: Vec::new(),
            debuff_on_hit: None,
            flags: Default::default(),
        };
        let (effects, ability_damage, crit_bonus) = match action {
            PlayerAction::Basic => (&basic, 0.0, 0.0),
            PlayerAction::Ability(ability) => {
                let scaling: f64 = ability
                    .base()
                    .scaling
                    .iter()
                    .map(|(kind, per_point)| per_point * character.effective_attribute(*kind) as f64)
                    .sum();
                (
                    ability.final_effects(),
                    ability.final_damage() + scaling,
                    ability.final_crit_bonus(),
                )
            }
        };
        let flags = effects.flags;
        let raw = character.total_damage() as f64 + character.elemental_damage() as f64 + ability_damage;

        let mut targets = vec![target_slot];
        targets.extend(
            self.state
                .active_enemies()
                .map(|(slot, _)| slot)
                .filter(|slot| *slot != target_slot)
                .take(effects.targets.saturating_sub(1) as usize),
        );

        let mut last_damage = 0;
        for &slot in &targets {
            for _ in 0..effects.hits.max(1) {
                let Some(combatant) = self.state.enemy_mut(slot) else {
                    break;
                };
                if !combatant.is_alive() {
                    break;
                }
                let hit_chance = (character.hit_chance() + effects.hit_bonus)
                    .clamp(MIN_HIT_CHANCE, config::MAX_HIT_CHANCE);
                if rng.gen_range(0.0..100.0) >= hit_chance {
                    report.hits.push(HitReport {
                        slot,
                        enemy_id: combatant.enemy.id,
                        damage: 0,
                        critical: false,
                        missed: true,
                    });
                    continue;
                }

                let mut amount = raw;
                if let Some(execute) = flags.execute {
                    if combatant.enemy.health_ratio() < execute.threshold {
                        amount *= execute.multiplier;
                    }
                }
                if let Some(conditional) = flags.conditional {
                    if combatant.matches(conditional.when) {
                        amount *= conditional.multiplier;
                    }
                }
                let crit_chance = (character.crit_chance() + crit_bonus).min(config::MAX_CRIT_CHANCE);
                let critical = rng.gen_range(0.0..100.0) < crit_chance;
                if critical {
                    amount *= config::CRIT_MULTIPLIER;
                }

                let reduction = combatant.armor_reduction();
                let dealt = combatant.enemy.take_hit(amount.round() as i32, reduction);
                let enemy_id = combatant.enemy.id;

                if let Some(spec) = flags.bleed {
                    combatant.apply_dot(StatusKind::Bleed, spec);
                }
                if let Some(spec) = flags.burn {
                    combatant.apply_dot(StatusKind::Burn, spec);
                }
                if let Some(spec) = flags.poison {
                    combatant.apply_dot(StatusKind::Poison, spec);
                }
                if let Some(armor) = flags.armor_reduction {
                    combatant.apply_status(StatusKind::ArmorBreak, armor.amount, armor.turns);
                }
                if let Some(debuff) = &effects.debuff_on_hit {
                    combatant.apply_debuff(debuff);
                }

                character.on_damage_dealt(dealt);
                if let Some(fraction) = flags.lifesteal {
                    report.healed += character.heal((dealt as f64 * fraction).round() as i32);
                }
                last_damage = dealt;
                report.hits.push(HitReport {
                    slot,
                    enemy_id,
                    damage: dealt,
                    critical,
                    missed: false,
                });
            }
        }

        if let Some(chain) = flags.chain {
            let jump = (last_damage as f64 * chain.damage_fraction).round() as i32;
            let others: Vec<usize> = self
                .state
                .active_enemies()
                .filter(|(slot, c)| !targets.contains(slot) && c.is_alive())
                .map(|(slot, _)| slot)
                .take(chain.jumps as usize)
                .collect();
            if jump > 0 {
                for slot in others {
                    if let Some(combatant) = self.state.enemy_mut(slot) {
                        report.chain_damage += combatant.enemy.take_true_damage(jump);
                    }
                }
            }
        }

        let max_health = character.max_health() as f64;
        if effects.self_damage_percent > 0.0 {
            let cost = (max_health * effects.self_damage_percent / 100.0).round() as i32;
            // Self-inflicted damage never kills.
            let cost = cost.min(character.health() - 1).max(0);
            report.self_damage = character.take_true_damage(cost);
        }
        if effects.heal_percent > 0.0 {
            report.healed += character.heal((max_health * effects.heal_percent / 100.0).round() as i32);
        }

        let kills_before = report.kills.len();
        self.resolve_kills(character, report);
        let killed = report.kills.len() > kills_before;

        let mut reset_cooldown = false;
        if let (true, Some(on_kill)) = (killed, flags.on_kill) {
            if on_kill.refund_resource > 0 {
                character.restore_resource(on_kill.refund_resource);
            }
            if on_kill.heal_percent > 0.0 {
                report.healed +=
                    character.heal((max_health * on_kill.heal_percent / 100.0).round() as i32);
            }
            reset_cooldown = on_kill.reset_cooldown;
        }
        reset_cooldown
    }

    /// Moves dead enemies out of their slots.
    fn resolve_kills(&mut self, character: &mut Character, report: &mut TurnReport) {
        let dead: Vec<usize> = self
            .state
            .active_enemies()
            .filter(|(_, c)| !c.is_alive())
            .map(|(slot, _)| slot)
            .collect();
        for slot in dead {
            if let Some(combatant) = self.state.remove_enemy(slot) {
                debug!("{} defeated", combatant.enemy.name);
                character.record_kill();
                report.kills.push(combatant.enemy.id);
                self.defeated.push(combatant.enemy);
            }
        }
    }

    fn enemy_attacks(&mut self, character: &mut Character, rng: &mut StdRng, report: &mut TurnReport) {
        let now_ms = character.conditions().now_ms;
        let mut minions = Vec::new();
        for (_, combatant) in self.state.active_enemies() {
            if !character.is_alive() {
                break;
            }
            let enemy = &combatant.enemy;
            if enemy.archetype == EnemyArchetype::Summoner {
                let called = self.summons.get(&enemy.id).copied().unwrap_or(0);
                if called < MAX_SUMMONS && rng.gen_bool(SUMMON_CHANCE) {
                    self.summons.insert(enemy.id, called + 1);
                    minions.push(Enemy::new(EnemyArchetype::Minion, enemy.depth));
                    continue;
                }
            }
            let chance = (combatant.hit_chance() - character.dodge_chance())
                .clamp(MIN_HIT_CHANCE, config::MAX_HIT_CHANCE);
            let dodged = rng.gen_range(0.0..100.0) >= chance;
            let damage = if dodged {
                0
            } else {
                character.receive_hit(combatant.attack_damage(), now_ms)
            };
            report.enemy_attacks.push(EnemyAttack {
                enemy_id: enemy.id,
                damage,
                dodged,
            });
        }
        for minion in minions {
            debug!("A summoner called {}", minion.name);
            self.state.add_reinforcement(Combatant::new(minion), 1);
            report.summoned += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CharacterClass, ContentRegistry};
    use rand::SeedableRng;

    fn weak_enemy() -> Enemy {
        let mut enemy = Enemy::new(EnemyArchetype::Brute, 1);
        enemy.max_health = 5;
        enemy.health = 5;
        enemy.defense = 0;
        enemy
    }

    fn hero() -> Character {
        let mut hero = Character::new("Hero", CharacterClass::Warrior);
        hero.add_to_inventory(
            crate::Item::new("Sword", crate::ItemKind::OneHandedWeapon).with_bonus(crate::Stat::HitChance, 50),
        );
        hero.equip_from_inventory(0).unwrap();
        hero
    }

    #[test]
    fn test_victory_over_single_enemy() {
        let mut hero = hero();
        let mut rng = StdRng::seed_from_u64(1);
        let mut battle = Battle::start(weak_enemy(), Vec::new(), &mut hero);
        let mut kills = 0;
        for _ in 0..20 {
            let report = battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
            kills += report.kills.len();
            if battle.is_over() {
                break;
            }
        }
        assert_eq!(kills, 1);
        assert_eq!(battle.outcome(), BattleOutcome::Victory);
        assert_eq!(battle.take_defeated().len(), 1);
        assert!(battle.take_defeated().is_empty());
        assert_eq!(
            battle.basic_attack(&mut hero, 0, &mut rng),
            Err(ActionError::BattleInactive)
        );
    }

    #[test]
    fn test_reinforcements_join_after_delay() {
        let mut hero = hero();
        let mut rng = StdRng::seed_from_u64(2);
        let mut tank = Enemy::new(EnemyArchetype::Brute, 1);
        tank.max_health = 10_000;
        tank.health = 10_000;
        let mut battle = Battle::start(tank, vec![(weak_enemy(), 1), (weak_enemy(), 2)], &mut hero);
        assert_eq!(battle.state().active_count(), 1);
        battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
        assert_eq!(battle.state().active_count(), 1);
        let report = battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
        assert_eq!(report.joined, vec![1]);
        assert_eq!(battle.state().queue_len(), 1);
    }

    #[test]
    fn test_refusals_do_not_spend() {
        let registry = ContentRegistry::builtin().unwrap();
        let cleave = ConfiguredAbility::new(&registry, "cleave").unwrap();
        let mut hero = hero();
        let mut rng = StdRng::seed_from_u64(3);
        let mut battle = Battle::start(weak_enemy(), Vec::new(), &mut hero);

        // Warriors start with no rage.
        assert!(matches!(
            battle.player_attack(&mut hero, &cleave, 0, &mut rng),
            Err(ActionError::InsufficientResource { .. })
        ));
        assert_eq!(
            battle.basic_attack(&mut hero, 3, &mut rng),
            Err(ActionError::InvalidTarget)
        );
        assert_eq!(battle.turn(), 0);
    }

    #[test]
    fn test_cooldown_blocks_reuse() {
        let registry = ContentRegistry::builtin().unwrap();
        let bash = ConfiguredAbility::new(&registry, "shield_bash").unwrap();
        assert_eq!(bash.final_cooldown(), 2);
        let mut hero = hero();
        hero.restore_resource(100);
        let mut rng = StdRng::seed_from_u64(4);
        let mut tank = Enemy::new(EnemyArchetype::Brute, 1);
        tank.max_health = 10_000;
        tank.health = 10_000;
        tank.damage = 1;
        let mut battle = Battle::start(tank, Vec::new(), &mut hero);

        battle.player_attack(&mut hero, &bash, 0, &mut rng).unwrap();
        assert_eq!(battle.cooldown("shield_bash"), 2);
        assert_eq!(
            battle.player_attack(&mut hero, &bash, 0, &mut rng),
            Err(ActionError::OnCooldown { turns: 2 })
        );
        battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
        battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
        assert_eq!(battle.cooldown("shield_bash"), 0);
    }

    #[test]
    fn test_flee_returns_survivors() {
        let mut hero = hero();
        let mut battle = Battle::start(Enemy::boss(2), vec![(weak_enemy(), 3)], &mut hero);
        assert!(hero.conditions().in_boss_fight);
        let survivors = battle.flee(&mut hero).unwrap();
        assert_eq!(survivors.len(), 2);
        assert_eq!(battle.outcome(), BattleOutcome::Fled);
        assert!(!hero.conditions().in_boss_fight);
        assert!(battle.flee(&mut hero).is_err());
    }

    #[test]
    fn test_defeat_when_health_runs_out() {
        let mut hero = Character::new("Hero", CharacterClass::Mage);
        let mut rng = StdRng::seed_from_u64(5);
        let mut brute = Enemy::new(EnemyArchetype::Brute, 1);
        brute.max_health = 10_000;
        brute.health = 10_000;
        brute.damage = 10_000;
        brute.hit_chance = 100.0;
        let mut battle = Battle::start(brute, Vec::new(), &mut hero);
        let mut outcome = BattleOutcome::Ongoing;
        for _ in 0..50 {
            match battle.basic_attack(&mut hero, 0, &mut rng) {
                Ok(report) => outcome = report.outcome,
                Err(_) => break,
            }
        }
        assert_eq!(outcome, BattleOutcome::Defeat);
        assert!(!hero.is_alive());
    }

    #[test]
    fn test_turns_pass_until_a_distant_reinforcement_arrives() {
        let mut hero = hero();
        let mut rng = StdRng::seed_from_u64(9);
        let mut battle = Battle::start(weak_enemy(), vec![(weak_enemy(), 4)], &mut hero);
        assert_eq!(battle.state().queued().next().map(|q| q.join_turn), Some(8));

        let mut first_kill = None;
        for _ in 0..7 {
            let report = battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
            if !report.kills.is_empty() {
                first_kill = Some(report);
                break;
            }
        }
        let report = first_kill.expect("initial enemy should fall");
        assert_eq!(report.outcome, BattleOutcome::Ongoing);
        assert_eq!(report.joined, vec![0]);
        assert_eq!(battle.turn(), 8);
        assert_eq!(battle.state().active_count(), 1);
        assert_eq!(battle.state().queue_len(), 0);
        assert_eq!(battle.first_target(), Some(0));

        for _ in 0..20 {
            battle.basic_attack(&mut hero, 0, &mut rng).unwrap();
            if battle.is_over() {
                break;
            }
        }
        assert_eq!(battle.outcome(), BattleOutcome::Victory);
        assert_eq!(battle.take_defeated().len(), 2);
    }
}
