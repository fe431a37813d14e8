//! Multi-enemy battles driven through the public API.

use delve::{
    ActionError, Battle, BattleOutcome, Character, CharacterClass, ConfiguredAbility,
    ContentRegistry, DelveResult, Enemy, EnemyArchetype,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn punching_bag() -> Enemy {
    let mut enemy = Enemy::new(EnemyArchetype::Brute, 1);
    enemy.max_health = 5_000;
    enemy.health = 5_000;
    enemy.damage = 0;
    enemy.hit_chance = 0.0;
    enemy
}

#[test]
fn test_reinforcements_fill_at_most_four_slots() -> DelveResult<()> {
    let mut hero = Character::new("Hero", CharacterClass::Warrior);
    let mut rng = StdRng::seed_from_u64(8);
    let queued = (0..6).map(|_| (punching_bag(), 1)).collect();
    let mut battle = Battle::start(punching_bag(), queued, &mut hero);
    assert_eq!(battle.state().active_count(), 1);
    assert_eq!(battle.state().queue_len(), 6);

    for _ in 0..6 {
        battle.basic_attack(&mut hero, 0, &mut rng)?;
        assert!(battle.state().active_count() <= 4);
    }
    assert_eq!(battle.state().active_count(), 4);
    assert_eq!(battle.state().queue_len(), 3);
    assert_eq!(battle.outcome(), BattleOutcome::Ongoing);
    Ok(())
}

#[test]
fn test_variant_cooldown_and_cost() -> DelveResult<()> {
    let registry = ContentRegistry::builtin()?;
    let mut pyroblast = ConfiguredAbility::new(&registry, "fireball")?;
    pyroblast.select_variant("fireball_pyro")?;
    assert_eq!(pyroblast.final_cost(), 25.0);
    assert_eq!(pyroblast.final_cooldown(), 2);

    let mut mage = Character::new("Mage", CharacterClass::Mage);
    let mut rng = StdRng::seed_from_u64(3);
    let mut battle = Battle::start(punching_bag(), Vec::new(), &mut mage);
    let mana = mage.resource().current();

    battle.player_attack(&mut mage, &pyroblast, 0, &mut rng)?;
    assert!(mage.resource().current() < mana);
    assert_eq!(battle.cooldown("fireball"), 2);
    assert_eq!(
        battle.player_attack(&mut mage, &pyroblast, 0, &mut rng),
        Err(ActionError::OnCooldown { turns: 2 })
    );

    battle.basic_attack(&mut mage, 0, &mut rng)?;
    battle.basic_attack(&mut mage, 0, &mut rng)?;
    assert_eq!(battle.cooldown("fireball"), 0);
    battle.player_attack(&mut mage, &pyroblast, 0, &mut rng)?;
    Ok(())
}

#[test]
fn test_empty_slot_is_not_a_target() {
    let mut hero = Character::new("Hero", CharacterClass::Rogue);
    let mut rng = StdRng::seed_from_u64(4);
    let mut battle = Battle::start(punching_bag(), Vec::new(), &mut hero);
    assert_eq!(
        battle.basic_attack(&mut hero, 3, &mut rng),
        Err(ActionError::InvalidTarget)
    );
    assert_eq!(battle.turn(), 0);
}

#[test]
fn test_victory_waits_for_queued_reinforcements() -> DelveResult<()> {
    let mut hero = Character::new("Hero", CharacterClass::Warrior);
    let mut rng = StdRng::seed_from_u64(21);
    let frail = || {
        let mut enemy = punching_bag();
        enemy.max_health = 1;
        enemy.health = 1;
        enemy.defense = 0;
        enemy
    };
    let mut battle = Battle::start(frail(), vec![(frail(), 4)], &mut hero);

    let mut joined_on = None;
    for _ in 0..20 {
        let Some(target) = battle.first_target() else {
            break;
        };
        let report = battle.basic_attack(&mut hero, target, &mut rng)?;
        if !report.joined.is_empty() {
            assert_eq!(report.outcome, BattleOutcome::Ongoing);
            joined_on = Some(battle.turn());
        }
        if battle.is_over() {
            break;
        }
    }
    assert_eq!(joined_on, Some(8));
    assert_eq!(battle.outcome(), BattleOutcome::Victory);
    assert_eq!(battle.state().queue_len(), 0);
    assert_eq!(battle.take_defeated().len(), 2);
    Ok(())
}
