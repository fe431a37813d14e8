//! Runs from start to finish, across the boundary to the persistent ledger.

use delve::{
    ActionError, Autopilot, AutopilotConfig, Battle, Character, CharacterClass, ContentRegistry,
    DelveResult, Direction, DungeonProgression, DungeonRun, RoomGridGenerator, RunOutcome,
    UpgradeType,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn begin(progression: &DungeonProgression, seed: u64) -> DelveResult<(DungeonRun, StdRng)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let run = DungeonRun::begin(
        Character::new("Tester", CharacterClass::Warrior),
        progression,
        &RoomGridGenerator::for_testing(seed),
        1,
        &mut rng,
    )?;
    Ok((run, rng))
}

fn start_battle(run: &mut DungeonRun) {
    for _ in 0..200 {
        if run.battle().is_some() {
            return;
        }
        if run.engage_current_room().is_err() {
            run.tick_encounter(None, 500).unwrap();
        }
    }
    panic!("no battle started");
}

#[test]
fn test_permanent_upgrades_apply_only_during_runs() -> DelveResult<()> {
    let base_health = Character::new("Tester", CharacterClass::Warrior).max_health();
    let mut progression = DungeonProgression::new();
    progression.add_tokens(100);
    progression.purchase_upgrade(UpgradeType::Vitality)?;

    let (mut run, _) = begin(&progression, 11)?;
    assert_eq!(run.character().max_health(), base_health + 10);
    assert_eq!(run.character().health(), run.character().max_health());

    run.escape_successfully()?;
    assert_eq!(run.into_character().max_health(), base_health);
    Ok(())
}

#[test]
fn test_fleeing_keeps_the_run_alive() -> DelveResult<()> {
    let (mut run, mut rng) = begin(&DungeonProgression::new(), 12)?;
    run.move_to(Direction::East)?;
    start_battle(&mut run);

    run.flee_battle(&mut rng)?;
    assert!(run.battle().is_none());
    assert!(!run.is_over());
    assert!(!run.map().current_room().is_some_and(|r| r.cleared));
    assert_eq!(run.flee_battle(&mut rng), Err(ActionError::BattleInactive));
    Ok(())
}

#[test]
fn test_leaving_mid_battle_is_refused() -> DelveResult<()> {
    let (mut run, mut rng) = begin(&DungeonProgression::new(), 13)?;
    run.move_to(Direction::East)?;
    start_battle(&mut run);

    let target = run.battle().and_then(Battle::first_target).unwrap_or(0);
    run.battle_attack(None, target, &mut rng)?;
    if run.battle().is_some() {
        assert_eq!(
            run.move_to(Direction::West),
            Err(ActionError::BattleInProgress)
        );
    }
    Ok(())
}

#[test]
fn test_ledger_accumulates_over_autopiloted_runs() -> DelveResult<()> {
    let registry = ContentRegistry::builtin()?;
    let generator = RoomGridGenerator::for_testing(21);
    let mut rng = StdRng::seed_from_u64(21);
    let mut progression = DungeonProgression::new();
    let mut character = Character::new("Tester", CharacterClass::Rogue);
    let mut earned = 0;

    for _ in 0..3 {
        let gold_before = character.gold();
        let mut run = DungeonRun::begin(character, &progression, &generator, 1, &mut rng)?;
        let mut pilot = Autopilot::new(
            registry.clone(),
            AutopilotConfig {
                target_depth: 2,
                ..AutopilotConfig::default()
            },
        );
        let summary = pilot.play(&mut run, &mut rng)?;
        character = run.into_character();
        earned += progression.record_run_completion(&summary);

        // Rewards banked by descending survive a later death; the rest is lost.
        assert_eq!(character.gold(), gold_before + summary.gold_committed);
        if summary.outcome == RunOutcome::Escaped {
            assert!(summary.is_victory());
        }
        assert!(character.run_bonuses().is_empty());
    }

    assert_eq!(progression.stats().runs, 3);
    assert_eq!(progression.tokens(), earned);
    assert!(progression.stats().deepest_depth >= 1);
    Ok(())
}
