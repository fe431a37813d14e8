//! Character stat invariants under arbitrary inputs.

use delve::{
    AttributeKind, Character, CharacterClass, EquipmentSlot, Item, ItemKind, LevelCurve, Stat,
    StatMap,
};
use proptest::prelude::*;

fn class_strategy() -> impl Strategy<Value = CharacterClass> {
    prop_oneof![
        Just(CharacterClass::Warrior),
        Just(CharacterClass::Rogue),
        Just(CharacterClass::Mage),
    ]
}

proptest! {
    #[test]
    fn prop_health_stays_in_bounds(
        class in class_strategy(),
        hits in prop::collection::vec(0i32..400, 1..20),
        heals in prop::collection::vec(-50i32..400, 1..20),
    ) {
        let mut hero = Character::new("Prop", class);
        for (hit, heal) in hits.iter().zip(heals.iter()) {
            hero.receive_hit(*hit, 0);
            prop_assert!(hero.health() >= 0);
            let healed = hero.heal(*heal);
            prop_assert!(healed >= 0);
            prop_assert!(hero.health() <= hero.max_health());
        }
    }

    #[test]
    fn prop_enemy_hits_always_land(raw in 0i32..300) {
        let mut hero = Character::new("Prop", CharacterClass::Warrior);
        let before = hero.health();
        let expected = (raw - hero.effective_defense()).max(1).min(before);
        prop_assert_eq!(hero.receive_hit(raw, 0), expected);
        prop_assert_eq!(hero.health(), before - expected);
    }

    #[test]
    fn prop_recalc_is_idempotent(
        class in class_strategy(),
        xp in 0u64..5_000,
        damage_bonus in -5i32..30,
        buff in 0i32..10,
    ) {
        let mut hero = Character::new("Prop", class);
        hero.gain_experience(xp);
        hero.add_to_inventory(Item::new("Blade", ItemKind::OneHandedWeapon).with_bonus(Stat::Damage, damage_bonus));
        hero.equip_from_inventory(0).unwrap();
        let mut modifiers = StatMap::new();
        modifiers.insert(Stat::Dexterity, buff);
        hero.apply_buff("Focus", modifiers, 3);

        let first = hero.recalc_derived_stats();
        let second = hero.recalc_derived_stats();
        prop_assert_eq!(first, second);
        prop_assert!(hero.health() <= hero.max_health());
    }

    #[test]
    fn prop_chances_respect_caps(dex in 0i32..1_000) {
        let mut hero = Character::new("Prop", CharacterClass::Rogue);
        hero.add_to_inventory(Item::new("Gloves", ItemKind::Gloves).with_bonus(Stat::Dexterity, dex));
        hero.equip_from_inventory(0).unwrap();
        prop_assert!(hero.hit_chance() <= 95.0);
        prop_assert!(hero.crit_chance() <= 95.0);
        prop_assert!(hero.dodge_chance() <= 75.0);
    }
}

#[test]
fn test_three_and_a_half_levels_of_experience() {
    let mut hero =
        Character::new("Hero", CharacterClass::Warrior).with_level_curve(LevelCurve::flat(100));
    assert_eq!(hero.gain_experience(350), 3);
    assert_eq!(hero.level(), 4);
    assert_eq!(hero.experience(), 50);
}

#[test]
fn test_strength_and_flat_damage() {
    let mut hero = Character::new("Hero", CharacterClass::Warrior);
    assert_eq!(hero.effective_attribute(AttributeKind::Strength), 10);
    hero.add_to_inventory(Item::new("Axe", ItemKind::OneHandedWeapon).with_bonus(Stat::Damage, 5));
    hero.equip_from_inventory(0).unwrap();
    assert_eq!(hero.base_damage(), 25);
    assert_eq!(hero.total_damage(), 25);
}

#[test]
fn test_two_handed_weapon_clears_off_hand() {
    let mut hero = Character::new("Hero", CharacterClass::Warrior);
    hero.add_to_inventory(Item::new("Shield", ItemKind::Shield).with_bonus(Stat::Defense, 3));
    hero.equip_from_inventory(0).unwrap();
    let shielded = hero.effective_defense();

    hero.add_to_inventory(Item::new("Maul", ItemKind::TwoHandedWeapon).with_bonus(Stat::Damage, 8));
    hero.equip_from_inventory(0).unwrap();
    assert!(hero.equipped(EquipmentSlot::OffHand).is_none());
    assert_eq!(hero.effective_defense(), shielded - 3);
    assert_eq!(hero.inventory().len(), 1);
    assert_eq!(hero.inventory()[0].name, "Shield");
}
