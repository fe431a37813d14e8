//! Ability content: bases, variants and talents, plus the built-in catalog.

use super::modifier::*;
use crate::{AttributeKind, CharacterClass, Stat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Physical,
    Fire,
    Frost,
    Poison,
    Arcane,
}

/// A stat penalty the base ability puts on whatever it hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebuffSpec {
    pub name: String,
    pub stat: Stat,
    pub value: i32,
    pub turns: u32,
}

/// Immutable definition of an ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseAbility {
    pub id: String,
    pub name: String,
    pub class: CharacterClass,
    pub unlock_level: u32,
    pub damage: f64,
    pub damage_types: Vec<DamageType>,
    pub cost: f64,
    pub cooldown: u32,
    /// Added to the user's hit chance, in percentage points
    pub hit_bonus: f64,
    /// Extra damage per point of attribute
    pub scaling: BTreeMap<AttributeKind, f64>,
    pub debuff_on_hit: Option<DebuffSpec>,
}

/// An alternate shape of an ability. Unset numbers fall back to the base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub damage: Option<f64>,
    pub cost: Option<f64>,
    pub cooldown: Option<u32>,
    /// Enemies struck per use
    pub targets: u32,
    /// Strikes per target
    pub hits: u32,
    /// Percent of the user's max health lost per use
    pub self_damage_percent: f64,
    /// Percent of the user's max health restored per use
    pub heal_percent: f64,
    pub effects: EffectFlags,
}

impl Variant {
    pub fn default_for(ability_id: &str, name: &str) -> Self {
        Self {
            id: format!("{ability_id}_default"),
            name: name.to_string(),
            is_default: true,
            damage: None,
            cost: None,
            cooldown: None,
            targets: 1,
            hits: 1,
            self_damage_percent: 0.0,
            heal_percent: 0.0,
            effects: EffectFlags::default(),
        }
    }

    fn alt(ability_id: &str, suffix: &str, name: &str) -> Self {
        Self {
            id: format!("{ability_id}_{suffix}"),
            is_default: false,
            ..Self::default_for(ability_id, name)
        }
    }
}

/// One choice within a talent tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talent {
    pub id: String,
    pub name: String,
    /// 1-based tier
    pub tier: usize,
    pub modifier: Modifier,
}

/// Everything the registry knows about one ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityContent {
    pub base: BaseAbility,
    pub variants: Vec<Variant>,
    pub talents: Vec<Talent>,
}

#[allow(clippy::too_many_arguments)]
fn base(
    id: &str,
    name: &str,
    class: CharacterClass,
    unlock_level: u32,
    damage: f64,
    damage_types: &[DamageType],
    cost: f64,
    cooldown: u32,
) -> BaseAbility {
    BaseAbility {
        id: id.to_string(),
        name: name.to_string(),
        class,
        unlock_level,
        damage,
        damage_types: damage_types.to_vec(),
        cost,
        cooldown,
        hit_bonus: 0.0,
        scaling: BTreeMap::new(),
        debuff_on_hit: None,
    }
}

impl BaseAbility {
    fn scales(mut self, attribute: AttributeKind, per_point: f64) -> Self {
        self.scaling.insert(attribute, per_point);
        self
    }

    fn accurate(mut self, bonus: f64) -> Self {
        self.hit_bonus = bonus;
        self
    }

    fn debuff(mut self, name: &str, stat: Stat, value: i32, turns: u32) -> Self {
        self.debuff_on_hit = Some(DebuffSpec {
            name: name.to_string(),
            stat,
            value,
            turns,
        });
        self
    }
}

/// Lays nine named modifiers out as three tiers of three.
fn tiers(ability_id: &str, picks: [(&str, Modifier); 9]) -> Vec<Talent> {
    picks
        .into_iter()
        .enumerate()
        .map(|(i, (name, modifier))| {
            let tier = i / 3 + 1;
            Talent {
                id: format!("{ability_id}_t{tier}_{}", i % 3 + 1),
                name: name.to_string(),
                tier,
                modifier,
            }
        })
        .collect()
}

fn dot(damage_per_turn: i32, turns: u32) -> Option<DotSpec> {
    Some(DotSpec {
        damage_per_turn,
        turns,
    })
}

fn effects(f: impl FnOnce(&mut EffectFlags)) -> EffectFlags {
    let mut flags = EffectFlags::default();
    f(&mut flags);
    flags
}

fn with(modifier: Modifier, f: impl FnOnce(&mut EffectFlags)) -> Modifier {
    modifier.with_effects(effects(f))
}

/// The shipped catalog: three abilities per class.
pub fn builtin_catalog() -> Vec<AbilityContent> {
    use AttributeKind::*;
    use CharacterClass::*;
    use DamageType::*;

    vec![
        // ---------------------------------------------------------------- Warrior
        AbilityContent {
            base: base("cleave", "Cleave", Warrior, 1, 8.0, &[Physical], 10.0, 0)
                .scales(Strength, 0.5),
            variants: vec![
                Variant::default_for("cleave", "Cleave"),
                Variant {
                    damage: Some(6.0),
                    targets: 2,
                    ..Variant::alt("cleave", "sweep", "Sweeping Cleave")
                },
                Variant {
                    damage: Some(14.0),
                    cost: Some(20.0),
                    self_damage_percent: 5.0,
                    ..Variant::alt("cleave", "reckless", "Reckless Cleave")
                },
            ],
            talents: tiers(
                "cleave",
                [
                    ("Honed Edge", Modifier::damage(1.15)),
                    ("Lacerate", with(Modifier::default(), |e| e.bleed = dot(3, 3))),
                    ("Economy of Motion", Modifier::cost(0.7)),
                    ("Heavy Swing", Modifier::flat_damage(4.0)),
                    ("Keen Eye", Modifier::crit(10.0)),
                    ("Bloodthirst", with(Modifier::default(), |e| e.lifesteal = Some(0.1))),
                    (
                        "Butcher",
                        with(Modifier::default(), |e| {
                            e.execute = Some(ExecuteSpec {
                                threshold: 0.25,
                                multiplier: 1.5,
                            })
                        }),
                    ),
                    (
                        "Momentum",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                refund_resource: 10,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    ("Rampage", Modifier::damage(1.25).with_cost(1.3)),
                ],
            ),
        },
        AbilityContent {
            base: base("shield_bash", "Shield Bash", Warrior, 3, 6.0, &[Physical], 15.0, 2)
                .scales(Defense, 0.8)
                .debuff("Dazed", Stat::Damage, -3, 2),
            variants: vec![
                Variant::default_for("shield_bash", "Shield Bash"),
                Variant {
                    cooldown: Some(3),
                    heal_percent: 8.0,
                    ..Variant::alt("shield_bash", "bulwark", "Bulwark Bash")
                },
            ],
            talents: tiers(
                "shield_bash",
                [
                    (
                        "Sunder",
                        with(Modifier::default(), |e| {
                            e.armor_reduction = Some(ArmorReduction {
                                amount: 3,
                                turns: 3,
                            })
                        }),
                    ),
                    ("Spiked Shield", Modifier::flat_damage(5.0)),
                    ("Quick Recovery", Modifier::cooldown(-1.0)),
                    ("Concussive", Modifier::damage(1.2)),
                    ("Steady Hand", Modifier::cost(0.6)),
                    ("Precision", Modifier::crit(8.0)),
                    (
                        "Punish",
                        with(Modifier::default(), |e| {
                            e.conditional = Some(ConditionalDamage {
                                when: TargetCondition::Afflicted,
                                multiplier: 1.4,
                            })
                        }),
                    ),
                    (
                        "Second Wind",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                heal_percent: 10.0,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    ("Overpower", Modifier::damage(1.35).with_cost(1.25)),
                ],
            ),
        },
        AbilityContent {
            base: base("whirlwind", "Whirlwind", Warrior, 6, 10.0, &[Physical], 30.0, 3)
                .scales(Strength, 0.6),
            variants: vec![
                Variant {
                    targets: 3,
                    ..Variant::default_for("whirlwind", "Whirlwind")
                },
                Variant {
                    damage: Some(7.0),
                    targets: 4,
                    hits: 2,
                    cost: Some(45.0),
                    ..Variant::alt("whirlwind", "tempest", "Bladestorm")
                },
            ],
            talents: tiers(
                "whirlwind",
                [
                    ("Razor Wind", Modifier::damage(1.15)),
                    ("Efficient Spin", Modifier::cost(0.75)),
                    ("Tireless", Modifier::cooldown(-1.0)),
                    ("Blood Spin", with(Modifier::default(), |e| e.lifesteal = Some(0.08))),
                    ("Rending Spin", with(Modifier::default(), |e| e.bleed = dot(2, 3))),
                    ("Focus", Modifier::crit(6.0)),
                    (
                        "Unstoppable",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                reset_cooldown: true,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    ("Heavy Blades", Modifier::flat_damage(6.0)),
                    ("Fury", Modifier::damage(1.3).with_cost(1.2)),
                ],
            ),
        },
        // ---------------------------------------------------------------- Rogue
        AbilityContent {
            base: base("backstab", "Backstab", Rogue, 1, 9.0, &[Physical], 25.0, 0)
                .scales(Dexterity, 0.6)
                .accurate(5.0),
            variants: vec![
                Variant::default_for("backstab", "Backstab"),
                Variant {
                    damage: Some(5.0),
                    hits: 2,
                    ..Variant::alt("backstab", "twin", "Twin Stab")
                },
            ],
            talents: tiers(
                "backstab",
                [
                    ("Sharpened", Modifier::damage(1.15)),
                    ("Light Step", Modifier::cost(0.8)),
                    ("Serrated", with(Modifier::default(), |e| e.bleed = dot(3, 3))),
                    ("Vital Points", Modifier::crit(12.0)),
                    (
                        "Ambush",
                        with(Modifier::default(), |e| {
                            e.conditional = Some(ConditionalDamage {
                                when: TargetCondition::Unharmed,
                                multiplier: 1.5,
                            })
                        }),
                    ),
                    ("Heavy Hilt", Modifier::flat_damage(4.0)),
                    (
                        "Assassinate",
                        with(Modifier::default(), |e| {
                            e.execute = Some(ExecuteSpec {
                                threshold: 0.3,
                                multiplier: 2.0,
                            })
                        }),
                    ),
                    (
                        "Opportunist",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                refund_resource: 20,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    ("Cold Blood", Modifier::damage(1.3).with_cost(1.25)),
                ],
            ),
        },
        AbilityContent {
            base: base("poison_blade", "Poison Blade", Rogue, 3, 5.0, &[Physical, Poison], 30.0, 2)
                .scales(Dexterity, 0.4)
                .debuff("Weakened", Stat::Defense, -2, 2),
            variants: vec![
                Variant {
                    effects: effects(|e| e.poison = dot(4, 3)),
                    ..Variant::default_for("poison_blade", "Poison Blade")
                },
                Variant {
                    targets: 2,
                    effects: effects(|e| e.poison = dot(2, 4)),
                    ..Variant::alt("poison_blade", "cloud", "Toxic Cloud")
                },
            ],
            talents: tiers(
                "poison_blade",
                [
                    ("Concentrated Venom", with(Modifier::default(), |e| e.poison = dot(6, 3))),
                    ("Thin Coat", Modifier::cost(0.75)),
                    ("Keen Blade", Modifier::damage(1.2)),
                    (
                        "Corrode",
                        with(Modifier::default(), |e| {
                            e.armor_reduction = Some(ArmorReduction {
                                amount: 2,
                                turns: 3,
                            })
                        }),
                    ),
                    ("Quick Hands", Modifier::cooldown(-1.0)),
                    ("Lethal Dose", Modifier::crit(8.0)),
                    (
                        "Exploit Weakness",
                        with(Modifier::default(), |e| {
                            e.conditional = Some(ConditionalDamage {
                                when: TargetCondition::Afflicted,
                                multiplier: 1.5,
                            })
                        }),
                    ),
                    ("Leech", with(Modifier::default(), |e| e.lifesteal = Some(0.15))),
                    ("Virulence", Modifier::damage(1.25).with_cost(1.2)),
                ],
            ),
        },
        AbilityContent {
            base: base("shadow_flurry", "Shadow Flurry", Rogue, 6, 4.0, &[Physical], 40.0, 3)
                .scales(Dexterity, 0.3),
            variants: vec![
                Variant {
                    hits: 3,
                    ..Variant::default_for("shadow_flurry", "Shadow Flurry")
                },
                Variant {
                    hits: 2,
                    targets: 2,
                    ..Variant::alt("shadow_flurry", "fan", "Fan of Knives")
                },
            ],
            talents: tiers(
                "shadow_flurry",
                [
                    ("Blur", Modifier::damage(1.15)),
                    ("Conserve", Modifier::cost(0.8)),
                    ("Shadowstep", Modifier::cooldown(-1.0)),
                    ("Deep Cuts", with(Modifier::default(), |e| e.bleed = dot(2, 2))),
                    ("Weak Spots", Modifier::crit(10.0)),
                    ("Weighted Knives", Modifier::flat_damage(2.0)),
                    (
                        "Killing Spree",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                reset_cooldown: true,
                                refund_resource: 10,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    (
                        "Ricochet",
                        with(Modifier::default(), |e| {
                            e.chain = Some(ChainSpec {
                                jumps: 1,
                                damage_fraction: 0.5,
                            })
                        }),
                    ),
                    ("Frenzy", Modifier::damage(1.3).with_cost(1.25)),
                ],
            ),
        },
        // ---------------------------------------------------------------- Mage
        AbilityContent {
            base: base("fireball", "Fireball", Mage, 1, 10.0, &[Fire], 12.0, 0)
                .scales(Intelligence, 0.7),
            variants: vec![
                Variant::default_for("fireball", "Fireball"),
                Variant {
                    damage: Some(7.0),
                    targets: 3,
                    cost: Some(20.0),
                    ..Variant::alt("fireball", "nova", "Flame Burst")
                },
                Variant {
                    damage: Some(18.0),
                    cooldown: Some(2),
                    cost: Some(25.0),
                    ..Variant::alt("fireball", "pyro", "Pyroblast")
                },
            ],
            talents: tiers(
                "fireball",
                [
                    ("Kindling", with(Modifier::default(), |e| e.burn = dot(3, 3))),
                    ("Searing", Modifier::damage(1.15)),
                    ("Frugal Casting", Modifier::cost(0.75)),
                    ("Critical Mass", Modifier::crit(10.0)),
                    ("Hot Streak", Modifier::flat_damage(5.0)),
                    (
                        "Combustion",
                        with(Modifier::default(), |e| {
                            e.conditional = Some(ConditionalDamage {
                                when: TargetCondition::Afflicted,
                                multiplier: 1.3,
                            })
                        }),
                    ),
                    (
                        "Wildfire",
                        with(Modifier::default(), |e| {
                            e.chain = Some(ChainSpec {
                                jumps: 2,
                                damage_fraction: 0.4,
                            })
                        }),
                    ),
                    (
                        "Soul Ember",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                refund_resource: 15,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    ("Inferno", Modifier::damage(1.35).with_cost(1.3)),
                ],
            ),
        },
        AbilityContent {
            base: base("frost_nova", "Frost Nova", Mage, 3, 6.0, &[Frost], 25.0, 3)
                .scales(Intelligence, 0.4)
                .debuff("Chilled", Stat::Damage, -2, 2),
            variants: vec![
                Variant {
                    targets: 4,
                    ..Variant::default_for("frost_nova", "Frost Nova")
                },
                Variant {
                    damage: Some(12.0),
                    targets: 1,
                    cooldown: Some(1),
                    ..Variant::alt("frost_nova", "lance", "Ice Lance")
                },
            ],
            talents: tiers(
                "frost_nova",
                [
                    ("Bitter Cold", Modifier::damage(1.2)),
                    ("Efficient Frost", Modifier::cost(0.7)),
                    ("Cold Snap", Modifier::cooldown(-1.0)),
                    (
                        "Brittle",
                        with(Modifier::default(), |e| {
                            e.armor_reduction = Some(ArmorReduction {
                                amount: 2,
                                turns: 2,
                            })
                        }),
                    ),
                    ("Shatter", Modifier::crit(12.0)),
                    ("Glacial Spike", Modifier::flat_damage(4.0)),
                    (
                        "Deep Freeze",
                        with(Modifier::default(), |e| {
                            e.execute = Some(ExecuteSpec {
                                threshold: 0.2,
                                multiplier: 2.0,
                            })
                        }),
                    ),
                    ("Frostbite", with(Modifier::default(), |e| e.bleed = dot(2, 3))),
                    ("Absolute Zero", Modifier::damage(1.3).with_cost(1.25)),
                ],
            ),
        },
        AbilityContent {
            base: base("arcane_barrage", "Arcane Barrage", Mage, 6, 5.0, &[Arcane], 35.0, 2)
                .scales(Intelligence, 0.35)
                .accurate(10.0),
            variants: vec![
                Variant {
                    hits: 3,
                    ..Variant::default_for("arcane_barrage", "Arcane Barrage")
                },
                Variant {
                    hits: 1,
                    damage: Some(8.0),
                    effects: effects(|e| {
                        e.chain = Some(ChainSpec {
                            jumps: 3,
                            damage_fraction: 0.6,
                        })
                    }),
                    ..Variant::alt("arcane_barrage", "arc", "Arc Lightning")
                },
                Variant {
                    hits: 2,
                    heal_percent: 5.0,
                    self_damage_percent: 0.0,
                    ..Variant::alt("arcane_barrage", "siphon", "Mana Siphon")
                },
            ],
            talents: tiers(
                "arcane_barrage",
                [
                    ("Arcane Focus", Modifier::damage(1.15)),
                    ("Clear Mind", Modifier::cost(0.75)),
                    ("Temporal Flux", Modifier::cooldown(-1.0)),
                    ("Overload", Modifier::crit(10.0)),
                    ("Siphon", with(Modifier::default(), |e| e.lifesteal = Some(0.1))),
                    ("Amplify", Modifier::flat_damage(3.0)),
                    (
                        "Arcane Echo",
                        with(Modifier::default(), |e| {
                            e.chain = Some(ChainSpec {
                                jumps: 1,
                                damage_fraction: 0.5,
                            })
                        }),
                    ),
                    (
                        "Mana Surge",
                        with(Modifier::default(), |e| {
                            e.on_kill = Some(OnKillSpec {
                                refund_resource: 20,
                                ..OnKillSpec::default()
                            })
                        }),
                    ),
                    ("Unstable Power", Modifier::damage(1.35).with_cost(1.3)),
                ],
            ),
        },
    ]
}
