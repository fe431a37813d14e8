//! Talent modifiers and the side-effect flags they carry.
//!
//! A [`Modifier`] adjusts numbers (multiplier first, then flat) and may switch on
//! effects. Effects are only described here; the battle engine executes them.

use serde::{Deserialize, Serialize};

/// A damage-over-time payload (bleed, burn, poison).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DotSpec {
    pub damage_per_turn: i32,
    pub turns: u32,
}

/// Lowers the target's defense for a while.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmorReduction {
    pub amount: i32,
    pub turns: u32,
}

/// Jumps to additional enemies at a fraction of the original damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub jumps: u32,
    pub damage_fraction: f64,
}

/// Bonus damage against targets below a health fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecuteSpec {
    pub threshold: f64,
    pub multiplier: f64,
}

/// Triggers when the ability lands a killing blow.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OnKillSpec {
    pub refund_resource: i32,
    pub heal_percent: f64,
    pub reset_cooldown: bool,
}

/// Target state that enables a conditional damage multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetCondition {
    /// Target has at least one damage-over-time or armor reduction on it
    Afflicted,
    /// Target is at full health
    Unharmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionalDamage {
    pub when: TargetCondition,
    pub multiplier: f64,
}

/// Side-effect flags as parameter-carrying options. `None` means off.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectFlags {
    pub bleed: Option<DotSpec>,
    pub burn: Option<DotSpec>,
    pub poison: Option<DotSpec>,
    pub armor_reduction: Option<ArmorReduction>,
    pub chain: Option<ChainSpec>,
    /// Fraction of damage dealt returned as health
    pub lifesteal: Option<f64>,
    pub execute: Option<ExecuteSpec>,
    pub on_kill: Option<OnKillSpec>,
    pub conditional: Option<ConditionalDamage>,
}

impl EffectFlags {
    /// Layers `other` on top: set options replace, lifesteal adds up.
    pub fn merge(&mut self, other: &EffectFlags) {
        self.bleed = other.bleed.or(self.bleed);
        self.burn = other.burn.or(self.burn);
        self.poison = other.poison.or(self.poison);
        self.armor_reduction = other.armor_reduction.or(self.armor_reduction);
        self.chain = other.chain.or(self.chain);
        self.lifesteal = match (self.lifesteal, other.lifesteal) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.execute = other.execute.or(self.execute);
        self.on_kill = other.on_kill.or(self.on_kill);
        self.conditional = other.conditional.or(self.conditional);
    }

    pub fn is_empty(&self) -> bool {
        *self == EffectFlags::default()
    }
}

/// Numeric and effect adjustments supplied by a talent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub damage_multiplier: f64,
    pub flat_damage: f64,
    pub cost_multiplier: f64,
    pub flat_cost: f64,
    pub cooldown_multiplier: f64,
    pub flat_cooldown: f64,
    pub crit_bonus: f64,
    pub effects: EffectFlags,
}

impl Default for Modifier {
    fn default() -> Self {
        Self {
            damage_multiplier: 1.0,
            flat_damage: 0.0,
            cost_multiplier: 1.0,
            flat_cost: 0.0,
            cooldown_multiplier: 1.0,
            flat_cooldown: 0.0,
            crit_bonus: 0.0,
            effects: EffectFlags::default(),
        }
    }
}

impl Modifier {
    pub fn damage(multiplier: f64) -> Self {
        Self {
            damage_multiplier: multiplier,
            ..Self::default()
        }
    }

    pub fn flat_damage(amount: f64) -> Self {
        Self {
            flat_damage: amount,
            ..Self::default()
        }
    }

    pub fn cost(multiplier: f64) -> Self {
        Self {
            cost_multiplier: multiplier,
            ..Self::default()
        }
    }

    pub fn cooldown(flat: f64) -> Self {
        Self {
            flat_cooldown: flat,
            ..Self::default()
        }
    }

    pub fn crit(bonus: f64) -> Self {
        Self {
            crit_bonus: bonus,
            ..Self::default()
        }
    }

    pub fn with_effects(mut self, effects: EffectFlags) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_damage(mut self, multiplier: f64) -> Self {
        self.damage_multiplier = multiplier;
        self
    }

    pub fn with_cost(mut self, multiplier: f64) -> Self {
        self.cost_multiplier = multiplier;
        self
    }

    pub fn apply_damage(&self, value: f64) -> f64 {
        value * self.damage_multiplier + self.flat_damage
    }

    pub fn apply_cost(&self, value: f64) -> f64 {
        value * self.cost_multiplier + self.flat_cost
    }

    pub fn apply_cooldown(&self, value: f64) -> f64 {
        value * self.cooldown_multiplier + self.flat_cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_then_flat() {
        let m = Modifier {
            damage_multiplier: 2.0,
            flat_damage: 3.0,
            ..Modifier::default()
        };
        assert_eq!(m.apply_damage(10.0), 23.0);
        assert_eq!(Modifier::default().apply_cost(7.0), 7.0);
        assert_eq!(Modifier::cooldown(-1.0).apply_cooldown(3.0), 2.0);
    }

    #[test]
    fn test_effect_merge() {
        let mut base = EffectFlags {
            lifesteal: Some(0.1),
            bleed: Some(DotSpec {
                damage_per_turn: 2,
                turns: 3,
            }),
            ..EffectFlags::default()
        };
        let talent = EffectFlags {
            lifesteal: Some(0.05),
            bleed: Some(DotSpec {
                damage_per_turn: 4,
                turns: 2,
            }),
            ..EffectFlags::default()
        };
        base.merge(&talent);
        assert!((base.lifesteal.unwrap() - 0.15).abs() < 1e-9);
        assert_eq!(base.bleed.unwrap().damage_per_turn, 4);
        assert!(!base.is_empty());
        assert!(EffectFlags::default().is_empty());
    }
}
