//! A base ability with a chosen variant and talents, resolved to final numbers.

use super::content::{AbilityContent, BaseAbility, DamageType, DebuffSpec, Talent, Variant};
use super::modifier::EffectFlags;
use super::registry::ContentRegistry;
use crate::{config, ActionError, DelveError, DelveResult};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::sync::Arc;

/// Serializable record of a configured ability, stored on the character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySelection {
    pub ability_id: String,
    /// `None` selects the default variant
    pub variant_id: Option<String>,
    pub talent_ids: [Option<String>; config::TALENT_TIERS],
}

impl AbilitySelection {
    pub fn default_for(ability_id: &str) -> Self {
        Self {
            ability_id: ability_id.to_string(),
            variant_id: None,
            talent_ids: Default::default(),
        }
    }
}

/// Behaviour the battle engine executes, resolved from variant, base and talents.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEffects {
    pub targets: u32,
    pub hits: u32,
    pub self_damage_percent: f64,
    pub heal_percent: f64,
    pub hit_bonus: f64,
    pub damage_types: Vec<DamageType>,
    pub debuff_on_hit: Option<DebuffSpec>,
    pub flags: EffectFlags,
}

/// Final numbers of a configured ability. All numeric fields are non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalStats {
    pub damage: f64,
    pub cost: f64,
    pub cooldown: u32,
    pub crit_bonus: f64,
    pub effects: ResolvedEffects,
}

/// Base + variant + up to one talent per tier.
///
/// Final stats are computed on first access and cached until a selection changes.
///
/// # Examples
///
/// ```
/// use delve::{ConfiguredAbility, ContentRegistry};
///
/// let registry = ContentRegistry::builtin().unwrap();
/// let mut fireball = ConfiguredAbility::new(&registry, "fireball").unwrap();
/// let base = fireball.final_damage();
/// fireball.select_talent(1, 1).unwrap(); // Searing: +15% damage
/// assert!(fireball.final_damage() > base);
/// ```
#[derive(Debug, Clone)]
pub struct ConfiguredAbility {
    content: Arc<AbilityContent>,
    variant: usize,
    talents: [Option<usize>; config::TALENT_TIERS],
    cache: OnceCell<FinalStats>,
}

impl ConfiguredAbility {
    /// Configures `ability_id` with its default variant and no talents.
    pub fn new(registry: &ContentRegistry, ability_id: &str) -> DelveResult<Self> {
        let content = registry.handle(ability_id)?;
        let variant = content
            .variants
            .iter()
            .position(|v| v.is_default)
            .ok_or_else(|| {
                DelveError::InvalidState(format!("{ability_id} has no default variant"))
            })?;
        Ok(Self {
            content,
            variant,
            talents: [None; config::TALENT_TIERS],
            cache: OnceCell::new(),
        })
    }

    /// Rebuilds a configured ability from its saved selection.
    pub fn from_selection(
        registry: &ContentRegistry,
        selection: &AbilitySelection,
    ) -> DelveResult<Self> {
        let mut ability = Self::new(registry, &selection.ability_id)?;
        if let Some(variant_id) = &selection.variant_id {
            ability
                .select_variant(variant_id)
                .map_err(|_| DelveError::UnknownContent(variant_id.clone()))?;
        }
        for (tier_index, talent_id) in selection.talent_ids.iter().enumerate() {
            let Some(talent_id) = talent_id else { continue };
            let tier = tier_index + 1;
            let index = ability
                .tier_choices(tier)
                .position(|t| &t.id == talent_id)
                .ok_or_else(|| DelveError::UnknownContent(talent_id.clone()))?;
            ability.talents[tier_index] = Some(index);
        }
        Ok(ability)
    }

    /// The serializable form of the current choices.
    pub fn selection(&self) -> AbilitySelection {
        let mut talent_ids: [Option<String>; config::TALENT_TIERS] = Default::default();
        for (tier_index, slot) in talent_ids.iter_mut().enumerate() {
            *slot = self.selected_talent(tier_index + 1).map(|t| t.id.clone());
        }
        let variant = self.variant();
        AbilitySelection {
            ability_id: self.content.base.id.clone(),
            variant_id: (!variant.is_default).then(|| variant.id.clone()),
            talent_ids,
        }
    }

    pub fn id(&self) -> &str {
        &self.content.base.id
    }

    pub fn base(&self) -> &BaseAbility {
        &self.content.base
    }

    pub fn variant(&self) -> &Variant {
        &self.content.variants[self.variant]
    }

    fn tier_choices(&self, tier: usize) -> impl Iterator<Item = &Talent> {
        self.content.talents.iter().filter(move |t| t.tier == tier)
    }

    pub fn selected_talent(&self, tier: usize) -> Option<&Talent> {
        let index = (*self.talents.get(tier.checked_sub(1)?)?)?;
        self.tier_choices(tier).nth(index)
    }

    pub fn select_variant(&mut self, variant_id: &str) -> Result<(), ActionError> {
        let index = self
            .content
            .variants
            .iter()
            .position(|v| v.id == variant_id)
            .ok_or_else(|| ActionError::InvalidSelection(format!("no variant {variant_id}")))?;
        if index != self.variant {
            self.variant = index;
            self.cache = OnceCell::new();
        }
        Ok(())
    }

    /// Picks choice `index` (0-based) in `tier` (1-based), replacing any earlier pick.
    pub fn select_talent(&mut self, tier: usize, index: usize) -> Result<(), ActionError> {
        if tier == 0 || tier > config::TALENT_TIERS {
            return Err(ActionError::InvalidSelection(format!("no tier {tier}")));
        }
        if index >= self.tier_choices(tier).count() {
            return Err(ActionError::InvalidSelection(format!(
                "tier {tier} has no choice {index}"
            )));
        }
        self.talents[tier - 1] = Some(index);
        self.cache = OnceCell::new();
        Ok(())
    }

    pub fn clear_talent(&mut self, tier: usize) {
        if let Some(slot) = tier.checked_sub(1).and_then(|i| self.talents.get_mut(i)) {
            if slot.take().is_some() {
                self.cache = OnceCell::new();
            }
        }
    }

    /// Final stats, computed once per selection change.
    pub fn final_stats(&self) -> &FinalStats {
        self.cache.get_or_init(|| self.compute())
    }

    pub fn final_damage(&self) -> f64 {
        self.final_stats().damage
    }

    pub fn final_cost(&self) -> f64 {
        self.final_stats().cost
    }

    pub fn final_cooldown(&self) -> u32 {
        self.final_stats().cooldown
    }

    pub fn final_crit_bonus(&self) -> f64 {
        self.final_stats().crit_bonus
    }

    pub fn final_effects(&self) -> &ResolvedEffects {
        &self.final_stats().effects
    }

    fn compute(&self) -> FinalStats {
        let base = &self.content.base;
        let variant = self.variant();

        let mut damage = variant.damage.unwrap_or(base.damage);
        let mut cost = variant.cost.unwrap_or(base.cost);
        let mut cooldown = variant.cooldown.unwrap_or(base.cooldown) as f64;
        let mut crit_bonus = 0.0;
        let mut flags = variant.effects;

        for tier in 1..=config::TALENT_TIERS {
            if let Some(talent) = self.selected_talent(tier) {
                let m = &talent.modifier;
                damage = m.apply_damage(damage);
                cost = m.apply_cost(cost);
                cooldown = m.apply_cooldown(cooldown);
                crit_bonus += m.crit_bonus;
                flags.merge(&m.effects);
            }
        }

        FinalStats {
            damage: damage.max(0.0),
            cost: cost.max(0.0),
            cooldown: cooldown.max(0.0).round() as u32,
            crit_bonus: crit_bonus.max(0.0),
            effects: ResolvedEffects {
                targets: variant.targets.max(1),
                hits: variant.hits.max(1),
                self_damage_percent: variant.self_damage_percent.max(0.0),
                heal_percent: variant.heal_percent.max(0.0),
                hit_bonus: base.hit_bonus,
                damage_types: base.damage_types.clone(),
                debuff_on_hit: base.debuff_on_hit.clone(),
                flags,
            },
        }
    }
}
