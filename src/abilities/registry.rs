//! Load-once content registry.

use super::content::{builtin_catalog, AbilityContent, BaseAbility, Talent, Variant};
use crate::{config, CharacterClass, DelveError, DelveResult};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable map from ability id to its definition, variants and talents.
///
/// Built once, validated on construction, then shared behind an [`Arc`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRegistry {
    abilities: BTreeMap<String, Arc<AbilityContent>>,
}

impl ContentRegistry {
    /// The shipped catalog, validated.
    pub fn builtin() -> DelveResult<Arc<Self>> {
        Self::from_catalog(builtin_catalog()).map(Arc::new)
    }

    /// Builds a registry from a JSON array of [`AbilityContent`].
    pub fn from_json(json: &str) -> DelveResult<Arc<Self>> {
        let catalog: Vec<AbilityContent> = serde_json::from_str(json)?;
        Self::from_catalog(catalog).map(Arc::new)
    }

    pub fn from_catalog(catalog: Vec<AbilityContent>) -> DelveResult<Self> {
        let mut abilities = BTreeMap::new();
        for content in catalog {
            validate(&content)?;
            let id = content.base.id.clone();
            if abilities.insert(id.clone(), Arc::new(content)).is_some() {
                return Err(DelveError::InvalidState(format!(
                    "duplicate ability id {id}"
                )));
            }
        }
        debug!("Content registry loaded {} abilities", abilities.len());
        Ok(Self { abilities })
    }

    /// Shared handle to one ability's content, used by [`super::ConfiguredAbility`].
    pub fn handle(&self, id: &str) -> DelveResult<Arc<AbilityContent>> {
        self.abilities
            .get(id)
            .cloned()
            .ok_or_else(|| DelveError::UnknownContent(id.to_string()))
    }

    fn content(&self, id: &str) -> DelveResult<&AbilityContent> {
        self.abilities
            .get(id)
            .map(Arc::as_ref)
            .ok_or_else(|| DelveError::UnknownContent(id.to_string()))
    }

    pub fn ability(&self, id: &str) -> DelveResult<&BaseAbility> {
        self.content(id).map(|c| &c.base)
    }

    pub fn get_variants(&self, id: &str) -> DelveResult<&[Variant]> {
        self.content(id).map(|c| c.variants.as_slice())
    }

    pub fn get_talents(&self, id: &str) -> DelveResult<&[Talent]> {
        self.content(id).map(|c| c.talents.as_slice())
    }

    /// The three choices of one tier (1-based), in catalog order.
    pub fn talents_in_tier(&self, id: &str, tier: usize) -> DelveResult<Vec<&Talent>> {
        Ok(self
            .get_talents(id)?
            .iter()
            .filter(|t| t.tier == tier)
            .collect())
    }

    pub fn default_variant(&self, id: &str) -> DelveResult<&Variant> {
        self.get_variants(id)?
            .iter()
            .find(|v| v.is_default)
            .ok_or_else(|| DelveError::InvalidState(format!("{id} has no default variant")))
    }

    pub fn abilities_for_class(&self, class: CharacterClass) -> Vec<&BaseAbility> {
        let mut list: Vec<_> = self
            .abilities
            .values()
            .map(|c| &c.base)
            .filter(|b| b.class == class)
            .collect();
        list.sort_by_key(|b| b.unlock_level);
        list
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

fn validate(content: &AbilityContent) -> DelveResult<()> {
    let id = &content.base.id;
    let defaults = content.variants.iter().filter(|v| v.is_default).count();
    if defaults != 1 {
        return Err(DelveError::InvalidState(format!(
            "{id} must have exactly one default variant, found {defaults}"
        )));
    }
    if content.talents.len() != config::TALENT_TIERS * config::TALENTS_PER_TIER {
        return Err(DelveError::InvalidState(format!(
            "{id} must have {} talents, found {}",
            config::TALENT_TIERS * config::TALENTS_PER_TIER,
            content.talents.len()
        )));
    }
    for tier in 1..=config::TALENT_TIERS {
        let count = content.talents.iter().filter(|t| t.tier == tier).count();
        if count != config::TALENTS_PER_TIER {
            return Err(DelveError::InvalidState(format!(
                "{id} tier {tier} has {count} talents"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let registry = ContentRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 9);
        for class in CharacterClass::all() {
            let abilities = registry.abilities_for_class(class);
            assert_eq!(abilities.len(), 3);
            // every ability a class definition names exists in the catalog
            for (id, level) in class.definition().abilities {
                let base = registry.ability(id).unwrap();
                assert_eq!(base.unlock_level, *level);
            }
        }
    }

    #[test]
    fn test_talent_layout() {
        let registry = ContentRegistry::builtin().unwrap();
        assert_eq!(registry.get_talents("fireball").unwrap().len(), 9);
        for tier in 1..=3 {
            assert_eq!(registry.talents_in_tier("fireball", tier).unwrap().len(), 3);
        }
        assert_eq!(
            registry.default_variant("fireball").unwrap().id,
            "fireball_default"
        );
    }

    #[test]
    fn test_unknown_id() {
        let registry = ContentRegistry::builtin().unwrap();
        assert!(matches!(
            registry.ability("meteor"),
            Err(DelveError::UnknownContent(_))
        ));
    }

    #[test]
    fn test_rejects_two_defaults() {
        let mut catalog = builtin_catalog();
        catalog[0].variants[1].is_default = true;
        assert!(ContentRegistry::from_catalog(catalog).is_err());
    }

    #[test]
    fn test_json_catalog_round_trip() {
        let json = serde_json::to_string(&builtin_catalog()).unwrap();
        let registry = ContentRegistry::from_json(&json).unwrap();
        assert_eq!(*registry, *ContentRegistry::builtin().unwrap());
    }
}
