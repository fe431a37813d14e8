//! # Item Generation
//!
//! Loot for treasure rooms and shop stock: permanent equipment, temporary run items,
//! currencies and potions.

use super::{depth_scale, GenerationConfig, Generator};
use crate::{DelveError, DelveResult, Element, Item, ItemKind, Rarity, RunBonuses, Stat};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A temporary item that only lasts for the current run.
///
/// Run items with the same name stack; their bonuses are scaled by the stack count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunItem {
    pub name: String,
    pub rarity: Rarity,
    pub bonuses: RunBonuses,
}

impl RunItem {
    /// A run item granting a single flat stat bonus.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{RunItem, Stat};
    ///
    /// let item = RunItem::flat("Whetstone", Stat::Damage, 2);
    /// assert_eq!(item.bonuses.flat(Stat::Damage), 2);
    /// ```
    pub fn flat(name: impl Into<String>, stat: Stat, value: i32) -> Self {
        let mut bonuses = RunBonuses::default();
        bonuses.flat.insert(stat, value);
        Self {
            name: name.into(),
            rarity: Rarity::Common,
            bonuses,
        }
    }

    pub fn percent(name: impl Into<String>, stat: Stat, value: f64) -> Self {
        let mut bonuses = RunBonuses::default();
        bonuses.percent.insert(stat, value);
        Self {
            name: name.into(),
            rarity: Rarity::Uncommon,
            bonuses,
        }
    }

    pub fn elemental(name: impl Into<String>, element: Element, value: i32) -> Self {
        let mut bonuses = RunBonuses::default();
        bonuses.elemental.insert(element, value);
        Self {
            name: name.into(),
            rarity: Rarity::Rare,
            bonuses,
        }
    }

    pub fn with_rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }
}

/// Every run item that can drop or be sold.
pub fn run_item_catalog() -> Vec<RunItem> {
    vec![
        RunItem::flat("Whetstone", Stat::Damage, 2),
        RunItem::flat("Iron Skin Tonic", Stat::Defense, 2),
        RunItem::flat("Lucky Coin", Stat::GoldFind, 10),
        RunItem::flat("Hawk Feather", Stat::HitChance, 3),
        RunItem::flat("Troll Blood", Stat::Health, 15),
        RunItem::percent("Berserker Charm", Stat::Damage, 10.0),
        RunItem::percent("Turtle Shell", Stat::Defense, 15.0),
        RunItem::percent("Sage Pendant", Stat::ExperienceGain, 15.0),
        RunItem::percent("Assassin Mark", Stat::CritChance, 20.0).with_rarity(Rarity::Rare),
        RunItem::elemental("Ember Shard", Element::Fire, 3),
        RunItem::elemental("Frost Shard", Element::Frost, 3),
        RunItem::elemental("Venom Gland", Element::Poison, 2),
        RunItem::elemental("Storm Core", Element::Lightning, 4).with_rarity(Rarity::Epic),
    ]
}

/// What a treasure room holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Treasure {
    pub gold: u64,
    pub scrap: u64,
    pub jewels: u64,
    pub items: Vec<Item>,
    pub run_items: Vec<RunItem>,
    /// Health potions
    pub potions: u32,
}

impl Treasure {
    pub fn is_empty(&self) -> bool {
        self.gold == 0
            && self.scrap == 0
            && self.jewels == 0
            && self.items.is_empty()
            && self.run_items.is_empty()
            && self.potions == 0
    }
}

/// A run item for sale in a shop room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopOffer {
    pub item: RunItem,
    pub price: u64,
}

/// Equipment name pools by kind.
const EQUIPMENT_TABLE: &[(ItemKind, &[&str])] = &[
    (ItemKind::OneHandedWeapon, &["Short Sword", "Hand Axe", "Mace"]),
    (ItemKind::TwoHandedWeapon, &["Greatsword", "War Hammer", "Quarterstaff"]),
    (ItemKind::Shield, &["Buckler", "Kite Shield"]),
    (ItemKind::OffHand, &["Spell Tome", "Parrying Dagger"]),
    (ItemKind::Helmet, &["Leather Cap", "Iron Helm"]),
    (ItemKind::ChestArmor, &["Padded Vest", "Chain Shirt"]),
    (ItemKind::Leggings, &["Wool Trousers", "Greaves"]),
    (ItemKind::Gloves, &["Grips", "Gauntlets"]),
    (ItemKind::Boots, &["Sandals", "Sabatons"]),
    (ItemKind::Ring, &["Copper Band", "Signet Ring"]),
    (ItemKind::Amulet, &["Bone Charm", "Silver Locket"]),
];

/// Rolls equipment, run items and currencies scaled by depth.
#[derive(Debug, Clone)]
pub struct LootGenerator {
    pub config: GenerationConfig,
}

impl LootGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    fn roll_rarity(depth: u32, rng: &mut StdRng) -> Rarity {
        let roll = rng.gen_range(0.0..100.0) + depth as f64 * 2.0;
        match roll {
            r if r >= 110.0 => Rarity::Legendary,
            r if r >= 95.0 => Rarity::Epic,
            r if r >= 80.0 => Rarity::Rare,
            r if r >= 55.0 => Rarity::Uncommon,
            _ => Rarity::Common,
        }
    }

    /// A random equippable item with bonuses that fit its kind.
    pub fn random_equipment(&self, depth: u32, rng: &mut StdRng) -> Item {
        let (kind, names) = EQUIPMENT_TABLE[rng.gen_range(0..EQUIPMENT_TABLE.len())];
        let name = names.choose(rng).copied().unwrap_or("Trinket");
        let rarity = Self::roll_rarity(depth, rng);
        let power = ((1 + rarity as i32) as f64 * depth_scale(depth)).round() as i32;

        let mut item = Item::new(name, kind)
            .with_rarity(rarity)
            .with_required_level(depth.saturating_sub(1).max(1))
            .with_value(10 * power as u64 + depth as u64 * 5);
        item = match kind {
            ItemKind::OneHandedWeapon => item.with_bonus(Stat::Damage, 2 + power),
            ItemKind::TwoHandedWeapon => item
                .with_bonus(Stat::Damage, 4 + power * 2)
                .with_bonus(Stat::Strength, power),
            ItemKind::Shield => item.with_bonus(Stat::Defense, 2 + power),
            ItemKind::OffHand => item.with_bonus(Stat::Intelligence, 1 + power),
            ItemKind::Helmet | ItemKind::Leggings | ItemKind::Boots => {
                item.with_bonus(Stat::Defense, 1 + power / 2)
            }
            ItemKind::ChestArmor => item
                .with_bonus(Stat::Defense, 2 + power)
                .with_bonus(Stat::Health, 5 * power),
            ItemKind::Gloves => item.with_bonus(Stat::Dexterity, 1 + power / 2),
            ItemKind::Ring => item.with_bonus(Stat::CritChance, power),
            ItemKind::Amulet => item.with_bonus(Stat::Resource, 5 * power),
        };
        item
    }

    /// A random run item from the catalog.
    pub fn random_run_item(&self, rng: &mut StdRng) -> RunItem {
        run_item_catalog()
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| RunItem::flat("Whetstone", Stat::Damage, 2))
    }

    /// Three to four distinct run items priced by rarity and depth.
    pub fn shop_stock(&self, depth: u32, rng: &mut StdRng) -> Vec<ShopOffer> {
        let count = rng.gen_range(3..=4);
        run_item_catalog()
            .choose_multiple(rng, count)
            .map(|item| ShopOffer {
                price: Self::price_of(item, depth),
                item: item.clone(),
            })
            .collect()
    }

    pub fn price_of(item: &RunItem, depth: u32) -> u64 {
        let base = 20 + 15 * item.rarity as u64;
        (base as f64 * depth_scale(depth)).round() as u64
    }
}

impl Generator<Treasure> for LootGenerator {
    fn generate(&self, depth: u32, rng: &mut StdRng) -> DelveResult<Treasure> {
        let scale = depth_scale(depth);
        let mut treasure = Treasure {
            gold: (rng.gen_range(15..=35) as f64 * scale).round() as u64,
            scrap: rng.gen_range(0..=3) + depth as u64 / 2,
            ..Default::default()
        };
        if rng.gen_bool(0.25) {
            treasure.jewels = 1;
        }
        if rng.gen_bool(0.5) {
            treasure.items.push(self.random_equipment(depth, rng));
        }
        if rng.gen_bool(0.6) {
            treasure.run_items.push(self.random_run_item(rng));
        }
        if rng.gen_bool(0.3) {
            treasure.potions = 1;
        }
        Ok(treasure)
    }

    fn validate(&self, content: &Treasure) -> DelveResult<()> {
        if content.is_empty() {
            return Err(DelveError::GenerationFailed(
                "treasure room holds nothing".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "LootGenerator"
    }
}
