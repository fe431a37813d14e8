//! Account-level meta progression that outlives any single run.
//!
//! Runs report a [`RunSummary`] here; the ledger turns it into dungeon tokens, keeps
//! cumulative statistics, unlocks depth-gated content and sells permanent upgrades.

use crate::{config, ActionError, RunBonuses, Stat};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Left the dungeon alive with everything committed
    Escaped,
    /// Died; pending rewards were lost
    Died,
    /// Walked away; pending rewards were lost but no death is recorded
    Abandoned,
}

/// What a finished run reports to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub depth_reached: u32,
    pub enemies_killed: u32,
    pub bosses_killed: u32,
    pub rooms_cleared: u32,
    /// Gold handed to the character over the whole run
    pub gold_committed: u64,
    pub experience_committed: u64,
}

impl RunSummary {
    pub fn is_victory(&self) -> bool {
        self.outcome == RunOutcome::Escaped
    }

    /// Tokens this run is worth: `depth*10 + 50 on victory + kills*2`.
    pub fn tokens(&self) -> u64 {
        let victory = if self.is_victory() {
            config::VICTORY_TOKEN_BONUS
        } else {
            0
        };
        self.depth_reached as u64 * config::TOKENS_PER_DEPTH
            + victory
            + self.enemies_killed as u64 * config::TOKENS_PER_KILL
    }
}

/// Permanent upgrades bought with dungeon tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeType {
    /// Extra max health
    Vitality,
    /// Extra flat damage
    Might,
    /// Extra gold found
    Fortune,
    /// Extra experience gained
    Wisdom,
    /// Extra defense
    Resilience,
}

impl UpgradeType {
    pub fn all() -> [UpgradeType; 5] {
        [
            UpgradeType::Vitality,
            UpgradeType::Might,
            UpgradeType::Fortune,
            UpgradeType::Wisdom,
            UpgradeType::Resilience,
        ]
    }

    pub fn max_level(self) -> u32 {
        match self {
            UpgradeType::Vitality | UpgradeType::Might | UpgradeType::Resilience => 5,
            UpgradeType::Fortune | UpgradeType::Wisdom => 3,
        }
    }

    fn base_cost(self) -> u64 {
        match self {
            UpgradeType::Vitality => 40,
            UpgradeType::Might => 50,
            UpgradeType::Fortune | UpgradeType::Wisdom => 30,
            UpgradeType::Resilience => 60,
        }
    }

    /// Token price of going from `level` to `level + 1`. Strictly increasing in `level`.
    pub fn cost_at(self, level: u32) -> u64 {
        let scaled = self.base_cost() as f64 * 1.5_f64.powi(level as i32);
        scaled.round() as u64 + level as u64
    }

    /// The run bonus granted by `level` levels of this upgrade.
    pub fn bonuses(self, level: u32) -> RunBonuses {
        let mut bonuses = RunBonuses::default();
        if level == 0 {
            return bonuses;
        }
        let level_i = level as i32;
        match self {
            UpgradeType::Vitality => {
                bonuses.flat.insert(Stat::Health, 10 * level_i);
            }
            UpgradeType::Might => {
                bonuses.flat.insert(Stat::Damage, 2 * level_i);
            }
            UpgradeType::Fortune => {
                bonuses.percent.insert(Stat::GoldFind, 10.0 * level as f64);
            }
            UpgradeType::Wisdom => {
                bonuses.percent.insert(Stat::ExperienceGain, 10.0 * level as f64);
            }
            UpgradeType::Resilience => {
                bonuses.flat.insert(Stat::Defense, level_i);
            }
        }
        bonuses
    }
}

/// Content unlocked by reaching each depth.
const DEPTH_UNLOCKS: &[(u32, &[&str])] = &[
    (2, &["run_item:ember_shard", "run_item:frost_shard"]),
    (3, &["room:shop", "blessing:precision"]),
    (5, &["hazard:poison_gas", "ability:cleave_sweep"]),
    (7, &["run_item:storm_core"]),
    (10, &["title:deep_delver"]),
];

/// Cumulative statistics over every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionStats {
    pub runs: u32,
    pub victories: u32,
    pub deaths: u32,
    pub deepest_depth: u32,
    pub total_kills: u64,
    pub bosses_killed: u64,
    pub tokens_earned: u64,
}

/// The persistent ledger.
///
/// # Examples
///
/// ```
/// use delve::{DungeonProgression, RunOutcome, RunSummary};
///
/// let mut ledger = DungeonProgression::new();
/// let summary = RunSummary {
///     outcome: RunOutcome::Escaped,
///     depth_reached: 3,
///     enemies_killed: 5,
///     bosses_killed: 1,
///     rooms_cleared: 4,
///     gold_committed: 0,
///     experience_committed: 0,
/// };
/// assert_eq!(ledger.record_run_completion(&summary), 90);
/// assert!(ledger.is_unlocked("room:shop"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DungeonProgression {
    tokens: u64,
    stats: ProgressionStats,
    unlocked: BTreeSet<String>,
    upgrades: BTreeMap<UpgradeType, u32>,
}

impl DungeonProgression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn stats(&self) -> &ProgressionStats {
        &self.stats
    }

    pub fn unlocked(&self) -> &BTreeSet<String> {
        &self.unlocked
    }

    /// Credits tokens from outside a run (e.g. a migration or a reward screen).
    pub fn add_tokens(&mut self, amount: u64) {
        self.tokens += amount;
    }

    /// Books a finished run and returns the tokens it earned.
    ///
    /// Call exactly once per run; calling again counts the run twice.
    pub fn record_run_completion(&mut self, summary: &RunSummary) -> u64 {
        let earned = summary.tokens();
        self.tokens += earned;
        self.stats.runs += 1;
        self.stats.tokens_earned += earned;
        self.stats.total_kills += summary.enemies_killed as u64;
        self.stats.bosses_killed += summary.bosses_killed as u64;
        self.stats.deepest_depth = self.stats.deepest_depth.max(summary.depth_reached);
        match summary.outcome {
            RunOutcome::Escaped => self.stats.victories += 1,
            RunOutcome::Died => self.stats.deaths += 1,
            RunOutcome::Abandoned => {}
        }

        let fresh: Vec<&str> = Self::unlocks_for_depth(summary.depth_reached)
            .into_iter()
            .filter(|id| !self.unlocked.contains(*id))
            .collect();
        for id in fresh {
            info!("Unlocked {}", id);
            self.unlocked.insert(id.to_string());
        }

        info!(
            "Run recorded ({:?}, depth {}): {} tokens earned, {} banked",
            summary.outcome, summary.depth_reached, earned, self.tokens
        );
        earned
    }

    /// Every content id unlocked by reaching `depth`, including shallower gates.
    pub fn unlocks_for_depth(depth: u32) -> Vec<&'static str> {
        DEPTH_UNLOCKS
            .iter()
            .filter(|(gate, _)| *gate <= depth)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    pub fn upgrade_level(&self, kind: UpgradeType) -> u32 {
        self.upgrades.get(&kind).copied().unwrap_or(0)
    }

    /// Price of the next level, or `None` when maxed.
    pub fn upgrade_cost(&self, kind: UpgradeType) -> Option<u64> {
        let level = self.upgrade_level(kind);
        (level < kind.max_level()).then(|| kind.cost_at(level))
    }

    /// Buys one level of `kind`. Returns the new level.
    ///
    /// Tokens are debited and the level raised together, or nothing changes.
    pub fn purchase_upgrade(&mut self, kind: UpgradeType) -> Result<u32, ActionError> {
        let cost = self.upgrade_cost(kind).ok_or(ActionError::MaxLevel)?;
        if self.tokens < cost {
            return Err(ActionError::InsufficientTokens {
                needed: cost,
                available: self.tokens,
            });
        }
        self.tokens -= cost;
        let level = self.upgrade_level(kind) + 1;
        self.upgrades.insert(kind, level);
        debug!("Bought {:?} level {} for {} tokens", kind, level, cost);
        Ok(level)
    }

    /// Every upgrade folded into one set of run bonuses.
    pub fn upgrade_bonuses(&self) -> RunBonuses {
        let mut total = RunBonuses::default();
        for (kind, level) in &self.upgrades {
            total.absorb(&kind.bonuses(*level), 1);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(outcome: RunOutcome, depth: u32, kills: u32) -> RunSummary {
        RunSummary {
            outcome,
            depth_reached: depth,
            enemies_killed: kills,
            bosses_killed: 0,
            rooms_cleared: 0,
            gold_committed: 0,
            experience_committed: 0,
        }
    }

    #[test]
    fn test_token_formula() {
        assert_eq!(summary(RunOutcome::Escaped, 4, 3).tokens(), 40 + 50 + 6);
        assert_eq!(summary(RunOutcome::Died, 4, 3).tokens(), 46);
        assert_eq!(summary(RunOutcome::Abandoned, 1, 0).tokens(), 10);
    }

    #[test]
    fn test_record_updates_stats() {
        let mut ledger = DungeonProgression::new();
        ledger.record_run_completion(&summary(RunOutcome::Died, 5, 7));
        ledger.record_run_completion(&summary(RunOutcome::Escaped, 2, 1));
        ledger.record_run_completion(&summary(RunOutcome::Abandoned, 1, 0));
        let stats = ledger.stats();
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.deaths, 1);
        assert_eq!(stats.victories, 1);
        assert_eq!(stats.deepest_depth, 5);
        assert_eq!(stats.total_kills, 8);
        assert_eq!(ledger.tokens(), 64 + 72 + 10);
    }

    #[test]
    fn test_unlocks_are_one_way() {
        let mut ledger = DungeonProgression::new();
        ledger.record_run_completion(&summary(RunOutcome::Died, 5, 0));
        let count = ledger.unlocked().len();
        assert!(ledger.is_unlocked("hazard:poison_gas"));
        assert!(!ledger.is_unlocked("title:deep_delver"));
        ledger.record_run_completion(&summary(RunOutcome::Died, 2, 0));
        assert_eq!(ledger.unlocked().len(), count);
    }

    #[test]
    fn test_costs_strictly_increase() {
        for kind in UpgradeType::all() {
            for level in 1..kind.max_level() {
                assert!(kind.cost_at(level) > kind.cost_at(level - 1), "{kind:?}");
            }
        }
    }

    #[test]
    fn test_purchase_is_atomic() {
        let mut ledger = DungeonProgression::new();
        let cost = UpgradeType::Might.cost_at(0);
        ledger.add_tokens(cost - 1);
        assert_eq!(
            ledger.purchase_upgrade(UpgradeType::Might),
            Err(ActionError::InsufficientTokens {
                needed: cost,
                available: cost - 1
            })
        );
        assert_eq!(ledger.tokens(), cost - 1);
        assert_eq!(ledger.upgrade_level(UpgradeType::Might), 0);

        ledger.add_tokens(1);
        assert_eq!(ledger.purchase_upgrade(UpgradeType::Might), Ok(1));
        assert_eq!(ledger.tokens(), 0);
        assert_eq!(ledger.upgrade_bonuses().flat(Stat::Damage), 2);
    }

    #[test]
    fn test_max_level_refused() {
        let mut ledger = DungeonProgression::new();
        ledger.add_tokens(1_000_000);
        let max = UpgradeType::Wisdom.max_level();
        for _ in 0..max {
            ledger.purchase_upgrade(UpgradeType::Wisdom).unwrap();
        }
        let tokens = ledger.tokens();
        assert_eq!(
            ledger.purchase_upgrade(UpgradeType::Wisdom),
            Err(ActionError::MaxLevel)
        );
        assert_eq!(ledger.tokens(), tokens);
        assert_eq!(ledger.upgrade_cost(UpgradeType::Wisdom), None);
        assert_eq!(ledger.upgrade_bonuses().percent(Stat::ExperienceGain), 30.0);
    }
}
