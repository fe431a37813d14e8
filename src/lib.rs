//! # Delve
//!
//! The simulation core of a turn-based dungeon crawler with a procedurally generated
//! roguelike layer.
//!
//! ## Architecture Overview
//!
//! Everything here is rendering-agnostic. A presentation layer reads snapshots and feeds
//! discrete intents back in. The core is organised around a few concepts:
//!
//! - **Character**: base and derived attributes, equipment, buffs, resource pools
//! - **Abilities**: immutable content tables resolved into final numbers by variant and talent picks
//! - **Generation**: depth-scaled room-grid dungeons that are connected by construction
//! - **Encounter**: the real-time room layer (enemy AI, hazards, projectiles)
//! - **Battle**: the turn-based multi-enemy fight with a reinforcement queue
//! - **Run / Progression**: temporary run rewards and the account-level ledger that outlives runs
//!
//! ## Determinism
//!
//! All randomness flows through a caller-supplied [`rand::rngs::StdRng`], and all time-gated
//! behaviour is driven by explicit millisecond timestamps, so a seed plus an input stream
//! fully reproduces a run.

pub mod abilities;
pub mod battle;
pub mod character;
pub mod encounter;
pub mod game;
pub mod generation;
pub mod save;
pub mod utils;

pub use abilities::*;
pub use battle::*;
pub use character::*;
pub use encounter::*;
pub use game::*;
pub use generation::*;
pub use save::*;
pub use utils::*;

/// Core error type for the Delve engine.
///
/// These are failures the caller cannot fix by choosing a different action: broken save
/// files, unknown content ids, generator exhaustion. Refused player actions use
/// [`ActionError`] instead.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// A content id is not present in the registry
    #[error("Unknown content: {0}")]
    UnknownContent(String),

    /// Save file was written by an incompatible version
    #[error("Unsupported save version {0}")]
    UnsupportedSaveVersion(u32),

    /// A player action was refused inside a larger operation
    #[error("Action refused: {0}")]
    Action(#[from] ActionError),
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Reason a player-initiated action was refused.
///
/// Refusals never mutate state. The caller decides how to present them.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u64, available: u64 },

    #[error("not enough scrap: need {needed}, have {available}")]
    InsufficientScrap { needed: u64, available: u64 },

    #[error("not enough dungeon tokens: need {needed}, have {available}")]
    InsufficientTokens { needed: u64, available: u64 },

    #[error("not enough resource: need {needed:.0}, have {available}")]
    InsufficientResource { needed: f64, available: i32 },

    #[error("requires level {required}")]
    LevelTooLow { required: u32 },

    #[error("no unallocated stat points")]
    NoStatPoints,

    #[error("no passive points")]
    NoPassivePoints,

    #[error("nothing in that slot")]
    EmptySlot,

    #[error("item is not in the inventory")]
    NotInInventory,

    #[error("slot blocked: {0}")]
    SlotBlocked(String),

    #[error("already at maximum level")]
    MaxLevel,

    #[error("ability on cooldown for {turns} more turns")]
    OnCooldown { turns: u32 },

    #[error("no passage in that direction")]
    NoConnection,

    #[error("room must be cleared first")]
    RoomNotCleared,

    #[error("nothing to collect here")]
    NothingToCollect,

    #[error("invalid target")]
    InvalidTarget,

    #[error("no battle in progress")]
    BattleInactive,

    #[error("a battle is already in progress")]
    BattleInProgress,

    #[error("unknown content id: {0}")]
    UnknownContent(String),

    #[error("the run is over")]
    RunOver,

    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

/// Version information for the game.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Experience required to go from level 1 to level 2
    pub const BASE_XP: u64 = 100;

    /// Growth factor applied to the experience threshold per level
    pub const XP_MULTIPLIER: f64 = 1.5;

    /// Hard level cap
    pub const MAX_LEVEL: u32 = 60;

    /// Passive (talent) points granted on every level-up
    pub const PASSIVE_POINTS_PER_LEVEL: u32 = 1;

    /// Every Nth level grants extra passive points
    pub const BONUS_PASSIVE_POINTS_EVERY: u32 = 5;

    /// Extra passive points granted on every Nth level
    pub const BONUS_PASSIVE_POINTS: u32 = 1;

    /// Unallocated attribute points granted per level-up
    pub const STAT_POINTS_PER_LEVEL: u32 = 3;

    /// Hit chance before dexterity and bonuses, in percent
    pub const BASE_HIT_CHANCE: f64 = 75.0;
    pub const HIT_PER_DEXTERITY: f64 = 0.5;
    pub const MAX_HIT_CHANCE: f64 = 95.0;

    /// Critical chance before dexterity and bonuses, in percent
    pub const BASE_CRIT_CHANCE: f64 = 5.0;
    pub const CRIT_PER_DEXTERITY: f64 = 0.25;
    pub const MAX_CRIT_CHANCE: f64 = 95.0;

    /// Dodge chance before dexterity and bonuses, in percent
    pub const BASE_DODGE_CHANCE: f64 = 3.0;
    pub const DODGE_PER_DEXTERITY: f64 = 0.2;
    pub const MAX_DODGE_CHANCE: f64 = 75.0;

    /// Damage multiplier applied on a critical hit
    pub const CRIT_MULTIPLIER: f64 = 1.5;

    /// Health gained per point of strength
    pub const HEALTH_PER_STRENGTH: i32 = 2;

    /// Maximum times a buff can be re-applied to extend its duration
    pub const MAX_BUFF_STACKS: u32 = 5;

    /// How long "recently hit" / "recently killed" conditions stay true
    pub const CONDITION_WINDOW_MS: u64 = 4_000;

    /// Health fraction below which the low-health condition holds
    pub const LOW_HEALTH_THRESHOLD: f64 = 0.35;

    /// Bonuses an equipped item can receive from enchanting
    pub const MAX_ENCHANTS_PER_ITEM: usize = 3;

    /// Simultaneously active enemies in one battle
    pub const MAX_ACTIVE_ENEMIES: usize = 4;

    /// Turns of delay per reinforcement distance zone
    pub const TURNS_PER_ZONE: u32 = 2;

    /// Farthest zone that still sends reinforcements
    pub const MAX_REINFORCEMENT_ZONE: u8 = 4;

    /// Talent tiers per ability and choices per tier
    pub const TALENT_TIERS: usize = 3;
    pub const TALENTS_PER_TIER: usize = 3;

    /// Interior size of every room in the spatial layer
    pub const ROOM_WIDTH: f32 = 640.0;
    pub const ROOM_HEIGHT: f32 = 480.0;

    /// Radius in which an idle enemy notices the player
    pub const VISION_RADIUS: f32 = 220.0;

    /// Radius in which a chasing enemy starts a battle
    pub const ENGAGE_RADIUS: f32 = 40.0;

    /// Width of one reinforcement distance band
    pub const ZONE_WIDTH: f32 = 120.0;

    /// Real-time delay before an enemy the player fled from resumes idling
    pub const CHASE_COOLDOWN_MS: u64 = 3_000;

    /// Player movement speed in room units per second
    pub const PLAYER_SPEED: f32 = 160.0;

    /// Collision radius of the player
    pub const PLAYER_RADIUS: f32 = 12.0;

    /// Distance covered by a player dash
    pub const PLAYER_DASH_DISTANCE: f32 = 90.0;

    /// Seconds a player dash takes from start to finish
    pub const PLAYER_DASH_SECS: f32 = 0.15;

    /// Distance an enemy is shoved by a push
    pub const PUSH_DISTANCE: f32 = 60.0;

    /// How close an enemy must be to be pushed
    pub const PUSH_RADIUS: f32 = 56.0;

    /// Invulnerability after an instantaneous hazard hit
    pub const HAZARD_INVULNERABILITY_MS: u64 = 1_000;

    /// Interval between continuous hazard ticks
    pub const HAZARD_TICK_INTERVAL_MS: u64 = 600;

    /// Invulnerability after a continuous hazard tick
    pub const HAZARD_TICK_INVULNERABILITY_MS: u64 = 250;

    /// Dungeon tokens per depth reached
    pub const TOKENS_PER_DEPTH: u64 = 10;

    /// Dungeon tokens awarded for a victorious run
    pub const VICTORY_TOKEN_BONUS: u64 = 50;

    /// Dungeon tokens per enemy killed
    pub const TOKENS_PER_KILL: u64 = 2;

    /// Current save file schema version
    pub const SAVE_VERSION: u32 = 1;
}
