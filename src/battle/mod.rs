//! # Battle Module
//!
//! Turn-based fights against up to four enemies with time-delayed reinforcements.
//!
//! [`MultiBattleState`] owns the slot and queue rules, [`Combatant`] carries enemy
//! statuses, and [`Battle`] resolves rounds against a [`crate::Character`].

pub mod effects;
pub mod engine;
pub mod state;

pub use effects::*;
pub use engine::*;
pub use state::*;
