//! # Abilities Module
//!
//! Ability content and the modifier engine. Content is immutable and loaded once into a
//! [`ContentRegistry`]; a [`ConfiguredAbility`] resolves base + variant + talents into the
//! final numbers and effect flags the battle engine consumes.

pub mod configured;
pub mod content;
pub mod modifier;
pub mod registry;

pub use configured::*;
pub use content::*;
pub use modifier::*;
pub use registry::*;
