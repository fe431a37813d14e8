//! # Save Files
//!
//! A versioned JSON document holding the character and the progression ledger.
//! Derived-stat caches are not stored; they are rebuilt on load.

use crate::{config, Character, DelveError, DelveResult, DungeonProgression};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything that persists between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub character: Character,
    pub progression: DungeonProgression,
}

impl SaveFile {
    pub fn new(character: Character, progression: DungeonProgression) -> Self {
        Self {
            version: config::SAVE_VERSION,
            character,
            progression,
        }
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> DelveResult<String> {
        serde_json::to_string_pretty(self).map_err(DelveError::from)
    }

    /// Parses a save, rejecting unknown versions and rebuilding derived stats.
    pub fn from_json(json: &str) -> DelveResult<Self> {
        let mut save: SaveFile = serde_json::from_str(json)?;
        if save.version != config::SAVE_VERSION {
            return Err(DelveError::UnsupportedSaveVersion(save.version));
        }
        save.character.recalc_derived_stats();
        Ok(save)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> DelveResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!("Saved {} to {}", self.character.name, path.display());
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> DelveResult<Self> {
        let path = path.as_ref();
        let save = Self::from_json(&fs::read_to_string(path)?)?;
        info!("Loaded {} from {}", save.character.name, path.display());
        Ok(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterClass;

    #[test]
    fn test_version_checked() {
        let save = SaveFile::new(
            Character::new("Hero", CharacterClass::Rogue),
            DungeonProgression::new(),
        );
        let json = save.to_json().unwrap();
        assert!(SaveFile::from_json(&json).is_ok());

        let bumped = json.replacen(
            &format!("\"version\": {}", config::SAVE_VERSION),
            "\"version\": 99",
            1,
        );
        assert!(matches!(
            SaveFile::from_json(&bumped),
            Err(DelveError::UnsupportedSaveVersion(99))
        ));
    }

    #[test]
    fn test_garbage_is_a_serde_error() {
        assert!(matches!(
            SaveFile::from_json("{ not json"),
            Err(DelveError::Serde(_))
        ));
    }
}
