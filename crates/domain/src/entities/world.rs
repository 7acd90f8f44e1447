//! World entity - The container every other record hangs off

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::require_name;
use crate::entities::StandingScale;
use crate::error::DomainError;
use crate::ids::WorldId;
use crate::value_objects::{AttributeShape, GameTime};

/// Rules a world applies to the records inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Declared character attributes for this game system
    #[serde(default)]
    pub attribute_shape: AttributeShape,
    /// Bounds for faction rank and reputation
    #[serde(default)]
    pub standing_scale: StandingScale,
    /// Freeform key/value notes (genre, tone, house rules)
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

/// A campaign world.
///
/// Simple data struct: the only invariant (a non-empty name) is checked by
/// [`World::new`] and [`World::rename`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: WorldId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: WorldSettings,
    /// Current in-game clock
    #[serde(default)]
    pub game_time: GameTime,
    /// True while the world is still being set up; records stored without the flag
    /// are already in play
    #[serde(default)]
    pub creation_in_progress: bool,
    pub created_at: DateTime<Utc>,
}

impl World {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let name = require_name("world", name)?;
        Ok(Self {
            id: WorldId::new(),
            name,
            description: String::new(),
            settings: WorldSettings::default(),
            game_time: GameTime::default(),
            creation_in_progress: true,
            created_at: now,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = require_name("world", name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_starts_at_day_one() {
        let world = World::new("Eberron", Utc::now()).unwrap();
        assert_eq!(world.game_time.seconds(), 0);
        assert!(world.settings.attribute_shape.allow_undeclared);
        assert!(world.creation_in_progress);
    }

    #[test]
    fn stored_world_without_creation_flag_is_in_play() {
        let mut json = serde_json::to_value(World::new("Krynn", Utc::now()).unwrap()).unwrap();
        json.as_object_mut().unwrap().remove("creation_in_progress");
        let world: World = serde_json::from_value(json).unwrap();
        assert!(!world.creation_in_progress);
    }

    #[test]
    fn blank_name_rejected() {
        assert!(World::new("   ", Utc::now()).is_err());
    }
}
