//! Blueprints - Templates instantiated into items and character abilities

use serde::{Deserialize, Serialize};

use crate::common::require_name;
use crate::error::DomainError;
use crate::ids::{AbilityBlueprintId, ItemBlueprintId, WorldId};
use crate::value_objects::AttributeBag;

/// Template for spawned items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBlueprint {
    pub id: ItemBlueprintId,
    pub world_id: WorldId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Whether instances may hold a quantity above one
    #[serde(default = "stackable_by_default")]
    pub stackable: bool,
    #[serde(default)]
    pub attributes: AttributeBag,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ItemBlueprint {
    pub fn new(world_id: WorldId, name: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: ItemBlueprintId::new(),
            world_id,
            name: require_name("item blueprint", name)?,
            description: String::new(),
            stackable: true,
            attributes: AttributeBag::new(),
            tags: Vec::new(),
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = require_name("item blueprint", name)?;
        Ok(())
    }
}

fn stackable_by_default() -> bool {
    true
}

/// Template for abilities granted to characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityBlueprint {
    pub id: AbilityBlueprintId,
    pub world_id: WorldId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// spell, attack, passive...
    #[serde(default)]
    pub kind: String,
    /// "10 MP", "1 action"
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub effect: String,
    /// "Level 5", "Fire affinity"
    #[serde(default)]
    pub requirements: String,
    #[serde(default)]
    pub attributes: AttributeBag,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AbilityBlueprint {
    pub fn new(world_id: WorldId, name: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: AbilityBlueprintId::new(),
            world_id,
            name: require_name("ability blueprint", name)?,
            description: String::new(),
            kind: String::new(),
            cost: String::new(),
            effect: String::new(),
            requirements: String::new(),
            attributes: AttributeBag::new(),
            tags: Vec::new(),
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = require_name("ability blueprint", name)?;
        Ok(())
    }
}
