//! Lore entity - Searchable world-history text

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::common::require_name;
use crate::error::DomainError;
use crate::ids::{LoreId, WorldId};
use crate::value_objects::EntityRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lore {
    pub id: LoreId,
    pub world_id: WorldId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Freeform era markers ("1000 years before the Sundering")
    #[serde(default)]
    pub time_start: String,
    #[serde(default)]
    pub time_end: String,
    #[serde(default)]
    pub related_entities: Vec<EntityRef>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Lore {
    pub fn new(world_id: WorldId, title: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: LoreId::new(),
            world_id,
            title: require_name("lore", title)?,
            body: String::new(),
            time_start: String::new(),
            time_end: String::new(),
            related_entities: Vec::new(),
            tags: Vec::new(),
        })
    }

    pub fn retitle(&mut self, title: impl Into<String>) -> Result<(), DomainError> {
        self.title = require_name("lore", title)?;
        Ok(())
    }

    /// Distinct search tokens drawn from title, body and tags.
    pub fn search_tokens(&self) -> BTreeSet<String> {
        let mut tokens = tokenize(&self.title);
        tokens.extend(tokenize(&self.body));
        for tag in &self.tags {
            tokens.extend(tokenize(tag));
        }
        tokens
    }
}

/// Split text into lowercase alphanumeric runs.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
