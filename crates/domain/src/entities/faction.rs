//! Faction entity - Organizations and their standing scale

use serde::{Deserialize, Serialize};

use crate::common::require_name;
use crate::error::DomainError;
use crate::ids::{CharacterId, FactionId, LocationId, WorldId};
use crate::value_objects::AttributeBag;

/// Bounds for faction rank and reputation, configured per world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingScale {
    pub min_reputation: i32,
    pub max_reputation: i32,
    pub max_rank: u32,
}

impl Default for StandingScale {
    fn default() -> Self {
        Self {
            min_reputation: -100,
            max_reputation: 100,
            max_rank: 10,
        }
    }
}

impl StandingScale {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.min_reputation > self.max_reputation {
            return Err(DomainError::validation(
                "standing scale min_reputation exceeds max_reputation",
            ));
        }
        Ok(())
    }

    pub fn check_reputation(&self, reputation: i32) -> Result<i32, DomainError> {
        if reputation < self.min_reputation || reputation > self.max_reputation {
            return Err(DomainError::validation(format!(
                "reputation {} is outside {}..={}",
                reputation, self.min_reputation, self.max_reputation
            )));
        }
        Ok(reputation)
    }

    pub fn check_rank(&self, rank: u32) -> Result<u32, DomainError> {
        if rank > self.max_rank {
            return Err(DomainError::validation(format!(
                "rank {} exceeds the maximum {}",
                rank, self.max_rank
            )));
        }
        Ok(rank)
    }
}

/// How one faction regards another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRelationship {
    pub faction_id: FactionId,
    /// allied, neutral, hostile, war, vassal...
    pub status: String,
    #[serde(default)]
    pub description: String,
}

/// An organization. Leader and headquarters are weak references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub world_id: WorldId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// military, guild, government, religious, criminal...
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub headquarters_id: Option<LocationId>,
    #[serde(default)]
    pub leader_id: Option<CharacterId>,
    #[serde(default)]
    pub relationships: Vec<FactionRelationship>,
    #[serde(default)]
    pub attributes: AttributeBag,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Faction {
    pub fn new(world_id: WorldId, name: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: FactionId::new(),
            world_id,
            name: require_name("faction", name)?,
            description: String::new(),
            kind: String::new(),
            headquarters_id: None,
            leader_id: None,
            relationships: Vec::new(),
            attributes: AttributeBag::new(),
            tags: Vec::new(),
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = require_name("faction", name)?;
        Ok(())
    }

    /// Replace the full relationship list. A faction cannot relate to itself and each
    /// other faction appears once (last entry wins).
    pub fn set_relationships(
        &mut self,
        relationships: Vec<FactionRelationship>,
    ) -> Result<(), DomainError> {
        let mut merged: Vec<FactionRelationship> = Vec::with_capacity(relationships.len());
        for rel in relationships {
            if rel.faction_id == self.id {
                return Err(DomainError::validation(
                    "a faction cannot have a relationship with itself",
                ));
            }
            match merged.iter_mut().find(|r| r.faction_id == rel.faction_id) {
                Some(existing) => *existing = rel,
                None => merged.push(rel),
            }
        }
        self.relationships = merged;
        Ok(())
    }
}
