//! Party aggregate - An informal group of characters
//!
//! Members are weak references: deleting a character leaves its id here, and readers
//! skip ids that no longer resolve. The leader, when set, is always a member.

use serde::{Deserialize, Serialize};

use crate::common::require_name;
use crate::error::DomainError;
use crate::ids::{CharacterId, PartyId, WorldId};
use crate::value_objects::GameTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    world_id: WorldId,
    name: String,
    description: String,
    members: Vec<CharacterId>,
    leader_id: Option<CharacterId>,
    formed_at: GameTime,
}

impl Party {
    /// Form a party. Duplicate member ids are collapsed; a leader must be among the
    /// members.
    pub fn form(
        world_id: WorldId,
        name: impl Into<String>,
        members: Vec<CharacterId>,
        leader_id: Option<CharacterId>,
        formed_at: GameTime,
    ) -> Result<Self, DomainError> {
        let mut party = Self {
            id: PartyId::new(),
            world_id,
            name: require_name("party", name)?,
            description: String::new(),
            members: Vec::with_capacity(members.len()),
            leader_id: None,
            formed_at,
        };
        for member in members {
            if !party.is_member(member) {
                party.members.push(member);
            }
        }
        if let Some(leader_id) = leader_id {
            party.set_leader(leader_id)?;
        }
        Ok(party)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> PartyId {
        self.id
    }

    #[inline]
    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn members(&self) -> &[CharacterId] {
        &self.members
    }

    #[inline]
    pub fn leader_id(&self) -> Option<CharacterId> {
        self.leader_id
    }

    #[inline]
    pub fn formed_at(&self) -> GameTime {
        self.formed_at
    }

    pub fn is_member(&self, character_id: CharacterId) -> bool {
        self.members.contains(&character_id)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = require_name("party", name)?;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn add_member(&mut self, character_id: CharacterId) -> Result<(), DomainError> {
        if self.is_member(character_id) {
            return Err(DomainError::constraint(format!(
                "character {} is already in party '{}'",
                character_id, self.name
            )));
        }
        self.members.push(character_id);
        Ok(())
    }

    /// Remove a member. Removing the leader leaves the party leaderless.
    pub fn remove_member(&mut self, character_id: CharacterId) -> Result<(), DomainError> {
        let before = self.members.len();
        self.members.retain(|m| *m != character_id);
        if self.members.len() == before {
            return Err(DomainError::not_found("PartyMember", character_id));
        }
        if self.leader_id == Some(character_id) {
            self.leader_id = None;
        }
        Ok(())
    }

    pub fn set_leader(&mut self, character_id: CharacterId) -> Result<(), DomainError> {
        if !self.is_member(character_id) {
            return Err(DomainError::constraint(format!(
                "leader {} must be a member of party '{}'",
                character_id, self.name
            )));
        }
        self.leader_id = Some(character_id);
        Ok(())
    }

    pub fn clear_leader(&mut self) {
        self.leader_id = None;
    }
}
