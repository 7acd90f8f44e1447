//! Party use cases.

use std::sync::Arc;

use questkeep_domain::{CharacterId, DomainError, Party, PartyId, World, WorldId};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{found, CharacterRepo, PartyRepo, RepoError, WorldRepo};
use crate::use_cases::validation::{require_same_world, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum PartyError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

pub struct PartyOps {
    parties: Arc<dyn PartyRepo>,
    characters: Arc<dyn CharacterRepo>,
    worlds: Arc<dyn WorldRepo>,
    locks: Arc<EntityLocks>,
}

impl PartyOps {
    pub fn new(
        parties: Arc<dyn PartyRepo>,
        characters: Arc<dyn CharacterRepo>,
        worlds: Arc<dyn WorldRepo>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            parties,
            characters,
            worlds,
            locks,
        }
    }

    /// Form a party, stamped with the world's current game time.
    pub async fn form(
        &self,
        world_id: WorldId,
        name: String,
        members: Vec<CharacterId>,
        leader_id: Option<CharacterId>,
        description: Option<String>,
    ) -> Result<Party, PartyError> {
        let world: World = found(self.worlds.get(world_id).await?, "World", world_id)?;
        for member in &members {
            self.check_member(world_id, *member).await?;
        }

        let mut party = Party::form(world_id, name, members, leader_id, world.game_time)?;
        if let Some(description) = description {
            party.set_description(description);
        }
        self.parties.save(&party).await?;

        tracing::info!(
            party_id = %party.id(),
            world_id = %world_id,
            members = party.members().len(),
            "Party formed"
        );
        Ok(party)
    }

    pub async fn disband(&self, id: PartyId) -> Result<(), PartyError> {
        let _guard = self.locks.lock(id).await;
        if !self.parties.delete(id).await? {
            return Err(RepoError::not_found("Party", id).into());
        }
        tracing::info!(party_id = %id, "Party disbanded");
        Ok(())
    }

    pub async fn rename(
        &self,
        id: PartyId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Party, PartyError> {
        self.modify(id, |party| {
            if let Some(name) = name {
                party.rename(name)?;
            }
            if let Some(description) = description {
                party.set_description(description);
            }
            Ok(())
        })
        .await
    }

    pub async fn add_member(
        &self,
        id: PartyId,
        character_id: CharacterId,
    ) -> Result<Party, PartyError> {
        let _guard = self.locks.lock(id).await;
        let mut party = self.load(id).await?;
        self.check_member(party.world_id(), character_id).await?;
        party.add_member(character_id)?;
        self.parties.save(&party).await?;

        tracing::info!(party_id = %id, character_id = %character_id, "Party member added");
        Ok(party)
    }

    /// Remove a member. The character need not exist any more.
    pub async fn remove_member(
        &self,
        id: PartyId,
        character_id: CharacterId,
    ) -> Result<Party, PartyError> {
        let party = self
            .modify(id, |party| party.remove_member(character_id))
            .await?;
        tracing::info!(party_id = %id, character_id = %character_id, "Party member removed");
        Ok(party)
    }

    /// Set or clear the leader. A new leader must already be a member.
    pub async fn set_leader(
        &self,
        id: PartyId,
        leader_id: Option<CharacterId>,
    ) -> Result<Party, PartyError> {
        self.modify(id, |party| {
            match leader_id {
                Some(leader_id) => party.set_leader(leader_id)?,
                None => party.clear_leader(),
            }
            Ok(())
        })
        .await
    }

    async fn modify(
        &self,
        id: PartyId,
        apply: impl FnOnce(&mut Party) -> Result<(), DomainError>,
    ) -> Result<Party, PartyError> {
        let _guard = self.locks.lock(id).await;
        let mut party = self.load(id).await?;
        apply(&mut party)?;
        self.parties.save(&party).await?;
        Ok(party)
    }

    async fn load(&self, id: PartyId) -> Result<Party, PartyError> {
        Ok(found(self.parties.get(id).await?, "Party", id)?)
    }

    async fn check_member(&self, world_id: WorldId, id: CharacterId) -> Result<(), PartyError> {
        let character = found(self.characters.get(id).await?, "Character", id)?;
        require_same_world("Character", id, character.world_id(), world_id)?;
        Ok(())
    }
}
