//! Quest use cases.
//!
//! Lifecycle rules live on the aggregate; these operations load, transition and save
//! under the quest's lock.

use std::sync::Arc;

use serde::Deserialize;

use questkeep_domain::{
    CharacterId, DomainError, EntityRef, GameTime, NewQuest, Quest, QuestEdit, QuestId, WorldId,
};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{found, CharacterRepo, QuestRepo, RepoError, WorldRepo};
use crate::use_cases::validation::{require_same_world, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestInput {
    pub world_id: WorldId,
    pub name: String,
    pub description: Option<String>,
    pub giver_id: Option<CharacterId>,
    pub objectives: Option<String>,
    pub rewards: Option<String>,
    /// Absolute game time in seconds
    pub time_limit: Option<u64>,
    #[serde(default)]
    pub related: Vec<EntityRef>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestPatch {
    pub description: Option<String>,
    pub objectives: Option<String>,
    pub progress: Option<String>,
    pub rewards: Option<String>,
}

pub struct QuestOps {
    quests: Arc<dyn QuestRepo>,
    characters: Arc<dyn CharacterRepo>,
    worlds: Arc<dyn WorldRepo>,
    locks: Arc<EntityLocks>,
}

impl QuestOps {
    pub fn new(
        quests: Arc<dyn QuestRepo>,
        characters: Arc<dyn CharacterRepo>,
        worlds: Arc<dyn WorldRepo>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            quests,
            characters,
            worlds,
            locks,
        }
    }

    pub async fn create(&self, input: QuestInput) -> Result<Quest, QuestError> {
        let world_id = input.world_id;
        found(self.worlds.get(world_id).await?, "World", world_id)?;
        if let Some(giver_id) = input.giver_id {
            self.check_character(world_id, giver_id).await?;
        }
        let time_limit = input.time_limit.map(GameTime::from_seconds);

        let quest = Quest::propose(
            world_id,
            NewQuest {
                name: input.name,
                description: input.description,
                giver_id: input.giver_id,
                objectives: input.objectives,
                rewards: input.rewards,
                time_limit,
                related: input.related,
                tags: input.tags,
            },
        )?;
        self.quests.save(&quest).await?;

        tracing::info!(
            quest_id = %quest.id(),
            world_id = %world_id,
            name = %quest.name(),
            "Quest created"
        );
        Ok(quest)
    }

    pub async fn begin(
        &self,
        id: QuestId,
        assignees: Vec<CharacterId>,
    ) -> Result<Quest, QuestError> {
        let _guard = self.locks.lock(id).await;
        let mut quest = self.load(id).await?;
        for assignee in &assignees {
            self.check_character(quest.world_id(), *assignee).await?;
        }
        quest.begin(assignees)?;
        self.quests.save(&quest).await?;

        tracing::info!(quest_id = %id, assignees = quest.assignees().len(), "Quest begun");
        Ok(quest)
    }

    pub async fn update(&self, id: QuestId, patch: QuestPatch) -> Result<Quest, QuestError> {
        self.transition(id, "updated", |quest| {
            quest.edit(QuestEdit {
                description: patch.description,
                objectives: patch.objectives,
                progress: patch.progress,
                rewards: patch.rewards,
            })
        })
        .await
    }

    pub async fn complete(&self, id: QuestId) -> Result<Quest, QuestError> {
        self.transition(id, "completed", Quest::complete).await
    }

    pub async fn abandon(&self, id: QuestId) -> Result<Quest, QuestError> {
        self.transition(id, "abandoned", Quest::abandon).await
    }

    pub async fn delete(&self, id: QuestId) -> Result<(), QuestError> {
        let _guard = self.locks.lock(id).await;
        if !self.quests.delete(id).await? {
            return Err(RepoError::not_found("Quest", id).into());
        }
        tracing::info!(quest_id = %id, "Quest deleted");
        Ok(())
    }

    async fn transition(
        &self,
        id: QuestId,
        what: &'static str,
        apply: impl FnOnce(&mut Quest) -> Result<(), DomainError>,
    ) -> Result<Quest, QuestError> {
        let _guard = self.locks.lock(id).await;
        let mut quest = self.load(id).await?;
        if let Err(e) = apply(&mut quest) {
            tracing::warn!(
                quest_id = %id,
                state = %quest.state(),
                error = %e,
                "Quest change rejected"
            );
            return Err(e.into());
        }
        self.quests.save(&quest).await?;

        tracing::info!(quest_id = %id, state = %quest.state(), "Quest {}", what);
        Ok(quest)
    }

    async fn load(&self, id: QuestId) -> Result<Quest, QuestError> {
        Ok(found(self.quests.get(id).await?, "Quest", id)?)
    }

    async fn check_character(&self, world_id: WorldId, id: CharacterId) -> Result<(), QuestError> {
        let character = found(self.characters.get(id).await?, "Character", id)?;
        require_same_world("Character", id, character.world_id(), world_id)?;
        Ok(())
    }
}
