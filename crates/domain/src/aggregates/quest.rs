//! Quest aggregate - Objective tracker with a forward-only lifecycle
//!
//! ```text
//! proposed ──begin──▶ active ──complete──▶ completed
//!     │                  │
//!     └─────abandon──────┴──────────────▶ abandoned
//! ```
//!
//! `completed` and `abandoned` are terminal. Every other move is rejected with
//! [`DomainError::InvalidStateTransition`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{normalize_tags, require_name};
use crate::error::DomainError;
use crate::ids::{CharacterId, QuestId, WorldId};
use crate::value_objects::{EntityRef, GameTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    Proposed,
    Active,
    Completed,
    Abandoned,
}

impl QuestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuestState::Completed | QuestState::Abandoned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestState::Proposed => "proposed",
            QuestState::Active => "active",
            QuestState::Completed => "completed",
            QuestState::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for QuestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for proposing a quest.
#[derive(Debug, Clone, Default)]
pub struct NewQuest {
    pub name: String,
    pub description: Option<String>,
    pub giver_id: Option<CharacterId>,
    pub objectives: Option<String>,
    pub rewards: Option<String>,
    pub time_limit: Option<GameTime>,
    pub related: Vec<EntityRef>,
    pub tags: Vec<String>,
}

/// Editable fields of a non-terminal quest.
#[derive(Debug, Clone, Default)]
pub struct QuestEdit {
    pub description: Option<String>,
    pub objectives: Option<String>,
    pub progress: Option<String>,
    pub rewards: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    id: QuestId,
    world_id: WorldId,
    name: String,
    description: String,
    state: QuestState,
    giver_id: Option<CharacterId>,
    assignees: Vec<CharacterId>,
    objectives: String,
    progress: String,
    rewards: String,
    time_limit: Option<GameTime>,
    related: Vec<EntityRef>,
    tags: Vec<String>,
}

impl Quest {
    pub fn propose(world_id: WorldId, data: NewQuest) -> Result<Self, DomainError> {
        Ok(Self {
            id: QuestId::new(),
            world_id,
            name: require_name("quest", data.name)?,
            description: data.description.unwrap_or_default(),
            state: QuestState::Proposed,
            giver_id: data.giver_id,
            assignees: Vec::new(),
            objectives: data.objectives.unwrap_or_default(),
            progress: String::new(),
            rewards: data.rewards.unwrap_or_default(),
            time_limit: data.time_limit,
            related: data.related,
            tags: normalize_tags(data.tags),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> QuestId {
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
    pub fn state(&self) -> QuestState {
        self.state
    }

    #[inline]
    pub fn giver_id(&self) -> Option<CharacterId> {
        self.giver_id
    }

    #[inline]
    pub fn assignees(&self) -> &[CharacterId] {
        &self.assignees
    }

    #[inline]
    pub fn objectives(&self) -> &str {
        &self.objectives
    }

    #[inline]
    pub fn progress(&self) -> &str {
        &self.progress
    }

    #[inline]
    pub fn rewards(&self) -> &str {
        &self.rewards
    }

    #[inline]
    pub fn time_limit(&self) -> Option<GameTime> {
        self.time_limit
    }

    #[inline]
    pub fn related(&self) -> &[EntityRef] {
        &self.related
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// proposed → active. Assignees given here are added to any already present.
    pub fn begin(&mut self, assignees: Vec<CharacterId>) -> Result<(), DomainError> {
        self.transition(QuestState::Proposed, QuestState::Active)?;
        for assignee in assignees {
            if !self.assignees.contains(&assignee) {
                self.assignees.push(assignee);
            }
        }
        Ok(())
    }

    /// active → completed.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.transition(QuestState::Active, QuestState::Completed)
    }

    /// proposed | active → abandoned.
    pub fn abandon(&mut self) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(self.rejected(QuestState::Abandoned));
        }
        self.state = QuestState::Abandoned;
        Ok(())
    }

    fn transition(&mut self, from: QuestState, to: QuestState) -> Result<(), DomainError> {
        if self.state != from {
            return Err(self.rejected(to));
        }
        self.state = to;
        Ok(())
    }

    fn rejected(&self, to: QuestState) -> DomainError {
        DomainError::invalid_state_transition(format!(
            "quest '{}' cannot move from {} to {}",
            self.name, self.state, to
        ))
    }

    // =========================================================================
    // Edits
    // =========================================================================

    pub fn edit(&mut self, edit: QuestEdit) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(DomainError::invalid_state_transition(format!(
                "quest '{}' is {} and can no longer be edited",
                self.name, self.state
            )));
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(objectives) = edit.objectives {
            self.objectives = objectives;
        }
        if let Some(progress) = edit.progress {
            self.progress = progress;
        }
        if let Some(rewards) = edit.rewards {
            self.rewards = rewards;
        }
        Ok(())
    }
}
