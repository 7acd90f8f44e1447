//! Game clock use cases.
//!
//! The clock is a field of the world record, so every write takes the world's lock.

use std::sync::Arc;

use serde::Serialize;

use questkeep_domain::value_objects::GameTimeBreakdown;
use questkeep_domain::{DomainError, GameTime, TimeAdvance, World, WorldId};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{found, RepoError, WorldRepo};

#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// A world's clock as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameTimeView {
    pub world_id: WorldId,
    pub seconds: u64,
    pub display: String,
    pub breakdown: GameTimeBreakdown,
}

impl GameTimeView {
    pub fn new(world_id: WorldId, time: GameTime) -> Self {
        Self {
            world_id,
            seconds: time.seconds(),
            display: time.to_string(),
            breakdown: time.breakdown(),
        }
    }
}

/// Result of moving the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockChange {
    pub before: GameTimeView,
    pub after: GameTimeView,
}

pub struct TimeOps {
    worlds: Arc<dyn WorldRepo>,
    locks: Arc<EntityLocks>,
}

impl TimeOps {
    pub fn new(worlds: Arc<dyn WorldRepo>, locks: Arc<EntityLocks>) -> Self {
        Self { worlds, locks }
    }

    pub async fn get(&self, world_id: WorldId) -> Result<GameTimeView, TimeError> {
        let world = self.load(world_id).await?;
        Ok(GameTimeView::new(world_id, world.game_time))
    }

    /// Jump to an absolute time. Moving backwards is allowed.
    pub async fn set(&self, world_id: WorldId, time: GameTime) -> Result<ClockChange, TimeError> {
        self.modify(world_id, |_| Ok(time)).await
    }

    pub async fn advance(
        &self,
        world_id: WorldId,
        by: TimeAdvance,
    ) -> Result<ClockChange, TimeError> {
        self.modify(world_id, |now| now.advance(&by)).await
    }

    async fn modify(
        &self,
        world_id: WorldId,
        next: impl FnOnce(GameTime) -> Result<GameTime, DomainError>,
    ) -> Result<ClockChange, TimeError> {
        let _guard = self.locks.lock(world_id).await;
        let mut world = self.load(world_id).await?;
        let before = world.game_time;
        world.game_time = next(before)?;
        self.worlds.save(&world).await?;

        tracing::info!(
            world_id = %world_id,
            before = before.seconds(),
            after = world.game_time.seconds(),
            "Game time changed"
        );
        Ok(ClockChange {
            before: GameTimeView::new(world_id, before),
            after: GameTimeView::new(world_id, world.game_time),
        })
    }

    async fn load(&self, world_id: WorldId) -> Result<World, TimeError> {
        Ok(found(self.worlds.get(world_id).await?, "World", world_id)?)
    }
}
