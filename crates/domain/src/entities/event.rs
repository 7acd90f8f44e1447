//! Event entity - Append-only log of things that happened in a world

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{EventId, LocationId, WorldId};
use crate::value_objects::{EntityRef, GameTime};

/// One entry in a world's history.
///
/// Events are never edited after they are recorded. Their order is the order in which
/// they were recorded; deleting one leaves the others where they were.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub world_id: WorldId,
    /// In-game time the event happened at
    pub game_time: GameTime,
    #[serde(default)]
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    /// Participants and other records the event touches
    #[serde(default)]
    pub refs: Vec<EntityRef>,
    /// Freeform summary of state changes caused by the event
    #[serde(default)]
    pub changes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Input for recording an event.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub name: Option<String>,
    pub description: String,
    pub location_id: Option<LocationId>,
    pub refs: Vec<EntityRef>,
    pub changes: Option<String>,
    pub tags: Vec<String>,
}

impl Event {
    pub fn record(
        world_id: WorldId,
        game_time: GameTime,
        data: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let description = data.description.trim().to_string();
        if description.is_empty() {
            return Err(DomainError::validation("event description cannot be empty"));
        }
        let mut refs: Vec<EntityRef> = Vec::with_capacity(data.refs.len());
        for r in data.refs {
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
        Ok(Self {
            id: EventId::new(),
            world_id,
            game_time,
            name: data.name.unwrap_or_default().trim().to_string(),
            description,
            location_id: data.location_id,
            refs,
            changes: data.changes.unwrap_or_default(),
            tags: data.tags,
            recorded_at: now,
        })
    }
}
