//! Chronicle entity - A curated summary over a span of events

use serde::{Deserialize, Serialize};

use crate::common::require_name;
use crate::error::DomainError;
use crate::ids::{ChronicleId, EventId, WorldId};
use crate::value_objects::{EntityRef, GameTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chronicle {
    pub id: ChronicleId,
    pub world_id: WorldId,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub game_time_start: Option<GameTime>,
    #[serde(default)]
    pub game_time_end: Option<GameTime>,
    /// minor, moderate, major, critical...
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub consequences: String,
    /// Linked events in recorded order. May contain ids of since-deleted events.
    #[serde(default)]
    pub related_events: Vec<EventId>,
    #[serde(default)]
    pub related_entities: Vec<EntityRef>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Chronicle {
    pub fn new(world_id: WorldId, title: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: ChronicleId::new(),
            world_id,
            title: require_name("chronicle", title)?,
            summary: String::new(),
            game_time_start: None,
            game_time_end: None,
            significance: String::new(),
            consequences: String::new(),
            related_events: Vec::new(),
            related_entities: Vec::new(),
            tags: Vec::new(),
        })
    }

    pub fn retitle(&mut self, title: impl Into<String>) -> Result<(), DomainError> {
        self.title = require_name("chronicle", title)?;
        Ok(())
    }

    pub fn set_time_span(
        &mut self,
        start: Option<GameTime>,
        end: Option<GameTime>,
    ) -> Result<(), DomainError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(DomainError::validation(
                    "chronicle game_time_start is after game_time_end",
                ));
            }
        }
        self.game_time_start = start;
        self.game_time_end = end;
        Ok(())
    }

    /// Append events not already linked, keeping the given order.
    pub fn link_events(&mut self, events: impl IntoIterator<Item = EventId>) {
        for id in events {
            if !self.related_events.contains(&id) {
                self.related_events.push(id);
            }
        }
    }
}
