//! History use cases: the event log and chronicles built over it.
//!
//! Events are append-only. A chronicle can link a contiguous run of events by naming
//! its first and last event; the run is resolved against recorded order, not game
//! time.

use std::sync::Arc;

use serde::Deserialize;

use questkeep_domain::{
    Chronicle, ChronicleId, DomainError, EntityRef, Event, EventId, GameTime, LocationId,
    NewEvent, WorldId,
};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{
    found, ChronicleRepo, ClockPort, EventRepo, LocationRepo, RepoError, WorldRepo,
};
use crate::use_cases::validation::{require_same_world, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("A title is required to create a chronicle")]
    TitleRequired,
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub world_id: WorldId,
    /// Seconds; defaults to the world clock
    pub game_time: Option<u64>,
    pub name: Option<String>,
    pub description: String,
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub refs: Vec<EntityRef>,
    pub changes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChronicleInput {
    pub world_id: WorldId,
    pub chronicle_id: Option<ChronicleId>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub significance: Option<String>,
    pub consequences: Option<String>,
    pub game_time_start: Option<u64>,
    pub game_time_end: Option<u64>,
    /// Replaces the linked events when present; a range is appended after it
    pub related_events: Option<Vec<EventId>>,
    pub start_event_id: Option<EventId>,
    pub end_event_id: Option<EventId>,
    pub related_entities: Option<Vec<EntityRef>>,
    pub tags: Option<Vec<String>>,
}

pub struct HistoryOps {
    events: Arc<dyn EventRepo>,
    chronicles: Arc<dyn ChronicleRepo>,
    locations: Arc<dyn LocationRepo>,
    worlds: Arc<dyn WorldRepo>,
    clock: Arc<dyn ClockPort>,
    locks: Arc<EntityLocks>,
}

impl HistoryOps {
    pub fn new(
        events: Arc<dyn EventRepo>,
        chronicles: Arc<dyn ChronicleRepo>,
        locations: Arc<dyn LocationRepo>,
        worlds: Arc<dyn WorldRepo>,
        clock: Arc<dyn ClockPort>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            events,
            chronicles,
            locations,
            worlds,
            clock,
            locks,
        }
    }

    pub async fn record_event(&self, input: EventInput) -> Result<Event, HistoryError> {
        let world_id = input.world_id;
        let world = found(self.worlds.get(world_id).await?, "World", world_id)?;
        if let Some(location_id) = input.location_id {
            let location = found(
                self.locations.get(location_id).await?,
                "Location",
                location_id,
            )?;
            require_same_world("Location", location_id, location.world_id(), world_id)?;
        }
        let game_time = input
            .game_time
            .map(GameTime::from_seconds)
            .unwrap_or(world.game_time);

        let event = Event::record(
            world_id,
            game_time,
            NewEvent {
                name: input.name,
                description: input.description,
                location_id: input.location_id,
                refs: input.refs,
                changes: input.changes,
                tags: input.tags,
            },
            self.clock.now(),
        )?;
        self.events.save(&event).await?;

        tracing::info!(
            event_id = %event.id,
            world_id = %world_id,
            game_time = %event.game_time,
            "Event recorded"
        );
        Ok(event)
    }

    /// Remove one event. The rest of the log keeps its order.
    pub async fn delete_event(&self, id: EventId) -> Result<(), HistoryError> {
        if !self.events.delete(id).await? {
            return Err(RepoError::not_found("Event", id).into());
        }
        tracing::info!(event_id = %id, "Event deleted");
        Ok(())
    }

    pub async fn set_chronicle(&self, input: ChronicleInput) -> Result<Chronicle, HistoryError> {
        let world_id = input.world_id;
        found(self.worlds.get(world_id).await?, "World", world_id)?;

        let (mut chronicle, _guard) = match input.chronicle_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                let chronicle = found(self.chronicles.get(id).await?, "Chronicle", id)?;
                require_same_world("Chronicle", id, chronicle.world_id, world_id)?;
                (chronicle, Some(guard))
            }
            None => {
                let title = input.title.clone().ok_or(HistoryError::TitleRequired)?;
                (Chronicle::new(world_id, title)?, None)
            }
        };

        if let Some(title) = input.title {
            chronicle.retitle(title)?;
        }
        if let Some(v) = input.summary {
            chronicle.summary = v;
        }
        if let Some(v) = input.significance {
            chronicle.significance = v;
        }
        if let Some(v) = input.consequences {
            chronicle.consequences = v;
        }
        if input.game_time_start.is_some() || input.game_time_end.is_some() {
            let start = input
                .game_time_start
                .map(GameTime::from_seconds)
                .or(chronicle.game_time_start);
            let end = input
                .game_time_end
                .map(GameTime::from_seconds)
                .or(chronicle.game_time_end);
            chronicle.set_time_span(start, end)?;
        }
        if let Some(events) = input.related_events {
            chronicle.related_events.clear();
            chronicle.link_events(events);
        }
        if input.start_event_id.is_some() || input.end_event_id.is_some() {
            let range = self
                .event_range(world_id, input.start_event_id, input.end_event_id)
                .await?;
            chronicle.link_events(range);
        }
        if let Some(refs) = input.related_entities {
            chronicle.related_entities = refs;
        }
        if let Some(tags) = input.tags {
            chronicle.tags = questkeep_domain::common::normalize_tags(tags);
        }
        self.chronicles.save(&chronicle).await?;

        tracing::info!(
            chronicle_id = %chronicle.id,
            world_id = %world_id,
            events = chronicle.related_events.len(),
            "Chronicle saved"
        );
        Ok(chronicle)
    }

    pub async fn delete_chronicle(&self, id: ChronicleId) -> Result<(), HistoryError> {
        let _guard = self.locks.lock(id).await;
        if !self.chronicles.delete(id).await? {
            return Err(RepoError::not_found("Chronicle", id).into());
        }
        tracing::info!(chronicle_id = %id, "Chronicle deleted");
        Ok(())
    }

    /// Ids of the world's events from `start` through `end`, inclusive, in recorded
    /// order. An open end runs to the first or last event.
    async fn event_range(
        &self,
        world_id: WorldId,
        start: Option<EventId>,
        end: Option<EventId>,
    ) -> Result<Vec<EventId>, HistoryError> {
        let log: Vec<EventId> = self
            .events
            .list_in_world(world_id)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        let position = |id: EventId| {
            log.iter()
                .position(|e| *e == id)
                .ok_or_else(|| RepoError::not_found("Event", id))
        };

        let from = match start {
            Some(id) => position(id)?,
            None => 0,
        };
        let to = match end {
            Some(id) => position(id)?,
            None => log.len().saturating_sub(1),
        };
        if log.is_empty() {
            return Ok(Vec::new());
        }
        if from > to {
            return Err(ValidationError::Invalid {
                field_name: "start_event_id",
                reason: "was recorded after end_event_id".into(),
            }
            .into());
        }
        Ok(log[from..=to].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockChronicleRepo, MockEventRepo, MockLocationRepo, MockWorldRepo,
    };
    use chrono::Utc;
    use questkeep_domain::World;

    struct Mocks {
        events: MockEventRepo,
        chronicles: MockChronicleRepo,
        worlds: MockWorldRepo,
    }

    impl Mocks {
        fn new(world: &World) -> Self {
            let mut worlds = MockWorldRepo::new();
            let w = world.clone();
            worlds.expect_get().returning(move |_| Ok(Some(w.clone())));
            Self {
                events: MockEventRepo::new(),
                chronicles: MockChronicleRepo::new(),
                worlds,
            }
        }

        fn with_log(mut self, log: &[Event]) -> Self {
            let log = log.to_vec();
            self.events
                .expect_list_in_world()
                .returning(move |_| Ok(log.clone()));
            self
        }

        fn build(self) -> HistoryOps {
            HistoryOps::new(
                Arc::new(self.events),
                Arc::new(self.chronicles),
                Arc::new(MockLocationRepo::new()),
                Arc::new(self.worlds),
                Arc::new(FixedClock(Utc::now())),
                Arc::new(EntityLocks::new()),
            )
        }
    }

    fn event(world_id: WorldId, description: &str) -> Event {
        Event::record(
            world_id,
            GameTime::default(),
            NewEvent {
                description: description.into(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn chronicle_input(world_id: WorldId) -> ChronicleInput {
        ChronicleInput {
            world_id,
            chronicle_id: None,
            title: Some("The Siege".into()),
            summary: None,
            significance: None,
            consequences: None,
            game_time_start: None,
            game_time_end: None,
            related_events: None,
            start_event_id: None,
            end_event_id: None,
            related_entities: None,
            tags: None,
        }
    }

    #[tokio::test]
    async fn event_defaults_to_world_clock() {
        let mut world = World::new("Faerun", Utc::now()).unwrap();
        world.game_time = GameTime::from_seconds(90_000);

        let mut mocks = Mocks::new(&world);
        mocks
            .events
            .expect_save()
            .withf(|e| e.game_time.seconds() == 90_000)
            .times(1)
            .returning(|_| Ok(()));

        let event = mocks
            .build()
            .record_event(EventInput {
                world_id: world.id,
                game_time: None,
                name: None,
                description: "The gate falls".into(),
                location_id: None,
                refs: vec![],
                changes: None,
                tags: vec![],
            })
            .await
            .unwrap();
        assert_eq!(event.game_time, world.game_time);
    }

    #[tokio::test]
    async fn chronicle_links_event_range_in_recorded_order() {
        let world = World::new("Faerun", Utc::now()).unwrap();
        let log: Vec<Event> = ["a", "b", "c", "d"]
            .iter()
            .map(|d| event(world.id, d))
            .collect();

        let mut mocks = Mocks::new(&world).with_log(&log);
        mocks.chronicles.expect_save().times(1).returning(|_| Ok(()));

        let chronicle = mocks
            .build()
            .set_chronicle(ChronicleInput {
                start_event_id: Some(log[1].id),
                end_event_id: Some(log[2].id),
                ..chronicle_input(world.id)
            })
            .await
            .unwrap();
        assert_eq!(chronicle.related_events, vec![log[1].id, log[2].id]);
    }

    #[tokio::test]
    async fn open_ended_range_runs_to_latest_event() {
        let world = World::new("Faerun", Utc::now()).unwrap();
        let log: Vec<Event> = ["a", "b", "c"].iter().map(|d| event(world.id, d)).collect();

        let mut mocks = Mocks::new(&world).with_log(&log);
        mocks.chronicles.expect_save().returning(|_| Ok(()));

        let chronicle = mocks
            .build()
            .set_chronicle(ChronicleInput {
                start_event_id: Some(log[1].id),
                ..chronicle_input(world.id)
            })
            .await
            .unwrap();
        assert_eq!(chronicle.related_events, vec![log[1].id, log[2].id]);
    }

    #[tokio::test]
    async fn when_range_is_reversed_nothing_is_saved() {
        let world = World::new("Faerun", Utc::now()).unwrap();
        let log: Vec<Event> = ["a", "b"].iter().map(|d| event(world.id, d)).collect();

        let mut mocks = Mocks::new(&world).with_log(&log);
        mocks.chronicles.expect_save().never();

        let result = mocks
            .build()
            .set_chronicle(ChronicleInput {
                start_event_id: Some(log[1].id),
                end_event_id: Some(log[0].id),
                ..chronicle_input(world.id)
            })
            .await;
        assert!(matches!(result, Err(HistoryError::Validation(_))));
    }

    #[tokio::test]
    async fn when_event_missing_delete_returns_not_found() {
        let world = World::new("Faerun", Utc::now()).unwrap();
        let mut mocks = Mocks::new(&world);
        mocks.events.expect_delete().returning(|_| Ok(false));

        let result = mocks.build().delete_event(EventId::new()).await;
        assert!(matches!(result, Err(HistoryError::Repo(e)) if e.is_not_found()));
    }
}
