//! Read-only projections over the store.
//!
//! Nothing here takes a lock. Weak references whose target is gone (party members,
//! faction leaders, item holders, chronicle events) are left out of every view.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use questkeep_domain::entities::tokenize;
use questkeep_domain::{
    Character, CharacterId, Chronicle, ChronicleId, DomainError, EntityKind, Event, Faction,
    FactionId, GameTime, Item, ItemBlueprintId, ItemHolder, Location, LocationId, Lore, Party,
    PartyId, Quest, QuestState, World, WorldId,
};

use crate::infrastructure::ports::{
    found, CharacterRepo, ChronicleRepo, EventRepo, FactionRepo, ItemRepo, KindCount,
    LocationRepo, LoreRepo, PartyRepo, QuestRepo, RecordLookup, RepoError, StoredRecord,
    WorldRepo,
};
use crate::use_cases::time::GameTimeView;
use crate::use_cases::validation::{page_limit, require_non_empty, ValidationError};

/// Page size of listings when the caller gives none.
pub const DEFAULT_LIST_LIMIT: u32 = 50;
/// Page size of searches when the caller gives none.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

const SESSION_CHRONICLES: usize = 3;
const SESSION_EVENTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

// =============================================================================
// Filters
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterFilter {
    pub world_id: WorldId,
    pub location_id: Option<LocationId>,
    pub faction_id: Option<FactionId>,
    pub is_player_character: Option<bool>,
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemFilter {
    pub world_id: WorldId,
    pub owner_id: Option<CharacterId>,
    pub location_id: Option<LocationId>,
    pub blueprint_id: Option<ItemBlueprintId>,
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationFilter {
    pub world_id: WorldId,
    pub parent_location_id: Option<LocationId>,
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestFilter {
    pub world_id: WorldId,
    pub state: Option<QuestState>,
    pub assigned_to: Option<CharacterId>,
    pub giver_id: Option<CharacterId>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventFilter {
    pub world_id: WorldId,
    /// Inclusive game-time bounds in seconds
    pub time_start: Option<u64>,
    pub time_end: Option<u64>,
    pub location_id: Option<LocationId>,
    /// Only events referencing this record
    pub involving: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub newest_first: bool,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactionFilter {
    pub world_id: WorldId,
    pub kind: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartyFilter {
    pub world_id: WorldId,
    pub member_id: Option<CharacterId>,
    pub name: Option<String>,
    pub limit: Option<u32>,
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoreHit {
    pub lore: Lore,
    /// Distinct query tokens found in the entry
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyLocation {
    pub location: Location,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRef {
    pub character_id: CharacterId,
    pub name: String,
}

/// A party with members that no longer exist left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyView {
    pub id: PartyId,
    pub world_id: WorldId,
    pub name: String,
    pub description: String,
    pub members: Vec<MemberRef>,
    pub leader_id: Option<CharacterId>,
    pub formed_at: GameTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub world: World,
    pub game_time: GameTimeView,
    pub counts: Vec<KindCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationContents {
    pub location: Location,
    pub parent: Option<Location>,
    pub children: Vec<Location>,
    pub characters: Vec<Character>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterInventory {
    pub character_id: CharacterId,
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChronicleDetails {
    pub chronicle: Chronicle,
    /// Linked events that still exist, in linked order
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionBootstrap {
    pub world: World,
    pub game_time: GameTimeView,
    pub player_characters: Vec<Character>,
    pub active_quests: Vec<Quest>,
    /// Latest chronicles, oldest first
    pub recent_chronicles: Vec<Chronicle>,
    /// Latest events, oldest first
    pub recent_events: Vec<Event>,
}

// =============================================================================
// Query Operations
// =============================================================================

pub struct QueryOps {
    records: Arc<dyn RecordLookup>,
    worlds: Arc<dyn WorldRepo>,
    characters: Arc<dyn CharacterRepo>,
    items: Arc<dyn ItemRepo>,
    locations: Arc<dyn LocationRepo>,
    factions: Arc<dyn FactionRepo>,
    parties: Arc<dyn PartyRepo>,
    quests: Arc<dyn QuestRepo>,
    events: Arc<dyn EventRepo>,
    chronicles: Arc<dyn ChronicleRepo>,
    lore: Arc<dyn LoreRepo>,
}

impl QueryOps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        records: Arc<dyn RecordLookup>,
        worlds: Arc<dyn WorldRepo>,
        characters: Arc<dyn CharacterRepo>,
        items: Arc<dyn ItemRepo>,
        locations: Arc<dyn LocationRepo>,
        factions: Arc<dyn FactionRepo>,
        parties: Arc<dyn PartyRepo>,
        quests: Arc<dyn QuestRepo>,
        events: Arc<dyn EventRepo>,
        chronicles: Arc<dyn ChronicleRepo>,
        lore: Arc<dyn LoreRepo>,
    ) -> Self {
        Self {
            records,
            worlds,
            characters,
            items,
            locations,
            factions,
            parties,
            quests,
            events,
            chronicles,
            lore,
        }
    }

    // -------------------------------------------------------------------------
    // Polymorphic fetch
    // -------------------------------------------------------------------------

    /// Fetch any record by id. When `expected` is given, a record of another kind
    /// reads as not found.
    pub async fn get_entity(
        &self,
        id: Uuid,
        expected: Option<EntityKind>,
    ) -> Result<StoredRecord, QueryError> {
        let label = expected.map(|k| k.label()).unwrap_or("Entity");
        let stored = found(self.records.get_any(id).await?, label, id)?;
        if expected.is_some_and(|k| k != stored.kind) {
            return Err(RepoError::not_found(label, id).into());
        }

        let record = match stored.kind {
            EntityKind::Party => {
                let party: Party = decode(stored.record)?;
                encode(&self.party_view(party).await?)?
            }
            EntityKind::Faction => {
                let faction: Faction = decode(stored.record)?;
                encode(&self.prune_faction(faction).await?)?
            }
            EntityKind::Item => {
                let mut record = stored.record;
                let item: Item = decode(record.clone())?;
                if !self.holder_exists(item.holder()).await? {
                    record["holder"] = serde_json::Value::Null;
                }
                record
            }
            _ => stored.record,
        };
        tracing::debug!(id = %id, kind = %stored.kind, "Entity fetched");
        Ok(StoredRecord {
            kind: stored.kind,
            record,
        })
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Rank lore by how many distinct query tokens each entry contains. Entries with
    /// no match are dropped; equal scores list the most recent entry first.
    pub async fn search_lore(
        &self,
        world_id: WorldId,
        query: &str,
        tags: &[String],
        limit: Option<u32>,
    ) -> Result<Vec<LoreHit>, QueryError> {
        let limit = page_limit(limit, DEFAULT_SEARCH_LIMIT)?;
        let wanted = tokenize(query);
        if wanted.is_empty() {
            return Err(ValidationError::Empty { field_name: "query" }.into());
        }

        let mut hits: Vec<(usize, LoreHit)> = self
            .lore
            .list_in_world(world_id)
            .await?
            .into_iter()
            .enumerate()
            .filter(|(_, lore)| has_tags(&lore.tags, tags))
            .filter_map(|(seq, lore)| {
                let tokens = lore.search_tokens();
                let score = wanted.iter().filter(|t| tokens.contains(*t)).count();
                (score > 0).then_some((seq, LoreHit { lore, score }))
            })
            .collect();
        hits.sort_by(|(a_seq, a), (b_seq, b)| b.score.cmp(&a.score).then(b_seq.cmp(a_seq)));

        tracing::debug!(world_id = %world_id, query = %query, hits = hits.len(), "Lore searched");
        Ok(hits.into_iter().take(limit).map(|(_, hit)| hit).collect())
    }

    /// Locations of the origin's world within `radius` of it, nearest first. Ties keep
    /// creation order; locations without coordinates are skipped. Every match is
    /// returned unless the caller passes `limit`.
    pub async fn find_nearby_locations(
        &self,
        origin_id: LocationId,
        radius: f64,
        limit: Option<u32>,
    ) -> Result<Vec<NearbyLocation>, QueryError> {
        let limit = limit.map(|l| page_limit(Some(l), l)).transpose()?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(ValidationError::Invalid {
                field_name: "radius",
                reason: "must be a non-negative number".into(),
            }
            .into());
        }
        let origin = found(self.locations.get(origin_id).await?, "Location", origin_id)?;
        let center = origin.coordinates().ok_or_else(|| ValidationError::Invalid {
            field_name: "origin",
            reason: format!("location {} has no coordinates", origin_id),
        })?;

        let mut nearby: Vec<NearbyLocation> = self
            .locations
            .list_in_world(origin.world_id())
            .await?
            .into_iter()
            .filter(|l| l.id() != origin_id)
            .filter_map(|location| {
                let distance = location.coordinates()?.distance_to(&center);
                (distance <= radius).then_some(NearbyLocation { location, distance })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if let Some(limit) = limit {
            nearby.truncate(limit);
        }
        Ok(nearby)
    }

    /// Locations whose name or description contains `query`, case-insensitively.
    pub async fn search_locations(
        &self,
        world_id: WorldId,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Location>, QueryError> {
        require_non_empty(query, "query")?;
        let limit = page_limit(limit, DEFAULT_SEARCH_LIMIT)?;
        Ok(self
            .locations
            .list_in_world(world_id)
            .await?
            .into_iter()
            .filter(|l| contains_ci(l.name(), query) || contains_ci(l.description(), query))
            .take(limit)
            .collect())
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    pub async fn list_characters(&self, f: CharacterFilter) -> Result<Vec<Character>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        Ok(self
            .characters
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|c| f.location_id.is_none_or(|l| c.location_id() == Some(l)))
            .filter(|c| f.faction_id.is_none_or(|id| c.membership(id).is_some()))
            .filter(|c| {
                f.is_player_character
                    .is_none_or(|pc| c.is_player_character() == pc)
            })
            .filter(|c| f.name.as_deref().is_none_or(|n| contains_ci(c.name(), n)))
            .filter(|c| has_tags(c.tags(), &f.tags))
            .take(limit)
            .collect())
    }

    pub async fn list_items(&self, f: ItemFilter) -> Result<Vec<Item>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        Ok(self
            .items
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|i| f.owner_id.is_none_or(|o| i.holder().character_id() == Some(o)))
            .filter(|i| f.location_id.is_none_or(|l| i.holder().location_id() == Some(l)))
            .filter(|i| f.blueprint_id.is_none_or(|b| i.blueprint_id() == Some(b)))
            .filter(|i| f.name.as_deref().is_none_or(|n| contains_ci(i.name(), n)))
            .filter(|i| has_tags(i.tags(), &f.tags))
            .take(limit)
            .collect())
    }

    pub async fn list_locations(&self, f: LocationFilter) -> Result<Vec<Location>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        Ok(self
            .locations
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|l| f.parent_location_id.is_none_or(|p| l.parent_id() == Some(p)))
            .filter(|l| f.name.as_deref().is_none_or(|n| contains_ci(l.name(), n)))
            .filter(|l| has_tags(l.tags(), &f.tags))
            .take(limit)
            .collect())
    }

    pub async fn list_quests(&self, f: QuestFilter) -> Result<Vec<Quest>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        Ok(self
            .quests
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|q| f.state.is_none_or(|s| q.state() == s))
            .filter(|q| f.assigned_to.is_none_or(|c| q.assignees().contains(&c)))
            .filter(|q| f.giver_id.is_none_or(|g| q.giver_id() == Some(g)))
            .filter(|q| has_tags(q.tags(), &f.tags))
            .take(limit)
            .collect())
    }

    /// Events in recorded order, or the reverse with `newest_first`.
    pub async fn list_events(&self, f: EventFilter) -> Result<Vec<Event>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        let mut events: Vec<Event> = self
            .events
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|e| f.time_start.is_none_or(|t| e.game_time.seconds() >= t))
            .filter(|e| f.time_end.is_none_or(|t| e.game_time.seconds() <= t))
            .filter(|e| f.location_id.is_none_or(|l| e.location_id == Some(l)))
            .filter(|e| f.involving.is_none_or(|id| e.refs.iter().any(|r| r.id == id)))
            .filter(|e| has_tags(&e.tags, &f.tags))
            .collect();
        if f.newest_first {
            events.reverse();
        }
        events.truncate(limit);
        Ok(events)
    }

    pub async fn list_factions(&self, f: FactionFilter) -> Result<Vec<Faction>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        Ok(self
            .factions
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|x| f.kind.as_deref().is_none_or(|k| x.kind.eq_ignore_ascii_case(k)))
            .filter(|x| f.name.as_deref().is_none_or(|n| contains_ci(&x.name, n)))
            .filter(|x| has_tags(&x.tags, &f.tags))
            .take(limit)
            .collect())
    }

    pub async fn list_parties(&self, f: PartyFilter) -> Result<Vec<PartyView>, QueryError> {
        let limit = page_limit(f.limit, DEFAULT_LIST_LIMIT)?;
        let parties: Vec<Party> = self
            .parties
            .list_in_world(f.world_id)
            .await?
            .into_iter()
            .filter(|p| f.member_id.is_none_or(|m| p.is_member(m)))
            .filter(|p| f.name.as_deref().is_none_or(|n| contains_ci(p.name(), n)))
            .take(limit)
            .collect();
        let mut views = Vec::with_capacity(parties.len());
        for party in parties {
            views.push(self.party_view(party).await?);
        }
        Ok(views)
    }

    // -------------------------------------------------------------------------
    // Composite views
    // -------------------------------------------------------------------------

    pub async fn get_world_summary(&self, world_id: WorldId) -> Result<WorldSummary, QueryError> {
        let world = self.world(world_id).await?;
        let counts = self.records.count_by_kind(world_id).await?;
        Ok(WorldSummary {
            game_time: GameTimeView::new(world_id, world.game_time),
            world,
            counts,
        })
    }

    pub async fn get_location_contents(
        &self,
        location_id: LocationId,
    ) -> Result<LocationContents, QueryError> {
        let location = found(
            self.locations.get(location_id).await?,
            "Location",
            location_id,
        )?;
        let world_id = location.world_id();
        let parent = match location.parent_id() {
            Some(parent_id) => self.locations.get(parent_id).await?,
            None => None,
        };
        let children = self
            .locations
            .list_in_world(world_id)
            .await?
            .into_iter()
            .filter(|l| l.parent_id() == Some(location_id))
            .collect();
        let characters = self
            .characters
            .list_in_world(world_id)
            .await?
            .into_iter()
            .filter(|c| c.location_id() == Some(location_id))
            .collect();
        let items = self
            .items
            .list_in_world(world_id)
            .await?
            .into_iter()
            .filter(|i| i.holder() == ItemHolder::Location(location_id))
            .collect();

        Ok(LocationContents {
            location,
            parent,
            children,
            characters,
            items,
        })
    }

    pub async fn get_character_inventory(
        &self,
        character_id: CharacterId,
    ) -> Result<CharacterInventory, QueryError> {
        let character = found(
            self.characters.get(character_id).await?,
            "Character",
            character_id,
        )?;
        let items = self
            .items
            .list_in_world(character.world_id())
            .await?
            .into_iter()
            .filter(|i| i.holder() == ItemHolder::Character(character_id))
            .collect();
        Ok(CharacterInventory {
            character_id,
            name: character.name().to_string(),
            items,
        })
    }

    pub async fn get_chronicle_details(
        &self,
        chronicle_id: ChronicleId,
    ) -> Result<ChronicleDetails, QueryError> {
        let chronicle = found(
            self.chronicles.get(chronicle_id).await?,
            "Chronicle",
            chronicle_id,
        )?;
        let mut events = Vec::with_capacity(chronicle.related_events.len());
        for event_id in &chronicle.related_events {
            if let Some(event) = self.events.get(*event_id).await? {
                events.push(event);
            }
        }
        Ok(ChronicleDetails { chronicle, events })
    }

    /// Everything a narrator needs to resume play in one call.
    pub async fn load_session(&self, world_id: WorldId) -> Result<SessionBootstrap, QueryError> {
        let world = self.world(world_id).await?;
        let player_characters = self
            .characters
            .list_in_world(world_id)
            .await?
            .into_iter()
            .filter(Character::is_player_character)
            .collect();
        let active_quests = self
            .quests
            .list_in_world(world_id)
            .await?
            .into_iter()
            .filter(|q| q.state() == QuestState::Active)
            .collect();

        Ok(SessionBootstrap {
            game_time: GameTimeView::new(world_id, world.game_time),
            world,
            player_characters,
            active_quests,
            recent_chronicles: tail(
                self.chronicles.list_in_world(world_id).await?,
                SESSION_CHRONICLES,
            ),
            recent_events: tail(self.events.list_in_world(world_id).await?, SESSION_EVENTS),
        })
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn world(&self, id: WorldId) -> Result<World, QueryError> {
        Ok(found(self.worlds.get(id).await?, "World", id)?)
    }

    async fn party_view(&self, party: Party) -> Result<PartyView, QueryError> {
        let mut members = Vec::with_capacity(party.members().len());
        for member in party.members() {
            if let Some(character) = self.characters.get(*member).await? {
                members.push(MemberRef {
                    character_id: *member,
                    name: character.name().to_string(),
                });
            }
        }
        let live: HashSet<CharacterId> = members.iter().map(|m| m.character_id).collect();
        Ok(PartyView {
            id: party.id(),
            world_id: party.world_id(),
            name: party.name().to_string(),
            description: party.description().to_string(),
            leader_id: party.leader_id().filter(|l| live.contains(l)),
            members,
            formed_at: party.formed_at(),
        })
    }

    async fn prune_faction(&self, mut faction: Faction) -> Result<Faction, QueryError> {
        if let Some(leader_id) = faction.leader_id {
            if self.characters.get(leader_id).await?.is_none() {
                faction.leader_id = None;
            }
        }
        if let Some(hq) = faction.headquarters_id {
            if self.locations.get(hq).await?.is_none() {
                faction.headquarters_id = None;
            }
        }
        let mut relationships = Vec::with_capacity(faction.relationships.len());
        for rel in faction.relationships.drain(..) {
            if self.factions.get(rel.faction_id).await?.is_some() {
                relationships.push(rel);
            }
        }
        faction.relationships = relationships;
        Ok(faction)
    }

    async fn holder_exists(&self, holder: ItemHolder) -> Result<bool, QueryError> {
        Ok(match holder {
            ItemHolder::Character(id) => self.characters.get(id).await?.is_some(),
            ItemHolder::Location(id) => self.locations.get(id).await?.is_some(),
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, RepoError> {
    serde_json::from_value(value).map_err(RepoError::serialization)
}

fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, RepoError> {
    serde_json::to_value(value).map_err(RepoError::serialization)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Every wanted tag is present, ignoring case.
fn has_tags(tags: &[String], wanted: &[String]) -> bool {
    wanted
        .iter()
        .all(|w| tags.iter().any(|t| t.eq_ignore_ascii_case(w.trim())))
}

fn tail<T>(mut records: Vec<T>, n: usize) -> Vec<T> {
    let skip = records.len().saturating_sub(n);
    records.drain(..skip);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{
        MockCharacterRepo, MockChronicleRepo, MockEventRepo, MockFactionRepo, MockItemRepo,
        MockLocationRepo, MockLoreRepo, MockPartyRepo, MockQuestRepo, MockRecordLookup,
        MockWorldRepo,
    };
    use questkeep_domain::{Coordinates, GameTime};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Mocks {
        records: MockRecordLookup,
        worlds: MockWorldRepo,
        characters: MockCharacterRepo,
        items: MockItemRepo,
        locations: MockLocationRepo,
        factions: MockFactionRepo,
        parties: MockPartyRepo,
        quests: MockQuestRepo,
        events: MockEventRepo,
        chronicles: MockChronicleRepo,
        lore: MockLoreRepo,
    }

    impl Mocks {
        fn with_locations(mut self, locations: Vec<Location>) -> Self {
            let all = locations.clone();
            self.locations
                .expect_list_in_world()
                .returning(move |_| Ok(all.clone()));
            let by_id: HashMap<LocationId, Location> =
                locations.into_iter().map(|l| (l.id(), l)).collect();
            self.locations
                .expect_get()
                .returning(move |id| Ok(by_id.get(&id).cloned()));
            self
        }

        fn build(self) -> QueryOps {
            QueryOps::new(
                Arc::new(self.records),
                Arc::new(self.worlds),
                Arc::new(self.characters),
                Arc::new(self.items),
                Arc::new(self.locations),
                Arc::new(self.factions),
                Arc::new(self.parties),
                Arc::new(self.quests),
                Arc::new(self.events),
                Arc::new(self.chronicles),
                Arc::new(self.lore),
            )
        }
    }

    fn place(world_id: WorldId, name: &str, at: Option<(f64, f64)>) -> Location {
        let mut location = Location::new(world_id, name).unwrap();
        location.set_coordinates(at.map(|(x, y)| Coordinates { x, y }));
        location
    }

    fn lore(world_id: WorldId, title: &str, body: &str) -> Lore {
        let mut entry = Lore::new(world_id, title).unwrap();
        entry.body = body.into();
        entry
    }

    #[tokio::test]
    async fn nearby_is_sorted_and_excludes_origin() {
        let w = WorldId::new();
        let origin = place(w, "Origin", Some((0.0, 0.0)));
        let far = place(w, "Far", Some((6.0, 8.0)));
        let near = place(w, "Near", Some((1.0, 0.0)));
        let tie = place(w, "Tie", Some((0.0, 1.0)));
        let lost = place(w, "Unmapped", None);
        let outside = place(w, "Outside", Some((100.0, 0.0)));

        let ops = Mocks::default()
            .with_locations(vec![
                origin.clone(),
                far.clone(),
                near.clone(),
                tie.clone(),
                lost,
                outside,
            ])
            .build();
        let hits = ops.find_nearby_locations(origin.id(), 10.0, None).await.unwrap();

        let names: Vec<&str> = hits.iter().map(|h| h.location.name()).collect();
        assert_eq!(names, vec!["Near", "Tie", "Far"]);
        assert_eq!(hits[2].distance, 10.0);
    }

    #[tokio::test]
    async fn nearby_returns_every_match_unless_limited() {
        let w = WorldId::new();
        let origin = place(w, "Origin", Some((0.0, 0.0)));
        let mut locations = vec![origin.clone()];
        locations.extend((0..60_u32).map(|i| {
            let x = f64::from(i) / 10.0;
            place(w, &format!("Camp {i}"), Some((x, 0.0)))
        }));
        let ops = Mocks::default().with_locations(locations).build();

        let all = ops.find_nearby_locations(origin.id(), 10.0, None).await.unwrap();
        assert_eq!(all.len(), 60);

        let first = ops.find_nearby_locations(origin.id(), 10.0, Some(5)).await.unwrap();
        let names: Vec<&str> = first.iter().map(|h| h.location.name()).collect();
        assert_eq!(names, vec!["Camp 0", "Camp 1", "Camp 2", "Camp 3", "Camp 4"]);
    }

    #[tokio::test]
    async fn when_origin_has_no_coordinates_returns_validation_error() {
        let w = WorldId::new();
        let origin = place(w, "Nowhere", None);
        let ops = Mocks::default().with_locations(vec![origin.clone()]).build();

        let result = ops.find_nearby_locations(origin.id(), 5.0, None).await;
        assert!(matches!(result, Err(QueryError::Validation(_))));
    }

    #[tokio::test]
    async fn lore_ranks_by_distinct_tokens_then_recency() {
        let w = WorldId::new();
        let older = lore(w, "The Dragon War", "dragons burned the coast");
        let unrelated = lore(w, "Harvest rites", "barley and song");
        let best = lore(w, "Dragon King", "the dragon king rules the war council");
        let newer = lore(w, "War of Ash", "a dragon fell");

        let mut mocks = Mocks::default();
        let entries = vec![older.clone(), unrelated, best.clone(), newer.clone()];
        mocks
            .lore
            .expect_list_in_world()
            .returning(move |_| Ok(entries.clone()));

        let hits = mocks
            .build()
            .search_lore(w, "dragon king war", &[], None)
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.lore.id).collect();
        assert_eq!(ids, vec![best.id, newer.id, older.id]);
        assert_eq!(hits[0].score, 3);
        assert_eq!(hits[1].score, 2);
    }

    #[tokio::test]
    async fn when_lore_query_has_no_tokens_returns_validation_error() {
        let result = Mocks::default()
            .build()
            .search_lore(WorldId::new(), "  !! ", &[], None)
            .await;
        assert!(matches!(result, Err(QueryError::Validation(_))));
    }

    #[tokio::test]
    async fn events_newest_first_reverses_recorded_order() {
        let w = WorldId::new();
        let log: Vec<Event> = (0..3)
            .map(|n| {
                Event::record(
                    w,
                    GameTime::from_seconds(100 - n),
                    questkeep_domain::NewEvent {
                        description: format!("event {}", n),
                        ..Default::default()
                    },
                    chrono::Utc::now(),
                )
                .unwrap()
            })
            .collect();

        let mut mocks = Mocks::default();
        let listed = log.clone();
        mocks
            .events
            .expect_list_in_world()
            .returning(move |_| Ok(listed.clone()));

        let events = mocks
            .build()
            .list_events(EventFilter {
                world_id: w,
                time_start: None,
                time_end: None,
                location_id: None,
                involving: None,
                tags: vec![],
                newest_first: true,
                limit: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(events, vec![log[2].clone(), log[1].clone()]);
    }

    #[tokio::test]
    async fn when_expected_kind_differs_get_entity_returns_not_found() {
        let mut mocks = Mocks::default();
        mocks.records.expect_get_any().returning(|_| {
            Ok(Some(StoredRecord {
                kind: EntityKind::Lore,
                record: serde_json::json!({}),
            }))
        });

        let result = mocks
            .build()
            .get_entity(Uuid::new_v4(), Some(EntityKind::Character))
            .await;
        assert!(matches!(result, Err(QueryError::Repo(e)) if e.is_not_found()));
    }

    #[tokio::test]
    async fn party_view_drops_deleted_members() {
        let w = WorldId::new();
        let (gone, here) = (CharacterId::new(), CharacterId::new());
        let party = Party::form(w, "Company", vec![gone, here], Some(gone), GameTime::default())
            .unwrap();

        let mut mocks = Mocks::default();
        let record = serde_json::to_value(&party).unwrap();
        mocks.records.expect_get_any().returning(move |_| {
            Ok(Some(StoredRecord {
                kind: EntityKind::Party,
                record: record.clone(),
            }))
        });
        let survivor = questkeep_domain::Character::new_npc(
            questkeep_domain::NewNonPlayerCharacter {
                world_id: w,
                draft: questkeep_domain::CharacterDraft {
                    name: "Survivor".into(),
                    ..Default::default()
                },
            },
            &questkeep_domain::AttributeShape::default(),
        )
        .unwrap();
        mocks.characters.expect_get().returning(move |id| {
            Ok((id == here).then(|| survivor.clone()))
        });

        let stored = mocks.build().get_entity(party.id().into(), None).await.unwrap();
        assert_eq!(stored.kind, EntityKind::Party);
        assert_eq!(stored.record["members"].as_array().map(Vec::len), Some(1));
        assert_eq!(stored.record["members"][0]["name"], "Survivor");
        assert!(stored.record["leader_id"].is_null());
    }
}
