//! Repository port traits for database access.
//!
//! Every `list_in_world` returns records in creation order. Updating a record never
//! moves it.

use async_trait::async_trait;
use questkeep_domain::*;
use uuid::Uuid;

use super::error::RepoError;
use super::types::{KindCount, StoredRecord};

// =============================================================================
// Database Ports (one per entity type)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldRepo: Send + Sync {
    async fn get(&self, id: WorldId) -> Result<Option<World>, RepoError>;
    async fn save(&self, world: &World) -> Result<(), RepoError>;
    async fn list(&self) -> Result<Vec<World>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
    async fn save(&self, character: &Character) -> Result<(), RepoError>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: CharacterId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Character>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepoError>;
    async fn save(&self, item: &Item) -> Result<(), RepoError>;
    async fn delete(&self, id: ItemId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Item>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationRepo: Send + Sync {
    async fn get(&self, id: LocationId) -> Result<Option<Location>, RepoError>;
    async fn save(&self, location: &Location) -> Result<(), RepoError>;
    async fn delete(&self, id: LocationId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Location>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactionRepo: Send + Sync {
    async fn get(&self, id: FactionId) -> Result<Option<Faction>, RepoError>;
    async fn save(&self, faction: &Faction) -> Result<(), RepoError>;
    async fn delete(&self, id: FactionId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Faction>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PartyRepo: Send + Sync {
    async fn get(&self, id: PartyId) -> Result<Option<Party>, RepoError>;
    async fn save(&self, party: &Party) -> Result<(), RepoError>;
    async fn delete(&self, id: PartyId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Party>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestRepo: Send + Sync {
    async fn get(&self, id: QuestId) -> Result<Option<Quest>, RepoError>;
    async fn save(&self, quest: &Quest) -> Result<(), RepoError>;
    async fn delete(&self, id: QuestId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Quest>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn get(&self, id: EventId) -> Result<Option<Event>, RepoError>;
    async fn save(&self, event: &Event) -> Result<(), RepoError>;
    async fn delete(&self, id: EventId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Event>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChronicleRepo: Send + Sync {
    async fn get(&self, id: ChronicleId) -> Result<Option<Chronicle>, RepoError>;
    async fn save(&self, chronicle: &Chronicle) -> Result<(), RepoError>;
    async fn delete(&self, id: ChronicleId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Chronicle>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoreRepo: Send + Sync {
    async fn get(&self, id: LoreId) -> Result<Option<Lore>, RepoError>;
    async fn save(&self, lore: &Lore) -> Result<(), RepoError>;
    async fn delete(&self, id: LoreId) -> Result<bool, RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Lore>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncounterRepo: Send + Sync {
    async fn get(&self, id: EncounterId) -> Result<Option<Encounter>, RepoError>;
    async fn save(&self, encounter: &Encounter) -> Result<(), RepoError>;
    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Encounter>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlueprintRepo: Send + Sync {
    async fn get_item_blueprint(
        &self,
        id: ItemBlueprintId,
    ) -> Result<Option<ItemBlueprint>, RepoError>;
    async fn save_item_blueprint(&self, blueprint: &ItemBlueprint) -> Result<(), RepoError>;
    async fn get_ability_blueprint(
        &self,
        id: AbilityBlueprintId,
    ) -> Result<Option<AbilityBlueprint>, RepoError>;
    async fn save_ability_blueprint(&self, blueprint: &AbilityBlueprint)
        -> Result<(), RepoError>;
}

// =============================================================================
// Kind-agnostic lookups
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Fetch any record by id, along with the kind it was stored as.
    async fn get_any(&self, id: Uuid) -> Result<Option<StoredRecord>, RepoError>;
    /// Count a world's records, one entry per kind present.
    async fn count_by_kind(&self, world_id: WorldId) -> Result<Vec<KindCount>, RepoError>;
}
