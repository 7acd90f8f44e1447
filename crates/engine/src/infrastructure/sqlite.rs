//! SQLite-backed record store.
//!
//! Every record kind lives in one `records` table keyed by id, with its kind stored
//! alongside so a record can be fetched without knowing what it is. `seq` is assigned
//! on first insert and never changes, which gives listings a stable creation order
//! that survives updates and deletions of other rows.

use async_trait::async_trait;
use questkeep_domain::*;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::infrastructure::ports::{
    BlueprintRepo, ChronicleRepo, CharacterRepo, ClockPort, EncounterRepo, EventRepo,
    FactionRepo, ItemRepo, KindCount, LocationRepo, LoreRepo, PartyRepo, QuestRepo,
    RecordLookup, RepoError, StoredRecord, WorldRepo,
};

/// A record that can be stored in the `records` table.
trait Record: Serialize + DeserializeOwned + Send + Sync {
    const KIND: EntityKind;
    fn record_id(&self) -> Uuid;
    fn owning_world(&self) -> Uuid;
}

macro_rules! aggregate_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: EntityKind = $kind;
            fn record_id(&self) -> Uuid {
                self.id().into()
            }
            fn owning_world(&self) -> Uuid {
                self.world_id().into()
            }
        }
    };
}

macro_rules! entity_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: EntityKind = $kind;
            fn record_id(&self) -> Uuid {
                self.id.into()
            }
            fn owning_world(&self) -> Uuid {
                self.world_id.into()
            }
        }
    };
}

aggregate_record!(Character, EntityKind::Character);
aggregate_record!(Item, EntityKind::Item);
aggregate_record!(Location, EntityKind::Location);
aggregate_record!(Party, EntityKind::Party);
aggregate_record!(Quest, EntityKind::Quest);
aggregate_record!(Encounter, EntityKind::Encounter);
entity_record!(Faction, EntityKind::Faction);
entity_record!(Event, EntityKind::Event);
entity_record!(Chronicle, EntityKind::Chronicle);
entity_record!(Lore, EntityKind::Lore);
entity_record!(ItemBlueprint, EntityKind::ItemBlueprint);
entity_record!(AbilityBlueprint, EntityKind::AbilityBlueprint);

// A world owns itself, so world-scoped queries never need a special case.
impl Record for World {
    const KIND: EntityKind = EntityKind::World;
    fn record_id(&self) -> Uuid {
        self.id.into()
    }
    fn owning_world(&self) -> Uuid {
        self.id.into()
    }
}

/// SQLite implementation of every repository port.
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `db_path`.
    pub async fn open(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))
            .map_err(|e| RepoError::database("open", e))?
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| RepoError::database("open", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                world_id TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_world_kind ON records (world_id, kind, seq)",
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        tracing::debug!(path = %db_path, "Record store ready");
        Ok(Self { pool, clock })
    }

    async fn put<R: Record>(&self, record: &R) -> Result<(), RepoError> {
        let body = serde_json::to_string(record).map_err(RepoError::serialization)?;
        let now = self.clock.now().to_rfc3339();
        let id = record.record_id();

        let result = sqlx::query(
            r#"
            INSERT INTO records (id, kind, world_id, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                world_id = excluded.world_id,
                body = excluded.body,
                updated_at = excluded.updated_at
            WHERE records.kind = excluded.kind
            "#,
        )
        .bind(id.to_string())
        .bind(R::KIND.as_str())
        .bind(record.owning_world().to_string())
        .bind(body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save", e))?;

        if result.rows_affected() == 0 {
            // The id exists under another kind
            let actual = self
                .kind_of(id)
                .await?
                .map(|k| k.as_str().to_string())
                .unwrap_or_default();
            return Err(RepoError::KindMismatch {
                id: id.to_string(),
                expected: R::KIND.as_str(),
                actual,
            });
        }
        Ok(())
    }

    /// Fetch a record of kind `R`. An id stored under another kind reads as absent.
    async fn fetch<R: Record>(&self, id: Uuid) -> Result<Option<R>, RepoError> {
        let row = sqlx::query("SELECT body FROM records WHERE id = ? AND kind = ?")
            .bind(id.to_string())
            .bind(R::KIND.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get", e))?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                let record = serde_json::from_str(&body).map_err(RepoError::serialization)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, kind: EntityKind, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM records WHERE id = ? AND kind = ?")
            .bind(id.to_string())
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("delete", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list<R: Record>(&self, world_id: Uuid) -> Result<Vec<R>, RepoError> {
        let rows = sqlx::query(
            "SELECT body FROM records WHERE world_id = ? AND kind = ? ORDER BY seq ASC",
        )
        .bind(world_id.to_string())
        .bind(R::KIND.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list", e))?;

        rows.iter()
            .map(|row| {
                let body: String = row.get("body");
                serde_json::from_str(&body).map_err(RepoError::serialization)
            })
            .collect()
    }

    async fn kind_of(&self, id: Uuid) -> Result<Option<EntityKind>, RepoError> {
        let row = sqlx::query("SELECT kind FROM records WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("kind_of", e))?;
        row.map(|row| {
            let kind: String = row.get("kind");
            parse_kind(&kind)
        })
        .transpose()
    }
}

fn parse_kind(kind: &str) -> Result<EntityKind, RepoError> {
    kind.parse::<EntityKind>()
        .map_err(|e| RepoError::serialization(format!("stored kind '{}': {}", kind, e)))
}

// =============================================================================
// Port implementations
// =============================================================================

#[async_trait]
impl WorldRepo for SqliteStore {
    async fn get(&self, id: WorldId) -> Result<Option<World>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, world: &World) -> Result<(), RepoError> {
        self.put(world).await
    }

    async fn list(&self) -> Result<Vec<World>, RepoError> {
        let rows = sqlx::query("SELECT body FROM records WHERE kind = ? ORDER BY seq ASC")
            .bind(EntityKind::World.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("list_worlds", e))?;
        rows.iter()
            .map(|row| {
                let body: String = row.get("body");
                serde_json::from_str(&body).map_err(RepoError::serialization)
            })
            .collect()
    }
}

#[async_trait]
impl CharacterRepo for SqliteStore {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, character: &Character) -> Result<(), RepoError> {
        self.put(character).await
    }

    async fn delete(&self, id: CharacterId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Character, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Character>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl ItemRepo for SqliteStore {
    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, item: &Item) -> Result<(), RepoError> {
        self.put(item).await
    }

    async fn delete(&self, id: ItemId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Item, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Item>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl LocationRepo for SqliteStore {
    async fn get(&self, id: LocationId) -> Result<Option<Location>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, location: &Location) -> Result<(), RepoError> {
        self.put(location).await
    }

    async fn delete(&self, id: LocationId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Location, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Location>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl FactionRepo for SqliteStore {
    async fn get(&self, id: FactionId) -> Result<Option<Faction>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, faction: &Faction) -> Result<(), RepoError> {
        self.put(faction).await
    }

    async fn delete(&self, id: FactionId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Faction, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Faction>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl PartyRepo for SqliteStore {
    async fn get(&self, id: PartyId) -> Result<Option<Party>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, party: &Party) -> Result<(), RepoError> {
        self.put(party).await
    }

    async fn delete(&self, id: PartyId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Party, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Party>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl QuestRepo for SqliteStore {
    async fn get(&self, id: QuestId) -> Result<Option<Quest>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, quest: &Quest) -> Result<(), RepoError> {
        self.put(quest).await
    }

    async fn delete(&self, id: QuestId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Quest, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Quest>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl EventRepo for SqliteStore {
    async fn get(&self, id: EventId) -> Result<Option<Event>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, event: &Event) -> Result<(), RepoError> {
        self.put(event).await
    }

    async fn delete(&self, id: EventId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Event, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Event>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl ChronicleRepo for SqliteStore {
    async fn get(&self, id: ChronicleId) -> Result<Option<Chronicle>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, chronicle: &Chronicle) -> Result<(), RepoError> {
        self.put(chronicle).await
    }

    async fn delete(&self, id: ChronicleId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Chronicle, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Chronicle>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl LoreRepo for SqliteStore {
    async fn get(&self, id: LoreId) -> Result<Option<Lore>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, lore: &Lore) -> Result<(), RepoError> {
        self.put(lore).await
    }

    async fn delete(&self, id: LoreId) -> Result<bool, RepoError> {
        self.remove(EntityKind::Lore, id.into()).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Lore>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl EncounterRepo for SqliteStore {
    async fn get(&self, id: EncounterId) -> Result<Option<Encounter>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save(&self, encounter: &Encounter) -> Result<(), RepoError> {
        self.put(encounter).await
    }

    async fn list_in_world(&self, world_id: WorldId) -> Result<Vec<Encounter>, RepoError> {
        self.list(world_id.into()).await
    }
}

#[async_trait]
impl BlueprintRepo for SqliteStore {
    async fn get_item_blueprint(
        &self,
        id: ItemBlueprintId,
    ) -> Result<Option<ItemBlueprint>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save_item_blueprint(&self, blueprint: &ItemBlueprint) -> Result<(), RepoError> {
        self.put(blueprint).await
    }

    async fn get_ability_blueprint(
        &self,
        id: AbilityBlueprintId,
    ) -> Result<Option<AbilityBlueprint>, RepoError> {
        self.fetch(id.into()).await
    }

    async fn save_ability_blueprint(
        &self,
        blueprint: &AbilityBlueprint,
    ) -> Result<(), RepoError> {
        self.put(blueprint).await
    }
}

#[async_trait]
impl RecordLookup for SqliteStore {
    async fn get_any(&self, id: Uuid) -> Result<Option<StoredRecord>, RepoError> {
        let row = sqlx::query("SELECT kind, body FROM records WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_any", e))?;

        match row {
            Some(row) => {
                let kind: String = row.get("kind");
                let body: String = row.get("body");
                Ok(Some(StoredRecord {
                    kind: parse_kind(&kind)?,
                    record: serde_json::from_str(&body).map_err(RepoError::serialization)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn count_by_kind(&self, world_id: WorldId) -> Result<Vec<KindCount>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT kind, COUNT(*) AS n FROM records
            WHERE world_id = ? AND kind != ?
            GROUP BY kind
            "#,
        )
        .bind(world_id.to_string())
        .bind(EntityKind::World.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("count_by_kind", e))?;

        let mut counts = rows
            .iter()
            .map(|row| {
                let kind: String = row.get("kind");
                let n: i64 = row.get("n");
                Ok(KindCount {
                    kind: parse_kind(&kind)?,
                    count: u64::try_from(n).unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>, RepoError>>()?;
        counts.sort_by_key(|c| EntityKind::ALL.iter().position(|k| *k == c.kind));
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    async fn open(dir: &tempfile::TempDir) -> SqliteStore {
        let path = dir.path().join("store.db");
        let clock: Arc<dyn ClockPort> =
            Arc::new(FixedClock(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        SqliteStore::open(&path.to_string_lossy(), clock)
            .await
            .expect("open store")
    }

    fn npc(world_id: WorldId, name: &str) -> Character {
        Character::new_npc(
            NewNonPlayerCharacter {
                world_id,
                draft: CharacterDraft {
                    name: name.into(),
                    attributes: vec![Attribute::new("HP", 10).with_max(10)],
                    ..Default::default()
                },
            },
            &AttributeShape::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn list_keeps_creation_order_across_updates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open(&dir).await;
        let world = World::new("Greyhawk", Utc::now()).unwrap();
        WorldRepo::save(&store, &world).await.unwrap();

        let mut first = npc(world.id, "First");
        let second = npc(world.id, "Second");
        CharacterRepo::save(&store, &first).await.unwrap();
        CharacterRepo::save(&store, &second).await.unwrap();

        first.set_level(4).unwrap();
        CharacterRepo::save(&store, &first).await.unwrap();

        let names: Vec<String> = CharacterRepo::list_in_world(&store, world.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn get_any_reports_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open(&dir).await;
        let world = World::new("Greyhawk", Utc::now()).unwrap();
        WorldRepo::save(&store, &world).await.unwrap();
        let goblin = npc(world.id, "Goblin");
        CharacterRepo::save(&store, &goblin).await.unwrap();

        let found = store.get_any(goblin.id().into()).await.unwrap().unwrap();
        assert_eq!(found.kind, EntityKind::Character);
        assert_eq!(found.record["name"], "Goblin");
        assert!(store.get_any(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn typed_get_of_other_kind_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open(&dir).await;
        let world = World::new("Greyhawk", Utc::now()).unwrap();
        WorldRepo::save(&store, &world).await.unwrap();

        let as_character = CharacterRepo::get(&store, CharacterId::from_uuid(world.id.into()))
            .await
            .unwrap();
        assert!(as_character.is_none());
    }

    #[tokio::test]
    async fn delete_leaves_remaining_order_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open(&dir).await;
        let world = World::new("Greyhawk", Utc::now()).unwrap();
        let a = npc(world.id, "A");
        let b = npc(world.id, "B");
        let c = npc(world.id, "C");
        for character in [&a, &b, &c] {
            CharacterRepo::save(&store, character).await.unwrap();
        }

        assert!(CharacterRepo::delete(&store, b.id()).await.unwrap());
        assert!(!CharacterRepo::delete(&store, b.id()).await.unwrap());

        let ids: Vec<CharacterId> = CharacterRepo::list_in_world(&store, world.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(ids, vec![a.id(), c.id()]);
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let world = World::new("Greyhawk", Utc::now()).unwrap();
        {
            let store = open(&dir).await;
            WorldRepo::save(&store, &world).await.unwrap();
        }
        let store = open(&dir).await;
        let reloaded = WorldRepo::get(&store, world.id).await.unwrap().unwrap();
        assert_eq!(reloaded, world);
    }

    #[tokio::test]
    async fn count_by_kind_excludes_the_world_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open(&dir).await;
        let world = World::new("Greyhawk", Utc::now()).unwrap();
        WorldRepo::save(&store, &world).await.unwrap();
        CharacterRepo::save(&store, &npc(world.id, "A")).await.unwrap();
        CharacterRepo::save(&store, &npc(world.id, "B")).await.unwrap();

        let counts = store.count_by_kind(world.id).await.unwrap();
        assert_eq!(
            counts,
            vec![KindCount {
                kind: EntityKind::Character,
                count: 2
            }]
        );
    }
}
