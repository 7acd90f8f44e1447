//! Application state and composition.

use std::path::Path;
use std::sync::Arc;

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    locks::EntityLocks,
    ports::{
        BlueprintRepo, CharacterRepo, ChronicleRepo, ClockPort, EncounterRepo, EventRepo,
        FactionRepo, ItemRepo, LocationRepo, LoreRepo, PartyRepo, QuestRepo, RandomPort,
        RecordLookup, WorldRepo,
    },
    sqlite::SqliteStore,
};
use crate::tools::{Capabilities, ToolRouter};
use crate::use_cases;

/// Main application state.
///
/// Passed to HTTP handlers via Axum state. Every mutation goes through the router.
pub struct App {
    pub repositories: Repositories,
    pub router: ToolRouter,
}

/// Container for all repository ports.
pub struct Repositories {
    pub world: Arc<dyn WorldRepo>,
    pub character: Arc<dyn CharacterRepo>,
    pub item: Arc<dyn ItemRepo>,
    pub location: Arc<dyn LocationRepo>,
    pub faction: Arc<dyn FactionRepo>,
    pub party: Arc<dyn PartyRepo>,
    pub quest: Arc<dyn QuestRepo>,
    pub event: Arc<dyn EventRepo>,
    pub chronicle: Arc<dyn ChronicleRepo>,
    pub lore: Arc<dyn LoreRepo>,
    pub encounter: Arc<dyn EncounterRepo>,
    pub blueprint: Arc<dyn BlueprintRepo>,
    pub records: Arc<dyn RecordLookup>,
}

impl Repositories {
    /// Every port served by one SQLite store.
    pub fn sqlite(store: Arc<SqliteStore>) -> Self {
        Self {
            world: store.clone(),
            character: store.clone(),
            item: store.clone(),
            location: store.clone(),
            faction: store.clone(),
            party: store.clone(),
            quest: store.clone(),
            event: store.clone(),
            chronicle: store.clone(),
            lore: store.clone(),
            encounter: store.clone(),
            blueprint: store.clone(),
            records: store,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub character: use_cases::CharacterOps,
    pub item: use_cases::ItemOps,
    pub world: use_cases::WorldOps,
    pub party: use_cases::PartyOps,
    pub quest: use_cases::QuestOps,
    pub history: use_cases::HistoryOps,
    pub time: use_cases::TimeOps,
    pub encounter: use_cases::EncounterOps,
    pub query: use_cases::QueryOps,
    pub dice: use_cases::DiceOps,
}

impl UseCases {
    /// Wire every use case against `repos`. All mutating use cases share one lock
    /// registry so a record is serialized across entry points.
    pub fn new(
        repos: &Repositories,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let locks = Arc::new(EntityLocks::new());

        let character = use_cases::CharacterOps::new(
            repos.character.clone(),
            repos.world.clone(),
            repos.location.clone(),
            repos.faction.clone(),
            repos.blueprint.clone(),
            locks.clone(),
        );
        let item = use_cases::ItemOps::new(
            repos.item.clone(),
            repos.character.clone(),
            repos.location.clone(),
            repos.blueprint.clone(),
            repos.world.clone(),
            locks.clone(),
        );
        let world = use_cases::WorldOps::new(
            repos.world.clone(),
            repos.location.clone(),
            repos.faction.clone(),
            repos.character.clone(),
            repos.blueprint.clone(),
            repos.lore.clone(),
            clock.clone(),
            locks.clone(),
        );
        let party = use_cases::PartyOps::new(
            repos.party.clone(),
            repos.character.clone(),
            repos.world.clone(),
            locks.clone(),
        );
        let quest = use_cases::QuestOps::new(
            repos.quest.clone(),
            repos.character.clone(),
            repos.world.clone(),
            locks.clone(),
        );
        let history = use_cases::HistoryOps::new(
            repos.event.clone(),
            repos.chronicle.clone(),
            repos.location.clone(),
            repos.world.clone(),
            clock,
            locks.clone(),
        );
        let time = use_cases::TimeOps::new(repos.world.clone(), locks.clone());
        let encounter = use_cases::EncounterOps::new(
            repos.encounter.clone(),
            repos.character.clone(),
            repos.location.clone(),
            repos.world.clone(),
            locks,
        );
        let query = use_cases::QueryOps::new(
            repos.records.clone(),
            repos.world.clone(),
            repos.character.clone(),
            repos.item.clone(),
            repos.location.clone(),
            repos.faction.clone(),
            repos.party.clone(),
            repos.quest.clone(),
            repos.event.clone(),
            repos.chronicle.clone(),
            repos.lore.clone(),
        );
        let dice = use_cases::DiceOps::new(random);

        Self {
            character,
            item,
            world,
            party,
            quest,
            history,
            time,
            encounter,
            query,
            dice,
        }
    }
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        repositories: Repositories,
        capabilities: Capabilities,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let use_cases = UseCases::new(&repositories, clock, random);
        let router = ToolRouter::new(capabilities, use_cases);
        Self {
            repositories,
            router,
        }
    }

    /// Open (or create) the SQLite store at `db_path` and load the capability table.
    pub async fn open(db_path: &str, capabilities_path: &Path) -> anyhow::Result<Self> {
        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let random: Arc<dyn RandomPort> = Arc::new(SystemRandom::new());

        let capabilities = Capabilities::load(capabilities_path)?;
        let store = Arc::new(SqliteStore::open(db_path, clock.clone()).await?);
        tracing::info!(db_path = %db_path, "Record store ready");

        Ok(Self::new(
            Repositories::sqlite(store),
            capabilities,
            clock,
            random,
        ))
    }
}
