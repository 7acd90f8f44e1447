//! The single entry point for tool calls.
//!
//! A call is `(role, operation, arguments)`. The role's capability set is checked
//! before arguments are even decoded, so a rejected call never touches the store.
//! Character-kind restrictions come from [`Operation::character_kind`] and cannot
//! be influenced by arguments.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use questkeep_domain::{CharacterKind, EntityKind, GameTime};

use crate::app::UseCases;
use crate::use_cases::encounter::StartEncounterInput;
use crate::use_cases::history::{ChronicleInput, EventInput};
use crate::use_cases::item::SpawnItemInput;
use crate::use_cases::query::{
    CharacterFilter, EventFilter, FactionFilter, ItemFilter, LocationFilter, PartyFilter,
    QuestFilter,
};
use crate::use_cases::quest::QuestInput;
use crate::use_cases::world::{
    AbilityBlueprintInput, FactionInput, ItemBlueprintInput, LocationInput, LoreInput,
    WorldInput,
};

use super::args::*;
use super::capabilities::Capabilities;
use super::error::{ErrorKind, ToolError};
use super::operation::Operation;
use super::role::Role;

pub struct ToolRouter {
    capabilities: Capabilities,
    use_cases: UseCases,
}

impl ToolRouter {
    pub fn new(capabilities: Capabilities, use_cases: UseCases) -> Self {
        Self {
            capabilities,
            use_cases,
        }
    }

    /// Dispatch a call by wire names. Unknown roles and operations are permission
    /// errors: neither can be in any capability set.
    pub async fn call(&self, role: &str, operation: &str, args: Value) -> Result<Value, ToolError> {
        let Ok(role) = role.parse::<Role>() else {
            tracing::warn!(role = %role, operation = %operation, "Tool call from unknown role");
            return Err(ToolError::permission(format!("Unknown role: {}", role)));
        };
        let Ok(op) = operation.parse::<Operation>() else {
            tracing::warn!(role = %role, operation = %operation, "Unknown operation requested");
            return Err(ToolError::permission(format!(
                "Role {} may not call {}",
                role, operation
            )));
        };
        self.call_as(role, op, args).await
    }

    pub async fn call_as(
        &self,
        role: Role,
        op: Operation,
        args: Value,
    ) -> Result<Value, ToolError> {
        if !self.capabilities.allows(role, op) {
            tracing::warn!(role = %role, operation = %op, "Operation not permitted for role");
            return Err(ToolError::permission(format!("Role {} may not call {}", role, op)));
        }

        tracing::debug!(role = %role, operation = %op, "Dispatching tool call");
        let result = self.dispatch(role, op, args).await;
        if let Err(e) = &result {
            tracing::warn!(
                role = %role,
                operation = %op,
                kind = e.kind.as_str(),
                error = %e.message,
                "Tool call failed"
            );
        }
        result
    }

    /// The capability set of `role`.
    pub fn operations(&self, role: Role) -> Vec<Operation> {
        self.capabilities.operations(role)
    }

    async fn dispatch(&self, role: Role, op: Operation, args: Value) -> Result<Value, ToolError> {
        use Operation::*;

        let uc = &self.use_cases;
        match op {
            // -----------------------------------------------------------------
            // Characters
            // -----------------------------------------------------------------
            CreateNpc => {
                let a: CreateCharacterArgs = decode(op, args)?;
                reply(uc.character.create_npc(a.world_id, a.character).await?)
            }
            CreatePlayerCharacter => {
                let a: CreateCharacterArgs = decode(op, args)?;
                reply(uc.character.create_player_character(a.world_id, a.character).await?)
            }
            UpdateNpc | UpdatePlayerCharacter => {
                let a: UpdateCharacterArgs = decode(op, args)?;
                let kind = bound_kind(op)?;
                reply(uc.character.update(a.character_id, kind, a.patch).await?)
            }
            SpawnEnemies => self.spawn_enemies(decode(op, args)?).await,
            FinalizeCharacter => {
                let a: CharacterArgs = decode(op, args)?;
                reply(uc.character.finalize(a.character_id).await?)
            }
            DeleteCharacter => {
                let a: CharacterArgs = decode(op, args)?;
                uc.character.delete(a.character_id).await?;
                Ok(deleted(EntityKind::Character, a.character_id))
            }
            MoveCharacter => {
                let a: MoveCharacterArgs = decode(op, args)?;
                reply(uc.character.move_to(a.character_id, a.location_id).await?)
            }
            SetLevel => {
                let a: SetLevelArgs = decode(op, args)?;
                reply(uc.character.set_level(a.character_id, a.level).await?)
            }
            SetAttributes => {
                let a: SetAttributesArgs = decode(op, args)?;
                reply(uc.character.set_attributes(a.character_id, a.attributes).await?)
            }
            SetSkills => {
                let a: SetSkillsArgs = decode(op, args)?;
                reply(uc.character.set_skills(a.character_id, a.skills).await?)
            }
            GrantAbilities => {
                let a: GrantAbilitiesArgs = decode(op, args)?;
                reply(uc.character.grant_abilities(a.character_id, a.abilities).await?)
            }
            RevokeAbility => {
                let a: CharacterNameArgs = decode(op, args)?;
                reply(uc.character.revoke_ability(a.character_id, &a.name).await?)
            }
            ApplyStatuses => {
                let a: ApplyStatusesArgs = decode(op, args)?;
                reply(uc.character.apply_statuses(a.character_id, a.statuses).await?)
            }
            RemoveStatus => {
                let a: CharacterNameArgs = decode(op, args)?;
                reply(uc.character.remove_status(a.character_id, &a.name).await?)
            }
            JoinFaction => {
                let a: JoinFactionArgs = decode(op, args)?;
                reply(uc.character.join_faction(a.character_id, a.membership).await?)
            }
            LeaveFaction => {
                let a: LeaveFactionArgs = decode(op, args)?;
                reply(uc.character.leave_faction(a.character_id, a.faction_id).await?)
            }
            SetFactionStanding => {
                let a: FactionStandingArgs = decode(op, args)?;
                reply(
                    uc.character
                        .set_faction_standing(
                            a.character_id,
                            a.faction_id,
                            a.rank,
                            a.reputation,
                            a.role,
                        )
                        .await?,
                )
            }
            DealDamage => {
                let a: DamageArgs = decode(op, args)?;
                reply(
                    uc.character
                        .deal_damage(a.character_id, a.amount, a.source, a.damage_type)
                        .await?,
                )
            }
            Heal => {
                let a: AmountArgs = decode(op, args)?;
                reply(uc.character.heal(a.character_id, a.amount).await?)
            }

            // -----------------------------------------------------------------
            // Items
            // -----------------------------------------------------------------
            SpawnItem => {
                let input: SpawnItemInput = decode(op, args)?;
                reply(uc.item.spawn(input).await?)
            }
            DestroyItem => {
                let a: ItemArgs = decode(op, args)?;
                uc.item.destroy(a.item_id).await?;
                Ok(deleted(EntityKind::Item, a.item_id))
            }
            GiveItem => {
                let a: GiveItemArgs = decode(op, args)?;
                reply(uc.item.give(a.item_id, a.character_id).await?)
            }
            DropItem => {
                let a: DropItemArgs = decode(op, args)?;
                reply(uc.item.drop_at(a.item_id, a.location_id).await?)
            }
            SetItemQuantity => {
                let a: ItemQuantityArgs = decode(op, args)?;
                reply(uc.item.set_quantity(a.item_id, a.quantity).await?)
            }
            SetItemAttribute => {
                let a: ItemAttributeArgs = decode(op, args)?;
                reply(uc.item.set_attribute(a.item_id, a.attribute).await?)
            }
            ApplyItemStatus => {
                let a: ItemStatusArgs = decode(op, args)?;
                reply(uc.item.apply_status(a.item_id, a.status).await?)
            }
            RemoveItemStatus => {
                let a: ItemNameArgs = decode(op, args)?;
                reply(uc.item.remove_status(a.item_id, &a.name).await?)
            }

            // -----------------------------------------------------------------
            // World-building
            // -----------------------------------------------------------------
            SetWorld => {
                let input: WorldInput = decode(op, args)?;
                reply(uc.world.set_world(input).await?)
            }
            SetLocation => {
                let input: LocationInput = decode(op, args)?;
                reply(uc.world.set_location(input).await?)
            }
            DeleteLocation => {
                let a: LocationArgs = decode(op, args)?;
                uc.world.delete_location(a.location_id).await?;
                Ok(deleted(EntityKind::Location, a.location_id))
            }
            SetFaction => {
                let input: FactionInput = decode(op, args)?;
                reply(uc.world.set_faction(input).await?)
            }
            DeleteFaction => {
                let a: FactionArgs = decode(op, args)?;
                uc.world.delete_faction(a.faction_id).await?;
                Ok(deleted(EntityKind::Faction, a.faction_id))
            }
            SetItemBlueprint => {
                let input: ItemBlueprintInput = decode(op, args)?;
                reply(uc.world.set_item_blueprint(input).await?)
            }
            SetAbilityBlueprint => {
                let input: AbilityBlueprintInput = decode(op, args)?;
                reply(uc.world.set_ability_blueprint(input).await?)
            }
            SetLore => {
                let input: LoreInput = decode(op, args)?;
                reply(uc.world.set_lore(input).await?)
            }
            DeleteLore => {
                let a: LoreArgs = decode(op, args)?;
                uc.world.delete_lore(a.lore_id).await?;
                Ok(deleted(EntityKind::Lore, a.lore_id))
            }

            // -----------------------------------------------------------------
            // Parties
            // -----------------------------------------------------------------
            FormParty => {
                let a: FormPartyArgs = decode(op, args)?;
                reply(
                    uc.party
                        .form(a.world_id, a.name, a.members, a.leader_id, a.description)
                        .await?,
                )
            }
            DisbandParty => {
                let a: PartyArgs = decode(op, args)?;
                uc.party.disband(a.party_id).await?;
                Ok(deleted(EntityKind::Party, a.party_id))
            }
            RenameParty => {
                let a: RenamePartyArgs = decode(op, args)?;
                reply(uc.party.rename(a.party_id, a.name, a.description).await?)
            }
            AddToParty => {
                let a: PartyMemberArgs = decode(op, args)?;
                reply(uc.party.add_member(a.party_id, a.character_id).await?)
            }
            RemoveFromParty => {
                let a: PartyMemberArgs = decode(op, args)?;
                reply(uc.party.remove_member(a.party_id, a.character_id).await?)
            }
            SetPartyLeader => {
                let a: PartyLeaderArgs = decode(op, args)?;
                reply(uc.party.set_leader(a.party_id, a.leader_id).await?)
            }

            // -----------------------------------------------------------------
            // Quests
            // -----------------------------------------------------------------
            CreateQuest => {
                let input: QuestInput = decode(op, args)?;
                reply(uc.quest.create(input).await?)
            }
            BeginQuest => {
                let a: BeginQuestArgs = decode(op, args)?;
                reply(uc.quest.begin(a.quest_id, a.assignees).await?)
            }
            UpdateQuest => {
                let a: UpdateQuestArgs = decode(op, args)?;
                reply(uc.quest.update(a.quest_id, a.patch).await?)
            }
            CompleteQuest => {
                let a: QuestArgs = decode(op, args)?;
                reply(uc.quest.complete(a.quest_id).await?)
            }
            AbandonQuest => {
                let a: QuestArgs = decode(op, args)?;
                reply(uc.quest.abandon(a.quest_id).await?)
            }
            DeleteQuest => {
                let a: QuestArgs = decode(op, args)?;
                uc.quest.delete(a.quest_id).await?;
                Ok(deleted(EntityKind::Quest, a.quest_id))
            }

            // -----------------------------------------------------------------
            // History
            // -----------------------------------------------------------------
            RecordEvent => {
                let input: EventInput = decode(op, args)?;
                reply(uc.history.record_event(input).await?)
            }
            DeleteEvent => {
                let a: EventArgs = decode(op, args)?;
                uc.history.delete_event(a.event_id).await?;
                Ok(deleted(EntityKind::Event, a.event_id))
            }
            SetChronicle => {
                let input: ChronicleInput = decode(op, args)?;
                reply(uc.history.set_chronicle(input).await?)
            }
            DeleteChronicle => {
                let a: ChronicleArgs = decode(op, args)?;
                uc.history.delete_chronicle(a.chronicle_id).await?;
                Ok(deleted(EntityKind::Chronicle, a.chronicle_id))
            }

            // -----------------------------------------------------------------
            // Game clock
            // -----------------------------------------------------------------
            GetGameTime => {
                let a: WorldArgs = decode(op, args)?;
                reply(uc.time.get(a.world_id).await?)
            }
            SetGameTime => {
                let a: SetGameTimeArgs = decode(op, args)?;
                let time = match (a.seconds, a.day) {
                    (Some(seconds), None) => GameTime::from_seconds(seconds),
                    (None, Some(day)) => GameTime::from_parts(day, a.hour, a.minute, a.second)?,
                    _ => {
                        return Err(ToolError::validation(
                            "set_game_time takes exactly one of seconds or day",
                        ))
                    }
                };
                reply(uc.time.set(a.world_id, time).await?)
            }
            AdvanceGameTime => {
                let a: AdvanceGameTimeArgs = decode(op, args)?;
                reply(uc.time.advance(a.world_id, a.by).await?)
            }

            // -----------------------------------------------------------------
            // Encounters
            // -----------------------------------------------------------------
            StartEncounter => {
                let input: StartEncounterInput = decode(op, args)?;
                reply(uc.encounter.start(input).await?)
            }
            AddCombatant => {
                let a: AddCombatantArgs = decode(op, args)?;
                reply(uc.encounter.add_combatant(a.encounter_id, a.combatant).await?)
            }
            RemoveCombatant => {
                let a: CombatantArgs = decode(op, args)?;
                reply(
                    uc.encounter
                        .remove_combatant(a.encounter_id, a.character_id)
                        .await?,
                )
            }
            SetInitiative => {
                let a: SetInitiativeArgs = decode(op, args)?;
                reply(
                    uc.encounter
                        .set_initiative(a.encounter_id, a.character_id, a.initiative)
                        .await?,
                )
            }
            NextTurn => {
                let a: EncounterArgs = decode(op, args)?;
                reply(uc.encounter.next_turn(a.encounter_id).await?)
            }
            EndEncounter => {
                let a: EndEncounterArgs = decode(op, args)?;
                reply(uc.encounter.end(a.encounter_id, a.summary, a.outcome).await?)
            }
            GetEncounter => {
                let a: EncounterArgs = decode(op, args)?;
                reply(uc.encounter.get(a.encounter_id).await?)
            }
            GetActiveEncounter => {
                let a: WorldArgs = decode(op, args)?;
                reply(uc.encounter.get_active(a.world_id).await?)
            }

            // -----------------------------------------------------------------
            // Queries
            // -----------------------------------------------------------------
            GetEntity => {
                let a: GetEntityArgs = decode(op, args)?;
                reply(uc.query.get_entity(a.id, a.kind).await?)
            }
            SearchLore => {
                let a: SearchLoreArgs = decode(op, args)?;
                reply(
                    uc.query
                        .search_lore(a.world_id, &a.query, &a.tags, a.limit)
                        .await?,
                )
            }
            FindNearbyLocations => {
                let a: NearbyArgs = decode(op, args)?;
                reply(
                    uc.query
                        .find_nearby_locations(a.location_id, a.radius, a.limit)
                        .await?,
                )
            }
            SearchLocations => {
                let a: SearchLocationsArgs = decode(op, args)?;
                reply(uc.query.search_locations(a.world_id, &a.query, a.limit).await?)
            }
            FindCharacters => {
                let filter: CharacterFilter = decode(op, args)?;
                reply(uc.query.list_characters(filter).await?)
            }
            FindItems => {
                let filter: ItemFilter = decode(op, args)?;
                reply(uc.query.list_items(filter).await?)
            }
            FindLocations => {
                let filter: LocationFilter = decode(op, args)?;
                reply(uc.query.list_locations(filter).await?)
            }
            FindQuests => {
                let filter: QuestFilter = decode(op, args)?;
                reply(uc.query.list_quests(filter).await?)
            }
            FindEvents => {
                let filter: EventFilter = decode(op, args)?;
                reply(uc.query.list_events(filter).await?)
            }
            FindFactions => {
                let filter: FactionFilter = decode(op, args)?;
                reply(uc.query.list_factions(filter).await?)
            }
            FindParties => {
                let filter: PartyFilter = decode(op, args)?;
                reply(uc.query.list_parties(filter).await?)
            }
            GetWorldSummary => {
                let a: WorldArgs = decode(op, args)?;
                reply(uc.query.get_world_summary(a.world_id).await?)
            }
            GetLocationContents => {
                let a: LocationArgs = decode(op, args)?;
                reply(uc.query.get_location_contents(a.location_id).await?)
            }
            GetCharacterInventory => {
                let a: CharacterArgs = decode(op, args)?;
                reply(uc.query.get_character_inventory(a.character_id).await?)
            }
            GetChronicleDetails => {
                let a: ChronicleArgs = decode(op, args)?;
                reply(uc.query.get_chronicle_details(a.chronicle_id).await?)
            }
            LoadSession => {
                let a: WorldArgs = decode(op, args)?;
                reply(uc.query.load_session(a.world_id).await?)
            }

            // -----------------------------------------------------------------
            // Dice
            // -----------------------------------------------------------------
            RollDice => {
                let a: RollDiceArgs = decode(op, args)?;
                reply(uc.dice.roll(&a.notation, a.times, a.reason)?)
            }
            CoinFlip => {
                let a: ReasonArgs = decode(op, args)?;
                reply(uc.dice.coin_flip(a.reason))
            }
            Percentile => {
                let a: ReasonArgs = decode(op, args)?;
                reply(uc.dice.percentile(a.reason))
            }
            RollStats => {
                let a: RollStatsArgs = decode(op, args)?;
                reply(uc.dice.roll_stats(a.method.as_deref())?)
            }
            RandomTable => {
                let a: RandomTableArgs = decode(op, args)?;
                reply(uc.dice.random_table(a.options, a.weights, a.table_name)?)
            }

            ListOperations => Ok(json!({
                "role": role,
                "operations": self.operations(role),
            })),
        }
    }

    /// Spawn a batch of non-player characters, optionally seating them in an active
    /// encounter. Either every character is created and seated or nothing is written.
    async fn spawn_enemies(&self, a: SpawnEnemiesArgs) -> Result<Value, ToolError> {
        let uc = &self.use_cases;
        let spawned = match a.add_to_encounter {
            Some(encounter_id) => {
                let encounter = uc.encounter.get(encounter_id).await?;
                if encounter.world_id != a.world_id {
                    return Err(ToolError::validation(format!(
                        "Encounter {} belongs to another world",
                        encounter_id
                    )));
                }
                let spawned = uc
                    .character
                    .prepare_enemies(a.world_id, a.location_id, a.enemies)
                    .await?;
                uc.encounter
                    .seat_new_characters(encounter_id, &spawned, a.initiative)
                    .await?;
                spawned
            }
            None => {
                uc.character
                    .spawn_enemies(a.world_id, a.location_id, a.enemies)
                    .await?
            }
        };

        Ok(json!({
            "total": spawned.len(),
            "location_id": a.location_id,
            "added_to_encounter": a.add_to_encounter,
            "spawned": serde_json::to_value(&spawned)?,
        }))
    }
}

fn decode<T: DeserializeOwned>(op: Operation, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| ToolError::validation(format!("Invalid arguments for {}: {}", op, e)))
}

fn reply<T: Serialize>(value: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

fn deleted(kind: EntityKind, id: impl Serialize) -> Value {
    json!({ "deleted": true, "kind": kind, "id": id })
}

fn bound_kind(op: Operation) -> Result<CharacterKind, ToolError> {
    op.character_kind().ok_or_else(|| {
        ToolError::new(
            ErrorKind::Internal,
            format!("{} is not bound to a character kind", op),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::app::{App, Repositories};
    use crate::infrastructure::clock::{FixedRandom, SystemClock};
    use crate::infrastructure::ports::{
        MockBlueprintRepo, MockCharacterRepo, MockChronicleRepo, MockEncounterRepo,
        MockEventRepo, MockFactionRepo, MockItemRepo, MockLocationRepo, MockLoreRepo,
        MockPartyRepo, MockQuestRepo, MockRecordLookup, MockWorldRepo,
    };
    use crate::infrastructure::sqlite::SqliteStore;
    use tempfile::TempDir;

    /// A router over mocks with no expectations: any store access panics.
    fn untouchable_router() -> ToolRouter {
        let repos = Repositories {
            world: Arc::new(MockWorldRepo::new()),
            character: Arc::new(MockCharacterRepo::new()),
            item: Arc::new(MockItemRepo::new()),
            location: Arc::new(MockLocationRepo::new()),
            faction: Arc::new(MockFactionRepo::new()),
            party: Arc::new(MockPartyRepo::new()),
            quest: Arc::new(MockQuestRepo::new()),
            event: Arc::new(MockEventRepo::new()),
            chronicle: Arc::new(MockChronicleRepo::new()),
            lore: Arc::new(MockLoreRepo::new()),
            encounter: Arc::new(MockEncounterRepo::new()),
            blueprint: Arc::new(MockBlueprintRepo::new()),
            records: Arc::new(MockRecordLookup::new()),
        };
        let use_cases = UseCases::new(
            &repos,
            Arc::new(SystemClock::new()),
            Arc::new(FixedRandom(1)),
        );
        ToolRouter::new(Capabilities::builtin(), use_cases)
    }

    async fn open(dir: &TempDir) -> App {
        let path = dir.path().join("campaign.db");
        let store = SqliteStore::open(
            path.to_str().unwrap(),
            Arc::new(SystemClock::new()),
        )
        .await
        .unwrap();
        App::new(
            Repositories::sqlite(Arc::new(store)),
            Capabilities::builtin(),
            Arc::new(SystemClock::new()),
            Arc::new(FixedRandom(10)),
        )
    }

    async fn call(app: &App, role: &str, op: &str, args: Value) -> Value {
        match app.router.call(role, op, args).await {
            Ok(value) => value,
            Err(e) => panic!("{} as {} failed: {}", op, role, e),
        }
    }

    async fn world(app: &App) -> String {
        let world = call(app, "world_builder", "set_world", json!({"name": "Eberron"})).await;
        world["id"].as_str().unwrap().to_string()
    }

    async fn npc(app: &App, world_id: &str, name: &str, hp: i64, max: i64) -> String {
        let npc = call(
            app,
            "narrator",
            "create_npc",
            json!({
                "world_id": world_id,
                "name": name,
                "attributes": [{"name": "HP", "value": hp, "max": max}],
            }),
        )
        .await;
        npc["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn permission_is_checked_before_any_store_access() {
        let router = untouchable_router();

        let err = router
            .call(
                "scribe",
                "deal_damage",
                json!({"character_id": uuid::Uuid::new_v4(), "amount": 3}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Permission);

        let err = router.call("dungeon_master", "get_entity", json!({})).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Permission);

        let err = router.call("narrator", "drop_table", Value::Null).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Permission);
    }

    #[tokio::test]
    async fn malformed_arguments_are_validation_errors() {
        let router = untouchable_router();
        let err = router
            .call("narrator", "deal_damage", json!({"character_id": "not-a-uuid"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn create_npc_ignores_caller_supplied_kind() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;

        let npc = call(
            &app,
            "narrator",
            "create_npc",
            json!({"world_id": world_id, "name": "Impostor", "is_player_character": true}),
        )
        .await;
        assert_eq!(npc["kind"], "non_player");
    }

    #[tokio::test]
    async fn update_npc_on_player_is_a_boundary_violation() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let pc = call(
            &app,
            "bookkeeper",
            "create_player_character",
            json!({"world_id": world_id, "name": "Vex"}),
        )
        .await;

        let err = app
            .router
            .call(
                "narrator",
                "update_npc",
                json!({"character_id": pc["id"], "name": "Renamed"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BoundaryViolation);

        let stored = call(&app, "narrator", "get_entity", json!({"id": pc["id"]})).await;
        assert_eq!(stored["record"]["name"], "Vex");
    }

    #[tokio::test]
    async fn bookkeeper_finalizes_character_creation() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let pc = call(
            &app,
            "bookkeeper",
            "create_player_character",
            json!({"world_id": world_id, "name": "Vex", "creation_in_progress": true}),
        )
        .await;
        assert_eq!(pc["creation_in_progress"], true);

        let err = app
            .router
            .call("narrator", "finalize_character", json!({"character_id": pc["id"]}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Permission);

        let args = json!({"character_id": pc["id"]});
        let done = call(&app, "bookkeeper", "finalize_character", args.clone()).await;
        assert_eq!(done["creation_in_progress"], false);
        let again = call(&app, "bookkeeper", "finalize_character", args).await;
        assert_eq!(again["creation_in_progress"], false);
    }

    #[tokio::test]
    async fn damage_then_heal_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let id = npc(&app, &world_id, "Orc", 10, 20).await;

        let hit = call(
            &app,
            "narrator",
            "deal_damage",
            json!({
                "character_id": id,
                "amount": 12,
                "source": "Ogre club",
                "damage_type": "bludgeoning",
            }),
        )
        .await;
        assert_eq!(hit["hp"], 0);
        assert_eq!(hit["unconscious"], true);
        assert_eq!(hit["source"], "Ogre club");
        assert_eq!(hit["damage_type"], "bludgeoning");

        let healed = call(&app, "narrator", "heal", json!({"character_id": id, "amount": 5})).await;
        assert_eq!(healed["hp"], 5);
        assert_eq!(healed["unconscious"], false);
        assert!(healed.get("source").is_none());
    }

    #[tokio::test]
    async fn concurrent_damage_loses_no_update() {
        let dir = tempfile::tempdir().unwrap();
        let app = Arc::new(open(&dir).await);
        let world_id = world(&app).await;
        let id = npc(&app, &world_id, "Troll", 100, 100).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let app = app.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                app.router
                    .call("narrator", "deal_damage", json!({"character_id": id, "amount": 3}))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let troll = call(&app, "narrator", "get_entity", json!({"id": id})).await;
        let hp = troll["record"]["attributes"]
            .as_array()
            .and_then(|attrs| attrs.iter().find(|a| a["name"] == "HP"))
            .map(|a| a["value"].clone());
        assert_eq!(hp, Some(json!(70)));
    }

    #[tokio::test]
    async fn initiative_ties_keep_supplied_order_and_rounds_wrap_once() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let a = npc(&app, &world_id, "A", 5, 5).await;
        let b = npc(&app, &world_id, "B", 5, 5).await;
        let c = npc(&app, &world_id, "C", 5, 5).await;

        let encounter = call(
            &app,
            "narrator",
            "start_encounter",
            json!({
                "world_id": world_id,
                "combatants": [
                    {"character_id": a, "initiative": 10},
                    {"character_id": b, "initiative": 15},
                    {"character_id": c, "initiative": 15},
                ],
            }),
        )
        .await;
        let order: Vec<&str> = encounter["combatants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["character_id"].as_str().unwrap())
            .collect();
        assert_eq!(order, vec![b.as_str(), c.as_str(), a.as_str()]);

        let id = encounter["encounter_id"].clone();
        let mut wraps = 0;
        let mut last = Value::Null;
        for _ in 0..3 {
            last = call(&app, "narrator", "next_turn", json!({"encounter_id": id})).await;
            if last["round_incremented"] == true {
                wraps += 1;
            }
        }
        assert_eq!(wraps, 1);
        assert_eq!(last["active_combatant_id"], json!(b));
        assert_eq!(last["round"], 2);
    }

    #[tokio::test]
    async fn encounter_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (encounter_id, second) = {
            let app = open(&dir).await;
            let world_id = world(&app).await;
            let first = npc(&app, &world_id, "First", 5, 5).await;
            let second = npc(&app, &world_id, "Second", 5, 5).await;
            let encounter = call(
                &app,
                "narrator",
                "start_encounter",
                json!({
                    "world_id": world_id,
                    "combatants": [
                        {"character_id": first, "initiative": 20},
                        {"character_id": second, "initiative": 5},
                    ],
                }),
            )
            .await;
            let id = encounter["encounter_id"].clone();
            call(&app, "narrator", "next_turn", json!({"encounter_id": id})).await;
            (id, second)
        };

        let app = open(&dir).await;
        let view = call(
            &app,
            "narrator",
            "get_encounter",
            json!({"encounter_id": encounter_id}),
        )
        .await;
        assert_eq!(view["current_combatant_id"], json!(second));
        assert_eq!(view["state"], "active");
        assert_eq!(view["round"], 1);
    }

    #[tokio::test]
    async fn nearby_locations_are_sorted_without_origin() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let mut ids = Vec::new();
        for (name, x) in [("Keep", 0.0), ("Far", 9.0), ("Near", 2.0), ("Mid", 5.0)] {
            let loc = call(
                &app,
                "world_builder",
                "set_location",
                json!({"world_id": world_id, "name": name, "coordinates": {"x": x, "y": 0.0}}),
            )
            .await;
            ids.push(loc["id"].clone());
        }

        let hits = call(
            &app,
            "narrator",
            "find_nearby_locations",
            json!({"location_id": ids[0], "radius": 6.0}),
        )
        .await;
        let names: Vec<&str> = hits
            .as_array()
            .unwrap()
            .iter()
            .map(|h| h["location"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Near", "Mid"]);
    }

    #[tokio::test]
    async fn deleting_an_event_keeps_the_others_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let mut ids = Vec::new();
        for text in ["dawn", "noon", "dusk"] {
            let event = call(
                &app,
                "historian",
                "record_event",
                json!({"world_id": world_id, "description": text}),
            )
            .await;
            ids.push(event["id"].clone());
        }
        call(&app, "historian", "delete_event", json!({"event_id": ids[1]})).await;

        let events = call(&app, "scribe", "find_events", json!({"world_id": world_id})).await;
        let texts: Vec<&str> = events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["description"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["dawn", "dusk"]);
    }

    #[tokio::test]
    async fn location_cycles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let region = call(
            &app,
            "world_builder",
            "set_location",
            json!({"world_id": world_id, "name": "Region"}),
        )
        .await;
        let town = call(
            &app,
            "world_builder",
            "set_location",
            json!({"world_id": world_id, "name": "Town", "parent_id": region["id"]}),
        )
        .await;

        let err = app
            .router
            .call(
                "world_builder",
                "set_location",
                json!({"world_id": world_id, "location_id": region["id"], "parent_id": town["id"]}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn spawn_enemies_can_join_an_encounter() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let encounter = call(
            &app,
            "narrator",
            "start_encounter",
            json!({"world_id": world_id, "name": "Ambush"}),
        )
        .await;

        let spawned = call(
            &app,
            "narrator",
            "spawn_enemies",
            json!({
                "world_id": world_id,
                "enemies": [{"name": "Goblin", "count": 3, "hp": 7}],
                "add_to_encounter": encounter["encounter_id"],
                "is_player_character": true,
            }),
        )
        .await;
        assert_eq!(spawned["total"], 3);
        assert_eq!(spawned["spawned"][2]["name"], "Goblin 3");
        assert_eq!(spawned["spawned"][0]["kind"], "non_player");

        let view = call(
            &app,
            "narrator",
            "get_encounter",
            json!({"encounter_id": encounter["encounter_id"]}),
        )
        .await;
        assert_eq!(view["combatants"].as_array().map(Vec::len), Some(3));
    }

    async fn character_count(app: &App, world_id: &str) -> usize {
        let found = call(app, "narrator", "find_characters", json!({"world_id": world_id})).await;
        found.as_array().map(Vec::len).unwrap_or_default()
    }

    #[tokio::test]
    async fn spawn_into_foreign_encounter_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let home = world(&app).await;
        let elsewhere = world(&app).await;
        let encounter = call(
            &app,
            "narrator",
            "start_encounter",
            json!({"world_id": elsewhere, "name": "Skirmish"}),
        )
        .await;

        let err = app
            .router
            .call(
                "narrator",
                "spawn_enemies",
                json!({
                    "world_id": home,
                    "enemies": [{"name": "Goblin", "count": 3}],
                    "add_to_encounter": encounter["encounter_id"],
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(character_count(&app, &home).await, 0);
        assert_eq!(character_count(&app, &elsewhere).await, 0);
    }

    #[tokio::test]
    async fn spawn_into_ended_encounter_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = open(&dir).await;
        let world_id = world(&app).await;
        let encounter = call(
            &app,
            "narrator",
            "start_encounter",
            json!({"world_id": world_id, "name": "Over already"}),
        )
        .await;
        let encounter_id = encounter["encounter_id"].clone();
        call(&app, "narrator", "end_encounter", json!({"encounter_id": encounter_id})).await;

        let err = app
            .router
            .call(
                "narrator",
                "spawn_enemies",
                json!({
                    "world_id": world_id,
                    "enemies": [{"name": "Wolf", "count": 2}],
                    "add_to_encounter": encounter_id,
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::State);
        assert_eq!(character_count(&app, &world_id).await, 0);
    }

    #[tokio::test]
    async fn concurrent_turn_advances_match_sequential_ones() {
        let dir = tempfile::tempdir().unwrap();
        let app = Arc::new(open(&dir).await);
        let world_id = world(&app).await;
        let mut combatants = Vec::new();
        for (name, initiative) in [("Ash", 18), ("Birch", 12), ("Cedar", 7)] {
            let id = npc(&app, &world_id, name, 5, 5).await;
            combatants.push(json!({"character_id": id, "initiative": initiative}));
        }
        let encounter = call(
            &app,
            "narrator",
            "start_encounter",
            json!({"world_id": world_id, "combatants": combatants}),
        )
        .await;
        let encounter_id = encounter["encounter_id"].clone();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let app = app.clone();
            let encounter_id = encounter_id.clone();
            handles.push(tokio::spawn(async move {
                app.router
                    .call("narrator", "next_turn", json!({"encounter_id": encounter_id}))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Ten advances over three combatants: rounds 1..=4, pointer on the second seat
        let view = call(
            &app,
            "narrator",
            "get_encounter",
            json!({"encounter_id": encounter_id}),
        )
        .await;
        assert_eq!(view["round"], 4);
        assert_eq!(view["turn_index"], 1);
        assert_eq!(view["current_combatant_id"], view["combatants"][1]["character_id"]);
    }

    #[tokio::test]
    async fn list_operations_reports_the_callers_capabilities() {
        let router = untouchable_router();
        let result = router.call("scribe", "list_operations", Value::Null).await.unwrap();
        let ops: Vec<&str> = result["operations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(ops.contains(&"record_event"));
        assert!(!ops.contains(&"deal_damage"));
        assert_eq!(result["role"], "scribe");
    }
}
