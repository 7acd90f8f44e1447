//! Argument records of operations that have no dedicated use-case input type.
//!
//! Unknown fields are ignored, so a caller-supplied `is_player_character` on
//! `create_npc` is simply dropped.

use serde::Deserialize;
use uuid::Uuid;

use questkeep_domain::{
    Attribute, CharacterId, ChronicleId, EncounterId, EntityKind, EventId, FactionId,
    FactionMembership, ItemId, LocationId, LoreId, PartyId, QuestId, Status, TimeAdvance,
    WorldId,
};

use crate::use_cases::character::{AbilityGrant, CharacterInput, CharacterPatch, EnemyTemplate};
use crate::use_cases::encounter::CombatantInput;
use crate::use_cases::quest::QuestPatch;

// =============================================================================
// Single-id arguments
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WorldArgs {
    pub world_id: WorldId,
}

#[derive(Debug, Deserialize)]
pub struct CharacterArgs {
    pub character_id: CharacterId,
}

#[derive(Debug, Deserialize)]
pub struct ItemArgs {
    pub item_id: ItemId,
}

#[derive(Debug, Deserialize)]
pub struct LocationArgs {
    pub location_id: LocationId,
}

#[derive(Debug, Deserialize)]
pub struct FactionArgs {
    pub faction_id: FactionId,
}

#[derive(Debug, Deserialize)]
pub struct LoreArgs {
    pub lore_id: LoreId,
}

#[derive(Debug, Deserialize)]
pub struct PartyArgs {
    pub party_id: PartyId,
}

#[derive(Debug, Deserialize)]
pub struct QuestArgs {
    pub quest_id: QuestId,
}

#[derive(Debug, Deserialize)]
pub struct EventArgs {
    pub event_id: EventId,
}

#[derive(Debug, Deserialize)]
pub struct ChronicleArgs {
    pub chronicle_id: ChronicleId,
}

#[derive(Debug, Deserialize)]
pub struct EncounterArgs {
    pub encounter_id: EncounterId,
}

// =============================================================================
// Characters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCharacterArgs {
    pub world_id: WorldId,
    #[serde(flatten)]
    pub character: CharacterInput,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCharacterArgs {
    pub character_id: CharacterId,
    #[serde(flatten)]
    pub patch: CharacterPatch,
}

#[derive(Debug, Deserialize)]
pub struct SpawnEnemiesArgs {
    pub world_id: WorldId,
    pub location_id: Option<LocationId>,
    pub enemies: Vec<EnemyTemplate>,
    /// Active encounter the spawned characters join
    pub add_to_encounter: Option<EncounterId>,
    #[serde(default)]
    pub initiative: i32,
}

#[derive(Debug, Deserialize)]
pub struct MoveCharacterArgs {
    pub character_id: CharacterId,
    pub location_id: Option<LocationId>,
}

#[derive(Debug, Deserialize)]
pub struct SetLevelArgs {
    pub character_id: CharacterId,
    pub level: u32,
}

#[derive(Debug, Deserialize)]
pub struct SetAttributesArgs {
    pub character_id: CharacterId,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
pub struct SetSkillsArgs {
    pub character_id: CharacterId,
    pub skills: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
pub struct GrantAbilitiesArgs {
    pub character_id: CharacterId,
    pub abilities: Vec<AbilityGrant>,
}

#[derive(Debug, Deserialize)]
pub struct CharacterNameArgs {
    pub character_id: CharacterId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplyStatusesArgs {
    pub character_id: CharacterId,
    pub statuses: Vec<Status>,
}

#[derive(Debug, Deserialize)]
pub struct JoinFactionArgs {
    pub character_id: CharacterId,
    #[serde(flatten)]
    pub membership: FactionMembership,
}

#[derive(Debug, Deserialize)]
pub struct LeaveFactionArgs {
    pub character_id: CharacterId,
    pub faction_id: FactionId,
}

#[derive(Debug, Deserialize)]
pub struct FactionStandingArgs {
    pub character_id: CharacterId,
    pub faction_id: FactionId,
    pub rank: Option<u32>,
    pub reputation: Option<i32>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AmountArgs {
    pub character_id: CharacterId,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct DamageArgs {
    pub character_id: CharacterId,
    pub amount: i64,
    pub source: Option<String>,
    pub damage_type: Option<String>,
}

// =============================================================================
// Items
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GiveItemArgs {
    pub item_id: ItemId,
    pub character_id: CharacterId,
}

#[derive(Debug, Deserialize)]
pub struct DropItemArgs {
    pub item_id: ItemId,
    pub location_id: LocationId,
}

#[derive(Debug, Deserialize)]
pub struct ItemQuantityArgs {
    pub item_id: ItemId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ItemAttributeArgs {
    pub item_id: ItemId,
    pub attribute: Attribute,
}

#[derive(Debug, Deserialize)]
pub struct ItemStatusArgs {
    pub item_id: ItemId,
    pub status: Status,
}

#[derive(Debug, Deserialize)]
pub struct ItemNameArgs {
    pub item_id: ItemId,
    pub name: String,
}

// =============================================================================
// Parties and quests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FormPartyArgs {
    pub world_id: WorldId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<CharacterId>,
    pub leader_id: Option<CharacterId>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenamePartyArgs {
    pub party_id: PartyId,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartyMemberArgs {
    pub party_id: PartyId,
    pub character_id: CharacterId,
}

#[derive(Debug, Deserialize)]
pub struct PartyLeaderArgs {
    pub party_id: PartyId,
    /// `null` clears the leader
    pub leader_id: Option<CharacterId>,
}

#[derive(Debug, Deserialize)]
pub struct BeginQuestArgs {
    pub quest_id: QuestId,
    #[serde(default)]
    pub assignees: Vec<CharacterId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuestArgs {
    pub quest_id: QuestId,
    #[serde(flatten)]
    pub patch: QuestPatch,
}

// =============================================================================
// Clock and encounters
// =============================================================================

/// Either `seconds`, or a calendar position with a 1-based `day`.
#[derive(Debug, Deserialize)]
pub struct SetGameTimeArgs {
    pub world_id: WorldId,
    pub seconds: Option<u64>,
    pub day: Option<u64>,
    #[serde(default)]
    pub hour: u64,
    #[serde(default)]
    pub minute: u64,
    #[serde(default)]
    pub second: u64,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceGameTimeArgs {
    pub world_id: WorldId,
    #[serde(flatten)]
    pub by: TimeAdvance,
}

#[derive(Debug, Deserialize)]
pub struct AddCombatantArgs {
    pub encounter_id: EncounterId,
    #[serde(flatten)]
    pub combatant: CombatantInput,
}

#[derive(Debug, Deserialize)]
pub struct CombatantArgs {
    pub encounter_id: EncounterId,
    pub character_id: CharacterId,
}

#[derive(Debug, Deserialize)]
pub struct SetInitiativeArgs {
    pub encounter_id: EncounterId,
    pub character_id: CharacterId,
    pub initiative: i32,
}

#[derive(Debug, Deserialize)]
pub struct EndEncounterArgs {
    pub encounter_id: EncounterId,
    pub summary: Option<String>,
    pub outcome: Option<String>,
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct GetEntityArgs {
    pub id: Uuid,
    /// Expected kind; a record of another kind reads as not found
    pub kind: Option<EntityKind>,
}

#[derive(Debug, Deserialize)]
pub struct SearchLoreArgs {
    pub world_id: WorldId,
    pub query: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyArgs {
    pub location_id: LocationId,
    pub radius: f64,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchLocationsArgs {
    pub world_id: WorldId,
    pub query: String,
    pub limit: Option<u32>,
}

// =============================================================================
// Dice
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RollDiceArgs {
    pub notation: String,
    pub times: Option<u32>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonArgs {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RollStatsArgs {
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RandomTableArgs {
    pub options: Vec<String>,
    pub weights: Option<Vec<u32>>,
    pub table_name: Option<String>,
}
