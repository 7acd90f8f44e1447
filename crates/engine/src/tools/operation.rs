//! The closed set of operations the router dispatches.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use questkeep_domain::CharacterKind;

macro_rules! operations {
    ($( $variant:ident => $name:literal, )+) => {
        /// A named operation. The wire name is the snake_case string.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Operation {
            $( $variant, )+
        }

        impl Operation {
            pub const ALL: &'static [Operation] = &[ $( Operation::$variant, )+ ];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Operation::$variant => $name, )+
                }
            }
        }
    };
}

operations! {
    // Characters
    CreateNpc => "create_npc",
    UpdateNpc => "update_npc",
    SpawnEnemies => "spawn_enemies",
    CreatePlayerCharacter => "create_player_character",
    UpdatePlayerCharacter => "update_player_character",
    FinalizeCharacter => "finalize_character",
    DeleteCharacter => "delete_character",
    MoveCharacter => "move_character",
    SetLevel => "set_level",
    SetAttributes => "set_attributes",
    SetSkills => "set_skills",
    GrantAbilities => "grant_abilities",
    RevokeAbility => "revoke_ability",
    ApplyStatuses => "apply_statuses",
    RemoveStatus => "remove_status",
    JoinFaction => "join_faction",
    LeaveFaction => "leave_faction",
    SetFactionStanding => "set_faction_standing",
    DealDamage => "deal_damage",
    Heal => "heal",

    // Items
    SpawnItem => "spawn_item",
    DestroyItem => "destroy_item",
    GiveItem => "give_item",
    DropItem => "drop_item",
    SetItemQuantity => "set_item_quantity",
    SetItemAttribute => "set_item_attribute",
    ApplyItemStatus => "apply_item_status",
    RemoveItemStatus => "remove_item_status",

    // World-building
    SetWorld => "set_world",
    SetLocation => "set_location",
    DeleteLocation => "delete_location",
    SetFaction => "set_faction",
    DeleteFaction => "delete_faction",
    SetItemBlueprint => "set_item_blueprint",
    SetAbilityBlueprint => "set_ability_blueprint",
    SetLore => "set_lore",
    DeleteLore => "delete_lore",

    // Parties
    FormParty => "form_party",
    DisbandParty => "disband_party",
    RenameParty => "rename_party",
    AddToParty => "add_to_party",
    RemoveFromParty => "remove_from_party",
    SetPartyLeader => "set_party_leader",

    // Quests
    CreateQuest => "create_quest",
    BeginQuest => "begin_quest",
    UpdateQuest => "update_quest",
    CompleteQuest => "complete_quest",
    AbandonQuest => "abandon_quest",
    DeleteQuest => "delete_quest",

    // History
    RecordEvent => "record_event",
    DeleteEvent => "delete_event",
    SetChronicle => "set_chronicle",
    DeleteChronicle => "delete_chronicle",

    // Game clock
    GetGameTime => "get_game_time",
    SetGameTime => "set_game_time",
    AdvanceGameTime => "advance_game_time",

    // Encounters
    StartEncounter => "start_encounter",
    AddCombatant => "add_combatant",
    RemoveCombatant => "remove_combatant",
    SetInitiative => "set_initiative",
    NextTurn => "next_turn",
    EndEncounter => "end_encounter",
    GetEncounter => "get_encounter",
    GetActiveEncounter => "get_active_encounter",

    // Queries
    GetEntity => "get_entity",
    SearchLore => "search_lore",
    FindNearbyLocations => "find_nearby_locations",
    SearchLocations => "search_locations",
    FindCharacters => "find_characters",
    FindItems => "find_items",
    FindLocations => "find_locations",
    FindQuests => "find_quests",
    FindEvents => "find_events",
    FindFactions => "find_factions",
    FindParties => "find_parties",
    GetWorldSummary => "get_world_summary",
    GetLocationContents => "get_location_contents",
    GetCharacterInventory => "get_character_inventory",
    GetChronicleDetails => "get_chronicle_details",
    LoadSession => "load_session",

    // Dice
    RollDice => "roll_dice",
    CoinFlip => "coin_flip",
    Percentile => "percentile",
    RollStats => "roll_stats",
    RandomTable => "random_table",

    // Meta
    ListOperations => "list_operations",
}

impl Operation {
    /// The character kind this operation is structurally bound to, whatever the
    /// caller's role or arguments.
    pub fn character_kind(&self) -> Option<CharacterKind> {
        match self {
            Operation::CreateNpc | Operation::UpdateNpc | Operation::SpawnEnemies => {
                Some(CharacterKind::NonPlayer)
            }
            Operation::CreatePlayerCharacter | Operation::UpdatePlayerCharacter => {
                Some(CharacterKind::Player)
            }
            _ => None,
        }
    }

    /// Operations that never write. Every built-in role may call these.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Operation::GetGameTime
                | Operation::GetEncounter
                | Operation::GetActiveEncounter
                | Operation::GetEntity
                | Operation::SearchLore
                | Operation::FindNearbyLocations
                | Operation::SearchLocations
                | Operation::FindCharacters
                | Operation::FindItems
                | Operation::FindLocations
                | Operation::FindQuests
                | Operation::FindEvents
                | Operation::FindFactions
                | Operation::FindParties
                | Operation::GetWorldSummary
                | Operation::GetLocationContents
                | Operation::GetCharacterInventory
                | Operation::GetChronicleDetails
                | Operation::LoadSession
                | Operation::ListOperations
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == needle)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}
