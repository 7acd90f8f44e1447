//! Questkeep domain: records, invariants and value objects of the game-state store.
//!
//! This crate is pure: no I/O, no clock, no randomness. Time is passed in, and dice
//! take their random source as a closure.

pub mod aggregates;
pub mod common;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod value_objects;

pub use aggregates::{
    Ability, Character, CharacterBasics, CharacterDraft, CharacterKind, Combatant, Encounter,
    EncounterState, FactionMembership, Item, ItemHolder, Location, LocationConnection,
    NewEncounter, NewItem, NewNonPlayerCharacter, NewPlayerCharacter, NewQuest, Party, Quest,
    QuestEdit, QuestState,
};
pub use entities::{
    AbilityBlueprint, Chronicle, Event, Faction, FactionRelationship, ItemBlueprint, Lore,
    NewEvent, StandingScale, World, WorldSettings,
};
pub use error::DomainError;
pub use events::{
    CharacterUpdate, CombatantRemoval, EncounterEnd, HolderChange, QuantityChange, TurnAdvance,
    VitalsChange,
};
pub use ids::{
    AbilityBlueprintId, ChronicleId, CharacterId, EncounterId, EventId, FactionId,
    ItemBlueprintId, ItemId, LocationId, LoreId, PartyId, QuestId, WorldId,
};
pub use value_objects::{
    Attribute, AttributeBag, AttributeRule, AttributeShape, Coordinates, DiceFormula,
    DiceRollResult, EntityKind, EntityRef, GameTime, Status, TimeAdvance,
};
