//! Aggregate roots - domain objects that own their related data
//!
//! Each aggregate:
//! - Has a unique identity
//! - Owns all its constituent parts (enforced by Rust ownership)
//! - Exposes behavior through methods, not public fields
//! - Returns outcome values from mutations (see [`crate::events`])
//!
//! Records whose only rule is a non-empty name live in [`crate::entities`] instead.

pub mod character;
pub mod encounter;
pub mod item;
pub mod location;
pub mod party;
pub mod quest;

pub use character::{
    Ability, Character, CharacterBasics, CharacterDraft, CharacterKind, FactionMembership,
    NewNonPlayerCharacter, NewPlayerCharacter, HP_ATTRIBUTE, UNCONSCIOUS_STATUS,
};
pub use encounter::{Combatant, Encounter, EncounterState, NewEncounter};
pub use item::{Item, ItemHolder, NewItem};
pub use location::{Location, LocationConnection};
pub use party::Party;
pub use quest::{NewQuest, Quest, QuestEdit, QuestState};
