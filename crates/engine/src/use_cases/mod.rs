//! Use cases - operation orchestration.
//!
//! Each module groups the operations of one area of the store. Use cases load
//! aggregates through the port traits, apply domain rules, and save under the
//! entity's lock.

pub mod character;
pub mod dice;
pub mod encounter;
pub mod history;
pub mod item;
pub mod party;
pub mod query;
pub mod quest;
pub mod time;
pub mod validation;
pub mod world;

pub use character::CharacterOps;
pub use dice::DiceOps;
pub use encounter::EncounterOps;
pub use history::HistoryOps;
pub use item::ItemOps;
pub use party::PartyOps;
pub use query::QueryOps;
pub use quest::QuestOps;
pub use time::TimeOps;
pub use world::WorldOps;
