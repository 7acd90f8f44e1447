//! Simple data entities.
//!
//! These records carry little or no invariant beyond a non-empty name, so their
//! fields are public. Records with real invariants live in `aggregates`.

mod blueprint;
mod chronicle;
mod event;
mod faction;
mod lore;
mod world;

pub use blueprint::{AbilityBlueprint, ItemBlueprint};
pub use chronicle::Chronicle;
pub use event::{Event, NewEvent};
pub use faction::{Faction, FactionRelationship, StandingScale};
pub use lore::{tokenize, Lore};
pub use world::{World, WorldSettings};
