//! Aggregate mutation outcomes
//!
//! Return types from aggregate mutations, communicating what happened when state was
//! modified. The engine serializes these straight into tool results.

pub mod character_events;
pub mod combat_events;
pub mod item_events;

pub use character_events::*;
pub use combat_events::*;
pub use item_events::*;
