//! Item aggregate mutation outcomes

use serde::{Deserialize, Serialize};

use crate::aggregates::ItemHolder;
use crate::ids::ItemId;

/// Result of `set_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityChange {
    pub item_id: ItemId,
    pub before: u32,
    pub after: u32,
    /// Quantity reached zero and the item may be destroyed
    pub destroy_eligible: bool,
}

/// Result of moving an item to a new holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderChange {
    pub item_id: ItemId,
    pub from: ItemHolder,
    pub to: ItemHolder,
}
