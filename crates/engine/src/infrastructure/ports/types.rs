//! Plain data carried across the repository ports.

use questkeep_domain::EntityKind;
use serde::Serialize;

/// A record fetched without knowing its kind up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub kind: EntityKind,
    pub record: serde_json::Value,
}

/// Number of stored records of one kind in a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: EntityKind,
    pub count: u64,
}
