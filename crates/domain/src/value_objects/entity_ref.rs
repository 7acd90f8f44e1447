//! Entity kinds and typed by-id references between records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Every record kind the store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    World,
    Character,
    Item,
    Location,
    Faction,
    Party,
    Quest,
    Event,
    Chronicle,
    Lore,
    Encounter,
    ItemBlueprint,
    AbilityBlueprint,
}

impl EntityKind {
    pub const ALL: [EntityKind; 13] = [
        EntityKind::World,
        EntityKind::Character,
        EntityKind::Item,
        EntityKind::Location,
        EntityKind::Faction,
        EntityKind::Party,
        EntityKind::Quest,
        EntityKind::Event,
        EntityKind::Chronicle,
        EntityKind::Lore,
        EntityKind::Encounter,
        EntityKind::ItemBlueprint,
        EntityKind::AbilityBlueprint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::World => "world",
            EntityKind::Character => "character",
            EntityKind::Item => "item",
            EntityKind::Location => "location",
            EntityKind::Faction => "faction",
            EntityKind::Party => "party",
            EntityKind::Quest => "quest",
            EntityKind::Event => "event",
            EntityKind::Chronicle => "chronicle",
            EntityKind::Lore => "lore",
            EntityKind::Encounter => "encounter",
            EntityKind::ItemBlueprint => "item_blueprint",
            EntityKind::AbilityBlueprint => "ability_blueprint",
        }
    }

    /// Display label used in not-found messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::World => "World",
            EntityKind::Character => "Character",
            EntityKind::Item => "Item",
            EntityKind::Location => "Location",
            EntityKind::Faction => "Faction",
            EntityKind::Party => "Party",
            EntityKind::Quest => "Quest",
            EntityKind::Event => "Event",
            EntityKind::Chronicle => "Chronicle",
            EntityKind::Lore => "Lore",
            EntityKind::Encounter => "Encounter",
            EntityKind::ItemBlueprint => "ItemBlueprint",
            EntityKind::AbilityBlueprint => "AbilityBlueprint",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| DomainError::parse(format!("Unknown entity kind: {}", s)))
    }
}

/// A weak reference to any record. Readers must treat a reference whose target no
/// longer exists as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<Uuid>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// A named condition attached to a character or item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Status {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}

/// Apply `incoming` to `statuses`, replacing any same-name entry in place.
pub fn upsert_status(statuses: &mut Vec<Status>, incoming: Status) -> Result<(), DomainError> {
    if incoming.name.trim().is_empty() {
        return Err(DomainError::validation("status name cannot be empty"));
    }
    match statuses.iter_mut().find(|s| s.is_named(&incoming.name)) {
        Some(existing) => *existing = incoming,
        None => statuses.push(incoming),
    }
    Ok(())
}

/// Remove a status by name. Returns whether it was present.
pub fn remove_status(statuses: &mut Vec<Status>, name: &str) -> bool {
    let before = statuses.len();
    statuses.retain(|s| !s.is_named(name));
    statuses.len() != before
}
