//! Location aggregate - Places in the world, nested into a hierarchy
//!
//! # Invariants
//!
//! - `name` is non-empty
//! - the parent chain is acyclic: no location is its own ancestor
//!
//! The hierarchy check needs the parent links of the whole world, so callers pass
//! them in as a map; the aggregate itself only stores its own parent id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::{normalize_tags, require_name};
use crate::error::DomainError;
use crate::ids::{LocationId, WorldId};
use crate::value_objects::{Attribute, AttributeBag, AttributeShape, Coordinates};

/// A passage from one location to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConnection {
    pub location_id: LocationId,
    /// north, up, through the portal...
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    world_id: WorldId,
    name: String,
    description: String,
    parent_id: Option<LocationId>,
    coordinates: Option<Coordinates>,
    connections: Vec<LocationConnection>,
    attributes: AttributeBag,
    tags: Vec<String>,
}

impl Location {
    pub fn new(world_id: WorldId, name: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id: LocationId::new(),
            world_id,
            name: require_name("location", name)?,
            description: String::new(),
            parent_id: None,
            coordinates: None,
            connections: Vec::new(),
            attributes: AttributeBag::new(),
            tags: Vec::new(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> LocationId {
        self.id
    }

    #[inline]
    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn parent_id(&self) -> Option<LocationId> {
        self.parent_id
    }

    #[inline]
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    #[inline]
    pub fn connections(&self) -> &[LocationConnection] {
        &self.connections
    }

    #[inline]
    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = require_name("location", name)?;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_coordinates(&mut self, coordinates: Option<Coordinates>) {
        self.coordinates = coordinates;
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = normalize_tags(tags);
    }

    /// Replace the connection list. Self-connections are rejected; a repeated target
    /// keeps its last entry.
    pub fn set_connections(
        &mut self,
        connections: Vec<LocationConnection>,
    ) -> Result<(), DomainError> {
        let mut out: Vec<LocationConnection> = Vec::with_capacity(connections.len());
        for connection in connections {
            if connection.location_id == self.id {
                return Err(DomainError::validation("a location cannot connect to itself"));
            }
            match out
                .iter_mut()
                .find(|c| c.location_id == connection.location_id)
            {
                Some(existing) => *existing = connection,
                None => out.push(connection),
            }
        }
        self.connections = out;
        Ok(())
    }

    pub fn set_attributes(&mut self, attributes: Vec<Attribute>) -> Result<(), DomainError> {
        let shape = AttributeShape::default();
        let admitted = attributes
            .into_iter()
            .map(|a| shape.admit(a))
            .collect::<Result<Vec<_>, _>>()?;
        for attribute in admitted {
            self.attributes.set(attribute);
        }
        Ok(())
    }

    /// Re-parent this location.
    ///
    /// `parents` maps every location of the world to its current parent. The new
    /// parent must be in it, and walking up from the new parent must never reach
    /// this location.
    pub fn set_parent(
        &mut self,
        parent_id: Option<LocationId>,
        parents: &HashMap<LocationId, Option<LocationId>>,
    ) -> Result<(), DomainError> {
        if let Some(parent_id) = parent_id {
            check_ancestry(self.id, parent_id, parents)?;
        }
        self.parent_id = parent_id;
        Ok(())
    }
}

fn check_ancestry(
    child: LocationId,
    parent: LocationId,
    parents: &HashMap<LocationId, Option<LocationId>>,
) -> Result<(), DomainError> {
    if !parents.contains_key(&parent) {
        return Err(DomainError::not_found("Location", parent));
    }
    let mut cursor = Some(parent);
    // Bounded walk: stored links are trusted to be acyclic, but a corrupt chain must
    // not hang the caller.
    for _ in 0..=parents.len() {
        match cursor {
            None => return Ok(()),
            Some(id) if id == child => {
                return Err(DomainError::constraint(format!(
                    "location {} cannot be placed inside its own descendant {}",
                    child, parent
                )));
            }
            Some(id) => cursor = parents.get(&id).copied().flatten(),
        }
    }
    Err(DomainError::constraint(format!(
        "location hierarchy above {} contains a cycle",
        parent
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_of(locations: &[&Location]) -> HashMap<LocationId, Option<LocationId>> {
        locations.iter().map(|l| (l.id(), l.parent_id())).collect()
    }

    #[test]
    fn parent_chain_accepts_tree() {
        let world_id = WorldId::new();
        let realm = Location::new(world_id, "Realm").unwrap();
        let mut city = Location::new(world_id, "City").unwrap();
        let parents = world_of(&[&realm, &city]);
        city.set_parent(Some(realm.id()), &parents).unwrap();
        assert_eq!(city.parent_id(), Some(realm.id()));
    }

    #[test]
    fn parent_cycle_rejected() {
        let world_id = WorldId::new();
        let mut realm = Location::new(world_id, "Realm").unwrap();
        let mut city = Location::new(world_id, "City").unwrap();
        let mut tavern = Location::new(world_id, "Tavern").unwrap();
        let parents = world_of(&[&realm, &city, &tavern]);
        city.set_parent(Some(realm.id()), &parents).unwrap();
        let parents = world_of(&[&realm, &city, &tavern]);
        tavern.set_parent(Some(city.id()), &parents).unwrap();

        let parents = world_of(&[&realm, &city, &tavern]);
        let err = realm.set_parent(Some(tavern.id()), &parents).unwrap_err();
        assert!(matches!(err, DomainError::Constraint(_)));
        assert!(realm.parent_id().is_none());
    }

    #[test]
    fn self_parent_rejected() {
        let mut realm = Location::new(WorldId::new(), "Realm").unwrap();
        let parents = world_of(&[&realm]);
        let id = realm.id();
        assert!(realm.set_parent(Some(id), &parents).is_err());
    }

    #[test]
    fn unknown_parent_is_not_found() {
        let mut realm = Location::new(WorldId::new(), "Realm").unwrap();
        let parents = world_of(&[&realm]);
        let err = realm
            .set_parent(Some(LocationId::new()), &parents)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn connections_dedupe_and_reject_self() {
        let mut a = Location::new(WorldId::new(), "A").unwrap();
        let b = LocationId::new();
        let conn = |dir: &str| LocationConnection {
            location_id: b,
            direction: dir.into(),
            description: String::new(),
        };
        a.set_connections(vec![conn("north"), conn("up")]).unwrap();
        assert_eq!(a.connections().len(), 1);
        assert_eq!(a.connections()[0].direction, "up");

        let own = LocationConnection {
            location_id: a.id(),
            direction: String::new(),
            description: String::new(),
        };
        assert!(a.set_connections(vec![own]).is_err());
    }
}
