//! World-building use cases: the world record, locations, factions, blueprints and
//! lore.
//!
//! Every `set_*` operation creates a record when no id is given and updates the
//! existing one otherwise. Location writes lock the world before the location, since
//! the ancestry check reads every parent link of the world.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use questkeep_domain::common::normalize_tags;
use questkeep_domain::{
    AbilityBlueprint, AbilityBlueprintId, Attribute, AttributeBag, AttributeShape, CharacterId,
    Coordinates, DomainError, EntityRef, Faction, FactionId, FactionRelationship, ItemBlueprint,
    ItemBlueprintId, Location, LocationConnection, LocationId, Lore, LoreId, StandingScale,
    World, WorldId,
};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{
    found, BlueprintRepo, CharacterRepo, ClockPort, FactionRepo, LocationRepo, LoreRepo,
    RepoError, WorldRepo,
};
use crate::use_cases::validation::{require_same_world, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("A name is required to create a {0}")]
    NameRequired(&'static str),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldInput {
    pub world_id: Option<WorldId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub attribute_shape: Option<AttributeShape>,
    pub standing_scale: Option<StandingScale>,
    /// Merged into the existing notes; an empty value removes the key
    pub notes: Option<BTreeMap<String, String>>,
    /// `false` ends world setup and starts play
    pub creation_in_progress: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub world_id: WorldId,
    pub location_id: Option<LocationId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<LocationId>,
    #[serde(default)]
    pub clear_parent: bool,
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub clear_coordinates: bool,
    /// Replaces the connection list when present
    pub connections: Option<Vec<LocationConnection>>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FactionInput {
    pub world_id: WorldId,
    pub faction_id: Option<FactionId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub headquarters_id: Option<LocationId>,
    #[serde(default)]
    pub clear_headquarters: bool,
    pub leader_id: Option<CharacterId>,
    #[serde(default)]
    pub clear_leader: bool,
    /// Replaces the relationship list when present
    pub relationships: Option<Vec<FactionRelationship>>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemBlueprintInput {
    pub world_id: WorldId,
    pub blueprint_id: Option<ItemBlueprintId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub stackable: Option<bool>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbilityBlueprintInput {
    pub world_id: WorldId,
    pub blueprint_id: Option<AbilityBlueprintId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub cost: Option<String>,
    pub effect: Option<String>,
    pub requirements: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoreInput {
    pub world_id: WorldId,
    pub lore_id: Option<LoreId>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub related_entities: Option<Vec<EntityRef>>,
    pub tags: Option<Vec<String>>,
}

// =============================================================================
// World Operations
// =============================================================================

pub struct WorldOps {
    worlds: Arc<dyn WorldRepo>,
    locations: Arc<dyn LocationRepo>,
    factions: Arc<dyn FactionRepo>,
    characters: Arc<dyn CharacterRepo>,
    blueprints: Arc<dyn BlueprintRepo>,
    lore: Arc<dyn LoreRepo>,
    clock: Arc<dyn ClockPort>,
    locks: Arc<EntityLocks>,
}

impl WorldOps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        worlds: Arc<dyn WorldRepo>,
        locations: Arc<dyn LocationRepo>,
        factions: Arc<dyn FactionRepo>,
        characters: Arc<dyn CharacterRepo>,
        blueprints: Arc<dyn BlueprintRepo>,
        lore: Arc<dyn LoreRepo>,
        clock: Arc<dyn ClockPort>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            worlds,
            locations,
            factions,
            characters,
            blueprints,
            lore,
            clock,
            locks,
        }
    }

    // -------------------------------------------------------------------------
    // World
    // -------------------------------------------------------------------------

    pub async fn set_world(&self, input: WorldInput) -> Result<World, WorldError> {
        let (mut world, _guard) = match input.world_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                (self.world(id).await?, Some(guard))
            }
            None => {
                let name = input.name.clone().ok_or(WorldError::NameRequired("world"))?;
                (World::new(name, self.clock.now())?, None)
            }
        };

        if let Some(name) = input.name {
            world.rename(name)?;
        }
        if let Some(description) = input.description {
            world.description = description;
        }
        if let Some(shape) = input.attribute_shape {
            world.settings.attribute_shape = shape;
        }
        if let Some(scale) = input.standing_scale {
            scale.validate()?;
            world.settings.standing_scale = scale;
        }
        if let Some(in_progress) = input.creation_in_progress {
            world.creation_in_progress = in_progress;
        }
        for (key, value) in input.notes.unwrap_or_default() {
            if value.is_empty() {
                world.settings.notes.remove(&key);
            } else {
                world.settings.notes.insert(key, value);
            }
        }
        self.worlds.save(&world).await?;

        tracing::info!(world_id = %world.id, name = %world.name, "World saved");
        Ok(world)
    }

    // -------------------------------------------------------------------------
    // Locations
    // -------------------------------------------------------------------------

    pub async fn set_location(&self, input: LocationInput) -> Result<Location, WorldError> {
        let world_id = input.world_id;
        self.world(world_id).await?;
        let _world_guard = self.locks.lock(world_id).await;

        let (mut location, _guard) = match input.location_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                let location = found(self.locations.get(id).await?, "Location", id)?;
                require_same_world("Location", id, location.world_id(), world_id)?;
                (location, Some(guard))
            }
            None => {
                let name = input
                    .name
                    .clone()
                    .ok_or(WorldError::NameRequired("location"))?;
                (Location::new(world_id, name)?, None)
            }
        };

        let parents: HashMap<LocationId, Option<LocationId>> = self
            .locations
            .list_in_world(world_id)
            .await?
            .iter()
            .map(|l| (l.id(), l.parent_id()))
            .collect();

        if let Some(name) = input.name {
            location.rename(name)?;
        }
        if let Some(description) = input.description {
            location.set_description(description);
        }
        if input.clear_parent {
            location.set_parent(None, &parents)?;
        } else if let Some(parent_id) = input.parent_id {
            location.set_parent(Some(parent_id), &parents)?;
        }
        if input.clear_coordinates {
            location.set_coordinates(None);
        } else if let Some(c) = input.coordinates {
            location.set_coordinates(Some(Coordinates::new(c.x, c.y)?));
        }
        if let Some(connections) = input.connections {
            for connection in &connections {
                if !parents.contains_key(&connection.location_id) {
                    self.check_location(world_id, connection.location_id)
                        .await?;
                }
            }
            location.set_connections(connections)?;
        }
        location.set_attributes(input.attributes)?;
        if let Some(tags) = input.tags {
            location.set_tags(tags);
        }
        self.locations.save(&location).await?;

        tracing::info!(
            location_id = %location.id(),
            world_id = %world_id,
            name = %location.name(),
            "Location saved"
        );
        Ok(location)
    }

    /// Remove a location. Children keep their parent id and read as top-level.
    pub async fn delete_location(&self, id: LocationId) -> Result<(), WorldError> {
        let _guard = self.locks.lock(id).await;
        if !self.locations.delete(id).await? {
            return Err(RepoError::not_found("Location", id).into());
        }
        tracing::info!(location_id = %id, "Location deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Factions
    // -------------------------------------------------------------------------

    pub async fn set_faction(&self, input: FactionInput) -> Result<Faction, WorldError> {
        let world_id = input.world_id;
        self.world(world_id).await?;

        let (mut faction, _guard) = match input.faction_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                let faction = found(self.factions.get(id).await?, "Faction", id)?;
                require_same_world("Faction", id, faction.world_id, world_id)?;
                (faction, Some(guard))
            }
            None => {
                let name = input
                    .name
                    .clone()
                    .ok_or(WorldError::NameRequired("faction"))?;
                (Faction::new(world_id, name)?, None)
            }
        };

        if let Some(name) = input.name {
            faction.rename(name)?;
        }
        if let Some(description) = input.description {
            faction.description = description;
        }
        if let Some(kind) = input.kind {
            faction.kind = kind;
        }
        if input.clear_headquarters {
            faction.headquarters_id = None;
        } else if let Some(hq) = input.headquarters_id {
            self.check_location(world_id, hq).await?;
            faction.headquarters_id = Some(hq);
        }
        if input.clear_leader {
            faction.leader_id = None;
        } else if let Some(leader_id) = input.leader_id {
            let leader = found(
                self.characters.get(leader_id).await?,
                "Character",
                leader_id,
            )?;
            require_same_world("Character", leader_id, leader.world_id(), world_id)?;
            faction.leader_id = Some(leader_id);
        }
        if let Some(relationships) = input.relationships {
            for rel in &relationships {
                if rel.faction_id == faction.id {
                    continue;
                }
                let other = found(
                    self.factions.get(rel.faction_id).await?,
                    "Faction",
                    rel.faction_id,
                )?;
                require_same_world("Faction", rel.faction_id, other.world_id, world_id)?;
            }
            faction.set_relationships(relationships)?;
        }
        merge_attributes(&mut faction.attributes, input.attributes)?;
        if let Some(tags) = input.tags {
            faction.tags = normalize_tags(tags);
        }
        self.factions.save(&faction).await?;

        tracing::info!(
            faction_id = %faction.id,
            world_id = %world_id,
            name = %faction.name,
            "Faction saved"
        );
        Ok(faction)
    }

    /// Remove a faction. Memberships pointing at it are skipped by readers.
    pub async fn delete_faction(&self, id: FactionId) -> Result<(), WorldError> {
        let _guard = self.locks.lock(id).await;
        if !self.factions.delete(id).await? {
            return Err(RepoError::not_found("Faction", id).into());
        }
        tracing::info!(faction_id = %id, "Faction deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Blueprints
    // -------------------------------------------------------------------------

    pub async fn set_item_blueprint(
        &self,
        input: ItemBlueprintInput,
    ) -> Result<ItemBlueprint, WorldError> {
        let world_id = input.world_id;
        self.world(world_id).await?;

        let (mut blueprint, _guard) = match input.blueprint_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                let bp = found(
                    self.blueprints.get_item_blueprint(id).await?,
                    "ItemBlueprint",
                    id,
                )?;
                require_same_world("ItemBlueprint", id, bp.world_id, world_id)?;
                (bp, Some(guard))
            }
            None => {
                let name = input
                    .name
                    .clone()
                    .ok_or(WorldError::NameRequired("item blueprint"))?;
                (ItemBlueprint::new(world_id, name)?, None)
            }
        };

        if let Some(name) = input.name {
            blueprint.rename(name)?;
        }
        if let Some(description) = input.description {
            blueprint.description = description;
        }
        if let Some(stackable) = input.stackable {
            blueprint.stackable = stackable;
        }
        merge_attributes(&mut blueprint.attributes, input.attributes)?;
        if let Some(tags) = input.tags {
            blueprint.tags = normalize_tags(tags);
        }
        self.blueprints.save_item_blueprint(&blueprint).await?;

        tracing::info!(
            blueprint_id = %blueprint.id,
            name = %blueprint.name,
            "Item blueprint saved"
        );
        Ok(blueprint)
    }

    pub async fn set_ability_blueprint(
        &self,
        input: AbilityBlueprintInput,
    ) -> Result<AbilityBlueprint, WorldError> {
        let world_id = input.world_id;
        self.world(world_id).await?;

        let (mut blueprint, _guard) = match input.blueprint_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                let bp = found(
                    self.blueprints.get_ability_blueprint(id).await?,
                    "AbilityBlueprint",
                    id,
                )?;
                require_same_world("AbilityBlueprint", id, bp.world_id, world_id)?;
                (bp, Some(guard))
            }
            None => {
                let name = input
                    .name
                    .clone()
                    .ok_or(WorldError::NameRequired("ability blueprint"))?;
                (AbilityBlueprint::new(world_id, name)?, None)
            }
        };

        if let Some(name) = input.name {
            blueprint.rename(name)?;
        }
        if let Some(v) = input.description {
            blueprint.description = v;
        }
        if let Some(v) = input.kind {
            blueprint.kind = v;
        }
        if let Some(v) = input.cost {
            blueprint.cost = v;
        }
        if let Some(v) = input.effect {
            blueprint.effect = v;
        }
        if let Some(v) = input.requirements {
            blueprint.requirements = v;
        }
        merge_attributes(&mut blueprint.attributes, input.attributes)?;
        if let Some(tags) = input.tags {
            blueprint.tags = normalize_tags(tags);
        }
        self.blueprints.save_ability_blueprint(&blueprint).await?;

        tracing::info!(
            blueprint_id = %blueprint.id,
            name = %blueprint.name,
            "Ability blueprint saved"
        );
        Ok(blueprint)
    }

    // -------------------------------------------------------------------------
    // Lore
    // -------------------------------------------------------------------------

    pub async fn set_lore(&self, input: LoreInput) -> Result<Lore, WorldError> {
        let world_id = input.world_id;
        self.world(world_id).await?;

        let (mut lore, _guard) = match input.lore_id {
            Some(id) => {
                let guard = self.locks.lock(id).await;
                let lore = found(self.lore.get(id).await?, "Lore", id)?;
                require_same_world("Lore", id, lore.world_id, world_id)?;
                (lore, Some(guard))
            }
            None => {
                let title = input
                    .title
                    .clone()
                    .ok_or(WorldError::NameRequired("lore entry"))?;
                (Lore::new(world_id, title)?, None)
            }
        };

        if let Some(title) = input.title {
            lore.retitle(title)?;
        }
        if let Some(body) = input.body {
            lore.body = body;
        }
        if let Some(v) = input.time_start {
            lore.time_start = v;
        }
        if let Some(v) = input.time_end {
            lore.time_end = v;
        }
        if let Some(refs) = input.related_entities {
            lore.related_entities = refs;
        }
        if let Some(tags) = input.tags {
            lore.tags = normalize_tags(tags);
        }
        self.lore.save(&lore).await?;

        tracing::info!(lore_id = %lore.id, title = %lore.title, "Lore saved");
        Ok(lore)
    }

    pub async fn delete_lore(&self, id: LoreId) -> Result<(), WorldError> {
        let _guard = self.locks.lock(id).await;
        if !self.lore.delete(id).await? {
            return Err(RepoError::not_found("Lore", id).into());
        }
        tracing::info!(lore_id = %id, "Lore deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn world(&self, id: WorldId) -> Result<World, WorldError> {
        Ok(found(self.worlds.get(id).await?, "World", id)?)
    }

    async fn check_location(&self, world_id: WorldId, id: LocationId) -> Result<(), WorldError> {
        let location = found(self.locations.get(id).await?, "Location", id)?;
        require_same_world("Location", id, location.world_id(), world_id)?;
        Ok(())
    }
}

fn merge_attributes(bag: &mut AttributeBag, attributes: Vec<Attribute>) -> Result<(), DomainError> {
    let shape = AttributeShape::default();
    for attribute in attributes {
        bag.set(shape.admit(attribute)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockBlueprintRepo, MockCharacterRepo, MockFactionRepo, MockLocationRepo, MockLoreRepo,
        MockWorldRepo,
    };
    use chrono::Utc;

    struct Mocks {
        worlds: MockWorldRepo,
        locations: MockLocationRepo,
        factions: MockFactionRepo,
        characters: MockCharacterRepo,
        blueprints: MockBlueprintRepo,
        lore: MockLoreRepo,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                worlds: MockWorldRepo::new(),
                locations: MockLocationRepo::new(),
                factions: MockFactionRepo::new(),
                characters: MockCharacterRepo::new(),
                blueprints: MockBlueprintRepo::new(),
                lore: MockLoreRepo::new(),
            }
        }

        fn with_world(mut self, world: &World) -> Self {
            let world = world.clone();
            self.worlds
                .expect_get()
                .returning(move |_| Ok(Some(world.clone())));
            self
        }

        fn with_locations(mut self, locations: Vec<Location>) -> Self {
            let all = locations.clone();
            self.locations
                .expect_list_in_world()
                .returning(move |_| Ok(all.clone()));
            self.locations.expect_get().returning(move |id| {
                Ok(locations.iter().find(|l| l.id() == id).cloned())
            });
            self
        }

        fn build(self) -> WorldOps {
            WorldOps::new(
                Arc::new(self.worlds),
                Arc::new(self.locations),
                Arc::new(self.factions),
                Arc::new(self.characters),
                Arc::new(self.blueprints),
                Arc::new(self.lore),
                Arc::new(FixedClock(Utc::now())),
                Arc::new(EntityLocks::new()),
            )
        }
    }

    fn location_input(world_id: WorldId) -> LocationInput {
        LocationInput {
            world_id,
            location_id: None,
            name: None,
            description: None,
            parent_id: None,
            clear_parent: false,
            coordinates: None,
            clear_coordinates: false,
            connections: None,
            attributes: vec![],
            tags: None,
        }
    }

    #[tokio::test]
    async fn when_creating_world_without_name_returns_error() {
        let mut mocks = Mocks::new();
        mocks.worlds.expect_save().never();

        let result = mocks.build().set_world(WorldInput::default()).await;
        assert!(matches!(result, Err(WorldError::NameRequired("world"))));
    }

    #[tokio::test]
    async fn set_world_can_end_setup() {
        let world = World::new("Golarion", Utc::now()).unwrap();
        let mut mocks = Mocks::new().with_world(&world);
        mocks
            .worlds
            .expect_save()
            .withf(|w| !w.creation_in_progress)
            .times(1)
            .returning(|_| Ok(()));

        let saved = mocks
            .build()
            .set_world(WorldInput {
                world_id: Some(world.id),
                creation_in_progress: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!saved.creation_in_progress);
    }

    #[tokio::test]
    async fn set_world_merges_notes() {
        let mut world = World::new("Golarion", Utc::now()).unwrap();
        world.settings.notes.insert("tone".into(), "grim".into());
        world.settings.notes.insert("genre".into(), "fantasy".into());

        let mut mocks = Mocks::new().with_world(&world);
        mocks.worlds.expect_save().times(1).returning(|_| Ok(()));

        let notes = [
            ("tone".to_string(), "hopeful".to_string()),
            ("genre".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        let saved = mocks
            .build()
            .set_world(WorldInput {
                world_id: Some(world.id),
                notes: Some(notes),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(saved.settings.notes.get("tone").map(String::as_str), Some("hopeful"));
        assert!(!saved.settings.notes.contains_key("genre"));
        assert_eq!(saved.name, "Golarion");
    }

    #[tokio::test]
    async fn when_parent_is_own_descendant_location_is_not_saved() {
        let world = World::new("Golarion", Utc::now()).unwrap();
        let realm = Location::new(world.id, "Realm").unwrap();
        let mut city = Location::new(world.id, "City").unwrap();
        let parents: HashMap<_, _> = [(realm.id(), None), (city.id(), None)].into_iter().collect();
        city.set_parent(Some(realm.id()), &parents).unwrap();

        let mut mocks = Mocks::new()
            .with_world(&world)
            .with_locations(vec![realm.clone(), city.clone()]);
        mocks.locations.expect_save().never();

        let result = mocks
            .build()
            .set_location(LocationInput {
                location_id: Some(realm.id()),
                parent_id: Some(city.id()),
                ..location_input(world.id)
            })
            .await;
        assert!(matches!(
            result,
            Err(WorldError::Domain(DomainError::Constraint(_)))
        ));
    }

    #[tokio::test]
    async fn when_parent_is_in_another_world_returns_not_found() {
        let world = World::new("Golarion", Utc::now()).unwrap();
        let elsewhere = Location::new(WorldId::new(), "Elsewhere").unwrap();

        let mut mocks = Mocks::new().with_world(&world).with_locations(vec![]);
        mocks.locations.expect_save().never();

        let result = mocks
            .build()
            .set_location(LocationInput {
                name: Some("Tavern".into()),
                parent_id: Some(elsewhere.id()),
                ..location_input(world.id)
            })
            .await;
        assert!(matches!(
            result,
            Err(WorldError::Domain(DomainError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn create_location_with_parent_and_coordinates() {
        let world = World::new("Golarion", Utc::now()).unwrap();
        let realm = Location::new(world.id, "Realm").unwrap();

        let mut mocks = Mocks::new()
            .with_world(&world)
            .with_locations(vec![realm.clone()]);
        let realm_id = realm.id();
        mocks
            .locations
            .expect_save()
            .withf(move |l| l.parent_id() == Some(realm_id))
            .times(1)
            .returning(|_| Ok(()));

        let saved = mocks
            .build()
            .set_location(LocationInput {
                name: Some("City".into()),
                parent_id: Some(realm.id()),
                coordinates: Some(Coordinates { x: 3.0, y: 4.0 }),
                ..location_input(world.id)
            })
            .await
            .unwrap();
        assert_eq!(saved.coordinates(), Some(Coordinates { x: 3.0, y: 4.0 }));
    }

    #[tokio::test]
    async fn when_faction_leader_is_foreign_nothing_is_saved() {
        use questkeep_domain::{Character, CharacterDraft, NewNonPlayerCharacter};

        let world = World::new("Golarion", Utc::now()).unwrap();
        let stranger = Character::new_npc(
            NewNonPlayerCharacter {
                world_id: WorldId::new(),
                draft: CharacterDraft {
                    name: "Stranger".into(),
                    ..Default::default()
                },
            },
            &AttributeShape::default(),
        )
        .unwrap();

        let mut mocks = Mocks::new().with_world(&world);
        let s = stranger.clone();
        mocks
            .characters
            .expect_get()
            .returning(move |_| Ok(Some(s.clone())));
        mocks.factions.expect_save().never();

        let result = mocks
            .build()
            .set_faction(FactionInput {
                world_id: world.id,
                faction_id: None,
                name: Some("Thieves' Guild".into()),
                description: None,
                kind: None,
                headquarters_id: None,
                clear_headquarters: false,
                leader_id: Some(stranger.id()),
                clear_leader: false,
                relationships: None,
                attributes: vec![],
                tags: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(WorldError::Validation(ValidationError::ForeignWorld { .. }))
        ));
    }

    #[tokio::test]
    async fn when_lore_missing_delete_returns_not_found() {
        let mut mocks = Mocks::new();
        mocks.lore.expect_delete().returning(|_| Ok(false));

        let result = mocks.build().delete_lore(LoreId::new()).await;
        assert!(matches!(result, Err(WorldError::Repo(e)) if e.is_not_found()));
    }
}
