//! Item use cases.
//!
//! Items change hands by swapping their holder reference. Only the item is locked;
//! the new holder is validated by id.

use std::sync::Arc;

use serde::Deserialize;

use questkeep_domain::{
    Attribute, CharacterId, DomainError, HolderChange, Item, ItemBlueprintId, ItemHolder, ItemId,
    LocationId, NewItem, QuantityChange, Status, WorldId,
};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{
    found, BlueprintRepo, CharacterRepo, ItemRepo, LocationRepo, RepoError, WorldRepo,
};
use crate::use_cases::validation::{require_same_world, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

/// Input for `spawn_item`. Exactly one of `character_id` and `location_id` names the
/// holder.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnItemInput {
    pub world_id: WorldId,
    pub blueprint_id: Option<ItemBlueprintId>,
    pub character_id: Option<CharacterId>,
    pub location_id: Option<LocationId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct ItemOps {
    items: Arc<dyn ItemRepo>,
    characters: Arc<dyn CharacterRepo>,
    locations: Arc<dyn LocationRepo>,
    blueprints: Arc<dyn BlueprintRepo>,
    worlds: Arc<dyn WorldRepo>,
    locks: Arc<EntityLocks>,
}

impl ItemOps {
    pub fn new(
        items: Arc<dyn ItemRepo>,
        characters: Arc<dyn CharacterRepo>,
        locations: Arc<dyn LocationRepo>,
        blueprints: Arc<dyn BlueprintRepo>,
        worlds: Arc<dyn WorldRepo>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            items,
            characters,
            locations,
            blueprints,
            worlds,
            locks,
        }
    }

    pub async fn spawn(&self, input: SpawnItemInput) -> Result<Item, ItemError> {
        let world_id = input.world_id;
        found(self.worlds.get(world_id).await?, "World", world_id)?;

        let holder = ItemHolder::exactly_one(input.character_id, input.location_id)?;
        self.check_holder(world_id, holder).await?;

        let blueprint = match input.blueprint_id {
            Some(bp_id) => {
                let bp = found(
                    self.blueprints.get_item_blueprint(bp_id).await?,
                    "ItemBlueprint",
                    bp_id,
                )?;
                require_same_world("ItemBlueprint", bp_id, bp.world_id, world_id)?;
                Some(bp)
            }
            None => None,
        };

        let item = Item::spawn(
            NewItem {
                world_id,
                holder,
                name: input.name,
                description: input.description,
                quantity: input.quantity,
                attributes: input.attributes,
                tags: input.tags,
            },
            blueprint.as_ref(),
        )?;
        self.items.save(&item).await?;

        tracing::info!(
            item_id = %item.id(),
            world_id = %world_id,
            name = %item.name(),
            quantity = item.quantity(),
            "Item spawned"
        );
        Ok(item)
    }

    pub async fn destroy(&self, id: ItemId) -> Result<(), ItemError> {
        let _guard = self.locks.lock(id).await;
        if !self.items.delete(id).await? {
            return Err(RepoError::not_found("Item", id).into());
        }
        tracing::info!(item_id = %id, "Item destroyed");
        Ok(())
    }

    pub async fn give(
        &self,
        id: ItemId,
        character_id: CharacterId,
    ) -> Result<HolderChange, ItemError> {
        let _guard = self.locks.lock(id).await;
        let mut item = self.load(id).await?;
        self.check_holder(item.world_id(), ItemHolder::Character(character_id))
            .await?;
        let change = item.give_to(character_id);
        self.items.save(&item).await?;

        tracing::info!(item_id = %id, character_id = %character_id, "Item given");
        Ok(change)
    }

    pub async fn drop_at(
        &self,
        id: ItemId,
        location_id: LocationId,
    ) -> Result<HolderChange, ItemError> {
        let _guard = self.locks.lock(id).await;
        let mut item = self.load(id).await?;
        self.check_holder(item.world_id(), ItemHolder::Location(location_id))
            .await?;
        let change = item.drop_at(location_id);
        self.items.save(&item).await?;

        tracing::info!(item_id = %id, location_id = %location_id, "Item dropped");
        Ok(change)
    }

    /// Set the stack size. Zero keeps the record but reports it as eligible for
    /// destruction.
    pub async fn set_quantity(
        &self,
        id: ItemId,
        quantity: i64,
    ) -> Result<QuantityChange, ItemError> {
        let _guard = self.locks.lock(id).await;
        let mut item = self.load(id).await?;
        let change = item.set_quantity(quantity)?;
        self.items.save(&item).await?;

        tracing::info!(
            item_id = %id,
            before = change.before,
            after = change.after,
            destroy_eligible = change.destroy_eligible,
            "Item quantity set"
        );
        Ok(change)
    }

    pub async fn set_attribute(&self, id: ItemId, attribute: Attribute) -> Result<Item, ItemError> {
        self.modify(id, |item| item.set_attribute(attribute)).await
    }

    pub async fn apply_status(&self, id: ItemId, status: Status) -> Result<Item, ItemError> {
        self.modify(id, |item| item.apply_status(status)).await
    }

    pub async fn remove_status(&self, id: ItemId, name: &str) -> Result<Item, ItemError> {
        self.modify(id, |item| item.remove_status(name)).await
    }

    async fn modify(
        &self,
        id: ItemId,
        apply: impl FnOnce(&mut Item) -> Result<(), DomainError>,
    ) -> Result<Item, ItemError> {
        let _guard = self.locks.lock(id).await;
        let mut item = self.load(id).await?;
        apply(&mut item)?;
        self.items.save(&item).await?;
        tracing::debug!(item_id = %id, "Item saved");
        Ok(item)
    }

    async fn load(&self, id: ItemId) -> Result<Item, ItemError> {
        Ok(found(self.items.get(id).await?, "Item", id)?)
    }

    async fn check_holder(&self, world_id: WorldId, holder: ItemHolder) -> Result<(), ItemError> {
        match holder {
            ItemHolder::Character(id) => {
                let character = found(self.characters.get(id).await?, "Character", id)?;
                require_same_world("Character", id, character.world_id(), world_id)?;
            }
            ItemHolder::Location(id) => {
                let location = found(self.locations.get(id).await?, "Location", id)?;
                require_same_world("Location", id, location.world_id(), world_id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{
        MockBlueprintRepo, MockCharacterRepo, MockItemRepo, MockLocationRepo, MockWorldRepo,
    };
    use chrono::Utc;
    use questkeep_domain::{
        AttributeShape, Character, CharacterDraft, ItemBlueprint, NewNonPlayerCharacter, World,
    };

    struct Mocks {
        items: MockItemRepo,
        characters: MockCharacterRepo,
        locations: MockLocationRepo,
        blueprints: MockBlueprintRepo,
        worlds: MockWorldRepo,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                items: MockItemRepo::new(),
                characters: MockCharacterRepo::new(),
                locations: MockLocationRepo::new(),
                blueprints: MockBlueprintRepo::new(),
                worlds: MockWorldRepo::new(),
            }
        }

        fn with_item(mut self, item: &Item) -> Self {
            let item = item.clone();
            let item_id = item.id();
            self.items
                .expect_get()
                .withf(move |id| *id == item_id)
                .returning(move |_| Ok(Some(item.clone())));
            self
        }

        fn build(self) -> ItemOps {
            ItemOps::new(
                Arc::new(self.items),
                Arc::new(self.characters),
                Arc::new(self.locations),
                Arc::new(self.blueprints),
                Arc::new(self.worlds),
                Arc::new(EntityLocks::new()),
            )
        }
    }

    fn npc(world_id: WorldId) -> Character {
        Character::new_npc(
            NewNonPlayerCharacter {
                world_id,
                draft: CharacterDraft {
                    name: "Bartender".into(),
                    ..Default::default()
                },
            },
            &AttributeShape::default(),
        )
        .unwrap()
    }

    fn rope(world_id: WorldId, holder: CharacterId) -> Item {
        Item::spawn(
            NewItem {
                world_id,
                holder: ItemHolder::Character(holder),
                name: Some("Rope".into()),
                description: None,
                quantity: Some(3),
                attributes: vec![],
                tags: vec![],
            },
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn spawn_merges_over_blueprint() {
        let world = World::new("Ravnica", Utc::now()).unwrap();
        let owner = npc(world.id);
        let mut blueprint = ItemBlueprint::new(world.id, "Longsword").unwrap();
        blueprint.stackable = false;
        blueprint.description = "Steel".into();

        let mut mocks = Mocks::new();
        let w = world.clone();
        mocks.worlds.expect_get().returning(move |_| Ok(Some(w.clone())));
        let o = owner.clone();
        mocks.characters.expect_get().returning(move |_| Ok(Some(o.clone())));
        let bp = blueprint.clone();
        mocks
            .blueprints
            .expect_get_item_blueprint()
            .returning(move |_| Ok(Some(bp.clone())));
        mocks.items.expect_save().times(1).returning(|_| Ok(()));

        let item = mocks
            .build()
            .spawn(SpawnItemInput {
                world_id: world.id,
                blueprint_id: Some(blueprint.id),
                character_id: Some(owner.id()),
                location_id: None,
                name: Some("Oathkeeper".into()),
                description: None,
                quantity: None,
                attributes: vec![],
                tags: vec![],
            })
            .await
            .unwrap();

        assert_eq!(item.name(), "Oathkeeper");
        assert_eq!(item.description(), "Steel");
        assert!(!item.is_stackable());
        assert_eq!(item.holder(), ItemHolder::Character(owner.id()));
    }

    #[tokio::test]
    async fn when_two_holders_given_spawn_is_rejected() {
        let world = World::new("Ravnica", Utc::now()).unwrap();
        let mut mocks = Mocks::new();
        let w = world.clone();
        mocks.worlds.expect_get().returning(move |_| Ok(Some(w.clone())));
        mocks.items.expect_save().never();

        let result = mocks
            .build()
            .spawn(SpawnItemInput {
                world_id: world.id,
                blueprint_id: None,
                character_id: Some(CharacterId::new()),
                location_id: Some(LocationId::new()),
                name: Some("Lantern".into()),
                description: None,
                quantity: None,
                attributes: vec![],
                tags: vec![],
            })
            .await;
        assert!(matches!(
            result,
            Err(ItemError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn negative_quantity_is_a_conflict_and_not_saved() {
        let world_id = WorldId::new();
        let item = rope(world_id, CharacterId::new());
        let mut mocks = Mocks::new().with_item(&item);
        mocks.items.expect_save().never();

        let result = mocks.build().set_quantity(item.id(), -2).await;
        assert!(matches!(
            result,
            Err(ItemError::Domain(DomainError::Constraint(_)))
        ));
    }

    #[tokio::test]
    async fn zero_quantity_reports_destroy_eligible() {
        let world_id = WorldId::new();
        let item = rope(world_id, CharacterId::new());
        let mut mocks = Mocks::new().with_item(&item);
        mocks
            .items
            .expect_save()
            .withf(|i| i.quantity() == 0 && i.is_destroy_eligible())
            .returning(|_| Ok(()));

        let change = mocks.build().set_quantity(item.id(), 0).await.unwrap();
        assert_eq!(change.before, 3);
        assert!(change.destroy_eligible);
    }

    #[tokio::test]
    async fn give_moves_the_holder() {
        let world_id = WorldId::new();
        let from = npc(world_id);
        let to = npc(world_id);
        let item = rope(world_id, from.id());

        let mut mocks = Mocks::new().with_item(&item);
        let recipient = to.clone();
        mocks
            .characters
            .expect_get()
            .returning(move |_| Ok(Some(recipient.clone())));
        let to_id = to.id();
        mocks
            .items
            .expect_save()
            .withf(move |i| i.holder() == ItemHolder::Character(to_id))
            .returning(|_| Ok(()));

        let change = mocks.build().give(item.id(), to.id()).await.unwrap();
        assert_eq!(change.from, ItemHolder::Character(from.id()));
        assert_eq!(change.to, ItemHolder::Character(to.id()));
    }

    #[tokio::test]
    async fn when_recipient_is_in_another_world_give_is_rejected() {
        let item = rope(WorldId::new(), CharacterId::new());
        let stranger = npc(WorldId::new());

        let mut mocks = Mocks::new().with_item(&item);
        let s = stranger.clone();
        mocks.characters.expect_get().returning(move |_| Ok(Some(s.clone())));
        mocks.items.expect_save().never();

        let result = mocks.build().give(item.id(), stranger.id()).await;
        assert!(matches!(
            result,
            Err(ItemError::Validation(ValidationError::ForeignWorld { .. }))
        ));
    }
}
