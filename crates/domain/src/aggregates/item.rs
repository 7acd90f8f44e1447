//! Item aggregate - Things held by a character or lying at a location
//!
//! An item always has exactly one holder. The holder is an enum rather than two
//! optional ids, so "both" and "neither" cannot be represented.

use serde::{Deserialize, Serialize};

use crate::common::{normalize_tags, require_name};
use crate::entities::ItemBlueprint;
use crate::error::DomainError;
use crate::events::{HolderChange, QuantityChange};
use crate::ids::{CharacterId, ItemBlueprintId, ItemId, LocationId, WorldId};
use crate::value_objects::{
    remove_status, upsert_status, Attribute, AttributeBag, AttributeShape, Status,
};

/// Who or what currently holds an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ItemHolder {
    Character(CharacterId),
    Location(LocationId),
}

impl ItemHolder {
    pub fn character_id(&self) -> Option<CharacterId> {
        match self {
            ItemHolder::Character(id) => Some(*id),
            ItemHolder::Location(_) => None,
        }
    }

    pub fn location_id(&self) -> Option<LocationId> {
        match self {
            ItemHolder::Location(id) => Some(*id),
            ItemHolder::Character(_) => None,
        }
    }

    /// Build a holder from the two optional ids callers send. Exactly one must be set.
    pub fn exactly_one(
        character_id: Option<CharacterId>,
        location_id: Option<LocationId>,
    ) -> Result<Self, DomainError> {
        match (character_id, location_id) {
            (Some(c), None) => Ok(ItemHolder::Character(c)),
            (None, Some(l)) => Ok(ItemHolder::Location(l)),
            (Some(_), Some(_)) => Err(DomainError::validation(
                "an item is held by a character or a location, not both",
            )),
            (None, None) => Err(DomainError::validation(
                "an item needs a holder: a character or a location",
            )),
        }
    }
}

/// Input for spawning an item. Unset fields fall back to the blueprint, if any.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub world_id: WorldId,
    pub holder: ItemHolder,
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub attributes: Vec<Attribute>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    world_id: WorldId,
    blueprint_id: Option<ItemBlueprintId>,
    name: String,
    description: String,
    holder: ItemHolder,
    quantity: u32,
    stackable: bool,
    destroy_eligible: bool,
    attributes: AttributeBag,
    statuses: Vec<Status>,
    tags: Vec<String>,
}

impl Item {
    /// Spawn an item, merging explicit fields over an optional blueprint.
    ///
    /// Items spawned without a blueprint are stackable.
    pub fn spawn(data: NewItem, blueprint: Option<&ItemBlueprint>) -> Result<Self, DomainError> {
        let name = match (data.name, blueprint) {
            (Some(name), _) => name,
            (None, Some(bp)) => bp.name.clone(),
            (None, None) => String::new(),
        };
        let description = data
            .description
            .or_else(|| blueprint.map(|bp| bp.description.clone()))
            .unwrap_or_default();
        let stackable = blueprint.map(|bp| bp.stackable).unwrap_or(true);

        let mut attributes = blueprint
            .map(|bp| bp.attributes.clone())
            .unwrap_or_default();
        for attribute in data.attributes {
            attributes.set(admit_item_attribute(attribute)?);
        }

        let mut tags = blueprint.map(|bp| bp.tags.clone()).unwrap_or_default();
        tags.extend(data.tags);

        let mut item = Self {
            id: ItemId::new(),
            world_id: data.world_id,
            blueprint_id: blueprint.map(|bp| bp.id),
            name: require_name("item", name)?,
            description,
            holder: data.holder,
            quantity: 1,
            stackable,
            destroy_eligible: false,
            attributes,
            statuses: Vec::new(),
            tags: normalize_tags(tags),
        };
        if let Some(quantity) = data.quantity {
            item.set_quantity(i64::from(quantity))?;
        }
        Ok(item)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[inline]
    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    #[inline]
    pub fn blueprint_id(&self) -> Option<ItemBlueprintId> {
        self.blueprint_id
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
    pub fn holder(&self) -> ItemHolder {
        self.holder
    }

    #[inline]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    #[inline]
    pub fn is_stackable(&self) -> bool {
        self.stackable
    }

    #[inline]
    pub fn is_destroy_eligible(&self) -> bool {
        self.destroy_eligible
    }

    #[inline]
    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    #[inline]
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set the stack size. Takes a signed value so a negative request is reported as an
    /// invariant violation rather than a decode failure.
    pub fn set_quantity(&mut self, quantity: i64) -> Result<QuantityChange, DomainError> {
        if quantity < 0 {
            return Err(DomainError::constraint(format!(
                "item quantity cannot be negative (got {})",
                quantity
            )));
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| DomainError::validation("item quantity is too large"))?;
        if quantity > 1 && !self.stackable {
            return Err(DomainError::constraint(format!(
                "item '{}' is not stackable",
                self.name
            )));
        }
        let before = self.quantity;
        self.quantity = quantity;
        self.destroy_eligible = quantity == 0;
        Ok(QuantityChange {
            item_id: self.id,
            before,
            after: quantity,
            destroy_eligible: self.destroy_eligible,
        })
    }

    /// Hand the item to a character.
    pub fn give_to(&mut self, character_id: CharacterId) -> HolderChange {
        self.transfer(ItemHolder::Character(character_id))
    }

    /// Leave the item at a location.
    pub fn drop_at(&mut self, location_id: LocationId) -> HolderChange {
        self.transfer(ItemHolder::Location(location_id))
    }

    fn transfer(&mut self, to: ItemHolder) -> HolderChange {
        let from = std::mem::replace(&mut self.holder, to);
        HolderChange {
            item_id: self.id,
            from,
            to,
        }
    }

    pub fn set_attribute(&mut self, attribute: Attribute) -> Result<(), DomainError> {
        self.attributes.set(admit_item_attribute(attribute)?);
        Ok(())
    }

    pub fn apply_status(&mut self, status: Status) -> Result<(), DomainError> {
        upsert_status(&mut self.statuses, status)
    }

    pub fn remove_status(&mut self, name: &str) -> Result<(), DomainError> {
        if !remove_status(&mut self.statuses, name) {
            return Err(DomainError::not_found("Status", name));
        }
        Ok(())
    }
}

fn admit_item_attribute(attribute: Attribute) -> Result<Attribute, DomainError> {
    AttributeShape::default().admit(attribute)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sword(holder: ItemHolder) -> Item {
        Item::spawn(
            NewItem {
                world_id: WorldId::new(),
                holder,
                name: Some("Longsword".into()),
                description: None,
                quantity: None,
                attributes: vec![],
                tags: vec![],
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn holder_requires_exactly_one_side() {
        assert!(ItemHolder::exactly_one(None, None).is_err());
        let both = ItemHolder::exactly_one(Some(CharacterId::new()), Some(LocationId::new()));
        assert!(both.is_err());
        let holder = ItemHolder::exactly_one(None, Some(LocationId::new())).unwrap();
        assert!(holder.character_id().is_none());
    }

    #[test]
    fn negative_quantity_is_a_constraint_violation() {
        let mut item = sword(ItemHolder::Character(CharacterId::new()));
        let err = item.set_quantity(-1).unwrap_err();
        assert!(matches!(err, DomainError::Constraint(_)));
        assert_eq!(item.quantity(), 1);
    }

    #[test]
    fn zero_quantity_marks_destroy_eligible() {
        let mut item = sword(ItemHolder::Character(CharacterId::new()));
        let change = item.set_quantity(0).unwrap();
        assert!(change.destroy_eligible);
        assert!(item.is_destroy_eligible());
        item.set_quantity(3).unwrap();
        assert!(!item.is_destroy_eligible());
    }

    #[test]
    fn non_stackable_blueprint_caps_quantity_at_one() {
        let mut blueprint = ItemBlueprint::new(WorldId::new(), "Crown").unwrap();
        blueprint.stackable = false;
        let mut item = Item::spawn(
            NewItem {
                world_id: blueprint.world_id,
                holder: ItemHolder::Location(LocationId::new()),
                name: None,
                description: None,
                quantity: None,
                attributes: vec![],
                tags: vec![],
            },
            Some(&blueprint),
        )
        .unwrap();
        assert_eq!(item.name(), "Crown");
        assert_eq!(item.blueprint_id(), Some(blueprint.id));
        assert!(matches!(
            item.set_quantity(2),
            Err(DomainError::Constraint(_))
        ));
    }

    #[test]
    fn transfer_swaps_holder() {
        let shelf = LocationId::new();
        let hero = CharacterId::new();
        let mut item = sword(ItemHolder::Location(shelf));
        let change = item.give_to(hero);
        assert_eq!(change.from, ItemHolder::Location(shelf));
        assert_eq!(item.holder(), ItemHolder::Character(hero));
        let change = item.drop_at(shelf);
        assert_eq!(change.to, ItemHolder::Location(shelf));
    }

    #[test]
    fn holder_serializes_tagged() {
        let id = CharacterId::new();
        let json = serde_json::to_value(ItemHolder::Character(id)).unwrap();
        assert_eq!(json["type"], "character");
        assert_eq!(json["id"], id.to_string());
    }
}
