//! Character aggregate - Player characters and NPCs
//!
//! # Rustic DDD Design
//!
//! Whether a character is a player character is decided once, by the constructor used
//! ([`Character::new_player`] or [`Character::new_npc`]), and cannot be changed
//! afterwards: the field is private and has no setter. Operations scoped to one kind
//! call [`Character::ensure_kind`] inside the same exclusive section as their write.
//!
//! Attribute writes go through the world's [`AttributeShape`], which clamps values
//! into `[0, max]` and rejects values outside declared bounds.

use serde::{Deserialize, Serialize};

use crate::common::{normalize_tags, require_name};
use crate::entities::StandingScale;
use crate::error::DomainError;
use crate::events::{CharacterUpdate, VitalsChange};
use crate::ids::{AbilityBlueprintId, CharacterId, FactionId, LocationId, WorldId};
use crate::value_objects::{
    remove_status, upsert_status, Attribute, AttributeBag, AttributeShape, Status,
};

/// Name of the health attribute (matched case-insensitively).
pub const HP_ATTRIBUTE: &str = "HP";
/// Status applied when HP reaches zero.
pub const UNCONSCIOUS_STATUS: &str = "Unconscious";

/// The two kinds of character. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterKind {
    Player,
    NonPlayer,
}

impl CharacterKind {
    pub fn is_player(&self) -> bool {
        matches!(self, CharacterKind::Player)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CharacterKind::Player => "player character",
            CharacterKind::NonPlayer => "non-player character",
        }
    }
}

/// An ability held by one character, optionally instantiated from a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    #[serde(default)]
    pub blueprint_id: Option<AbilityBlueprintId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: AttributeBag,
}

/// A character's standing within one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionMembership {
    pub faction_id: FactionId,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub reputation: i32,
    /// Freeform title ("Quartermaster", "Initiate")
    #[serde(default)]
    pub role: String,
}

/// Shared fields of both creation paths.
#[derive(Debug, Clone, Default)]
pub struct CharacterDraft {
    pub name: String,
    pub description: Option<String>,
    pub level: Option<u32>,
    pub location_id: Option<LocationId>,
    pub attributes: Vec<Attribute>,
    pub skills: Vec<Attribute>,
    pub abilities: Vec<Ability>,
    pub tags: Vec<String>,
    /// Start in the creation phase, before normal play
    pub creation_in_progress: bool,
}

/// Input for creating a player character.
#[derive(Debug, Clone)]
pub struct NewPlayerCharacter {
    pub world_id: WorldId,
    pub draft: CharacterDraft,
}

/// Input for creating a non-player character.
#[derive(Debug, Clone)]
pub struct NewNonPlayerCharacter {
    pub world_id: WorldId,
    pub draft: CharacterDraft,
}

/// Optional edits to the basics shared by both kinds.
#[derive(Debug, Clone, Default)]
pub struct CharacterBasics {
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<u32>,
    pub tags: Option<Vec<String>>,
}

/// A player character or NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    id: CharacterId,
    world_id: WorldId,
    kind: CharacterKind,
    name: String,
    description: String,
    level: u32,
    location_id: Option<LocationId>,
    attributes: AttributeBag,
    skills: AttributeBag,
    abilities: Vec<Ability>,
    statuses: Vec<Status>,
    factions: Vec<FactionMembership>,
    tags: Vec<String>,
    #[serde(default)]
    creation_in_progress: bool,
}

impl Character {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a player character.
    pub fn new_player(
        data: NewPlayerCharacter,
        shape: &AttributeShape,
    ) -> Result<Self, DomainError> {
        Self::build(CharacterKind::Player, data.world_id, data.draft, shape)
    }

    /// Create a non-player character.
    pub fn new_npc(
        data: NewNonPlayerCharacter,
        shape: &AttributeShape,
    ) -> Result<Self, DomainError> {
        Self::build(CharacterKind::NonPlayer, data.world_id, data.draft, shape)
    }

    fn build(
        kind: CharacterKind,
        world_id: WorldId,
        draft: CharacterDraft,
        shape: &AttributeShape,
    ) -> Result<Self, DomainError> {
        let level = draft.level.unwrap_or(1);
        if level == 0 {
            return Err(DomainError::validation("level must be at least 1"));
        }

        let mut attributes = AttributeBag::new();
        for attribute in draft.attributes {
            attributes.set(shape.admit(attribute)?);
        }
        shape.check_required(&attributes)?;

        let mut character = Self {
            id: CharacterId::new(),
            world_id,
            kind,
            name: require_name("character", draft.name)?,
            description: draft.description.unwrap_or_default(),
            level,
            location_id: draft.location_id,
            attributes,
            skills: AttributeBag::new(),
            abilities: Vec::new(),
            statuses: Vec::new(),
            factions: Vec::new(),
            tags: normalize_tags(draft.tags),
            creation_in_progress: draft.creation_in_progress,
        };
        character.set_skills(draft.skills)?;
        for ability in draft.abilities {
            character.grant_ability(ability)?;
        }
        Ok(character)
    }

    // =========================================================================
    // Identity Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    #[inline]
    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    #[inline]
    pub fn kind(&self) -> CharacterKind {
        self.kind
    }

    #[inline]
    pub fn is_player_character(&self) -> bool {
        self.kind.is_player()
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
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    // =========================================================================
    // Sheet Accessors
    // =========================================================================

    #[inline]
    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    #[inline]
    pub fn skills(&self) -> &AttributeBag {
        &self.skills
    }

    #[inline]
    pub fn abilities(&self) -> &[Ability] {
        &self.abilities
    }

    #[inline]
    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    #[inline]
    pub fn factions(&self) -> &[FactionMembership] {
        &self.factions
    }

    pub fn has_status(&self, name: &str) -> bool {
        self.statuses.iter().any(|s| s.is_named(name))
    }

    pub fn is_unconscious(&self) -> bool {
        self.has_status(UNCONSCIOUS_STATUS)
    }

    pub fn membership(&self, faction_id: FactionId) -> Option<&FactionMembership> {
        self.factions.iter().find(|m| m.faction_id == faction_id)
    }

    /// Whether the character is still being built and normal play has not begun.
    #[inline]
    pub fn creation_in_progress(&self) -> bool {
        self.creation_in_progress
    }

    // =========================================================================
    // Kind Boundary
    // =========================================================================

    /// Fail with a boundary violation unless this character is of `required` kind.
    pub fn ensure_kind(&self, required: CharacterKind) -> Result<(), DomainError> {
        if self.kind != required {
            return Err(DomainError::boundary(format!(
                "character {} is a {}, but this operation only accepts a {}",
                self.id,
                self.kind.label(),
                required.label()
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Mutation Methods
    // =========================================================================

    /// End the creation phase. Returns `false` when it had already ended.
    pub fn finalize(&mut self) -> bool {
        std::mem::replace(&mut self.creation_in_progress, false)
    }

    /// Apply edits to name, description, level and tags. Never touches the kind.
    pub fn update_basics(
        &mut self,
        basics: CharacterBasics,
    ) -> Result<CharacterUpdate, DomainError> {
        let name = basics
            .name
            .map(|n| require_name("character", n))
            .transpose()?;
        if basics.level == Some(0) {
            return Err(DomainError::validation("level must be at least 1"));
        }

        let mut update = CharacterUpdate::default();
        if let Some(name) = name {
            self.name = name;
            update.changed.push("name");
        }
        if let Some(description) = basics.description {
            self.description = description;
            update.changed.push("description");
        }
        if let Some(level) = basics.level {
            self.level = level;
            update.changed.push("level");
        }
        if let Some(tags) = basics.tags {
            self.tags = normalize_tags(tags);
            update.changed.push("tags");
        }
        Ok(update)
    }

    pub fn set_level(&mut self, level: u32) -> Result<(), DomainError> {
        if level == 0 {
            return Err(DomainError::validation("level must be at least 1"));
        }
        self.level = level;
        Ok(())
    }

    pub fn move_to(&mut self, location_id: Option<LocationId>) {
        self.location_id = location_id;
    }

    /// Merge attributes into the sheet. All entries are validated before any is applied.
    pub fn set_attributes(
        &mut self,
        attributes: Vec<Attribute>,
        shape: &AttributeShape,
    ) -> Result<(), DomainError> {
        let admitted = attributes
            .into_iter()
            .map(|a| shape.admit(a))
            .collect::<Result<Vec<_>, _>>()?;
        for attribute in admitted {
            self.attributes.set(attribute);
        }
        Ok(())
    }

    /// Merge skills into the sheet. Skills carry no declared shape but obey the same
    /// `[0, max]` clamp.
    pub fn set_skills(&mut self, skills: Vec<Attribute>) -> Result<(), DomainError> {
        let shape = AttributeShape::default();
        let admitted = skills
            .into_iter()
            .map(|s| shape.admit(s))
            .collect::<Result<Vec<_>, _>>()?;
        for skill in admitted {
            self.skills.set(skill);
        }
        Ok(())
    }

    /// Grant an ability, replacing any same-name ability.
    pub fn grant_ability(&mut self, mut ability: Ability) -> Result<(), DomainError> {
        ability.name = require_name("ability", ability.name)?;
        match self
            .abilities
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(&ability.name))
        {
            Some(existing) => *existing = ability,
            None => self.abilities.push(ability),
        }
        Ok(())
    }

    pub fn revoke_ability(&mut self, name: &str) -> Result<(), DomainError> {
        let before = self.abilities.len();
        self.abilities
            .retain(|a| !a.name.eq_ignore_ascii_case(name.trim()));
        if self.abilities.len() == before {
            return Err(DomainError::not_found("Ability", name));
        }
        Ok(())
    }

    /// Apply a status, replacing any same-name status.
    pub fn apply_status(&mut self, status: Status) -> Result<(), DomainError> {
        upsert_status(&mut self.statuses, status)
    }

    pub fn remove_status(&mut self, name: &str) -> Result<(), DomainError> {
        if !remove_status(&mut self.statuses, name) {
            return Err(DomainError::not_found("Status", name));
        }
        Ok(())
    }

    pub fn join_faction(
        &mut self,
        membership: FactionMembership,
        scale: &StandingScale,
    ) -> Result<(), DomainError> {
        scale.check_rank(membership.rank)?;
        scale.check_reputation(membership.reputation)?;
        if self.membership(membership.faction_id).is_some() {
            return Err(DomainError::constraint(format!(
                "character {} already belongs to faction {}",
                self.id, membership.faction_id
            )));
        }
        self.factions.push(membership);
        Ok(())
    }

    pub fn leave_faction(&mut self, faction_id: FactionId) -> Result<(), DomainError> {
        let before = self.factions.len();
        self.factions.retain(|m| m.faction_id != faction_id);
        if self.factions.len() == before {
            return Err(DomainError::not_found("FactionMembership", faction_id));
        }
        Ok(())
    }

    /// Change rank and/or reputation within a faction the character belongs to.
    pub fn set_standing(
        &mut self,
        faction_id: FactionId,
        rank: Option<u32>,
        reputation: Option<i32>,
        role: Option<String>,
        scale: &StandingScale,
    ) -> Result<FactionMembership, DomainError> {
        let rank = rank.map(|r| scale.check_rank(r)).transpose()?;
        let reputation = reputation.map(|r| scale.check_reputation(r)).transpose()?;
        let membership = self
            .factions
            .iter_mut()
            .find(|m| m.faction_id == faction_id)
            .ok_or_else(|| DomainError::not_found("FactionMembership", faction_id))?;
        if let Some(rank) = rank {
            membership.rank = rank;
        }
        if let Some(reputation) = reputation {
            membership.reputation = reputation;
        }
        if let Some(role) = role {
            membership.role = role;
        }
        Ok(membership.clone())
    }

    // =========================================================================
    // Vitals
    // =========================================================================

    /// Reduce HP, never below zero. Reaching zero applies the unconscious status.
    pub fn deal_damage(&mut self, amount: i64) -> Result<VitalsChange, DomainError> {
        if amount < 0 {
            return Err(DomainError::validation("damage amount cannot be negative"));
        }
        let hp = self.hp_attribute_mut()?;
        let hp_before = hp.value;
        hp.value = hp_before.saturating_sub(amount).max(0);
        let (hp_now, max_hp) = (hp.value, hp.max);

        if hp_now == 0 {
            upsert_status(
                &mut self.statuses,
                Status::new(UNCONSCIOUS_STATUS, "Knocked out at 0 HP"),
            )?;
        }
        Ok(self.vitals(hp_before, hp_now, max_hp))
    }

    /// Restore HP, never above max. Any HP above zero clears the unconscious status.
    pub fn heal(&mut self, amount: i64) -> Result<VitalsChange, DomainError> {
        if amount < 0 {
            return Err(DomainError::validation("heal amount cannot be negative"));
        }
        let hp = self.hp_attribute_mut()?;
        let hp_before = hp.value;
        let raised = hp_before.max(0).saturating_add(amount);
        hp.value = match hp.max {
            Some(max) => raised.min(max),
            None => raised,
        };
        let (hp_now, max_hp) = (hp.value, hp.max);

        if hp_now > 0 {
            remove_status(&mut self.statuses, UNCONSCIOUS_STATUS);
        }
        Ok(self.vitals(hp_before, hp_now, max_hp))
    }

    fn hp_attribute_mut(&mut self) -> Result<&mut Attribute, DomainError> {
        let id = self.id;
        self.attributes.get_mut(HP_ATTRIBUTE).ok_or_else(|| {
            DomainError::validation(format!("character {} has no {} attribute", id, HP_ATTRIBUTE))
        })
    }

    fn vitals(&self, hp_before: i64, hp: i64, max_hp: Option<i64>) -> VitalsChange {
        VitalsChange {
            character_id: self.id,
            hp_before,
            hp,
            max_hp,
            unconscious: self.is_unconscious(),
            source: None,
            damage_type: None,
        }
    }
}
