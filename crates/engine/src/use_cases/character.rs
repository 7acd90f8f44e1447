//! Character use cases.
//!
//! Covers both creation paths (player and non-player), sheet edits, faction
//! membership and vitals. Every mutation of an existing character runs under that
//! character's lock: load, check, apply, save.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use questkeep_domain::aggregates::HP_ATTRIBUTE;
use questkeep_domain::{
    Ability, AbilityBlueprintId, Attribute, AttributeBag, Character, CharacterBasics,
    CharacterDraft, CharacterId, CharacterKind, CharacterUpdate, DomainError, FactionId,
    FactionMembership, LocationId, NewNonPlayerCharacter, NewPlayerCharacter, Status,
    VitalsChange, World, WorldId,
};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{
    found, BlueprintRepo, CharacterRepo, FactionRepo, LocationRepo, RepoError, WorldRepo,
};
use crate::use_cases::validation::{require_same_world, ValidationError};

/// Most characters one enemy template may spawn.
pub const MAX_SPAWN_PER_TEMPLATE: u32 = 50;

/// HP given to spawned enemies that declare none.
const DEFAULT_ENEMY_HP: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum CharacterError {
    #[error("Spawn count must be between 1 and {max}, got {count}")]
    SpawnCount { count: u32, max: u32 },
    #[error("An ability needs a name or a blueprint_id")]
    UnnamedAbility,
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

/// Fields shared by both creation paths.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterInput {
    pub name: String,
    pub description: Option<String>,
    pub level: Option<u32>,
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub skills: Vec<Attribute>,
    #[serde(default)]
    pub abilities: Vec<AbilityGrant>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Keep the character in the creation phase until `finalize_character`
    #[serde(default)]
    pub creation_in_progress: bool,
}

/// An ability to grant, either spelled out or taken from a blueprint.
///
/// Explicit fields win over the blueprint's.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbilityGrant {
    pub blueprint_id: Option<AbilityBlueprintId>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Edits accepted by the update operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// One line of a `spawn_enemies` call.
#[derive(Debug, Clone, Deserialize)]
pub struct EnemyTemplate {
    pub name: String,
    pub count: Option<u32>,
    pub description: Option<String>,
    /// Sets both HP and its maximum
    pub hp: Option<i64>,
    pub level: Option<u32>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of an update: the saved character and which basics changed.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedCharacter {
    pub character: Character,
    pub update: CharacterUpdate,
}

// =============================================================================
// Character Operations
// =============================================================================

pub struct CharacterOps {
    characters: Arc<dyn CharacterRepo>,
    worlds: Arc<dyn WorldRepo>,
    locations: Arc<dyn LocationRepo>,
    factions: Arc<dyn FactionRepo>,
    blueprints: Arc<dyn BlueprintRepo>,
    locks: Arc<EntityLocks>,
}

impl CharacterOps {
    pub fn new(
        characters: Arc<dyn CharacterRepo>,
        worlds: Arc<dyn WorldRepo>,
        locations: Arc<dyn LocationRepo>,
        factions: Arc<dyn FactionRepo>,
        blueprints: Arc<dyn BlueprintRepo>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            characters,
            worlds,
            locations,
            factions,
            blueprints,
            locks,
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Create a non-player character. There is no way to ask for a player here.
    pub async fn create_npc(
        &self,
        world_id: WorldId,
        input: CharacterInput,
    ) -> Result<Character, CharacterError> {
        let world = self.world(world_id).await?;
        let draft = self.draft(&world, input).await?;
        let character = Character::new_npc(
            NewNonPlayerCharacter { world_id, draft },
            &world.settings.attribute_shape,
        )?;
        self.characters.save(&character).await?;

        tracing::info!(
            character_id = %character.id(),
            world_id = %world_id,
            name = %character.name(),
            "NPC created"
        );
        Ok(character)
    }

    pub async fn create_player_character(
        &self,
        world_id: WorldId,
        input: CharacterInput,
    ) -> Result<Character, CharacterError> {
        let world = self.world(world_id).await?;
        let draft = self.draft(&world, input).await?;
        let character = Character::new_player(
            NewPlayerCharacter { world_id, draft },
            &world.settings.attribute_shape,
        )?;
        self.characters.save(&character).await?;

        tracing::info!(
            character_id = %character.id(),
            world_id = %world_id,
            name = %character.name(),
            "Player character created"
        );
        Ok(character)
    }

    /// Create and save a batch of non-player characters from templates.
    pub async fn spawn_enemies(
        &self,
        world_id: WorldId,
        location_id: Option<LocationId>,
        templates: Vec<EnemyTemplate>,
    ) -> Result<Vec<Character>, CharacterError> {
        let spawned = self.prepare_enemies(world_id, location_id, templates).await?;
        for character in &spawned {
            self.characters.save(character).await?;
        }
        tracing::info!(world_id = %world_id, count = spawned.len(), "Enemies spawned");
        Ok(spawned)
    }

    /// Build and validate a batch of non-player characters without saving any. A
    /// template with `count > 1` numbers its names ("Goblin 1", "Goblin 2", ...).
    pub async fn prepare_enemies(
        &self,
        world_id: WorldId,
        location_id: Option<LocationId>,
        templates: Vec<EnemyTemplate>,
    ) -> Result<Vec<Character>, CharacterError> {
        let world = self.world(world_id).await?;
        self.check_location(&world, location_id).await?;

        let mut spawned = Vec::new();
        for template in templates {
            let count = template.count.unwrap_or(1);
            if count == 0 || count > MAX_SPAWN_PER_TEMPLATE {
                return Err(CharacterError::SpawnCount {
                    count,
                    max: MAX_SPAWN_PER_TEMPLATE,
                });
            }

            let mut attributes = template.attributes.clone();
            let declares_hp = attributes.iter().any(|a| a.is_named(HP_ATTRIBUTE));
            match template.hp {
                Some(hp) => attributes.push(Attribute::new(HP_ATTRIBUTE, hp).with_max(hp)),
                None if !declares_hp => attributes.push(
                    Attribute::new(HP_ATTRIBUTE, DEFAULT_ENEMY_HP).with_max(DEFAULT_ENEMY_HP),
                ),
                None => {}
            }

            for n in 1..=count {
                let name = if count > 1 {
                    format!("{} {}", template.name.trim(), n)
                } else {
                    template.name.clone()
                };
                let draft = CharacterDraft {
                    name,
                    description: template.description.clone(),
                    level: template.level,
                    location_id,
                    attributes: attributes.clone(),
                    tags: template.tags.clone(),
                    ..Default::default()
                };
                spawned.push(Character::new_npc(
                    NewNonPlayerCharacter { world_id, draft },
                    &world.settings.attribute_shape,
                )?);
            }
        }
        Ok(spawned)
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Apply a patch to a character of the `required` kind.
    ///
    /// The kind check happens on the freshly loaded record under the lock, so a
    /// non-player update can never land on a player character.
    pub async fn update(
        &self,
        id: CharacterId,
        required: CharacterKind,
        patch: CharacterPatch,
    ) -> Result<UpdatedCharacter, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        if let Err(e) = character.ensure_kind(required) {
            tracing::warn!(
                character_id = %id,
                required = %required.label(),
                "Kind boundary rejected update"
            );
            return Err(e.into());
        }

        let world = self.world(character.world_id()).await?;
        self.check_location(&world, patch.location_id).await?;

        let update = character.update_basics(CharacterBasics {
            name: patch.name,
            description: patch.description,
            level: patch.level,
            tags: patch.tags,
        })?;
        if !patch.attributes.is_empty() {
            character.set_attributes(patch.attributes, &world.settings.attribute_shape)?;
        }
        if patch.location_id.is_some() {
            character.move_to(patch.location_id);
        }
        self.characters.save(&character).await?;

        tracing::info!(character_id = %id, changed = ?update.changed, "Character updated");
        Ok(UpdatedCharacter { character, update })
    }

    /// End a character's creation phase so normal play can begin. Finalizing twice
    /// changes nothing.
    pub async fn finalize(&self, id: CharacterId) -> Result<Character, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        if character.finalize() {
            self.characters.save(&character).await?;
            tracing::info!(character_id = %id, "Character creation finalized");
        }
        Ok(character)
    }

    pub async fn delete(&self, id: CharacterId) -> Result<(), CharacterError> {
        let _guard = self.locks.lock(id).await;
        if !self.characters.delete(id).await? {
            return Err(RepoError::not_found("Character", id).into());
        }
        tracing::info!(character_id = %id, "Character deleted");
        Ok(())
    }

    /// Move a character to a location, or nowhere with `None`.
    pub async fn move_to(
        &self,
        id: CharacterId,
        location_id: Option<LocationId>,
    ) -> Result<Character, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let world = self.world(character.world_id()).await?;
        self.check_location(&world, location_id).await?;
        character.move_to(location_id);
        self.characters.save(&character).await?;

        tracing::info!(character_id = %id, location_id = ?location_id, "Character moved");
        Ok(character)
    }

    pub async fn set_level(
        &self,
        id: CharacterId,
        level: u32,
    ) -> Result<Character, CharacterError> {
        self.modify(id, |c| Ok(c.set_level(level)?)).await
    }

    pub async fn set_attributes(
        &self,
        id: CharacterId,
        attributes: Vec<Attribute>,
    ) -> Result<Character, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let world = self.world(character.world_id()).await?;
        character.set_attributes(attributes, &world.settings.attribute_shape)?;
        self.characters.save(&character).await?;
        tracing::info!(character_id = %id, "Attributes set");
        Ok(character)
    }

    pub async fn set_skills(
        &self,
        id: CharacterId,
        skills: Vec<Attribute>,
    ) -> Result<Character, CharacterError> {
        self.modify(id, |c| Ok(c.set_skills(skills)?)).await
    }

    pub async fn grant_abilities(
        &self,
        id: CharacterId,
        grants: Vec<AbilityGrant>,
    ) -> Result<Character, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let abilities = self.resolve_abilities(character.world_id(), grants).await?;
        for ability in abilities {
            character.grant_ability(ability)?;
        }
        self.characters.save(&character).await?;
        tracing::info!(character_id = %id, "Abilities granted");
        Ok(character)
    }

    pub async fn revoke_ability(
        &self,
        id: CharacterId,
        name: &str,
    ) -> Result<Character, CharacterError> {
        self.modify(id, |c| Ok(c.revoke_ability(name)?)).await
    }

    /// Apply statuses in order; a status replaces any same-name status.
    pub async fn apply_statuses(
        &self,
        id: CharacterId,
        statuses: Vec<Status>,
    ) -> Result<Character, CharacterError> {
        self.modify(id, |c| {
            for status in statuses {
                c.apply_status(status)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn remove_status(
        &self,
        id: CharacterId,
        name: &str,
    ) -> Result<Character, CharacterError> {
        self.modify(id, |c| Ok(c.remove_status(name)?)).await
    }

    // =========================================================================
    // Faction Membership
    // =========================================================================

    pub async fn join_faction(
        &self,
        id: CharacterId,
        membership: FactionMembership,
    ) -> Result<Character, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let world = self.world(character.world_id()).await?;
        let faction_id = membership.faction_id;
        let faction = found(self.factions.get(faction_id).await?, "Faction", faction_id)?;
        require_same_world("Faction", faction_id, faction.world_id, world.id)?;

        character.join_faction(membership, &world.settings.standing_scale)?;
        self.characters.save(&character).await?;
        tracing::info!(character_id = %id, faction_id = %faction_id, "Joined faction");
        Ok(character)
    }

    pub async fn leave_faction(
        &self,
        id: CharacterId,
        faction_id: FactionId,
    ) -> Result<Character, CharacterError> {
        self.modify(id, |c| Ok(c.leave_faction(faction_id)?)).await
    }

    pub async fn set_faction_standing(
        &self,
        id: CharacterId,
        faction_id: FactionId,
        rank: Option<u32>,
        reputation: Option<i32>,
        role: Option<String>,
    ) -> Result<FactionMembership, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let world = self.world(character.world_id()).await?;
        let membership = character.set_standing(
            faction_id,
            rank,
            reputation,
            role,
            &world.settings.standing_scale,
        )?;
        self.characters.save(&character).await?;
        tracing::info!(
            character_id = %id,
            faction_id = %faction_id,
            rank = membership.rank,
            reputation = membership.reputation,
            "Faction standing changed"
        );
        Ok(membership)
    }

    // =========================================================================
    // Vitals
    // =========================================================================

    /// Reduce HP. `source` and `damage_type` are echoed back and logged, not interpreted.
    pub async fn deal_damage(
        &self,
        id: CharacterId,
        amount: i64,
        source: Option<String>,
        damage_type: Option<String>,
    ) -> Result<VitalsChange, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let change = character.deal_damage(amount)?.caused_by(source, damage_type);
        self.characters.save(&character).await?;

        tracing::info!(
            character_id = %id,
            amount,
            source = ?change.source,
            damage_type = ?change.damage_type,
            hp = change.hp,
            knocked_out = change.knocked_out(),
            unconscious = change.unconscious,
            "Damage dealt"
        );
        Ok(change)
    }

    pub async fn heal(&self, id: CharacterId, amount: i64) -> Result<VitalsChange, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        let change = character.heal(amount)?;
        self.characters.save(&character).await?;

        tracing::info!(character_id = %id, amount, hp = change.hp, "Character healed");
        Ok(change)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn modify(
        &self,
        id: CharacterId,
        apply: impl FnOnce(&mut Character) -> Result<(), CharacterError>,
    ) -> Result<Character, CharacterError> {
        let _guard = self.locks.lock(id).await;
        let mut character = self.load(id).await?;
        apply(&mut character)?;
        self.characters.save(&character).await?;
        tracing::debug!(character_id = %id, "Character saved");
        Ok(character)
    }

    async fn load(&self, id: CharacterId) -> Result<Character, CharacterError> {
        Ok(found(self.characters.get(id).await?, "Character", id)?)
    }

    async fn world(&self, id: WorldId) -> Result<World, CharacterError> {
        Ok(found(self.worlds.get(id).await?, "World", id)?)
    }

    async fn check_location(
        &self,
        world: &World,
        location_id: Option<LocationId>,
    ) -> Result<(), CharacterError> {
        if let Some(location_id) = location_id {
            let location = found(
                self.locations.get(location_id).await?,
                "Location",
                location_id,
            )?;
            require_same_world("Location", location_id, location.world_id(), world.id)?;
        }
        Ok(())
    }

    async fn draft(
        &self,
        world: &World,
        input: CharacterInput,
    ) -> Result<CharacterDraft, CharacterError> {
        self.check_location(world, input.location_id).await?;
        let abilities = self.resolve_abilities(world.id, input.abilities).await?;
        Ok(CharacterDraft {
            name: input.name,
            description: input.description,
            level: input.level,
            location_id: input.location_id,
            attributes: input.attributes,
            skills: input.skills,
            abilities,
            tags: input.tags,
            creation_in_progress: input.creation_in_progress,
        })
    }

    async fn resolve_abilities(
        &self,
        world_id: WorldId,
        grants: Vec<AbilityGrant>,
    ) -> Result<Vec<Ability>, CharacterError> {
        let mut abilities = Vec::with_capacity(grants.len());
        for grant in grants {
            let blueprint = match grant.blueprint_id {
                Some(bp_id) => {
                    let bp = found(
                        self.blueprints.get_ability_blueprint(bp_id).await?,
                        "AbilityBlueprint",
                        bp_id,
                    )?;
                    require_same_world("AbilityBlueprint", bp_id, bp.world_id, world_id)?;
                    Some(bp)
                }
                None => None,
            };

            let name = match (grant.name, &blueprint) {
                (Some(name), _) => name,
                (None, Some(bp)) => bp.name.clone(),
                (None, None) => return Err(CharacterError::UnnamedAbility),
            };
            let description = grant
                .description
                .or_else(|| blueprint.as_ref().map(|bp| bp.description.clone()))
                .unwrap_or_default();
            let attributes: AttributeBag = if grant.attributes.is_empty() {
                blueprint
                    .as_ref()
                    .map(|bp| bp.attributes.clone())
                    .unwrap_or_default()
            } else {
                grant.attributes.into_iter().collect()
            };

            abilities.push(Ability {
                blueprint_id: grant.blueprint_id,
                name,
                description,
                attributes,
            });
        }
        Ok(abilities)
    }
}
