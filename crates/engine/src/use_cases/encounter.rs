//! Encounter use cases.
//!
//! Each encounter's combatant list and turn pointer are one unit under the
//! encounter's lock. Encounters are looked up by id on every call, so any number can
//! run side by side and all of them survive a restart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use questkeep_domain::{
    Character, CharacterId, Combatant, CombatantRemoval, DomainError, Encounter, EncounterEnd,
    EncounterId, EncounterState, GameTime, LocationId, NewEncounter, TurnAdvance, World, WorldId,
};

use crate::infrastructure::locks::EntityLocks;
use crate::infrastructure::ports::{
    found, CharacterRepo, EncounterRepo, LocationRepo, RepoError, WorldRepo,
};
use crate::use_cases::validation::{require_same_world, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum EncounterError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

// =============================================================================
// Inputs and Views
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CombatantInput {
    pub character_id: CharacterId,
    pub initiative: i32,
    #[serde(default)]
    pub notes: String,
}

impl From<CombatantInput> for Combatant {
    fn from(input: CombatantInput) -> Self {
        Combatant {
            character_id: input.character_id,
            initiative: input.initiative,
            notes: input.notes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartEncounterInput {
    pub world_id: WorldId,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub combatants: Vec<CombatantInput>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One row of the turn order. `name` is `None` when the character was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombatantView {
    pub character_id: CharacterId,
    pub name: Option<String>,
    pub initiative: i32,
    pub notes: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncounterView {
    pub encounter_id: EncounterId,
    pub world_id: WorldId,
    pub name: String,
    pub kind: String,
    pub location_id: Option<LocationId>,
    pub state: EncounterState,
    pub round: u32,
    pub turn_index: usize,
    pub current_combatant_id: Option<CharacterId>,
    pub combatants: Vec<CombatantView>,
    pub started_at: GameTime,
    pub ended_at: Option<GameTime>,
    pub summary: String,
    pub outcome: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncounterEnding {
    pub result: EncounterEnd,
    pub encounter: EncounterView,
}

// =============================================================================
// Encounter Operations
// =============================================================================

pub struct EncounterOps {
    encounters: Arc<dyn EncounterRepo>,
    characters: Arc<dyn CharacterRepo>,
    locations: Arc<dyn LocationRepo>,
    worlds: Arc<dyn WorldRepo>,
    locks: Arc<EntityLocks>,
}

impl EncounterOps {
    pub fn new(
        encounters: Arc<dyn EncounterRepo>,
        characters: Arc<dyn CharacterRepo>,
        locations: Arc<dyn LocationRepo>,
        worlds: Arc<dyn WorldRepo>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            encounters,
            characters,
            locations,
            worlds,
            locks,
        }
    }

    /// Start an encounter, stamped with the world's current game time. An empty
    /// roster is allowed; combatants can join later.
    pub async fn start(&self, input: StartEncounterInput) -> Result<EncounterView, EncounterError> {
        let world_id = input.world_id;
        let world = self.world(world_id).await?;
        if let Some(location_id) = input.location_id {
            let location = found(
                self.locations.get(location_id).await?,
                "Location",
                location_id,
            )?;
            require_same_world("Location", location_id, location.world_id(), world_id)?;
        }
        for combatant in &input.combatants {
            self.check_character(world_id, combatant.character_id)
                .await?;
        }

        let encounter = Encounter::start(
            world_id,
            NewEncounter {
                name: input.name,
                location_id: input.location_id,
                kind: input.kind,
                combatants: input.combatants.into_iter().map(Combatant::from).collect(),
                tags: input.tags,
            },
            world.game_time,
        )?;
        self.encounters.save(&encounter).await?;

        tracing::info!(
            encounter_id = %encounter.id(),
            world_id = %world_id,
            combatants = encounter.combatants().len(),
            "Encounter started"
        );
        self.view(&encounter).await
    }

    pub async fn add_combatant(
        &self,
        id: EncounterId,
        combatant: CombatantInput,
    ) -> Result<EncounterView, EncounterError> {
        let _guard = self.locks.lock(id).await;
        let mut encounter = self.load(id).await?;
        self.check_character(encounter.world_id(), combatant.character_id)
            .await?;
        let character_id = combatant.character_id;
        self.apply(&mut encounter, |e| e.add_combatant(combatant.into()))?;
        self.encounters.save(&encounter).await?;

        tracing::info!(encounter_id = %id, character_id = %character_id, "Combatant added");
        self.view(&encounter).await
    }

    /// Save freshly built characters and seat them all in one step.
    ///
    /// The encounter must be active and share the characters' world. Nothing is
    /// written unless every character can be seated.
    pub async fn seat_new_characters(
        &self,
        id: EncounterId,
        characters: &[Character],
        initiative: i32,
    ) -> Result<EncounterView, EncounterError> {
        let _guard = self.locks.lock(id).await;
        let mut encounter = self.load(id).await?;
        if !encounter.is_active() {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot seat combatants in ended encounter {}",
                id
            ))
            .into());
        }
        for character in characters {
            require_same_world(
                "Character",
                character.id(),
                character.world_id(),
                encounter.world_id(),
            )?;
            let combatant = Combatant::new(character.id(), initiative);
            self.apply(&mut encounter, |e| e.add_combatant(combatant))?;
        }

        if let Err(e) = self.save_seated(&encounter, characters).await {
            self.discard(characters).await;
            return Err(e.into());
        }

        tracing::info!(encounter_id = %id, count = characters.len(), "Combatants seated");
        self.view(&encounter).await
    }

    /// Remove a combatant. Removing the last one ends the encounter.
    pub async fn remove_combatant(
        &self,
        id: EncounterId,
        character_id: CharacterId,
    ) -> Result<CombatantRemoval, EncounterError> {
        let _guard = self.locks.lock(id).await;
        let mut encounter = self.load(id).await?;
        let now = self.world(encounter.world_id()).await?.game_time;
        let removal = self.apply(&mut encounter, |e| e.remove_combatant(character_id, now))?;
        self.encounters.save(&encounter).await?;

        tracing::info!(
            encounter_id = %id,
            character_id = %character_id,
            ended = removal.ended,
            "Combatant removed"
        );
        Ok(removal)
    }

    pub async fn set_initiative(
        &self,
        id: EncounterId,
        character_id: CharacterId,
        initiative: i32,
    ) -> Result<EncounterView, EncounterError> {
        let _guard = self.locks.lock(id).await;
        let mut encounter = self.load(id).await?;
        self.apply(&mut encounter, |e| e.set_initiative(character_id, initiative))?;
        self.encounters.save(&encounter).await?;

        tracing::info!(
            encounter_id = %id,
            character_id = %character_id,
            initiative,
            "Initiative set"
        );
        self.view(&encounter).await
    }

    pub async fn next_turn(&self, id: EncounterId) -> Result<TurnAdvance, EncounterError> {
        let _guard = self.locks.lock(id).await;
        let mut encounter = self.load(id).await?;
        let advance = self.apply(&mut encounter, Encounter::next_turn)?;
        self.encounters.save(&encounter).await?;

        tracing::info!(
            encounter_id = %id,
            round = advance.round,
            active = %advance.active_combatant_id,
            "Turn advanced"
        );
        Ok(advance)
    }

    /// End the encounter. Ending it twice reports `already_ended` and writes nothing.
    pub async fn end(
        &self,
        id: EncounterId,
        summary: Option<String>,
        outcome: Option<String>,
    ) -> Result<EncounterEnding, EncounterError> {
        let _guard = self.locks.lock(id).await;
        let mut encounter = self.load(id).await?;
        let now = self.world(encounter.world_id()).await?.game_time;
        let result = encounter.end(summary, outcome, now);
        if result == EncounterEnd::Ended {
            self.encounters.save(&encounter).await?;
            tracing::info!(encounter_id = %id, round = encounter.round(), "Encounter ended");
        }
        Ok(EncounterEnding {
            result,
            encounter: self.view(&encounter).await?,
        })
    }

    pub async fn get(&self, id: EncounterId) -> Result<EncounterView, EncounterError> {
        let encounter = self.load(id).await?;
        self.view(&encounter).await
    }

    /// The most recently started encounter of a world that is still active.
    pub async fn get_active(
        &self,
        world_id: WorldId,
    ) -> Result<Option<EncounterView>, EncounterError> {
        self.world(world_id).await?;
        let latest = self
            .encounters
            .list_in_world(world_id)
            .await?
            .into_iter()
            .rev()
            .find(Encounter::is_active);
        match latest {
            Some(encounter) => Ok(Some(self.view(&encounter).await?)),
            None => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn apply<T>(
        &self,
        encounter: &mut Encounter,
        mutate: impl FnOnce(&mut Encounter) -> Result<T, DomainError>,
    ) -> Result<T, EncounterError> {
        mutate(&mut *encounter).map_err(|e| {
            tracing::warn!(encounter_id = %encounter.id(), error = %e, "Encounter change rejected");
            EncounterError::from(e)
        })
    }

    async fn view(&self, encounter: &Encounter) -> Result<EncounterView, EncounterError> {
        let current = encounter.current().map(|c| c.character_id);
        let mut combatants = Vec::with_capacity(encounter.combatants().len());
        for combatant in encounter.combatants() {
            let name = self
                .characters
                .get(combatant.character_id)
                .await?
                .map(|c| c.name().to_string());
            combatants.push(CombatantView {
                character_id: combatant.character_id,
                name,
                initiative: combatant.initiative,
                notes: combatant.notes.clone(),
                is_current: current == Some(combatant.character_id),
            });
        }
        Ok(EncounterView {
            encounter_id: encounter.id(),
            world_id: encounter.world_id(),
            name: encounter.name().to_string(),
            kind: encounter.kind().to_string(),
            location_id: encounter.location_id(),
            state: encounter.state(),
            round: encounter.round(),
            turn_index: encounter.turn_index(),
            current_combatant_id: current,
            combatants,
            started_at: encounter.started_at(),
            ended_at: encounter.ended_at(),
            summary: encounter.summary().to_string(),
            outcome: encounter.outcome().to_string(),
            tags: encounter.tags().to_vec(),
        })
    }

    async fn save_seated(
        &self,
        encounter: &Encounter,
        characters: &[Character],
    ) -> Result<(), RepoError> {
        for character in characters {
            self.characters.save(character).await?;
        }
        self.encounters.save(encounter).await
    }

    async fn discard(&self, characters: &[Character]) {
        for character in characters {
            if let Err(e) = self.characters.delete(character.id()).await {
                tracing::error!(
                    character_id = %character.id(),
                    error = %e,
                    "Failed to remove unseated character"
                );
            }
        }
    }

    async fn load(&self, id: EncounterId) -> Result<Encounter, EncounterError> {
        Ok(found(self.encounters.get(id).await?, "Encounter", id)?)
    }

    async fn world(&self, id: WorldId) -> Result<World, EncounterError> {
        Ok(found(self.worlds.get(id).await?, "World", id)?)
    }

    async fn check_character(
        &self,
        world_id: WorldId,
        id: CharacterId,
    ) -> Result<(), EncounterError> {
        let character = found(self.characters.get(id).await?, "Character", id)?;
        require_same_world("Character", id, character.world_id(), world_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{
        MockCharacterRepo, MockEncounterRepo, MockLocationRepo, MockWorldRepo,
    };
    use chrono::Utc;

    fn ops(encounters: MockEncounterRepo, world: &World) -> EncounterOps {
        let mut worlds = MockWorldRepo::new();
        let w = world.clone();
        worlds.expect_get().returning(move |_| Ok(Some(w.clone())));
        let mut characters = MockCharacterRepo::new();
        characters.expect_get().returning(|_| Ok(None));
        EncounterOps::new(
            Arc::new(encounters),
            Arc::new(characters),
            Arc::new(MockLocationRepo::new()),
            Arc::new(worlds),
            Arc::new(EntityLocks::new()),
        )
    }

    fn stored(encounter: &Encounter) -> MockEncounterRepo {
        let mut repo = MockEncounterRepo::new();
        let e = encounter.clone();
        let encounter_id = encounter.id();
        repo.expect_get()
            .withf(move |id| *id == encounter_id)
            .returning(move |_| Ok(Some(e.clone())));
        repo
    }

    fn encounter(world_id: WorldId, roster: &[(CharacterId, i32)]) -> Encounter {
        Encounter::start(
            world_id,
            NewEncounter {
                combatants: roster.iter().map(|(id, i)| Combatant::new(*id, *i)).collect(),
                ..Default::default()
            },
            GameTime::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn when_encounter_missing_next_turn_returns_not_found() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let mut repo = MockEncounterRepo::new();
        repo.expect_get().returning(|_| Ok(None));
        repo.expect_save().never();

        let result = ops(repo, &world).next_turn(EncounterId::new()).await;
        assert!(matches!(result, Err(EncounterError::Repo(e)) if e.is_not_found()));
    }

    #[tokio::test]
    async fn when_encounter_ended_next_turn_is_rejected() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let mut e = encounter(world.id, &[(CharacterId::new(), 10)]);
        e.end(None, None, GameTime::default());

        let mut repo = stored(&e);
        repo.expect_save().never();

        let result = ops(repo, &world).next_turn(e.id()).await;
        assert!(matches!(
            result,
            Err(EncounterError::Domain(DomainError::InvalidStateTransition(_)))
        ));
    }

    #[tokio::test]
    async fn ending_twice_writes_once() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let mut e = encounter(world.id, &[(CharacterId::new(), 10)]);
        e.end(Some("routed".into()), None, GameTime::default());

        let mut repo = stored(&e);
        repo.expect_save().never();

        let ending = ops(repo, &world).end(e.id(), None, None).await.unwrap();
        assert_eq!(ending.result, EncounterEnd::AlreadyEnded);
        assert_eq!(ending.encounter.summary, "routed");
    }

    #[tokio::test]
    async fn removing_last_combatant_ends_encounter() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let only = CharacterId::new();
        let e = encounter(world.id, &[(only, 12)]);

        let mut repo = stored(&e);
        repo.expect_save()
            .withf(|saved| saved.state() == EncounterState::Ended)
            .times(1)
            .returning(|_| Ok(()));

        let removal = ops(repo, &world).remove_combatant(e.id(), only).await.unwrap();
        assert!(removal.ended);
        assert_eq!(removal.active_combatant_id, None);
    }

    #[tokio::test]
    async fn view_reports_deleted_combatants_without_name() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let (a, b) = (CharacterId::new(), CharacterId::new());
        let e = encounter(world.id, &[(a, 5), (b, 18)]);

        let view = ops(stored(&e), &world).get(e.id()).await.unwrap();
        assert_eq!(view.current_combatant_id, Some(b));
        assert_eq!(view.combatants[0].character_id, b);
        assert!(view.combatants[0].is_current);
        assert!(view.combatants.iter().all(|c| c.name.is_none()));
    }

    fn goblin(world_id: WorldId, name: &str) -> Character {
        use questkeep_domain::{AttributeShape, CharacterDraft, NewNonPlayerCharacter};

        Character::new_npc(
            NewNonPlayerCharacter {
                world_id,
                draft: CharacterDraft {
                    name: name.into(),
                    ..Default::default()
                },
            },
            &AttributeShape::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn seating_new_characters_writes_them_with_the_encounter() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let veteran = CharacterId::new();
        let e = encounter(world.id, &[(veteran, 15)]);
        let spawned = vec![goblin(world.id, "Goblin 1"), goblin(world.id, "Goblin 2")];

        let mut repo = stored(&e);
        repo.expect_save()
            .withf(|saved| saved.combatants().len() == 3)
            .times(1)
            .returning(|_| Ok(()));
        let mut characters = MockCharacterRepo::new();
        characters.expect_save().times(2).returning(|_| Ok(()));
        characters.expect_get().returning(|_| Ok(None));
        characters.expect_delete().never();
        let mut worlds = MockWorldRepo::new();
        worlds.expect_get().never();

        let ops = EncounterOps::new(
            Arc::new(repo),
            Arc::new(characters),
            Arc::new(MockLocationRepo::new()),
            Arc::new(worlds),
            Arc::new(EntityLocks::new()),
        );
        let view = ops.seat_new_characters(e.id(), &spawned, 15).await.unwrap();
        let order: Vec<CharacterId> = view.combatants.iter().map(|c| c.character_id).collect();
        assert_eq!(order, vec![veteran, spawned[0].id(), spawned[1].id()]);
    }

    #[tokio::test]
    async fn when_encounter_write_fails_seated_characters_are_removed() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let e = encounter(world.id, &[]);
        let spawned = vec![goblin(world.id, "Kobold")];

        let mut repo = stored(&e);
        repo.expect_save()
            .returning(|_| Err(RepoError::database("save", "disk full")));
        let mut characters = MockCharacterRepo::new();
        characters.expect_save().times(1).returning(|_| Ok(()));
        let kobold = spawned[0].id();
        characters
            .expect_delete()
            .withf(move |id| *id == kobold)
            .times(1)
            .returning(|_| Ok(true));

        let ops = EncounterOps::new(
            Arc::new(repo),
            Arc::new(characters),
            Arc::new(MockLocationRepo::new()),
            Arc::new(MockWorldRepo::new()),
            Arc::new(EntityLocks::new()),
        );
        let result = ops.seat_new_characters(e.id(), &spawned, 3).await;
        assert!(matches!(result, Err(EncounterError::Repo(_))));
    }

    #[tokio::test]
    async fn when_character_is_foreign_nothing_is_written() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let e = encounter(world.id, &[]);
        let spawned = vec![goblin(world.id, "Local"), goblin(WorldId::new(), "Stray")];

        let mut repo = stored(&e);
        repo.expect_save().never();
        let mut characters = MockCharacterRepo::new();
        characters.expect_save().never();

        let ops = EncounterOps::new(
            Arc::new(repo),
            Arc::new(characters),
            Arc::new(MockLocationRepo::new()),
            Arc::new(MockWorldRepo::new()),
            Arc::new(EntityLocks::new()),
        );
        let result = ops.seat_new_characters(e.id(), &spawned, 3).await;
        assert!(matches!(result, Err(EncounterError::Validation(_))));
    }

    #[tokio::test]
    async fn active_encounter_is_the_latest_still_running() {
        let world = World::new("Oerth", Utc::now()).unwrap();
        let older = encounter(world.id, &[]);
        let newer = encounter(world.id, &[]);
        let mut finished = encounter(world.id, &[]);
        finished.end(None, None, GameTime::default());

        let mut repo = MockEncounterRepo::new();
        let listed = vec![older, newer.clone(), finished];
        repo.expect_list_in_world()
            .returning(move |_| Ok(listed.clone()));

        let active = ops(repo, &world).get_active(world.id).await.unwrap();
        assert_eq!(active.map(|v| v.encounter_id), Some(newer.id()));
    }
}
