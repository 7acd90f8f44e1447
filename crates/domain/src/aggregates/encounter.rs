//! Encounter aggregate - Turn-based combat state machine
//!
//! # Lifecycle
//!
//! An encounter is created `active` by [`Encounter::start`] and moves to `ended`
//! either explicitly via [`Encounter::end`] or when its last combatant is removed.
//! `ended` is terminal: every mutation after it fails with
//! [`DomainError::InvalidStateTransition`].
//!
//! # Turn order
//!
//! Combatants are kept sorted by initiative, highest first. Ties keep the order in
//! which combatants were supplied or added. `turn_index` points at the combatant
//! whose turn it is; every mutation keeps it pointing at the same combatant unless
//! that combatant left.

use serde::{Deserialize, Serialize};

use crate::common::normalize_tags;
use crate::error::DomainError;
use crate::events::{CombatantRemoval, EncounterEnd, TurnAdvance};
use crate::ids::{CharacterId, EncounterId, LocationId, WorldId};
use crate::value_objects::GameTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterState {
    Active,
    Ended,
}

/// A character taking part in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub character_id: CharacterId,
    pub initiative: i32,
    #[serde(default)]
    pub notes: String,
}

impl Combatant {
    pub fn new(character_id: CharacterId, initiative: i32) -> Self {
        Self {
            character_id,
            initiative,
            notes: String::new(),
        }
    }
}

/// Input for starting an encounter.
#[derive(Debug, Clone, Default)]
pub struct NewEncounter {
    pub name: Option<String>,
    pub location_id: Option<LocationId>,
    /// combat, chase, social...
    pub kind: Option<String>,
    pub combatants: Vec<Combatant>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    id: EncounterId,
    world_id: WorldId,
    name: String,
    kind: String,
    location_id: Option<LocationId>,
    combatants: Vec<Combatant>,
    turn_index: usize,
    round: u32,
    state: EncounterState,
    started_at: GameTime,
    ended_at: Option<GameTime>,
    summary: String,
    outcome: String,
    tags: Vec<String>,
}

impl Encounter {
    /// Start an encounter. Combatants are sorted by initiative (stable); duplicate
    /// character ids are rejected.
    pub fn start(
        world_id: WorldId,
        data: NewEncounter,
        started_at: GameTime,
    ) -> Result<Self, DomainError> {
        let mut combatants: Vec<Combatant> = Vec::with_capacity(data.combatants.len());
        for combatant in data.combatants {
            if combatants
                .iter()
                .any(|c| c.character_id == combatant.character_id)
            {
                return Err(DomainError::validation(format!(
                    "character {} is listed twice",
                    combatant.character_id
                )));
            }
            combatants.push(combatant);
        }
        sort_by_initiative(&mut combatants);

        Ok(Self {
            id: EncounterId::new(),
            world_id,
            name: data.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            kind: data.kind.unwrap_or_else(|| "combat".to_string()),
            location_id: data.location_id,
            combatants,
            turn_index: 0,
            round: 1,
            state: EncounterState::Active,
            started_at,
            ended_at: None,
            summary: String::new(),
            outcome: String::new(),
            tags: normalize_tags(data.tags),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn id(&self) -> EncounterId {
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
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[inline]
    pub fn location_id(&self) -> Option<LocationId> {
        self.location_id
    }

    /// Combatants in turn order.
    #[inline]
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    #[inline]
    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    #[inline]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[inline]
    pub fn state(&self) -> EncounterState {
        self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == EncounterState::Active
    }

    #[inline]
    pub fn started_at(&self) -> GameTime {
        self.started_at
    }

    #[inline]
    pub fn ended_at(&self) -> Option<GameTime> {
        self.ended_at
    }

    #[inline]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[inline]
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    #[inline]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The combatant whose turn it is.
    pub fn current(&self) -> Option<&Combatant> {
        if !self.is_active() {
            return None;
        }
        self.combatants.get(self.turn_index)
    }

    pub fn contains(&self, character_id: CharacterId) -> bool {
        self.position_of(character_id).is_some()
    }

    fn position_of(&self, character_id: CharacterId) -> Option<usize> {
        self.combatants
            .iter()
            .position(|c| c.character_id == character_id)
    }

    // =========================================================================
    // Turn Order Mutations
    // =========================================================================

    /// Insert a combatant after every existing combatant with the same or higher
    /// initiative. The active combatant stays active.
    pub fn add_combatant(&mut self, combatant: Combatant) -> Result<(), DomainError> {
        self.ensure_active("add a combatant")?;
        if self.contains(combatant.character_id) {
            return Err(DomainError::constraint(format!(
                "character {} is already in encounter {}",
                combatant.character_id, self.id
            )));
        }
        let was_empty = self.combatants.is_empty();
        let position = self
            .combatants
            .iter()
            .position(|c| c.initiative < combatant.initiative)
            .unwrap_or(self.combatants.len());
        self.combatants.insert(position, combatant);
        if !was_empty && position <= self.turn_index {
            self.turn_index += 1;
        }
        Ok(())
    }

    /// Remove a combatant without skipping or repeating anyone's turn.
    ///
    /// Removing the active combatant hands the turn to whoever was next; when the
    /// active combatant was last in order that is the first combatant of a new round.
    /// Removing the final combatant ends the encounter.
    pub fn remove_combatant(
        &mut self,
        character_id: CharacterId,
        ended_at: GameTime,
    ) -> Result<CombatantRemoval, DomainError> {
        self.ensure_active("remove a combatant")?;
        if self.combatants.is_empty() {
            return Err(DomainError::invalid_state_transition(format!(
                "encounter {} has no combatants",
                self.id
            )));
        }
        let index = self
            .position_of(character_id)
            .ok_or_else(|| DomainError::not_found("Combatant", character_id))?;
        self.combatants.remove(index);

        let mut round_incremented = false;
        if self.combatants.is_empty() {
            self.turn_index = 0;
            self.state = EncounterState::Ended;
            self.ended_at = Some(ended_at);
        } else if index < self.turn_index {
            self.turn_index -= 1;
        } else if index == self.turn_index && self.turn_index == self.combatants.len() {
            self.turn_index = 0;
            self.round += 1;
            round_incremented = true;
        }

        Ok(CombatantRemoval {
            encounter_id: self.id,
            removed: character_id,
            active_combatant_id: self.current().map(|c| c.character_id),
            round_incremented,
            ended: !self.is_active(),
        })
    }

    /// Change one combatant's initiative and re-sort. The active combatant keeps the
    /// turn, wherever it lands.
    pub fn set_initiative(
        &mut self,
        character_id: CharacterId,
        initiative: i32,
    ) -> Result<(), DomainError> {
        self.ensure_active("set initiative")?;
        let index = self
            .position_of(character_id)
            .ok_or_else(|| DomainError::not_found("Combatant", character_id))?;
        let active = self.current().map(|c| c.character_id);

        self.combatants[index].initiative = initiative;
        sort_by_initiative(&mut self.combatants);

        if let Some(active) = active {
            self.turn_index = self.position_of(active).unwrap_or(0);
        }
        Ok(())
    }

    /// Advance the turn pointer, starting a new round on wrap.
    pub fn next_turn(&mut self) -> Result<TurnAdvance, DomainError> {
        self.ensure_active("advance the turn")?;
        let len = self.combatants.len();
        if len == 0 {
            return Err(DomainError::invalid_state_transition(format!(
                "encounter {} has no combatants",
                self.id
            )));
        }
        self.turn_index = (self.turn_index + 1) % len;
        let round_incremented = self.turn_index == 0;
        if round_incremented {
            self.round += 1;
        }
        Ok(TurnAdvance {
            encounter_id: self.id,
            active_combatant_id: self.combatants[self.turn_index].character_id,
            round_incremented,
            round: self.round,
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// End the encounter. Ending an ended encounter changes nothing.
    pub fn end(
        &mut self,
        summary: Option<String>,
        outcome: Option<String>,
        ended_at: GameTime,
    ) -> EncounterEnd {
        if !self.is_active() {
            return EncounterEnd::AlreadyEnded;
        }
        self.state = EncounterState::Ended;
        self.ended_at = Some(ended_at);
        if let Some(summary) = summary {
            self.summary = summary;
        }
        if let Some(outcome) = outcome {
            self.outcome = outcome;
        }
        EncounterEnd::Ended
    }

    fn ensure_active(&self, action: &str) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot {} in ended encounter {}",
                action, self.id
            )));
        }
        Ok(())
    }
}

fn sort_by_initiative(combatants: &mut [Combatant]) {
    // sort_by is stable: equal initiatives keep their relative order
    combatants.sort_by(|a, b| b.initiative.cmp(&a.initiative));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<CharacterId> {
        (0..n).map(|_| CharacterId::new()).collect()
    }

    fn start(roster: &[(CharacterId, i32)]) -> Encounter {
        Encounter::start(
            WorldId::new(),
            NewEncounter {
                combatants: roster
                    .iter()
                    .map(|(id, init)| Combatant::new(*id, *init))
                    .collect(),
                ..Default::default()
            },
            GameTime::default(),
        )
        .unwrap()
    }

    fn order(e: &Encounter) -> Vec<CharacterId> {
        e.combatants().iter().map(|c| c.character_id).collect()
    }

    fn active(e: &Encounter) -> CharacterId {
        e.current().unwrap().character_id
    }

    #[test]
    fn ties_keep_supplied_order() {
        let c = ids(3);
        let e = start(&[(c[0], 10), (c[1], 15), (c[2], 15)]);
        assert_eq!(order(&e), vec![c[1], c[2], c[0]]);
        assert_eq!(e.turn_index(), 0);
        assert_eq!(e.round(), 1);
    }

    #[test]
    fn duplicate_combatants_rejected_at_start() {
        let c = ids(1);
        let err = Encounter::start(
            WorldId::new(),
            NewEncounter {
                combatants: vec![Combatant::new(c[0], 1), Combatant::new(c[0], 2)],
                ..Default::default()
            },
            GameTime::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn full_cycle_returns_to_start_with_one_round_increment() {
        let c = ids(4);
        let mut e = start(&[(c[0], 5), (c[1], 20), (c[2], 12), (c[3], 1)]);
        let first = active(&e);
        let mut increments = 0;
        for _ in 0..4 {
            if e.next_turn().unwrap().round_incremented {
                increments += 1;
            }
        }
        assert_eq!(active(&e), first);
        assert_eq!(increments, 1);
        assert_eq!(e.round(), 2);
    }

    #[test]
    fn add_before_pointer_keeps_active_combatant() {
        let c = ids(3);
        let mut e = start(&[(c[0], 20), (c[1], 10)]);
        e.next_turn().unwrap();
        assert_eq!(active(&e), c[1]);

        e.add_combatant(Combatant::new(c[2], 15)).unwrap();
        assert_eq!(order(&e), vec![c[0], c[2], c[1]]);
        assert_eq!(active(&e), c[1]);
    }

    #[test]
    fn add_goes_after_equal_initiative() {
        let c = ids(3);
        let mut e = start(&[(c[0], 10), (c[1], 5)]);
        e.add_combatant(Combatant::new(c[2], 10)).unwrap();
        assert_eq!(order(&e), vec![c[0], c[2], c[1]]);
        assert_eq!(active(&e), c[0]);
    }

    #[test]
    fn add_existing_combatant_conflicts() {
        let c = ids(1);
        let mut e = start(&[(c[0], 10)]);
        assert!(matches!(
            e.add_combatant(Combatant::new(c[0], 3)),
            Err(DomainError::Constraint(_))
        ));
    }

    #[test]
    fn add_to_empty_encounter_keeps_pointer_at_zero() {
        let c = ids(1);
        let mut e = start(&[]);
        e.add_combatant(Combatant::new(c[0], 3)).unwrap();
        assert_eq!(e.turn_index(), 0);
        assert_eq!(active(&e), c[0]);
    }

    #[test]
    fn removing_active_hands_turn_to_next() {
        let c = ids(3);
        let mut e = start(&[(c[0], 30), (c[1], 20), (c[2], 10)]);
        e.next_turn().unwrap();
        let removal = e.remove_combatant(c[1], GameTime::default()).unwrap();
        assert_eq!(removal.active_combatant_id, Some(c[2]));
        assert!(!removal.round_incremented);
    }

    #[test]
    fn removing_before_pointer_shifts_it_back() {
        let c = ids(3);
        let mut e = start(&[(c[0], 30), (c[1], 20), (c[2], 10)]);
        e.next_turn().unwrap();
        e.next_turn().unwrap();
        e.remove_combatant(c[0], GameTime::default()).unwrap();
        assert_eq!(active(&e), c[2]);
        assert_eq!(e.turn_index(), 1);
    }

    #[test]
    fn removing_last_in_order_while_active_wraps_to_new_round() {
        let c = ids(3);
        let mut e = start(&[(c[0], 30), (c[1], 20), (c[2], 10)]);
        e.next_turn().unwrap();
        e.next_turn().unwrap();
        let removal = e.remove_combatant(c[2], GameTime::default()).unwrap();
        assert!(removal.round_incremented);
        assert_eq!(removal.active_combatant_id, Some(c[0]));
        assert_eq!(e.round(), 2);
    }

    #[test]
    fn removal_never_skips_or_repeats_a_turn() {
        let c = ids(4);
        let mut e = start(&[(c[0], 40), (c[1], 30), (c[2], 20), (c[3], 10)]);
        // c0 acts, c1 acts, then c2 leaves before acting
        let mut seen = vec![active(&e)];
        seen.push(e.next_turn().unwrap().active_combatant_id);
        e.remove_combatant(c[2], GameTime::default()).unwrap();
        seen.push(e.next_turn().unwrap().active_combatant_id);
        assert_eq!(seen, vec![c[0], c[1], c[3]]);
        // Next is c0 again, in round 2
        let advance = e.next_turn().unwrap();
        assert_eq!(advance.active_combatant_id, c[0]);
        assert!(advance.round_incremented);
    }

    #[test]
    fn removing_everyone_ends_the_encounter() {
        let c = ids(1);
        let mut e = start(&[(c[0], 10)]);
        let removal = e
            .remove_combatant(c[0], GameTime::from_seconds(60))
            .unwrap();
        assert!(removal.ended);
        assert_eq!(e.state(), EncounterState::Ended);
        assert_eq!(e.ended_at(), Some(GameTime::from_seconds(60)));
        assert!(matches!(
            e.next_turn(),
            Err(DomainError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn remove_unknown_is_not_found() {
        let c = ids(1);
        let mut e = start(&[(c[0], 10)]);
        assert!(matches!(
            e.remove_combatant(CharacterId::new(), GameTime::default()),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn empty_list_operations_are_state_errors() {
        let mut e = start(&[]);
        assert!(matches!(
            e.next_turn(),
            Err(DomainError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            e.remove_combatant(CharacterId::new(), GameTime::default()),
            Err(DomainError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn set_initiative_tracks_active_combatant() {
        let c = ids(3);
        let mut e = start(&[(c[0], 30), (c[1], 20), (c[2], 10)]);
        e.next_turn().unwrap();
        assert_eq!(active(&e), c[1]);

        e.set_initiative(c[2], 50).unwrap();
        assert_eq!(order(&e), vec![c[2], c[0], c[1]]);
        assert_eq!(active(&e), c[1]);

        e.set_initiative(c[1], 60).unwrap();
        assert_eq!(order(&e), vec![c[1], c[2], c[0]]);
        assert_eq!(active(&e), c[1]);
        assert_eq!(e.turn_index(), 0);
    }

    #[test]
    fn end_is_idempotent_and_final() {
        let c = ids(2);
        let mut e = start(&[(c[0], 10), (c[1], 5)]);
        assert_eq!(
            e.end(
                Some("Goblins routed".into()),
                Some("victory".into()),
                GameTime::from_seconds(18),
            ),
            EncounterEnd::Ended
        );
        assert_eq!(e.end(None, None, GameTime::from_seconds(99)), EncounterEnd::AlreadyEnded);
        assert_eq!(e.summary(), "Goblins routed");
        assert_eq!(e.ended_at(), Some(GameTime::from_seconds(18)));
        assert!(e.current().is_none());
        assert!(e.add_combatant(Combatant::new(CharacterId::new(), 1)).is_err());
        assert!(e.set_initiative(c[0], 3).is_err());
    }
}
