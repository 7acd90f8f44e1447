//! Encounter state machine outcomes

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, EncounterId};

/// Result of `next_turn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAdvance {
    pub encounter_id: EncounterId,
    pub active_combatant_id: CharacterId,
    /// The pointer wrapped past the last combatant
    pub round_incremented: bool,
    pub round: u32,
}

/// Result of `remove_combatant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantRemoval {
    pub encounter_id: EncounterId,
    pub removed: CharacterId,
    /// Combatant whose turn it is after the removal, if any remain
    pub active_combatant_id: Option<CharacterId>,
    pub round_incremented: bool,
    /// The list emptied and the encounter ended
    pub ended: bool,
}

/// Result of `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterEnd {
    Ended,
    /// The encounter had already ended; nothing changed
    AlreadyEnded,
}
