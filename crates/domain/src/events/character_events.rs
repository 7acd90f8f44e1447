//! Character aggregate mutation outcomes

use serde::{Deserialize, Serialize};

use crate::ids::CharacterId;

/// Health after a `deal_damage` or `heal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsChange {
    pub character_id: CharacterId,
    pub hp_before: i64,
    pub hp: i64,
    pub max_hp: Option<i64>,
    pub unconscious: bool,
    /// Who or what dealt the damage, as the caller described it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_type: Option<String>,
}

impl VitalsChange {
    /// Whether this change dropped the character to 0 HP.
    pub fn knocked_out(&self) -> bool {
        self.hp_before > 0 && self.hp == 0
    }

    /// Attach the caller's description of the damage. Blank values are dropped.
    pub fn caused_by(mut self, source: Option<String>, damage_type: Option<String>) -> Self {
        let keep = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.source = keep(source);
        self.damage_type = keep(damage_type);
        self
    }
}

/// Which shared fields an update touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CharacterUpdate {
    pub changed: Vec<&'static str>,
}
