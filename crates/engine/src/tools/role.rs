//! Caller roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The cooperating callers of the store. A role only ever names a capability set;
/// it carries no data of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Narrator,
    WorldBuilder,
    Bookkeeper,
    Historian,
    Scribe,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Narrator,
        Role::WorldBuilder,
        Role::Bookkeeper,
        Role::Historian,
        Role::Scribe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Narrator => "narrator",
            Role::WorldBuilder => "world_builder",
            Role::Bookkeeper => "bookkeeper",
            Role::Historian => "historian",
            Role::Scribe => "scribe",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts `world_builder` and `world-builder` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == needle)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("world-builder".parse::<Role>(), Ok(Role::WorldBuilder));
        assert_eq!(" Narrator ".parse::<Role>(), Ok(Role::Narrator));
        assert!("dungeon_master".parse::<Role>().is_err());
    }
}
