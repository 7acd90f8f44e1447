//! Environment-driven engine configuration.

use std::path::PathBuf;

/// Settings read from the process environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file for the record store
    pub db_path: String,
    /// TOML file with the role → operation table
    pub capabilities_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: "questkeep.db".into(),
            capabilities_path: PathBuf::from("capabilities.toml"),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port = match lookup("QUESTKEEP_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Invalid QUESTKEEP_PORT, using default");
                defaults.port
            }),
            None => defaults.port,
        };

        Self {
            host: lookup("QUESTKEEP_HOST").unwrap_or(defaults.host),
            port,
            db_path: lookup("QUESTKEEP_DB").unwrap_or(defaults.db_path),
            capabilities_path: lookup("QUESTKEEP_CAPABILITIES")
                .map(PathBuf::from)
                .unwrap_or(defaults.capabilities_path),
        }
    }
}
