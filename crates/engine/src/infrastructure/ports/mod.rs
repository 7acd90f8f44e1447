//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Database access (one trait per record kind, all served by the SQLite store)
//! - Clock/Random (for testing)

mod error;
mod repos;
mod testing;
pub mod types;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::*;

// =============================================================================
// Errors and Data Types
// =============================================================================
pub use error::{found, RepoError};
pub use types::{KindCount, StoredRecord};

// =============================================================================
// Testability Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};
