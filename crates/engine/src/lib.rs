//! Questkeep Engine library.
//!
//! Server-side state store for tabletop campaigns.
//!
//! ## Structure
//!
//! - `use_cases/` - Operations over records, one module per record family
//! - `tools/` - Roles, capabilities and the tool router every call goes through
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod tools;
pub mod use_cases;

pub use app::App;
