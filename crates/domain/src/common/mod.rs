//! Small pure helpers shared by entities and aggregates.

pub mod string;

pub use string::{normalize_tags, require_name};
