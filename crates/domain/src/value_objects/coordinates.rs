//! Planar map coordinates.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A point on a world's map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    /// Create a point, rejecting NaN and infinite components.
    pub fn new(x: f64, y: f64) -> Result<Self, DomainError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(DomainError::validation("coordinates must be finite numbers"));
        }
        Ok(Self { x, y })
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
