use serde::{Deserialize, Serialize};
use crate::person::PersonRef;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    #[serde(rename = "_key")]
    pub key: String, // Unique within the parent movie
    pub person: PersonRef,
    pub rating: f64, // 0-10, half-point steps
}

impl Rating {
    pub fn person_id(&self) -> &str {
        self.person.id()
    }

    /// Round to the nearest half point, clamped to the 0-10 scale.
    /// Returns None for values that are not finite.
    pub fn normalize_value(value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let rounded = (value * 2.0).round() / 2.0;
        Some(rounded.clamp(MIN_RATING, MAX_RATING))
    }

    pub fn is_valid_value(value: f64) -> bool {
        value.is_finite() && (MIN_RATING..=MAX_RATING).contains(&value)
    }
}
