use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 0;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: u8, // Always within MIN_RATING..=MAX_RATING
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    /// Convert a raw source value into a stored rating.
    ///
    /// The value must be finite and within `[0, 5]`; in-range fractions are
    /// truncated toward zero (`3.5` becomes `3`). Out-of-range values are
    /// rejected rather than clamped.
    pub fn from_source_value(value: f64) -> Option<u8> {
        if !value.is_finite() || value < MIN_RATING as f64 || value > MAX_RATING as f64 {
            return None;
        }
        Some(value.trunc() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_value_truncates() {
        assert_eq!(Rating::from_source_value(4.0), Some(4));
        assert_eq!(Rating::from_source_value(3.5), Some(3));
        assert_eq!(Rating::from_source_value(0.5), Some(0));
        assert_eq!(Rating::from_source_value(5.0), Some(5));
    }

    #[test]
    fn test_from_source_value_rejects_out_of_range() {
        assert_eq!(Rating::from_source_value(5.5), None);
        assert_eq!(Rating::from_source_value(-0.5), None);
        assert_eq!(Rating::from_source_value(f64::NAN), None);
        assert_eq!(Rating::from_source_value(f64::INFINITY), None);
    }
}
