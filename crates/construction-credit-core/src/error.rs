use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Invalid credit window: start period {start} is after end period {end}")]
    InvalidWindow { start: u32, end: u32 },

    #[error("Invalid credit limit: {0} (must be greater than zero)")]
    InvalidLimit(Decimal),

    #[error("Invalid monthly draw cap: {0} (must be greater than zero)")]
    InvalidCap(Decimal),

    #[error("Invalid annual interest rate: {0} (must not be negative)")]
    InvalidRate(Decimal),

    #[error("Unknown concept '{concept}' in period {period}")]
    UnknownConcept { period: u32, concept: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ScheduleError {
    fn from(e: serde_json::Error) -> Self {
        ScheduleError::SerializationError(e.to_string())
    }
}

impl ScheduleError {
    /// A decimal operation on `field` left the representable range.
    pub fn overflow(field: &str, period: u32) -> Self {
        ScheduleError::InvalidInput {
            field: field.to_string(),
            reason: format!("decimal overflow in period {period}"),
        }
    }

    /// True for errors caused by the input itself: bad terms, unknown
    /// concepts, or amounts outside the decimal range.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScheduleError::InvalidWindow { .. }
                | ScheduleError::InvalidLimit(_)
                | ScheduleError::InvalidCap(_)
                | ScheduleError::InvalidRate(_)
                | ScheduleError::UnknownConcept { .. }
                | ScheduleError::InvalidInput { .. }
        )
    }
}
