pub mod error;
pub mod presentation;
pub mod schedule;
pub mod types;

#[cfg(feature = "store")]
pub mod store;

pub use error::ScheduleError;
pub use types::*;

/// Standard result type for all schedule operations
pub type ScheduleResult<T> = Result<T, ScheduleError>;
