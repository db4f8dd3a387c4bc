pub mod schedule;
pub mod subphases;
