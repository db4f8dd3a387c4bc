//! Construction credit schedule: movement aggregation, term normalisation,
//! the credit line simulator and the liquidity buffer, driven in lockstep
//! by [`engine::compute_schedule`].

pub mod buffer;
pub mod credit_line;
pub mod engine;
pub mod movements;
pub mod parameters;

pub use buffer::{ContributionEntry, LiquidityBuffer, ReserveAction};
pub use credit_line::{CreditLedgerEntry, CreditLine, CreditState, RepaymentPlan};
pub use engine::{build_schedule, compute_schedule, ScheduleInput, ScheduleOutput, ScheduleSummary};
pub use movements::{
    aggregate_movements, summarize_subphases, AggregatedMovements, Concept, Movement,
    PeriodTotals, SubphaseWindow,
};
pub use parameters::{normalize_percentage, CreditTerms, ScheduleParameters};
