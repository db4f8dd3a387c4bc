//! Display rows for the schedule. Rounding happens here only; the schedule
//! itself keeps full precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::schedule::{ContributionEntry, CreditLedgerEntry, ScheduleOutput};
use crate::types::{Money, Period};

/// Fractional digits shown for every amount.
pub const DISPLAY_DECIMALS: u32 = 2;

/// Round half-up (away from zero on ties) to [`DISPLAY_DECIMALS`].
pub fn quantize(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Credit and contribution figures for one period, merged and rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub period: Period,
    pub income: Money,
    pub cost: Money,
    pub operating_flow: Money,
    pub disbursement: Money,
    pub balance: Money,
    pub interest_generated: Money,
    pub interest_paid: Money,
    pub capital_repayment: Money,
    pub net_flow: Money,
    pub capital_contribution: Money,
    pub leveraged_flow: Money,
    pub reserve: Money,
}

impl ScheduleRow {
    pub fn from_entries(credit: &CreditLedgerEntry, contribution: &ContributionEntry) -> Self {
        ScheduleRow {
            period: credit.period,
            income: quantize(credit.income),
            cost: quantize(credit.cost),
            operating_flow: quantize(credit.operating_flow),
            disbursement: quantize(credit.disbursement),
            balance: quantize(credit.balance),
            interest_generated: quantize(credit.interest_generated),
            interest_paid: quantize(credit.interest_paid),
            capital_repayment: quantize(credit.capital_repayment),
            net_flow: quantize(credit.net_flow),
            capital_contribution: quantize(contribution.capital_contribution),
            leveraged_flow: quantize(contribution.leveraged_flow),
            reserve: quantize(contribution.reserve),
        }
    }
}

/// One rounded row per period, zipping the credit ledger with the
/// contribution schedule.
pub fn schedule_rows(output: &ScheduleOutput) -> Vec<ScheduleRow> {
    output
        .credit_ledger
        .iter()
        .zip(output.contributions.iter())
        .map(|(credit, contribution)| ScheduleRow::from_entries(credit, contribution))
        .collect()
}
