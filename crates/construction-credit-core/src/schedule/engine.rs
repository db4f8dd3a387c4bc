use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::buffer::{ContributionEntry, LiquidityBuffer, ReserveAction};
use super::credit_line::{CreditLedgerEntry, CreditLine};
use super::movements::{aggregate_movements, AggregatedMovements, Movement};
use super::parameters::{CreditTerms, ScheduleParameters};
use crate::error::ScheduleError;
use crate::types::*;
use crate::ScheduleResult;

/// Full scenario: the movement dataset plus the credit terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    #[serde(alias = "movimientos")]
    pub movements: Vec<Movement>,
    #[serde(alias = "credito")]
    pub terms: CreditTerms,
}

/// Aggregate figures over the whole schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub period_count: usize,
    pub first_period: Option<Period>,
    pub last_period: Option<Period>,
    pub total_income: Money,
    pub total_cost: Money,
    pub total_disbursed: Money,
    pub total_interest_generated: Money,
    pub total_interest_paid: Money,
    pub total_capital_repaid: Money,
    pub total_capital_contributed: Money,
    pub peak_balance: Money,
    pub closing_balance: Money,
    pub remaining_capacity: Money,
    pub final_reserve: Money,
    pub repayment_periods: Vec<Period>,
}

/// Credit ledger and contribution schedule, index-aligned by period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub credit_ledger: Vec<CreditLedgerEntry>,
    pub contributions: Vec<ContributionEntry>,
    pub summary: ScheduleSummary,
}

/// Compute the credit ledger and contribution schedule.
///
/// Terms are validated and movements aggregated before any period is
/// processed; on error nothing is returned. The credit line and the buffer
/// advance together, one period at a time, in ascending period order.
pub fn compute_schedule(
    movements: &[Movement],
    terms: &CreditTerms,
) -> ScheduleResult<ScheduleOutput> {
    let params = terms.normalize()?;
    let aggregated = aggregate_movements(movements)?;
    run_periods(&params, &aggregated)
}

fn run_periods(
    params: &ScheduleParameters,
    aggregated: &AggregatedMovements,
) -> ScheduleResult<ScheduleOutput> {
    let mut credit_line = CreditLine::new(params, aggregated);
    let mut buffer = LiquidityBuffer::new();

    let mut credit_ledger = Vec::with_capacity(aggregated.totals.len());
    let mut contributions = Vec::with_capacity(aggregated.totals.len());
    let mut peak_balance = Decimal::ZERO;

    for (period, totals) in aggregated.iter() {
        let credit_row = credit_line.advance(period, totals)?;
        let contribution_row = buffer.absorb(period, credit_row.net_flow)?;

        debug!(
            period,
            disbursement = %credit_row.disbursement,
            balance = %credit_row.balance,
            net_flow = %credit_row.net_flow,
            reserve = %contribution_row.reserve,
            contribution = %contribution_row.capital_contribution,
            "period processed"
        );

        peak_balance = peak_balance.max(credit_line.state().outstanding_balance);
        credit_ledger.push(credit_row);
        contributions.push(contribution_row);
    }

    let summary = summarize(
        &credit_ledger,
        &contributions,
        credit_line.state().remaining_capacity,
        peak_balance,
        buffer.reserve(),
        credit_line.plan().periods().to_vec(),
    )?;

    info!(
        periods = summary.period_count,
        total_disbursed = %summary.total_disbursed,
        total_contributed = %summary.total_capital_contributed,
        closing_balance = %summary.closing_balance,
        "credit schedule computed"
    );

    Ok(ScheduleOutput {
        credit_ledger,
        contributions,
        summary,
    })
}

/// Sum a ledger column, failing on overflow.
fn column_total<T>(rows: &[T], field: &str, f: impl Fn(&T) -> Money) -> ScheduleResult<Money> {
    rows.iter().try_fold(Decimal::ZERO, |acc, row| {
        acc.checked_add(f(row))
            .ok_or_else(|| ScheduleError::InvalidInput {
                field: field.to_string(),
                reason: "decimal overflow in schedule total".to_string(),
            })
    })
}

fn summarize(
    ledger: &[CreditLedgerEntry],
    contributions: &[ContributionEntry],
    remaining_capacity: Money,
    peak_balance: Money,
    final_reserve: Money,
    repayment_periods: Vec<Period>,
) -> ScheduleResult<ScheduleSummary> {
    Ok(ScheduleSummary {
        period_count: ledger.len(),
        first_period: ledger.first().map(|r| r.period),
        last_period: ledger.last().map(|r| r.period),
        total_income: column_total(ledger, "total_income", |r| r.income)?,
        total_cost: column_total(ledger, "total_cost", |r| r.cost)?,
        total_disbursed: column_total(ledger, "total_disbursed", |r| r.disbursement)?,
        total_interest_generated: column_total(ledger, "total_interest_generated", |r| {
            r.interest_generated
        })?,
        total_interest_paid: column_total(ledger, "total_interest_paid", |r| r.interest_paid)?,
        total_capital_repaid: column_total(ledger, "total_capital_repaid", |r| {
            r.capital_repayment
        })?,
        total_capital_contributed: column_total(contributions, "total_capital_contributed", |c| {
            c.capital_contribution
        })?,
        peak_balance,
        closing_balance: ledger.last().map_or(Decimal::ZERO, |r| r.balance),
        remaining_capacity,
        final_reserve,
        repayment_periods,
    })
}

/// Build the schedule wrapped in the standard output envelope, with
/// warnings for scenarios where the credit line cannot behave as expected.
pub fn build_schedule(input: &ScheduleInput) -> ScheduleResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();

    let params = input.terms.normalize()?;
    let aggregated = aggregate_movements(&input.movements)?;
    let output = run_periods(&params, &aggregated)?;

    let warnings = collect_warnings(&params, &aggregated, &output);
    for w in &warnings {
        warn!("{w}");
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Construction credit line with liquidity buffer (deferred monthly interest, final two-period payoff)",
        &serde_json::json!({
            "credit_limit": params.credit_limit.to_string(),
            "monthly_cap_fraction": params.monthly_cap_fraction.to_string(),
            "annual_rate_fraction": params.annual_rate_fraction.to_string(),
            "monthly_rate": params.monthly_rate().to_string(),
            "max_monthly_draw": params.max_monthly_draw().to_string(),
            "window_start": params.window_start,
            "window_end": params.window_end,
            "movement_count": input.movements.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn collect_warnings(
    params: &ScheduleParameters,
    aggregated: &AggregatedMovements,
    output: &ScheduleOutput,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if aggregated.is_empty() {
        warnings.push("No movements supplied; schedule is empty".to_string());
        return warnings;
    }

    match aggregated.income_range() {
        None => warnings.push(
            "No period has positive income; the credit line can never disburse".to_string(),
        ),
        Some((first, last)) => {
            if params.window_end < first || params.window_start > last {
                warnings.push(format!(
                    "Credit window {}..={} does not overlap income periods {first}..={last}; \
                     no disbursement is possible",
                    params.window_start, params.window_end
                ));
            }
        }
    }

    for row in output
        .contributions
        .iter()
        .filter(|c| c.action == ReserveAction::Shortfall)
    {
        warnings.push(format!(
            "Period {}: reserve exhausted, capital contribution of {} required",
            row.period, row.capital_contribution
        ));
    }

    warnings
}
