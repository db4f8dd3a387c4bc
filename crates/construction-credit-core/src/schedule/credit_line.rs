use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::movements::{AggregatedMovements, PeriodTotals};
use super::parameters::ScheduleParameters;
use crate::error::ScheduleError;
use crate::types::{Money, Period, Rate};
use crate::ScheduleResult;

/// Number of final income periods over which the balance is paid off.
pub const FINAL_REPAYMENT_PERIODS: usize = 2;

/// Mutable credit line state threaded through the period loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditState {
    pub outstanding_balance: Money,
    pub remaining_capacity: Money,
    pub interest_accrued_unpaid: Money,
}

impl CreditState {
    pub fn new(credit_limit: Money) -> Self {
        CreditState {
            outstanding_balance: Decimal::ZERO,
            remaining_capacity: credit_limit,
            interest_accrued_unpaid: Decimal::ZERO,
        }
    }
}

/// The last income periods and how many repayment slots are still open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentPlan {
    periods: Vec<Period>,
    remaining_slots: usize,
}

impl RepaymentPlan {
    /// Build the plan from the ascending list of periods with positive income.
    pub fn from_income_periods(income_periods: &[Period]) -> Self {
        let skip = income_periods.len().saturating_sub(FINAL_REPAYMENT_PERIODS);
        let periods: Vec<Period> = income_periods[skip..].to_vec();
        let remaining_slots = periods.len();
        RepaymentPlan {
            periods,
            remaining_slots,
        }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn remaining_slots(&self) -> usize {
        self.remaining_slots
    }

    /// Consume a slot if `period` is a repayment period and slots remain.
    /// Returns the divisor to apply to the current balance, i.e. the slot
    /// count *before* this one was consumed.
    fn claim_slot(&mut self, period: Period) -> Option<Decimal> {
        if self.remaining_slots == 0 || !self.periods.contains(&period) {
            return None;
        }
        let divisor = Decimal::from(self.remaining_slots as u64);
        self.remaining_slots -= 1;
        Some(divisor)
    }
}

/// One row of the credit ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLedgerEntry {
    pub period: Period,
    pub income: Money,
    pub cost: Money,
    pub operating_flow: Money,
    pub disbursement: Money,
    /// Outstanding balance after disbursement and repayment.
    pub balance: Money,
    pub interest_generated: Money,
    pub interest_paid: Money,
    pub capital_repayment: Money,
    pub net_flow: Money,
}

/// Construction credit line simulator.
///
/// Interest generated on the post-disbursement balance of one period is paid
/// in the next processed period. The balance is repaid across the final
/// income periods by dividing the *current* balance by the number of slots
/// still open, so the divisor shrinks as the balance shrinks.
#[derive(Debug, Clone)]
pub struct CreditLine {
    state: CreditState,
    plan: RepaymentPlan,
    income_range: Option<(Period, Period)>,
    window: (Period, Period),
    max_monthly_draw: Money,
    monthly_rate: Rate,
}

impl CreditLine {
    pub fn new(params: &ScheduleParameters, movements: &AggregatedMovements) -> Self {
        CreditLine {
            state: CreditState::new(params.credit_limit),
            plan: RepaymentPlan::from_income_periods(&movements.income_periods()),
            income_range: movements.income_range(),
            window: (params.window_start, params.window_end),
            max_monthly_draw: params.max_monthly_draw(),
            monthly_rate: params.monthly_rate(),
        }
    }

    pub fn state(&self) -> &CreditState {
        &self.state
    }

    pub fn plan(&self) -> &RepaymentPlan {
        &self.plan
    }

    /// Whether the credit line may fund a period at all, regardless of need.
    pub fn period_is_fundable(&self, period: Period) -> bool {
        let (start, end) = self.window;
        let in_window = start <= period && period <= end;
        let in_income_range = self
            .income_range
            .is_some_and(|(first, last)| first <= period && period <= last);
        in_window && in_income_range
    }

    /// Process one period. Must be called with strictly ascending periods.
    ///
    /// Fails only if an intermediate amount leaves the decimal range.
    pub fn advance(
        &mut self,
        period: Period,
        totals: &PeriodTotals,
    ) -> ScheduleResult<CreditLedgerEntry> {
        let overflow = |field: &str| ScheduleError::overflow(field, period);

        let operating_flow = totals
            .operating_flow()
            .ok_or_else(|| overflow("operating_flow"))?;

        let interest_paid = self.state.interest_accrued_unpaid;
        self.state.interest_accrued_unpaid = Decimal::ZERO;

        let need = if operating_flow < Decimal::ZERO {
            -operating_flow
        } else {
            Decimal::ZERO
        };

        let mut disbursement = Decimal::ZERO;
        if self.period_is_fundable(period)
            && need > Decimal::ZERO
            && self.state.remaining_capacity > Decimal::ZERO
        {
            disbursement = need
                .min(self.max_monthly_draw)
                .min(self.state.remaining_capacity);
            self.state.outstanding_balance = self
                .state
                .outstanding_balance
                .checked_add(disbursement)
                .ok_or_else(|| overflow("balance"))?;
            self.state.remaining_capacity -= disbursement;
        }

        let interest_generated = self
            .state
            .outstanding_balance
            .checked_mul(self.monthly_rate)
            .ok_or_else(|| overflow("interest_generated"))?;
        self.state.interest_accrued_unpaid = interest_generated;

        let mut capital_repayment = Decimal::ZERO;
        if let Some(slots) = self.plan.claim_slot(period) {
            if self.state.outstanding_balance > Decimal::ZERO {
                capital_repayment = self.state.outstanding_balance / slots;
                self.state.outstanding_balance -= capital_repayment;
            }
        }

        let net_flow = operating_flow
            .checked_add(disbursement)
            .and_then(|v| v.checked_sub(interest_paid))
            .and_then(|v| v.checked_sub(capital_repayment))
            .ok_or_else(|| overflow("net_flow"))?;

        Ok(CreditLedgerEntry {
            period,
            income: totals.income,
            cost: totals.cost,
            operating_flow,
            disbursement,
            balance: self.state.outstanding_balance,
            interest_generated,
            interest_paid,
            capital_repayment,
            net_flow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::movements::{aggregate_movements, Movement};
    use crate::schedule::parameters::CreditTerms;
    use rust_decimal_macros::dec;

    fn params() -> ScheduleParameters {
        CreditTerms {
            credit_limit: dec!(7000),
            monthly_cap: dec!(8),
            window_start: 1,
            window_end: 30,
            annual_rate: dec!(12),
        }
        .normalize()
        .unwrap()
    }

    fn totals(income: Money, cost: Money) -> PeriodTotals {
        PeriodTotals { income, cost }
    }

    #[test]
    fn test_repayment_plan_takes_last_two() {
        let plan = RepaymentPlan::from_income_periods(&[2, 4, 7, 9]);
        assert_eq!(plan.periods(), &[7, 9]);
        assert_eq!(plan.remaining_slots(), 2);
    }

    #[test]
    fn test_repayment_plan_with_single_income_period() {
        let plan = RepaymentPlan::from_income_periods(&[5]);
        assert_eq!(plan.periods(), &[5]);
        assert_eq!(plan.remaining_slots(), 1);
    }

    #[test]
    fn test_repayment_plan_empty() {
        let mut plan = RepaymentPlan::from_income_periods(&[]);
        assert_eq!(plan.remaining_slots(), 0);
        assert_eq!(plan.claim_slot(1), None);
    }

    #[test]
    fn test_claim_slot_returns_shrinking_divisor() {
        let mut plan = RepaymentPlan::from_income_periods(&[3, 8]);
        assert_eq!(plan.claim_slot(1), None);
        assert_eq!(plan.claim_slot(3), Some(dec!(2)));
        assert_eq!(plan.claim_slot(8), Some(dec!(1)));
        assert_eq!(plan.remaining_slots(), 0);
    }

    #[test]
    fn test_disbursement_covers_need_within_cap() {
        let movements = aggregate_movements(&[
            Movement::cost(1, dec!(500)),
            Movement::income(1, dec!(0.01)),
            Movement::income(2, dec!(10)),
            Movement::income(3, dec!(10)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&params(), &movements);
        let row = line.advance(1, &totals(dec!(0.01), dec!(500))).unwrap();
        assert_eq!(row.disbursement, dec!(499.99));
        assert_eq!(row.net_flow, Decimal::ZERO);
        assert_eq!(line.state().remaining_capacity, dec!(6500.01));
    }

    #[test]
    fn test_disbursement_capped_at_monthly_maximum() {
        let movements = aggregate_movements(&[
            Movement::income(1, dec!(1)),
            Movement::income(5, dec!(1)),
            Movement::income(7, dec!(1)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&params(), &movements);
        let row = line.advance(1, &totals(dec!(1), dec!(2001))).unwrap();
        // 7000 * 8% = 560
        assert_eq!(row.disbursement, dec!(560));
        assert_eq!(row.net_flow, dec!(-1440));
    }

    #[test]
    fn test_interest_is_paid_the_following_period() {
        let movements = aggregate_movements(&[
            Movement::income(1, dec!(1)),
            Movement::income(5, dec!(1)),
            Movement::income(6, dec!(1)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&params(), &movements);
        let first = line.advance(1, &totals(dec!(1), dec!(301))).unwrap();
        assert_eq!(first.interest_paid, Decimal::ZERO);
        assert_eq!(first.interest_generated, dec!(3));

        let second = line.advance(2, &totals(Decimal::ZERO, Decimal::ZERO)).unwrap();
        assert_eq!(second.interest_paid, dec!(3));
        assert_eq!(second.net_flow, dec!(-3));
    }

    #[test]
    fn test_no_disbursement_outside_income_range() {
        let movements =
            aggregate_movements(&[Movement::cost(1, dec!(100)), Movement::income(4, dec!(50))])
                .unwrap();
        let mut line = CreditLine::new(&params(), &movements);
        let row = line.advance(1, &totals(Decimal::ZERO, dec!(100))).unwrap();
        assert_eq!(row.disbursement, Decimal::ZERO);
        assert!(!line.period_is_fundable(1));
        assert!(line.period_is_fundable(4));
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let p = CreditTerms {
            credit_limit: dec!(1000),
            monthly_cap: dec!(60),
            window_start: 1,
            window_end: 30,
            annual_rate: Decimal::ZERO,
        }
        .normalize()
        .unwrap();
        let movements = aggregate_movements(&[
            Movement::income(1, dec!(1)),
            Movement::income(8, dec!(1)),
            Movement::income(9, dec!(1)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&p, &movements);
        let draws: Vec<Money> = (1..=3)
            .map(|p| line.advance(p, &totals(dec!(0), dec!(900))).unwrap().disbursement)
            .collect();
        assert_eq!(draws, vec![dec!(600), dec!(400), dec!(0)]);
        assert_eq!(line.state().remaining_capacity, Decimal::ZERO);
    }

    #[test]
    fn test_zero_balance_still_consumes_first_repayment_slot() {
        let movements = aggregate_movements(&[
            Movement::income(2, dec!(10)),
            Movement::cost(3, dec!(300)),
            Movement::income(4, dec!(1000)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&params(), &movements);

        let row = line.advance(2, &totals(dec!(10), Decimal::ZERO)).unwrap();
        assert_eq!(row.capital_repayment, Decimal::ZERO);
        assert_eq!(row.balance, Decimal::ZERO);
        assert_eq!(line.plan().remaining_slots(), 1);
    }

    #[test]
    fn test_draw_between_final_periods_is_repaid_in_full() {
        let movements = aggregate_movements(&[
            Movement::income(2, dec!(10)),
            Movement::cost(3, dec!(300)),
            Movement::income(4, dec!(1000)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&params(), &movements);

        line.advance(2, &totals(dec!(10), Decimal::ZERO)).unwrap();
        let draw = line.advance(3, &totals(Decimal::ZERO, dec!(300))).unwrap();
        assert_eq!(draw.disbursement, dec!(300));
        assert_eq!(draw.capital_repayment, Decimal::ZERO);

        // last slot: divisor 1, whole balance repaid
        let last = line.advance(4, &totals(dec!(1000), Decimal::ZERO)).unwrap();
        assert_eq!(last.interest_paid, dec!(3));
        assert_eq!(last.capital_repayment, dec!(300));
        assert_eq!(last.balance, Decimal::ZERO);
        assert_eq!(last.net_flow, dec!(697));
        assert_eq!(line.plan().remaining_slots(), 0);
    }

    #[test]
    fn test_interest_overflow_is_an_error() {
        let p = CreditTerms {
            credit_limit: Decimal::MAX,
            monthly_cap: dec!(100),
            window_start: 1,
            window_end: 30,
            annual_rate: dec!(2400),
        }
        .normalize()
        .unwrap();
        let movements = aggregate_movements(&[
            Movement::income(1, dec!(1)),
            Movement::income(2, dec!(1)),
            Movement::income(3, dec!(1)),
        ])
        .unwrap();
        let mut line = CreditLine::new(&p, &movements);
        let err = line
            .advance(1, &totals(Decimal::ZERO, Decimal::MAX))
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidInput { ref field, .. } if field == "interest_generated"
        ));
    }
}
