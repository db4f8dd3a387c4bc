use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::types::{Money, Period};
use crate::ScheduleResult;

/// Which rule the buffer applied in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveAction {
    /// Positive net flow added to the reserve.
    Surplus,
    /// Deficit fully covered by the reserve.
    Absorbed,
    /// Deficit larger than the reserve; the residual needs a contribution.
    Shortfall,
    /// No reserve available (or zero flow); net flow passed through.
    PassThrough,
}

/// One row of the capital contribution schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionEntry {
    pub period: Period,
    pub capital_contribution: Money,
    pub leveraged_flow: Money,
    /// Reserve balance at the end of the period.
    pub reserve: Money,
    pub action: ReserveAction,
}

/// Cash reserve accumulated from surplus periods and drawn down to cover
/// later deficits before any outside capital is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityBuffer {
    reserve: Money,
}

impl LiquidityBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&self) -> Money {
        self.reserve
    }

    /// Apply one period's net flow and return the contribution row.
    ///
    /// In the shortfall case the residual `reserve - |net_flow|` becomes the
    /// adjusted flow and `net_flow - residual` is added back to the reserve,
    /// which empties it exactly.
    pub fn absorb(
        &mut self,
        period: Period,
        net_flow: Money,
    ) -> ScheduleResult<ContributionEntry> {
        if net_flow > Decimal::ZERO {
            self.reserve = self
                .reserve
                .checked_add(net_flow)
                .ok_or_else(|| ScheduleError::overflow("reserve", period))?;
        }

        let (adjusted_flow, action) = if self.reserve > Decimal::ZERO && net_flow < Decimal::ZERO
        {
            let shortfall_gap = self.reserve - net_flow.abs();
            if shortfall_gap > Decimal::ZERO {
                self.reserve = shortfall_gap;
                (Decimal::ZERO, ReserveAction::Absorbed)
            } else {
                let excess = net_flow - shortfall_gap;
                self.reserve += excess;
                (shortfall_gap, ReserveAction::Shortfall)
            }
        } else if net_flow > Decimal::ZERO {
            (net_flow, ReserveAction::Surplus)
        } else {
            (net_flow, ReserveAction::PassThrough)
        };

        let capital_contribution = if adjusted_flow < Decimal::ZERO {
            -adjusted_flow
        } else {
            Decimal::ZERO
        };
        let leveraged_flow = adjusted_flow + capital_contribution;

        Ok(ContributionEntry {
            period,
            capital_contribution,
            leveraged_flow,
            reserve: self.reserve,
            action,
        })
    }
}
