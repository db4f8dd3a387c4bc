use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::types::{Money, Period, Rate};
use crate::ScheduleResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Credit line terms as entered by the user.
///
/// `monthly_cap` and `annual_rate` may be given either as a percentage
/// (`8`) or as a fraction (`0.08`); see [`normalize_percentage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTerms {
    #[serde(alias = "cupo_credito")]
    pub credit_limit: Money,
    #[serde(alias = "porcentaje_maximo_mensual")]
    pub monthly_cap: Decimal,
    #[serde(alias = "periodo_inicial_credito")]
    pub window_start: Period,
    #[serde(alias = "periodo_final_credito")]
    pub window_end: Period,
    #[serde(alias = "tasa_interes_anual")]
    pub annual_rate: Decimal,
}

impl Default for CreditTerms {
    fn default() -> Self {
        CreditTerms {
            credit_limit: dec!(7000),
            monthly_cap: dec!(8),
            window_start: 7,
            window_end: 30,
            annual_rate: dec!(12),
        }
    }
}

/// Validated, normalised schedule parameters. Every rate here is a fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    pub credit_limit: Money,
    pub monthly_cap_fraction: Rate,
    pub annual_rate_fraction: Rate,
    pub window_start: Period,
    pub window_end: Period,
}

/// Percentage-or-fraction convention: a value strictly above 1 is a
/// percentage and is divided by 100, anything else is already a fraction.
/// Idempotent for inputs up to 100: `8` and `0.08` both yield `0.08`.
pub fn normalize_percentage(value: Decimal) -> Rate {
    if value > Decimal::ONE {
        value / dec!(100)
    } else {
        value
    }
}

impl CreditTerms {
    /// Validate the raw terms and convert them to [`ScheduleParameters`].
    ///
    /// Checks run in a fixed order: window, limit, cap, rate.
    pub fn normalize(&self) -> ScheduleResult<ScheduleParameters> {
        if self.window_start > self.window_end {
            return Err(ScheduleError::InvalidWindow {
                start: self.window_start,
                end: self.window_end,
            });
        }
        if self.credit_limit <= Decimal::ZERO {
            return Err(ScheduleError::InvalidLimit(self.credit_limit));
        }
        if self.monthly_cap <= Decimal::ZERO {
            return Err(ScheduleError::InvalidCap(self.monthly_cap));
        }
        if self.annual_rate < Decimal::ZERO {
            return Err(ScheduleError::InvalidRate(self.annual_rate));
        }

        Ok(ScheduleParameters {
            credit_limit: self.credit_limit,
            monthly_cap_fraction: normalize_percentage(self.monthly_cap),
            annual_rate_fraction: normalize_percentage(self.annual_rate),
            window_start: self.window_start,
            window_end: self.window_end,
        })
    }
}

impl ScheduleParameters {
    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate_fraction / MONTHS_PER_YEAR
    }

    /// Largest amount that may be drawn in a single period, saturating at
    /// `Decimal::MAX`.
    pub fn max_monthly_draw(&self) -> Money {
        self.credit_limit.saturating_mul(self.monthly_cap_fraction)
    }

    pub fn in_window(&self, period: Period) -> bool {
        (self.window_start..=self.window_end).contains(&period)
    }
}
