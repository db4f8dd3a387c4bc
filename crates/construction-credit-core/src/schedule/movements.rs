use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ScheduleError;
use crate::types::{Money, Period};
use crate::ScheduleResult;

/// Subphase name used for movements that carry no subphase tag.
pub const UNASSIGNED_SUBPHASE: &str = "unassigned";

/// Cash movement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    Income,
    Cost,
}

impl Concept {
    /// Accepts the English tags and the dataset's `ingresos` / `costos`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "income" | "ingresos" => Some(Concept::Income),
            "cost" | "costos" => Some(Concept::Cost),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Concept::Income => "income",
            Concept::Cost => "cost",
        }
    }
}

/// A raw movement record as delivered by the data source.
///
/// `concept` stays a string until aggregation so that an unknown tag is
/// reported as [`ScheduleError::UnknownConcept`] rather than a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(alias = "periodo")]
    pub period: Period,
    #[serde(alias = "concepto")]
    pub concept: String,
    #[serde(alias = "valor")]
    pub value: Money,
    #[serde(default, alias = "subetapa", skip_serializing_if = "Option::is_none")]
    pub subphase: Option<String>,
}

impl Movement {
    pub fn new(period: Period, concept: Concept, value: Money) -> Self {
        Movement {
            period,
            concept: concept.as_str().to_string(),
            value,
            subphase: None,
        }
    }

    pub fn income(period: Period, value: Money) -> Self {
        Self::new(period, Concept::Income, value)
    }

    pub fn cost(period: Period, value: Money) -> Self {
        Self::new(period, Concept::Cost, value)
    }

    pub fn with_subphase(mut self, name: impl Into<String>) -> Self {
        self.subphase = Some(name.into());
        self
    }

    pub fn parsed_concept(&self) -> ScheduleResult<Concept> {
        Concept::parse(&self.concept).ok_or_else(|| ScheduleError::UnknownConcept {
            period: self.period,
            concept: self.concept.clone(),
        })
    }

    pub fn subphase_name(&self) -> &str {
        self.subphase.as_deref().unwrap_or(UNASSIGNED_SUBPHASE)
    }
}

/// Accumulated income and cost for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub income: Money,
    pub cost: Money,
}

impl PeriodTotals {
    /// `income - cost`, or `None` when the difference overflows.
    pub fn operating_flow(&self) -> Option<Money> {
        self.income.checked_sub(self.cost)
    }
}

/// Movements grouped per period. Only periods present in the input exist;
/// gaps in the sequence are kept as gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMovements {
    pub totals: BTreeMap<Period, PeriodTotals>,
}

impl AggregatedMovements {
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Distinct periods in ascending order.
    pub fn periods(&self) -> Vec<Period> {
        self.totals.keys().copied().collect()
    }

    /// Periods whose accumulated income is strictly positive, ascending.
    pub fn income_periods(&self) -> Vec<Period> {
        self.totals
            .iter()
            .filter(|(_, t)| t.income > Decimal::ZERO)
            .map(|(p, _)| *p)
            .collect()
    }

    /// `[first_income_period, last_income_period]`, if any period has income.
    pub fn income_range(&self) -> Option<(Period, Period)> {
        let incomes = self.income_periods();
        match (incomes.first(), incomes.last()) {
            (Some(first), Some(last)) => Some((*first, *last)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Period, &PeriodTotals)> {
        self.totals.iter().map(|(p, t)| (*p, t))
    }
}

/// Group movements into per-period totals. Repeated (period, concept) pairs
/// are summed.
pub fn aggregate_movements(movements: &[Movement]) -> ScheduleResult<AggregatedMovements> {
    let mut totals: BTreeMap<Period, PeriodTotals> = BTreeMap::new();

    for movement in movements {
        let concept = movement.parsed_concept()?;
        let entry = totals.entry(movement.period).or_default();
        let slot = match concept {
            Concept::Income => &mut entry.income,
            Concept::Cost => &mut entry.cost,
        };
        *slot = slot
            .checked_add(movement.value)
            .ok_or_else(|| ScheduleError::overflow("value", movement.period))?;
    }

    Ok(AggregatedMovements { totals })
}

/// Sales and construction windows observed for one subphase (tower, stage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubphaseWindow {
    pub name: String,
    pub sales_start: Option<Period>,
    pub sales_end: Option<Period>,
    pub construction_start: Option<Period>,
    pub construction_end: Option<Period>,
}

/// First and last income period and first and last cost period per
/// subphase, sorted by subphase name.
pub fn summarize_subphases(movements: &[Movement]) -> ScheduleResult<Vec<SubphaseWindow>> {
    let mut windows: BTreeMap<&str, SubphaseWindow> = BTreeMap::new();

    for movement in movements {
        let concept = movement.parsed_concept()?;
        let name = movement.subphase_name();
        let window = windows.entry(name).or_insert_with(|| SubphaseWindow {
            name: name.to_string(),
            sales_start: None,
            sales_end: None,
            construction_start: None,
            construction_end: None,
        });
        let (start, end) = match concept {
            Concept::Income => (&mut window.sales_start, &mut window.sales_end),
            Concept::Cost => (&mut window.construction_start, &mut window.construction_end),
        };
        widen(start, end, movement.period);
    }

    Ok(windows.into_values().collect())
}

fn widen(start: &mut Option<Period>, end: &mut Option<Period>, period: Period) {
    *start = Some(start.map_or(period, |s| s.min(period)));
    *end = Some(end.map_or(period, |e| e.max(period)));
}
