//! Persistence of computed schedules per project.
//!
//! Saving is an idempotent upsert: credit terms are replaced, movements are
//! upserted by (subphase, period, concept), and ledger rows are upserted by
//! period with rows for periods missing from the latest run removed.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::presentation::quantize;
use crate::schedule::{summarize_subphases, Concept, CreditTerms, Movement, ScheduleOutput};
use crate::types::{Money, Period};
use crate::ScheduleResult;

/// Credit terms as stored, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTerms {
    pub credit_limit: Money,
    pub monthly_cap: Money,
    pub window_start: Period,
    pub window_end: Period,
    pub annual_rate: Money,
}

impl From<&CreditTerms> for StoredTerms {
    fn from(terms: &CreditTerms) -> Self {
        StoredTerms {
            credit_limit: quantize(terms.credit_limit),
            monthly_cap: quantize(terms.monthly_cap),
            window_start: terms.window_start,
            window_end: terms.window_end,
            annual_rate: quantize(terms.annual_rate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMovement {
    pub period: Period,
    pub concept: Concept,
    pub value: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubphaseRecord {
    pub sales_start: Option<Period>,
    pub sales_end: Option<Period>,
    pub construction_start: Option<Period>,
    pub construction_end: Option<Period>,
    pub movements: Vec<StoredMovement>,
}

impl SubphaseRecord {
    fn upsert_movement(&mut self, period: Period, concept: Concept, value: Money) {
        match self
            .movements
            .iter_mut()
            .find(|m| m.period == period && m.concept == concept)
        {
            Some(existing) => existing.value = value,
            None => {
                self.movements.push(StoredMovement {
                    period,
                    concept,
                    value,
                });
                self.movements.sort_by_key(|m| (m.period, m.concept));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisbursementRecord {
    pub amount: Money,
    pub balance_after: Money,
    pub interest_generated: Money,
    pub interest_paid: Money,
    pub capital_repayment: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub amount: Money,
    pub leveraged_flow: Money,
}

/// Everything stored for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub description: String,
    pub terms: StoredTerms,
    pub subphases: BTreeMap<String, SubphaseRecord>,
    pub disbursements: BTreeMap<Period, DisbursementRecord>,
    pub contributions: BTreeMap<Period, ContributionRecord>,
    pub updated_at: DateTime<Utc>,
}

/// What a caller hands to [`ScheduleStore::save_schedule`].
#[derive(Debug, Clone, Copy)]
pub struct SaveRequest<'a> {
    pub project: &'a str,
    /// Where the movement dataset came from (URL, file path).
    pub source: &'a str,
    pub terms: &'a CreditTerms,
    pub movements: &'a [Movement],
    pub output: &'a ScheduleOutput,
}

/// Storage collaborator for computed schedules.
pub trait ScheduleStore {
    fn load_project(&self, name: &str) -> ScheduleResult<Option<ProjectRecord>>;

    /// Replace the stored record for `record.name`.
    fn put_project(&mut self, record: ProjectRecord) -> ScheduleResult<()>;

    fn project_names(&self) -> ScheduleResult<Vec<String>>;

    /// Upsert a computed schedule and return the record as stored.
    fn save_schedule(&mut self, request: SaveRequest<'_>) -> ScheduleResult<ProjectRecord> {
        let existing = self.load_project(request.project)?;
        let record = merge_schedule(existing, &request, Utc::now())?;
        self.put_project(record.clone())?;
        Ok(record)
    }
}

/// Merge a computed schedule into the existing record (if any).
pub fn merge_schedule(
    existing: Option<ProjectRecord>,
    request: &SaveRequest<'_>,
    now: DateTime<Utc>,
) -> ScheduleResult<ProjectRecord> {
    let windows = summarize_subphases(request.movements)?;

    let mut record = match existing {
        Some(mut record) => {
            record.description = format!("Scenario updated from {}", request.source);
            record
        }
        None => ProjectRecord {
            name: request.project.to_string(),
            description: format!("Scenario imported from {}", request.source),
            terms: StoredTerms::from(request.terms),
            subphases: BTreeMap::new(),
            disbursements: BTreeMap::new(),
            contributions: BTreeMap::new(),
            updated_at: now,
        },
    };
    record.terms = StoredTerms::from(request.terms);
    record.updated_at = now;

    for movement in request.movements {
        let concept = movement.parsed_concept()?;
        record
            .subphases
            .entry(movement.subphase_name().to_string())
            .or_default()
            .upsert_movement(movement.period, concept, quantize(movement.value));
    }
    for window in windows {
        let subphase = record.subphases.entry(window.name).or_default();
        subphase.sales_start = window.sales_start;
        subphase.sales_end = window.sales_end;
        subphase.construction_start = window.construction_start;
        subphase.construction_end = window.construction_end;
    }

    record.disbursements = request
        .output
        .credit_ledger
        .iter()
        .map(|row| {
            (
                row.period,
                DisbursementRecord {
                    amount: quantize(row.disbursement),
                    balance_after: quantize(row.balance),
                    interest_generated: quantize(row.interest_generated),
                    interest_paid: quantize(row.interest_paid),
                    capital_repayment: quantize(row.capital_repayment),
                },
            )
        })
        .collect();
    record.contributions = request
        .output
        .contributions
        .iter()
        .map(|row| {
            (
                row.period,
                ContributionRecord {
                    amount: quantize(row.capital_contribution),
                    leveraged_flow: quantize(row.leveraged_flow),
                },
            )
        })
        .collect();

    Ok(record)
}
