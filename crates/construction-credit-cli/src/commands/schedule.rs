use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use construction_credit_core::presentation::schedule_rows;
use construction_credit_core::schedule::{self, CreditTerms, Movement, ScheduleInput};
use construction_credit_core::store::{JsonFileStore, SaveRequest, ScheduleStore};

use crate::input;

/// Arguments for the credit and contribution schedule
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScheduleArgs {
    /// Path to a scenario file with `movements` and `terms` (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a movements file (JSON or YAML array); terms come from flags
    #[arg(long, conflicts_with = "input")]
    pub movements: Option<String>,

    /// Total credit line
    #[arg(long, default_value = "7000")]
    pub credit_limit: Decimal,

    /// Maximum monthly draw, as a percentage (8) or fraction (0.08) of the limit
    #[arg(long, default_value = "8")]
    pub monthly_cap: Decimal,

    /// First period in which the credit line may disburse
    #[arg(long, default_value_t = 7)]
    pub window_start: u32,

    /// Last period in which the credit line may disburse
    #[arg(long, default_value_t = 30)]
    pub window_end: u32,

    /// Nominal annual interest rate, as a percentage (12) or fraction (0.12)
    #[arg(long, default_value = "12")]
    pub annual_rate: Decimal,

    /// Save the computed schedule into this JSON store file
    #[arg(long)]
    pub save: Option<String>,

    /// Project name used as the store key
    #[arg(long, default_value = "Central Park")]
    pub project: String,
}

impl ScheduleArgs {
    fn terms(&self) -> CreditTerms {
        CreditTerms {
            credit_limit: self.credit_limit,
            monthly_cap: self.monthly_cap,
            window_start: self.window_start,
            window_end: self.window_end,
            annual_rate: self.annual_rate,
        }
    }
}

/// Resolve the scenario from `--input`, `--movements` + flags, or stdin.
/// Returns the scenario and a label describing where it came from.
fn load_scenario(args: &ScheduleArgs) -> Result<(ScheduleInput, String), Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        let scenario: ScheduleInput = input::file::read_document(path)?;
        return Ok((scenario, path.clone()));
    }
    if let Some(ref path) = args.movements {
        let movements: Vec<Movement> = input::file::read_document(path)?;
        return Ok((
            ScheduleInput {
                movements,
                terms: args.terms(),
            },
            path.clone(),
        ));
    }
    if let Some(scenario) = input::stdin::read_stdin::<ScheduleInput>()? {
        return Ok((scenario, "stdin".to_string()));
    }
    Err("--input <scenario.json>, --movements <movements.json> or stdin required".into())
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (scenario, source) = load_scenario(&args)?;
    info!(source = %source, movements = scenario.movements.len(), "scenario loaded");

    let result = schedule::build_schedule(&scenario)?;

    if let Some(ref path) = args.save {
        let mut store = JsonFileStore::new(path);
        let record = store.save_schedule(SaveRequest {
            project: &args.project,
            source: &source,
            terms: &scenario.terms,
            movements: &scenario.movements,
            output: &result.result,
        })?;
        info!(
            project = %record.name,
            periods = record.disbursements.len(),
            store = %path,
            "schedule saved"
        );
    }

    let rows = schedule_rows(&result.result);
    let mut value = serde_json::to_value(&result)?;
    value["rows"] = serde_json::to_value(rows)?;
    Ok(value)
}
