use clap::Args;
use serde_json::Value;

use construction_credit_core::schedule::{summarize_subphases, Movement, ScheduleInput};

use crate::input;

/// Arguments for the subphase sales/construction window summary
#[derive(Args)]
pub struct SubphaseArgs {
    /// Path to a scenario file with `movements` and `terms`
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a movements file (JSON or YAML array)
    #[arg(long, conflicts_with = "input")]
    pub movements: Option<String>,
}

pub fn run_subphases(args: SubphaseArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let movements: Vec<Movement> = if let Some(ref path) = args.input {
        input::file::read_document::<ScheduleInput>(path)?.movements
    } else if let Some(ref path) = args.movements {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin::<Vec<Movement>>()? {
        data
    } else {
        return Err("--input <scenario.json>, --movements <movements.json> or stdin required".into());
    };

    let windows = summarize_subphases(&movements)?;
    Ok(serde_json::json!({ "rows": windows }))
}
