use napi::Result as NapiResult;
use napi_derive::napi;

use construction_credit_core::presentation;
use construction_credit_core::schedule::{self, Movement, ScheduleInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Full computation envelope: credit ledger, contributions and summary.
#[napi]
pub fn compute_schedule(input_json: String) -> NapiResult<String> {
    let input: ScheduleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::build_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Combined per-period rows rounded for display.
#[napi]
pub fn schedule_rows(input_json: String) -> NapiResult<String> {
    let input: ScheduleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        schedule::compute_schedule(&input.movements, &input.terms).map_err(to_napi_error)?;
    serde_json::to_string(&presentation::schedule_rows(&output)).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Subphases
// ---------------------------------------------------------------------------

#[napi]
pub fn subphase_windows(movements_json: String) -> NapiResult<String> {
    let movements: Vec<Movement> =
        serde_json::from_str(&movements_json).map_err(to_napi_error)?;
    let windows = schedule::summarize_subphases(&movements).map_err(to_napi_error)?;
    serde_json::to_string(&windows).map_err(to_napi_error)
}
