//! Metrics collection.
//!
//! # Metrics
//! - `attest_attempts_total` (counter): attempts by outcome
//! - `attest_stage_duration_seconds` (histogram): time spent per stage
//! - `attest_stage_failures_total` (counter): failures by stage
//! - `upload_requests_total` (counter): storage responses by status class
//! - `anchor_confirmations_total` (counter): ledger outcomes by result
//!
//! Recording is a no-op until the embedding application installs a recorder.

use std::time::Duration;

use crate::pipeline::state::Stage;

/// Record the end of an attempt (`complete`, `errored`, `busy`).
pub fn record_attempt(outcome: &'static str) {
    ::metrics::counter!("attest_attempts_total", "outcome" => outcome).increment(1);
}

/// Record how long a stage ran and whether it failed.
pub fn record_stage(stage: Stage, elapsed: Duration, ok: bool) {
    ::metrics::histogram!("attest_stage_duration_seconds", "stage" => stage.as_str())
        .record(elapsed.as_secs_f64());
    if !ok {
        ::metrics::counter!("attest_stage_failures_total", "stage" => stage.as_str()).increment(1);
    }
}

/// Record a storage backend response; `status` is `0` for no response.
pub fn record_upload(status: u16) {
    let class = match status {
        0 => "none",
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };
    ::metrics::counter!("upload_requests_total", "status" => class).increment(1);
}

/// Record a ledger confirmation outcome (`confirmed`, `failed`, `error`).
pub fn record_confirmation(result: &'static str) {
    ::metrics::counter!("anchor_confirmations_total", "result" => result).increment(1);
}
