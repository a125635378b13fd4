//! Email-gated report generation

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::calculator::{self, RoiConstants, ValidationError};
use crate::db::{self, StoreError};
use crate::models::{RoiResult, Scenario, TimelinePoint};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Valid email required")]
    InvalidEmail,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Recomputed results for a stored scenario
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario: Scenario,
    pub results: RoiResult,
    pub timeline: Vec<TimelinePoint>,
    pub email_captured: String,
}

/// Accept any non-blank address containing `@`
pub fn validate_email(email: &str) -> Result<&str, ReportError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ReportError::InvalidEmail);
    }
    Ok(email)
}

/// Recompute ROI for a stored scenario and log the request.
///
/// The request is recorded only after the recomputation succeeds.
pub fn generate_report(
    conn: &Connection,
    scenario_id: i64,
    email: &str,
    constants: &RoiConstants,
) -> Result<Report, ReportError> {
    let email = validate_email(email)?;
    let scenario = db::get_scenario(conn, scenario_id)?;
    let results = calculator::calculate_roi(&scenario.input, constants)?;

    db::insert_report_request(conn, scenario_id, email)?;
    tracing::info!(scenario_id, "report generated");

    Ok(Report {
        timeline: calculator::savings_timeline(&results, &scenario.input),
        scenario,
        results,
        email_captured: email.to_string(),
    })
}
