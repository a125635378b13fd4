//! Database schema and operations
//!
//! Scenarios are created and deleted, never updated. Report requests are
//! append-only.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use thiserror::Error;

use crate::calculator::{self, ValidationError};
use crate::models::{NewScenario, ReportRequest, Scenario, ScenarioInput};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Scenario not found: {0}")]
    NotFound(i64),
    #[error("Scenario name already exists: {0}")]
    DuplicateName(String),
    #[error("Missing required field: scenario_name")]
    MissingName,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scenarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scenario_name TEXT NOT NULL UNIQUE,
            monthly_invoice_volume REAL NOT NULL,
            num_ap_staff REAL NOT NULL,
            avg_hours_per_invoice REAL NOT NULL,
            hourly_wage REAL NOT NULL,
            error_rate_manual REAL,
            error_cost REAL,
            time_horizon_months INTEGER,
            one_time_implementation_cost REAL,
            created_at TEXT NOT NULL
        );

        -- Email-gated report requests (audit log)
        CREATE TABLE IF NOT EXISTS report_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scenario_id INTEGER NOT NULL,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scenarios_created ON scenarios(created_at);
        CREATE INDEX IF NOT EXISTS idx_report_requests_scenario ON report_requests(scenario_id);
        "#,
    )?;
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Insert a scenario and return its id
///
/// The input must pass engine validation so every stored scenario can be
/// recomputed later. Absent optional fields are stored as NULL.
pub fn insert_scenario(conn: &Connection, scenario: &NewScenario) -> Result<i64> {
    let name = scenario.scenario_name.trim();
    if name.is_empty() {
        return Err(StoreError::MissingName);
    }
    calculator::validate(&scenario.input)?;

    let input = &scenario.input;
    let inserted = conn.execute(
        "INSERT INTO scenarios (scenario_name, monthly_invoice_volume, num_ap_staff, avg_hours_per_invoice,
             hourly_wage, error_rate_manual, error_cost, time_horizon_months,
             one_time_implementation_cost, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        (
            name,
            input.monthly_invoice_volume,
            input.num_ap_staff,
            input.avg_hours_per_invoice,
            input.hourly_wage,
            input.error_rate_manual,
            input.error_cost,
            input.time_horizon_months,
            input.one_time_implementation_cost,
            Utc::now(),
        ),
    );

    match inserted {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            tracing::debug!(id, name, "scenario inserted");
            Ok(id)
        }
        Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateName(name.to_string())),
        Err(e) => Err(e.into()),
    }
}

const SCENARIO_COLUMNS: &str = "id, scenario_name, monthly_invoice_volume, num_ap_staff, avg_hours_per_invoice,
     hourly_wage, error_rate_manual, error_cost, time_horizon_months,
     one_time_implementation_cost, created_at";

fn scenario_from_row(row: &Row<'_>) -> rusqlite::Result<Scenario> {
    Ok(Scenario {
        id: row.get(0)?,
        scenario_name: row.get(1)?,
        input: ScenarioInput {
            monthly_invoice_volume: row.get(2)?,
            num_ap_staff: row.get(3)?,
            avg_hours_per_invoice: row.get(4)?,
            hourly_wage: row.get(5)?,
            error_rate_manual: row.get(6)?,
            error_cost: row.get(7)?,
            time_horizon_months: row.get(8)?,
            one_time_implementation_cost: row.get(9)?,
        },
        created_at: row.get::<_, DateTime<Utc>>(10)?,
    })
}

/// List all scenarios, newest first
pub fn list_scenarios(conn: &Connection) -> Result<Vec<Scenario>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SCENARIO_COLUMNS} FROM scenarios ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = stmt.query_map([], scenario_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Get a single scenario by id
pub fn get_scenario(conn: &Connection, id: i64) -> Result<Scenario> {
    conn.query_row(
        &format!("SELECT {SCENARIO_COLUMNS} FROM scenarios WHERE id = ?1"),
        [id],
        scenario_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound(id))
}

/// Delete a scenario by id
pub fn delete_scenario(conn: &Connection, id: i64) -> Result<()> {
    let affected = conn.execute("DELETE FROM scenarios WHERE id = ?1", [id])?;
    if affected == 0 {
        return Err(StoreError::NotFound(id));
    }
    tracing::debug!(id, "scenario deleted");
    Ok(())
}

/// Record a report request and return its id
pub fn insert_report_request(conn: &Connection, scenario_id: i64, email: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO report_requests (scenario_id, email, created_at) VALUES (?1, ?2, ?3)",
        (scenario_id, email, Utc::now()),
    )?;
    Ok(conn.last_insert_rowid())
}

/// List report requests, newest first, optionally for one scenario
pub fn list_report_requests(
    conn: &Connection,
    scenario_id: Option<i64>,
) -> Result<Vec<ReportRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, scenario_id, email, created_at
         FROM report_requests
         WHERE ?1 IS NULL OR scenario_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map([scenario_id], |row| {
        Ok(ReportRequest {
            id: row.get(0)?,
            scenario_id: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Remove all scenarios and report requests
pub fn clear_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM report_requests;
        DELETE FROM scenarios;
        "#,
    )?;
    Ok(())
}
