//! HTTP/JSON API
//!
//! Responses use a `{"success": bool, ...}` envelope. Errors carry an
//! `error` message string.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::calculator::{self, RoiConstants, ValidationError};
use crate::db::{self, StoreError};
use crate::models::{NewScenario, ScenarioInput};
use crate::report::{self, ReportError};

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    constants: RoiConstants,
}

impl AppState {
    pub fn new(conn: Connection, constants: RoiConstants) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            constants,
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.conn
            .lock()
            .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"))
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status, &self.message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Scenario not found"),
            StoreError::DuplicateName(_) => Self::bad_request("Scenario name already exists"),
            StoreError::MissingName | StoreError::Validation(_) => Self::bad_request(e.to_string()),
            StoreError::Sqlite(_) => {
                tracing::error!(error = %e, "storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::InvalidEmail => Self::bad_request(e.to_string()),
            ReportError::Store(e) => e.into(),
            ReportError::Validation(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        // a malformed or mistyped body is a bad request, not 422
        let status = match e {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => e.status(),
        };
        Self::new(status, e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::new(e.status(), e.body_text())
    }
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "success": false, "error": msg }))).into_response()
}

fn data_response(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/simulate", post(simulate_handler))
        .route(
            "/api/scenarios",
            get(list_scenarios_handler).post(create_scenario_handler),
        )
        .route(
            "/api/scenarios/:id",
            get(get_scenario_handler).delete(delete_scenario_handler),
        )
        .route("/api/report/generate", post(generate_report_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(%addr, "ROI API listening");
    println!("Server running on http://{addr}");
    println!("API base URL: http://{addr}/api");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScenarioInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let results = calculator::calculate_roi(&input, &state.constants)?;
    Ok(data_response(to_value(&results)?))
}

async fn create_scenario_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewScenario>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(scenario) = payload?;
    let id = db::insert_scenario(&*state.conn()?, &scenario)?;
    tracing::info!(id, name = %scenario.scenario_name, "scenario saved");

    Ok(Json(json!({
        "success": true,
        "id": id,
        "message": "Scenario saved successfully!",
    }))
    .into_response())
}

async fn list_scenarios_handler(State(state): State<AppState>) -> Result<Response, ApiError> {
    let scenarios = db::list_scenarios(&*state.conn()?)?;
    Ok(data_response(to_value(&scenarios)?))
}

async fn get_scenario_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    let scenario = db::get_scenario(&*state.conn()?, id)?;
    Ok(data_response(to_value(&scenario)?))
}

async fn delete_scenario_handler(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    db::delete_scenario(&*state.conn()?, id)?;
    tracing::info!(id, "scenario deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Scenario deleted successfully!",
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct ReportPayload {
    scenario_id: Option<i64>,
    #[serde(default)]
    email: String,
}

async fn generate_report_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    report::validate_email(&payload.email)?;
    let scenario_id = payload
        .scenario_id
        .ok_or_else(|| ApiError::bad_request("Missing required field: scenario_id"))?;

    let report =
        report::generate_report(&*state.conn()?, scenario_id, &payload.email, &state.constants)?;

    Ok(Json(json!({
        "success": true,
        "message": "Report generated successfully! Email captured.",
        "data": to_value(&report)?,
    }))
    .into_response())
}
