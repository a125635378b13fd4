//! Data models for ROI scenarios and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input parameters for an ROI projection.
///
/// Every field is optional at this level so that "absent" and "present as zero"
/// stay distinguishable until [`crate::calculator::validate`] fills defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub monthly_invoice_volume: Option<f64>,
    pub num_ap_staff: Option<f64>,
    pub avg_hours_per_invoice: Option<f64>,
    pub hourly_wage: Option<f64>,
    pub error_rate_manual: Option<f64>, // percent, 0-100
    pub error_cost: Option<f64>,
    pub time_horizon_months: Option<u32>,
    pub one_time_implementation_cost: Option<f64>,
}

/// Derived financial metrics for one scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiResult {
    pub monthly_savings: f64,
    pub cumulative_savings: f64,
    pub net_savings: f64,
    pub payback_months: f64,
    pub roi_percentage: f64,
    pub labor_cost_manual: f64,
    pub auto_cost: f64,
    pub error_savings: f64,
}

/// A scenario as submitted for saving
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewScenario {
    #[serde(default)]
    pub scenario_name: String,
    #[serde(flatten)]
    pub input: ScenarioInput,
}

/// A persisted scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: i64,
    pub scenario_name: String,
    #[serde(flatten)]
    pub input: ScenarioInput,
    pub created_at: DateTime<Utc>,
}

/// Audit record of an email-gated report request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub id: i64,
    pub scenario_id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Net position at the end of a given month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub month: u32,
    pub savings: f64,
}
