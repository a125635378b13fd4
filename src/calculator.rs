//! ROI calculation logic
//!
//! Pure functions only: no I/O and no shared state. Identical inputs always
//! produce bit-identical outputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{RoiResult, ScenarioInput, TimelinePoint};

/// Fixed parameters of the automated process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConstants {
    pub automated_cost_per_invoice: f64,
    pub automated_error_rate: f64, // fraction, not percent
    /// Multiplier applied to raw monthly savings. Business policy: it inflates
    /// every result by the same factor regardless of sign.
    pub savings_bias_factor: f64,
}

impl Default for RoiConstants {
    fn default() -> Self {
        Self {
            automated_cost_per_invoice: 0.20,
            automated_error_rate: 0.001,
            savings_bias_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field} must be a positive number")]
    MissingField { field: &'static str },
}

/// Scenario input with required fields checked and optional ones defaulted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedInput {
    pub monthly_invoice_volume: f64,
    pub num_ap_staff: f64,
    pub avg_hours_per_invoice: f64,
    pub hourly_wage: f64,
    pub error_rate_manual: f64,
    pub error_cost: f64,
    pub time_horizon_months: u32,
    pub one_time_implementation_cost: f64,
}

fn required(value: Option<f64>, field: &'static str) -> Result<f64, ValidationError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

/// Check required fields and fill absent optional ones with zero.
///
/// A supplied zero is kept as zero; only `None` is defaulted.
pub fn validate(input: &ScenarioInput) -> Result<ValidatedInput, ValidationError> {
    Ok(ValidatedInput {
        monthly_invoice_volume: required(input.monthly_invoice_volume, "monthly_invoice_volume")?,
        num_ap_staff: required(input.num_ap_staff, "num_ap_staff")?,
        avg_hours_per_invoice: required(input.avg_hours_per_invoice, "avg_hours_per_invoice")?,
        hourly_wage: required(input.hourly_wage, "hourly_wage")?,
        error_rate_manual: input.error_rate_manual.unwrap_or(0.0),
        error_cost: input.error_cost.unwrap_or(0.0),
        time_horizon_months: input.time_horizon_months.unwrap_or(0),
        one_time_implementation_cost: input.one_time_implementation_cost.unwrap_or(0.0),
    })
}

/// Calculate ROI metrics at full precision.
///
/// When the implementation cost is positive and monthly savings are not,
/// payback comes out negative (or infinite at exactly zero savings). That value
/// is returned as computed.
pub fn calculate_roi_exact(
    input: &ScenarioInput,
    constants: &RoiConstants,
) -> Result<RoiResult, ValidationError> {
    let v = validate(input)?;

    let labor_cost_manual =
        v.num_ap_staff * v.hourly_wage * v.avg_hours_per_invoice * v.monthly_invoice_volume;
    let auto_cost = v.monthly_invoice_volume * constants.automated_cost_per_invoice;
    let error_savings = ((v.error_rate_manual / 100.0) - constants.automated_error_rate)
        * v.monthly_invoice_volume
        * v.error_cost;

    let monthly_savings =
        (labor_cost_manual + error_savings - auto_cost) * constants.savings_bias_factor;

    let cumulative_savings = monthly_savings * f64::from(v.time_horizon_months);
    let implementation_cost = v.one_time_implementation_cost;
    let net_savings = cumulative_savings - implementation_cost;

    let payback_months = if implementation_cost > 0.0 {
        implementation_cost / monthly_savings
    } else {
        0.0
    };
    let roi_percentage = if implementation_cost > 0.0 {
        (net_savings / implementation_cost) * 100.0
    } else {
        0.0
    };

    Ok(RoiResult {
        monthly_savings,
        cumulative_savings,
        net_savings,
        payback_months,
        roi_percentage,
        labor_cost_manual,
        auto_cost,
        error_savings,
    })
}

/// Calculate ROI metrics rounded for presentation
pub fn calculate_roi(
    input: &ScenarioInput,
    constants: &RoiConstants,
) -> Result<RoiResult, ValidationError> {
    Ok(calculate_roi_exact(input, constants)?.rounded())
}

/// Nearest whole unit, halves toward positive infinity (`-0.5` becomes `0`)
fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// One decimal place, halves away from zero, judged on the exact binary value.
/// `1.45` is stored just below the tie and rounds to `1.4`; `0.25` is an
/// exact tie and rounds to `0.3`.
fn round_tenths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scaled = value * 10.0;
    if (value * 4.0).fract() == 0.0 && scaled.fract().abs() == 0.5 {
        return scaled.round() / 10.0;
    }
    format!("{value:.1}").parse().unwrap_or(value)
}

impl RoiResult {
    /// Currency fields to whole units, payback and ROI to one decimal.
    /// Non-finite values pass through unchanged.
    pub fn rounded(&self) -> Self {
        Self {
            monthly_savings: round_half_up(self.monthly_savings),
            cumulative_savings: round_half_up(self.cumulative_savings),
            net_savings: round_half_up(self.net_savings),
            payback_months: round_tenths(self.payback_months),
            roi_percentage: round_tenths(self.roi_percentage),
            labor_cost_manual: round_half_up(self.labor_cost_manual),
            auto_cost: round_half_up(self.auto_cost),
            error_savings: round_half_up(self.error_savings),
        }
    }
}

/// Longest timeline produced, in months. Scalar metrics still use the full horizon.
pub const MAX_TIMELINE_MONTHS: u32 = 1200;

/// Net position after each month, from month 0 through the time horizon
/// (capped at [`MAX_TIMELINE_MONTHS`])
pub fn savings_timeline(result: &RoiResult, input: &ScenarioInput) -> Vec<TimelinePoint> {
    let implementation_cost = input.one_time_implementation_cost.unwrap_or(0.0);
    let horizon = input
        .time_horizon_months
        .unwrap_or(0)
        .min(MAX_TIMELINE_MONTHS);

    (0..=horizon)
        .map(|month| TimelinePoint {
            month,
            savings: f64::from(month) * result.monthly_savings - implementation_cost,
        })
        .collect()
}

/// Printable summary of an ROI result
#[derive(Debug)]
pub struct RoiSummary<'a> {
    pub title: &'a str,
    pub result: &'a RoiResult,
    pub time_horizon_months: u32,
}

impl<'a> RoiSummary<'a> {
    pub fn new(title: &'a str, result: &'a RoiResult, input: &ScenarioInput) -> Self {
        Self {
            title,
            result,
            time_horizon_months: input.time_horizon_months.unwrap_or(0),
        }
    }
}

impl std::fmt::Display for RoiSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.result;
        writeln!(f, "=== {} ===", self.title)?;
        writeln!(f)?;

        writeln!(f, "Monthly costs:")?;
        writeln!(f, "  Manual labor:     {:>14.0}", r.labor_cost_manual)?;
        writeln!(f, "  Automation:       {:>14.0}", r.auto_cost)?;
        writeln!(f, "  Error savings:    {:>14.0}", r.error_savings)?;
        writeln!(f)?;

        writeln!(f, "Savings:")?;
        writeln!(f, "  Monthly:          {:>14.0}", r.monthly_savings)?;
        writeln!(
            f,
            "  Over {:>3} months:  {:>14.0}",
            self.time_horizon_months, r.cumulative_savings
        )?;
        writeln!(f, "  Net:              {:>14.0}", r.net_savings)?;
        writeln!(f)?;

        writeln!(f, "Payback: {:.1} months", r.payback_months)?;
        writeln!(f, "ROI:     {:.1}%", r.roi_percentage)?;

        Ok(())
    }
}
