//! Invoice automation ROI calculator
//!
//! Computes ROI projections and manages saved scenarios from the command line,
//! or serves the same operations over HTTP.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use invoice_roi::calculator::{self, RoiSummary};
use invoice_roi::models::{NewScenario, ScenarioInput, TimelinePoint};
use invoice_roi::{config, db, logging, report, server};

#[derive(Parser)]
#[command(name = "invoice-roi")]
#[command(about = "ROI calculator for automated invoice processing")]
struct Cli {
    /// Path to the SQLite database (overrides the config file)
    #[arg(short, long, env = "INVOICE_ROI_DATABASE")]
    database: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, env = "INVOICE_ROI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Scenario parameters, from a JSON file and/or flags
#[derive(Args, Debug, Default)]
struct InputArgs {
    /// JSON file with scenario fields (flags override its values)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Invoices processed per month
    #[arg(long)]
    volume: Option<f64>,

    /// Accounts-payable staff count
    #[arg(long)]
    staff: Option<f64>,

    /// Hours spent per invoice
    #[arg(long)]
    hours: Option<f64>,

    /// Hourly wage
    #[arg(long)]
    wage: Option<f64>,

    /// Manual error rate in percent
    #[arg(long, allow_negative_numbers = true)]
    error_rate: Option<f64>,

    /// Cost of fixing one error
    #[arg(long, allow_negative_numbers = true)]
    error_cost: Option<f64>,

    /// Projection horizon in months
    #[arg(long)]
    months: Option<u32>,

    /// One-time implementation cost
    #[arg(long, allow_negative_numbers = true)]
    implementation_cost: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema
    Init {
        /// Delete all scenarios and report requests
        #[arg(long)]
        reset: bool,
    },

    /// Calculate ROI without saving anything
    Simulate {
        #[command(flatten)]
        inputs: InputArgs,

        /// Print JSON instead of a text summary
        #[arg(long)]
        json: bool,

        /// Include the month-by-month net savings
        #[arg(long)]
        timeline: bool,
    },

    /// Save a named scenario
    Save {
        /// Unique scenario name
        name: String,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// List saved scenarios, newest first
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show a saved scenario with its ROI
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Delete a saved scenario
    Delete { id: i64 },

    /// Generate a report for a saved scenario (requires an email address)
    Report {
        id: i64,

        /// Email address to record with the request
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        json: bool,
    },

    /// List recorded report requests
    Reports {
        /// Only requests for this scenario
        #[arg(short, long)]
        scenario: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Save a sample scenario with typical mid-size AP team figures
    LoadSample,

    /// Serve the HTTP API
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        cfg.database = database;
    }
    let constants = cfg.engine;

    match cli.command {
        Commands::Simulate {
            inputs,
            json,
            timeline,
        } => {
            let input = collect_input(&inputs)?;
            let result = calculator::calculate_roi(&input, &constants)?;

            if json {
                let out = if timeline {
                    let points = calculator::savings_timeline(&result, &input);
                    serde_json::json!({ "results": result, "timeline": points })
                } else {
                    serde_json::to_value(result)?
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print!("{}", RoiSummary::new("ROI Summary", &result, &input));
                if timeline {
                    let points = calculator::savings_timeline(&result, &input);
                    println!();
                    print!("{}", format_timeline(&points));
                }
            }
        }

        Commands::Serve { bind } => {
            let conn = open_database(&cfg.database)?;
            let bind = bind.unwrap_or(cfg.server.bind);
            let state = server::AppState::new(conn, constants);

            let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
            runtime
                .block_on(server::run_http_server(&bind, state))
                .with_context(|| format!("HTTP server on {bind} failed"))?;
        }

        Commands::Init { reset } => {
            let conn = open_database(&cfg.database)?;
            if reset {
                db::clear_data(&conn)?;
                println!("All scenarios and report requests deleted.");
            }
            println!("Database initialized at: {}", cfg.database.display());
        }

        Commands::Save { name, inputs } => {
            let conn = open_database(&cfg.database)?;
            let scenario = NewScenario {
                scenario_name: name,
                input: collect_input(&inputs)?,
            };
            let id = db::insert_scenario(&conn, &scenario)?;
            tracing::info!(id, name = %scenario.scenario_name, "scenario saved");
            println!("Scenario saved with id {id}");
        }

        Commands::List { json } => {
            let conn = open_database(&cfg.database)?;
            let scenarios = db::list_scenarios(&conn)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&scenarios)?);
            } else if scenarios.is_empty() {
                println!("No scenarios saved. Run 'save' or 'load-sample' first.");
            } else {
                println!(
                    "{:>5}  {:<30} {:>12} {:>16}  {}",
                    "ID", "Name", "Invoices/mo", "Monthly savings", "Created"
                );
                println!("{}", "-".repeat(90));
                for s in scenarios {
                    let savings = calculator::calculate_roi(&s.input, &constants)
                        .map(|r| format!("{:.0}", r.monthly_savings))
                        .unwrap_or_else(|_| "-".to_string());
                    println!(
                        "{:>5}  {:<30} {:>12} {:>16}  {}",
                        s.id,
                        s.scenario_name,
                        s.input.monthly_invoice_volume.unwrap_or_default(),
                        savings,
                        s.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::Show { id, json } => {
            let conn = open_database(&cfg.database)?;
            let scenario = db::get_scenario(&conn, id)?;
            let result = calculator::calculate_roi(&scenario.input, &constants)?;

            if json {
                let out = serde_json::json!({ "scenario": scenario, "results": result });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Scenario: {}", scenario.scenario_name);
                println!("  ID: {}", scenario.id);
                println!("  Created: {}", scenario.created_at.to_rfc3339());
                print!("{}", format_input(&scenario.input));
                println!();
                print!("{}", RoiSummary::new("ROI Summary", &result, &scenario.input));
            }
        }

        Commands::Delete { id } => {
            let conn = open_database(&cfg.database)?;
            db::delete_scenario(&conn, id)?;
            tracing::info!(id, "scenario deleted");
            println!("Scenario {id} deleted");
        }

        Commands::Report { id, email, json } => {
            let conn = open_database(&cfg.database)?;
            let report = report::generate_report(&conn, id, &email, &constants)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let title = format!("ROI Report: {}", report.scenario.scenario_name);
                print!("{}", RoiSummary::new(&title, &report.results, &report.scenario.input));
                println!();
                print!("{}", format_timeline(&report.timeline));
                println!();
                println!("Report generated. Email captured: {}", report.email_captured);
            }
        }

        Commands::Reports { scenario, json } => {
            let conn = open_database(&cfg.database)?;
            let requests = db::list_report_requests(&conn, scenario)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&requests)?);
            } else if requests.is_empty() {
                println!("No report requests recorded.");
            } else {
                println!("{:>5}  {:>8}  {:<36} {}", "ID", "Scenario", "Email", "Requested");
                println!("{}", "-".repeat(76));
                for r in requests {
                    println!(
                        "{:>5}  {:>8}  {:<36} {}",
                        r.id,
                        r.scenario_id,
                        r.email,
                        r.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }

        Commands::LoadSample => {
            let conn = open_database(&cfg.database)?;
            let id = db::insert_scenario(&conn, &sample_scenario())?;
            println!("Sample scenario saved with id {id}");
        }
    }

    Ok(())
}

fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Merge the optional JSON file with flag values; flags win
fn collect_input(args: &InputArgs) -> Result<ScenarioInput> {
    let mut input = match &args.input {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<ScenarioInput>(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => ScenarioInput::default(),
    };

    let overrides = [
        (&mut input.monthly_invoice_volume, args.volume),
        (&mut input.num_ap_staff, args.staff),
        (&mut input.avg_hours_per_invoice, args.hours),
        (&mut input.hourly_wage, args.wage),
        (&mut input.error_rate_manual, args.error_rate),
        (&mut input.error_cost, args.error_cost),
        (&mut input.one_time_implementation_cost, args.implementation_cost),
    ];
    for (field, value) in overrides {
        if value.is_some() {
            *field = value;
        }
    }
    if args.months.is_some() {
        input.time_horizon_months = args.months;
    }

    Ok(input)
}

/// The default figures shown in a fresh calculator form
fn sample_scenario() -> NewScenario {
    NewScenario {
        scenario_name: "Sample scenario".to_string(),
        input: ScenarioInput {
            monthly_invoice_volume: Some(2000.0),
            num_ap_staff: Some(3.0),
            avg_hours_per_invoice: Some(0.17),
            hourly_wage: Some(30.0),
            error_rate_manual: Some(0.5),
            error_cost: Some(100.0),
            time_horizon_months: Some(36),
            one_time_implementation_cost: Some(50000.0),
        },
    }
}

fn format_input(input: &ScenarioInput) -> String {
    fn field(value: Option<f64>) -> String {
        value.map_or_else(|| "-".to_string(), |v| v.to_string())
    }

    let mut output = String::new();
    output.push_str(&format!("  Invoices/month: {}\n", field(input.monthly_invoice_volume)));
    output.push_str(&format!("  AP staff: {}\n", field(input.num_ap_staff)));
    output.push_str(&format!("  Hours/invoice: {}\n", field(input.avg_hours_per_invoice)));
    output.push_str(&format!("  Hourly wage: {}\n", field(input.hourly_wage)));
    output.push_str(&format!("  Manual error rate: {}%\n", field(input.error_rate_manual)));
    output.push_str(&format!("  Cost per error: {}\n", field(input.error_cost)));
    output.push_str(&format!(
        "  Horizon: {} months\n",
        input.time_horizon_months.map_or_else(|| "-".to_string(), |m| m.to_string())
    ));
    output.push_str(&format!(
        "  Implementation cost: {}\n",
        field(input.one_time_implementation_cost)
    ));
    output
}

fn format_timeline(points: &[TimelinePoint]) -> String {
    let mut output = String::from("Month | Net savings\n------|------------\n");
    for p in points {
        output.push_str(&format!("{:>5} | {:>11.0}\n", p.month, p.savings));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_roi::models::RoiResult;

    #[test]
    fn flags_override_json_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        fs::write(
            &path,
            r#"{"monthly_invoice_volume": 500, "num_ap_staff": 2, "hourly_wage": 20}"#,
        )
        .unwrap();

        let args = InputArgs {
            input: Some(path),
            volume: Some(900.0),
            hours: Some(0.5),
            ..Default::default()
        };
        let input = collect_input(&args).unwrap();

        assert_eq!(input.monthly_invoice_volume, Some(900.0));
        assert_eq!(input.num_ap_staff, Some(2.0));
        assert_eq!(input.avg_hours_per_invoice, Some(0.5));
        assert_eq!(input.hourly_wage, Some(20.0));
        assert_eq!(input.error_cost, None);
    }

    #[test]
    fn timeline_table_has_one_row_per_month() {
        let result = RoiResult {
            monthly_savings: 100.0,
            cumulative_savings: 200.0,
            net_savings: 50.0,
            payback_months: 1.5,
            roi_percentage: 33.3,
            labor_cost_manual: 120.0,
            auto_cost: 20.0,
            error_savings: 0.0,
        };
        let input = ScenarioInput {
            time_horizon_months: Some(2),
            one_time_implementation_cost: Some(150.0),
            ..Default::default()
        };

        let text = format_timeline(&calculator::savings_timeline(&result, &input));
        assert!(text.contains("    0 |        -150"));
        assert!(text.contains("    2 |          50"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn sample_scenario_is_valid() {
        assert!(calculator::validate(&sample_scenario().input).is_ok());
    }
}
