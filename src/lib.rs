//! Invoice automation ROI calculator
//!
//! Projects savings from replacing manual invoice processing with an
//! automated pipeline, and keeps named scenarios in SQLite.

pub mod calculator;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod report;
pub mod server;
