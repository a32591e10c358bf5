pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use colored::Colorize;
use frontier_core::FrontierError;
use serde_json::Value;

use crate::OutputFormat;

/// Dispatch a command result to the selected formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Print a failure on stderr. Core errors are followed by their structured
/// report (kind, message, details) regardless of the output format.
pub fn report_error(error: &(dyn std::error::Error + 'static)) {
    eprintln!("{}: {}", "error".red().bold(), error);
    if let Some(report) = error_report(error) {
        json::eprint_json(&report);
    }
}

fn error_report(error: &(dyn std::error::Error + 'static)) -> Option<Value> {
    let core = error.downcast_ref::<FrontierError>()?;
    serde_json::to_value(core.report()).ok()
}
