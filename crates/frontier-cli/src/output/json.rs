use serde_json::Value;
use std::io::Write;

/// Pretty-print JSON to stdout.
pub fn print_json(value: &Value) {
    write_json(&mut std::io::stdout().lock(), value);
}

/// Pretty-print JSON to stderr, for structured error reports.
pub fn eprint_json(value: &Value) {
    write_json(&mut std::io::stderr().lock(), value);
}

fn write_json(out: &mut impl Write, value: &Value) {
    let written = serde_json::to_string_pretty(value)
        .map_err(|e| e.to_string())
        .and_then(|s| writeln!(out, "{}", s).map_err(|e| e.to_string()));
    if let Err(e) = written {
        eprintln!("JSON serialization error: {}", e);
    }
}
