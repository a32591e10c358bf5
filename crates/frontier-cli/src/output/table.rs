use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate. Nested objects and arrays
/// of records inside the result get their own titled table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object("", map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object("", res_map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars first as a Field/Value table, then one section per nested value.
fn print_object(title: &str, map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut scalars = 0;
    for (key, val) in map {
        if is_section(val) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
        scalars += 1;
    }
    if scalars > 0 {
        if !title.is_empty() {
            println!("\n[{}]", title);
        }
        println!("{}", Table::from(builder));
    }

    for (key, val) in map {
        let path = if title.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", title, key)
        };
        match val {
            Value::Object(inner) if is_weight_map(inner) => print_weights(&path, inner),
            Value::Object(inner) => print_object(&path, inner),
            Value::Array(arr) if is_section(val) => {
                println!("\n[{}]", path);
                print_array_table(arr);
            }
            _ => {}
        }
    }
}

/// Ticker -> weight maps render as percentages.
fn print_weights(title: &str, map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Ticker", "Weight"]);
    for (ticker, w) in map {
        let pct = w
            .as_f64()
            .map(|w| format!("{:.2}%", w * 100.0))
            .unwrap_or_else(|| format_value(w));
        builder.push_record([ticker.as_str(), &pct]);
    }
    println!("\n[{}]", title);
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn is_section(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(arr) => arr.first().map(Value::is_object).unwrap_or(false),
        _ => false,
    }
}

fn is_weight_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.values().all(Value::is_number)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.6}", f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(map) if is_weight_map(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, format_value(v)))
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
