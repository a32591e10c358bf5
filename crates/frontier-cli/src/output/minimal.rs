use serde_json::Value;

/// Print just the key answer from the output.
///
/// Looks up well-known result paths in priority order and falls back to the
/// first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_paths = [
        "/optimal/allocation",
        "/recommendations",
        "/tangency/weights",
        "/expected_returns",
        "/posterior/posterior_returns",
        "/allocation",
    ];

    for path in &priority_paths {
        if let Some(val) = result_obj.pointer(path) {
            if !val.is_null() {
                print_answer(val);
                return;
            }
        }
    }

    if let Value::Array(items) = result_obj {
        for item in items {
            let name = item.get("name").or_else(|| item.get("ticker"));
            let sharpe = item.pointer("/stats/sharpe_ratio");
            match (name, sharpe) {
                (Some(n), Some(s)) => println!("{} {}", format_minimal(n), format_minimal(s)),
                _ => println!("{}", format_minimal(item)),
            }
        }
        return;
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

/// Weight maps print one `TICKER weight` line each; recommendation lists print
/// ticker and Sharpe improvement.
fn print_answer(value: &Value) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                println!("{} {}", k, format_minimal(v));
            }
        }
        Value::Array(items) => {
            for item in items {
                match (item.get("ticker"), item.get("sharpe_improvement")) {
                    (Some(t), Some(s)) => println!("{} {}", format_minimal(t), format_minimal(s)),
                    _ => println!("{}", format_minimal(item)),
                }
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
