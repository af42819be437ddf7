pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Render a leaf value. IRR outcomes (`{"status": .., "value": ..}`) show
/// as the rate, or as "no real IRR".
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "n/a".to_string(),
        Value::Object(map) => match irr_outcome(map) {
            Some(text) => text,
            None => serde_json::to_string(value).unwrap_or_default(),
        },
        Value::Array(arr) => arr.iter().map(display_value).collect::<Vec<_>>().join(", "),
    }
}

fn irr_outcome(map: &Map<String, Value>) -> Option<String> {
    match map.get("status")?.as_str()? {
        "rate" => map.get("value").map(display_value),
        "no_real_irr" => Some("no real IRR".to_string()),
        _ => None,
    }
}

/// Flatten nested objects into `parent.child` columns, keeping IRR
/// outcomes as single cells.
pub fn flatten_row(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut cells = Vec::new();
    flatten_into("", map, &mut cells);
    cells
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, cells: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) if irr_outcome(inner).is_none() => {
                flatten_into(&name, inner, cells)
            }
            Value::Array(_) => {}
            _ => cells.push((name, display_value(val))),
        }
    }
}

/// The primary result object of a computation envelope.
pub fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}
