use serde_json::Value;

use super::{display_value, result_of};

/// Headline figure per command, in order of priority.
const PRIORITY_KEYS: [&str; 6] = [
    "after_tax_irr",
    "irr",
    "total_cost",
    "periodic_payment",
    "total_depreciation",
    "equity_multiple",
];

/// Print just the key answer value from the output. A batch prints one
/// line per deal.
pub fn print_minimal(value: &Value) {
    if let Some(Value::Array(results)) = value.get("results") {
        for item in results {
            println!("{}", headline(result_of(item)));
        }
        return;
    }
    println!("{}", headline(result_of(value)));
}

fn headline(result: &Value) -> String {
    let search = [result.get("summary"), Some(result)];
    for map in search.into_iter().flatten().filter_map(Value::as_object) {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                return display_value(val);
            }
        }
    }

    match result.as_object().and_then(|m| m.iter().next()) {
        Some((key, val)) => format!("{key}: {}", display_value(val)),
        None => display_value(result),
    }
}
