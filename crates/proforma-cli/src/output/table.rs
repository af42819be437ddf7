use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{display_value, flatten_row, result_of};

/// Yearly projection columns shown in the table view; JSON and CSV carry all.
const PROJECTION_COLUMNS: [&str; 11] = [
    "year",
    "gross_rent",
    "noi",
    "debt_service",
    "cash_flow_before_tax",
    "dscr",
    "depreciation",
    "taxable_income",
    "suspended_loss_out",
    "tax_liability",
    "cash_flow_after_tax",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    if let Some(Value::Array(results)) = value.get("results") {
        for (i, item) in results.iter().enumerate() {
            println!("Deal {}", i + 1);
            print_envelope(item);
            println!();
        }
        return;
    }
    print_envelope(value);
}

fn print_envelope(value: &Value) {
    match result_of(value) {
        Value::Object(result) => print_result(result),
        other => println!("{}", display_value(other)),
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

/// Scalars first as a Field/Value table, then one titled table per nested
/// object or array of records.
fn print_result(result: &Map<String, Value>) {
    let scalars: Map<String, Value> = result
        .iter()
        .filter(|(_, v)| !is_section(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !scalars.is_empty() {
        print_fields(&scalars);
    }

    for (key, val) in result.iter().filter(|(_, v)| is_section(v)) {
        println!("\n{}", title(key));
        match val {
            Value::Object(map) => print_fields(map),
            Value::Array(rows) if key == "yearly_projections" => {
                print_rows(rows, Some(&PROJECTION_COLUMNS))
            }
            Value::Array(rows) => print_rows(rows, None),
            _ => {}
        }
    }
}

fn is_section(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.contains_key("status"),
        Value::Array(arr) => arr.first().is_some_and(Value::is_object),
        _ => false,
    }
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten_row(map) {
        builder.push_record([key, val]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value], columns: Option<&[&str]>) {
    let flattened: Vec<Vec<(String, String)>> = rows
        .iter()
        .filter_map(Value::as_object)
        .map(flatten_row)
        .collect();
    let Some(first) = flattened.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = match columns {
        Some(cols) => cols.iter().map(|c| c.to_string()).collect(),
        None => first.iter().map(|(k, _)| k.clone()).collect(),
    };

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in &flattened {
        builder.push_record(headers.iter().map(|h| {
            row.iter()
                .find(|(k, _)| k == h)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        }));
    }
    println!("{}", Table::from(builder));
}

fn title(key: &str) -> String {
    key.split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
