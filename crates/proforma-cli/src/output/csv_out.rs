use serde_json::{Map, Value};
use std::io;

use super::{display_value, flatten_row, result_of};

/// Arrays written as one CSV row per record, in order of preference.
const ROW_SECTIONS: [&str; 4] = ["yearly_projections", "years", "yearly", "line_items"];

/// Write output as CSV to stdout.
///
/// A proforma prints one row per hold year; a batch prints one summary row
/// per deal; anything else is a two-column field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    if let Some(Value::Array(results)) = value.get("results") {
        let rows: Vec<Map<String, Value>> = results
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut row = Map::new();
                row.insert("deal".into(), Value::from(i + 1));
                if let Some(Value::Object(summary)) = result_of(item).get("summary") {
                    row.extend(summary.clone());
                }
                row
            })
            .collect();
        write_rows(&mut wtr, &rows);
    } else if let Value::Object(result) = result_of(value) {
        let section = ROW_SECTIONS
            .iter()
            .find_map(|key| result.get(*key).and_then(Value::as_array));
        match section {
            Some(records) => {
                let rows: Vec<Map<String, Value>> =
                    records.iter().filter_map(Value::as_object).cloned().collect();
                write_rows(&mut wtr, &rows);
            }
            None => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in flatten_row(result) {
                    let _ = wtr.write_record([key, val]);
                }
            }
        }
    } else {
        let _ = wtr.write_record([display_value(value)]);
    }

    let _ = wtr.flush();
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Map<String, Value>]) {
    let flattened: Vec<Vec<(String, String)>> = rows.iter().map(flatten_row).collect();
    let Some(first) = flattened.first() else {
        return;
    };
    let headers: Vec<&str> = first.iter().map(|(k, _)| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for row in &flattened {
        let record: Vec<&str> = headers
            .iter()
            .map(|h| {
                row.iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or_default()
            })
            .collect();
        let _ = wtr.write_record(&record);
    }
}
