pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// JSON from `--input` if given, otherwise from piped stdin.
pub fn load_value(path: Option<&str>) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(file::read_json_value(p)?)),
        None => stdin::read_stdin(),
    }
}

/// Like [`load_value`] but deserialised, failing with `missing` when there
/// is no input at all.
pub fn load_required<T: DeserializeOwned>(
    path: Option<&str>,
    missing: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let value = load_value(path)?.ok_or_else(|| missing.to_string())?;
    Ok(serde_json::from_value(value)?)
}
