use colored::Colorize;
use serde_json::Value;

/// Pretty-print JSON for a terminal; one compact line when piped.
pub fn print_json(value: &Value) {
    let rendered = if atty::is(atty::Stream::Stdout) {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("{}: {}", "JSON serialization error".red(), e),
    }
}
