use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use proforma_core::time_value::{return_metrics, IrrOutcome};
use proforma_core::with_metadata;

use crate::input;

/// Arguments for IRR and equity multiple
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON input file: {"cash_flows": [...]}
    #[arg(long)]
    pub input: Option<String>,

    /// Annual cash flows starting at year 0 (comma-separated, e.g. "-100,10,10,120")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,
}

#[derive(Deserialize, Serialize)]
struct FlowSeries {
    cash_flows: Vec<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let series: FlowSeries = match args.cash_flows {
        Some(cash_flows) => FlowSeries { cash_flows },
        None => input::load_required(
            args.input.as_deref(),
            "--cash-flows or --input <flows.json> is required",
        )?,
    };

    let metrics = return_metrics(&series.cash_flows)?;
    let mut warnings = Vec::new();
    if metrics.irr == IrrOutcome::NoRealIrr {
        warnings.push("Cash flows never break even: no real IRR in the search range".to_string());
    }

    let output = with_metadata(
        "Bracketed IRR (bisection with secant steps) and equity multiple",
        &series,
        warnings,
        start.elapsed().as_micros() as u64,
        metrics,
    );
    Ok(serde_json::to_value(output)?)
}
