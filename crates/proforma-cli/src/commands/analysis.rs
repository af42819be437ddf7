use clap::Args;
use rayon::prelude::*;
use serde_json::Value;

use proforma_core::proforma::{analyze_deal, DealAnalysisInput};

use crate::input;

/// Arguments for the full proforma
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON input: one deal object, or an array of deals
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::load_value(args.input.as_deref())?
        .ok_or("--input <deal.json> or stdin required for analyze")?;

    match data {
        Value::Array(items) => run_batch(items),
        single => {
            let deal: DealAnalysisInput = serde_json::from_value(single)?;
            let output = analyze_deal(&deal)?;
            Ok(serde_json::to_value(output)?)
        }
    }
}

/// Each deal is an independent fold, so a batch runs across the rayon pool.
/// Results keep input order; the first failing deal fails the batch.
fn run_batch(items: Vec<Value>) -> Result<Value, Box<dyn std::error::Error>> {
    let deals: Vec<DealAnalysisInput> = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<_, _>>()?;
    log::info!("Analysing {} deals in parallel", deals.len());

    let outputs = deals
        .par_iter()
        .enumerate()
        .map(|(i, deal)| {
            analyze_deal(deal).map_err(|e| format!("Deal {}: {}", i + 1, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let results = outputs
        .into_iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::json!({ "results": results }))
}
