use std::collections::BTreeMap;
use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use proforma_core::rehab::{estimate_rehab_budget, ConditionGrade, RehabEstimateInput, RehabLineItem};
use proforma_core::{with_metadata, Money, Rate};

use crate::input;

/// Arguments for a rehab budget estimate
#[derive(Args)]
pub struct RehabArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Living area in square feet
    #[arg(long)]
    pub square_feet: Option<Decimal>,

    /// Year the property was built
    #[arg(long)]
    pub year_built: Option<i32>,

    /// Condition grade: turnkey, light, medium, heavy, full_gut
    #[arg(long)]
    pub grade: Option<String>,

    /// Rehab duration in months (defaults by grade)
    #[arg(long)]
    pub months: Option<u32>,

    /// Total budget, replacing the line-item sum
    #[arg(long)]
    pub total_override: Option<Decimal>,
}

#[derive(Serialize)]
struct RehabEstimate {
    condition_grade: ConditionGrade,
    line_items: Vec<RehabLineItem>,
    total_cost: Money,
    rehab_months: u32,
    rent_months: u32,
    year_one_rent_fraction: Rate,
}

pub fn run_rehab(args: RehabArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let estimate_input: RehabEstimateInput = if let Some(data) =
        input::load_value(args.input.as_deref())?
    {
        serde_json::from_value(data)?
    } else {
        let square_feet = args
            .square_feet
            .ok_or("--square-feet is required (or provide --input)")?;
        let year_built = args
            .year_built
            .ok_or("--year-built is required (or provide --input)")?;
        let grade = args.grade.ok_or("--grade is required (or provide --input)")?;
        RehabEstimateInput {
            square_feet,
            year_built,
            condition_grade: parse_grade(&grade)?,
            rehab_months: args.months,
            line_item_overrides: BTreeMap::new(),
            total_override: args.total_override,
        }
    };

    let budget = estimate_rehab_budget(&estimate_input)?;
    let estimate = RehabEstimate {
        condition_grade: budget.condition_grade,
        total_cost: budget.total_cost(),
        rehab_months: budget.rehab_months,
        rent_months: budget.rent_months(),
        year_one_rent_fraction: budget.rent_fraction(),
        line_items: budget.line_items,
    };

    let output = with_metadata(
        "Rehab budget: per-sqft cost table by condition grade with age multiplier",
        &estimate_input,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        estimate,
    );
    Ok(serde_json::to_value(output)?)
}

fn parse_grade(raw: &str) -> Result<ConditionGrade, Box<dyn std::error::Error>> {
    let normalised = raw.trim().replace(['-', ' '], "_").to_uppercase();
    match serde_json::from_value(Value::String(normalised)) {
        Ok(grade) => Ok(grade),
        Err(_) => Err(format!(
            "Unknown condition grade '{raw}' (expected turnkey, light, medium, heavy or full_gut)"
        )
        .into()),
    }
}
