use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use proforma_core::depreciation::{
    build_depreciation_schedule, CostSegregation, DepreciationInput, ShortLifeMethod,
};
use proforma_core::with_metadata;

use crate::input;

/// Arguments for a depreciation schedule
#[derive(Args)]
pub struct DepreciateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Depreciable building basis
    #[arg(long)]
    pub basis: Option<Decimal>,

    /// Number of years to schedule
    #[arg(long, default_value_t = 28)]
    pub years: u32,

    /// Month placed in service (1-12)
    #[arg(long, default_value_t = 1)]
    pub placed_month: u32,

    /// Share of basis in the 5-year class
    #[arg(long)]
    pub five_year: Option<Decimal>,

    /// Share of basis in the 7-year class
    #[arg(long)]
    pub seven_year: Option<Decimal>,

    /// Share of basis in the 15-year class
    #[arg(long)]
    pub fifteen_year: Option<Decimal>,

    /// Bonus depreciation rate for short-life classes
    #[arg(long, default_value_t = Decimal::ZERO)]
    pub bonus_rate: Decimal,

    /// Use the MACRS percentage tables for short-life classes
    #[arg(long)]
    pub macrs: bool,

    /// Month of sale in the last scheduled year
    #[arg(long)]
    pub sale_month: Option<u32>,
}

pub fn run_depreciate(args: DepreciateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let dep_input: DepreciationInput = if let Some(data) = input::load_value(args.input.as_deref())? {
        serde_json::from_value(data)?
    } else {
        let basis = args.basis.ok_or("--basis is required (or provide --input)")?;
        let cost_segregation = if args.five_year.is_some()
            || args.seven_year.is_some()
            || args.fifteen_year.is_some()
        {
            Some(CostSegregation {
                five_year: args.five_year.unwrap_or_default(),
                seven_year: args.seven_year.unwrap_or_default(),
                fifteen_year: args.fifteen_year.unwrap_or_default(),
            })
        } else {
            None
        };
        DepreciationInput {
            building_basis: basis,
            cost_segregation,
            bonus_rate: args.bonus_rate,
            short_life_method: if args.macrs {
                ShortLifeMethod::MacrsTable
            } else {
                ShortLifeMethod::StraightLine
            },
            placed_in_service_month: args.placed_month,
            years: args.years,
            disposition_month: args.sale_month,
        }
    };

    let schedule = build_depreciation_schedule(&dep_input)?;

    let mut warnings = Vec::new();
    let unrecovered = dep_input.building_basis - schedule.total_depreciation;
    if dep_input.disposition_month.is_none() && unrecovered > Decimal::ZERO {
        warnings.push(format!(
            "{unrecovered} of basis remains unrecovered after {} years",
            dep_input.years
        ));
    }

    let output = with_metadata(
        "Straight-line mid-month residential with half-year short-life classes and bonus",
        &dep_input,
        warnings,
        start.elapsed().as_micros() as u64,
        schedule,
    );
    Ok(serde_json::to_value(output)?)
}
