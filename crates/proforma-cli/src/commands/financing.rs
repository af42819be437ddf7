use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use proforma_core::financing::{
    amortization_schedule, yearly_summary, AmortizationType, DebtYear, LoanTerms,
};
use proforma_core::financing::amortization::AmortizationPayment;
use proforma_core::{with_metadata, Money};

use crate::input;

/// Arguments for a loan amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON loan terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual interest rate as a decimal (0.07 = 7%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term_years: Option<u32>,

    /// Interest-only with a balloon at maturity
    #[arg(long)]
    pub interest_only: bool,

    /// Months between closing and the first payment
    #[arg(long, default_value_t = 0)]
    pub offset_months: u32,

    /// Years to roll up (defaults to the loan term)
    #[arg(long)]
    pub years: Option<u32>,

    /// Include every monthly payment, not just the yearly roll-up
    #[arg(long)]
    pub monthly: bool,
}

#[derive(Serialize)]
struct AmortizationReport {
    periodic_payment: Money,
    total_interest: Money,
    total_principal: Money,
    yearly: Vec<DebtYear>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payments: Option<Vec<AmortizationPayment>>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let terms: LoanTerms = if let Some(data) = input::load_value(args.input.as_deref())? {
        serde_json::from_value(data)?
    } else {
        LoanTerms {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            term_years: args
                .term_years
                .ok_or("--term-years is required (or provide --input)")?,
            amortization: if args.interest_only {
                AmortizationType::InterestOnly
            } else {
                AmortizationType::Amortizing
            },
            first_payment_offset_months: args.offset_months,
        }
    };

    let schedule = amortization_schedule(&terms)?;
    let years = args.years.unwrap_or(terms.term_years + 1);
    let report = AmortizationReport {
        periodic_payment: schedule.periodic_payment,
        total_interest: schedule.total_interest,
        total_principal: schedule.total_principal,
        yearly: yearly_summary(&schedule, terms.principal, years),
        payments: args.monthly.then(|| schedule.payments.clone()),
    };

    let mut warnings = Vec::new();
    if terms.annual_rate > Decimal::new(15, 2) {
        warnings.push(format!(
            "Interest rate {} is above 15%, verify the rate is a decimal",
            terms.annual_rate
        ));
    }

    let output = with_metadata(
        "Fixed-rate monthly amortization, interest rounded per period",
        &terms,
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    );
    Ok(serde_json::to_value(output)?)
}
