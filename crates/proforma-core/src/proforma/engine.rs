use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::{DealAssumptions, InvestorTaxProfile};
use crate::depreciation::{build_depreciation_schedule, DepreciationInput, DepreciationSchedule};
use crate::error::ProformaError;
use crate::financing::{amortization_schedule, yearly_summary, DebtYear, LoanTerms};
use crate::operations::project_cashflow;
use crate::proforma::results::{AnalysisResult, ProformaSummary, YearlyProjection};
use crate::rehab::{estimate_rehab_budget, RehabBudget, RehabEstimateInput};
use crate::tax::{
    analyze_disposition, apply_passive_rules, taxable_rental_income, DispositionInput,
    PassiveActivityEntry, SuspendedLossState,
};
use crate::time_value::{return_metrics, IrrOutcome};
use crate::types::{compound, round_money, round_ratio, with_metadata, ComputationOutput, Money};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Where the rehab plan comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RehabSource {
    /// Estimate from square footage, age and condition grade
    Estimate(RehabEstimateInput),
    /// A budget the caller already has
    Budget(RehabBudget),
}

impl RehabSource {
    pub fn resolve(&self) -> ProformaResult<RehabBudget> {
        match self {
            RehabSource::Estimate(input) => estimate_rehab_budget(input),
            RehabSource::Budget(budget) => Ok(budget.clone()),
        }
    }
}

/// Everything needed to analyse one deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysisInput {
    pub assumptions: DealAssumptions,
    pub investor: InvestorTaxProfile,
    /// Absent means a turnkey property
    #[serde(default)]
    pub rehab: Option<RehabSource>,
}

#[derive(Serialize)]
struct RunAssumptions<'a> {
    deal: &'a DealAssumptions,
    investor: &'a InvestorTaxProfile,
    rehab: &'a RehabBudget,
}

/// Schedules seeded once per run and read by every fold step.
struct FoldContext<'a> {
    deal: &'a DealAssumptions,
    investor: &'a InvestorTaxProfile,
    rehab: &'a RehabBudget,
    initial_equity: Money,
    debt: &'a [DebtYear],
    depreciation: &'a DepreciationSchedule,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve the rehab plan and run the proforma.
pub fn analyze_deal(input: &DealAnalysisInput) -> ProformaResult<ComputationOutput<AnalysisResult>> {
    let rehab = match &input.rehab {
        Some(source) => source.resolve()?,
        None => RehabBudget::turnkey(),
    };
    run_proforma(&input.assumptions, &input.investor, &rehab)
}

/// Run the multi-year proforma for one deal.
///
/// Debt, depreciation and rehab are seeded once. The hold years are then a
/// sequential fold: each year's cash flow feeds the passive-loss rules,
/// whose suspended balance is carried into the next year and finally
/// released at the sale. Returns are solved over the assembled pre-tax and
/// after-tax flow series.
pub fn run_proforma(
    deal: &DealAssumptions,
    investor: &InvestorTaxProfile,
    rehab: &RehabBudget,
) -> ProformaResult<ComputationOutput<AnalysisResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    deal.validate()?;
    investor.validate()?;
    rehab.validate()?;
    collect_input_warnings(deal, &mut warnings);

    let hold = deal.hold_period_years;
    let rehab_cost = rehab.total_cost();
    let initial_equity = deal.initial_equity(rehab_cost);
    let depreciable_basis = deal.depreciable_basis(rehab_cost);

    let debt = debt_by_year(deal)?;
    let depreciation = build_depreciation_schedule(&DepreciationInput {
        building_basis: depreciable_basis,
        cost_segregation: deal.depreciation.cost_segregation.clone(),
        bonus_rate: deal.bonus_rate(&investor.rules),
        short_life_method: deal.depreciation.short_life_method,
        placed_in_service_month: deal.placed_in_service_month(),
        years: hold,
        disposition_month: Some(deal.exit.sale_month),
    })?;

    let ctx = FoldContext {
        deal,
        investor,
        rehab,
        initial_equity,
        debt: &debt,
        depreciation: &depreciation,
    };

    let (projections, passive_ledger, suspended) = (1..=hold).try_fold(
        (Vec::new(), Vec::new(), SuspendedLossState::default()),
        |(mut projections, mut ledger, state), year| {
            let (projection, entry, next) = project_year(&ctx, year, state)?;
            projections.push(projection);
            ledger.push(entry);
            Ok::<_, ProformaError>((projections, ledger, next))
        },
    )?;

    // --- Disposition ---
    let sale_price = exit_sale_price(&ctx, &mut warnings)?;
    let loan_payoff = debt.last().map(|d| d.ending_balance).unwrap_or_default();
    let disposition = analyze_disposition(
        &DispositionInput {
            sale_year: hold,
            sale_price,
            selling_costs_pct: deal.exit.selling_costs_pct,
            loan_payoff,
            original_basis: deal.total_basis(rehab_cost),
            accumulated_depreciation: depreciation.cumulative_through(hold),
            suspended,
        },
        investor,
    )?;
    if disposition.gross_equity_proceeds < Decimal::ZERO {
        warnings.push(format!(
            "Sale proceeds do not cover the loan payoff: {} short at closing",
            -disposition.gross_equity_proceeds
        ));
    }

    // --- Returns ---
    let mut pre_tax_cash_flows = vec![-initial_equity];
    let mut after_tax_cash_flows = vec![-initial_equity];
    for p in &projections {
        pre_tax_cash_flows.push(p.operations.cash_flow_before_tax);
        after_tax_cash_flows.push(p.cash_flow_after_tax);
    }
    if let Some(last) = pre_tax_cash_flows.last_mut() {
        *last += disposition.gross_equity_proceeds;
    }
    if let Some(last) = after_tax_cash_flows.last_mut() {
        *last += disposition.after_tax_proceeds;
    }

    let pre_tax = return_metrics(&pre_tax_cash_flows)?;
    let after_tax = return_metrics(&after_tax_cash_flows)?;
    for (label, outcome) in [("Pre-tax", pre_tax.irr), ("After-tax", after_tax.irr)] {
        if outcome == IrrOutcome::NoRealIrr {
            log::warn!("{label} cash flows never break even: no real IRR");
            warnings.push(format!(
                "{label} IRR: cash flows never break even, no real IRR in the search range"
            ));
        }
    }

    collect_operating_warnings(&projections, &mut warnings);

    let years = Decimal::from(hold);
    let operating_tax: Money = projections.iter().map(|p| p.tax_liability).sum();
    let summary = ProformaSummary {
        purchase_price: deal.purchase.purchase_price,
        loan_amount: deal.loan_amount(),
        down_payment: deal.down_payment(),
        closing_costs: deal.purchase.closing_costs,
        points_cost: deal.points_cost(),
        rehab_cost,
        rehab_months: rehab.rehab_months.min(12),
        total_initial_investment: initial_equity,
        depreciable_basis,
        pre_tax_irr: pre_tax.irr,
        after_tax_irr: after_tax.irr,
        pre_tax_equity_multiple: pre_tax.equity_multiple,
        after_tax_equity_multiple: after_tax.equity_multiple,
        average_cap_rate: round_ratio(
            projections.iter().map(|p| p.operations.cap_rate).sum::<Decimal>() / years,
        ),
        average_cash_on_cash: round_ratio(
            projections.iter().map(|p| p.operations.cash_on_cash).sum::<Decimal>() / years,
        ),
        pre_tax_profit: pre_tax.net_profit,
        after_tax_profit: after_tax.net_profit,
        total_depreciation: depreciation.total_depreciation,
        total_operating_tax_benefit: -operating_tax,
        suspended_losses_at_exit: disposition.suspended_loss_released,
        net_tax_impact: operating_tax + disposition.total_tax,
    };

    log::info!(
        "Proforma complete: {} years, after-tax IRR {:?}, net tax impact {}",
        hold,
        summary.after_tax_irr,
        summary.net_tax_impact
    );

    let result = AnalysisResult {
        yearly_projections: projections,
        passive_ledger,
        depreciation_allocation: depreciation.allocated_basis,
        disposition,
        pre_tax_cash_flows,
        after_tax_cash_flows,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Residential Rental Proforma (after-tax, IRC 469 passive activity rules)",
        &RunAssumptions {
            deal,
            investor,
            rehab,
        },
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Fold step
// ---------------------------------------------------------------------------

/// One hold year. Depends only on the seeded schedules and the suspended
/// balance coming in.
fn project_year(
    ctx: &FoldContext<'_>,
    year: u32,
    state: SuspendedLossState,
) -> ProformaResult<(YearlyProjection, PassiveActivityEntry, SuspendedLossState)> {
    let index = (year - 1) as usize;
    let debt = ctx
        .debt
        .get(index)
        .cloned()
        .unwrap_or_else(|| DebtYear::no_debt(year));
    let dep = ctx.depreciation.years.get(index);
    let depreciation = dep.map(|d| d.total).unwrap_or_default();

    let operations = project_cashflow(ctx.deal, ctx.rehab, ctx.initial_equity, year, &debt)?;
    let rental_income = taxable_rental_income(operations.noi, operations.interest, depreciation);
    let (entry, next) = apply_passive_rules(year, rental_income, ctx.investor, state);

    log::debug!(
        "Year {year}: NOI {}, depreciation {}, rental income {}, suspended {} -> {}",
        operations.noi,
        depreciation,
        rental_income,
        entry.suspended_in,
        entry.suspended_out
    );

    let cash_flow_after_tax = operations.cash_flow_before_tax - entry.tax_liability;
    let projection = YearlyProjection {
        operations,
        depreciation_by_class: dep.map(|d| d.deductions).unwrap_or_default(),
        bonus_depreciation: dep.map(|d| d.bonus).unwrap_or_default(),
        depreciation,
        rental_income,
        taxable_income: entry.taxable_income,
        suspended_loss_in: entry.suspended_in,
        suspended_loss_out: entry.suspended_out,
        tax_liability: entry.tax_liability,
        cash_flow_after_tax,
    };
    Ok((projection, entry, next))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn debt_by_year(deal: &DealAssumptions) -> ProformaResult<Vec<DebtYear>> {
    let hold = deal.hold_period_years;
    if deal.financing.is_all_cash() {
        return Ok((1..=hold).map(DebtYear::no_debt).collect());
    }
    let principal = deal.loan_amount();
    let schedule = amortization_schedule(&LoanTerms {
        principal,
        annual_rate: deal.financing.interest_rate,
        term_years: deal.financing.term_years,
        amortization: deal.financing.amortization,
        first_payment_offset_months: deal.financing.first_payment_offset_months,
    })?;
    Ok(yearly_summary(&schedule, principal, hold))
}

/// Forward NOI capitalised at the exit cap rate, or the purchase price
/// grown by appreciation over the hold.
fn exit_sale_price(ctx: &FoldContext<'_>, warnings: &mut Vec<String>) -> ProformaResult<Money> {
    let deal = ctx.deal;
    let hold = deal.hold_period_years;
    match deal.exit.exit_cap_rate {
        Some(cap) => {
            let forward = project_cashflow(
                deal,
                ctx.rehab,
                ctx.initial_equity,
                hold + 1,
                &DebtYear::no_debt(hold + 1),
            )?;
            if forward.noi <= Decimal::ZERO {
                warnings.push(format!(
                    "Forward NOI {} is not positive; exit value floored at zero",
                    forward.noi
                ));
                return Ok(Decimal::ZERO);
            }
            forward.noi.checked_div(cap).map(round_money).ok_or_else(|| {
                ProformaError::assumption("exit.exit_cap_rate", "Exit value overflows")
            })
        }
        None => compound(deal.exit.appreciation_rate, hold)
            .and_then(|factor| deal.purchase.purchase_price.checked_mul(factor))
            .map(round_money)
            .ok_or_else(|| {
                ProformaError::assumption("exit.appreciation_rate", "Appreciation overflows")
            }),
    }
}

fn collect_input_warnings(deal: &DealAssumptions, warnings: &mut Vec<String>) {
    let ltv = Decimal::ONE - deal.financing.down_payment_pct;
    if ltv > dec!(0.80) {
        warnings.push(format!(
            "Loan-to-value {:.1}% exceeds 80%, expect mortgage insurance or a rate premium",
            ltv * dec!(100)
        ));
    }
    if deal.income.vacancy_rate > dec!(0.15) {
        warnings.push(format!(
            "Vacancy rate {:.1}% exceeds 15%, above typical market norms",
            deal.income.vacancy_rate * dec!(100)
        ));
    }
    if let Some(cap) = deal.exit.exit_cap_rate {
        if cap < dec!(0.03) {
            warnings.push(format!(
                "Exit cap rate {cap} is below 3%, verify market data"
            ));
        }
    }
}

fn collect_operating_warnings(projections: &[YearlyProjection], warnings: &mut Vec<String>) {
    for p in projections {
        let ops = &p.operations;
        if let Some(dscr) = ops.dscr {
            if dscr < Decimal::ONE {
                log::warn!("Year {}: NOI does not cover debt service (DSCR {dscr})", ops.year);
            }
            if dscr < dec!(1.20) {
                warnings.push(format!(
                    "Year {} DSCR {dscr}x is below 1.20x, lender covenant risk",
                    ops.year
                ));
            }
        }
        if ops.cash_flow_before_tax < Decimal::ZERO {
            warnings.push(format!(
                "Year {} cash flow before tax is negative ({})",
                ops.year, ops.cash_flow_before_tax
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::assumptions::tests::sample_deal;
    use crate::deal::{FilingStatus, TaxRules};
    use rust_decimal_macros::dec;

    fn investor(agi: Money) -> InvestorTaxProfile {
        InvestorTaxProfile {
            filing_status: FilingStatus::MarriedFilingJointly,
            agi,
            marginal_ordinary_rate: dec!(0.35),
            ltcg_rate: dec!(0.20),
            state_rate: dec!(0.093),
            niit_applicable: true,
            real_estate_professional: false,
            other_passive_income: Decimal::ZERO,
            rules: TaxRules::default(),
        }
    }

    #[test]
    fn test_projection_length_matches_hold() {
        let out = run_proforma(&sample_deal(), &investor(dec!(400000)), &RehabBudget::turnkey()).unwrap();
        assert_eq!(out.result.yearly_projections.len(), 5);
        assert_eq!(out.result.passive_ledger.len(), 5);
        assert_eq!(out.result.pre_tax_cash_flows.len(), 6);
        assert_eq!(out.result.pre_tax_cash_flows[0], dec!(-125000));
    }

    #[test]
    fn test_suspended_balance_threads_between_years() {
        let out = run_proforma(&sample_deal(), &investor(dec!(400000)), &RehabBudget::turnkey()).unwrap();
        let years = &out.result.yearly_projections;
        for pair in years.windows(2) {
            assert_eq!(pair[0].suspended_loss_out, pair[1].suspended_loss_in);
        }
        assert_eq!(years[0].suspended_loss_in, Decimal::ZERO);
        assert_eq!(
            out.result.disposition.suspended_loss_released,
            years[4].suspended_loss_out
        );
    }

    #[test]
    fn test_sale_price_from_appreciation() {
        let out = run_proforma(&sample_deal(), &investor(dec!(400000)), &RehabBudget::turnkey()).unwrap();
        // 500,000 * 1.03^5
        assert_eq!(out.result.disposition.sale_price, dec!(579637.04));
    }

    #[test]
    fn test_sale_price_from_exit_cap() {
        let mut deal = sample_deal();
        deal.exit.exit_cap_rate = Some(dec!(0.05));
        let ctx_out = run_proforma(&deal, &investor(dec!(400000)), &RehabBudget::turnkey()).unwrap();
        let year5_noi = ctx_out.result.yearly_projections[4].operations.noi;
        let sale = ctx_out.result.disposition.sale_price;
        // Forward NOI grows on year 5, so the price exceeds year-5 NOI / cap
        assert!(sale > year5_noi / dec!(0.05));
    }

    #[test]
    fn test_invalid_deal_propagates() {
        let mut deal = sample_deal();
        deal.hold_period_years = 0;
        assert!(matches!(
            run_proforma(&deal, &investor(dec!(400000)), &RehabBudget::turnkey()),
            Err(ProformaError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_runaway_rent_growth_returns_error() {
        let mut deal = sample_deal();
        deal.income.rent_growth = dec!(2.5);
        deal.hold_period_years = 50;
        assert!(matches!(
            run_proforma(&deal, &investor(dec!(400000)), &RehabBudget::turnkey()),
            Err(ProformaError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_rehab_source_estimate() {
        let input: DealAnalysisInput = serde_json::from_value(serde_json::json!({
            "assumptions": serde_json::to_value(sample_deal()).unwrap(),
            "investor": serde_json::to_value(investor(dec!(90000))).unwrap(),
            "rehab": {
                "source": "estimate",
                "square_feet": "1500",
                "year_built": 2005,
                "condition_grade": "MEDIUM"
            }
        }))
        .unwrap();
        let out = analyze_deal(&input).unwrap();
        assert_eq!(out.result.summary.rehab_cost, dec!(31500));
        assert_eq!(out.result.summary.rehab_months, 3);
        assert_eq!(out.result.yearly_projections[0].operations.rent_months, 9);
    }
}
