use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::DealAssumptions;
use crate::error::ProformaError;
use crate::financing::DebtYear;
use crate::rehab::RehabBudget;
use crate::types::{compound, round_money, round_ratio, Money, Rate};
use crate::ProformaResult;

/// Operating results for one hold year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowYear {
    pub year: u32,
    /// Months the unit was rent-producing
    pub rent_months: u32,
    pub gross_rent: Money,
    pub vacancy_loss: Money,
    pub other_income: Money,
    pub effective_gross_income: Money,
    pub property_tax: Money,
    pub insurance: Money,
    pub hoa: Money,
    pub maintenance: Money,
    pub management: Money,
    pub capex_reserve: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub principal: Money,
    pub interest: Money,
    pub debt_service: Money,
    pub cash_flow_before_tax: Money,
    pub cap_rate: Rate,
    pub cash_on_cash: Rate,
    /// `None` when there is no debt service
    pub dscr: Option<Decimal>,
    pub property_value: Money,
    pub loan_balance: Money,
    pub equity: Money,
}

/// Project one year's operating cash flow.
///
/// Every line escalates from its year-1 amount by its own growth rate. In
/// year 1 rent and other income are pro-rated for rehab downtime; fixed
/// costs (tax, insurance, HOA, debt service) run the full year.
pub fn project_cashflow(
    deal: &DealAssumptions,
    rehab: &RehabBudget,
    initial_equity: Money,
    year: u32,
    debt: &DebtYear,
) -> ProformaResult<CashflowYear> {
    let elapsed = year.saturating_sub(1);
    let income = &deal.income;
    let expenses = &deal.expenses;

    let (rent_months, collectible) = if year == 1 {
        (rehab.rent_months(), rehab.rent_fraction())
    } else {
        (12, Decimal::ONE)
    };

    let rent_factor = growth("income.rent_growth", income.rent_growth, elapsed)?;
    let tax_factor = growth(
        "expenses.property_tax_growth",
        expenses.property_tax_growth,
        elapsed,
    )?;
    let expense_factor = growth("expenses.expense_growth", expenses.expense_growth, elapsed)?;

    let annual_rent = income.monthly_market_rent * Decimal::from(12);
    let gross_rent = product("income.rent_growth", &[annual_rent, rent_factor, collectible])?;
    let vacancy_loss = product("income.vacancy_rate", &[gross_rent, income.vacancy_rate])?;
    let other_income = product(
        "income.rent_growth",
        &[income.other_income, rent_factor, collectible],
    )?;
    let effective_gross_income =
        total("income.rent_growth", &[gross_rent, -vacancy_loss, other_income])?;

    let annual_hoa = expenses.hoa_monthly * Decimal::from(12);
    let property_tax = product(
        "expenses.property_tax_growth",
        &[expenses.property_tax, tax_factor],
    )?;
    let insurance = product("expenses.expense_growth", &[expenses.insurance, expense_factor])?;
    let hoa = product("expenses.expense_growth", &[annual_hoa, expense_factor])?;
    let maintenance = product("expenses.maintenance_pct", &[gross_rent, expenses.maintenance_pct])?;
    let management = product("expenses.management_pct", &[gross_rent, expenses.management_pct])?;
    let capex_reserve = product(
        "expenses.capex_reserve_pct",
        &[gross_rent, expenses.capex_reserve_pct],
    )?;
    let operating_expenses = total(
        "expenses.expense_growth",
        &[property_tax, insurance, hoa, maintenance, management, capex_reserve],
    )?;

    let noi = total("income.rent_growth", &[effective_gross_income, -operating_expenses])?;
    let cash_flow_before_tax = total("income.rent_growth", &[noi, -debt.debt_service])?;

    let price = deal.purchase.purchase_price;
    let cap_rate = ratio("purchase.purchase_price", noi, price)?;
    let cash_on_cash = if initial_equity > Decimal::ZERO {
        ratio("financing.down_payment_pct", cash_flow_before_tax, initial_equity)?
    } else {
        Decimal::ZERO
    };
    let dscr = if debt.debt_service > Decimal::ZERO {
        Some(ratio("financing", noi, debt.debt_service)?)
    } else {
        None
    };

    let value_factor = growth("exit.appreciation_rate", deal.exit.appreciation_rate, year)?;
    let property_value = product("exit.appreciation_rate", &[price, value_factor])?;
    let equity = total("exit.appreciation_rate", &[property_value, -debt.ending_balance])?;

    Ok(CashflowYear {
        year,
        rent_months,
        gross_rent,
        vacancy_loss,
        other_income,
        effective_gross_income,
        property_tax,
        insurance,
        hoa,
        maintenance,
        management,
        capex_reserve,
        operating_expenses,
        noi,
        principal: debt.principal,
        interest: debt.interest,
        debt_service: debt.debt_service,
        cash_flow_before_tax,
        cap_rate,
        cash_on_cash,
        dscr,
        property_value,
        loan_balance: debt.ending_balance,
        equity,
    })
}

fn growth(field: &str, rate: Rate, periods: u32) -> ProformaResult<Decimal> {
    compound(rate, periods).ok_or_else(|| {
        ProformaError::assumption(field, format!("Growth over {periods} years overflows"))
    })
}

/// Cent-rounded product of `terms`, failing on overflow.
fn product(field: &str, terms: &[Decimal]) -> ProformaResult<Money> {
    terms
        .iter()
        .try_fold(Decimal::ONE, |acc, t| acc.checked_mul(*t))
        .map(round_money)
        .ok_or_else(|| ProformaError::assumption(field, "Projected amount overflows"))
}

fn ratio(field: &str, numerator: Money, denominator: Money) -> ProformaResult<Decimal> {
    numerator
        .checked_div(denominator)
        .map(round_ratio)
        .ok_or_else(|| ProformaError::assumption(field, "Ratio overflows"))
}

fn total(field: &str, terms: &[Money]) -> ProformaResult<Money> {
    terms
        .iter()
        .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(*t))
        .ok_or_else(|| ProformaError::assumption(field, "Projected amount overflows"))
}
