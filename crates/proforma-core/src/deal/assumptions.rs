use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::rules::TaxRules;
use crate::depreciation::schedule::{CostSegregation, ShortLifeMethod};
use crate::error::ProformaError;
use crate::financing::amortization::AmortizationType;
use crate::types::{round_money, Money, Rate};
use crate::ProformaResult;

pub const MAX_HOLD_YEARS: u32 = 50;
pub const MAX_LOAN_TERM_YEARS: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseAssumptions {
    pub purchase_price: Money,
    /// Non-depreciable land portion of the price
    pub land_value: Money,
    /// Depreciable structure portion of the price
    pub building_value: Money,
    /// Buyer closing costs, capitalised into basis
    #[serde(default)]
    pub closing_costs: Money,
    /// Drives the mid-month convention and the bonus-rate table lookup
    pub placed_in_service: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingTerms {
    /// Down payment as a fraction of price; 1.0 is an all-cash purchase
    pub down_payment_pct: Rate,
    pub interest_rate: Rate,
    pub term_years: u32,
    #[serde(default)]
    pub amortization: AmortizationType,
    /// Points paid at closing as a fraction of the loan (0.01 = one point)
    #[serde(default)]
    pub points: Rate,
    /// Months between closing and the first scheduled payment
    #[serde(default)]
    pub first_payment_offset_months: u32,
}

impl FinancingTerms {
    pub fn is_all_cash(&self) -> bool {
        self.down_payment_pct >= Decimal::ONE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeAssumptions {
    pub monthly_market_rent: Money,
    pub rent_growth: Rate,
    pub vacancy_rate: Rate,
    /// Annual laundry, parking and similar income
    #[serde(default)]
    pub other_income: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseAssumptions {
    /// Year-1 annual property tax
    pub property_tax: Money,
    pub property_tax_growth: Rate,
    /// Year-1 annual insurance premium
    pub insurance: Money,
    #[serde(default)]
    pub hoa_monthly: Money,
    /// Escalation for insurance and HOA dues
    pub expense_growth: Rate,
    /// Percent-of-gross-rent expenses
    pub maintenance_pct: Rate,
    pub management_pct: Rate,
    pub capex_reserve_pct: Rate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepreciationAssumptions {
    /// Absent means 100% of the building stays on the 27.5-year schedule
    #[serde(default)]
    pub cost_segregation: Option<CostSegregation>,
    /// Explicit bonus rate; falls back to the placed-in-service year table
    #[serde(default)]
    pub bonus_rate: Option<Rate>,
    #[serde(default)]
    pub short_life_method: ShortLifeMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitAssumptions {
    /// Annual appreciation of the property value
    pub appreciation_rate: Rate,
    /// When set, sale price is forward NOI capitalised at this rate
    #[serde(default)]
    pub exit_cap_rate: Option<Rate>,
    pub selling_costs_pct: Rate,
    /// Month of the final hold year in which the sale closes
    #[serde(default = "default_sale_month")]
    pub sale_month: u32,
}

fn default_sale_month() -> u32 {
    12
}

/// Static deal assumptions, fully resolved by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAssumptions {
    pub purchase: PurchaseAssumptions,
    pub financing: FinancingTerms,
    pub hold_period_years: u32,
    pub income: IncomeAssumptions,
    pub expenses: ExpenseAssumptions,
    #[serde(default)]
    pub depreciation: DepreciationAssumptions,
    pub exit: ExitAssumptions,
}

impl DealAssumptions {
    pub fn validate(&self) -> ProformaResult<()> {
        if self.hold_period_years < 1 || self.hold_period_years > MAX_HOLD_YEARS {
            return Err(ProformaError::assumption(
                "hold_period_years",
                format!("Hold period must be between 1 and {MAX_HOLD_YEARS} years"),
            ));
        }

        let p = &self.purchase;
        if p.purchase_price <= Decimal::ZERO {
            return Err(ProformaError::assumption(
                "purchase.purchase_price",
                "Purchase price must be positive",
            ));
        }
        non_negative("purchase.land_value", p.land_value)?;
        non_negative("purchase.building_value", p.building_value)?;
        non_negative("purchase.closing_costs", p.closing_costs)?;
        if p.land_value + p.building_value != p.purchase_price {
            return Err(ProformaError::assumption(
                "purchase.land_value",
                format!(
                    "Land ({}) plus building ({}) must equal purchase price ({})",
                    p.land_value, p.building_value, p.purchase_price
                ),
            ));
        }

        let f = &self.financing;
        unit_rate("financing.down_payment_pct", f.down_payment_pct)?;
        unit_rate("financing.points", f.points)?;
        if !f.is_all_cash() {
            if f.interest_rate > Decimal::ONE {
                return Err(ProformaError::assumption(
                    "financing.interest_rate",
                    "Interest rate must not exceed 100%",
                ));
            }
            if f.term_years > MAX_LOAN_TERM_YEARS {
                return Err(ProformaError::assumption(
                    "financing.term_years",
                    format!("Loan term cannot exceed {MAX_LOAN_TERM_YEARS} years"),
                ));
            }
            if f.first_payment_offset_months > 11 {
                return Err(ProformaError::assumption(
                    "financing.first_payment_offset_months",
                    "First payment must fall within the first year",
                ));
            }
        }

        let i = &self.income;
        non_negative("income.monthly_market_rent", i.monthly_market_rent)?;
        non_negative("income.other_income", i.other_income)?;
        unit_rate("income.vacancy_rate", i.vacancy_rate)?;
        growth_rate("income.rent_growth", i.rent_growth)?;

        let e = &self.expenses;
        non_negative("expenses.property_tax", e.property_tax)?;
        non_negative("expenses.insurance", e.insurance)?;
        non_negative("expenses.hoa_monthly", e.hoa_monthly)?;
        growth_rate("expenses.property_tax_growth", e.property_tax_growth)?;
        growth_rate("expenses.expense_growth", e.expense_growth)?;
        unit_rate("expenses.maintenance_pct", e.maintenance_pct)?;
        unit_rate("expenses.management_pct", e.management_pct)?;
        unit_rate("expenses.capex_reserve_pct", e.capex_reserve_pct)?;

        if let Some(bonus) = self.depreciation.bonus_rate {
            unit_rate("depreciation.bonus_rate", bonus)?;
        }

        let x = &self.exit;
        growth_rate("exit.appreciation_rate", x.appreciation_rate)?;
        unit_rate("exit.selling_costs_pct", x.selling_costs_pct)?;
        if let Some(cap) = x.exit_cap_rate {
            if cap <= Decimal::ZERO || cap > Decimal::ONE {
                return Err(ProformaError::assumption(
                    "exit.exit_cap_rate",
                    "Exit cap rate must be in (0, 1]",
                ));
            }
        }
        if !(1..=12).contains(&x.sale_month) {
            return Err(ProformaError::assumption(
                "exit.sale_month",
                "Sale month must be between 1 and 12",
            ));
        }

        Ok(())
    }

    pub fn loan_amount(&self) -> Money {
        if self.financing.is_all_cash() {
            return Decimal::ZERO;
        }
        round_money(self.purchase.purchase_price * (Decimal::ONE - self.financing.down_payment_pct))
    }

    pub fn down_payment(&self) -> Money {
        self.purchase.purchase_price - self.loan_amount()
    }

    pub fn points_cost(&self) -> Money {
        round_money(self.loan_amount() * self.financing.points)
    }

    /// Cash invested at closing: down payment, closing costs, points and rehab.
    pub fn initial_equity(&self, rehab_cost: Money) -> Money {
        self.down_payment() + self.purchase.closing_costs + self.points_cost() + rehab_cost
    }

    /// Cost basis of the whole property including capitalised rehab.
    pub fn total_basis(&self, rehab_cost: Money) -> Money {
        self.purchase.purchase_price + self.purchase.closing_costs + rehab_cost
    }

    /// Building share of the price; closing costs are allocated pro rata.
    pub fn building_share(&self) -> Rate {
        self.purchase.building_value / self.purchase.purchase_price
    }

    /// Depreciable basis: building, its share of closing costs, and rehab
    /// (which is entirely building improvement).
    pub fn depreciable_basis(&self, rehab_cost: Money) -> Money {
        let closing_share = round_money(self.purchase.closing_costs * self.building_share());
        self.purchase.building_value + closing_share + rehab_cost
    }

    pub fn placed_in_service_month(&self) -> u32 {
        self.purchase.placed_in_service.month()
    }

    pub fn bonus_rate(&self, rules: &TaxRules) -> Rate {
        self.depreciation
            .bonus_rate
            .unwrap_or_else(|| rules.bonus_rate_for_year(self.purchase.placed_in_service.year()))
    }
}

fn non_negative(field: &str, value: Money) -> ProformaResult<()> {
    if value < Decimal::ZERO {
        return Err(ProformaError::assumption(field, "Value cannot be negative"));
    }
    Ok(())
}

fn unit_rate(field: &str, value: Rate) -> ProformaResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ProformaError::assumption(field, "Rate must be between 0 and 1"));
    }
    Ok(())
}

fn growth_rate(field: &str, value: Rate) -> ProformaResult<()> {
    if value <= Decimal::NEGATIVE_ONE {
        return Err(ProformaError::assumption(
            field,
            "Growth rate must be greater than -100%",
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// $500k single-family rental, 25% down at 7% over 30 years.
    pub(crate) fn sample_deal() -> DealAssumptions {
        DealAssumptions {
            purchase: PurchaseAssumptions {
                purchase_price: dec!(500000),
                land_value: dec!(100000),
                building_value: dec!(400000),
                closing_costs: Decimal::ZERO,
                placed_in_service: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            },
            financing: FinancingTerms {
                down_payment_pct: dec!(0.25),
                interest_rate: dec!(0.07),
                term_years: 30,
                amortization: AmortizationType::Amortizing,
                points: Decimal::ZERO,
                first_payment_offset_months: 0,
            },
            hold_period_years: 5,
            income: IncomeAssumptions {
                monthly_market_rent: dec!(3500),
                rent_growth: dec!(0.03),
                vacancy_rate: dec!(0.05),
                other_income: Decimal::ZERO,
            },
            expenses: ExpenseAssumptions {
                property_tax: dec!(6000),
                property_tax_growth: dec!(0.02),
                insurance: dec!(2400),
                hoa_monthly: Decimal::ZERO,
                expense_growth: dec!(0.03),
                maintenance_pct: dec!(0.05),
                management_pct: dec!(0.08),
                capex_reserve_pct: dec!(0.05),
            },
            depreciation: DepreciationAssumptions {
                cost_segregation: None,
                bonus_rate: Some(Decimal::ZERO),
                short_life_method: ShortLifeMethod::StraightLine,
            },
            exit: ExitAssumptions {
                appreciation_rate: dec!(0.03),
                exit_cap_rate: None,
                selling_costs_pct: dec!(0.06),
                sale_month: 12,
            },
        }
    }

    #[test]
    fn test_sample_deal_is_valid() {
        assert!(sample_deal().validate().is_ok());
    }

    #[test]
    fn test_loan_and_equity() {
        let deal = sample_deal();
        assert_eq!(deal.loan_amount(), dec!(375000));
        assert_eq!(deal.down_payment(), dec!(125000));
        assert_eq!(deal.initial_equity(dec!(50000)), dec!(175000));
    }

    #[test]
    fn test_all_cash_has_no_loan() {
        let mut deal = sample_deal();
        deal.financing.down_payment_pct = Decimal::ONE;
        assert_eq!(deal.loan_amount(), Decimal::ZERO);
        assert_eq!(deal.initial_equity(Decimal::ZERO), dec!(500000));
    }

    #[test]
    fn test_closing_costs_split_into_basis() {
        let mut deal = sample_deal();
        deal.purchase.closing_costs = dec!(10000);
        // 80% building share of 10k closing costs
        assert_eq!(deal.depreciable_basis(dec!(20000)), dec!(428000));
        assert_eq!(deal.total_basis(dec!(20000)), dec!(530000));
    }

    #[test]
    fn test_zero_hold_period_rejected() {
        let mut deal = sample_deal();
        deal.hold_period_years = 0;
        let err = deal.validate().unwrap_err();
        match err {
            ProformaError::InvalidAssumption { field, .. } => {
                assert_eq!(field, "hold_period_years");
            }
            other => panic!("Expected InvalidAssumption, got {other:?}"),
        }
    }

    #[test]
    fn test_land_building_must_sum_to_price() {
        let mut deal = sample_deal();
        deal.purchase.land_value = dec!(150000);
        assert!(matches!(
            deal.validate(),
            Err(ProformaError::InvalidAssumption { .. })
        ));
    }

    #[test]
    fn test_vacancy_above_one_rejected() {
        let mut deal = sample_deal();
        deal.income.vacancy_rate = dec!(1.5);
        assert!(deal.validate().is_err());
    }

    #[test]
    fn test_bonus_rate_falls_back_to_table() {
        let mut deal = sample_deal();
        deal.depreciation.bonus_rate = None;
        deal.purchase.placed_in_service = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(deal.bonus_rate(&TaxRules::default()), dec!(0.60));
    }
}
