use serde::{Deserialize, Serialize};

use crate::depreciation::ClassAmounts;
use crate::operations::CashflowYear;
use crate::tax::{DispositionResult, PassiveActivityEntry};
use crate::time_value::IrrOutcome;
use crate::types::{Money, Multiple, Rate};

/// One hold year: operations, depreciation and tax, after the fold step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyProjection {
    #[serde(flatten)]
    pub operations: CashflowYear,
    pub depreciation_by_class: ClassAmounts,
    pub bonus_depreciation: Money,
    pub depreciation: Money,
    /// NOI less interest and depreciation
    pub rental_income: Money,
    /// Effect on the investor's taxable income after the passive rules
    pub taxable_income: Money,
    pub suspended_loss_in: Money,
    pub suspended_loss_out: Money,
    /// Positive is tax owed, negative is a tax saving
    pub tax_liability: Money,
    pub cash_flow_after_tax: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProformaSummary {
    pub purchase_price: Money,
    pub loan_amount: Money,
    pub down_payment: Money,
    pub closing_costs: Money,
    pub points_cost: Money,
    pub rehab_cost: Money,
    pub rehab_months: u32,
    pub total_initial_investment: Money,
    pub depreciable_basis: Money,
    pub pre_tax_irr: IrrOutcome,
    pub after_tax_irr: IrrOutcome,
    pub pre_tax_equity_multiple: Option<Multiple>,
    pub after_tax_equity_multiple: Option<Multiple>,
    pub average_cap_rate: Rate,
    pub average_cash_on_cash: Rate,
    pub pre_tax_profit: Money,
    pub after_tax_profit: Money,
    pub total_depreciation: Money,
    /// Tax saved by operating losses over the hold, net of tax on profits
    pub total_operating_tax_benefit: Money,
    /// Balance released at the sale
    pub suspended_losses_at_exit: Money,
    /// Operating tax plus tax on sale; negative means the deal saved tax
    pub net_tax_impact: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub yearly_projections: Vec<YearlyProjection>,
    pub passive_ledger: Vec<PassiveActivityEntry>,
    pub depreciation_allocation: ClassAmounts,
    pub disposition: DispositionResult,
    /// Year 0 outlay, then each year's CFBT; sale proceeds in the last year
    pub pre_tax_cash_flows: Vec<Money>,
    pub after_tax_cash_flows: Vec<Money>,
    pub summary: ProformaSummary,
}
