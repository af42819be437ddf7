pub mod assumptions;
pub mod investor;
pub mod rules;

pub use assumptions::{
    DealAssumptions, DepreciationAssumptions, ExitAssumptions, ExpenseAssumptions, FinancingTerms,
    IncomeAssumptions, PurchaseAssumptions,
};
pub use investor::{FilingStatus, InvestorTaxProfile};
pub use rules::TaxRules;
