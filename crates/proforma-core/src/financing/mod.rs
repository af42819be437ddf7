pub mod amortization;

pub use amortization::{
    amortization_schedule, monthly_payment, yearly_summary, AmortizationSchedule,
    AmortizationType, DebtYear, LoanTerms, MAX_LOAN_TERM_YEARS,
};
