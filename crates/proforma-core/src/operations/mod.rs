pub mod cashflow;

pub use cashflow::{project_cashflow, CashflowYear};
