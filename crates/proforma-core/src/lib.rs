pub mod deal;
pub mod depreciation;
pub mod error;
pub mod financing;
pub mod operations;
pub mod proforma;
pub mod rehab;
pub mod tax;
pub mod time_value;
pub mod types;

pub use error::ProformaError;
pub use proforma::{analyze_deal, run_proforma};
pub use types::*;

/// Standard result type for all proforma operations
pub type ProformaResult<T> = Result<T, ProformaError>;
