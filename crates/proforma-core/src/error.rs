use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProformaError {
    #[error("Invalid assumption: {field}: {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Invalid cost allocation for {class}: {reason}")]
    InvalidAllocation { class: String, reason: String },

    #[error("Invalid loan term: {field}: {reason}")]
    InvalidTerm { field: String, reason: String },

    #[error("Adjusted basis would be negative ({adjusted_basis}); depreciation exceeds original basis")]
    NegativeBasis { adjusted_basis: Decimal },

    #[error("No real IRR: net present value never changes sign across {periods} cash flows")]
    NoRealIrr { periods: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProformaError {
    pub(crate) fn assumption(field: &str, reason: impl Into<String>) -> Self {
        ProformaError::InvalidAssumption {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ProformaError {
    fn from(e: serde_json::Error) -> Self {
        ProformaError::Serialization(e.to_string())
    }
}
