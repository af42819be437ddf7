//! Federal and state income tax treatment of the rental activity: the
//! passive-activity loss rules while the property is held, and the sale.

pub mod disposition;
pub mod passive;

pub use disposition::{analyze_disposition, DispositionInput, DispositionResult};
pub use passive::{
    apply_passive_rules, taxable_rental_income, PassiveActivityEntry, SuspendedLossState,
};
