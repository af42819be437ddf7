pub mod budget;

pub use budget::{
    estimate_rehab_budget, ConditionGrade, RehabBudget, RehabCategory, RehabEstimateInput,
    RehabLineItem,
};
