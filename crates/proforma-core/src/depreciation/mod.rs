pub mod macrs;
pub mod schedule;

pub use schedule::{
    build_depreciation_schedule, AssetClass, ClassAmounts, CostSegregation, DepreciationInput,
    DepreciationSchedule, ShortLifeMethod, YearlyDepreciation,
};
