pub mod analysis;
pub mod depreciation;
pub mod financing;
pub mod rehab;
pub mod returns;
