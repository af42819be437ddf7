pub mod engine;
pub mod results;

pub use engine::{analyze_deal, run_proforma, DealAnalysisInput, RehabSource};
pub use results::{AnalysisResult, ProformaSummary, YearlyProjection};
