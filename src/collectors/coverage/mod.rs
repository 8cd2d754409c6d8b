//! Line coverage from the test suite's result file.

mod collector;
mod coverage_data;
mod resultset;

pub use collector::CoverageCollector;
pub use coverage_data::{CoverageFile, CoverageOutcome, CoverageReport, Grade, SetupGuide, TestFramework};
