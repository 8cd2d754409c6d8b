//! Size and growth of the project's log files, plus in-place truncation.

mod log_data;
mod monitor;

pub use log_data::{LogFile, LogStatus, LogSummary, LogThresholds, TruncateError, TruncateReport, human_size};
pub use monitor::LogGrowthMonitor;
