//! Request performance from the development request log.
//!
//! The tailer follows the log from a persisted byte offset, reassembles finished requests and
//! stores them in day buckets. The collector aggregates the retained buckets into a report.

mod collector;
mod day_buckets;
mod line_parser;
mod performance_data;
mod tailer;

pub use collector::PerformanceCollector;
pub use day_buckets::DayBuckets;
pub use line_parser::RequestParser;
pub use performance_data::{PerformanceReport, PerformanceStatus, RequestSample};
pub use tailer::{POSITION_FILE, RequestLogTailer, TAIL_LOCK_FILE, TailOutcome};
