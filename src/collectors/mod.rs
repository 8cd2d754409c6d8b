//! Signal collectors and the storage they share.
//!
//! Every collector follows the same cycle: serve its cached result while that is fresh,
//! otherwise go to its source (an external tool, the filesystem, the request log, or the package
//! registry), normalize what it finds, cache it, and publish a [`summary::SummaryCard`] into the
//! shared [`summary::SummaryAggregator`]. Collection failures end up as typed states inside the
//! reports and never escape a collector.
//!
//! [`dashboard::Dashboard`] owns one instance of each collector and drives them together.

pub mod cache_doc;
pub mod cache_lock;
pub mod coverage;
pub mod dashboard;
pub mod gems;
pub mod logs;
pub mod path_utils;
pub mod performance;
pub mod style;
pub mod summary;
pub mod todos;
pub mod tool_runner;
pub mod vulnerabilities;
