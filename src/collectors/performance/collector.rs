use super::day_buckets::DayBuckets;
use super::performance_data::PerformanceReport;
use super::tailer::{RequestLogTailer, TailOutcome};
use crate::Result;
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::summary::SummaryAggregator;
use crate::config::PerformanceConfig;
use chrono::Utc;
use core::time::Duration;
use std::path::Path;
use std::sync::Arc;

const LOG_TARGET: &str = "  loadlens";

const CACHE_KEY: &str = "performance";

/// Rolling request metrics built from the tailed request log
#[derive(Debug, Clone)]
pub struct PerformanceCollector {
    tailer: RequestLogTailer,
    bootstrap_lines: usize,
    slow_request_ms: u64,
    recent_request_count: usize,
    cache: CacheStore,
    cache_ttl: Duration,
    summary: Arc<SummaryAggregator>,
}

impl PerformanceCollector {
    #[must_use]
    pub fn new(
        config: &PerformanceConfig,
        project_root: impl AsRef<Path>,
        data_dir: impl AsRef<Path>,
        cache: CacheStore,
        summary: Arc<SummaryAggregator>,
    ) -> Self {
        let data_dir = data_dir.as_ref();
        let buckets = DayBuckets::new(data_dir, config.retention_days);

        Self {
            tailer: RequestLogTailer::new(project_root.as_ref().join(&config.log_file), data_dir, buckets),
            bootstrap_lines: config.bootstrap_lines,
            slow_request_ms: config.slow_request_ms,
            recent_request_count: config.recent_request_count,
            cache,
            cache_ttl: config.cache_ttl(),
            summary,
        }
    }

    #[must_use]
    pub const fn tailer(&self) -> &RequestLogTailer {
        &self.tailer
    }

    pub fn get_detail(&self) -> PerformanceReport {
        self.refresh(false)
    }

    /// Run one tailer tick
    pub fn tail(&self) -> Result<TailOutcome> {
        self.tailer.tick()
    }

    /// Tail the log and recompute the report if forced or if the cached report has expired
    ///
    /// A failed tick is logged and the report is built from whatever was stored before it.
    pub fn refresh(&self, force: bool) -> PerformanceReport {
        if !force && let Some(entry) = self.cache.get_fresh::<PerformanceReport>(CACHE_KEY, self.cache_ttl) {
            return entry.payload;
        }

        if let Err(e) = self.tail() {
            log::warn!(target: LOG_TARGET, "Could not tail '{}': {e}", self.tailer.log_path().display());
        }

        let report = self.get_performance_data();
        let _ = self.cache.put(CACHE_KEY, &report);
        self.summary.publish(report.summary_card());
        report
    }

    /// Aggregate every retained sample
    ///
    /// When nothing has been stored yet the tail end of the live log is parsed instead, so a
    /// first run already shows recent traffic.
    #[must_use]
    pub fn get_performance_data(&self) -> PerformanceReport {
        let now = Utc::now();
        let today = now.date_naive();

        let mut samples = self.tailer.buckets().load_retained(today);
        if samples.is_empty() && !self.tailer.buckets().has_retained(today) {
            samples = self.tailer.bootstrap_samples(self.bootstrap_lines);
        }

        log::debug!(target: LOG_TARGET, "Aggregating {} request samples", samples.len());
        PerformanceReport::from_samples(samples, self.slow_request_ms, self.recent_request_count, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::summary::CardStatus;
    use crate::collectors::performance::PerformanceStatus;
    use std::fs;

    fn collector(root: &Path) -> (PerformanceCollector, Arc<SummaryAggregator>) {
        let data_dir = root.join(".healthdeck");
        let summary = Arc::new(SummaryAggregator::new(&data_dir));
        let collector = PerformanceCollector::new(
            &PerformanceConfig::default(),
            root,
            &data_dir,
            CacheStore::new(data_dir.join("cache")),
            Arc::clone(&summary),
        );
        (collector, summary)
    }

    fn request(path: &str, status: u16, total_ms: u32) -> String {
        let today = Utc::now().format("%Y-%m-%d");
        format!(
            "Started GET \"{path}\" for 127.0.0.1 at {today} 08:00:00 +0000\n\
             Processing by PagesController#show as HTML\n\
             Completed {status} OK in {total_ms}ms (Views: 1.0ms | ActiveRecord: 2.0ms)\n"
        )
    }

    #[test]
    fn test_no_log_is_info() {
        let dir = tempfile::tempdir().unwrap();
        let (collector, summary) = collector(dir.path());

        let report = collector.refresh(true);
        assert_eq!(report.total_requests, 0);
        assert_eq!(report.status, PerformanceStatus::Info);
        assert_eq!(summary.read_all()["Request Performance"].status, CardStatus::Info);
    }

    #[test]
    fn test_refresh_tails_and_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("log")).unwrap();
        let text = format!("{}{}", request("/a", 200, 10), request("/b", 500, 30));
        fs::write(dir.path().join("log/development.log"), text).unwrap();

        let (collector, summary) = collector(dir.path());
        let report = collector.refresh(false);

        assert_eq!(report.total_requests, 2);
        assert!((report.avg_response_time_ms - 20.0).abs() < f64::EPSILON);
        assert!((report.error_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.status, PerformanceStatus::Error);
        assert_eq!(summary.read_all()["Request Performance"].display_value, "2 requests");

        // Cached until forced
        fs::write(dir.path().join("log/development.log"), "").unwrap();
        assert_eq!(collector.get_detail().total_requests, 2);
    }

    #[test]
    fn test_bootstrap_when_nothing_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("log")).unwrap();
        fs::write(dir.path().join("log/development.log"), request("/a", 200, 10)).unwrap();

        let (collector, _) = collector(dir.path());
        let report = collector.get_performance_data();
        assert_eq!(report.total_requests, 1);
        assert_eq!(collector.tailer().position(), 0);
    }
}
