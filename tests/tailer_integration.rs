//! Integration tests for the request log tailer across restarts

use chrono::{TimeDelta, Utc};
use healthdeck::collectors::cache_doc::CacheStore;
use healthdeck::collectors::performance::{DayBuckets, POSITION_FILE, PerformanceCollector, RequestLogTailer, TailOutcome};
use healthdeck::collectors::summary::SummaryAggregator;
use healthdeck::config::PerformanceConfig;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

fn request(path: &str, controller: &str, status: u16, total_ms: f64, day_offset: i64) -> String {
    let at = (Utc::now() - TimeDelta::days(day_offset)).format("%Y-%m-%d %H:%M:%S +0000");
    format!(
        "Started GET \"{path}\" for 127.0.0.1 at {at}\n\
         Processing by {controller}#show as HTML\n\
         \x20 Rendered pages/show.html.erb within layouts/application (Duration: 1.2ms | Allocations: 300)\n\
         Completed {status} OK in {total_ms}ms (Views: 1.5ms | ActiveRecord: 0.5ms | Allocations: 1200)\n\n"
    )
}

fn append(log: &Path, text: &str) {
    let mut file = OpenOptions::new().create(true).append(true).open(log).expect("Failed to open log");
    file.write_all(text.as_bytes()).expect("Failed to append to log");
}

fn new_tailer(root: &Path) -> RequestLogTailer {
    let data_dir = root.join(".healthdeck");
    RequestLogTailer::new(root.join("log/development.log"), &data_dir, DayBuckets::new(&data_dir, 7))
}

#[test]
fn test_restart_resumes_from_saved_offset() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("log")).unwrap();
    let log = root.join("log/development.log");

    append(&log, &request("/one", "PagesController", 200, 10.0, 0));
    let first = new_tailer(root).tick().unwrap();
    assert!(matches!(first, TailOutcome::Extended { from: 0, samples: 1, .. }));

    let saved: u64 = fs::read_to_string(root.join(".healthdeck").join(POSITION_FILE))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(saved, fs::metadata(&log).unwrap().len());

    // A new tailer instance, as after a process restart, continues where the previous one stopped
    append(&log, &request("/two", "PagesController", 200, 20.0, 0));
    let second = new_tailer(root).tick().unwrap();
    assert!(matches!(second, TailOutcome::Extended { from, samples: 1, .. } if from == saved));

    assert_eq!(new_tailer(root).tick().unwrap(), TailOutcome::Unchanged);

    let samples = new_tailer(root).buckets().load_retained(Utc::now().date_naive());
    let paths: Vec<&str> = samples.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["/one", "/two"]);
}

#[test]
fn test_samples_land_in_their_day_bucket_and_expire() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("log")).unwrap();
    let log = root.join("log/development.log");

    append(&log, &request("/yesterday", "PagesController", 200, 10.0, 1));
    append(&log, &request("/today", "PagesController", 200, 10.0, 0));
    append(&log, &request("/ancient", "PagesController", 200, 10.0, 30));

    let tailer = new_tailer(root);
    assert!(matches!(tailer.tick().unwrap(), TailOutcome::Extended { samples: 2, .. }));

    let today = Utc::now().date_naive();
    assert!(tailer.buckets().bucket_path(today).exists());
    assert!(tailer.buckets().bucket_path(today - TimeDelta::days(1)).exists());
    assert!(!tailer.buckets().bucket_path(today - TimeDelta::days(30)).exists());

    let stale = tailer.buckets().bucket_path(today - TimeDelta::days(10));
    fs::write(&stale, "").unwrap();
    let _ = tailer.tick().unwrap();
    assert!(!stale.exists());
}

#[test]
fn test_performance_report_over_retained_samples() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("log")).unwrap();
    let log = root.join("log/development.log");

    for i in 0..8 {
        append(&log, &request(&format!("/fast/{i}"), "PagesController", 200, 100.0, 0));
    }
    append(&log, &request("/slow", "ReportsController", 200, 2500.0, 0));
    append(&log, &request("/broken", "ReportsController", 500, 40.0, 0));
    append(&log, "Started GET \"/orphan\" for 127.0.0.1 at 2025-06-10 10:00:00 +0000\nCompleted 200 OK in 3ms\n");

    let data_dir = root.join(".healthdeck");
    let summary = Arc::new(SummaryAggregator::new(&data_dir));
    let collector = PerformanceCollector::new(
        &PerformanceConfig::default(),
        root,
        &data_dir,
        CacheStore::new(data_dir.join("cache")),
        Arc::clone(&summary),
    );

    let report = collector.refresh(true);
    assert_eq!(report.total_requests, 10);
    assert_eq!(report.slow_requests, 1);
    assert!((report.error_rate - 10.0).abs() < f64::EPSILON);
    assert!((report.avg_response_time_ms - 334.0).abs() < f64::EPSILON);
    assert_eq!(report.recent_requests.len(), 10);

    let card = &summary.read_all()["Request Performance"];
    assert_eq!(card.display_value, "10 requests");
}
