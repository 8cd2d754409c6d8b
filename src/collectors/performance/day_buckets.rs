//! Request samples stored as one JSON-lines file per day.

use super::performance_data::RequestSample;
use crate::Result;
use chrono::{NaiveDate, TimeDelta};
use ohno::IntoAppError;
use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

const LOG_TARGET: &str = "  loadlens";

static BUCKET_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^perf_(\d{4}-\d{2}-\d{2})\.jsonl$").expect("invalid regex"));

#[derive(Debug, Clone)]
pub struct DayBuckets {
    dir: Arc<Path>,
    retention_days: u32,
}

impl DayBuckets {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, retention_days: u32) -> Self {
        Self {
            dir: Arc::from(dir.as_ref()),
            retention_days: retention_days.max(1),
        }
    }

    #[must_use]
    pub fn bucket_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("perf_{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// The oldest day still inside the retention window that ends at `today`
    #[must_use]
    pub fn oldest_retained(&self, today: NaiveDate) -> NaiveDate {
        today - TimeDelta::days(i64::from(self.retention_days) - 1)
    }

    /// Append a sample to the bucket of its own day
    ///
    /// Samples dated before the retention window are not written; returns whether the sample was
    /// stored.
    pub fn append(&self, sample: &RequestSample, today: NaiveDate) -> Result<bool> {
        let date = sample.timestamp.date_naive();
        if date < self.oldest_retained(today) {
            log::debug!(target: LOG_TARGET, "Not storing request from {date}, outside the retention window");
            return Ok(false);
        }

        fs::create_dir_all(&self.dir).into_app_err_with(|| format!("unable to create directory '{}'", self.dir.display()))?;

        let path = self.bucket_path(date);
        let mut line = serde_json::to_string(sample).into_app_err("unable to serialize request sample")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .into_app_err_with(|| format!("unable to open '{}'", path.display()))?;
        file.write_all(line.as_bytes())
            .into_app_err_with(|| format!("unable to append to '{}'", path.display()))?;

        Ok(true)
    }

    /// Bucket files on disk with their dates
    fn list(&self) -> Vec<(NaiveDate, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut buckets: Vec<(NaiveDate, PathBuf)> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name();
                let captures = BUCKET_NAME_REGEX.captures(name.to_str()?)?;
                let date = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d").ok()?;
                Some((date, entry.path()))
            })
            .collect();

        buckets.sort();
        buckets
    }

    /// Delete buckets older than the retention window, returning how many were removed
    pub fn prune(&self, today: NaiveDate) -> usize {
        let oldest = self.oldest_retained(today);
        let mut removed = 0;

        for (date, path) in self.list() {
            if date >= oldest {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    log::debug!(target: LOG_TARGET, "Removed expired bucket '{}'", path.display());
                    removed += 1;
                }
                Err(e) => log::warn!(target: LOG_TARGET, "Could not remove expired bucket '{}': {e}", path.display()),
            }
        }

        removed
    }

    /// Whether any bucket inside the retention window exists
    #[must_use]
    pub fn has_retained(&self, today: NaiveDate) -> bool {
        let oldest = self.oldest_retained(today);
        self.list().iter().any(|(date, _)| *date >= oldest)
    }

    /// Every sample inside the retention window
    ///
    /// Lines that do not parse are skipped.
    #[must_use]
    pub fn load_retained(&self, today: NaiveDate) -> Vec<RequestSample> {
        let oldest = self.oldest_retained(today);
        let mut samples = Vec::new();

        for (date, path) in self.list() {
            if date < oldest {
                continue;
            }

            let text = match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not read bucket '{}': {e}", path.display());
                    continue;
                }
            };

            for line in text.lines().filter(|line| !line.trim().is_empty()) {
                match serde_json::from_str::<RequestSample>(line) {
                    Ok(sample) => samples.push(sample),
                    Err(e) => log::warn!(target: LOG_TARGET, "Skipping malformed sample in '{}': {e}", path.display()),
                }
            }
        }

        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_on(year: i32, month: u32, day: u32) -> RequestSample {
        RequestSample {
            controller: "HomeController".to_string(),
            action: "index".to_string(),
            http_method: "GET".to_string(),
            path: "/".to_string(),
            status_code: 200,
            total_time_ms: 12.0,
            view_time_ms: 8.0,
            db_time_ms: 1.5,
            timestamp: Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap(),
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_samples_go_to_their_own_day() {
        let dir = tempfile::tempdir().unwrap();
        let buckets = DayBuckets::new(dir.path(), 7);
        let today = date(2025, 6, 10);

        assert!(buckets.append(&sample_on(2025, 6, 9), today).unwrap());
        assert!(buckets.append(&sample_on(2025, 6, 10), today).unwrap());
        assert!(buckets.append(&sample_on(2025, 6, 10), today).unwrap());

        assert!(dir.path().join("perf_2025-06-09.jsonl").exists());
        let today_text = fs::read_to_string(dir.path().join("perf_2025-06-10.jsonl")).unwrap();
        assert_eq!(today_text.lines().count(), 2);

        assert_eq!(buckets.load_retained(today).len(), 3);
    }

    #[test]
    fn test_retention_window() {
        let dir = tempfile::tempdir().unwrap();
        let buckets = DayBuckets::new(dir.path(), 7);
        let today = date(2025, 6, 10);

        assert_eq!(buckets.oldest_retained(today), date(2025, 6, 4));
        assert!(buckets.append(&sample_on(2025, 6, 4), today).unwrap());
        assert!(!buckets.append(&sample_on(2025, 6, 3), today).unwrap());
        assert!(!dir.path().join("perf_2025-06-03.jsonl").exists());
    }

    #[test]
    fn test_prune_removes_only_expired_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let buckets = DayBuckets::new(dir.path(), 7);
        let written_on = date(2025, 6, 1);

        assert!(buckets.append(&sample_on(2025, 6, 1), written_on).unwrap());
        assert!(buckets.append(&sample_on(2025, 6, 8), date(2025, 6, 8)).unwrap());
        fs::write(dir.path().join("last_position.txt"), "42").unwrap();

        let today = date(2025, 6, 10);
        assert!(buckets.has_retained(today));
        assert_eq!(buckets.prune(today), 1);
        assert!(!dir.path().join("perf_2025-06-01.jsonl").exists());
        assert!(dir.path().join("perf_2025-06-08.jsonl").exists());
        assert!(dir.path().join("last_position.txt").exists());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let buckets = DayBuckets::new(dir.path(), 7);
        let today = date(2025, 6, 10);

        assert!(buckets.append(&sample_on(2025, 6, 10), today).unwrap());
        let path = buckets.bucket_path(today);
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("{truncated\n\n");
        fs::write(&path, text).unwrap();

        assert_eq!(buckets.load_retained(today), vec![sample_on(2025, 6, 10)]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let buckets = DayBuckets::new(dir.path().join("missing"), 7);
        let today = date(2025, 6, 10);

        assert!(!buckets.has_retained(today));
        assert!(buckets.load_retained(today).is_empty());
        assert_eq!(buckets.prune(today), 0);
    }
}
