use super::coverage_data::{CoverageFile, CoverageOutcome, CoverageReport, TestFramework};
use super::resultset::{ResultSet, merge_suites};
use crate::Result;
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::path_utils::relative_slash_path;
use crate::collectors::summary::SummaryAggregator;
use crate::config::CoverageConfig;
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::IntoAppError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "  coverage";

const CACHE_KEY: &str = "coverage";

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone)]
pub struct CoverageCollector {
    project_root: PathBuf,
    resultset_path: PathBuf,
    excluded_path_fragments: Vec<String>,
    stale_after: Duration,
    cache: CacheStore,
    cache_ttl: Duration,
    summary: Arc<SummaryAggregator>,
}

impl CoverageCollector {
    #[must_use]
    pub fn new(config: &CoverageConfig, project_root: impl AsRef<Path>, cache: CacheStore, summary: Arc<SummaryAggregator>) -> Self {
        let project_root = project_root.as_ref().to_path_buf();
        Self {
            resultset_path: project_root.join(&config.resultset_path),
            project_root,
            excluded_path_fragments: config.excluded_path_fragments.clone(),
            stale_after: config.stale_after(),
            cache,
            cache_ttl: config.cache_ttl(),
            summary,
        }
    }

    pub fn get_detail(&self) -> CoverageOutcome {
        self.refresh(false)
    }

    /// Evaluate coverage and publish its card
    ///
    /// A cached report is reused while it is fresh and was built from the result file currently
    /// on disk. Staleness of the result file itself is always judged against the current time.
    pub fn refresh(&self, force: bool) -> CoverageOutcome {
        let outcome = self.evaluate(!force);
        self.summary.publish(outcome.summary_card(Utc::now()));
        outcome
    }

    /// Parse the result file without consulting the cache
    pub fn scan(&self) -> CoverageOutcome {
        self.evaluate(false)
    }

    fn evaluate(&self, use_cache: bool) -> CoverageOutcome {
        let Some(modified) = self.resultset_modified() else {
            log::info!(target: LOG_TARGET, "No coverage results at '{}'", self.resultset_path.display());
            return CoverageOutcome::setup_required(self.detect_framework());
        };

        let cached = if use_cache {
            self.cache
                .get_fresh::<CoverageReport>(CACHE_KEY, self.cache_ttl)
                .map(|entry| entry.payload)
                .filter(|report| report.source_data_timestamp == modified)
        } else {
            None
        };

        let report = match cached {
            Some(report) => report,
            None => match self.parse(modified) {
                Ok(report) => {
                    let _ = self.cache.put(CACHE_KEY, &report);
                    report
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not parse coverage results: {e}");
                    return CoverageOutcome::Failed {
                        message: format!("failed to parse coverage data: {e}"),
                    };
                }
            },
        };

        self.judge_staleness(report, Utc::now())
    }

    fn judge_staleness(&self, report: CoverageReport, now: DateTime<Utc>) -> CoverageOutcome {
        let age = now.signed_duration_since(report.source_data_timestamp).to_std().unwrap_or_default();
        if age > self.stale_after {
            let age_hours = (age.as_secs_f64() / SECONDS_PER_HOUR * 10.0).round() / 10.0;
            log::debug!(target: LOG_TARGET, "Coverage results are {age_hours} hours old");
            CoverageOutcome::Stale { report, age_hours }
        } else {
            CoverageOutcome::Report(report)
        }
    }

    fn resultset_modified(&self) -> Option<DateTime<Utc>> {
        let metadata = fs::metadata(&self.resultset_path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        metadata.modified().ok().map(DateTime::<Utc>::from)
    }

    fn parse(&self, modified: DateTime<Utc>) -> Result<CoverageReport> {
        log::info!(target: LOG_TARGET, "Parsing coverage results at '{}'", self.resultset_path.display());

        let text = fs::read_to_string(&self.resultset_path)
            .into_app_err_with(|| format!("unable to read '{}'", self.resultset_path.display()))?;
        let resultset: ResultSet =
            serde_json::from_str(&text).into_app_err_with(|| format!("unable to parse '{}'", self.resultset_path.display()))?;

        let per_file: Vec<CoverageFile> = merge_suites(resultset)
            .into_iter()
            .filter_map(|(path, hits)| {
                let relative = relative_slash_path(&self.project_root, Path::new(&path));
                (!self.is_excluded(&relative)).then(|| CoverageFile::from_hits(relative, &hits))
            })
            .collect();

        let report = CoverageReport::from_files(per_file, modified);
        log::debug!(target: LOG_TARGET,
            "Processed {} files, {}% coverage",
            report.files_count,
            report.overall_percentage
        );
        Ok(report)
    }

    /// Whether an excluded fragment starts one of the path's segments
    fn is_excluded(&self, relative_path: &str) -> bool {
        self.excluded_path_fragments
            .iter()
            .any(|fragment| relative_path.starts_with(fragment.as_str()) || relative_path.contains(&format!("/{fragment}")))
    }

    fn detect_framework(&self) -> TestFramework {
        if self.project_root.join("spec").is_dir() {
            TestFramework::Rspec
        } else if self.project_root.join("test").is_dir() {
            TestFramework::Minitest
        } else {
            TestFramework::Custom
        }
    }
}
