use crate::Result;
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::coverage::{CoverageCollector, CoverageOutcome};
use crate::collectors::gems::{GemMetadataFetcher, GemReport};
use crate::collectors::logs::{LogGrowthMonitor, LogSummary, TruncateError, TruncateReport};
use crate::collectors::performance::{PerformanceCollector, PerformanceReport, TailOutcome};
use crate::collectors::style::{StyleCollector, StyleReport};
use crate::collectors::summary::{SummaryAggregate, SummaryAggregator};
use crate::collectors::todos::{TodoReport, TodoScanner};
use crate::collectors::tool_runner::{ProcessRunner, ToolRunner};
use crate::collectors::vulnerabilities::{VulnerabilityCollector, VulnerabilityReport};
use crate::config::Config;
use clap::ValueEnum;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum::{Display, EnumIter, EnumString};

const LOG_TARGET: &str = " dashboard";

/// Subdirectory of the data directory holding the per-collector cache entries
pub const CACHE_DIR: &str = "cache";

/// One of the dashboard's collectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CollectorKind {
    Vulnerabilities,
    Style,
    Coverage,
    Todos,
    Logs,
    Performance,
    Gems,
}

/// The results of one full refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub vulnerabilities: VulnerabilityReport,
    pub style: StyleReport,
    pub coverage: CoverageOutcome,
    pub todos: TodoReport,
    pub logs: LogSummary,
    pub performance: PerformanceReport,
    pub gems: GemReport,
    pub summary: SummaryAggregate,
}

/// One instance of every collector over a shared data directory
#[derive(Debug)]
pub struct Dashboard<R = ProcessRunner> {
    project_root: PathBuf,
    data_dir: PathBuf,
    summary: Arc<SummaryAggregator>,
    vulnerabilities: VulnerabilityCollector<R>,
    style: StyleCollector<R>,
    coverage: CoverageCollector,
    todos: TodoScanner,
    logs: LogGrowthMonitor,
    performance: PerformanceCollector,
    gems: GemMetadataFetcher,
}

impl Dashboard<ProcessRunner> {
    /// A dashboard whose tools run as child processes
    pub fn new(config: &Config, project_root: impl AsRef<Path>) -> Result<Self> {
        Self::with_runner(Arc::new(ProcessRunner), config, project_root)
    }
}

impl<R: ToolRunner + 'static> Dashboard<R> {
    pub fn with_runner(runner: Arc<R>, config: &Config, project_root: impl AsRef<Path>) -> Result<Self> {
        let project_root = project_root.as_ref().to_path_buf();
        let data_dir = config.data_dir_in(&project_root);
        fs::create_dir_all(&data_dir).into_app_err_with(|| format!("unable to create data directory '{}'", data_dir.display()))?;

        let summary = Arc::new(SummaryAggregator::new(&data_dir));
        let cache = CacheStore::new(data_dir.join(CACHE_DIR));

        let mut todos = TodoScanner::new(&config.todos, &project_root, cache.clone(), Arc::clone(&summary));
        if config.data_dir.is_relative() {
            todos = todos.exclude_dir(config.data_dir.as_str());
        }

        log::debug!(target: LOG_TARGET, "Collecting for '{}' into '{}'", project_root.display(), data_dir.display());

        Ok(Self {
            vulnerabilities: VulnerabilityCollector::new(
                Arc::clone(&runner),
                &config.vulnerabilities,
                &project_root,
                cache.clone(),
                Arc::clone(&summary),
            ),
            style: StyleCollector::new(runner, &config.style, &project_root, cache.clone(), Arc::clone(&summary)),
            coverage: CoverageCollector::new(&config.coverage, &project_root, cache.clone(), Arc::clone(&summary)),
            todos,
            logs: LogGrowthMonitor::new(&config.logs, &project_root, cache.clone(), Arc::clone(&summary)),
            performance: PerformanceCollector::new(&config.performance, &project_root, &data_dir, cache, Arc::clone(&summary)),
            gems: GemMetadataFetcher::new(&config.gems, &project_root, &data_dir, Arc::clone(&summary))?,
            project_root,
            data_dir,
            summary,
        })
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Refresh every collector concurrently
    ///
    /// Tool and registry collectors run on the async runtime, filesystem collectors on blocking
    /// threads. Collection failures are part of the individual reports.
    pub async fn refresh_all(&self, force: bool) -> Result<DashboardSnapshot> {
        let coverage = self.coverage.clone();
        let todos = self.todos.clone();
        let logs = self.logs.clone();
        let performance = self.performance.clone();

        let (vulnerabilities, style, gems, coverage, todos, logs, performance) = tokio::join!(
            self.vulnerabilities.refresh(force),
            self.style.refresh(force),
            self.gems.refresh(force),
            tokio::task::spawn_blocking(move || coverage.refresh(force)),
            tokio::task::spawn_blocking(move || todos.refresh(force)),
            tokio::task::spawn_blocking(move || logs.refresh(force)),
            tokio::task::spawn_blocking(move || performance.refresh(force)),
        );

        Ok(DashboardSnapshot {
            vulnerabilities,
            style,
            gems,
            coverage: coverage.into_app_err("coverage collector panicked")?,
            todos: todos.into_app_err("TODO scanner panicked")?,
            logs: logs.into_app_err("log monitor panicked")?,
            performance: performance.into_app_err("performance collector panicked")?,
            summary: self.summary.read_all(),
        })
    }

    /// The stored summary aggregate
    #[must_use]
    pub fn summary(&self) -> SummaryAggregate {
        self.summary.read_all()
    }

    /// The detail payload of one collector, refreshed only if its cache has expired
    pub async fn detail(&self, kind: CollectorKind) -> Result<serde_json::Value> {
        let value = match kind {
            CollectorKind::Vulnerabilities => serde_json::to_value(self.vulnerabilities.get_detail().await),
            CollectorKind::Style => serde_json::to_value(self.style.get_detail().await),
            CollectorKind::Gems => serde_json::to_value(self.gems.get_detail().await),
            CollectorKind::Coverage => {
                let coverage = self.coverage.clone();
                serde_json::to_value(blocking(move || coverage.get_detail()).await?)
            }
            CollectorKind::Todos => {
                let todos = self.todos.clone();
                serde_json::to_value(blocking(move || todos.get_detail()).await?)
            }
            CollectorKind::Logs => {
                let logs = self.logs.clone();
                serde_json::to_value(blocking(move || logs.get_detail()).await?)
            }
            CollectorKind::Performance => {
                let performance = self.performance.clone();
                serde_json::to_value(blocking(move || performance.get_detail()).await?)
            }
        };

        value.into_app_err_with(|| format!("unable to serialize {kind} detail"))
    }

    /// Empty one log file in place
    pub async fn truncate_log(&self, name: &str) -> Result<Result<TruncateReport, TruncateError>> {
        let logs = self.logs.clone();
        let name = name.to_string();
        blocking(move || logs.truncate(&name)).await
    }

    /// Run one request-log tailer tick
    pub async fn tail_requests(&self) -> Result<TailOutcome> {
        let performance = self.performance.clone();
        blocking(move || performance.tail()).await?
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.into_app_err("blocking collector task panicked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::summary::CardStatus;
    use crate::collectors::tool_runner::{RawOutput, ScriptedRunner};
    use strum::IntoEnumIterator;

    fn dashboard(root: &Path) -> Dashboard<ScriptedRunner> {
        let runner = ScriptedRunner::new()
            .with_response("bundle", Ok(RawOutput::new(r#"{"version":"0.9.2","results":[]}"#, 0)))
            .with_response("standardrb", Ok(RawOutput::new("", 0)));

        let mut config = Config::default();
        config.gems.registry_url = "http://127.0.0.1:9".to_string();
        Dashboard::with_runner(Arc::new(runner), &config, root).unwrap()
    }

    #[test]
    fn test_collector_kind_names() {
        let names: Vec<String> = CollectorKind::iter().map(|kind| kind.to_string()).collect();
        assert_eq!(names, vec!["vulnerabilities", "style", "coverage", "todos", "logs", "performance", "gems"]);
        assert_eq!("todos".parse::<CollectorKind>().unwrap(), CollectorKind::Todos);
    }

    #[tokio::test]
    async fn test_refresh_all_in_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = dashboard(dir.path());

        let snapshot = dashboard.refresh_all(false).await.unwrap();
        assert_eq!(snapshot.vulnerabilities.total, 0);
        assert!(snapshot.style.error_message.is_none());
        assert!(matches!(snapshot.coverage, CoverageOutcome::SetupRequired { .. }));
        assert_eq!(snapshot.todos.total_count, 0);
        assert!(snapshot.logs.files.is_empty());
        assert_eq!(snapshot.performance.total_requests, 0);
        assert!(snapshot.gems.gems.is_empty());

        assert_eq!(snapshot.summary.len(), 7);
        for card in snapshot.summary.values() {
            assert_ne!(card.status, CardStatus::Danger, "{} should not be danger", card.title);
        }
        assert_eq!(dashboard.summary(), snapshot.summary);
    }

    #[tokio::test]
    async fn test_data_dir_is_not_scanned_for_markers() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = dashboard(dir.path());
        fs::write(dashboard.data_dir().join("notes.json"), "\"TODO: not a project marker\"").unwrap();
        fs::write(dir.path().join("app.rb"), "# TODO: real marker\n").unwrap();

        let detail = dashboard.detail(CollectorKind::Todos).await.unwrap();
        assert_eq!(detail["total_count"], 1);
        assert_eq!(detail["items"][0]["file_path"], "app.rb");
    }

    #[tokio::test]
    async fn test_truncate_and_tail() {
        let dir = tempfile::tempdir().unwrap();
        let dashboard = dashboard(dir.path());

        assert_eq!(dashboard.tail_requests().await.unwrap(), TailOutcome::SourceMissing);

        fs::create_dir_all(dir.path().join("log")).unwrap();
        fs::write(dir.path().join("log/development.log"), "Completed 200 OK in 5ms\n").unwrap();
        assert!(matches!(dashboard.tail_requests().await.unwrap(), TailOutcome::Extended { samples: 0, .. }));

        let report = dashboard.truncate_log("development").await.unwrap().unwrap();
        assert_eq!(report.filename, "development.log");
        assert_eq!(fs::metadata(dir.path().join("log/development.log")).unwrap().len(), 0);

        let rejected = dashboard.truncate_log("../secrets").await.unwrap();
        assert!(matches!(rejected, Err(TruncateError::InvalidName { .. })));
    }
}
