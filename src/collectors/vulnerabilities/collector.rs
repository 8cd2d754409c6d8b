use super::vulnerability_data::{AuditOutput, VulnerabilityReport};
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::summary::SummaryAggregator;
use crate::collectors::tool_runner::{ProcessRunner, ToolCommand, ToolFailure, ToolOutcome, ToolRunner, parse_tool_json, run_tool};
use crate::config::VulnerabilityConfig;
use chrono::Utc;
use core::time::Duration;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "     audit";

const CACHE_KEY: &str = "vulnerabilities";

#[derive(Debug)]
pub struct VulnerabilityCollector<R = ProcessRunner> {
    runner: Arc<R>,
    argv: Vec<String>,
    project_root: PathBuf,
    timeout: Duration,
    cache: CacheStore,
    cache_ttl: Duration,
    summary: Arc<SummaryAggregator>,
}

impl<R> Clone for VulnerabilityCollector<R> {
    fn clone(&self) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            argv: self.argv.clone(),
            project_root: self.project_root.clone(),
            timeout: self.timeout,
            cache: self.cache.clone(),
            cache_ttl: self.cache_ttl,
            summary: Arc::clone(&self.summary),
        }
    }
}

impl<R: ToolRunner> VulnerabilityCollector<R> {
    #[must_use]
    pub fn new(
        runner: Arc<R>,
        config: &VulnerabilityConfig,
        project_root: impl AsRef<Path>,
        cache: CacheStore,
        summary: Arc<SummaryAggregator>,
    ) -> Self {
        Self {
            runner,
            argv: config.command.clone(),
            project_root: project_root.as_ref().to_path_buf(),
            timeout: config.timeout(),
            cache,
            cache_ttl: config.cache_ttl(),
            summary,
        }
    }

    /// The latest audit, re-running the tool only when the cached one has expired
    pub async fn get_detail(&self) -> VulnerabilityReport {
        self.refresh(false).await
    }

    /// Re-run the audit if forced or if the cached result has expired, and publish its card
    ///
    /// Failed audits are published but not cached, so the next refresh tries again.
    pub async fn refresh(&self, force: bool) -> VulnerabilityReport {
        if !force && let Some(entry) = self.cache.get_fresh::<VulnerabilityReport>(CACHE_KEY, self.cache_ttl) {
            return entry.payload;
        }

        let report = self.scan().await;
        if report.failure.is_none() {
            let _ = self.cache.put(CACHE_KEY, &report);
        }

        self.summary.publish(report.summary_card());
        report
    }

    /// Run the audit tool and normalize its findings
    pub async fn scan(&self) -> VulnerabilityReport {
        let scanned_at = Utc::now();
        match self.audit().await {
            Ok(report) => report,
            Err(failure) => {
                log::warn!(target: LOG_TARGET, "Vulnerability audit failed: {failure}");
                VulnerabilityReport::failed(failure, scanned_at)
            }
        }
    }

    async fn audit(&self) -> Result<VulnerabilityReport, ToolFailure> {
        let command = ToolCommand::from_argv(&self.argv, &self.project_root, self.timeout).map_err(|e| ToolFailure::Failed {
            exit_code: None,
            output: e.to_string(),
        })?;

        let vulnerabilities = match run_tool(self.runner.as_ref(), &command).await? {
            ToolOutcome::Json(json) => parse_tool_json::<AuditOutput>(&json)?.into_vulnerabilities(),

            // The audit tool prints plain text when it has nothing to report
            ToolOutcome::NoJson { success: true, .. } => Vec::new(),

            ToolOutcome::NoJson { success: false, output } => {
                return Err(ToolFailure::Failed { exit_code: None, output });
            }
        };

        log::info!(target: LOG_TARGET, "Audit found {} vulnerabilities", vulnerabilities.len());
        Ok(VulnerabilityReport::from_vulnerabilities(vulnerabilities, Utc::now()))
    }
}
