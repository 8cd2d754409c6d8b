use super::style_data::{LintOutput, StyleReport};
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::summary::SummaryAggregator;
use crate::collectors::tool_runner::{ProcessRunner, ToolCommand, ToolFailure, ToolOutcome, ToolRunner, parse_tool_json, run_tool};
use crate::config::StyleConfig;
use chrono::Utc;
use core::time::Duration;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "     style";

const CACHE_KEY: &str = "style";

#[derive(Debug)]
pub struct StyleCollector<R = ProcessRunner> {
    runner: Arc<R>,
    argv: Vec<String>,
    project_root: PathBuf,
    timeout: Duration,
    cache: CacheStore,
    cache_ttl: Duration,
    summary: Arc<SummaryAggregator>,
}

impl<R> Clone for StyleCollector<R> {
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

impl<R: ToolRunner> StyleCollector<R> {
    #[must_use]
    pub fn new(
        runner: Arc<R>,
        config: &StyleConfig,
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

    pub async fn get_detail(&self) -> StyleReport {
        self.refresh(false).await
    }

    /// Re-run the linter if forced or if the cached result has expired, and publish its card
    pub async fn refresh(&self, force: bool) -> StyleReport {
        if !force && let Some(entry) = self.cache.get_fresh::<StyleReport>(CACHE_KEY, self.cache_ttl) {
            return entry.payload;
        }

        let report = self.scan().await;
        if report.error_message.is_none() {
            let _ = self.cache.put(CACHE_KEY, &report);
        }

        self.summary.publish(report.summary_card());
        report
    }

    /// Run the linter and summarize its offenses
    pub async fn scan(&self) -> StyleReport {
        let analyzed_at = Utc::now();
        match self.lint().await {
            Ok(report) => report,
            Err(failure @ ToolFailure::Unavailable { .. }) => {
                log::warn!(target: LOG_TARGET, "Style analysis skipped: {failure}");
                StyleReport::setup_needed(failure.to_string(), analyzed_at)
            }
            Err(failure) => {
                log::warn!(target: LOG_TARGET, "Style analysis failed: {failure}");
                StyleReport::error(failure.to_string(), analyzed_at)
            }
        }
    }

    async fn lint(&self) -> Result<StyleReport, ToolFailure> {
        let command = ToolCommand::from_argv(&self.argv, &self.project_root, self.timeout).map_err(|e| ToolFailure::Failed {
            exit_code: None,
            output: e.to_string(),
        })?;

        match run_tool(self.runner.as_ref(), &command).await? {
            ToolOutcome::Json(json) => {
                let report = parse_tool_json::<LintOutput>(&json)?.into_report(Utc::now());
                log::info!(target: LOG_TARGET,
                    "Linter reported {} offenses in {} files",
                    report.total_offenses,
                    report.files_analyzed
                );
                Ok(report)
            }
            ToolOutcome::NoJson { success: true, .. } => Ok(StyleReport::clean(Utc::now())),
            ToolOutcome::NoJson { success: false, output } => Err(ToolFailure::Failed { exit_code: None, output }),
        }
    }
}
