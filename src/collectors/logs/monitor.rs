use super::log_data::{LogFile, LogStatus, LogSummary, LogThresholds, TruncateError, TruncateReport, human_size};
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::path_utils::is_plain_file_name;
use crate::collectors::summary::SummaryAggregator;
use crate::config::LogConfig;
use chrono::{DateTime, Utc};
use core::time::Duration;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "      logs";

const CACHE_KEY: &str = "logs";

const LOG_EXTENSION: &str = ".log";

/// Watches the size of the project's log files
#[derive(Debug, Clone)]
pub struct LogGrowthMonitor {
    log_dir: PathBuf,
    display_dir: String,
    thresholds: LogThresholds,
    cache: CacheStore,
    cache_ttl: Duration,
    summary: Arc<SummaryAggregator>,
}

impl LogGrowthMonitor {
    #[must_use]
    pub fn new(config: &LogConfig, project_root: impl AsRef<Path>, cache: CacheStore, summary: Arc<SummaryAggregator>) -> Self {
        Self {
            log_dir: project_root.as_ref().join(&config.directory),
            display_dir: config.directory.to_string(),
            thresholds: LogThresholds::from_config(config),
            cache,
            cache_ttl: config.cache_ttl(),
            summary,
        }
    }

    pub fn get_detail(&self) -> LogSummary {
        self.refresh(false)
    }

    /// Rescan if forced or if the cached scan has expired, and publish the card
    pub fn refresh(&self, force: bool) -> LogSummary {
        if !force && let Some(entry) = self.cache.get_fresh::<LogSummary>(CACHE_KEY, self.cache_ttl) {
            return entry.payload;
        }

        let summary = self.scan();
        let _ = self.cache.put(CACHE_KEY, &summary);
        self.summary.publish(summary.summary_card());
        summary
    }

    /// List the `*.log` files in the log directory
    ///
    /// A missing directory is an empty, healthy summary.
    pub fn scan(&self) -> LogSummary {
        let scanned_at = Utc::now();
        let entries = match fs::read_dir(&self.log_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "No log directory at '{}': {e}", self.log_dir.display());
                return LogSummary::from_files(&self.display_dir, Vec::new(), &self.thresholds, scanned_at);
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping unreadable entry in '{}': {e}", self.log_dir.display());
                    continue;
                }
            };

            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(LOG_EXTENSION) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) if metadata.is_file() => {
                    let size_bytes = metadata.len();
                    files.push(LogFile {
                        filename,
                        size_bytes,
                        size_human: human_size(size_bytes),
                        last_modified: metadata.modified().map_or(scanned_at, DateTime::<Utc>::from),
                        writable: !metadata.permissions().readonly(),
                        status: self.thresholds.file_status(size_bytes),
                    });
                }
                Ok(_) => {}
                Err(e) => log::warn!(target: LOG_TARGET, "Skipping '{filename}': {e}"),
            }
        }

        let summary = LogSummary::from_files(&self.display_dir, files, &self.thresholds, scanned_at);
        if summary.status != LogStatus::Ok {
            log::info!(target: LOG_TARGET,
                "Log directory '{}' holds {} ({})",
                self.log_dir.display(),
                summary.total_size_human,
                summary.status
            );
        }
        summary
    }

    /// Empty one log file in place
    ///
    /// `name` must be a bare file name inside the log directory; `.log` is appended when
    /// missing. Names are validated before the filesystem is touched. On success the directory
    /// is rescanned so the cache and the summary card reflect the new size.
    pub fn truncate(&self, name: &str) -> Result<TruncateReport, TruncateError> {
        let name = name.trim();
        if !is_plain_file_name(name) {
            log::warn!(target: LOG_TARGET, "Refusing to truncate '{name}'");
            return Err(TruncateError::InvalidName { name: name.to_string() });
        }

        let filename = if name.ends_with(LOG_EXTENSION) {
            name.to_string()
        } else {
            format!("{name}{LOG_EXTENSION}")
        };
        let path = self.log_dir.join(&filename);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(TruncateError::NotFound { filename }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(TruncateError::NotFound { filename }),
            Err(e) => {
                return Err(TruncateError::Io {
                    filename,
                    message: e.to_string(),
                });
            }
        };

        if metadata.permissions().readonly() {
            return Err(TruncateError::NotWritable { filename });
        }

        let file = match OpenOptions::new().write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return Err(TruncateError::NotWritable { filename }),
            Err(e) => {
                return Err(TruncateError::Io {
                    filename,
                    message: e.to_string(),
                });
            }
        };

        file.set_len(0).map_err(|e| TruncateError::Io {
            filename: filename.clone(),
            message: e.to_string(),
        })?;

        log::info!(target: LOG_TARGET, "Truncated '{}' ({} freed)", path.display(), human_size(metadata.len()));

        let _ = self.refresh(true);

        Ok(TruncateReport {
            filename,
            previous_size_bytes: metadata.len(),
            truncated_at: Utc::now(),
        })
    }
}
