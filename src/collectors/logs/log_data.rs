use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use crate::config::LogConfig;
use chrono::{DateTime, Utc};
use core::fmt;
use serde::{Deserialize, Serialize};
use strum::Display;

pub const CARD_TITLE: &str = "Log Files";
const CARD_ICON: &str = "file-text";
const CARD_URL: &str = "/healthdeck/logs/size";

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count as `"%.1f <unit>"` using powers of 1024; plain bytes have no decimal
#[must_use]
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{size:.1} {}", SIZE_UNITS[unit])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogStatus {
    Ok,
    Warning,
    Danger,
}

/// Size limits, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogThresholds {
    pub warning_bytes: u64,
    pub danger_bytes: u64,
    pub aggregate_warning_bytes: u64,
    pub aggregate_danger_bytes: u64,
    pub danger_file_count: usize,
}

impl LogThresholds {
    #[must_use]
    pub const fn from_config(config: &LogConfig) -> Self {
        Self {
            warning_bytes: config.warning_bytes(),
            danger_bytes: config.danger_bytes(),
            aggregate_warning_bytes: config.aggregate_warning_bytes(),
            aggregate_danger_bytes: config.aggregate_danger_bytes(),
            danger_file_count: config.danger_file_count,
        }
    }

    #[must_use]
    pub const fn file_status(&self, size_bytes: u64) -> LogStatus {
        if size_bytes >= self.danger_bytes {
            LogStatus::Danger
        } else if size_bytes >= self.warning_bytes {
            LogStatus::Warning
        } else {
            LogStatus::Ok
        }
    }

    #[must_use]
    pub fn aggregate_status(&self, files: &[LogFile], total_size_bytes: u64) -> LogStatus {
        let danger_files = files.iter().filter(|f| f.status == LogStatus::Danger).count();
        if danger_files >= self.danger_file_count || total_size_bytes >= self.aggregate_danger_bytes {
            LogStatus::Danger
        } else if files.iter().any(|f| f.status != LogStatus::Ok) || total_size_bytes >= self.aggregate_warning_bytes {
            LogStatus::Warning
        } else {
            LogStatus::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFile {
    pub filename: String,
    pub size_bytes: u64,
    pub size_human: String,
    pub last_modified: DateTime<Utc>,
    pub writable: bool,
    pub status: LogStatus,
}

/// Sizes of every log file in the log directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub log_dir: String,

    /// Largest first
    pub files: Vec<LogFile>,
    pub total_size_bytes: u64,
    pub total_size_human: String,
    pub largest_file: Option<String>,
    pub status: LogStatus,
    pub scanned_at: DateTime<Utc>,
}

impl LogSummary {
    #[must_use]
    pub fn from_files(log_dir: impl Into<String>, mut files: Vec<LogFile>, thresholds: &LogThresholds, scanned_at: DateTime<Utc>) -> Self {
        files.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.filename.cmp(&b.filename)));
        let total_size_bytes = files.iter().map(|f| f.size_bytes).sum();

        Self {
            log_dir: log_dir.into(),
            status: thresholds.aggregate_status(&files, total_size_bytes),
            largest_file: files.first().map(|f| f.filename.clone()),
            files,
            total_size_bytes,
            total_size_human: human_size(total_size_bytes),
            scanned_at,
        }
    }

    #[must_use]
    pub const fn card_status(&self) -> CardStatus {
        match self.status {
            LogStatus::Ok => CardStatus::Success,
            LogStatus::Warning => CardStatus::Warning,
            LogStatus::Danger => CardStatus::Danger,
        }
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        let health = match self.status {
            LogStatus::Danger => Badge::new("Large Size", BadgeColor::Danger),
            LogStatus::Warning => Badge::new("Growing", BadgeColor::Warning),
            LogStatus::Ok => Badge::new("Healthy", BadgeColor::Success),
        };

        vec![Badge::new(format!("{} Files", self.files.len()), BadgeColor::Info), health]
    }

    #[must_use]
    pub fn summary_card(&self) -> SummaryCard {
        SummaryCard {
            title: CARD_TITLE.to_string(),
            icon: CARD_ICON.to_string(),
            status: self.card_status(),
            display_value: self.total_size_human.clone(),
            last_updated: self.scanned_at,
            detail_url: CARD_URL.to_string(),
            badges: self.badges(),
        }
    }
}

/// A completed truncation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncateReport {
    pub filename: String,
    pub previous_size_bytes: u64,
    pub truncated_at: DateTime<Utc>,
}

/// Why a log file was not truncated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TruncateError {
    /// The name is empty or addresses something other than a file in the log directory
    InvalidName { name: String },
    NotFound { filename: String },
    NotWritable { filename: String },
    Io { filename: String, message: String },
}

impl fmt::Display for TruncateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName { name } => write!(f, "'{name}' is not a valid log file name"),
            Self::NotFound { filename } => write!(f, "log file '{filename}' not found"),
            Self::NotWritable { filename } => write!(f, "log file '{filename}' is not writable"),
            Self::Io { filename, message } => write!(f, "unable to truncate log file '{filename}': {message}"),
        }
    }
}

impl std::error::Error for TruncateError {}
