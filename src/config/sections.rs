use camino::Utf8PathBuf;
use core::time::Duration;
use serde::{Deserialize, Serialize};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * 60;
const BYTES_PER_MB: u64 = 1024 * 1024;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Settings for the dependency-audit collector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VulnerabilityConfig {
    /// Command line of the audit tool, program first
    pub command: Vec<String>,

    /// Hours before a cached audit is considered stale
    pub cache_ttl_hours: u64,

    /// Seconds the audit tool may run before it is killed
    pub timeout_secs: u64,
}

impl Default for VulnerabilityConfig {
    fn default() -> Self {
        Self {
            command: strings(&["bundle", "audit", "check", "--update", "--format", "json"]),
            cache_ttl_hours: 12,
            timeout_secs: 300,
        }
    }
}

impl VulnerabilityConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * SECONDS_PER_HOUR)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the style-lint collector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Command line of the lint tool, program first
    pub command: Vec<String>,

    /// Hours before a cached lint run is considered stale
    pub cache_ttl_hours: u64,

    /// Seconds the lint tool may run before it is killed
    pub timeout_secs: u64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            command: strings(&["standardrb", "--format", "json"]),
            cache_ttl_hours: 6,
            timeout_secs: 300,
        }
    }
}

impl StyleConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * SECONDS_PER_HOUR)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the test coverage collector
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    /// Location of the coverage result file, relative to the project root
    pub resultset_path: Utf8PathBuf,

    /// Minutes before a cached coverage report is re-parsed
    pub cache_ttl_minutes: u64,

    /// Age in hours after which the result file is reported as stale
    pub stale_after_hours: u64,

    /// Files whose path contains any of these fragments are left out of the totals
    pub excluded_path_fragments: Vec<String>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            resultset_path: Utf8PathBuf::from("coverage/.resultset.json"),
            cache_ttl_minutes: 60,
            stale_after_hours: 24,
            excluded_path_fragments: strings(&["vendor/", "spec/", "test/"]),
        }
    }
}

impl CoverageConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * SECONDS_PER_MINUTE)
    }

    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_hours * SECONDS_PER_HOUR)
    }
}

/// Settings for the TODO marker scanner
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TodoConfig {
    /// Hours before a cached scan is considered stale
    pub cache_ttl_hours: u64,

    /// File extensions that are scanned, including the leading dot
    pub extensions: Vec<String>,

    /// Directories, relative to the project root, that are never descended into
    pub excluded_dirs: Vec<String>,

    /// Whether patterns from the project's `.gitignore` also prune the walk
    pub respect_gitignore: bool,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            cache_ttl_hours: 24,
            extensions: strings(&[
                ".rb", ".js", ".html", ".erb", ".yml", ".yaml", ".json", ".css", ".scss", ".vue", ".jsx", ".tsx", ".ts",
            ]),
            excluded_dirs: strings(&[
                "node_modules",
                "vendor",
                "tmp",
                "log",
                "public/assets",
                ".git",
                "coverage",
                "pkg",
                "app/assets/builds",
            ]),
            respect_gitignore: true,
        }
    }
}

impl TodoConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * SECONDS_PER_HOUR)
    }
}

/// Settings for the log growth monitor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Directory holding the `*.log` files, relative to the project root
    pub directory: Utf8PathBuf,

    /// Minutes before a cached scan is considered stale
    pub cache_ttl_minutes: u64,

    /// Size in MB at which a single file is flagged as a warning
    pub warning_mb: u64,

    /// Size in MB at which a single file is flagged as a danger
    pub danger_mb: u64,

    /// Combined size in MB at which the directory is flagged as a warning
    pub aggregate_warning_mb: u64,

    /// Combined size in MB at which the directory is flagged as a danger
    pub aggregate_danger_mb: u64,

    /// Number of danger-sized files that makes the whole directory a danger
    pub danger_file_count: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: Utf8PathBuf::from("log"),
            cache_ttl_minutes: 30,
            warning_mb: 25,
            danger_mb: 50,
            aggregate_warning_mb: 75,
            aggregate_danger_mb: 100,
            danger_file_count: 1,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * SECONDS_PER_MINUTE)
    }

    #[must_use]
    pub const fn warning_bytes(&self) -> u64 {
        self.warning_mb * BYTES_PER_MB
    }

    #[must_use]
    pub const fn danger_bytes(&self) -> u64 {
        self.danger_mb * BYTES_PER_MB
    }

    #[must_use]
    pub const fn aggregate_warning_bytes(&self) -> u64 {
        self.aggregate_warning_mb * BYTES_PER_MB
    }

    #[must_use]
    pub const fn aggregate_danger_bytes(&self) -> u64 {
        self.aggregate_danger_mb * BYTES_PER_MB
    }
}

/// Settings for the request log tailer and its performance report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformanceConfig {
    /// Request log that is tailed, relative to the project root
    pub log_file: Utf8PathBuf,

    /// Minutes before a cached performance report is recomputed
    pub cache_ttl_minutes: u64,

    /// Days of request samples kept on disk
    pub retention_days: u32,

    /// Lines read from the end of the log when no samples have been stored yet
    pub bootstrap_lines: usize,

    /// Requests slower than this many milliseconds count as slow
    pub slow_request_ms: u64,

    /// Number of most recent requests included in the report
    pub recent_request_count: usize,

    /// Seconds between two tailer ticks in watch mode
    pub tail_interval_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            log_file: Utf8PathBuf::from("log/development.log"),
            cache_ttl_minutes: 15,
            retention_days: 7,
            bootstrap_lines: 2000,
            slow_request_ms: 1000,
            recent_request_count: 20,
            tail_interval_secs: 30,
        }
    }
}

impl PerformanceConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * SECONDS_PER_MINUTE)
    }

    #[must_use]
    pub const fn tail_interval(&self) -> Duration {
        Duration::from_secs(self.tail_interval_secs)
    }
}

/// Settings for the registry metadata fetcher
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GemConfig {
    /// Lockfile listing the installed packages, relative to the project root
    pub lockfile: Utf8PathBuf,

    /// Base URL of the registry API; `<name>.json` is appended per package
    pub registry_url: String,

    /// Hours before a cached package entry is re-fetched
    pub cache_ttl_hours: u64,

    /// Seconds allowed for establishing a connection to the registry
    pub connect_timeout_secs: u64,

    /// Seconds allowed for reading a registry response
    pub read_timeout_secs: u64,

    /// Maximum number of registry requests in flight
    pub concurrency: usize,
}

impl Default for GemConfig {
    fn default() -> Self {
        Self {
            lockfile: Utf8PathBuf::from("Gemfile.lock"),
            registry_url: "https://rubygems.org/api/v1/gems".to_string(),
            cache_ttl_hours: 24,
            connect_timeout_secs: 5,
            read_timeout_secs: 5,
            concurrency: 8,
        }
    }
}

impl GemConfig {
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * SECONDS_PER_HOUR)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
