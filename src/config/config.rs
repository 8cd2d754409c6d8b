use super::sections::{CoverageConfig, GemConfig, LogConfig, PerformanceConfig, StyleConfig, TodoConfig, VulnerabilityConfig};
use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The default configuration YAML content, embedded from `default_config.yml`
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../../default_config.yml");

fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".healthdeck")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory, relative to the project root, holding caches, the summary, and request samples
    #[serde(default = "default_data_dir")]
    pub data_dir: Utf8PathBuf,

    #[serde(default)]
    pub vulnerabilities: VulnerabilityConfig,

    #[serde(default)]
    pub style: StyleConfig,

    #[serde(default)]
    pub coverage: CoverageConfig,

    #[serde(default)]
    pub todos: TodoConfig,

    #[serde(default)]
    pub logs: LogConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub gems: GemConfig,
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Returns the configuration together with any validation warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(project_root: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<(Self, Vec<String>)> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading healthdeck configuration from {path}"))?;
            (path.clone(), text)
        } else {
            let candidates = [
                project_root.join("healthdeck.toml"),
                project_root.join("healthdeck.yml"),
                project_root.join("healthdeck.yaml"),
                project_root.join("healthdeck.json"),
            ];

            let mut found = None;
            for path in &candidates {
                match fs::read_to_string(path) {
                    Ok(text) => {
                        found = Some((path.clone(), text));
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).into_app_err_with(|| format!("reading healthdeck configuration from {path}")),
                }
            }

            let Some(result) = found else {
                let config = Self::default();
                let mut warnings = Vec::new();
                config.validate(&mut warnings);
                return Ok((config, warnings));
            };
            result
        };

        let extension = final_path.extension().unwrap_or_default();
        let config: Self = match extension {
            "toml" => toml::from_str(&text).into_app_err_with(|| format!("parsing TOML configuration from {final_path}"))?,
            "yml" | "yaml" => serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing YAML configuration from {final_path}"))?,
            "json" => serde_json::from_str(&text).into_app_err_with(|| format!("parsing JSON configuration from {final_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        let mut warnings = Vec::new();
        config.validate(&mut warnings);
        Ok((config, warnings))
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save(&self, output_path: &Utf8Path) -> Result<()> {
        let extension = output_path.extension().unwrap_or_default();
        let text = match extension {
            "toml" => toml::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to TOML for saving to {output_path}"))?,
            "yml" | "yaml" => serde_yaml::to_string(self)
                .into_app_err_with(|| format!("serializing configuration to YAML for saving to {output_path}"))?,
            "json" => serde_json::to_string_pretty(self)
                .into_app_err_with(|| format!("serializing configuration to JSON for saving to {output_path}"))?,
            _ => return Err(app_err!("unsupported configuration file extension: {extension}")),
        };

        fs::write(output_path, text).into_app_err_with(|| format!("writing configuration to {output_path}"))?;
        Ok(())
    }

    /// Save the default configuration to a file, preserving comments for YAML format
    ///
    /// YAML targets receive the raw content of `default_config.yml`. Other formats fall back
    /// to regular serialization and lose the comments.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default_with_comments(&self, output_path: &Utf8Path) -> Result<()> {
        let extension = output_path.extension().unwrap_or_default();

        if matches!(extension, "yml" | "yaml") {
            fs::write(output_path, DEFAULT_CONFIG_YAML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        } else {
            self.save(output_path)?;
        }

        Ok(())
    }

    /// Resolve the data directory against the project root; an absolute `data_dir` is used as is
    #[must_use]
    pub fn data_dir_in(&self, project_root: &Path) -> PathBuf {
        project_root.join(self.data_dir.as_std_path())
    }

    /// Detect settings that are legal but almost certainly not what the user meant
    fn validate(&self, warnings: &mut Vec<String>) {
        if self.data_dir.as_str().is_empty() {
            warnings.push("data_dir is empty".to_string());
        }

        check_command("vulnerabilities", &self.vulnerabilities.command, warnings);
        check_command("style", &self.style.command, warnings);
        check_nonzero("vulnerabilities.timeout_secs", self.vulnerabilities.timeout_secs, warnings);
        check_nonzero("style.timeout_secs", self.style.timeout_secs, warnings);

        check_nonzero("vulnerabilities.cache_ttl_hours", self.vulnerabilities.cache_ttl_hours, warnings);
        check_nonzero("style.cache_ttl_hours", self.style.cache_ttl_hours, warnings);
        check_nonzero("coverage.cache_ttl_minutes", self.coverage.cache_ttl_minutes, warnings);
        check_nonzero("coverage.stale_after_hours", self.coverage.stale_after_hours, warnings);
        check_nonzero("todos.cache_ttl_hours", self.todos.cache_ttl_hours, warnings);
        check_nonzero("logs.cache_ttl_minutes", self.logs.cache_ttl_minutes, warnings);
        check_nonzero("performance.cache_ttl_minutes", self.performance.cache_ttl_minutes, warnings);
        check_nonzero("performance.tail_interval_secs", self.performance.tail_interval_secs, warnings);
        check_nonzero("gems.cache_ttl_hours", self.gems.cache_ttl_hours, warnings);
        check_nonzero("gems.connect_timeout_secs", self.gems.connect_timeout_secs, warnings);
        check_nonzero("gems.read_timeout_secs", self.gems.read_timeout_secs, warnings);

        if self.todos.extensions.is_empty() {
            warnings.push("todos.extensions is empty, no files will be scanned".to_string());
        }

        for ext in &self.todos.extensions {
            if !ext.starts_with('.') {
                warnings.push(format!("todos.extensions entry '{ext}' should start with '.'"));
            }
        }

        if self.logs.warning_mb >= self.logs.danger_mb {
            warnings.push(format!(
                "logs.warning_mb ({}) should be below logs.danger_mb ({})",
                self.logs.warning_mb, self.logs.danger_mb
            ));
        }

        if self.logs.aggregate_warning_mb >= self.logs.aggregate_danger_mb {
            warnings.push(format!(
                "logs.aggregate_warning_mb ({}) should be below logs.aggregate_danger_mb ({})",
                self.logs.aggregate_warning_mb, self.logs.aggregate_danger_mb
            ));
        }

        if self.logs.aggregate_warning_mb < self.logs.warning_mb {
            warnings.push(format!(
                "logs.aggregate_warning_mb ({}) is below the per-file logs.warning_mb ({})",
                self.logs.aggregate_warning_mb, self.logs.warning_mb
            ));
        }

        if self.logs.aggregate_danger_mb < self.logs.danger_mb {
            warnings.push(format!(
                "logs.aggregate_danger_mb ({}) is below the per-file logs.danger_mb ({})",
                self.logs.aggregate_danger_mb, self.logs.danger_mb
            ));
        }

        if self.logs.danger_file_count == 0 {
            warnings.push("logs.danger_file_count is 0, every directory would be flagged as danger".to_string());
        }

        if self.performance.retention_days == 0 {
            warnings.push("performance.retention_days is 0, request samples would be deleted immediately".to_string());
        }

        if self.gems.concurrency == 0 {
            warnings.push("gems.concurrency is 0, no registry requests could be made".to_string());
        }

        if let Err(e) = url::Url::parse(&self.gems.registry_url) {
            warnings.push(format!("gems.registry_url '{}' is not a valid URL: {e}", self.gems.registry_url));
        }
    }
}

fn check_command(section: &str, command: &[String], warnings: &mut Vec<String>) {
    if command.first().is_none_or(|program| program.trim().is_empty()) {
        warnings.push(format!("{section}.command is empty"));
    }
}

fn check_nonzero(name: &str, value: u64, warnings: &mut Vec<String>) {
    if value == 0 {
        warnings.push(format!("{name} is 0"));
    }
}

impl Default for Config {
    fn default() -> Self {
        serde_yaml::from_str(DEFAULT_CONFIG_YAML).expect("default_config.yml should be valid YAML that deserializes to Config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_warnings() {
        let config = Config::default();
        let mut warnings = Vec::new();
        config.validate(&mut warnings);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_default_config_matches_section_defaults() {
        let config = Config::default();
        assert_eq!(config.vulnerabilities, VulnerabilityConfig::default());
        assert_eq!(config.style, StyleConfig::default());
        assert_eq!(config.coverage, CoverageConfig::default());
        assert_eq!(config.todos, TodoConfig::default());
        assert_eq!(config.logs, LogConfig::default());
        assert_eq!(config.performance, PerformanceConfig::default());
        assert_eq!(config.gems, GemConfig::default());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let (config, warnings) = Config::load(&root, None).unwrap();
        assert_eq!(config, Config::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_data_dir_in() {
        let mut config = Config::default();
        assert_eq!(config.data_dir_in(Path::new("/srv/app")), PathBuf::from("/srv/app/.healthdeck"));

        config.data_dir = Utf8PathBuf::from("/var/cache/healthdeck");
        assert_eq!(config.data_dir_in(Path::new("/srv/app")), PathBuf::from("/var/cache/healthdeck"));
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("healthdeck.toml"), "[logs]\nwarning_mb = 500\ndanger_mb = 1024\naggregate_warning_mb = 1500\naggregate_danger_mb = 2048\n")
            .unwrap();

        let (config, warnings) = Config::load(&root, None).unwrap();
        assert_eq!(config.logs.warning_mb, 500);
        assert_eq!(config.logs.danger_mb, 1024);
        assert_eq!(config.logs.directory, Utf8PathBuf::from("log"));
        assert_eq!(config.style, StyleConfig::default());
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_load_reports_inverted_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = root.join("custom.yml");
        fs::write(&path, "logs:\n  warning_mb: 80\n  danger_mb: 50\n").unwrap();

        let (_, warnings) = Config::load(&root, Some(&path)).unwrap();
        assert!(warnings.iter().any(|w| w.contains("logs.warning_mb")));
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = root.join("healthdeck.json");
        fs::write(&path, r#"{"style": {"comand": ["rubocop"]}}"#).unwrap();

        let result = Config::load(&root, Some(&path));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = root.join("healthdeck.ini");
        fs::write(&path, "").unwrap();

        let result = Config::load(&root, Some(&path));
        assert!(result.unwrap_err().to_string().contains("unsupported configuration file extension"));
    }

    #[test]
    fn test_save_and_reload_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.performance.retention_days = 3;

        for name in ["out.toml", "out.yml", "out.json"] {
            let path = root.join(name);
            config.save(&path).unwrap();
            let (loaded, _) = Config::load(&root, Some(&path)).unwrap();
            assert_eq!(loaded, config, "mismatch for {name}");
        }
    }

    #[test]
    fn test_save_default_with_comments_keeps_yaml_text() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = root.join("healthdeck.yml");

        Config::default().save_default_with_comments(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_YAML);
    }

    #[test]
    fn test_bad_registry_url_warns() {
        let mut config = Config::default();
        config.gems.registry_url = "not a url".to_string();

        let mut warnings = Vec::new();
        config.validate(&mut warnings);
        assert!(warnings.iter().any(|w| w.contains("gems.registry_url")));
    }
}
