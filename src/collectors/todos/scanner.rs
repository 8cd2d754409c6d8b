use super::ignore_rules::IgnoreRules;
use super::todo_data::{MarkerType, TodoItem, TodoReport};
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::path_utils::relative_slash_path;
use crate::collectors::summary::SummaryAggregator;
use crate::config::TodoConfig;
use chrono::Utc;
use core::time::Duration;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use walkdir::{DirEntry, WalkDir};

const LOG_TARGET: &str = "     todos";

const CACHE_KEY: &str = "todos";

static MARKER_PATTERNS: LazyLock<[(MarkerType, Regex); 5]> = LazyLock::new(|| {
    [
        (MarkerType::Todo, Regex::new(r"(?i)\bTODO:?\s*(.+)").expect("invalid regex")),
        (MarkerType::Fixme, Regex::new(r"(?i)\bFIXME:?\s*(.+)").expect("invalid regex")),
        (MarkerType::Hack, Regex::new(r"(?i)\bHACK:?\s*(.+)").expect("invalid regex")),
        (MarkerType::Note, Regex::new(r"(?i)\bNOTE:?\s*(.+)").expect("invalid regex")),
        (MarkerType::Bug, Regex::new(r"(?i)\bBUG:?\s*(.+)").expect("invalid regex")),
    ]
});

/// The marker on a line, if any; earlier marker types win
fn match_marker(line: &str) -> Option<(MarkerType, String)> {
    MARKER_PATTERNS.iter().find_map(|(marker, regex)| {
        let captures = regex.captures(line)?;
        let snippet = captures.get(1).map_or(line, |m| m.as_str()).trim();
        Some((*marker, snippet.to_string()))
    })
}

/// Finds TODO-style markers across the project's source files
#[derive(Debug, Clone)]
pub struct TodoScanner {
    project_root: PathBuf,
    extensions: Vec<String>,
    excluded_dirs: Vec<String>,
    respect_gitignore: bool,
    cache: CacheStore,
    cache_ttl: Duration,
    summary: Arc<SummaryAggregator>,
}

impl TodoScanner {
    #[must_use]
    pub fn new(config: &TodoConfig, project_root: impl AsRef<Path>, cache: CacheStore, summary: Arc<SummaryAggregator>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            extensions: config.extensions.clone(),
            excluded_dirs: config
                .excluded_dirs
                .iter()
                .map(|dir| dir.trim_matches('/').to_string())
                .collect(),
            respect_gitignore: config.respect_gitignore,
            cache,
            cache_ttl: config.cache_ttl(),
            summary,
        }
    }

    /// Also skip `dir`, given relative to the project root
    #[must_use]
    pub fn exclude_dir(mut self, dir: impl AsRef<str>) -> Self {
        let dir = dir.as_ref().trim_matches('/');
        if !dir.is_empty() && !self.excluded_dirs.iter().any(|d| d == dir) {
            self.excluded_dirs.push(dir.to_string());
        }
        self
    }

    pub fn get_detail(&self) -> TodoReport {
        self.refresh(false)
    }

    /// Rescan if forced or if the cached scan has expired, and publish the card
    pub fn refresh(&self, force: bool) -> TodoReport {
        if !force && let Some(entry) = self.cache.get_fresh::<TodoReport>(CACHE_KEY, self.cache_ttl) {
            return entry.payload;
        }

        let report = self.scan();
        let _ = self.cache.put(CACHE_KEY, &report);
        self.summary.publish(report.summary_card());
        report
    }

    /// Walk the project tree and collect every marker
    pub fn scan(&self) -> TodoReport {
        let rules = if self.respect_gitignore {
            IgnoreRules::load(&self.project_root)
        } else {
            IgnoreRules::empty()
        };

        let mut items = Vec::new();
        let walker = WalkDir::new(&self.project_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_pruned(entry, &rules));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Skipping unreadable entry: {e}");
                    continue;
                }
            };

            if entry.file_type().is_file() && self.is_scannable(entry.path()) {
                let relative = relative_slash_path(&self.project_root, entry.path());
                scan_file(entry.path(), &relative, &mut items);
            }
        }

        let report = TodoReport::from_items(items, Utc::now());
        log::info!(target: LOG_TARGET, "Found {} markers in '{}'", report.total_count, self.project_root.display());
        report
    }

    fn is_pruned(&self, entry: &DirEntry, rules: &IgnoreRules) -> bool {
        let relative = relative_slash_path(&self.project_root, entry.path());
        if rules.is_ignored(&relative) {
            return true;
        }

        entry.file_type().is_dir() && self.is_excluded_dir(&relative)
    }

    /// Excluded entries match the whole relative path, a leading part of it, or any one segment
    fn is_excluded_dir(&self, relative: &str) -> bool {
        self.excluded_dirs.iter().any(|dir| {
            relative == dir
                || relative.strip_prefix(dir.as_str()).is_some_and(|rest| rest.starts_with('/'))
                || (!dir.contains('/') && relative.split('/').any(|segment| segment == dir))
        })
    }

    fn is_scannable(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

fn scan_file(path: &Path, relative: &str, items: &mut Vec<TodoItem>) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Skipping '{relative}': {e}");
            return;
        }
    };

    for (index, line) in text.lines().enumerate() {
        if let Some((marker_type, content_snippet)) = match_marker(line) {
            items.push(TodoItem {
                file_path: relative.to_string(),
                line_number: index + 1,
                marker_type,
                content_snippet,
            });
        }
    }
}
