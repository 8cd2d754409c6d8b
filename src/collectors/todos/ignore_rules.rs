//! A pragmatic subset of `.gitignore` matching.
//!
//! Patterns are translated into path-aware globs: `**` collapses to `*`, leading and trailing
//! slashes are dropped, and a pattern without a wildcard also matches everything below it.
//! Negations are not supported and are skipped along with blank lines and comments.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;

const LOG_TARGET: &str = "     todos";

#[derive(Debug, Clone)]
pub(super) struct IgnoreRules {
    globs: GlobSet,
}

impl IgnoreRules {
    pub fn empty() -> Self {
        Self { globs: GlobSet::empty() }
    }

    /// Rules from the `.gitignore` at the project root; a missing file yields no rules
    pub fn load(project_root: &Path) -> Self {
        match fs::read_to_string(project_root.join(".gitignore")) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                log::debug!(target: LOG_TARGET, "No .gitignore rules in use: {e}");
                Self::empty()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in text.lines().flat_map(translate) {
            match GlobBuilder::new(&pattern).literal_separator(true).build() {
                Ok(glob) => {
                    let _ = builder.add(glob);
                }
                Err(e) => log::debug!(target: LOG_TARGET, "Skipping ignore pattern '{pattern}': {e}"),
            }
        }

        match builder.build() {
            Ok(globs) => Self { globs },
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not compile .gitignore rules: {e}");
                Self::empty()
            }
        }
    }

    /// Whether a path relative to the project root, with forward slashes, is ignored
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        self.globs.is_match(relative_path)
    }
}

/// The globs equivalent to one `.gitignore` line
fn translate(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return Vec::new();
    }

    let pattern = line.replace("**", "*");
    let pattern = pattern.trim_end_matches('/').trim_start_matches('/');
    if pattern.is_empty() {
        return Vec::new();
    }

    if pattern.contains('*') {
        vec![pattern.to_string()]
    } else {
        vec![pattern.to_string(), format!("{pattern}/*")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        assert_eq!(translate("/node_modules/"), vec!["node_modules", "node_modules/*"]);
        assert_eq!(translate("**/*.log"), vec!["*/*.log"]);
        assert_eq!(translate("*.tmp"), vec!["*.tmp"]);
        assert!(translate("").is_empty());
        assert!(translate("# comment").is_empty());
        assert!(translate("!keep.rb").is_empty());
        assert!(translate("/").is_empty());
    }

    #[test]
    fn test_wildcards_do_not_cross_directories() {
        let rules = IgnoreRules::parse("*.min.js\n");
        assert!(rules.is_ignored("bundle.min.js"));
        assert!(!rules.is_ignored("app/bundle.min.js"));
    }

    #[test]
    fn test_plain_names_match_their_contents() {
        let rules = IgnoreRules::parse("/storage\nbuild/\n");
        assert!(rules.is_ignored("storage"));
        assert!(rules.is_ignored("storage/file.rb"));
        assert!(rules.is_ignored("build"));
        assert!(!rules.is_ignored("app/storage.rb"));
    }

    #[test]
    fn test_load_without_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!IgnoreRules::load(dir.path()).is_ignored("anything"));
    }
}
