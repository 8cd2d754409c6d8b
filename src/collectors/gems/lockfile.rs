//! Installed package versions from a bundler lockfile.

use crate::Result;
use ohno::IntoAppError;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

static SPEC_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {4}([A-Za-z0-9_.\-]+) \(([^)]+)\)$").expect("invalid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedGem {
    pub name: String,
    pub version: String,
}

/// Every package pinned under a `specs:` block, first occurrence wins
///
/// Entries are the lines indented by exactly four spaces; deeper lines are the packages'
/// own dependency requirements.
#[must_use]
pub fn parse_lockfile(text: &str) -> Vec<LockedGem> {
    let mut gems = Vec::new();
    let mut seen = HashSet::new();
    let mut in_specs = false;

    for line in text.lines() {
        if line.trim() == "specs:" {
            in_specs = true;
            continue;
        }

        if line.trim().is_empty() || !line.starts_with(' ') {
            in_specs = false;
            continue;
        }

        if !in_specs {
            continue;
        }

        if let Some(captures) = SPEC_REGEX.captures(line)
            && seen.insert(captures[1].to_string())
        {
            gems.push(LockedGem {
                name: captures[1].to_string(),
                version: captures[2].to_string(),
            });
        }
    }

    gems
}

/// Read and parse a lockfile; a missing file means no packages
pub fn read_lockfile(path: &Path) -> Result<Vec<LockedGem>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_lockfile(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).into_app_err_with(|| format!("unable to read lockfile '{}'", path.display())),
    }
}
