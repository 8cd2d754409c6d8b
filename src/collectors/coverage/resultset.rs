//! The coverage result file written by the test suite.
//!
//! The document maps a suite name to the per-file line hits that suite recorded. Each entry in a
//! hit array is one source line: `null` for lines that cannot be executed, `0` for lines that
//! never ran, and a positive count otherwise.

use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::BTreeMap;

const LOG_TARGET: &str = "  coverage";

/// Line hits of one file, `None` for non-trackable lines
pub(super) type LineHits = Vec<Option<u64>>;

pub(super) type ResultSet = BTreeMap<String, Suite>;

#[derive(Debug, Deserialize)]
pub(super) struct Suite {
    #[serde(default)]
    pub coverage: Option<BTreeMap<String, FileCoverage>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum FileCoverage {
    /// Current layout, `{"lines": [...], "branches": {...}}`
    Lines { lines: LineHits },

    /// Older layout with the bare hit array
    Legacy(LineHits),

    Unrecognized(IgnoredAny),
}

/// Combine every suite's results into one hit array per file
///
/// Hits from different suites are summed, and a line is trackable when any suite tracked it.
pub(super) fn merge_suites(resultset: ResultSet) -> BTreeMap<String, LineHits> {
    let mut merged: BTreeMap<String, LineHits> = BTreeMap::new();

    for (suite_name, suite) in resultset {
        let Some(coverage) = suite.coverage else {
            log::warn!(target: LOG_TARGET, "Suite '{suite_name}' holds no coverage data");
            continue;
        };

        log::debug!(target: LOG_TARGET, "Suite '{suite_name}' covers {} files", coverage.len());

        for (path, file) in coverage {
            let lines = match file {
                FileCoverage::Lines { lines } | FileCoverage::Legacy(lines) => lines,
                FileCoverage::Unrecognized(_) => {
                    log::warn!(target: LOG_TARGET, "Skipping '{path}': unrecognized line coverage format");
                    continue;
                }
            };

            let entry = merged.entry(path).or_default();
            if entry.len() < lines.len() {
                entry.resize(lines.len(), None);
            }

            for (slot, hits) in entry.iter_mut().zip(lines) {
                if let Some(hits) = hits {
                    *slot = Some(slot.unwrap_or(0) + hits);
                }
            }
        }
    }

    merged
}
