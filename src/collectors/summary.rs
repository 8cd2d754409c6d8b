//! The shared summary aggregate.
//!
//! Every collector publishes one [`SummaryCard`] describing its latest result. Cards are kept in
//! a single JSON document mapping card title to card, which the presentation layer reads to
//! render its overview grid.
//!
//! All writes go through [`SummaryAggregator::upsert`], which serializes writers with an
//! in-process mutex and an advisory file lock, and replaces the document atomically. Concurrent
//! collectors therefore never lose each other's updates.

use crate::Result;
use crate::collectors::cache_doc;
use crate::collectors::cache_lock::acquire_file_lock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use strum::{Display, EnumString};

const LOG_TARGET: &str = "   summary";

/// File name of the aggregate inside the data directory
pub const SUMMARY_FILE: &str = "summary.json";

const LOCK_FILE: &str = "summary.lock";

/// Overall health of one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CardStatus {
    Success,
    Info,
    Warning,
    Danger,
}

/// Colour hint for a badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BadgeColor {
    Success,
    Info,
    Warning,
    Danger,
    Error,
    Neutral,
    Red,
    Orange,
    Yellow,
    Blue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub color: BadgeColor,
}

impl Badge {
    #[must_use]
    pub fn new(text: impl Into<String>, color: BadgeColor) -> Self {
        Self { text: text.into(), color }
    }
}

/// Compact status of one collector, as shown on the overview grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCard {
    pub title: String,
    pub icon: String,
    pub status: CardStatus,
    #[serde(rename = "value")]
    pub display_value: String,
    pub last_updated: DateTime<Utc>,
    #[serde(rename = "url")]
    pub detail_url: String,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

/// Card title to card
pub type SummaryAggregate = BTreeMap<String, SummaryCard>;

/// Single writer for the summary aggregate
#[derive(Debug)]
pub struct SummaryAggregator {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

impl SummaryAggregator {
    #[must_use]
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            path: data_dir.join(SUMMARY_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the card stored under the card's title
    pub fn upsert(&self, card: SummaryCard) -> Result<()> {
        let _in_process = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _cross_process = acquire_file_lock(&self.lock_path)?;

        let mut aggregate = self.read_all();
        log::debug!(target: LOG_TARGET, "Updating card '{}' ({})", card.title, card.status);
        let _ = aggregate.insert(card.title.clone(), card);

        cache_doc::save(&aggregate, &self.path)
    }

    /// Upsert a card, logging rather than returning any persistence failure
    pub fn publish(&self, card: SummaryCard) {
        let title = card.title.clone();
        if let Err(e) = self.upsert(card) {
            log::warn!(target: LOG_TARGET, "Could not update summary card '{title}': {e}");
        }
    }

    /// The full aggregate; missing or unreadable documents read as empty
    #[must_use]
    pub fn read_all(&self) -> SummaryAggregate {
        if !self.path.exists() {
            return SummaryAggregate::new();
        }

        match cache_doc::load(&self.path, "summary aggregate") {
            Ok(aggregate) => aggregate,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Ignoring unreadable summary at '{}': {e}", self.path.display());
                SummaryAggregate::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    fn card(title: &str, status: CardStatus) -> SummaryCard {
        SummaryCard {
            title: title.to_string(),
            icon: "activity".to_string(),
            status,
            display_value: "42".to_string(),
            last_updated: Utc::now(),
            detail_url: "/healthdeck/test".to_string(),
            badges: vec![Badge::new("1 Item", BadgeColor::Info)],
        }
    }

    #[test]
    fn test_read_all_without_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());
        assert!(aggregator.read_all().is_empty());
    }

    #[test]
    fn test_upsert_inserts_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());

        aggregator.upsert(card("Log Files", CardStatus::Success)).unwrap();
        aggregator.upsert(card("TODO Items", CardStatus::Warning)).unwrap();
        aggregator.upsert(card("Log Files", CardStatus::Danger)).unwrap();

        let all = aggregator.read_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all["Log Files"].status, CardStatus::Danger);
        assert_eq!(all["TODO Items"].status, CardStatus::Warning);
    }

    #[test]
    fn test_file_format_uses_value_and_url_keys() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());
        aggregator.upsert(card("Log Files", CardStatus::Info)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(aggregator.path()).unwrap()).unwrap();
        let entry = &json["Log Files"];
        assert_eq!(entry["value"], "42");
        assert_eq!(entry["url"], "/healthdeck/test");
        assert_eq!(entry["status"], "info");
        assert_eq!(entry["badges"][0]["color"], "info");
    }

    #[test]
    fn test_malformed_aggregate_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = SummaryAggregator::new(dir.path());
        fs::write(aggregator.path(), "{ truncated").unwrap();

        assert!(aggregator.read_all().is_empty());
        aggregator.upsert(card("Log Files", CardStatus::Success)).unwrap();
        assert_eq!(aggregator.read_all().len(), 1);
    }

    #[test]
    fn test_concurrent_upserts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = Arc::new(SummaryAggregator::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let aggregator = Arc::clone(&aggregator);
                thread::spawn(move || aggregator.upsert(card(&format!("Card {i}"), CardStatus::Info)).unwrap())
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(aggregator.read_all().len(), 8);
    }

    #[test]
    fn test_two_aggregators_on_one_directory_share_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(SummaryAggregator::new(dir.path()));
        let second = Arc::new(SummaryAggregator::new(dir.path()));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let aggregator = if i % 2 == 0 { Arc::clone(&first) } else { Arc::clone(&second) };
                thread::spawn(move || aggregator.upsert(card(&format!("Card {i}"), CardStatus::Info)).unwrap())
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(first.read_all().len(), 6);
    }

    #[test]
    fn test_status_parses_from_lowercase() {
        assert_eq!("danger".parse::<CardStatus>().unwrap(), CardStatus::Danger);
        assert_eq!(CardStatus::Warning.to_string(), "warning");
        assert_eq!(BadgeColor::Orange.to_string(), "orange");
    }
}
