use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CARD_TITLE: &str = "Gem Metadata";
const CARD_ICON: &str = "package";
const CARD_URL: &str = "/healthdeck/dependencies/gems";

/// Description given to packages whose registry entry could not be fetched
pub const UNAVAILABLE_DESCRIPTION: &str = "(API unavailable)";

/// Registry facts about one installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemMetadata {
    pub name: String,
    pub latest_version: Option<String>,
    pub current_installed_version: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub description: String,
    #[serde(default)]
    pub runtime_dependencies: Vec<String>,

    /// Set on placeholders built when the registry could not be reached
    #[serde(default)]
    pub unavailable: bool,
}

impl GemMetadata {
    #[must_use]
    pub fn placeholder(name: impl Into<String>, current_installed_version: Option<String>) -> Self {
        Self {
            name: name.into(),
            latest_version: None,
            current_installed_version,
            released_at: None,
            description: UNAVAILABLE_DESCRIPTION.to_string(),
            runtime_dependencies: Vec::new(),
            unavailable: true,
        }
    }

    /// Whether the registry knows a version other than the installed one
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        match (&self.latest_version, &self.current_installed_version) {
            (Some(latest), Some(installed)) => !self.unavailable && latest != installed,
            _ => false,
        }
    }
}

/// `GET <registry>/<name>.json`
#[derive(Debug, Deserialize)]
pub(super) struct RegistryGem {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    version_created_at: Option<String>,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    dependencies: RegistryDependencies,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryDependencies {
    #[serde(default)]
    runtime: Vec<RegistryDependency>,
}

#[derive(Debug, Deserialize)]
struct RegistryDependency {
    name: String,
}

impl RegistryGem {
    pub(super) fn into_metadata(self, current_installed_version: Option<String>) -> GemMetadata {
        GemMetadata {
            name: self.name,
            latest_version: self.version,
            current_installed_version,
            released_at: self
                .version_created_at
                .and_then(|text| DateTime::parse_from_rfc3339(&text).ok())
                .map(|timestamp| timestamp.with_timezone(&Utc)),
            description: self.info.map(|info| info.trim().to_string()).unwrap_or_default(),
            runtime_dependencies: self.dependencies.runtime.into_iter().map(|dependency| dependency.name).collect(),
            unavailable: false,
        }
    }
}

/// Metadata for every tracked package, in lockfile order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemReport {
    pub gems: Vec<GemMetadata>,
    pub outdated_count: usize,
    pub unavailable_count: usize,
    pub fetched_at: DateTime<Utc>,
}

impl GemReport {
    #[must_use]
    pub fn from_gems(gems: Vec<GemMetadata>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            outdated_count: gems.iter().filter(|gem| gem.is_outdated()).count(),
            unavailable_count: gems.iter().filter(|gem| gem.unavailable).count(),
            gems,
            fetched_at,
        }
    }

    #[must_use]
    pub const fn card_status(&self) -> CardStatus {
        if self.unavailable_count > 0 {
            CardStatus::Warning
        } else if self.outdated_count > 0 {
            CardStatus::Info
        } else {
            CardStatus::Success
        }
    }

    fn display_value(&self) -> String {
        match self.gems.len() {
            0 => "No gems tracked".to_string(),
            1 => "1 gem".to_string(),
            n => format!("{n} gems"),
        }
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        let mut badges = vec![Badge::new(format!("{} Gems", self.gems.len()), BadgeColor::Info)];
        if self.outdated_count > 0 {
            badges.push(Badge::new(format!("{} Outdated", self.outdated_count), BadgeColor::Warning));
        }
        if self.unavailable_count > 0 {
            badges.push(Badge::new(format!("{} Unavailable", self.unavailable_count), BadgeColor::Danger));
        }
        badges
    }

    #[must_use]
    pub fn summary_card(&self) -> SummaryCard {
        SummaryCard {
            title: CARD_TITLE.to_string(),
            icon: CARD_ICON.to_string(),
            status: self.card_status(),
            display_value: self.display_value(),
            last_updated: self.fetched_at,
            detail_url: CARD_URL.to_string(),
            badges: self.badges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gem(name: &str, latest: &str, installed: &str) -> GemMetadata {
        GemMetadata {
            name: name.to_string(),
            latest_version: Some(latest.to_string()),
            current_installed_version: Some(installed.to_string()),
            released_at: None,
            description: String::new(),
            runtime_dependencies: Vec::new(),
            unavailable: false,
        }
    }

    #[test]
    fn test_registry_payload() {
        let json = r#"{
            "name": "rack",
            "version": "3.1.8",
            "version_created_at": "2024-10-14T09:05:27.141Z",
            "info": "  A modular Ruby webserver interface.\n",
            "downloads": 123,
            "dependencies": {
                "development": [{"name": "minitest", "requirements": ">= 0"}],
                "runtime": [{"name": "webrick", "requirements": "~> 1.8"}]
            }
        }"#;

        let registry: RegistryGem = serde_json::from_str(json).unwrap();
        let metadata = registry.into_metadata(Some("3.0.0".to_string()));

        assert_eq!(metadata.latest_version.as_deref(), Some("3.1.8"));
        assert_eq!(metadata.description, "A modular Ruby webserver interface.");
        assert_eq!(metadata.runtime_dependencies, vec!["webrick"]);
        assert_eq!(
            metadata.released_at.map(|t| t.date_naive()),
            Utc.with_ymd_and_hms(2024, 10, 14, 0, 0, 0).single().map(|t| t.date_naive())
        );
        assert!(metadata.is_outdated());
    }

    #[test]
    fn test_placeholder_is_never_outdated() {
        let placeholder = GemMetadata::placeholder("rails", Some("7.1.0".to_string()));
        assert!(placeholder.unavailable);
        assert_eq!(placeholder.description, "(API unavailable)");
        assert!(!placeholder.is_outdated());
    }

    #[test]
    fn test_card_status_priority() {
        let now = Utc::now();

        let report = GemReport::from_gems(vec![gem("rack", "3.1.8", "3.1.8")], now);
        assert_eq!(report.card_status(), CardStatus::Success);
        assert_eq!(report.summary_card().display_value, "1 gem");

        let report = GemReport::from_gems(vec![gem("rack", "3.1.8", "3.0.0")], now);
        assert_eq!(report.card_status(), CardStatus::Info);

        let report = GemReport::from_gems(
            vec![gem("rack", "3.1.8", "3.0.0"), GemMetadata::placeholder("rails", None)],
            now,
        );
        assert_eq!(report.card_status(), CardStatus::Warning);
        assert_eq!(
            report.badges(),
            vec![
                Badge::new("2 Gems", BadgeColor::Info),
                Badge::new("1 Outdated", BadgeColor::Warning),
                Badge::new("1 Unavailable", BadgeColor::Danger),
            ]
        );
    }

    #[test]
    fn test_empty_report() {
        let report = GemReport::from_gems(Vec::new(), Utc::now());
        assert_eq!(report.card_status(), CardStatus::Success);
        assert_eq!(report.summary_card().display_value, "No gems tracked");
    }
}
