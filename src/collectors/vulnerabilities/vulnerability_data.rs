use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use crate::collectors::tool_runner::ToolFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

pub const CARD_TITLE: &str = "Security Vulnerabilities";
const CARD_ICON: &str = "shield-alert";
const CARD_URL: &str = "/healthdeck/securities/vulnerabilities";

/// Severity of an advisory, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Criticality {
    /// Parse the criticality string of an advisory; anything unrecognized is `Unknown`
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("critical") => Self::Critical,
            Some("high") => Self::High,
            Some("medium" | "moderate") => Self::Medium,
            Some("low") => Self::Low,
            _ => Self::Unknown,
        }
    }

    const fn badge_color(self) -> Option<BadgeColor> {
        match self {
            Self::Critical => Some(BadgeColor::Red),
            Self::High => Some(BadgeColor::Orange),
            Self::Medium => Some(BadgeColor::Yellow),
            Self::Low => Some(BadgeColor::Blue),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub gem_name: String,
    pub installed_version: String,
    pub patched_versions: Vec<String>,
    pub criticality: Criticality,
    pub advisory_title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn from_vulnerabilities(vulnerabilities: &[Vulnerability]) -> Self {
        let mut counts = Self::default();
        for vulnerability in vulnerabilities {
            *counts.slot(vulnerability.criticality) += 1;
        }
        counts
    }

    #[must_use]
    pub const fn get(&self, criticality: Criticality) -> usize {
        match criticality {
            Criticality::Critical => self.critical,
            Criticality::High => self.high,
            Criticality::Medium => self.medium,
            Criticality::Low => self.low,
            Criticality::Unknown => self.unknown,
        }
    }

    const fn slot(&mut self, criticality: Criticality) -> &mut usize {
        match criticality {
            Criticality::Critical => &mut self.critical,
            Criticality::High => &mut self.high,
            Criticality::Medium => &mut self.medium,
            Criticality::Low => &mut self.low,
            Criticality::Unknown => &mut self.unknown,
        }
    }
}

/// Result of one audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub scanned_at: DateTime<Utc>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub severity_counts: SeverityCounts,
    pub total: usize,

    /// Set when the audit could not be completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ToolFailure>,
}

impl VulnerabilityReport {
    #[must_use]
    pub fn from_vulnerabilities(vulnerabilities: Vec<Vulnerability>, scanned_at: DateTime<Utc>) -> Self {
        Self {
            scanned_at,
            severity_counts: SeverityCounts::from_vulnerabilities(&vulnerabilities),
            total: vulnerabilities.len(),
            vulnerabilities,
            failure: None,
        }
    }

    #[must_use]
    pub fn failed(failure: ToolFailure, scanned_at: DateTime<Utc>) -> Self {
        Self {
            scanned_at,
            vulnerabilities: Vec::new(),
            severity_counts: SeverityCounts::default(),
            total: 0,
            failure: Some(failure),
        }
    }

    /// Dashboard status; a missing audit tool asks for setup rather than signalling danger
    #[must_use]
    pub const fn status(&self) -> CardStatus {
        if matches!(self.failure, Some(ToolFailure::Unavailable { .. })) {
            CardStatus::Warning
        } else if self.failure.is_some() {
            CardStatus::Danger
        } else if self.total == 0 {
            CardStatus::Success
        } else if self.severity_counts.critical > 0 || self.severity_counts.high > 0 {
            CardStatus::Danger
        } else {
            CardStatus::Warning
        }
    }

    fn display_value(&self) -> String {
        match &self.failure {
            Some(ToolFailure::Unavailable { .. }) => "Audit tool not installed".to_string(),
            Some(ToolFailure::MalformedOutput { .. }) => "Audit output unreadable".to_string(),
            Some(ToolFailure::TimedOut { .. }) => "Audit timed out".to_string(),
            Some(ToolFailure::Failed { .. }) => "Audit failed".to_string(),
            None => match self.total {
                0 => "No vulnerabilities".to_string(),
                1 => "1 vulnerability".to_string(),
                n => format!("{n} vulnerabilities"),
            },
        }
    }

    /// One badge per non-empty severity bucket, most severe first
    #[must_use]
    pub fn severity_badges(&self) -> Vec<Badge> {
        Criticality::iter()
            .filter_map(|criticality| {
                let count = self.severity_counts.get(criticality);
                let color = criticality.badge_color()?;
                (count > 0).then(|| Badge::new(format!("{criticality}: {count}"), color))
            })
            .collect()
    }

    #[must_use]
    pub fn summary_card(&self) -> SummaryCard {
        SummaryCard {
            title: CARD_TITLE.to_string(),
            icon: CARD_ICON.to_string(),
            status: self.status(),
            display_value: self.display_value(),
            last_updated: self.scanned_at,
            detail_url: CARD_URL.to_string(),
            badges: self.severity_badges(),
        }
    }
}

/// The audit tool's JSON document
#[derive(Debug, Default, Deserialize)]
pub(super) struct AuditOutput {
    #[serde(default)]
    pub results: Vec<AuditResult>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuditResult {
    #[serde(default)]
    pub gem: Option<AuditGem>,
    #[serde(default)]
    pub advisory: Option<AuditAdvisory>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AuditGem {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct AuditAdvisory {
    #[serde(default)]
    pub criticality: Option<String>,
    #[serde(default)]
    pub patched_versions: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl AuditOutput {
    /// Normalize every result that names a gem; insecure-source results carry no gem and are skipped
    pub fn into_vulnerabilities(self) -> Vec<Vulnerability> {
        self.results
            .into_iter()
            .filter_map(|result| {
                let gem = result.gem?;
                let advisory = result.advisory.unwrap_or_default();
                Some(Vulnerability {
                    gem_name: gem.name,
                    installed_version: gem.version.unwrap_or_else(|| "unknown".to_string()),
                    patched_versions: advisory.patched_versions,
                    criticality: Criticality::parse(advisory.criticality.as_deref()),
                    advisory_title: advisory.title.unwrap_or_else(|| "Untitled advisory".to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vulnerability(criticality: Criticality) -> Vulnerability {
        Vulnerability {
            gem_name: "rack".to_string(),
            installed_version: "2.0.1".to_string(),
            patched_versions: vec![">= 2.0.6".to_string()],
            criticality,
            advisory_title: "Possible XSS".to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        let now = Utc::now();
        assert_eq!(VulnerabilityReport::from_vulnerabilities(vec![], now).status(), CardStatus::Success);
        assert_eq!(
            VulnerabilityReport::from_vulnerabilities(vec![vulnerability(Criticality::Low)], now).status(),
            CardStatus::Warning
        );
        assert_eq!(
            VulnerabilityReport::from_vulnerabilities(vec![vulnerability(Criticality::High)], now).status(),
            CardStatus::Danger
        );
        assert_eq!(
            VulnerabilityReport::from_vulnerabilities(vec![vulnerability(Criticality::Unknown)], now).status(),
            CardStatus::Warning
        );
    }

    #[test]
    fn test_missing_tool_needs_setup() {
        let report = VulnerabilityReport::failed(
            ToolFailure::Unavailable {
                tool: "bundle".to_string(),
            },
            Utc::now(),
        );

        let card = report.summary_card();
        assert_eq!(card.status, CardStatus::Warning);
        assert_eq!(card.display_value, "Audit tool not installed");
        assert!(card.badges.is_empty());
    }

    #[test]
    fn test_failed_report_is_danger_with_explanation() {
        let report = VulnerabilityReport::failed(
            ToolFailure::TimedOut { after_secs: 300 },
            Utc::now(),
        );

        let card = report.summary_card();
        assert_eq!(card.status, CardStatus::Danger);
        assert_eq!(card.display_value, "Audit timed out");
    }

    #[test]
    fn test_badges_are_ordered_by_severity() {
        let report = VulnerabilityReport::from_vulnerabilities(
            vec![
                vulnerability(Criticality::Low),
                vulnerability(Criticality::Critical),
                vulnerability(Criticality::Low),
                vulnerability(Criticality::Unknown),
                vulnerability(Criticality::Medium),
            ],
            Utc::now(),
        );

        let badges = report.severity_badges();
        assert_eq!(
            badges,
            vec![
                Badge::new("Critical: 1", BadgeColor::Red),
                Badge::new("Medium: 1", BadgeColor::Yellow),
                Badge::new("Low: 2", BadgeColor::Blue),
            ]
        );
        assert_eq!(report.summary_card().display_value, "5 vulnerabilities");
    }

    #[test]
    fn test_criticality_parse() {
        assert_eq!(Criticality::parse(Some("HIGH")), Criticality::High);
        assert_eq!(Criticality::parse(Some(" critical ")), Criticality::Critical);
        assert_eq!(Criticality::parse(Some("moderate")), Criticality::Medium);
        assert_eq!(Criticality::parse(Some("none")), Criticality::Unknown);
        assert_eq!(Criticality::parse(None), Criticality::Unknown);
    }

    #[test]
    fn test_audit_output_normalization() {
        let json = r#"{
            "version": "0.9.1",
            "results": [
                {
                    "type": "unpatched_gem",
                    "gem": {"name": "actionpack", "version": "5.2.0"},
                    "advisory": {"criticality": "high", "patched_versions": ["~> 5.2.4.3", ">= 6.0.3.1"], "title": "CSRF vulnerability"}
                },
                {"type": "insecure_source", "source": "http://rubygems.org/"},
                {"type": "unpatched_gem", "gem": {"name": "nokogiri", "version": "1.10.0"}, "advisory": {"criticality": null}}
            ]
        }"#;

        let output: AuditOutput = serde_json::from_str(json).unwrap();
        let vulnerabilities = output.into_vulnerabilities();
        assert_eq!(vulnerabilities.len(), 2);
        assert_eq!(vulnerabilities[0].gem_name, "actionpack");
        assert_eq!(vulnerabilities[0].patched_versions.len(), 2);
        assert_eq!(vulnerabilities[0].criticality, Criticality::High);
        assert_eq!(vulnerabilities[1].criticality, Criticality::Unknown);
        assert_eq!(vulnerabilities[1].advisory_title, "Untitled advisory");
    }
}
