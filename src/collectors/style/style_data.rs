use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const CARD_TITLE: &str = "Code Style";
const CARD_ICON: &str = "code";
const CARD_URL: &str = "/healthdeck/quality/style";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StyleStatus {
    Clean,
    IssuesFound,

    /// The linter is not installed
    SetupNeeded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offense {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: String,
    pub message: String,
    pub rule_id: String,
    pub correctable: bool,
}

/// Result of one lint run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleReport {
    pub status: StyleStatus,
    pub offenses: Vec<Offense>,
    pub files_analyzed: usize,
    pub total_offenses: usize,
    pub correctable_count: usize,
    pub target_file_count: usize,
    pub inspected_file_count: usize,
    pub health_score: u8,
    pub analyzed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl StyleReport {
    #[must_use]
    pub fn clean(analyzed_at: DateTime<Utc>) -> Self {
        Self {
            status: StyleStatus::Clean,
            offenses: Vec::new(),
            files_analyzed: 0,
            total_offenses: 0,
            correctable_count: 0,
            target_file_count: 0,
            inspected_file_count: 0,
            health_score: 100,
            analyzed_at,
            error_message: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            status: StyleStatus::Error,
            health_score: 0,
            error_message: Some(message.into()),
            ..Self::clean(analyzed_at)
        }
    }

    #[must_use]
    pub fn setup_needed(message: impl Into<String>, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            status: StyleStatus::SetupNeeded,
            health_score: 0,
            error_message: Some(message.into()),
            ..Self::clean(analyzed_at)
        }
    }

    /// Dashboard status, bucketed on the number of offenses
    #[must_use]
    pub const fn card_status(&self) -> CardStatus {
        match self.status {
            StyleStatus::Clean => CardStatus::Success,
            StyleStatus::SetupNeeded => CardStatus::Warning,
            StyleStatus::Error => CardStatus::Danger,
            StyleStatus::IssuesFound => match self.total_offenses {
                0..=5 => CardStatus::Info,
                6..=15 => CardStatus::Warning,
                _ => CardStatus::Danger,
            },
        }
    }

    fn display_value(&self) -> String {
        match self.status {
            StyleStatus::Clean => "Code is clean!".to_string(),
            StyleStatus::SetupNeeded => "Linter not installed".to_string(),
            StyleStatus::Error => "Analysis failed".to_string(),
            StyleStatus::IssuesFound => format!("{} issues found", self.total_offenses),
        }
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        if self.status == StyleStatus::SetupNeeded {
            return vec![Badge::new("Setup Needed", BadgeColor::Warning)];
        }

        let health_color = match self.health_score {
            90.. => BadgeColor::Success,
            70..=89 => BadgeColor::Info,
            50..=69 => BadgeColor::Warning,
            _ => BadgeColor::Error,
        };

        let mut badges = vec![Badge::new(format!("Health: {}%", self.health_score), health_color)];
        if self.total_offenses > 0 {
            badges.push(Badge::new(format!("{} Issues", self.total_offenses), BadgeColor::Warning));
        }
        if self.correctable_count > 0 {
            badges.push(Badge::new(format!("{} Auto-fixable", self.correctable_count), BadgeColor::Info));
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
            last_updated: self.analyzed_at,
            detail_url: CARD_URL.to_string(),
            badges: self.badges(),
        }
    }
}

/// `max(0, 100 - round(offenses / files * 10))`, treating zero files as one
#[must_use]
pub fn health_score(total_offenses: usize, files_analyzed: usize) -> u8 {
    let files = files_analyzed.max(1) as f64;
    let penalty = (total_offenses as f64 / files * 10.0).round();
    (100.0 - penalty).clamp(0.0, 100.0) as u8
}

/// The lint tool's JSON document
#[derive(Debug, Deserialize)]
pub(super) struct LintOutput {
    #[serde(default)]
    pub files: Vec<LintFile>,
    #[serde(default)]
    pub summary: LintSummary,
}

#[derive(Debug, Deserialize)]
pub(super) struct LintFile {
    pub path: String,
    #[serde(default)]
    pub offenses: Vec<LintOffense>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LintOffense {
    #[serde(default)]
    pub location: LintLocation,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub cop_name: Option<String>,
    #[serde(default)]
    pub correctable: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LintLocation {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LintSummary {
    #[serde(default)]
    pub offense_count: Option<usize>,
    #[serde(default)]
    pub target_file_count: usize,
    #[serde(default)]
    pub inspected_file_count: usize,
}

impl LintOutput {
    pub fn into_report(self, analyzed_at: DateTime<Utc>) -> StyleReport {
        let files_analyzed = self.files.len();
        let offenses: Vec<Offense> = self
            .files
            .into_iter()
            .flat_map(|file| {
                let path = file.path;
                file.offenses.into_iter().map(move |offense| Offense {
                    file: path.clone(),
                    line: offense.location.line,
                    column: offense.location.column,
                    severity: offense.severity.unwrap_or_else(|| "convention".to_string()),
                    message: offense.message,
                    rule_id: offense.cop_name.unwrap_or_else(|| "Unknown".to_string()),
                    correctable: offense.correctable,
                })
            })
            .collect();

        let total_offenses = self.summary.offense_count.unwrap_or(offenses.len());
        let correctable_count = offenses.iter().filter(|o| o.correctable).count();

        StyleReport {
            status: StyleStatus::IssuesFound,
            health_score: health_score(total_offenses, files_analyzed),
            offenses,
            files_analyzed,
            total_offenses,
            correctable_count,
            target_file_count: self.summary.target_file_count,
            inspected_file_count: self.summary.inspected_file_count,
            analyzed_at,
            error_message: None,
        }
    }
}
