use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const CARD_TITLE: &str = "Test Coverage";
const CARD_ICON: &str = "target";
const CARD_URL: &str = "/healthdeck/quality/coverage";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(covered: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(covered as f64 / total as f64 * 100.0)
    }
}

/// Letter grade of an overall coverage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[strum(serialize = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90.0 => Self::APlus,
            p if p >= 80.0 => Self::A,
            p if p >= 70.0 => Self::B,
            p if p >= 60.0 => Self::C,
            p if p >= 50.0 => Self::D,
            _ => Self::F,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageFile {
    pub relative_path: String,
    pub total_trackable_lines: usize,
    pub covered_lines: usize,
    pub covered_percentage: f64,

    /// 1-based numbers of trackable lines that never ran
    pub missed_line_numbers: Vec<usize>,
}

impl CoverageFile {
    #[must_use]
    pub fn from_hits(relative_path: impl Into<String>, hits: &[Option<u64>]) -> Self {
        let mut total = 0;
        let mut covered = 0;
        let mut missed = Vec::new();

        for (index, line) in hits.iter().enumerate() {
            match line {
                None => {}
                Some(0) => {
                    total += 1;
                    missed.push(index + 1);
                }
                Some(_) => {
                    total += 1;
                    covered += 1;
                }
            }
        }

        Self {
            relative_path: relative_path.into(),
            total_trackable_lines: total,
            covered_lines: covered,
            covered_percentage: percentage(covered, total),
            missed_line_numbers: missed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub overall_percentage: f64,
    pub per_file: Vec<CoverageFile>,
    pub total_lines: usize,
    pub covered_lines: usize,
    pub files_count: usize,
    pub grade: Grade,

    /// Modification time of the result file the report was built from
    pub source_data_timestamp: DateTime<Utc>,
}

impl CoverageReport {
    #[must_use]
    pub fn from_files(mut per_file: Vec<CoverageFile>, source_data_timestamp: DateTime<Utc>) -> Self {
        per_file.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let total_lines = per_file.iter().map(|f| f.total_trackable_lines).sum();
        let covered_lines = per_file.iter().map(|f| f.covered_lines).sum();
        let overall_percentage = percentage(covered_lines, total_lines);

        Self {
            overall_percentage,
            files_count: per_file.len(),
            per_file,
            total_lines,
            covered_lines,
            grade: Grade::from_percentage(overall_percentage),
            source_data_timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestFramework {
    Rspec,
    Minitest,
    Custom,
}

/// How to get coverage data for one kind of test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupGuide {
    pub framework: TestFramework,
    pub title: String,
    pub steps: Vec<String>,
}

impl SetupGuide {
    fn new(framework: TestFramework, title: &str, steps: &[&str]) -> Self {
        Self {
            framework,
            title: title.to_string(),
            steps: steps.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Guidance for every supported kind of suite, the detected one first
    #[must_use]
    pub fn all(detected: TestFramework) -> Vec<Self> {
        let mut guides = vec![
            Self::new(
                TestFramework::Rspec,
                "For RSpec projects:",
                &[
                    "Add 'simplecov' to your Gemfile",
                    "Add the following to the top of spec/spec_helper.rb:",
                    "require 'simplecov'\nSimpleCov.start 'rails'",
                    "Run your test suite: bundle exec rspec",
                ],
            ),
            Self::new(
                TestFramework::Minitest,
                "For Minitest projects:",
                &[
                    "Add 'simplecov' to your Gemfile",
                    "Add the following to the top of test/test_helper.rb:",
                    "require 'simplecov'\nSimpleCov.start 'rails'",
                    "Run your test suite: bundle exec rails test",
                ],
            ),
            Self::new(
                TestFramework::Custom,
                "For other test frameworks:",
                &[
                    "Install the simplecov gem",
                    "Start SimpleCov at the very beginning of your test helper",
                    "Run your test suite to generate coverage data",
                ],
            ),
        ];

        guides.sort_by_key(|guide| guide.framework != detected);
        guides
    }
}

/// Everything the coverage collector can report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoverageOutcome {
    Report(CoverageReport),

    /// The result file exists but is older than the staleness limit
    Stale { report: CoverageReport, age_hours: f64 },

    /// No result file yet; this is the first-run state of a project
    SetupRequired { detected: TestFramework, guides: Vec<SetupGuide> },

    /// The result file could not be read or parsed
    Failed { message: String },
}

impl CoverageOutcome {
    #[must_use]
    pub fn setup_required(detected: TestFramework) -> Self {
        Self::SetupRequired {
            detected,
            guides: SetupGuide::all(detected),
        }
    }

    /// The report carried by this outcome, stale or not
    #[must_use]
    pub const fn report(&self) -> Option<&CoverageReport> {
        match self {
            Self::Report(report) | Self::Stale { report, .. } => Some(report),
            Self::SetupRequired { .. } | Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> CardStatus {
        match self {
            Self::SetupRequired { .. } => CardStatus::Info,
            Self::Failed { .. } => CardStatus::Danger,
            Self::Stale { .. } => CardStatus::Warning,
            Self::Report(report) => match report.overall_percentage {
                p if p < 50.0 => CardStatus::Danger,
                p if p < 80.0 => CardStatus::Warning,
                p if p < 95.0 => CardStatus::Info,
                _ => CardStatus::Success,
            },
        }
    }

    fn display_value(&self) -> String {
        match self {
            Self::SetupRequired { .. } => "Setup required".to_string(),
            Self::Failed { .. } => "Analysis error".to_string(),
            Self::Stale { .. } => "Stale data".to_string(),
            Self::Report(report) => format!("{:.1}% coverage", report.overall_percentage),
        }
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        let Some(report) = self.report() else {
            return Vec::new();
        };

        let color = match report.overall_percentage {
            p if p < 50.0 => BadgeColor::Error,
            p if p < 80.0 => BadgeColor::Warning,
            p if p < 95.0 => BadgeColor::Info,
            _ => BadgeColor::Success,
        };

        vec![
            Badge::new(format!("{:.1}% Coverage", report.overall_percentage), color),
            Badge::new(format!("{} Files", report.files_count), BadgeColor::Info),
        ]
    }

    #[must_use]
    pub fn summary_card(&self, checked_at: DateTime<Utc>) -> SummaryCard {
        SummaryCard {
            title: CARD_TITLE.to_string(),
            icon: CARD_ICON.to_string(),
            status: self.status(),
            display_value: self.display_value(),
            last_updated: checked_at,
            detail_url: CARD_URL.to_string(),
            badges: self.badges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(covered: usize, total: usize) -> CoverageReport {
        let hits: Vec<Option<u64>> = (0..total).map(|i| Some(u64::from(i < covered))).collect();
        CoverageReport::from_files(vec![CoverageFile::from_hits("app/a.rb", &hits)], Utc::now())
    }

    #[test]
    fn test_file_from_hits() {
        let file = CoverageFile::from_hits("app/models/user.rb", &[Some(1), Some(0), None, Some(2)]);
        assert_eq!(file.total_trackable_lines, 3);
        assert_eq!(file.covered_lines, 2);
        assert!((file.covered_percentage - 66.67).abs() < f64::EPSILON);
        assert_eq!(file.missed_line_numbers, vec![2]);
    }

    #[test]
    fn test_file_without_trackable_lines() {
        let file = CoverageFile::from_hits("config/boot.rb", &[None, None]);
        assert_eq!(file.total_trackable_lines, 0);
        assert!(file.covered_percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_totals_and_grade() {
        let report = CoverageReport::from_files(
            vec![
                CoverageFile::from_hits("b.rb", &[Some(1), Some(1), Some(0)]),
                CoverageFile::from_hits("a.rb", &[Some(0), None]),
            ],
            Utc::now(),
        );

        assert_eq!(report.total_lines, 4);
        assert_eq!(report.covered_lines, 2);
        assert!((report.overall_percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.grade, Grade::D);
        assert_eq!(report.files_count, 2);
        assert_eq!(report.per_file[0].relative_path, "a.rb");
    }

    #[test]
    fn test_grades() {
        assert_eq!(Grade::from_percentage(95.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(89.99), Grade::A);
        assert_eq!(Grade::from_percentage(70.0), Grade::B);
        assert_eq!(Grade::from_percentage(60.0), Grade::C);
        assert_eq!(Grade::from_percentage(50.0), Grade::D);
        assert_eq!(Grade::from_percentage(0.0), Grade::F);
        assert_eq!(Grade::APlus.to_string(), "A+");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(CoverageOutcome::Report(report(40, 100)).status(), CardStatus::Danger);
        assert_eq!(CoverageOutcome::Report(report(79, 100)).status(), CardStatus::Warning);
        assert_eq!(CoverageOutcome::Report(report(94, 100)).status(), CardStatus::Info);
        assert_eq!(CoverageOutcome::Report(report(95, 100)).status(), CardStatus::Success);
        assert_eq!(
            CoverageOutcome::Stale {
                report: report(100, 100),
                age_hours: 30.5
            }
            .status(),
            CardStatus::Warning
        );
        assert_eq!(CoverageOutcome::setup_required(TestFramework::Custom).status(), CardStatus::Info);
        assert_eq!(
            CoverageOutcome::Failed {
                message: "bad json".to_string()
            }
            .status(),
            CardStatus::Danger
        );
    }

    #[test]
    fn test_card_for_report() {
        let card = CoverageOutcome::Report(report(87, 100)).summary_card(Utc::now());
        assert_eq!(card.title, CARD_TITLE);
        assert_eq!(card.display_value, "87.0% coverage");
        assert_eq!(
            card.badges,
            vec![
                Badge::new("87.0% Coverage", BadgeColor::Info),
                Badge::new("1 Files", BadgeColor::Info),
            ]
        );
    }

    #[test]
    fn test_setup_guides_put_detected_framework_first() {
        let CoverageOutcome::SetupRequired { detected, guides } = CoverageOutcome::setup_required(TestFramework::Minitest) else {
            panic!("expected setup guidance");
        };

        assert_eq!(detected, TestFramework::Minitest);
        assert_eq!(guides.len(), 3);
        assert_eq!(guides[0].framework, TestFramework::Minitest);
        assert!(guides[0].steps.iter().any(|s| s.contains("test/test_helper.rb")));
    }

    #[test]
    fn test_outcome_serializes_with_state_tag() {
        let json = serde_json::to_value(CoverageOutcome::Failed {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["message"], "boom");
    }
}
