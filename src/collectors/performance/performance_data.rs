use crate::collectors::summary::{Badge, BadgeColor, CardStatus, SummaryCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

pub const CARD_TITLE: &str = "Request Performance";
const CARD_ICON: &str = "activity";
const CARD_URL: &str = "/healthdeck/performance/load_lens";

/// Error rate, in percent, above which the card turns red
const ERROR_RATE_LIMIT: f64 = 10.0;

/// Share of slow requests above which the card turns yellow
const SLOW_SHARE_LIMIT: f64 = 0.1;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One completed request extracted from the request log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSample {
    pub controller: String,
    pub action: String,
    pub http_method: String,
    pub path: String,
    pub status_code: u16,
    pub total_time_ms: f64,
    pub view_time_ms: f64,
    pub db_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PerformanceStatus {
    Success,
    Info,
    Warning,
    Error,
}

/// Aggregate over every retained request sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_requests: usize,
    pub avg_response_time_ms: f64,
    pub avg_view_time_ms: f64,
    pub avg_db_time_ms: f64,
    pub slow_requests: usize,

    /// Percentage of requests answered with a status of 400 or above
    pub error_rate: f64,
    pub status: PerformanceStatus,

    /// Newest first
    pub recent_requests: Vec<RequestSample>,
    pub last_updated: DateTime<Utc>,
}

impl PerformanceReport {
    #[must_use]
    pub fn from_samples(mut samples: Vec<RequestSample>, slow_request_ms: u64, recent_count: usize, now: DateTime<Utc>) -> Self {
        let total = samples.len();
        if total == 0 {
            return Self {
                total_requests: 0,
                avg_response_time_ms: 0.0,
                avg_view_time_ms: 0.0,
                avg_db_time_ms: 0.0,
                slow_requests: 0,
                error_rate: 0.0,
                status: PerformanceStatus::Info,
                recent_requests: Vec::new(),
                last_updated: now,
            };
        }

        let count = total as f64;
        let average = |f: fn(&RequestSample) -> f64| round2(samples.iter().map(f).sum::<f64>() / count);
        let avg_response_time_ms = average(|s| s.total_time_ms);
        let avg_view_time_ms = average(|s| s.view_time_ms);
        let avg_db_time_ms = average(|s| s.db_time_ms);

        let slow_limit = slow_request_ms as f64;
        let slow_requests = samples.iter().filter(|s| s.total_time_ms > slow_limit).count();
        let errors = samples.iter().filter(|s| s.status_code >= 400).count();
        let error_rate = round2(errors as f64 / count * 100.0);

        let status = if error_rate > ERROR_RATE_LIMIT {
            PerformanceStatus::Error
        } else if avg_response_time_ms > slow_limit || slow_requests as f64 > count * SLOW_SHARE_LIMIT {
            PerformanceStatus::Warning
        } else {
            PerformanceStatus::Success
        };

        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        samples.truncate(recent_count);

        Self {
            total_requests: total,
            avg_response_time_ms,
            avg_view_time_ms,
            avg_db_time_ms,
            slow_requests,
            error_rate,
            status,
            recent_requests: samples,
            last_updated: now,
        }
    }

    #[must_use]
    pub const fn card_status(&self) -> CardStatus {
        match self.status {
            PerformanceStatus::Success => CardStatus::Success,
            PerformanceStatus::Info => CardStatus::Info,
            PerformanceStatus::Warning => CardStatus::Warning,
            PerformanceStatus::Error => CardStatus::Danger,
        }
    }

    fn display_value(&self) -> String {
        match self.total_requests {
            0 => "No requests tracked".to_string(),
            1 => "1 request".to_string(),
            n => format!("{n} requests"),
        }
    }

    #[must_use]
    pub fn badges(&self) -> Vec<Badge> {
        let mut badges = vec![Badge::new(format!("{} Requests", self.total_requests), BadgeColor::Info)];
        badges.push(match self.status {
            PerformanceStatus::Error => Badge::new("High Errors", BadgeColor::Danger),
            PerformanceStatus::Warning => Badge::new("Slow Responses", BadgeColor::Warning),
            PerformanceStatus::Success | PerformanceStatus::Info => Badge::new("Healthy", BadgeColor::Success),
        });

        if self.avg_response_time_ms > 0.0 {
            badges.push(Badge::new(format!("{}ms avg", self.avg_response_time_ms), BadgeColor::Neutral));
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
            last_updated: self.last_updated,
            detail_url: CARD_URL.to_string(),
            badges: self.badges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn sample(status_code: u16, total_time_ms: f64, minutes_ago: i64) -> RequestSample {
        RequestSample {
            controller: "UsersController".to_string(),
            action: "index".to_string(),
            http_method: "GET".to_string(),
            path: "/users".to_string(),
            status_code,
            total_time_ms,
            view_time_ms: total_time_ms / 2.0,
            db_time_ms: 1.0,
            timestamp: Utc::now() - TimeDelta::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_empty_report_is_info() {
        let report = PerformanceReport::from_samples(Vec::new(), 1000, 20, Utc::now());
        assert_eq!(report.status, PerformanceStatus::Info);
        assert_eq!(report.card_status(), CardStatus::Info);

        let card = report.summary_card();
        assert_eq!(card.display_value, "No requests tracked");
        assert_eq!(
            card.badges,
            vec![Badge::new("0 Requests", BadgeColor::Info), Badge::new("Healthy", BadgeColor::Success)]
        );
    }

    #[test]
    fn test_averages_and_rates() {
        let samples = vec![sample(200, 10.0, 3), sample(200, 20.0, 2), sample(500, 31.0, 1)];
        let report = PerformanceReport::from_samples(samples, 1000, 20, Utc::now());

        assert_eq!(report.total_requests, 3);
        assert!((report.avg_response_time_ms - 20.33).abs() < f64::EPSILON);
        assert!((report.avg_view_time_ms - 10.17).abs() < f64::EPSILON);
        assert!((report.error_rate - 33.33).abs() < f64::EPSILON);
        assert_eq!(report.status, PerformanceStatus::Error);
        assert_eq!(report.card_status(), CardStatus::Danger);
        assert_eq!(report.recent_requests[0].status_code, 500);
    }

    #[test]
    fn test_slow_requests_warn() {
        let mut samples: Vec<RequestSample> = (0..9).map(|i| sample(200, 50.0, i)).collect();
        samples.push(sample(200, 1500.0, 10));
        let report = PerformanceReport::from_samples(samples.clone(), 1000, 20, Utc::now());
        assert_eq!(report.slow_requests, 1);
        assert_eq!(report.status, PerformanceStatus::Success);

        samples.push(sample(200, 2500.0, 11));
        let report = PerformanceReport::from_samples(samples, 1000, 20, Utc::now());
        assert_eq!(report.slow_requests, 2);
        assert_eq!(report.status, PerformanceStatus::Warning);
        assert!(report.badges().contains(&Badge::new("Slow Responses", BadgeColor::Warning)));
    }

    #[test]
    fn test_recent_requests_are_newest_first_and_bounded() {
        let samples: Vec<RequestSample> = (0..30).map(|i| sample(200, 5.0, i)).collect();
        let report = PerformanceReport::from_samples(samples, 1000, 20, Utc::now());

        assert_eq!(report.recent_requests.len(), 20);
        assert!(report.recent_requests[0].timestamp > report.recent_requests[19].timestamp);
        assert_eq!(report.summary_card().display_value, "30 requests");
        assert!(report.badges().contains(&Badge::new("5ms avg", BadgeColor::Neutral)));
    }
}
