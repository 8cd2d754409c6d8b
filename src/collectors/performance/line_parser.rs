//! Reassembles requests from the lines of a development request log.
//!
//! A request spans several lines:
//!
//! ```text
//! Started GET "/users" for 127.0.0.1 at 2025-06-10 14:30:45 +0000
//! Processing by UsersController#index as HTML
//! Completed 200 OK in 45ms (Views: 30.2ms | ActiveRecord: 5.1ms | Allocations: 1234)
//! ```
//!
//! Each line is matched against the extractors in order and the first one that matches applies
//! to the most recently started request.

use super::performance_data::RequestSample;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

const LOG_TARGET: &str = "  loadlens";

/// Requests that never complete are dropped once this many newer ones have started
const MAX_IN_FLIGHT: usize = 64;

static START_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Started\s+(\w+)\s+"([^"]+)"\s+for\s+[\d\.:a-fA-F]+\s+at\s+([\d\-]+\s[\d:]+(?:\s[+\-]\d{4})?)"#).expect("invalid regex")
});

static PROCESSING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Processing\s+by\s+([^#]+)#(\w+)\s+as").expect("invalid regex"));

static COMPLETED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Completed\s+(\d+)\s+[\w ]+?\s+in\s+([\d\.]+)ms(?:\s+\(([^)]+)\))?").expect("invalid regex"));

static VIEWS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Views:\s+([\d\.]+)ms").expect("invalid regex"));

static ACTIVE_RECORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ActiveRecord:\s+([\d\.]+)ms").expect("invalid regex"));

/// Parse a log timestamp, with or without a UTC offset; unparsable stamps fall back to now
fn parse_timestamp(text: &str) -> DateTime<Utc> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z") {
        return timestamp.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }

    log::debug!(target: LOG_TARGET, "Unparsable request timestamp '{text}'");
    Utc::now()
}

fn capture_f64(regex: &Regex, text: &str) -> Option<f64> {
    regex.captures(text)?.get(1)?.as_str().parse().ok()
}

#[derive(Debug, Clone)]
struct InFlight {
    http_method: String,
    path: String,
    timestamp: DateTime<Utc>,
    controller: Option<String>,
    action: Option<String>,
    view_time_ms: Option<f64>,
    db_time_ms: Option<f64>,
}

impl InFlight {
    /// A finished request, provided the controller and action are known
    fn complete(self, status_code: u16, total_time_ms: f64) -> Option<RequestSample> {
        let controller = self.controller.filter(|c| !c.is_empty())?;
        let action = self.action.filter(|a| !a.is_empty())?;

        Some(RequestSample {
            controller,
            action,
            http_method: self.http_method,
            path: self.path,
            status_code,
            total_time_ms,
            view_time_ms: self.view_time_ms.unwrap_or(0.0),
            db_time_ms: self.db_time_ms.unwrap_or(0.0),
            timestamp: self.timestamp,
        })
    }
}

/// Incremental request parser; feed it lines in log order
#[derive(Debug, Default)]
pub struct RequestParser {
    in_flight: Vec<InFlight>,
}

impl RequestParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests started but not yet completed
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Process one line, returning the request it completed, if any
    pub fn feed(&mut self, line: &str) -> Option<RequestSample> {
        if let Some(captures) = START_REGEX.captures(line) {
            if self.in_flight.len() >= MAX_IN_FLIGHT {
                let _ = self.in_flight.remove(0);
            }

            self.in_flight.push(InFlight {
                http_method: captures[1].to_string(),
                path: captures[2].to_string(),
                timestamp: parse_timestamp(&captures[3]),
                controller: None,
                action: None,
                view_time_ms: None,
                db_time_ms: None,
            });
            return None;
        }

        if let Some(captures) = PROCESSING_REGEX.captures(line) {
            if let Some(current) = self.in_flight.last_mut() {
                current.controller = Some(captures[1].trim().to_string());
                current.action = Some(captures[2].to_string());
            }
            return None;
        }

        if let Some(captures) = COMPLETED_REGEX.captures(line) {
            let mut current = self.in_flight.pop()?;
            let status_code = captures[1].parse().unwrap_or(0);
            let total_time_ms = captures[2].parse().unwrap_or(0.0);

            if let Some(details) = captures.get(3).map(|m| m.as_str()) {
                current.view_time_ms = capture_f64(&VIEWS_REGEX, details).or(current.view_time_ms);
                current.db_time_ms = capture_f64(&ACTIVE_RECORD_REGEX, details).or(current.db_time_ms);
            }

            let sample = current.complete(status_code, total_time_ms);
            if sample.is_none() {
                log::debug!(target: LOG_TARGET, "Discarding completed request without controller and action");
            }
            return sample;
        }

        if let Some(view_time_ms) = capture_f64(&VIEWS_REGEX, line) {
            if let Some(current) = self.in_flight.last_mut() {
                current.view_time_ms = Some(view_time_ms);
            }
        } else if let Some(db_time_ms) = capture_f64(&ACTIVE_RECORD_REGEX, line)
            && let Some(current) = self.in_flight.last_mut()
        {
            current.db_time_ms = Some(db_time_ms);
        }

        None
    }
}
