//! Dependency vulnerabilities reported by the audit tool.

mod collector;
mod vulnerability_data;

pub use collector::VulnerabilityCollector;
pub use vulnerability_data::{Criticality, SeverityCounts, Vulnerability, VulnerabilityReport};
