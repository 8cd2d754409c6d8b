//! Configuration for the collectors.
//!
//! A configuration file is optional. When present it is one of `healthdeck.toml`,
//! `healthdeck.yml`, `healthdeck.yaml`, or `healthdeck.json` in the project root, and any
//! omitted setting falls back to the values in `default_config.yml`.

#[expect(clippy::module_inception, reason = "config::Config reads naturally at call sites")]
mod config;
mod sections;

pub use config::{Config, DEFAULT_CONFIG_YAML};
pub use sections::{CoverageConfig, GemConfig, LogConfig, PerformanceConfig, StyleConfig, TodoConfig, VulnerabilityConfig};
