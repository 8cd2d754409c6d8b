//! healthdeck crate
//!
//! The data-collection and caching core of a development-time project health dashboard. Each
//! collector gathers one signal about a codebase, caches it with its own freshness policy, and
//! publishes a summary card into a shared aggregate that a presentation layer can render.
//!
//! This crate is an implementation detail of the `healthdeck` tool. Its API is fluid and may
//! change without warning and in a semver-incompatible way.

/// Result type alias using `ohno::AppError` as the default error type.
pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod collectors;

#[doc(hidden)]
pub mod config;

#[doc(hidden)]
pub mod reports;
