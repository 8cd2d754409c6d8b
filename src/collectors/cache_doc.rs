//! File-backed cache documents.
//!
//! Every cached document is a [`CacheEntry`]: the payload together with the time it was
//! collected, stored as a single JSON file. Writes go through a temporary file in the target
//! directory that is renamed into place, so a reader sees either the previous document or the
//! new one, never a partial write.

use crate::Result;
use crate::collectors::path_utils::sanitize_path_component;
use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::IntoAppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = " cache_doc";

/// A payload together with the time it was collected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub cached_at: DateTime<Utc>,
}

/// Whether something collected at `cached_at` is still usable at `now`
///
/// Timestamps in the future (clock skew) count as fresh. An age exactly equal to the TTL does not.
#[must_use]
pub fn is_fresh_at(cached_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(cached_at);
    if age.num_milliseconds() < 0 {
        return true;
    }

    age.to_std().unwrap_or(Duration::MAX) < ttl
}

/// Load a document from a file
pub fn load<T>(path: impl AsRef<Path>, context: impl AsRef<str>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let ctx = context.as_ref();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Cache miss for {ctx}: {e:#}");
            return Err(e).into_app_err_with(|| format!("unable to open file '{}'", path.display()));
        }
    };

    let reader = BufReader::new(file);
    let data = match serde_json::from_reader(reader) {
        Ok(data) => data,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Cache miss for {ctx}: {e:#}");
            return Err(e).into_app_err_with(|| format!("unable to parse file '{}'", path.display()));
        }
    };

    log::debug!(target: LOG_TARGET, "Cache hit for {ctx}");

    Ok(data)
}

/// Load a document from a file with TTL checking.
pub fn load_with_ttl<T, F>(
    path: impl AsRef<Path>,
    ttl: Duration,
    get_timestamp: F,
    now: DateTime<Utc>,
    context: impl AsRef<str>,
) -> Option<T>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> DateTime<Utc>,
{
    let ctx = context.as_ref();
    let data: T = load(path, ctx).ok()?;
    let timestamp = get_timestamp(&data);

    if is_fresh_at(timestamp, ttl, now) {
        log::debug!(target: LOG_TARGET,
            "Cache fresh for {ctx} (age: {:.1} minutes)",
            now.signed_duration_since(timestamp).num_seconds().max(0) as f64 / 60.0
        );
        Some(data)
    } else {
        log::debug!(target: LOG_TARGET,
            "Cache expired for {ctx} (age: {:.1} minutes, TTL: {:.1} minutes)",
            now.signed_duration_since(timestamp).num_seconds() as f64 / 60.0,
            ttl.as_secs_f64() / 60.0
        );
        None
    }
}

/// Save a document to a file, replacing any previous version atomically
pub fn save<T>(data: &T, path: impl AsRef<Path>) -> Result<()>
where
    T: Serialize,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(parent).into_app_err_with(|| format!("unable to create directory '{}'", parent.display()))?;

    let temp = tempfile::NamedTempFile::new_in(parent)
        .into_app_err_with(|| format!("unable to create temporary file next to '{}'", path.display()))?;

    {
        let mut writer = BufWriter::new(temp.as_file());

        // Use pretty formatting in debug mode for easier inspection, compact in release for smaller files
        #[cfg(debug_assertions)]
        let result = serde_json::to_writer_pretty(&mut writer, data);
        #[cfg(not(debug_assertions))]
        let result = serde_json::to_writer(&mut writer, data);

        result.into_app_err_with(|| format!("unable to write cache file '{}'", path.display()))?;
        writer
            .flush()
            .into_app_err_with(|| format!("unable to flush cache file '{}'", path.display()))?;
    }

    let _ = temp
        .persist(path)
        .into_app_err_with(|| format!("unable to move cache file into place at '{}'", path.display()))?;
    Ok(())
}

/// A directory of keyed [`CacheEntry`] documents, one file per key
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: Arc<Path>,
}

impl CacheStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Arc::from(dir.as_ref()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_path_component(key)))
    }

    /// Read the entry for `key` regardless of its age
    ///
    /// Missing or unreadable entries are reported as absent.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        load(self.path_for(key), key).ok()
    }

    /// Read the entry for `key` if it is younger than `ttl`
    #[must_use]
    pub fn get_fresh<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<CacheEntry<T>> {
        load_with_ttl(self.path_for(key), ttl, |entry: &CacheEntry<T>| entry.cached_at, Utc::now(), key)
    }

    /// Whether the entry for `key` exists and is younger than `ttl`
    #[must_use]
    pub fn is_fresh(&self, key: &str, ttl: Duration) -> bool {
        self.get::<serde_json::Value>(key)
            .is_some_and(|entry| is_fresh_at(entry.cached_at, ttl, Utc::now()))
    }

    /// Store `payload` under `key`, stamped with the current time
    ///
    /// Persistence is best effort: a failed write is logged and the caller carries on with the
    /// data it already holds. Returns the timestamp the entry was stamped with.
    pub fn put<T: Serialize>(&self, key: &str, payload: &T) -> DateTime<Utc> {
        let entry = CacheEntry {
            payload,
            cached_at: Utc::now(),
        };

        if let Err(e) = save(&entry, self.path_for(key)) {
            log::warn!(target: LOG_TARGET, "Could not cache {key}: {e}");
        }

        entry.cached_at
    }

    /// Drop the entry for `key`, if any
    pub fn remove(&self, key: &str) {
        if let Err(e) = fs::remove_file(self.path_for(key))
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!(target: LOG_TARGET, "Could not remove cached {key}: {e}");
        }
    }
}
