use super::gem_data::{GemMetadata, GemReport, RegistryGem};
use super::lockfile::{LockedGem, read_lockfile};
use crate::Result;
use crate::collectors::cache_doc::CacheStore;
use crate::collectors::summary::SummaryAggregator;
use crate::config::GemConfig;
use chrono::Utc;
use core::time::Duration;
use futures_util::stream::{self, StreamExt};
use ohno::{IntoAppError, app_err};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOG_TARGET: &str = "      gems";

/// Subdirectory of the data directory holding one cache entry per package
pub const GEM_CACHE_DIR: &str = "gem_metadata";

/// Registry metadata for the packages listed in the lockfile
#[derive(Debug, Clone)]
pub struct GemMetadataFetcher {
    client: reqwest::Client,
    registry_url: String,
    lockfile: PathBuf,
    cache: CacheStore,
    cache_ttl: Duration,
    concurrency: usize,
    summary: Arc<SummaryAggregator>,
}

impl GemMetadataFetcher {
    pub fn new(config: &GemConfig, project_root: impl AsRef<Path>, data_dir: impl AsRef<Path>, summary: Arc<SummaryAggregator>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("healthdeck")
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .timeout(config.connect_timeout() + config.read_timeout())
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self {
            client,
            registry_url: config.registry_url.trim_end_matches('/').to_string(),
            lockfile: project_root.as_ref().join(&config.lockfile),
            cache: CacheStore::new(data_dir.as_ref().join(GEM_CACHE_DIR)),
            cache_ttl: config.cache_ttl(),
            concurrency: config.concurrency.max(1),
            summary,
        })
    }

    pub async fn get_detail(&self) -> GemReport {
        self.refresh(false).await
    }

    /// Fetch every package in the lockfile and publish the card
    ///
    /// An unreadable lockfile is logged and treated as listing no packages.
    pub async fn refresh(&self, force: bool) -> GemReport {
        let report = match self.fetch(None, force).await {
            Ok(report) => report,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "{e}");
                GemReport::from_gems(Vec::new(), Utc::now())
            }
        };

        self.summary.publish(report.summary_card());
        report
    }

    /// Metadata for `names`, or for every locked package when `names` is `None`
    ///
    /// Installed versions always come from the lockfile. Each package is served from its own
    /// cache entry when that entry is fresh, unless `force` is set. A package that cannot be
    /// fetched gets a placeholder and never fails the batch.
    pub async fn fetch(&self, names: Option<&[String]>, force: bool) -> Result<GemReport> {
        let locked = read_lockfile(&self.lockfile)?;
        let targets: Vec<(String, Option<String>)> = match names {
            None => locked.into_iter().map(|LockedGem { name, version }| (name, Some(version))).collect(),
            Some(names) => {
                let versions: HashMap<String, String> = locked.into_iter().map(|gem| (gem.name, gem.version)).collect();
                names.iter().map(|name| (name.clone(), versions.get(name).cloned())).collect()
            }
        };

        log::debug!(target: LOG_TARGET, "Resolving metadata for {} gems", targets.len());

        let gems: Vec<GemMetadata> = stream::iter(targets)
            .map(|(name, installed)| self.fetch_one(name, installed, force))
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(GemReport::from_gems(gems, Utc::now()))
    }

    async fn fetch_one(&self, name: String, installed: Option<String>, force: bool) -> GemMetadata {
        if !force && let Some(entry) = self.cache.get_fresh::<GemMetadata>(&name, self.cache_ttl) {
            let mut metadata = entry.payload;
            if metadata.current_installed_version == installed {
                log::debug!(target: LOG_TARGET, "Cache hit for gem '{name}'");
                return metadata;
            }

            log::debug!(target: LOG_TARGET, "Installed version of '{name}' changed, updating cache entry");
            metadata.current_installed_version = installed;
            let _ = self.cache.put(&name, &metadata);
            return metadata;
        }

        match self.query_registry(&name).await {
            Ok(registry) => {
                let metadata = registry.into_metadata(installed);
                let _ = self.cache.put(&name, &metadata);
                metadata
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not fetch metadata for gem '{name}': {e}");
                GemMetadata::placeholder(name, installed)
            }
        }
    }

    async fn query_registry(&self, name: &str) -> Result<RegistryGem> {
        let url = format!("{}/{name}.json", self.registry_url);
        log::info!(target: LOG_TARGET, "Querying registry for gem '{name}'");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .into_app_err_with(|| format!("request to {url} failed"))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(app_err!("registry answered HTTP {status} for {url}"));
        }

        response
            .json::<RegistryGem>()
            .await
            .into_app_err_with(|| format!("unable to decode registry response from {url}"))
    }
}
