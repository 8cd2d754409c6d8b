//! Registry metadata for the project's installed packages.

mod fetcher;
mod gem_data;
mod lockfile;

pub use fetcher::{GEM_CACHE_DIR, GemMetadataFetcher};
pub use gem_data::{GemMetadata, GemReport, UNAVAILABLE_DESCRIPTION};
pub use lockfile::{LockedGem, parse_lockfile, read_lockfile};
