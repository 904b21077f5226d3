//! Feed source abstraction.
//!
//! [`FeedSource`] is the seam between the live monitor and wherever the two
//! tables come from: the NOAA HTTP API in production, saved files for
//! offline runs, or scripted fakes in tests.

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{FeedError, KpFeed, PlasmaFeed};

/// Trait for fetching the Kp and solar wind plasma feeds.
///
/// # Example
///
/// ```
/// use spacewx_feeds::{FeedSource, FileFeeds};
///
/// let source = FileFeeds::new("kp.json", "plasma.json");
/// assert_eq!(source.description(), "files: kp.json, plasma.json");
/// ```
#[async_trait]
pub trait FeedSource: Send + Sync + Debug {
    /// Fetch and parse the planetary Kp feed.
    async fn fetch_kp(&self) -> Result<KpFeed, FeedError>;

    /// Fetch and parse the solar wind plasma feed.
    async fn fetch_plasma(&self) -> Result<PlasmaFeed, FeedError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

/// A feed source that reads both tables from JSON files on disk.
///
/// Each fetch re-reads the file, so replacing a file between ticks behaves
/// like the upstream feed publishing new rows.
#[derive(Debug)]
pub struct FileFeeds {
    kp_path: PathBuf,
    plasma_path: PathBuf,
    description: String,
}

impl FileFeeds {
    /// Create a file source for the given Kp and plasma table paths.
    pub fn new(kp_path: impl AsRef<Path>, plasma_path: impl AsRef<Path>) -> Self {
        let kp_path = kp_path.as_ref().to_path_buf();
        let plasma_path = plasma_path.as_ref().to_path_buf();
        let description = format!("files: {}, {}", kp_path.display(), plasma_path.display());
        Self {
            kp_path,
            plasma_path,
            description,
        }
    }

    fn read(path: &Path) -> Result<Vec<u8>, FeedError> {
        fs::read(path).map_err(|e| FeedError::Connection(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl FeedSource for FileFeeds {
    async fn fetch_kp(&self) -> Result<KpFeed, FeedError> {
        KpFeed::from_slice(&Self::read(&self.kp_path)?)
    }

    async fn fetch_plasma(&self) -> Result<PlasmaFeed, FeedError> {
        PlasmaFeed::from_slice(&Self::read(&self.plasma_path)?)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
