//! Persistent corpus index: overlapping chunks plus a positional
//! postings table supporting ordered phrase queries with slop.
//!
//! The on-disk layout is a directory of immutable segment files
//! (`seg-NNNNNNNNNN.seg`), one per committed batch, next to a `meta.json`
//! describing the chunking configuration. Single writer, many readers;
//! a rebuild requires exclusive access to the directory.

pub mod builder;
pub mod reader;
pub mod segment;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ScopeError, ScopeResult};

pub use builder::{build_index, IndexStats};
pub use reader::CorpusIndex;

/// Default number of tokens shared between adjacent chunks.
pub const DEFAULT_OVERLAP_SIZE: usize = 20;
/// Default number of unshared tokens at the center of a chunk.
pub const DEFAULT_CENTER_SIZE: usize = 40;
/// Default number of chunks per committed segment.
pub const DEFAULT_COMMIT_BATCH: usize = 500_000;

pub(crate) const FORMAT_VERSION: u32 = 1;
pub(crate) const META_FILE: &str = "meta.json";
pub(crate) const SEGMENT_EXT: &str = "seg";

/// Zero-padded wide enough that lexicographic order is commit order for
/// every `u32` ordinal.
pub(crate) fn segment_file_name(ordinal: u32) -> String {
    format!("seg-{ordinal:010}.{SEGMENT_EXT}")
}

/// Chunking configuration for an index build.
///
/// `overlap_size` should be at least the largest window size that will be
/// queried, so that any window fits entirely inside one chunk.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Tokens shared between adjacent chunks.
    pub overlap_size: usize,
    /// Unshared tokens at the center of each chunk.
    pub center_size: usize,
    /// Chunks per committed segment. A crash loses at most the
    /// uncommitted batch, never prior segments.
    pub commit_batch: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            overlap_size: DEFAULT_OVERLAP_SIZE,
            center_size: DEFAULT_CENTER_SIZE,
            commit_batch: DEFAULT_COMMIT_BATCH,
        }
    }
}

impl IndexConfig {
    /// Full chunk length: `center_size + 2 * overlap_size`.
    pub fn chunk_size(&self) -> usize {
        self.center_size + 2 * self.overlap_size
    }

    /// Eager validation, run before any I/O.
    pub(crate) fn validate(&self) -> ScopeResult<()> {
        if self.overlap_size == 0 {
            return Err(ScopeError::InvalidConfiguration(
                "overlap_size must be greater than zero".into(),
            ));
        }
        if self.center_size == 0 {
            return Err(ScopeError::InvalidConfiguration(
                "center_size must be greater than zero".into(),
            ));
        }
        if self.commit_batch == 0 {
            return Err(ScopeError::InvalidConfiguration(
                "commit_batch must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Index metadata persisted as `meta.json` in the index directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    pub overlap_size: usize,
    pub center_size: usize,
    pub chunk_size: usize,
    pub chunk_count: u64,
    pub segment_count: u32,
    pub built_at: DateTime<Utc>,
}
