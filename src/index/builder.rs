//! Index builder: streams the corpus once, cutting it into overlapping
//! chunks and committing them to segment files in bounded batches.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::index::segment::Segment;
use crate::index::{segment_file_name, IndexConfig, IndexMeta, FORMAT_VERSION, META_FILE, SEGMENT_EXT};
use crate::tokenizer::Tokenizer;
use crate::types::ScopeResult;

/// Chunk-progress log interval.
const LOG_FREQUENCY: u64 = 10_000;

/// Summary of a completed index build.
#[derive(Debug, Clone)]
pub struct IndexStats {
    /// Total chunks indexed.
    pub chunk_count: u64,
    /// Segment files written.
    pub segment_count: u32,
    /// Total tokens consumed from the corpus.
    pub token_count: u64,
    /// Trailing tokens that never completed a chunk and were dropped.
    /// At most `chunk_size - overlap_size - 1`; a deliberate limitation,
    /// not padding material.
    pub dropped_trailing: u64,
}

/// Build an index over `corpus_path` into the directory `index_path`.
///
/// Not idempotent: an existing index at `index_path` is rebuilt from
/// scratch (stale segment files are removed first). Callers that want to
/// skip an already-built index must check for it themselves. The build
/// requires exclusive access to the directory; readers must not be open
/// concurrently.
pub fn build_index(
    corpus_path: &Path,
    index_path: &Path,
    config: &IndexConfig,
) -> ScopeResult<IndexStats> {
    config.validate()?;

    let chunk_size = config.chunk_size();
    info!(
        "indexing {} into {} (overlap={}, center={}, chunk_size={})",
        corpus_path.display(),
        index_path.display(),
        config.overlap_size,
        config.center_size,
        chunk_size
    );

    let stream = Tokenizer::new().stream(corpus_path)?;

    fs::create_dir_all(index_path)?;
    remove_stale_segments(index_path)?;

    let mut buffer: Vec<String> = Vec::with_capacity(chunk_size);
    // The first chunk has no left overlap: start the counter as if
    // `overlap_size` tokens had already been consumed.
    let mut buffer_count = config.overlap_size;

    let mut batch = Segment::new(0);
    let mut next_chunk_id: u64 = 0;
    let mut segment_count: u32 = 0;
    let mut token_count: u64 = 0;

    for token in stream {
        buffer.push(token?);
        buffer_count += 1;
        token_count += 1;

        if buffer_count == chunk_size {
            batch.add_chunk(next_chunk_id, &buffer);
            next_chunk_id += 1;

            if next_chunk_id % LOG_FREQUENCY == 0 {
                debug!("indexed {next_chunk_id} chunks");
            }

            // Keep only the right overlap as the start of the next chunk.
            buffer.drain(..buffer.len() - config.overlap_size);
            buffer_count = config.overlap_size;

            if batch.chunk_count() == config.commit_batch {
                commit_segment(index_path, segment_count, &batch)?;
                segment_count += 1;
                // Refresh the metadata after every commit so the index
                // stays openable over the committed prefix; a crash
                // later in the build loses only the batch in flight.
                write_meta(index_path, config, next_chunk_id, segment_count)?;
                batch = Segment::new(next_chunk_id);
            }
        }
    }

    if batch.chunk_count() > 0 {
        commit_segment(index_path, segment_count, &batch)?;
        segment_count += 1;
    }

    // Tokens accumulated since the last emitted chunk never complete one.
    let dropped_trailing = (buffer_count - config.overlap_size) as u64;

    write_meta(index_path, config, next_chunk_id, segment_count)?;

    info!(
        "indexing finished: {} chunks in {} segments, {} trailing tokens dropped",
        next_chunk_id, segment_count, dropped_trailing
    );

    Ok(IndexStats {
        chunk_count: next_chunk_id,
        segment_count,
        token_count,
        dropped_trailing,
    })
}

/// Write a segment to a temp name and rename it into place, so a crash
/// mid-write never leaves a half-segment behind under a committed name.
fn commit_segment(index_path: &Path, ordinal: u32, segment: &Segment) -> ScopeResult<()> {
    let final_path = index_path.join(segment_file_name(ordinal));
    let tmp_path = final_path.with_extension("tmp");

    fs::write(&tmp_path, segment.to_bytes())?;
    fs::rename(&tmp_path, &final_path)?;

    debug!(
        "committed segment {} ({} chunks starting at {})",
        final_path.display(),
        segment.chunk_count(),
        segment.first_chunk_id()
    );
    Ok(())
}

/// Write `meta.json` through a temp name and rename it into place. The
/// metadata always describes a fully committed prefix of the build, so a
/// reader opening after a crash sees every batch committed before it.
fn write_meta(
    index_path: &Path,
    config: &IndexConfig,
    chunk_count: u64,
    segment_count: u32,
) -> ScopeResult<()> {
    let meta = IndexMeta {
        format_version: FORMAT_VERSION,
        overlap_size: config.overlap_size,
        center_size: config.center_size,
        chunk_size: config.chunk_size(),
        chunk_count,
        segment_count,
        built_at: chrono::Utc::now(),
    };
    let meta_json = serde_json::to_vec_pretty(&meta).map_err(std::io::Error::other)?;

    let final_path = index_path.join(META_FILE);
    let tmp_path = final_path.with_extension("tmp");
    fs::write(&tmp_path, meta_json)?;
    fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

/// Remove metadata, segment and temp files left by a previous build.
/// Metadata goes first: it must never describe segments that are gone.
fn remove_stale_segments(index_path: &Path) -> ScopeResult<()> {
    let meta_path = index_path.join(META_FILE);
    if meta_path.exists() {
        debug!("removing stale index file {}", meta_path.display());
        fs::remove_file(&meta_path)?;
    }
    for entry in fs::read_dir(index_path)? {
        let path = entry?.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if matches!(ext, Some(SEGMENT_EXT) | Some("tmp")) {
            debug!("removing stale index file {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
