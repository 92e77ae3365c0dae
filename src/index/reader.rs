//! Read side of the corpus index: open a built index directory and run
//! phrase-proximity queries over it.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::index::segment::Segment;
use crate::index::{IndexMeta, META_FILE, SEGMENT_EXT};
use crate::types::{ScopeError, ScopeResult};

/// An opened corpus index. Read-only: every query takes `&self`, so
/// independent queries can run concurrently. Must not be open while the
/// index directory is being rebuilt.
pub struct CorpusIndex {
    meta: IndexMeta,
    /// Chunk token sequences, indexed by chunk id.
    chunks: Vec<Vec<String>>,
    /// term → (chunk_id, position), sorted by (chunk_id, position).
    postings: HashMap<String, Vec<(u64, u32)>>,
}

impl CorpusIndex {
    /// Open a previously built index directory, merging all segments.
    pub fn open(index_path: &Path) -> ScopeResult<Self> {
        if !index_path.is_dir() {
            return Err(ScopeError::ResourceNotFound(index_path.to_path_buf()));
        }

        let meta_path = index_path.join(META_FILE);
        let meta_data = fs::read(&meta_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScopeError::ResourceNotFound(meta_path.clone())
            } else {
                ScopeError::Io(e)
            }
        })?;
        let meta: IndexMeta = serde_json::from_slice(&meta_data)
            .map_err(|_| ScopeError::CorruptIndex(meta_path.clone()))?;

        // Segment file names embed their commit ordinal, so lexicographic
        // order is chunk-id order.
        let mut segment_paths: Vec<_> = fs::read_dir(index_path)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(SEGMENT_EXT))
            .collect();
        segment_paths.sort();
        // A crash between a segment rename and the matching metadata
        // refresh can leave one segment past what `meta` records; only
        // the recorded prefix is committed.
        segment_paths.truncate(meta.segment_count as usize);

        let mut chunks: Vec<Vec<String>> = Vec::new();
        let mut postings: HashMap<String, Vec<(u64, u32)>> = HashMap::new();

        for path in &segment_paths {
            let data = fs::read(path)?;
            let segment = Segment::from_bytes(&data)
                .ok_or_else(|| ScopeError::CorruptIndex(path.clone()))?;

            let (first_chunk_id, segment_chunks, segment_postings) = segment.into_parts();
            if first_chunk_id != chunks.len() as u64 {
                return Err(ScopeError::CorruptIndex(path.clone()));
            }
            chunks.extend(segment_chunks);

            // Segments arrive in chunk-id order, so appending keeps every
            // posting list sorted by (chunk_id, position).
            for (term, list) in segment_postings {
                postings.entry(term).or_default().extend(list);
            }
            debug!("loaded segment {}", path.display());
        }

        if chunks.len() as u64 != meta.chunk_count {
            return Err(ScopeError::CorruptIndex(index_path.to_path_buf()));
        }

        info!(
            "opened index {}: {} chunks, {} terms, {} segments",
            index_path.display(),
            chunks.len(),
            postings.len(),
            segment_paths.len()
        );

        Ok(Self {
            meta,
            chunks,
            postings,
        })
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> u64 {
        self.chunks.len() as u64
    }

    /// Number of unique terms across all chunks.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Chunk length the index was built with.
    pub fn chunk_size(&self) -> usize {
        self.meta.chunk_size
    }

    /// Overlap the index was built with.
    pub fn overlap_size(&self) -> usize {
        self.meta.overlap_size
    }

    /// Token sequence of a chunk, if the id is in range.
    pub fn chunk_tokens(&self, chunk_id: u64) -> Option<&[String]> {
        self.chunks.get(chunk_id as usize).map(|c| c.as_slice())
    }

    /// Positional postings for a term. Empty slice for unknown terms.
    pub fn postings(&self, term: &str) -> &[(u64, u32)] {
        self.postings.get(term).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Find every chunk containing `words` in the given order, with the
    /// whole sequence spanning at most `slop` positions. Returned ids are
    /// ascending and de-duplicated.
    pub fn phrase_query(&self, words: &[String], slop: usize) -> Vec<u64> {
        if words.is_empty() || slop == 0 {
            return Vec::new();
        }

        let lists: Vec<&[(u64, u32)]> = words.iter().map(|w| self.postings(w)).collect();
        if lists.iter().any(|l| l.is_empty()) {
            return Vec::new();
        }

        // Candidate chunks must contain every word; start from the word
        // with the shortest posting list.
        let smallest = lists
            .iter()
            .min_by_key(|l| l.len())
            .copied()
            .unwrap_or(&[]);
        let candidates: BTreeSet<u64> = smallest
            .iter()
            .map(|&(chunk_id, _)| chunk_id)
            .filter(|&chunk_id| {
                lists
                    .iter()
                    .all(|list| !chunk_positions(list, chunk_id).is_empty())
            })
            .collect();

        candidates
            .into_iter()
            .filter(|&chunk_id| {
                let per_word: Vec<&[(u64, u32)]> = lists
                    .iter()
                    .map(|list| chunk_positions(list, chunk_id))
                    .collect();
                ordered_within_slop(&per_word, slop as u32)
            })
            .collect()
    }
}

/// Subslice of a sorted posting list covering one chunk. Postings for
/// one chunk are contiguous, so two partition points bound the range.
fn chunk_positions(list: &[(u64, u32)], chunk_id: u64) -> &[(u64, u32)] {
    let start = list.partition_point(|&(id, _)| id < chunk_id);
    let end = list.partition_point(|&(id, _)| id <= chunk_id);
    &list[start..end]
}

/// True if positions can be picked, one per word in order, strictly
/// increasing, with total span `last - first + 1 <= slop`. Each slice
/// holds the sorted positions of one word within a single chunk.
fn ordered_within_slop(per_word: &[&[(u64, u32)]], slop: u32) -> bool {
    if per_word.is_empty() || per_word.iter().any(|p| p.is_empty()) {
        return false;
    }
    // For every start position of the first word, greedily take the
    // smallest admissible position for each following word. The greedy
    // choice minimizes the end position, hence the span, for that start.
    'starts: for &(_, start) in per_word[0] {
        let mut prev = start;
        for positions in &per_word[1..] {
            let next = positions.partition_point(|&(_, p)| p <= prev);
            match positions.get(next) {
                Some(&(_, p)) => prev = p,
                None => continue 'starts,
            }
        }
        if prev - start + 1 <= slop {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slop_check_requires_order_and_span() {
        let a: &[(u64, u32)] = &[(0, 2), (0, 9)];
        let b: &[(u64, u32)] = &[(0, 5)];

        // "a b": 2 -> 5, span 4.
        assert!(ordered_within_slop(&[a, b], 4));
        assert!(!ordered_within_slop(&[a, b], 3));

        // "b a": 5 -> 9, span 5.
        assert!(ordered_within_slop(&[b, a], 5));
        assert!(!ordered_within_slop(&[b, a], 4));
    }

    #[test]
    fn slop_check_single_word() {
        let a: &[(u64, u32)] = &[(3, 17)];
        assert!(ordered_within_slop(&[a], 1));
    }

    #[test]
    fn slop_check_later_start_can_succeed() {
        // The first occurrence of "a" is too far from "b"; the second
        // one is adjacent.
        let a: &[(u64, u32)] = &[(0, 0), (0, 40)];
        let b: &[(u64, u32)] = &[(0, 41)];
        assert!(ordered_within_slop(&[a, b], 2));
    }

    #[test]
    fn chunk_positions_bounds() {
        let list: &[(u64, u32)] = &[(1, 4), (2, 0), (2, 7), (5, 3)];
        assert_eq!(chunk_positions(list, 2), &[(2, 0), (2, 7)]);
        assert!(chunk_positions(list, 3).is_empty());
        assert!(chunk_positions(list, 0).is_empty());
    }
}
