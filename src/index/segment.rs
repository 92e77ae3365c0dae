//! Segment file format: one committed batch of chunks with its
//! positional postings, serialized little-endian, LZ4-compressed and
//! CRC32-guarded (see [`crate::codec`]).

use std::collections::HashMap;

use crate::codec;

/// One batch of chunks plus the positional postings over them.
/// Immutable once written; segments are only ever created and read.
pub struct Segment {
    /// Id of the first chunk in this segment. Chunk ids are global and
    /// sequential, so chunk `i` of the segment has id `first_chunk_id + i`.
    first_chunk_id: u64,
    /// Token sequences, in chunk-id order.
    chunks: Vec<Vec<String>>,
    /// term → (chunk_id, position) pairs, sorted by (chunk_id, position).
    postings: HashMap<String, Vec<(u64, u32)>>,
}

impl Segment {
    /// Create an empty segment starting at the given chunk id.
    pub fn new(first_chunk_id: u64) -> Self {
        Self {
            first_chunk_id,
            chunks: Vec::new(),
            postings: HashMap::new(),
        }
    }

    /// Append a chunk and record a posting for every token position.
    /// Chunks must be added in ascending id order.
    pub fn add_chunk(&mut self, id: u64, tokens: &[String]) {
        debug_assert_eq!(id, self.first_chunk_id + self.chunks.len() as u64);
        for (position, token) in tokens.iter().enumerate() {
            self.postings
                .entry(token.clone())
                .or_default()
                .push((id, position as u32));
        }
        self.chunks.push(tokens.to_vec());
    }

    /// Number of chunks in the segment.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Id of the first chunk.
    pub fn first_chunk_id(&self) -> u64 {
        self.first_chunk_id
    }

    /// Consume the segment into its chunk contents and postings table.
    pub fn into_parts(self) -> (u64, Vec<Vec<String>>, HashMap<String, Vec<(u64, u32)>>) {
        (self.first_chunk_id, self.chunks, self.postings)
    }

    /// Serialize the segment. Terms are sorted for deterministic bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = Vec::new();

        payload.extend_from_slice(&self.first_chunk_id.to_le_bytes());
        payload.extend_from_slice(&(self.chunks.len() as u32).to_le_bytes());

        for chunk in &self.chunks {
            payload.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
            for token in chunk {
                let token_bytes = token.as_bytes();
                // The tokenizer bounds token length at u16::MAX bytes.
                debug_assert!(token_bytes.len() <= u16::MAX as usize);
                payload.extend_from_slice(&(token_bytes.len() as u16).to_le_bytes());
                payload.extend_from_slice(token_bytes);
            }
        }

        let mut terms: Vec<&String> = self.postings.keys().collect();
        terms.sort();

        payload.extend_from_slice(&(terms.len() as u32).to_le_bytes());
        for term in terms {
            let postings = &self.postings[term];
            let term_bytes = term.as_bytes();
            payload.extend_from_slice(&(term_bytes.len() as u16).to_le_bytes());
            payload.extend_from_slice(term_bytes);
            payload.extend_from_slice(&(postings.len() as u32).to_le_bytes());
            for &(chunk_id, position) in postings {
                payload.extend_from_slice(&chunk_id.to_le_bytes());
                payload.extend_from_slice(&position.to_le_bytes());
            }
        }

        codec::seal(&payload)
    }

    /// Deserialize a segment produced by [`Segment::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let payload = codec::unseal(data)?;
        let mut pos = 0;

        if payload.len() < 12 {
            return None;
        }
        let first_chunk_id = u64::from_le_bytes(payload[pos..pos + 8].try_into().ok()?);
        pos += 8;
        let chunk_count = u32::from_le_bytes(payload[pos..pos + 4].try_into().ok()?) as usize;
        pos += 4;

        let mut chunks = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            if pos + 4 > payload.len() {
                return None;
            }
            let token_count = u32::from_le_bytes(payload[pos..pos + 4].try_into().ok()?) as usize;
            pos += 4;

            let mut tokens = Vec::with_capacity(token_count);
            for _ in 0..token_count {
                if pos + 2 > payload.len() {
                    return None;
                }
                let len = u16::from_le_bytes(payload[pos..pos + 2].try_into().ok()?) as usize;
                pos += 2;
                if pos + len > payload.len() {
                    return None;
                }
                let token = std::str::from_utf8(&payload[pos..pos + len]).ok()?.to_string();
                pos += len;
                tokens.push(token);
            }
            chunks.push(tokens);
        }

        if pos + 4 > payload.len() {
            return None;
        }
        let term_count = u32::from_le_bytes(payload[pos..pos + 4].try_into().ok()?) as usize;
        pos += 4;

        let mut postings = HashMap::with_capacity(term_count);
        for _ in 0..term_count {
            if pos + 2 > payload.len() {
                return None;
            }
            let term_len = u16::from_le_bytes(payload[pos..pos + 2].try_into().ok()?) as usize;
            pos += 2;
            if pos + term_len > payload.len() {
                return None;
            }
            let term = std::str::from_utf8(&payload[pos..pos + term_len])
                .ok()?
                .to_string();
            pos += term_len;

            if pos + 4 > payload.len() {
                return None;
            }
            let posting_count =
                u32::from_le_bytes(payload[pos..pos + 4].try_into().ok()?) as usize;
            pos += 4;

            let mut posting_list = Vec::with_capacity(posting_count);
            for _ in 0..posting_count {
                if pos + 12 > payload.len() {
                    return None;
                }
                let chunk_id = u64::from_le_bytes(payload[pos..pos + 8].try_into().ok()?);
                pos += 8;
                let position = u32::from_le_bytes(payload[pos..pos + 4].try_into().ok()?);
                pos += 4;
                posting_list.push((chunk_id, position));
            }
            postings.insert(term, posting_list);
        }

        Some(Self {
            first_chunk_id,
            chunks,
            postings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn round_trip_preserves_chunks_and_postings() {
        let mut segment = Segment::new(7);
        segment.add_chunk(7, &tokens(&["the", "cat", "sat"]));
        segment.add_chunk(8, &tokens(&["sat", "on", "mats"]));

        let restored = Segment::from_bytes(&segment.to_bytes()).unwrap();
        let (first, chunks, postings) = restored.into_parts();

        assert_eq!(first, 7);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], tokens(&["the", "cat", "sat"]));
        assert_eq!(postings["sat"], vec![(7, 2), (8, 0)]);
        assert_eq!(postings["on"], vec![(8, 1)]);
    }

    #[test]
    fn empty_segment_round_trips() {
        let segment = Segment::new(0);
        let restored = Segment::from_bytes(&segment.to_bytes()).unwrap();
        assert_eq!(restored.chunk_count(), 0);
        assert_eq!(restored.first_chunk_id(), 0);
    }

    #[test]
    fn corrupt_bytes_rejected() {
        let mut segment = Segment::new(0);
        segment.add_chunk(0, &tokens(&["alpha", "beta"]));
        let mut bytes = segment.to_bytes();
        let idx = bytes.len() - 3;
        bytes[idx] ^= 0x55;
        assert!(Segment::from_bytes(&bytes).is_none());
    }
}
