//! Corpus dictionary: global word → occurrence-count table.

use std::collections::HashMap;
use std::path::Path;

use log::info;

use crate::codec;
use crate::tokenizer::Tokenizer;
use crate::types::{ScopeError, ScopeResult};

/// Word → occurrence count over an entire corpus.
///
/// Built once per corpus with a single pass of the tokenizer, then
/// immutable. The total occurrence count is cached at build/load time
/// since every scoring query divides by it.
pub struct CorpusDictionary {
    counts: HashMap<String, u64>,
    total_occurrences: u64,
}

impl CorpusDictionary {
    /// Build a dictionary by streaming the corpus once.
    /// An empty corpus yields an empty dictionary, not an error.
    pub fn build(corpus_path: &Path) -> ScopeResult<Self> {
        info!("building corpus dictionary from {}", corpus_path.display());

        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut total: u64 = 0;
        for token in Tokenizer::new().stream(corpus_path)? {
            let token = token?;
            *counts.entry(token).or_insert(0) += 1;
            total += 1;
        }

        info!(
            "corpus dictionary built: {} unique words, {} occurrences",
            counts.len(),
            total
        );
        Ok(Self {
            counts,
            total_occurrences: total,
        })
    }

    /// Occurrence count for a word, if present.
    pub fn get(&self, word: &str) -> Option<u64> {
        self.counts.get(word).copied()
    }

    /// Whether the word occurs anywhere in the corpus.
    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(word)
    }

    /// Sum of all occurrence counts.
    pub fn total_occurrences(&self) -> u64 {
        self.total_occurrences
    }

    /// Number of unique words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Serialize to bytes. Terms are sorted so output is deterministic.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = Vec::new();
        payload.extend_from_slice(&(self.counts.len() as u64).to_le_bytes());

        let mut terms: Vec<&String> = self.counts.keys().collect();
        terms.sort();

        for term in terms {
            let term_bytes = term.as_bytes();
            // The tokenizer bounds token length at u16::MAX bytes.
            debug_assert!(term_bytes.len() <= u16::MAX as usize);
            payload.extend_from_slice(&(term_bytes.len() as u16).to_le_bytes());
            payload.extend_from_slice(term_bytes);
            payload.extend_from_slice(&self.counts[term].to_le_bytes());
        }

        codec::seal(&payload)
    }

    /// Deserialize from bytes produced by [`CorpusDictionary::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let payload = codec::unseal(data)?;
        let mut pos = 0;

        if payload.len() < 8 {
            return None;
        }
        let term_count = u64::from_le_bytes(payload[pos..pos + 8].try_into().ok()?) as usize;
        pos += 8;

        let mut counts = HashMap::with_capacity(term_count);
        let mut total: u64 = 0;

        for _ in 0..term_count {
            if pos + 2 > payload.len() {
                return None;
            }
            let term_len = u16::from_le_bytes(payload[pos..pos + 2].try_into().ok()?) as usize;
            pos += 2;

            if pos + term_len + 8 > payload.len() {
                return None;
            }
            let term = std::str::from_utf8(&payload[pos..pos + term_len])
                .ok()?
                .to_string();
            pos += term_len;

            let count = u64::from_le_bytes(payload[pos..pos + 8].try_into().ok()?);
            pos += 8;

            total += count;
            counts.insert(term, count);
        }

        Some(Self {
            counts,
            total_occurrences: total,
        })
    }

    /// Persist to a file.
    pub fn save(&self, path: &Path) -> ScopeResult<()> {
        std::fs::write(path, self.to_bytes())?;
        info!("corpus dictionary saved to {}", path.display());
        Ok(())
    }

    /// Load a previously saved dictionary.
    pub fn load(path: &Path) -> ScopeResult<Self> {
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScopeError::ResourceNotFound(path.to_path_buf())
            } else {
                ScopeError::Io(e)
            }
        })?;
        Self::from_bytes(&data).ok_or_else(|| ScopeError::CorruptIndex(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dict_from(text: &str) -> CorpusDictionary {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{text}").unwrap();
        CorpusDictionary::build(file.path()).unwrap()
    }

    #[test]
    fn build_counts_occurrences() {
        let dict = dict_from("the cat sat on the mat");
        assert_eq!(dict.get("the"), Some(2));
        assert_eq!(dict.get("cat"), Some(1));
        assert_eq!(dict.get("dog"), None);
        assert_eq!(dict.total_occurrences(), 6);
        assert_eq!(dict.len(), 5);
    }

    #[test]
    fn empty_corpus_is_valid() {
        let dict = dict_from("");
        assert!(dict.is_empty());
        assert_eq!(dict.total_occurrences(), 0);
    }

    #[test]
    fn bytes_round_trip_is_exact() {
        let dict = dict_from("alpha beta beta gamma gamma gamma");
        let restored = CorpusDictionary::from_bytes(&dict.to_bytes()).unwrap();
        assert_eq!(restored.len(), dict.len());
        assert_eq!(restored.total_occurrences(), dict.total_occurrences());
        assert_eq!(restored.get("gamma"), Some(3));
        // Sorted terms make serialization byte-deterministic.
        assert_eq!(dict.to_bytes(), restored.to_bytes());
    }

    #[test]
    fn load_missing_file_is_resource_not_found() {
        let err = CorpusDictionary::load(Path::new("/no/such/dict.bin"))
            .err()
            .unwrap();
        assert!(matches!(err, ScopeError::ResourceNotFound(_)));
    }
}
