//! Streaming corpus tokenizer shared by dictionary building and indexing.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::types::{ScopeError, ScopeResult};

/// Upper bound on a single token's byte length. The on-disk segment and
/// dictionary formats store token lengths as `u16`, so anything longer
/// is hard-split here, on a char boundary, into pieces under the bound.
pub const MAX_TOKEN_BYTES: usize = u16::MAX as usize;

/// Deterministic tokenizer: every ASCII punctuation character becomes a
/// space, the text is lowercased, then split on whitespace.
///
/// The tokenizer keeps no state of its own; a fresh [`Tokenizer::stream`]
/// call re-reads the corpus from the start.
pub struct Tokenizer;

impl Tokenizer {
    /// Create a new tokenizer.
    pub fn new() -> Self {
        Self
    }

    /// Normalize in-memory text into tokens.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .chars()
            .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
            .collect::<String>()
            .to_lowercase();

        let mut tokens = Vec::new();
        for word in cleaned.split_whitespace() {
            if word.len() > MAX_TOKEN_BYTES {
                split_oversized(word, &mut tokens);
            } else {
                tokens.push(word.to_string());
            }
        }
        tokens
    }

    /// Open a corpus file and stream its tokens lazily, line by line.
    /// The whole corpus is never materialized in memory.
    pub fn stream(&self, corpus_path: &Path) -> ScopeResult<TokenStream> {
        let file = File::open(corpus_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScopeError::ResourceNotFound(corpus_path.to_path_buf())
            } else {
                ScopeError::Io(e)
            }
        })?;
        Ok(TokenStream {
            lines: BufReader::new(file).lines(),
            pending: VecDeque::new(),
            done: false,
        })
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Chop a word longer than [`MAX_TOKEN_BYTES`] into maximal pieces that
/// fit, backing up to the nearest char boundary at each cut.
fn split_oversized(word: &str, out: &mut Vec<String>) {
    let mut rest = word;
    while rest.len() > MAX_TOKEN_BYTES {
        let mut cut = MAX_TOKEN_BYTES;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    out.push(rest.to_string());
}

/// Lazy token iterator over a corpus file. Read errors mid-stream are
/// surfaced as items so callers can propagate them with `?`.
pub struct TokenStream {
    lines: Lines<BufReader<File>>,
    pending: VecDeque<String>,
    done: bool,
}

impl Iterator for TokenStream {
    type Item = ScopeResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.done {
                return None;
            }
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.pending.extend(Tokenizer.normalize(&line));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(ScopeError::Io(e)));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
