//! Context-window extraction around target-word clusters.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::index::CorpusIndex;
use crate::types::{ScopeError, ScopeResult};

/// Default context-window size in tokens.
pub const DEFAULT_WINDOW_SIZE: usize = 14;

/// Parameters for a window-extraction query.
pub struct WindowQueryParams {
    /// The word or ordered words whose shared context is being inspected.
    /// Every permutation is queried, so the fan-out is factorial in the
    /// word count; keep this at four words or fewer in practice.
    pub target_words: Vec<String>,
    /// Maximum window length in tokens.
    pub window_size: usize,
    /// Optional deadline, measured from the start of the call. Guards the
    /// permutation fan-out and whole-corpus proximity queries.
    pub timeout: Option<Duration>,
}

impl WindowQueryParams {
    /// Parameters with the default window size and no timeout.
    pub fn new<I, S>(target_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_words: target_words.into_iter().map(Into::into).collect(),
            window_size: DEFAULT_WINDOW_SIZE,
            timeout: None,
        }
    }
}

/// One extracted context window: at most `window_size` tokens from a
/// single chunk, containing every target word, roughly centered on the
/// tightest target cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub tokens: Vec<String>,
}

/// The distinct context windows found for one query. Overlapping chunks
/// can surface the same corpus region twice; identical windows are kept
/// once so derived statistics do not double-count it.
#[derive(Debug, Default)]
pub struct WindowSet {
    windows: Vec<ContextWindow>,
}

impl WindowSet {
    /// The windows, in extraction order (ascending chunk id, then scan
    /// order within the chunk).
    pub fn windows(&self) -> &[ContextWindow] {
        &self.windows
    }

    /// Number of distinct windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no windows were found.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// word → number of distinct windows containing it. This is the
    /// presence table; token occurrences live in [`WindowDictionary`].
    pub fn presence_counts(&self) -> HashMap<String, u64> {
        let mut presence: HashMap<String, u64> = HashMap::new();
        for window in &self.windows {
            let unique: HashSet<&String> = window.tokens.iter().collect();
            for word in unique {
                *presence.entry(word.clone()).or_insert(0) += 1;
            }
        }
        presence
    }
}

/// word → token occurrences across all windows of a query, in first-seen
/// order. Insertion order is what makes downstream tie-breaking in the
/// label ranking deterministic.
#[derive(Debug, Default)]
pub struct WindowDictionary {
    counts: HashMap<String, u64>,
    order: Vec<String>,
}

impl WindowDictionary {
    fn add(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(word.to_string(), 1);
                self.order.push(word.to_string());
            }
        }
    }

    /// Occurrence count for a word, if present in any window.
    pub fn get(&self, word: &str) -> Option<u64> {
        self.counts.get(word).copied()
    }

    /// Number of unique words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate `(word, count)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order.iter().map(|w| (w.as_str(), self.counts[w]))
    }
}

/// Extract every context window in which the target words co-occur.
///
/// Issues one ordered phrase query per permutation of the target words
/// (slop = `window_size`), unions the matching chunks, then scans each
/// chunk for target-word clusters. No match anywhere is a valid empty
/// result, not an error.
pub fn extract_windows(
    params: &WindowQueryParams,
    index: &CorpusIndex,
) -> ScopeResult<(WindowSet, WindowDictionary)> {
    // Eager validation, before touching the index.
    if params.target_words.is_empty() {
        return Err(ScopeError::InvalidConfiguration(
            "target_words must contain at least one word".into(),
        ));
    }
    if params.target_words.len() > params.window_size {
        return Err(ScopeError::InvalidConfiguration(format!(
            "{} target words cannot fit in windows of size {}",
            params.target_words.len(),
            params.window_size
        )));
    }

    let deadline = params.timeout.map(|t| Instant::now() + t);

    // Repeated target words add nothing to the cluster scan; keep the
    // first occurrence of each.
    let mut targets: Vec<String> = Vec::new();
    for word in &params.target_words {
        if !targets.contains(word) {
            targets.push(word.clone());
        }
    }

    info!("extracting windows for {targets:?} (window_size={})", params.window_size);

    // Union of matching chunks over all orderings, de-duplicated: a chunk
    // matching two permutations counts once.
    let mut matched_chunks: BTreeSet<u64> = BTreeSet::new();
    for permutation in permutations(&targets) {
        check_deadline(deadline)?;
        for chunk_id in index.phrase_query(&permutation, params.window_size) {
            matched_chunks.insert(chunk_id);
        }
    }
    debug!("{} chunks matched", matched_chunks.len());

    let mut set = WindowSet::default();
    let mut dict = WindowDictionary::default();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for chunk_id in matched_chunks {
        check_deadline(deadline)?;
        let Some(tokens) = index.chunk_tokens(chunk_id) else {
            continue;
        };
        for window in scan_chunk(tokens, &targets, params.window_size) {
            if seen.insert(window.clone()) {
                for word in &window {
                    dict.add(word);
                }
                set.windows.push(ContextWindow { tokens: window });
            }
        }
    }

    info!("{} distinct windows extracted for {targets:?}", set.len());
    Ok((set, dict))
}

fn check_deadline(deadline: Option<Instant>) -> ScopeResult<()> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(ScopeError::QueryTimeout),
        _ => Ok(()),
    }
}

/// Scan one chunk left to right for clusters containing every target
/// word within `window_size` positions, emitting one window per closed
/// cluster. Inherently sequential; state never crosses chunks.
fn scan_chunk(tokens: &[String], targets: &[String], window_size: usize) -> Vec<Vec<String>> {
    let mut windows = Vec::new();

    // Targets matched in the running cluster.
    let mut matched: Vec<&String> = Vec::new();
    let mut first_match: usize = 0;
    let mut last_match: usize = 0;
    let mut offset_size: usize = 0;

    for (i, word) in tokens.iter().enumerate() {
        if targets.iter().any(|t| t == word) && !matched.contains(&word) {
            matched.push(word);
            if matched.len() == 1 {
                first_match = i;
            }
            if matched.len() == targets.len() {
                last_match = i;
                let center_size = last_match - first_match + 1;
                // A cluster wider than the window saturates to offset 0
                // and is discarded by the span check below.
                offset_size = window_size.saturating_sub(center_size) / 2;
            }
        }

        if !matched.is_empty() && i - first_match + 1 > window_size {
            // Exceeded the maximum span before seeing every target:
            // discard the in-progress cluster.
            matched.clear();
        } else if matched.len() == targets.len() && i == last_match + offset_size {
            // Cluster closed: the right offset is fully extended. Emit
            // the trailing window, capped at the chunk start.
            let start = (i + 1).saturating_sub(window_size);
            windows.push(tokens[start..=i].to_vec());
            matched.clear();
        }
    }

    windows
}

/// All orderings of `words`. Factorial in length; callers cap the input.
fn permutations(words: &[String]) -> Vec<Vec<String>> {
    if words.len() <= 1 {
        return vec![words.to_vec()];
    }
    let mut out = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let mut rest: Vec<String> = words.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, word.clone());
            out.push(tail);
        }
    }
    out
}
