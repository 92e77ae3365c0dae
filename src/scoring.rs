//! Label scoring: frequency/noise/TF-IDF statistics over extracted
//! windows, a staged filter pipeline, and the final ranking.

use log::{debug, info};
use serde::Serialize;

use crate::dictionary::CorpusDictionary;
use crate::types::{ScopeError, ScopeResult};
use crate::window::{WindowDictionary, WindowSet};

/// Default upper bound on the noise statistic for a word to survive
/// filtering. Noise compares corpus-wide frequency against in-window
/// frequency; words common everywhere score high and are dropped.
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.10;

/// Minimum candidate length in characters (filter stage b).
const MIN_LABEL_LEN: usize = 3;

/// Scores for one candidate label.
#[derive(Debug, Clone, Serialize)]
pub struct LabelScore {
    pub word: String,
    /// Token occurrences of the word across windows, over total window
    /// occurrences.
    pub window_frequency: f64,
    /// Total corpus occurrences over the word's corpus occurrences.
    pub corpus_inverse_frequency: f64,
    /// `log10(1 + corpus_frequency / window_frequency)`.
    pub noise: f64,
    /// Windows containing the word over the window count, times
    /// `log10(corpus_inverse_frequency)`.
    pub tf_idf: f64,
}

struct Candidate {
    score: LabelScore,
    /// Token occurrences across windows, kept for filter stage a.
    occurrences: u64,
}

/// Rank candidate label words for the given target words.
///
/// Target words are excluded first (they cannot label themselves); the
/// remaining candidates are scored, filtered, and sorted by TF-IDF
/// descending. The sort is stable over the window dictionary's
/// first-seen order, so identical inputs produce identical output.
/// An empty window set yields an empty list. A window word missing from
/// the corpus dictionary is an internal-consistency violation: every
/// window token was tokenized from the same corpus, so this is a bug,
/// never a value to default.
pub fn score_labels(
    target_words: &[String],
    windows: &WindowSet,
    window_dict: &WindowDictionary,
    corpus_dict: &CorpusDictionary,
    noise_threshold: f64,
) -> ScopeResult<Vec<LabelScore>> {
    if windows.is_empty() {
        info!("no windows for {target_words:?}: empty label list");
        return Ok(Vec::new());
    }

    // Stage 1: drop the target words, then total the survivors.
    let candidates: Vec<(&str, u64)> = window_dict
        .iter()
        .filter(|(word, _)| !target_words.iter().any(|t| t == word))
        .collect();
    let total_window_occurrences: u64 = candidates.iter().map(|&(_, count)| count).sum();
    if total_window_occurrences == 0 {
        return Ok(Vec::new());
    }

    let total_corpus_occurrences = corpus_dict.total_occurrences();
    let presence = windows.presence_counts();
    let window_count = windows.len() as f64;

    // Stage 2: per-candidate statistics.
    let mut scored: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for (word, occurrences) in candidates {
        let corpus_count = corpus_dict.get(word).ok_or_else(|| {
            ScopeError::InternalConsistency(format!(
                "window word {word:?} is absent from the corpus dictionary"
            ))
        })?;

        let window_frequency = occurrences as f64 / total_window_occurrences as f64;
        let corpus_frequency = corpus_count as f64 / total_corpus_occurrences as f64;
        let corpus_inverse_frequency = total_corpus_occurrences as f64 / corpus_count as f64;
        let noise = (1.0 + corpus_frequency / window_frequency).log10();

        let tf = presence.get(word).copied().unwrap_or(0) as f64 / window_count;
        let idf = corpus_inverse_frequency.log10();
        let tf_idf = tf * idf;

        scored.push(Candidate {
            score: LabelScore {
                word: word.to_string(),
                window_frequency,
                corpus_inverse_frequency,
                noise,
                tf_idf,
            },
            occurrences,
        });
    }

    // Stage 3: filter pipeline.
    let survivors = run_filters(scored, noise_threshold);

    // Stage 4: stable sort on TF-IDF descending; ties keep first-seen
    // window order.
    let mut labels: Vec<LabelScore> = survivors.into_iter().map(|c| c.score).collect();
    labels.sort_by(|a, b| {
        b.tf_idf
            .partial_cmp(&a.tf_idf)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    info!("{} labels ranked for {target_words:?}", labels.len());
    Ok(labels)
}

/// Run the four filter stages, looping until no stage removes a word.
/// The occurrence filter's threshold shrinks with the pool, so a single
/// pass is not a fixed point; looping makes re-running the pipeline on
/// its own output a no-op.
fn run_filters(mut candidates: Vec<Candidate>, noise_threshold: f64) -> Vec<Candidate> {
    loop {
        let before = candidates.len();
        candidates = occurrence_filter(candidates);
        candidates = length_filter(candidates);
        candidates = noise_filter(candidates, noise_threshold);
        candidates = numeric_filter(candidates);
        if candidates.len() == before {
            return candidates;
        }
        debug!("filter pass removed {} candidates", before - candidates.len());
    }
}

/// Stage a: drop words occurring at least as often as the candidate set
/// is large. Near-universal filler appears in almost every window, so
/// its occurrence count dwarfs the shrinking pool. The `>=` comparison
/// follows the documented resolution of the historical `>`/`>=` drift.
fn occurrence_filter(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let pool_size = candidates.len() as u64;
    candidates
        .into_iter()
        .filter(|c| c.occurrences < pool_size)
        .collect()
}

/// Stage b: drop words shorter than three characters.
fn length_filter(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.score.word.chars().count() >= MIN_LABEL_LEN)
        .collect()
}

/// Stage c: keep only words disproportionately concentrated in-window.
fn noise_filter(candidates: Vec<Candidate>, noise_threshold: f64) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.score.noise <= noise_threshold)
        .collect()
}

/// Stage d: drop purely numeric words.
fn numeric_filter(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| !c.score.word.chars().all(|ch| ch.is_numeric()))
        .collect()
}
