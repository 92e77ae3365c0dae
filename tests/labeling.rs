//! Label-scoring tests: ranking determinism, target exclusion, the
//! corpus-consistency invariant, and the repeated-sentence end-to-end
//! scenario.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

use labelscope::{
    build_index, extract_windows, score_labels, CorpusDictionary, CorpusIndex, IndexConfig,
    ScopeError, WindowQueryParams, DEFAULT_NOISE_THRESHOLD,
};

// ==================== Helpers ====================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_corpus(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    write!(file, "{text}").unwrap();
    path
}

/// Dictionary + opened index over the same corpus text.
fn corpus_setup(
    dir: &TempDir,
    text: &str,
    overlap: usize,
    center: usize,
) -> (CorpusDictionary, CorpusIndex) {
    let corpus = write_corpus(dir, "corpus.txt", text);
    let index_dir = dir.path().join("index");
    let config = IndexConfig {
        overlap_size: overlap,
        center_size: center,
        ..IndexConfig::default()
    };
    build_index(&corpus, &index_dir, &config).unwrap();
    (
        CorpusDictionary::build(&corpus).unwrap(),
        CorpusIndex::open(&index_dir).unwrap(),
    )
}

fn params(words: &[&str], window_size: usize) -> WindowQueryParams {
    WindowQueryParams {
        target_words: words.iter().map(|w| w.to_string()).collect(),
        window_size,
        timeout: None,
    }
}

// ==================== Ranking Behavior ====================

#[test]
fn target_words_never_label_themselves() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let text = "the gray wolves hunted near the frozen river banks tonight ".repeat(30);
    let (dict, index) = corpus_setup(&dir, &text, 4, 8);

    let query = params(&["wolves"], 8);
    let (set, window_dict) = extract_windows(&query, &index).unwrap();
    assert!(!set.is_empty());
    assert!(window_dict.get("wolves").is_some());

    let labels = score_labels(
        &query.target_words,
        &set,
        &window_dict,
        &dict,
        DEFAULT_NOISE_THRESHOLD,
    )
    .unwrap();
    assert!(labels.iter().all(|l| l.word != "wolves"));
}

#[test]
fn scoring_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let text = "quick brown foxes jump over lazy sleeping dogs in quiet meadows \
                while hungry foxes chase small gray rabbits across open fields "
        .repeat(15);
    let (dict, index) = corpus_setup(&dir, &text, 5, 10);

    let query = params(&["foxes"], 10);
    let (set, window_dict) = extract_windows(&query, &index).unwrap();

    let first = score_labels(&query.target_words, &set, &window_dict, &dict, 0.9).unwrap();
    for _ in 0..5 {
        let again = score_labels(&query.target_words, &set, &window_dict, &dict, 0.9).unwrap();
        let words_a: Vec<&str> = first.iter().map(|l| l.word.as_str()).collect();
        let words_b: Vec<&str> = again.iter().map(|l| l.word.as_str()).collect();
        assert_eq!(words_a, words_b);
    }

    // Ordered by tf_idf descending.
    for pair in first.windows(2) {
        assert!(pair[0].tf_idf >= pair[1].tf_idf);
    }
}

#[test]
fn empty_window_set_yields_empty_labels() {
    let dir = TempDir::new().unwrap();
    let text = "plain words without the sought term anywhere near here ".repeat(10);
    let (dict, index) = corpus_setup(&dir, &text, 2, 4);

    let query = params(&["unicorn"], 6);
    let (set, window_dict) = extract_windows(&query, &index).unwrap();
    assert!(set.is_empty());

    let labels = score_labels(
        &query.target_words,
        &set,
        &window_dict,
        &dict,
        DEFAULT_NOISE_THRESHOLD,
    )
    .unwrap();
    assert!(labels.is_empty());
}

#[test]
fn labels_survive_a_permissive_noise_threshold() {
    let dir = TempDir::new().unwrap();
    // "comet" always appears flanked by "luminous" and "tail"; with a
    // permissive threshold those context words must surface as labels.
    let text = format!(
        "{}{}",
        "luminous comet tail streaks overhead every winter night ".repeat(20),
        "dull stones sink in muddy water near old bridges daily ".repeat(20)
    );
    let (dict, index) = corpus_setup(&dir, &text, 4, 8);

    let query = params(&["comet"], 6);
    let (set, window_dict) = extract_windows(&query, &index).unwrap();
    assert!(!set.is_empty());

    let labels = score_labels(&query.target_words, &set, &window_dict, &dict, 2.0).unwrap();
    let words: Vec<&str> = labels.iter().map(|l| l.word.as_str()).collect();
    assert!(words.contains(&"luminous"));
    assert!(words.contains(&"tail"));
}

// ==================== Consistency Invariant ====================

#[test]
fn window_word_missing_from_corpus_dictionary_is_loud() {
    let dir = TempDir::new().unwrap();
    let text = "the comet tail streaks over the sleeping harbor town tonight ".repeat(20);
    let corpus = write_corpus(&dir, "corpus.txt", &text);
    let index_dir = dir.path().join("index");
    let config = IndexConfig {
        overlap_size: 4,
        center_size: 8,
        ..IndexConfig::default()
    };
    build_index(&corpus, &index_dir, &config).unwrap();
    let index = CorpusIndex::open(&index_dir).unwrap();

    // A dictionary built from a different corpus: window words will be
    // missing, which is an invariant violation, not a score of zero.
    let other = write_corpus(&dir, "other.txt", "completely unrelated vocabulary here");
    let wrong_dict = CorpusDictionary::build(&other).unwrap();

    let query = params(&["comet"], 6);
    let (set, window_dict) = extract_windows(&query, &index).unwrap();
    assert!(!set.is_empty());

    let err = score_labels(
        &query.target_words,
        &set,
        &window_dict,
        &wrong_dict,
        DEFAULT_NOISE_THRESHOLD,
    )
    .err()
    .unwrap();
    assert!(matches!(err, ScopeError::InternalConsistency(_)));
}

// ==================== End To End ====================

#[test]
fn repeated_sentence_end_to_end() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let text = "the cat sat on the mat the dog sat on the rug ".repeat(30);
    // Tiny chunks: overlap 1, center 2.
    let (dict, index) = corpus_setup(&dir, &text, 1, 2);

    let query = params(&["cat"], 4);
    let (set, window_dict) = extract_windows(&query, &index).unwrap();

    assert!(!set.is_empty());
    for window in set.windows() {
        assert!(window.tokens.len() <= 4);
        assert!(window.tokens.iter().any(|t| t == "cat"));
    }

    // Before the length/noise filters, common neighbors survive in the
    // window dictionary.
    assert!(window_dict.get("sat").is_some());
    assert!(window_dict.get("the").is_some());

    let labels = score_labels(
        &query.target_words,
        &set,
        &window_dict,
        &dict,
        DEFAULT_NOISE_THRESHOLD,
    )
    .unwrap();
    // The target never labels itself.
    assert!(labels.iter().all(|l| l.word != "cat"));
}
