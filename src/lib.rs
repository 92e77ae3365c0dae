//! # labelscope
//!
//! Extracts, from a large untagged text corpus, words ("labels") that
//! characterize the shared local context of one or more target words,
//! using only distributional statistics.
//!
//! The crate has an offline side and a query side:
//!
//! - **Offline** (once per corpus): [`CorpusDictionary::build`] counts
//!   every word, and [`build_index`] cuts the token stream into
//!   overlapping fixed-size chunks persisted with a positional postings
//!   table.
//! - **Query** (read-only, per target-word set): [`extract_windows`]
//!   finds every context window in which the target words co-occur, and
//!   [`score_labels`] ranks the surrounding words by a noise-filtered
//!   TF-IDF statistic.
//!
//! ```no_run
//! use std::path::Path;
//! use labelscope::{
//!     build_index, extract_windows, score_labels, CorpusDictionary,
//!     CorpusIndex, IndexConfig, WindowQueryParams, DEFAULT_NOISE_THRESHOLD,
//! };
//!
//! # fn main() -> labelscope::ScopeResult<()> {
//! let corpus = Path::new("corpus.txt");
//! let index_dir = Path::new("indexdir");
//!
//! let dictionary = CorpusDictionary::build(corpus)?;
//! build_index(corpus, index_dir, &IndexConfig::default())?;
//!
//! let index = CorpusIndex::open(index_dir)?;
//! let params = WindowQueryParams::new(["rome", "paris"]);
//! let (windows, window_dict) = extract_windows(&params, &index)?;
//! let labels = score_labels(
//!     &params.target_words,
//!     &windows,
//!     &window_dict,
//!     &dictionary,
//!     DEFAULT_NOISE_THRESHOLD,
//! )?;
//! for label in labels.iter().take(10) {
//!     println!("{} {:.4}", label.word, label.tf_idf);
//! }
//! # Ok(())
//! # }
//! ```

mod codec;
pub mod dictionary;
pub mod index;
pub mod scoring;
pub mod tokenizer;
pub mod types;
pub mod window;

pub use dictionary::CorpusDictionary;
pub use index::{
    build_index, CorpusIndex, IndexConfig, IndexStats, DEFAULT_CENTER_SIZE, DEFAULT_COMMIT_BATCH,
    DEFAULT_OVERLAP_SIZE,
};
pub use scoring::{score_labels, LabelScore, DEFAULT_NOISE_THRESHOLD};
pub use tokenizer::{TokenStream, Tokenizer, MAX_TOKEN_BYTES};
pub use types::{ScopeError, ScopeResult};
pub use window::{
    extract_windows, ContextWindow, WindowDictionary, WindowQueryParams, WindowSet,
    DEFAULT_WINDOW_SIZE,
};
