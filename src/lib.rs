//! # Tracefold - Episode Mining and Structural Trace Compression
//!
//! Finds repeating patterns ("episodes") in an execution trace and folds their
//! occurrences into nested groups, marking the parts that differ between
//! occurrences as optional.
//!
//! The pipeline has three stages:
//! 1. **Episode search**: a proximity-weighted top-k search ranks candidate
//!    patterns by how often they occur and how tightly packed their
//!    occurrences are.
//! 2. **Alignment and merge**: occurrences are aligned with an edit distance
//!    aware of group borders and optionality, then merged into one
//!    generalized sequence.
//! 3. **Compression**: the best episodes are merged into the trace and the
//!    process repeats on every derived trace until nothing new appears or the
//!    time budget runs out.
//!
//! ## Example
//!
//! ```
//! use tracefold::{compress, Config, Sequence};
//!
//! let trace = Sequence::from_trace("ABAB");
//! let results = compress(&trace, &Config::default()).unwrap();
//!
//! assert_eq!(results.texts(), vec!["[AB]".to_string()]);
//! ```
//!
//! ## Text form
//!
//! Sequences render in bracket notation: `[` and `]` delimit a group, a `*`
//! after a call or right after `[` marks it optional. `A[*C]B` is `A`,
//! an optional group holding `C`, then `B`.

mod align;
mod compress;
mod config;
mod episode;
mod error;
mod event;
pub mod linear;
mod merge;
mod resolver;
mod score;
mod search;
mod topk;

#[cfg(test)]
mod tests;

pub use align::CostMatrix;
pub use compress::{
    compress, CheckCode, Compression, CompressionSet, Compressor, Root, MAX_GROWTH, TIMEOUT_SENTINEL,
};
pub use config::Config;
pub use episode::{Episode, Window};
pub use error::{ConfigError, Error, Result};
pub use event::{Atoms, Call, Event, Sequence};
pub use linear::LinearEvent;
pub use merge::{merge, merge_sequences, MergeOutcome};
pub use resolver::resolve;
pub use score::{score, ScoreParams, Scorable};
pub use search::EpisodeSearch;
