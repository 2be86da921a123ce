//! unikmer: k-mers unique to each sequence of a collection
//!
//! Given named sequences and a window length k, every k-mer is partitioned by
//! the set of sequences it occurs in; k-mers seen in exactly one sequence are
//! reported, grouped by that sequence.
//!
//! ```
//! use unikmer::{unique_kmers, SequenceCollection};
//!
//! let seqs: SequenceCollection = [("s1", "AATA"), ("s2", "ATGA"), ("s3", "ACTAT")]
//!     .into_iter()
//!     .collect();
//! let unique = unique_kmers(&seqs, 2).unwrap();
//! assert!(unique.get("s1").unwrap().contains("AA"));
//! ```

pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod kmer;
pub mod logging;
pub mod output;

pub use collection::{Sequence, SequenceCollection};
pub use error::{Result, UnikmerError};
pub use kmer::{unique_kmers, IndexStats, KmerUniquenessIndex, KmerWindows, UniqueKmers};
pub use output::OutputFormat;
