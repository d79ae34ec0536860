//! cobs: a compact bit-sliced signature index for approximate k-mer
//! membership queries over large document collections.
//!
//! Documents are represented as Bloom filter columns of a bit-sliced
//! matrix stored row-major on disk, so a query fetches one row per hash
//! per k-mer and counts surviving bits per document. Membership answers
//! have no false negatives and a configurable false positive rate.
//!
//! Two layouts are supported: the classic single-block layout, and the
//! compact layout that partitions documents into pages with individually
//! sized signatures. See the `index` module for the builders and the
//! on-disk formats, and the `query` module for the search engine.

pub mod commands;
pub mod core;
pub mod doc;
pub mod error;
pub mod index;
pub mod logging;
pub mod memory;
pub mod query;
pub mod random;

pub use crate::core::kmer::{canonicalize, reverse_complement};
pub use crate::core::sizing::{calc_signature_size, calc_signature_size_ratio};
pub use crate::doc::{DocumentEntry, DocumentList, DocumentSource, FileType};
pub use crate::error::{CobsError, Result};
pub use crate::index::{
    classic_construct, classic_construct_random, compact_combine, compact_construct,
    ClassicIndexParameters, CompactIndexParameters, CLASSIC_INDEX_NAME, COMPACT_INDEX_NAME,
};
pub use crate::query::{ClassicSearch, IndexReader, QueryBackend, Timer};
pub use crate::random::{random_sequence, random_sequence_rng};
