//! Corpus loading and access.
//!
//! The [`store::CorpusStore`] owns the ID-encoded documents (memory-resident
//! or disk-backed), the dictionary, and the per-word document-frequency
//! table. The [`loader`] module builds a store from a directory of text files
//! or a CSV file.

pub mod loader;
pub mod store;

pub use loader::{CorpusLoader, LoaderConfig};
pub use store::CorpusStore;
