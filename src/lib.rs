//! # Mattock
//!
//! A frequent contiguous phrase mining engine for text corpora.
//!
//! ## Features
//!
//! - Counting-Bloom seeded n-gram mining with external merge sort
//! - Greedy rightward expansion into maximal, backward-closed phrases
//! - BIDE+ and CloSpan closed sequential phrase miners
//! - Memory-resident or disk-backed corpus with a bounded document cache
//! - Directory and CSV corpus loading with UTF-8/UTF-16 tokenization

pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod corpus;
pub mod error;
pub mod mining;
pub mod types;
pub mod util;

pub mod prelude {}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
