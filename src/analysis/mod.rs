//! Text analysis: byte-stream decoding and word tokenization.

pub mod tokenizer;

pub use tokenizer::{decode_text, Tokenizer, WordTokenizer};
