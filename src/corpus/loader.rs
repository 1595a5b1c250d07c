//! Corpus loading: directory scans and CSV files.
//!
//! Loading happens in two phases. Phase I tokenizes every input in parallel;
//! phase II runs sequentially, assigning dense token IDs in order of first
//! appearance, counting per-word document frequency, and either keeping the
//! encoded documents in memory or streaming them into the binary corpus file.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use byteorder::{LittleEndian, WriteBytesExt};
use log::{info, warn};
use rand::seq::SliceRandom;
use rayon::prelude::*;

use crate::analysis::{decode_text, Tokenizer, WordTokenizer};
use crate::corpus::store::CorpusStore;
use crate::error::{MattockError, Result};
use crate::types::TokenId;

/// Configuration for a corpus load.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Keep all documents in memory instead of writing the binary file.
    pub in_memory: bool,
    /// In disk mode, populate the document cache while loading.
    pub preload: bool,
    /// Random subsample fraction of input documents, in (0, 1].
    pub sampling: f64,
    /// File filter for directory scans: `*`, `*.<ext>`, or an exact name.
    pub file_mask: String,
    /// Field separator for CSV input.
    pub csv_delimiter: char,
    /// Maximum number of cached documents in disk mode.
    pub cache_capacity: usize,
    /// Path of the binary corpus file written in disk mode.
    pub bin_path: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            in_memory: false,
            preload: false,
            sampling: 1.0,
            file_mask: "*".to_string(),
            csv_delimiter: ',',
            cache_capacity: 1000,
            bin_path: PathBuf::from("corpus_data.bin"),
        }
    }
}

/// Builds a [`CorpusStore`] from a directory of text files or a CSV file.
pub struct CorpusLoader {
    config: LoaderConfig,
    tokenizer: WordTokenizer,
}

impl CorpusLoader {
    /// Create a loader with the given configuration.
    pub fn new(config: LoaderConfig) -> Self {
        CorpusLoader {
            config,
            tokenizer: WordTokenizer::new(),
        }
    }

    /// Load a corpus from `path`: a regular file is read as CSV, anything
    /// else is scanned as a directory.
    pub fn load(&self, path: &Path) -> Result<CorpusStore> {
        if path.is_file() {
            self.load_csv(path)
        } else if path.is_dir() {
            self.load_directory(path)
        } else {
            Err(MattockError::corpus(format!(
                "Input path does not exist: {}",
                path.display()
            )))
        }
    }

    /// Scan a directory recursively and load every file matching the mask.
    pub fn load_directory(&self, path: &Path) -> Result<CorpusStore> {
        info!(
            "Scanning directory: {} (mask: {})",
            path.display(),
            self.config.file_mask
        );

        let mut paths = Vec::new();
        collect_files(path, &self.config.file_mask, &mut paths)?;
        // Directory iteration order is platform-defined; sort so identical
        // inputs produce identical document IDs.
        paths.sort();

        let total_files = paths.len();
        let keep = self.sample_len(total_files, &mut paths);
        info!(
            "Found {total_files} files, processing {keep} (sampling: {:.0}%)",
            self.config.sampling * 100.0
        );

        info!("Phase I: parallel tokenization...");
        let raw_docs: Vec<Option<Vec<String>>> = paths
            .par_iter()
            .map(|p| match fs::read(p) {
                Ok(raw) => Some(self.tokenizer.tokenize(&decode_text(&raw))),
                Err(e) => {
                    warn!("Skipping unreadable file {}: {e}", p.display());
                    None
                }
            })
            .collect();

        let mut docs = Vec::with_capacity(raw_docs.len());
        let mut sources = Vec::with_capacity(raw_docs.len());
        for (path, tokens) in paths.iter().zip(raw_docs) {
            if let Some(tokens) = tokens {
                docs.push(tokens);
                sources.push(path.display().to_string());
            }
        }

        self.build_store(docs, sources)
    }

    /// Load a CSV file; each record becomes one document.
    ///
    /// Fields are joined with a space, quoted fields may contain delimiters,
    /// doubled quotes, and newlines.
    pub fn load_csv(&self, path: &Path) -> Result<CorpusStore> {
        info!(
            "Loading CSV: {} (delimiter: {:?})",
            path.display(),
            self.config.csv_delimiter
        );

        let raw = fs::read(path).map_err(|e| {
            MattockError::corpus(format!("Could not open CSV file {}: {e}", path.display()))
        })?;
        let mut rows = parse_csv_rows(&decode_text(&raw), self.config.csv_delimiter);
        self.sample_len(rows.len(), &mut rows);

        info!("Phase I: parallel tokenization of {} rows...", rows.len());
        let docs: Vec<Vec<String>> = rows
            .par_iter()
            .map(|row| self.tokenizer.tokenize(row))
            .collect();

        let sources = (0..docs.len()).map(|i| format!("row_{i}")).collect();
        self.build_store(docs, sources)
    }

    /// Subsample `items` in place, returning the kept length.
    fn sample_len<T>(&self, total: usize, items: &mut Vec<T>) -> usize {
        if self.config.sampling < 1.0 {
            items.shuffle(&mut rand::rng());
            let keep = ((total as f64) * self.config.sampling) as usize;
            items.truncate(keep.min(total));
        }
        items.len()
    }

    /// Phase II: assign token IDs, count document frequency, and persist.
    fn build_store(
        &self,
        raw_docs: Vec<Vec<String>>,
        source_paths: Vec<String>,
    ) -> Result<CorpusStore> {
        info!("Phase II: dictionary, ID encoding, and DF counting...");

        let mut word_to_id: AHashMap<String, TokenId> = AHashMap::new();
        let mut id_to_word: Vec<String> = Vec::new();
        let mut word_df: Vec<u32> = Vec::new();
        // word_last_doc_id[w] remembers the last document that bumped the DF
        // of w, so repeats inside one document count once.
        let mut word_last_doc_id: Vec<u32> = Vec::new();

        let mut mem_docs: Vec<Arc<Vec<TokenId>>> = Vec::new();
        let mut doc_offsets: Vec<u64> = Vec::new();
        let mut doc_lengths: Vec<u32> = Vec::new();
        let mut preloaded: Vec<(u32, Vec<TokenId>)> = Vec::new();

        let mut bin_out = if self.config.in_memory {
            None
        } else {
            let file = fs::File::create(&self.config.bin_path).map_err(|e| {
                MattockError::storage(format!(
                    "Failed to create corpus file {}: {e}",
                    self.config.bin_path.display()
                ))
            })?;
            Some(BufWriter::new(file))
        };
        let mut offset = 0u64;

        for (i, words) in raw_docs.into_iter().enumerate() {
            let mut encoded: Vec<TokenId> = Vec::with_capacity(words.len());
            for word in words {
                let next_id = id_to_word.len() as TokenId;
                let w_id = match word_to_id.get(&word) {
                    Some(&id) => id,
                    None => {
                        word_to_id.insert(word.clone(), next_id);
                        id_to_word.push(word);
                        word_df.push(0);
                        word_last_doc_id.push(0);
                        next_id
                    }
                };
                encoded.push(w_id);

                if word_last_doc_id[w_id as usize] != (i as u32) + 1 {
                    word_df[w_id as usize] += 1;
                    word_last_doc_id[w_id as usize] = (i as u32) + 1;
                }
            }

            doc_lengths.push(encoded.len() as u32);
            if let Some(out) = bin_out.as_mut() {
                doc_offsets.push(offset);
                for &t in &encoded {
                    out.write_u32::<LittleEndian>(t)?;
                }
                offset += encoded.len() as u64 * 4;
                if self.config.preload && preloaded.len() < self.config.cache_capacity {
                    preloaded.push((i as u32, encoded));
                }
            } else {
                mem_docs.push(Arc::new(encoded));
            }
        }

        if let Some(mut out) = bin_out {
            out.flush()?;
        }

        info!(
            "Encoded {} documents, vocabulary size {}",
            doc_lengths.len(),
            id_to_word.len()
        );

        if self.config.in_memory {
            Ok(CorpusStore::in_memory(
                id_to_word, word_df, source_paths, mem_docs,
            ))
        } else {
            let store = CorpusStore::disk_backed(
                id_to_word,
                word_df,
                source_paths,
                self.config.bin_path.clone(),
                doc_offsets,
                doc_lengths,
                self.config.cache_capacity,
            )?;
            for (doc_id, tokens) in preloaded {
                store.preload_doc(doc_id, tokens);
            }
            Ok(store)
        }
    }
}

fn collect_files(dir: &Path, mask: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, mask, out)?;
        } else if path.is_file() && matches_mask(&path, mask) {
            out.push(path);
        }
    }
    Ok(())
}

fn matches_mask(path: &Path, mask: &str) -> bool {
    if mask.is_empty() || mask == "*" {
        return true;
    }
    if let Some(ext) = mask.strip_prefix("*.") {
        return path.extension().map(|e| e == ext).unwrap_or(false);
    }
    path.file_name().map(|n| n == mask).unwrap_or(false)
}

/// Split CSV text into row strings, joining fields with a space.
fn parse_csv_rows(text: &str, delimiter: char) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current_row = String::new();
    let mut current_field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current_field.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            if !current_row.is_empty() {
                current_row.push(' ');
            }
            current_row.push_str(&current_field);
            current_field.clear();
        } else if c == '\n' || c == '\r' {
            if !current_row.is_empty() || !current_field.is_empty() {
                if !current_row.is_empty() {
                    current_row.push(' ');
                }
                current_row.push_str(&current_field);
                rows.push(std::mem::take(&mut current_row));
                current_field.clear();
            }
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
        } else {
            current_field.push(c);
        }
    }
    if !current_row.is_empty() || !current_field.is_empty() {
        if !current_row.is_empty() {
            current_row.push(' ');
        }
        current_row.push_str(&current_field);
        rows.push(current_row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn memory_loader() -> CorpusLoader {
        CorpusLoader::new(LoaderConfig {
            in_memory: true,
            ..LoaderConfig::default()
        })
    }

    #[test]
    fn test_load_directory_in_memory() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "the quick fox");
        write_file(dir.path(), "b.txt", "the lazy dog");

        let store = memory_loader().load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 2);

        // Paths are sorted, so a.txt is document 0 and IDs follow first
        // appearance: the=0, quick=1, fox=2, lazy=3, dog=4.
        assert_eq!(*store.get_doc(0).unwrap(), vec![0, 1, 2]);
        assert_eq!(*store.get_doc(1).unwrap(), vec![0, 3, 4]);
        assert_eq!(store.word_df(), &[2, 1, 1, 1, 1]);
        assert_eq!(store.id_to_word(0), Some("the"));
    }

    #[test]
    fn test_df_counts_documents_not_occurrences() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "echo echo echo");
        write_file(dir.path(), "b.txt", "echo");

        let store = memory_loader().load(dir.path()).unwrap();
        assert_eq!(store.word_df(), &[2]);
    }

    #[test]
    fn test_mask_filters_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "alpha");
        write_file(dir.path(), "b.log", "beta");

        let loader = CorpusLoader::new(LoaderConfig {
            in_memory: true,
            file_mask: "*.txt".to_string(),
            ..LoaderConfig::default()
        });
        let store = loader.load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 1);
        assert_eq!(store.id_to_word(0), Some("alpha"));
    }

    #[test]
    fn test_exact_mask() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "keep.txt", "alpha");
        write_file(dir.path(), "skip.txt", "beta");

        let loader = CorpusLoader::new(LoaderConfig {
            in_memory: true,
            file_mask: "keep.txt".to_string(),
            ..LoaderConfig::default()
        });
        let store = loader.load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 1);
    }

    #[test]
    fn test_recursive_scan() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        write_file(dir.path(), "a.txt", "top");
        write_file(&dir.path().join("sub"), "b.txt", "nested");

        let store = memory_loader().load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 2);
    }

    #[test]
    fn test_load_csv_rows_and_quotes() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "data.csv",
            "hello,world\n\"quoted, field\",tail\n\"he said \"\"hi\"\"\",x\n",
        );

        let store = memory_loader()
            .load(&dir.path().join("data.csv"))
            .unwrap();
        assert_eq!(store.num_docs(), 3);
        // Row 1: fields joined with a space then tokenized.
        let words: Vec<_> = store
            .get_doc(1)
            .unwrap()
            .iter()
            .map(|&t| store.id_to_word(t).unwrap().to_string())
            .collect();
        assert_eq!(words, vec!["quoted", "field", "tail"]);
        assert_eq!(store.source_path(0), Some("row_0"));
    }

    #[test]
    fn test_csv_tab_delimiter() {
        let rows = parse_csv_rows("a\tb\nc\td", '\t');
        assert_eq!(rows, vec!["a b", "c d"]);
    }

    #[test]
    fn test_csv_quoted_newline_stays_in_row() {
        let rows = parse_csv_rows("\"line one\nline two\",x\n", ',');
        assert_eq!(rows, vec!["line one\nline two x"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let store = memory_loader().load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 0);
        assert_eq!(store.vocab_size(), 0);
    }

    #[test]
    fn test_sampling_truncates() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write_file(dir.path(), &format!("f{i}.txt"), "word");
        }
        let loader = CorpusLoader::new(LoaderConfig {
            in_memory: true,
            sampling: 0.5,
            ..LoaderConfig::default()
        });
        let store = loader.load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 5);
    }

    #[test]
    fn test_disk_mode_roundtrip() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.txt", "one two three");
        write_file(dir.path(), "b.txt", "two three four");

        let loader = CorpusLoader::new(LoaderConfig {
            bin_path: dir.path().join("corpus_data.bin"),
            ..LoaderConfig::default()
        });
        let store = loader.load(dir.path()).unwrap();
        assert!(!store.is_in_memory());
        assert_eq!(store.num_docs(), 2);
        assert_eq!(*store.get_doc(0).unwrap(), vec![0, 1, 2]);
        assert_eq!(*store.get_doc(1).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_utf16_file_is_decoded() {
        let dir = TempDir::new().unwrap();
        let mut raw = vec![0xFF, 0xFE];
        for unit in "Hello World".encode_utf16() {
            raw.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(dir.path().join("u16.txt"), raw).unwrap();

        let store = memory_loader().load(dir.path()).unwrap();
        assert_eq!(store.num_docs(), 1);
        assert_eq!(store.id_to_word(0), Some("hello"));
        assert_eq!(store.id_to_word(1), Some("world"));
    }
}
