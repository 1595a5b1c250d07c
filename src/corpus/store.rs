//! Immutable corpus store with memory-resident and disk-backed modes.
//!
//! Once loaded, the store never changes: mining passes read documents, the
//! per-word document-frequency table, and the ID dictionary through it. In
//! disk mode documents live in a single binary file of little-endian `u32`
//! token IDs and pass through a bounded cache guarded by one mutex; callers
//! that need high-rate concurrent reads open their own [`CorpusReader`] and
//! bypass the cache entirely.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashMap;
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;

use crate::error::{MattockError, Result};
use crate::types::{DocId, TokenId};

/// A corpus of ID-encoded documents plus the tables mining needs.
#[derive(Debug)]
pub struct CorpusStore {
    id_to_word: Vec<String>,
    word_df: Vec<u32>,
    source_paths: Vec<String>,
    doc_lengths: Vec<u32>,
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    Memory {
        docs: Vec<Arc<Vec<TokenId>>>,
    },
    Disk {
        bin_path: PathBuf,
        doc_offsets: Vec<u64>,
        cache_capacity: usize,
        cache: Mutex<DocCache>,
    },
}

#[derive(Debug)]
struct DocCache {
    file: File,
    cached: AHashMap<DocId, Arc<Vec<TokenId>>>,
}

impl CorpusStore {
    /// Create a store whose documents are fully memory-resident.
    pub fn in_memory(
        id_to_word: Vec<String>,
        word_df: Vec<u32>,
        source_paths: Vec<String>,
        docs: Vec<Arc<Vec<TokenId>>>,
    ) -> Self {
        let doc_lengths = docs.iter().map(|d| d.len() as u32).collect();
        CorpusStore {
            id_to_word,
            word_df,
            source_paths,
            doc_lengths,
            backing: Backing::Memory { docs },
        }
    }

    /// Create a store backed by a binary corpus file.
    ///
    /// `doc_offsets[d]` is the byte offset of document `d` inside `bin_path`;
    /// its length in tokens is `doc_lengths[d]`.
    pub fn disk_backed(
        id_to_word: Vec<String>,
        word_df: Vec<u32>,
        source_paths: Vec<String>,
        bin_path: PathBuf,
        doc_offsets: Vec<u64>,
        doc_lengths: Vec<u32>,
        cache_capacity: usize,
    ) -> Result<Self> {
        let file = File::open(&bin_path).map_err(|e| {
            MattockError::storage(format!(
                "Failed to open corpus file {}: {e}",
                bin_path.display()
            ))
        })?;
        Ok(CorpusStore {
            id_to_word,
            word_df,
            source_paths,
            doc_lengths,
            backing: Backing::Disk {
                bin_path,
                doc_offsets,
                cache_capacity,
                cache: Mutex::new(DocCache {
                    file,
                    cached: AHashMap::new(),
                }),
            },
        })
    }

    /// Number of documents in the corpus.
    pub fn num_docs(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Token count of document `doc_id`.
    pub fn doc_len(&self, doc_id: DocId) -> usize {
        self.doc_lengths[doc_id as usize] as usize
    }

    /// Per-document token counts.
    pub fn doc_lengths(&self) -> &[u32] {
        &self.doc_lengths
    }

    /// True when all documents are memory-resident.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory { .. })
    }

    /// Vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.id_to_word.len()
    }

    /// Read-only view of the per-word document-frequency table.
    pub fn word_df(&self) -> &[u32] {
        &self.word_df
    }

    /// Render a token ID back to its word (result rendering only).
    pub fn id_to_word(&self, id: TokenId) -> Option<&str> {
        self.id_to_word.get(id as usize).map(String::as_str)
    }

    /// Source path of document `doc_id` (result rendering only).
    pub fn source_path(&self, doc_id: DocId) -> Option<&str> {
        self.source_paths.get(doc_id as usize).map(String::as_str)
    }

    /// Fetch a document, going through the bounded cache in disk mode.
    ///
    /// A failed disk read is fatal to the calling pass: the corpus is
    /// immutable, so a short or failed read means the store is unusable.
    pub fn get_doc(&self, doc_id: DocId) -> Result<Arc<Vec<TokenId>>> {
        match &self.backing {
            Backing::Memory { docs } => docs
                .get(doc_id as usize)
                .cloned()
                .ok_or_else(|| MattockError::corpus(format!("No such document: {doc_id}"))),
            Backing::Disk {
                doc_offsets,
                cache_capacity,
                cache,
                ..
            } => {
                let mut cache = cache.lock();
                if let Some(doc) = cache.cached.get(&doc_id) {
                    return Ok(doc.clone());
                }

                // Evict an arbitrary entry once the cache is full.
                if cache.cached.len() >= *cache_capacity {
                    let victim = cache.cached.keys().next().copied();
                    if let Some(victim) = victim {
                        cache.cached.remove(&victim);
                    }
                }

                let len = self.doc_len(doc_id);
                let offset = doc_offsets[doc_id as usize];
                let doc = Arc::new(read_doc_at(&mut cache.file, offset, len)?);
                cache.cached.insert(doc_id, doc.clone());
                Ok(doc)
            }
        }
    }

    /// Put a document into the disk-mode cache if there is room.
    ///
    /// Used by the loader when `--preload` is set; a no-op in memory mode.
    pub(crate) fn preload_doc(&self, doc_id: DocId, tokens: Vec<TokenId>) {
        if let Backing::Disk {
            cache_capacity,
            cache,
            ..
        } = &self.backing
        {
            let mut cache = cache.lock();
            if cache.cached.len() < *cache_capacity {
                cache.cached.insert(doc_id, Arc::new(tokens));
            }
        }
    }

    /// Open a cache-bypassing reader over the corpus binary file.
    ///
    /// Returns `None` in memory mode. Each worker thread opens its own
    /// reader so positional reads never contend on a shared descriptor.
    pub fn open_reader(&self) -> Result<Option<CorpusReader<'_>>> {
        match &self.backing {
            Backing::Memory { .. } => Ok(None),
            Backing::Disk {
                bin_path,
                doc_offsets,
                ..
            } => {
                let file = File::open(bin_path).map_err(|e| {
                    MattockError::storage(format!(
                        "Failed to open corpus file {}: {e}",
                        bin_path.display()
                    ))
                })?;
                Ok(Some(CorpusReader {
                    file,
                    doc_offsets,
                    doc_lengths: &self.doc_lengths,
                }))
            }
        }
    }
}

/// A private file handle for raw positional document reads.
#[derive(Debug)]
pub struct CorpusReader<'a> {
    file: File,
    doc_offsets: &'a [u64],
    doc_lengths: &'a [u32],
}

impl CorpusReader<'_> {
    /// Read document `doc_id` directly from the binary file.
    pub fn read_doc(&mut self, doc_id: DocId) -> Result<Vec<TokenId>> {
        let len = self.doc_lengths[doc_id as usize] as usize;
        let offset = self.doc_offsets[doc_id as usize];
        read_doc_at(&mut self.file, offset, len)
    }
}

fn read_doc_at(file: &mut File, offset: u64, len: usize) -> Result<Vec<TokenId>> {
    let mut raw = vec![0u8; len * 4];
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(&mut raw)?;
    let mut tokens = vec![0u32; len];
    LittleEndian::read_u32_into(&raw, &mut tokens);
    Ok(tokens)
}
