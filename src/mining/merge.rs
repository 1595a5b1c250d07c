//! Candidate assembly from sorted seed streams.
//!
//! Disk mode runs a k-way merge over the sorted chunk files through a
//! min-heap; in-memory mode scans the single sorted buffer. Both group
//! consecutive records with identical token sequences into one candidate and
//! keep it when its distinct-document count reaches the threshold.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ahash::AHashSet;

use crate::error::{MattockError, Result};
use crate::mining::seed::SeedRecord;
use crate::types::{Occurrence, Phrase};

/// Group a fully sorted in-memory seed buffer into candidates.
pub fn collect_sorted_buffer(buffer: Vec<SeedRecord>, min_docs: usize) -> Vec<Phrase> {
    let mut candidates = Vec::new();
    let mut i = 0;
    while i < buffer.len() {
        let representative = &buffer[i];
        let mut occs = Vec::new();
        let mut unique_docs: AHashSet<u32> = AHashSet::new();

        while i < buffer.len() && buffer[i].tokens() == representative.tokens() {
            occs.push(Occurrence::new(buffer[i].doc_id, buffer[i].pos));
            unique_docs.insert(buffer[i].doc_id);
            i += 1;
        }

        if unique_docs.len() >= min_docs {
            candidates.push(Phrase::new(
                representative.tokens().to_vec(),
                occs,
                unique_docs.len(),
            ));
        }
    }
    candidates
}

/// K-way merge of sorted chunk files into candidates.
pub fn merge_chunks(chunk_files: &[PathBuf], min_docs: usize) -> Result<Vec<Phrase>> {
    let mut readers = Vec::with_capacity(chunk_files.len());
    for path in chunk_files {
        let file = File::open(path).map_err(|e| {
            MattockError::storage(format!("Failed to read chunk {}: {e}", path.display()))
        })?;
        readers.push(ChunkReader {
            input: BufReader::new(file),
        });
    }

    // Min-heap ordered by the seed record ordering (tokens, doc_id, pos).
    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    for (idx, reader) in readers.iter_mut().enumerate() {
        if let Some(record) = reader.next()? {
            heap.push(Reverse(HeapEntry { record, idx }));
        }
    }

    let mut candidates = Vec::new();
    while let Some(Reverse(top)) = heap.pop() {
        let representative = top.record.clone();
        let mut occs = Vec::new();
        let mut unique_docs: AHashSet<u32> = AHashSet::new();

        let mut entry = Some(top);
        loop {
            let HeapEntry { record, idx } = match entry.take() {
                Some(e) => e,
                None => break,
            };
            occs.push(Occurrence::new(record.doc_id, record.pos));
            unique_docs.insert(record.doc_id);
            if let Some(next) = readers[idx].next()? {
                heap.push(Reverse(HeapEntry { record: next, idx }));
            }

            match heap.peek() {
                Some(Reverse(peeked)) if peeked.record.tokens() == representative.tokens() => {
                    entry = heap.pop().map(|Reverse(e)| e);
                }
                _ => break,
            }
        }

        if unique_docs.len() >= min_docs {
            candidates.push(Phrase::new(
                representative.tokens().to_vec(),
                occs,
                unique_docs.len(),
            ));
        }
    }

    Ok(candidates)
}

struct ChunkReader {
    input: BufReader<File>,
}

impl ChunkReader {
    fn next(&mut self) -> Result<Option<SeedRecord>> {
        SeedRecord::read_from(&mut self.input)
    }
}

struct HeapEntry {
    record: SeedRecord,
    idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record.cmp(&other.record)
    }
}
