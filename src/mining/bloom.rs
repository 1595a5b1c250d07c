//! Counting-Bloom seeded n-gram mining (the `bloomspan` algorithm).
//!
//! Two linear scans over the corpus. Pass 1 estimates n-gram frequencies in
//! an array of 8-bit saturating counters indexed by an FNV-1a hash; a cell
//! value is a lower bound on the summed frequency of every n-gram hashing to
//! it, so a cell below the document threshold proves all colliding n-grams
//! are infrequent. Pass 2 re-scans sequentially, keeps the occurrences that
//! survive the filter plus a per-token document-frequency check, and either
//! buffers them in memory or spills sorted chunk files for the external
//! merge. The merged candidates are handed to the greedy expander.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::cancel::CancelFlag;
use crate::corpus::CorpusStore;
use crate::error::{MattockError, Result};
use crate::mining::seed::SeedRecord;
use crate::mining::{expand, merge, MiningAlgorithm};
use crate::types::{MiningParams, Phrase};
use crate::util::memory::current_rss_mb;

const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// FNV-1a over the raw token IDs of one n-gram.
pub fn hash_ngram(tokens: &[u32]) -> u64 {
    let mut h = FNV_OFFSET_BASIS;
    for &t in tokens {
        h ^= t as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Pick the counter-array size: 20% of the memory limit, capped at 2 GiB,
/// defaulting to 512 MiB when the limit is unbounded.
pub fn filter_size_bytes(memory_limit_mb: usize) -> usize {
    const CAP: usize = 2048 * 1024 * 1024;
    if memory_limit_mb > 0 {
        (memory_limit_mb * 1024 * 1024 / 5).min(CAP)
    } else {
        512 * 1024 * 1024
    }
}

/// Fixed-size array of 8-bit saturating counters.
///
/// Increments are relaxed compare-exchange loops; saturation at 255 is the
/// only cross-thread contract, so any interleaving yields the same final
/// counter values.
pub struct CountingBloom {
    counters: Vec<AtomicU8>,
}

impl CountingBloom {
    /// Allocate `size` zeroed counters.
    pub fn with_size(size: usize) -> Self {
        let mut counters = Vec::with_capacity(size);
        counters.resize_with(size, || AtomicU8::new(0));
        CountingBloom { counters }
    }

    /// Number of counter cells.
    pub fn size(&self) -> usize {
        self.counters.len()
    }

    /// Saturating increment of the cell `hash` maps to.
    pub fn increment(&self, hash: u64) {
        let cell = &self.counters[(hash % self.counters.len() as u64) as usize];
        let mut current = cell.load(Ordering::Relaxed);
        while current < u8::MAX {
            match cell.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Current value of the cell `hash` maps to.
    pub fn get(&self, hash: u64) -> u8 {
        self.counters[(hash % self.counters.len() as u64) as usize].load(Ordering::Relaxed)
    }
}

/// Configuration for the Bloom n-gram miner.
#[derive(Debug, Clone)]
pub struct BloomMinerConfig {
    /// Memory ceiling in MiB; 0 means unbounded.
    pub memory_limit_mb: usize,
    /// Worker count for Pass 1; 0 uses the runtime default.
    pub threads: usize,
    /// Directory for sorted seed chunk files.
    pub temp_dir: PathBuf,
}

impl Default for BloomMinerConfig {
    fn default() -> Self {
        BloomMinerConfig {
            memory_limit_mb: 0,
            threads: 0,
            temp_dir: PathBuf::from("./miner_tmp"),
        }
    }
}

/// The Bloom-seeded n-gram miner with greedy expansion.
pub struct BloomNgramMiner {
    config: BloomMinerConfig,
    cancel: CancelFlag,
}

enum SeedStream {
    /// Fully sorted in-memory buffer (in-memory corpus mode).
    Buffer(Vec<SeedRecord>),
    /// Sorted chunk files awaiting the external merge (disk mode).
    Chunks(Vec<PathBuf>),
}

impl Default for BloomNgramMiner {
    fn default() -> Self {
        Self::new()
    }
}

impl BloomNgramMiner {
    /// Create a miner with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BloomMinerConfig::default())
    }

    /// Create a miner with the given configuration.
    pub fn with_config(config: BloomMinerConfig) -> Self {
        BloomNgramMiner {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Poll the given cancellation flag during expansion.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pass 1: estimate n-gram frequencies into the counting Bloom filter.
    ///
    /// Parallel over documents. In disk mode every worker opens its own
    /// corpus reader so positional reads never share a file descriptor.
    fn estimate_frequencies(
        &self,
        corpus: &CorpusStore,
        filter: &CountingBloom,
        ngrams: usize,
    ) -> Result<()> {
        info!("Bloom pass: estimating n-gram frequencies...");
        // Fail fast if the corpus file cannot be opened at all.
        drop(corpus.open_reader()?);

        let scan = || -> Result<()> {
            (0..corpus.num_docs() as u32)
                .into_par_iter()
                .try_for_each_init(
                    || corpus.open_reader().ok().flatten(),
                    |reader, d| -> Result<()> {
                        let owned;
                        let shared;
                        let doc: &[u32] = match reader {
                            Some(r) => {
                                owned = r.read_doc(d)?;
                                &owned
                            }
                            None => {
                                shared = corpus.get_doc(d)?;
                                &shared
                            }
                        };
                        if doc.len() < ngrams {
                            return Ok(());
                        }
                        for p in 0..=doc.len() - ngrams {
                            filter.increment(hash_ngram(&doc[p..p + ngrams]));
                        }
                        Ok(())
                    },
                )
        };

        if self.config.threads > 0 {
            info!("Threads limited to: {}", self.config.threads);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| MattockError::mining(format!("Failed to build thread pool: {e}")))?;
            pool.install(scan)
        } else {
            scan()
        }
    }

    /// Pass 2: collect surviving seed occurrences, spilling sorted chunks to
    /// disk when RSS crosses 75% of the memory limit.
    fn collect_seeds(
        &self,
        corpus: &CorpusStore,
        filter: &CountingBloom,
        params: &MiningParams,
    ) -> Result<SeedStream> {
        let ngrams = params.ngrams;
        info!("Step 1: gathering {ngrams}-gram seeds...");

        let in_memory = corpus.is_in_memory();
        if !in_memory {
            fs::create_dir_all(&self.config.temp_dir).map_err(|e| {
                MattockError::storage(format!(
                    "Failed to create temp directory {}: {e}",
                    self.config.temp_dir.display()
                ))
            })?;
        }

        // A cell can never exceed 255, so the threshold must be clamped
        // before comparing.
        let cell_threshold = params.min_docs.min(u8::MAX as usize) as u8;
        let word_df = corpus.word_df();
        let min_docs = params.min_docs as u32;

        let mut buffer: Vec<SeedRecord> = Vec::new();
        let mut chunk_files: Vec<PathBuf> = Vec::new();
        let mut total_processed = 0usize;
        let mut seeds_passed = 0usize;
        let mut seeds_rejected = 0usize;

        for d in 0..corpus.num_docs() as u32 {
            if !in_memory
                && self.config.memory_limit_mb > 0
                && current_rss_mb() >= self.config.memory_limit_mb * 3 / 4
            {
                self.flush_buffer(&mut buffer, &mut chunk_files)?;
            }

            let doc = corpus.get_doc(d)?;
            if doc.len() < ngrams {
                continue;
            }
            for p in 0..=doc.len() - ngrams {
                total_processed += 1;
                let window = &doc[p..p + ngrams];
                if filter.get(hash_ngram(window)) < cell_threshold {
                    seeds_rejected += 1;
                    continue;
                }
                // The filter is probabilistic; per-token document frequency
                // removes its false positives at word granularity.
                if window.iter().any(|&t| word_df[t as usize] < min_docs) {
                    seeds_rejected += 1;
                    continue;
                }
                buffer.push(SeedRecord::new(d, p as u32, window));
                seeds_passed += 1;
            }
        }

        let reduction = if total_processed > 0 {
            100.0 * seeds_rejected as f64 / total_processed as f64
        } else {
            0.0
        };
        info!("Bloom stats: {total_processed} n-grams total, {seeds_passed} accepted, {seeds_rejected} rejected ({reduction:.1}% reduction)");

        if in_memory {
            info!("In-memory mode: sorting all {} seeds in RAM...", buffer.len());
            buffer.par_sort_unstable();
            Ok(SeedStream::Buffer(buffer))
        } else {
            self.flush_buffer(&mut buffer, &mut chunk_files)?;
            Ok(SeedStream::Chunks(chunk_files))
        }
    }

    /// Sort the buffer and append it as a new chunk file.
    fn flush_buffer(
        &self,
        buffer: &mut Vec<SeedRecord>,
        chunk_files: &mut Vec<PathBuf>,
    ) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        debug!(
            "Flushing {} seeds to disk (RSS: {} MB)",
            buffer.len(),
            current_rss_mb()
        );
        buffer.par_sort_unstable();

        let path = self
            .config
            .temp_dir
            .join(format!("chunk_{}.bin", chunk_files.len()));
        let file = File::create(&path).map_err(|e| {
            MattockError::storage(format!("Failed to write chunk {}: {e}", path.display()))
        })?;
        let mut out = BufWriter::new(file);
        for record in buffer.iter() {
            record.write_to(&mut out)?;
        }
        std::io::Write::flush(&mut out)?;

        chunk_files.push(path);
        buffer.clear();
        buffer.shrink_to_fit();
        Ok(())
    }

    fn cleanup_temp_dir(&self) {
        if self.config.temp_dir.exists() {
            match fs::remove_dir_all(&self.config.temp_dir) {
                Ok(()) => debug!("Temporary directory and chunk files removed"),
                Err(e) => warn!("Cleanup of temp directory failed: {e}"),
            }
        }
    }
}

impl MiningAlgorithm for BloomNgramMiner {
    fn name(&self) -> &'static str {
        "bloomspan"
    }

    fn mine(&self, corpus: &CorpusStore, params: &MiningParams) -> Result<Vec<Phrase>> {
        if params.ngrams == 0 {
            return Err(MattockError::invalid_argument("n-gram width must be >= 1"));
        }
        if corpus.num_docs() == 0 {
            return Ok(Vec::new());
        }

        let filter_size = filter_size_bytes(self.config.memory_limit_mb);
        info!(
            "Initializing counting Bloom filter: {} MB",
            filter_size / (1024 * 1024)
        );
        let filter = CountingBloom::with_size(filter_size);

        self.estimate_frequencies(corpus, &filter, params.ngrams)?;
        let seeds = self.collect_seeds(corpus, &filter, params)?;
        // The filter is no longer needed; release it before merging.
        drop(filter);

        info!("Step 1.5: merging and filtering candidates...");
        let candidates = match seeds {
            SeedStream::Buffer(buffer) => merge::collect_sorted_buffer(buffer, params.min_docs),
            SeedStream::Chunks(files) => {
                let merged = merge::merge_chunks(&files, params.min_docs);
                self.cleanup_temp_dir();
                merged?
            }
        };
        info!("Candidates after merge: {}", candidates.len());

        expand::expand_candidates(corpus, candidates, params, &self.cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_hash_matches_reference() {
        // FNV-1a over the two u64-widened token values 1, 2.
        let mut h = FNV_OFFSET_BASIS;
        h ^= 1;
        h = h.wrapping_mul(FNV_PRIME);
        h ^= 2;
        h = h.wrapping_mul(FNV_PRIME);
        assert_eq!(hash_ngram(&[1, 2]), h);
        assert_ne!(hash_ngram(&[1, 2]), hash_ngram(&[2, 1]));
    }

    #[test]
    fn test_filter_size_selection() {
        assert_eq!(filter_size_bytes(0), 512 * 1024 * 1024);
        assert_eq!(filter_size_bytes(100), 100 * 1024 * 1024 / 5);
        // Capped at 2 GiB for very large limits.
        assert_eq!(filter_size_bytes(1_000_000), 2048 * 1024 * 1024);
    }

    #[test]
    fn test_counting_bloom_counts_and_saturates() {
        let filter = CountingBloom::with_size(64);
        let h = hash_ngram(&[5, 6]);

        for _ in 0..3 {
            filter.increment(h);
        }
        assert_eq!(filter.get(h), 3);

        for _ in 0..300 {
            filter.increment(h);
        }
        assert_eq!(filter.get(h), 255);
    }

    #[test]
    fn test_counting_bloom_cells_are_lower_bounds() {
        // With a single cell every hash collides, so the cell holds the
        // saturating sum of all increments.
        let filter = CountingBloom::with_size(1);
        filter.increment(hash_ngram(&[1]));
        filter.increment(hash_ngram(&[2]));
        assert_eq!(filter.get(hash_ngram(&[3])), 2);
    }

    #[test]
    fn test_parallel_increments_agree_with_sequential() {
        let filter = CountingBloom::with_size(1024);
        let h = hash_ngram(&[7, 8, 9]);
        (0..100u32).into_par_iter().for_each(|_| filter.increment(h));
        assert_eq!(filter.get(h), 100);
    }
}
