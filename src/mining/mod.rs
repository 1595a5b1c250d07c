//! Phrase mining algorithms.
//!
//! Three interchangeable miners implement [`MiningAlgorithm`]:
//!
//! - [`bloom::BloomNgramMiner`]: counting-Bloom seeded n-gram mining with
//!   external merge sort and greedy rightward expansion (the default).
//! - [`bide::BideMiner`]: BIDE+ style depth-first closed phrase mining.
//! - [`clospan::CloSpanMiner`]: CloSpan style depth-first closed phrase
//!   mining with a minimum-length emission gate.
//!
//! The Bloom/greedy path counts support as distinct documents; the two
//! depth-first miners count occurrences. The difference is intentional and
//! load-bearing for their closure checks.

pub mod bide;
pub mod bloom;
pub mod clospan;
pub mod expand;
pub mod merge;
pub mod seed;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::types::{MiningParams, Occurrence, Phrase};

/// Trait implemented by every mining algorithm.
///
/// A miner reads everything it needs from the corpus store and returns the
/// mined phrases; errors surface through the `Result`, partial results after
/// a cancellation come back as a normal `Ok`.
pub trait MiningAlgorithm {
    /// Human-readable name (for logs).
    fn name(&self) -> &'static str;

    /// Run the mining pass over the whole corpus.
    fn mine(&self, corpus: &CorpusStore, params: &MiningParams) -> Result<Vec<Phrase>>;
}

/// Algorithm selection for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    /// Bloom-seeded n-gram mining with greedy expansion.
    Bloomspan,
    /// BIDE+ closed phrase mining.
    Bide,
    /// CloSpan closed phrase mining.
    Clospan,
}

/// Instantiate the selected algorithm, wired to the given cancellation flag.
pub fn create_algorithm(
    kind: AlgorithmKind,
    bloom_config: bloom::BloomMinerConfig,
    cancel: CancelFlag,
) -> Box<dyn MiningAlgorithm> {
    match kind {
        AlgorithmKind::Bloomspan => {
            Box::new(bloom::BloomNgramMiner::with_config(bloom_config).with_cancel(cancel))
        }
        AlgorithmKind::Bide => Box::new(bide::BideMiner::with_cancel(cancel)),
        AlgorithmKind::Clospan => Box::new(clospan::CloSpanMiner::with_cancel(cancel)),
    }
}

/// Projected occurrence list for one extension token during DFS mining.
#[derive(Debug, Clone, Default)]
pub struct SupportInfo {
    /// Positional support: number of occurrences, not distinct documents.
    pub count: usize,
    /// Position of the pattern's last token in each occurrence.
    pub matches: Vec<Occurrence>,
}
