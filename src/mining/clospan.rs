//! CloSpan style closed phrase mining.
//!
//! Shares the depth-first projection scheme of the BIDE+ miner (and its
//! positional support counting) with two differences: the backward check
//! treats a pattern as closed as soon as any occurrence starts at the
//! beginning of a document, since no token can precede every occurrence
//! then; and only patterns of at least `min_len` tokens are emitted.

use ahash::AHashMap;
use log::info;

use crate::cancel::CancelFlag;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::mining::bide::{forward_extensions, root_projection, sorted_extensions};
use crate::mining::MiningAlgorithm;
use crate::types::{MiningParams, Occurrence, Phrase};

/// The CloSpan closed phrase miner.
#[derive(Debug, Clone, Default)]
pub struct CloSpanMiner {
    cancel: CancelFlag,
}

impl CloSpanMiner {
    /// Create a new CloSpan miner.
    pub fn new() -> Self {
        CloSpanMiner::default()
    }

    /// Create a miner that polls the given cancellation flag.
    pub fn with_cancel(cancel: CancelFlag) -> Self {
        CloSpanMiner { cancel }
    }

    fn mine_recursive(
        &self,
        corpus: &CorpusStore,
        params: &MiningParams,
        pattern: &mut Vec<u32>,
        matches: &[Occurrence],
        results: &mut Vec<Phrase>,
    ) -> Result<()> {
        if self.cancel.is_stopped() {
            return Ok(());
        }

        if !is_backward_closed(corpus, pattern, matches)? {
            return Ok(());
        }

        let extensions = forward_extensions(corpus, matches)?;
        let is_closed = extensions.values().all(|info| info.count != matches.len());

        if is_closed && pattern.len() >= params.min_len {
            results.push(Phrase::new(
                pattern.clone(),
                matches.to_vec(),
                matches.len(),
            ));
        }

        for (item, info) in sorted_extensions(extensions) {
            if info.count >= params.min_docs {
                pattern.push(item);
                self.mine_recursive(corpus, params, pattern, &info.matches, results)?;
                pattern.pop();
            }
        }
        Ok(())
    }
}

impl MiningAlgorithm for CloSpanMiner {
    fn name(&self) -> &'static str {
        "clospan"
    }

    fn mine(&self, corpus: &CorpusStore, params: &MiningParams) -> Result<Vec<Phrase>> {
        let mut results = Vec::new();

        for (item, info) in sorted_extensions(root_projection(corpus)?) {
            if info.count >= params.min_docs {
                let mut pattern = vec![item];
                self.mine_recursive(corpus, params, &mut pattern, &info.matches, &mut results)?;
            }
        }

        info!("Total closed patterns found: {}", results.len());
        Ok(results)
    }
}

/// Backward check with the start-of-document early return.
///
/// An occurrence with fewer than `pattern.len()` tokens before it means the
/// pattern can begin at a document start, so no universal preceding item
/// exists and the branch is closed without inspecting the rest.
fn is_backward_closed(
    corpus: &CorpusStore,
    pattern: &[u32],
    matches: &[Occurrence],
) -> Result<bool> {
    if pattern.is_empty() || matches.is_empty() {
        return Ok(true);
    }
    let pattern_len = pattern.len() as u32;
    let mut back_counts: AHashMap<u32, usize> = AHashMap::new();

    for m in matches {
        if m.pos >= pattern_len {
            let doc = corpus.get_doc(m.doc_id)?;
            let prev_item = doc[(m.pos - pattern_len) as usize];
            let count = back_counts.entry(prev_item).or_insert(0);
            *count += 1;
            if *count == matches.len() {
                return Ok(false);
            }
        } else {
            return Ok(true);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;
    use std::sync::Arc;

    fn corpus(docs: &[&[u32]]) -> CorpusStore {
        let vocab = 1 + docs
            .iter()
            .flat_map(|d| d.iter())
            .copied()
            .max()
            .unwrap_or(0) as usize;
        let mut word_df = vec![0u32; vocab];
        for doc in docs {
            let unique: AHashSet<u32> = doc.iter().copied().collect();
            for t in unique {
                word_df[t as usize] += 1;
            }
        }
        CorpusStore::in_memory(
            (0..vocab).map(|i| format!("w{i}")).collect(),
            word_df,
            (0..docs.len()).map(|i| format!("d{i}")).collect(),
            docs.iter().map(|d| Arc::new(d.to_vec())).collect(),
        )
    }

    fn mine(docs: &[&[u32]], min_sup: usize, min_len: usize) -> Vec<Phrase> {
        let store = corpus(docs);
        CloSpanMiner::new()
            .mine(
                &store,
                &MiningParams {
                    min_docs: min_sup,
                    ngrams: 2,
                    min_len,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_min_len_gates_emission() {
        // Same corpus, different gates: length 1 patterns only appear when
        // min_len allows them.
        let long_only = mine(&[&[0, 1, 2], &[0, 1, 2]], 2, 2);
        assert_eq!(long_only.len(), 1);
        assert_eq!(long_only[0].tokens, vec![0, 1, 2]);

        let with_short = mine(&[&[0, 1], &[0, 2]], 2, 1);
        assert!(with_short.iter().any(|p| p.tokens == vec![0]));
    }

    #[test]
    fn test_document_start_counts_as_closed() {
        // "a" occurs at the start of d1, so even though d0 precedes it with
        // "x" the pattern cannot have a universal predecessor.
        let results = mine(&[&[3, 0, 1], &[0, 1]], 2, 1);
        assert!(results.iter().any(|p| p.tokens == vec![0, 1]));
    }

    #[test]
    fn test_universal_predecessor_prunes() {
        let results = mine(&[&[0, 1, 2], &[0, 1, 2]], 2, 1);
        // "b c" is always preceded by "a": pruned despite meeting support.
        assert!(!results.iter().any(|p| p.tokens == vec![1, 2]));
        assert!(!results.iter().any(|p| p.tokens == vec![1]));
    }

    #[test]
    fn test_positional_support() {
        let results = mine(&[&[0, 0, 0]], 2, 1);
        // "a" occurs three times in one document; "a a" twice.
        let single = results.iter().find(|p| p.tokens == vec![0]).unwrap();
        assert_eq!(single.support, 3);
        let double = results.iter().find(|p| p.tokens == vec![0, 0]).unwrap();
        assert_eq!(double.support, 2);
    }

    #[test]
    fn test_cancellation_returns_partial() {
        let store = corpus(&[&[0, 1], &[0, 1]]);
        let cancel = CancelFlag::new();
        cancel.request_stop();
        let results = CloSpanMiner::with_cancel(cancel)
            .mine(&store, &MiningParams::default())
            .unwrap();
        assert!(results.is_empty());
    }
}
