//! BIDE+ style closed phrase mining.
//!
//! Depth-first search over projected occurrence lists. Each occurrence
//! carries the position of the pattern's *last* token, so extending by one
//! token just advances every surviving occurrence by one. A branch is pruned
//! when some token precedes every occurrence (backward extension), and a
//! pattern is emitted only when no single-token extension keeps the full
//! support (forward closure).
//!
//! Support here counts occurrences, not distinct documents, the opposite of
//! the Bloom/greedy path. The closure checks depend on this definition; do
//! not unify the two.

use ahash::AHashMap;
use log::info;

use crate::cancel::CancelFlag;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::mining::{MiningAlgorithm, SupportInfo};
use crate::types::{MiningParams, Occurrence, Phrase};

/// The BIDE+ closed phrase miner.
#[derive(Debug, Clone, Default)]
pub struct BideMiner {
    cancel: CancelFlag,
}

impl BideMiner {
    /// Create a new BIDE+ miner.
    pub fn new() -> Self {
        BideMiner::default()
    }

    /// Create a miner that polls the given cancellation flag.
    pub fn with_cancel(cancel: CancelFlag) -> Self {
        BideMiner { cancel }
    }

    fn mine_recursive(
        &self,
        corpus: &CorpusStore,
        min_sup: usize,
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

        if is_closed && !pattern.is_empty() {
            results.push(Phrase::new(
                pattern.clone(),
                matches.to_vec(),
                matches.len(),
            ));
        }

        for (item, info) in sorted_extensions(extensions) {
            if info.count >= min_sup {
                pattern.push(item);
                self.mine_recursive(corpus, min_sup, pattern, &info.matches, results)?;
                pattern.pop();
            }
        }
        Ok(())
    }
}

impl MiningAlgorithm for BideMiner {
    fn name(&self) -> &'static str {
        "bide"
    }

    fn mine(&self, corpus: &CorpusStore, params: &MiningParams) -> Result<Vec<Phrase>> {
        let min_sup = params.min_docs;
        let mut results = Vec::new();

        for (item, info) in sorted_extensions(root_projection(corpus)?) {
            if info.count >= min_sup {
                let mut pattern = vec![item];
                self.mine_recursive(corpus, min_sup, &mut pattern, &info.matches, &mut results)?;
            }
        }

        info!("Total closed patterns found: {}", results.len());
        Ok(results)
    }
}

/// Scan the corpus once, projecting every single-token occurrence.
pub fn root_projection(corpus: &CorpusStore) -> Result<AHashMap<u32, SupportInfo>> {
    let mut root: AHashMap<u32, SupportInfo> = AHashMap::new();
    for d in 0..corpus.num_docs() as u32 {
        let doc = corpus.get_doc(d)?;
        for (pos, &item) in doc.iter().enumerate() {
            let info = root.entry(item).or_default();
            info.count += 1;
            info.matches.push(Occurrence::new(d, pos as u32));
        }
    }
    Ok(root)
}

/// Bucket the token following each occurrence, advancing its position.
pub fn forward_extensions(
    corpus: &CorpusStore,
    matches: &[Occurrence],
) -> Result<AHashMap<u32, SupportInfo>> {
    let mut extensions: AHashMap<u32, SupportInfo> = AHashMap::new();
    for m in matches {
        let doc = corpus.get_doc(m.doc_id)?;
        let next_pos = m.pos as usize + 1;
        if next_pos < doc.len() {
            let info = extensions.entry(doc[next_pos]).or_default();
            info.count += 1;
            info.matches.push(Occurrence::new(m.doc_id, next_pos as u32));
        }
    }
    Ok(extensions)
}

/// Fixed iteration order so recursion and output are run-to-run identical.
pub fn sorted_extensions(map: AHashMap<u32, SupportInfo>) -> Vec<(u32, SupportInfo)> {
    let mut entries: Vec<_> = map.into_iter().collect();
    entries.sort_unstable_by_key(|(item, _)| *item);
    entries
}

/// True unless some token precedes the pattern in *every* occurrence.
///
/// The preceding item of an occurrence sits `pattern.len()` positions before
/// the recorded last-token position.
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

    fn mine(docs: &[&[u32]], min_sup: usize) -> Vec<Phrase> {
        let store = corpus(docs);
        BideMiner::new()
            .mine(
                &store,
                &MiningParams {
                    min_docs: min_sup,
                    ngrams: 2,
                    min_len: 2,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_only_the_maximal_phrase_survives() {
        // d0 = d1 = a b c: every proper sub-phrase is either forward- or
        // backward-extensible with full support.
        let results = mine(&[&[0, 1, 2], &[0, 1, 2]], 2);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tokens, vec![0, 1, 2]);
        assert_eq!(results[0].support, 2);
    }

    #[test]
    fn test_support_counts_positions_not_documents() {
        // One document with "a a": both occurrences count.
        let results = mine(&[&[0, 0]], 2);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tokens, vec![0]);
        assert_eq!(results[0].support, 2);
    }

    #[test]
    fn test_emitted_patterns_are_forward_closed() {
        let results = mine(&[&[0, 1, 2], &[0, 1, 3], &[0, 1]], 2);
        let store = corpus(&[&[0, 1, 2], &[0, 1, 3], &[0, 1]]);
        for phrase in &results {
            let extensions = forward_extensions(&store, &phrase.occs).unwrap();
            for info in extensions.values() {
                assert!(info.count < phrase.occs.len());
            }
        }
        // "a b" is closed here: its extensions split between c, d, nothing.
        assert!(results.iter().any(|p| p.tokens == vec![0, 1]));
    }

    #[test]
    fn test_backward_extension_prunes_suffixes() {
        // "b" and "c" are always preceded by the same token, so neither is
        // emitted on its own.
        let results = mine(&[&[0, 1, 2], &[0, 1, 2]], 2);
        assert!(!results.iter().any(|p| p.tokens == vec![1]));
        assert!(!results.iter().any(|p| p.tokens == vec![1, 2]));
    }

    #[test]
    fn test_single_token_emission_with_min_sup_one() {
        // BIDE emits patterns of length >= 1 regardless of min_len.
        let results = mine(&[&[0, 1]], 1);
        assert!(results.iter().any(|p| p.tokens == vec![0, 1]));
        // "b" alone is backward-extensible (always preceded by a): pruned.
        assert!(!results.iter().any(|p| p.tokens == vec![1]));
    }

    #[test]
    fn test_occurrences_point_at_last_token() {
        let results = mine(&[&[0, 1, 2], &[0, 1, 2]], 2);
        let phrase = &results[0];
        // Last token of "a b c" is at position 2 in both documents.
        assert!(phrase.occs.iter().all(|o| o.pos == 2));
    }

    #[test]
    fn test_empty_corpus() {
        let results = mine(&[], 1);
        assert!(results.is_empty());
    }

    #[test]
    fn test_cancellation_returns_partial() {
        let store = corpus(&[&[0, 1], &[0, 1]]);
        let cancel = CancelFlag::new();
        cancel.request_stop();
        let results = BideMiner::with_cancel(cancel)
            .mine(&store, &MiningParams::default())
            .unwrap();
        assert!(results.is_empty());
    }
}
