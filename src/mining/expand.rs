//! Greedy rightward expansion of merged candidates.
//!
//! Candidates are visited in descending score order (support × length) and
//! grown one token at a time: occurrences are bucketed by the token that
//! follows them, and the bucket with the highest distinct-document count
//! wins as long as it stays at or above the document threshold. A phrase
//! whose occurrences all share the same preceding token is discarded as not
//! backward-closed, because the longer phrase to its left has the same
//! support. Every position a kept phrase covers is marked so lower-scored
//! candidates shadowed by it are skipped.

use ahash::{AHashMap, AHashSet};
use log::{debug, info};
use rayon::prelude::*;

use crate::cancel::CancelFlag;
use crate::corpus::CorpusStore;
use crate::error::Result;
use crate::types::{MiningParams, Occurrence, Phrase};

/// Expand candidates into maximal phrases.
///
/// Returns phrases of at least `params.min_len` tokens. A pending
/// cancellation ends the loop early and returns what has been emitted.
pub fn expand_candidates(
    corpus: &CorpusStore,
    mut candidates: Vec<Phrase>,
    params: &MiningParams,
    cancel: &CancelFlag,
) -> Result<Vec<Phrase>> {
    info!(
        "Step 2: sorting {} candidates by score (support * length)...",
        candidates.len()
    );
    candidates.par_sort_unstable_by(|a, b| {
        let score_a = a.support * a.tokens.len();
        let score_b = b.support * b.tokens.len();
        score_b
            .cmp(&score_a)
            .then_with(|| b.support.cmp(&a.support))
            // Total order: equal-scored candidates keep a fixed relative
            // order across runs even under an unstable parallel sort.
            .then_with(|| a.tokens.cmp(&b.tokens))
    });

    info!("Step 3: expanding candidates...");
    let mut covered: Vec<Vec<bool>> = corpus
        .doc_lengths()
        .iter()
        .map(|&len| vec![false; len as usize])
        .collect();
    let mut phrases: Vec<Phrase> = Vec::new();

    let total = candidates.len();
    for (idx, mut cand) in candidates.into_iter().enumerate() {
        if cancel.is_stopped() {
            info!("Expansion interrupted, saving partial results...");
            break;
        }
        if idx % 1000 == 0 {
            debug!("Expanding {idx}/{total}, phrases found: {}", phrases.len());
        }

        // Skip candidates fully shadowed by already-kept phrases.
        if cand
            .occs
            .iter()
            .all(|o| covered[o.doc_id as usize][o.pos as usize])
        {
            continue;
        }

        expand_right(corpus, &mut cand, params.min_docs)?;

        if cand.occs.is_empty() {
            continue;
        }
        if has_common_predecessor(corpus, &cand)? {
            // Not backward-closed: a longer phrase with the same support
            // exists to the left.
            continue;
        }

        // Mark coverage even when the phrase is dropped by the length
        // filter, so shadowed candidates are not re-emitted later.
        for o in &cand.occs {
            let row = &mut covered[o.doc_id as usize];
            for i in 0..cand.tokens.len() {
                let p = o.pos as usize + i;
                if p < row.len() {
                    row[p] = true;
                }
            }
        }

        if cand.tokens.len() >= params.min_len {
            phrases.push(cand);
        }
    }

    info!("Total phrases mined: {}", phrases.len());
    Ok(phrases)
}

/// Grow `cand` to the right while some next-token bucket keeps the
/// distinct-document count at or above `min_docs`.
fn expand_right(corpus: &CorpusStore, cand: &mut Phrase, min_docs: usize) -> Result<()> {
    loop {
        let mut buckets: AHashMap<u32, Vec<Occurrence>> = AHashMap::new();
        for &o in &cand.occs {
            let doc = corpus.get_doc(o.doc_id)?;
            let next = o.pos as usize + cand.tokens.len();
            if next < doc.len() {
                buckets.entry(doc[next]).or_default().push(o);
            }
        }

        // Token order makes tie-breaking independent of hash-map iteration,
        // so identical runs produce identical phrases.
        let mut tokens: Vec<u32> = buckets.keys().copied().collect();
        tokens.sort_unstable();

        let mut best_support = 0usize;
        let mut best_token = 0u32;
        let mut best_occs: Vec<Occurrence> = Vec::new();
        for token in tokens {
            if let Some(occs) = buckets.remove(&token) {
                let unique: AHashSet<u32> = occs.iter().map(|o| o.doc_id).collect();
                if unique.len() >= min_docs && unique.len() >= best_support {
                    best_support = unique.len();
                    best_token = token;
                    best_occs = occs;
                }
            }
        }

        if best_support == 0 {
            return Ok(());
        }
        cand.tokens.push(best_token);
        cand.occs = best_occs;
        cand.support = best_support;
    }
}

/// True when every occurrence is preceded by the same token.
///
/// The predecessor is sampled from the first occurrence; when that
/// occurrence sits at a document start the phrase counts as backward-closed
/// without looking further.
fn has_common_predecessor(corpus: &CorpusStore, cand: &Phrase) -> Result<bool> {
    let first = cand.occs[0];
    if first.pos == 0 {
        return Ok(false);
    }
    let prev = corpus.get_doc(first.doc_id)?[first.pos as usize - 1];
    for &o in &cand.occs {
        if o.pos == 0 || corpus.get_doc(o.doc_id)?[o.pos as usize - 1] != prev {
            return Ok(false);
        }
    }
    Ok(true)
}
