//! Core data model shared by the corpus store and the mining passes.

/// Dense token identifier, assigned at load time in order of first appearance.
pub type TokenId = u32;

/// Dense document identifier, 0..N-1 in load order.
pub type DocId = u32;

/// Start position of a pattern match inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occurrence {
    /// Document the match starts in.
    pub doc_id: DocId,
    /// 0-based token index of the match start.
    pub pos: u32,
}

impl Occurrence {
    /// Create a new occurrence.
    pub fn new(doc_id: DocId, pos: u32) -> Self {
        Occurrence { doc_id, pos }
    }
}

/// A mined phrase (or an intermediate candidate on its way to becoming one).
///
/// `support` is the number of distinct documents for the Bloom/greedy path and
/// the number of occurrences for the BIDE/CloSpan miners. The two notions are
/// intentionally different; see the miner modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Token sequence, length >= 1.
    pub tokens: Vec<TokenId>,
    /// Every position where the phrase matches.
    pub occs: Vec<Occurrence>,
    /// Support under the owning miner's counting rule.
    pub support: usize,
}

impl Phrase {
    /// Create a phrase from its parts.
    pub fn new(tokens: Vec<TokenId>, occs: Vec<Occurrence>, support: usize) -> Self {
        Phrase {
            tokens,
            occs,
            support,
        }
    }

    /// Number of tokens in the phrase.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when the phrase has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Parameters common to all mining algorithms.
#[derive(Debug, Clone)]
pub struct MiningParams {
    /// Minimum supporting documents (positional support for BIDE/CloSpan).
    pub min_docs: usize,
    /// Seed n-gram width for the Bloom path.
    pub ngrams: usize,
    /// Minimum token count for a phrase to be reported.
    pub min_len: usize,
}

impl Default for MiningParams {
    fn default() -> Self {
        MiningParams {
            min_docs: 10,
            ngrams: 4,
            min_len: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_len() {
        let phrase = Phrase::new(vec![1, 2, 3], vec![Occurrence::new(0, 5)], 1);
        assert_eq!(phrase.len(), 3);
        assert!(!phrase.is_empty());
    }

    #[test]
    fn test_default_params() {
        let params = MiningParams::default();
        assert_eq!(params.min_docs, 10);
        assert_eq!(params.ngrams, 4);
        assert_eq!(params.min_len, 2);
    }
}
