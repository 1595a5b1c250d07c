//! Seed occurrence records for the Bloom n-gram miner.
//!
//! Pass 2 emits one [`SeedRecord`] per surviving n-gram occurrence. Records
//! are sorted by (tokens, doc_id, pos) and either kept in one in-memory
//! buffer or spilled to sorted chunk files that the external merge consumes.
//!
//! Token storage is a tagged variant: n-grams up to [`SMALL_NGRAM_THRESHOLD`]
//! tokens live inline in a fixed array, longer ones own a heap vector. The
//! on-disk format records which variant was used so a round trip is
//! byte-identical.

use std::cmp::Ordering;
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{MattockError, Result};
use crate::types::{DocId, TokenId};

/// Largest n-gram width stored inline.
pub const SMALL_NGRAM_THRESHOLD: usize = 16;

/// One n-gram occurrence: the tokens plus where they were harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRecord {
    /// Document the n-gram starts in.
    pub doc_id: DocId,
    /// 0-based start position.
    pub pos: u32,
    tokens: SeedTokens,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SeedTokens {
    Inline { len: u8, buf: [TokenId; SMALL_NGRAM_THRESHOLD] },
    Heap(Vec<TokenId>),
}

impl SeedRecord {
    /// Create a record, choosing inline or heap storage by width.
    pub fn new(doc_id: DocId, pos: u32, tokens: &[TokenId]) -> Self {
        let storage = if tokens.len() <= SMALL_NGRAM_THRESHOLD {
            let mut buf = [0u32; SMALL_NGRAM_THRESHOLD];
            buf[..tokens.len()].copy_from_slice(tokens);
            SeedTokens::Inline {
                len: tokens.len() as u8,
                buf,
            }
        } else {
            SeedTokens::Heap(tokens.to_vec())
        };
        SeedRecord {
            doc_id,
            pos,
            tokens: storage,
        }
    }

    /// Read-only view of the token sequence.
    pub fn tokens(&self) -> &[TokenId] {
        match &self.tokens {
            SeedTokens::Inline { len, buf } => &buf[..*len as usize],
            SeedTokens::Heap(v) => v,
        }
    }

    /// True when the tokens are heap-allocated.
    pub fn is_large(&self) -> bool {
        matches!(self.tokens, SeedTokens::Heap(_))
    }

    /// Serialize to the chunk-file wire format: doc_id (u32 LE), pos (u32
    /// LE), n (i32 LE), is_large (u8), then n token IDs (u32 LE each).
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let tokens = self.tokens();
        out.write_u32::<LittleEndian>(self.doc_id)?;
        out.write_u32::<LittleEndian>(self.pos)?;
        out.write_i32::<LittleEndian>(tokens.len() as i32)?;
        out.write_u8(self.is_large() as u8)?;
        for &t in tokens {
            out.write_u32::<LittleEndian>(t)?;
        }
        Ok(())
    }

    /// Deserialize one record; `Ok(None)` on a clean end of stream.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Option<SeedRecord>> {
        let doc_id = match input.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let pos = input.read_u32::<LittleEndian>()?;
        let n = input.read_i32::<LittleEndian>()?;
        if n < 0 {
            return Err(MattockError::storage(format!(
                "Corrupt seed record: negative token count {n}"
            )));
        }
        let _is_large = input.read_u8()?;
        let mut tokens = vec![0u32; n as usize];
        for t in tokens.iter_mut() {
            *t = input.read_u32::<LittleEndian>()?;
        }
        Ok(Some(SeedRecord::new(doc_id, pos, &tokens)))
    }
}

impl PartialOrd for SeedRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SeedRecord {
    /// Lexicographic on tokens, then doc_id, then pos: the chunk sort order
    /// and the merge-heap order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.tokens()
            .cmp(other.tokens())
            .then(self.doc_id.cmp(&other.doc_id))
            .then(self.pos.cmp(&other.pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_storage_for_small_ngrams() {
        let record = SeedRecord::new(3, 7, &[1, 2, 3, 4]);
        assert!(!record.is_large());
        assert_eq!(record.tokens(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_heap_storage_for_large_ngrams() {
        let tokens: Vec<u32> = (0..20).collect();
        let record = SeedRecord::new(0, 0, &tokens);
        assert!(record.is_large());
        assert_eq!(record.tokens(), tokens.as_slice());
    }

    #[test]
    fn test_threshold_boundary() {
        let at = SeedRecord::new(0, 0, &[9; SMALL_NGRAM_THRESHOLD]);
        assert!(!at.is_large());
        let over = SeedRecord::new(0, 0, &[9; SMALL_NGRAM_THRESHOLD + 1]);
        assert!(over.is_large());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let records = vec![
            SeedRecord::new(1, 2, &[10, 20]),
            SeedRecord::new(3, 4, &(0..20).collect::<Vec<_>>()),
            SeedRecord::new(0, 0, &[42]),
        ];

        let mut buf = Vec::new();
        for r in &records {
            r.write_to(&mut buf).unwrap();
        }

        let mut cursor = io::Cursor::new(buf);
        let mut decoded = Vec::new();
        while let Some(r) = SeedRecord::read_from(&mut cursor).unwrap() {
            decoded.push(r);
        }
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_roundtrip_is_byte_identical() {
        let record = SeedRecord::new(7, 9, &[5, 6, 7]);
        let mut first = Vec::new();
        record.write_to(&mut first).unwrap();

        let reread = SeedRecord::read_from(&mut io::Cursor::new(&first))
            .unwrap()
            .unwrap();
        let mut second = Vec::new();
        reread.write_to(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ordering() {
        let a = SeedRecord::new(0, 5, &[1, 2]);
        let b = SeedRecord::new(1, 0, &[1, 2]);
        let c = SeedRecord::new(0, 0, &[1, 3]);
        assert!(a < b); // same tokens, smaller doc
        assert!(b < c); // token order dominates doc order
        let d = SeedRecord::new(0, 2, &[1, 2]);
        assert!(a > d); // same tokens and doc, position decides
    }
}
