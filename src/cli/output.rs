//! Result CSV writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ahash::AHashSet;
use log::info;

use crate::corpus::CorpusStore;
use crate::error::{MattockError, Result};
use crate::types::Phrase;

/// Write mined phrases as CSV: `phrase,freq,length,example_files`.
///
/// The phrase is the space-joined words in quotes, followed by its support,
/// its token count, and up to two representative source paths separated by a
/// pipe.
pub fn write_results_csv(store: &CorpusStore, phrases: &[Phrase], path: &Path) -> Result<()> {
    info!("Saving {} phrases to {}", phrases.len(), path.display());

    let file = File::create(path).map_err(|e| {
        MattockError::storage(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut out = BufWriter::new(file);
    writeln!(out, "phrase,freq,length,example_files")?;

    for phrase in phrases {
        let words: Vec<&str> = phrase
            .tokens
            .iter()
            .filter_map(|&t| store.id_to_word(t))
            .collect();

        let mut seen: AHashSet<u32> = AHashSet::new();
        let mut examples: Vec<&str> = Vec::new();
        for o in &phrase.occs {
            if seen.insert(o.doc_id) {
                if let Some(source) = store.source_path(o.doc_id) {
                    examples.push(source);
                }
                if examples.len() >= 2 {
                    break;
                }
            }
        }

        writeln!(
            out,
            "\"{}\",{},{},\"{}\"",
            words.join(" "),
            phrase.support,
            phrase.tokens.len(),
            examples.join("|")
        )?;
    }

    out.flush()?;
    Ok(())
}
