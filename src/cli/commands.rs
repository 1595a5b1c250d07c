//! Command implementation for the Mattock CLI.

use std::path::PathBuf;

use log::{info, warn};

use crate::cancel::CancelFlag;
use crate::cli::args::MattockArgs;
use crate::cli::output::write_results_csv;
use crate::corpus::{CorpusLoader, LoaderConfig};
use crate::error::Result;
use crate::mining::bloom::BloomMinerConfig;
use crate::mining::create_algorithm;
use crate::types::MiningParams;

/// Run a full mining session: load the corpus, mine, persist the results.
///
/// A SIGINT during mining flips the cancellation flag; the running pass
/// returns its partial results and they are saved like a normal run.
pub fn execute_command(args: MattockArgs) -> Result<()> {
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, finishing current phrase and saving...");
        handler_flag.request_stop();
    }) {
        warn!("Could not install SIGINT handler: {e}");
    }

    info!("Initializing miner...");
    if args.in_mem {
        info!("Running in in-memory mode (no disk bin file)");
    }

    let loader = CorpusLoader::new(LoaderConfig {
        in_memory: args.in_mem,
        preload: args.preload,
        sampling: args.sampling,
        file_mask: args.mask.clone(),
        csv_delimiter: args.csv_delimiter,
        cache_capacity: args.cache,
        bin_path: PathBuf::from("corpus_data.bin"),
    });
    let corpus = loader.load(&args.input)?;

    let params = MiningParams {
        min_docs: args.min_docs,
        ngrams: args.ngrams,
        min_len: args.min_len,
    };
    let algorithm = create_algorithm(
        args.algo,
        BloomMinerConfig {
            memory_limit_mb: args.mem,
            threads: args.threads,
            temp_dir: PathBuf::from("./miner_tmp"),
        },
        cancel,
    );

    info!(
        "Mining with algorithm={}, min_docs={}, ngrams={}",
        algorithm.name(),
        params.min_docs,
        params.ngrams
    );
    let phrases = algorithm.mine(&corpus, &params)?;

    write_results_csv(&corpus, &phrases, &args.out)?;
    info!("Process finished.");
    Ok(())
}
