//! Command line argument parsing for the Mattock CLI using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::mining::AlgorithmKind;

/// Mattock - a frequent contiguous phrase mining engine
#[derive(Parser, Debug, Clone)]
#[command(name = "mattock")]
#[command(about = "Mine frequent, closed, maximal word phrases from a text corpus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct MattockArgs {
    /// Directory to scan or CSV file to load
    #[arg(value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// Minimum number of distinct documents a phrase must appear in
    #[arg(long = "n", value_name = "MIN_DOCS", default_value_t = 10)]
    pub min_docs: usize,

    /// Seed n-gram width
    #[arg(long, default_value_t = 4)]
    pub ngrams: usize,

    /// Minimum token count for a reported phrase
    #[arg(long = "min-l", value_name = "MIN_LEN", default_value_t = 2)]
    pub min_len: usize,

    /// Memory ceiling in MiB (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    pub mem: usize,

    /// Parallel worker count for the frequency pass (0 = runtime default)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Maximum number of cached documents in disk mode
    #[arg(long, default_value_t = 1000)]
    pub cache: usize,

    /// Random subsample fraction of input documents, in (0, 1]
    #[arg(long, default_value_t = 1.0, value_parser = parse_sampling)]
    pub sampling: f64,

    /// Keep all documents in memory instead of the on-disk bin file
    #[arg(long = "in-mem")]
    pub in_mem: bool,

    /// In disk mode, populate the document cache during load
    #[arg(long)]
    pub preload: bool,

    /// File filter: *, *.<ext>, or an exact filename
    #[arg(long, default_value = "*")]
    pub mask: String,

    /// Field separator for CSV input (\t and \n are recognized)
    #[arg(long = "csv-delimiter", default_value = ",", value_parser = parse_delimiter)]
    pub csv_delimiter: char,

    /// Mining algorithm
    #[arg(long, value_enum, default_value = "bloomspan")]
    pub algo: AlgorithmKind,

    /// Result CSV path
    #[arg(long, default_value = "results_max.csv")]
    pub out: PathBuf,

    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,
}

impl MattockArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n + 1,
            }
        }
    }
}

fn parse_sampling(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("Not a number: {s}"))?;
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("Sampling must be in (0, 1], got {value}"))
    }
}

fn parse_delimiter(s: &str) -> Result<char, String> {
    match s {
        "\\t" => Ok('\t'),
        "\\n" => Ok('\n'),
        _ => s
            .chars()
            .next()
            .ok_or_else(|| "Delimiter must not be empty".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<MattockArgs, clap::Error> {
        MattockArgs::try_parse_from(std::iter::once("mattock").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["corpus_dir"]).unwrap();
        assert_eq!(args.min_docs, 10);
        assert_eq!(args.ngrams, 4);
        assert_eq!(args.min_len, 2);
        assert_eq!(args.mem, 0);
        assert_eq!(args.threads, 0);
        assert_eq!(args.cache, 1000);
        assert_eq!(args.sampling, 1.0);
        assert!(!args.in_mem);
        assert!(!args.preload);
        assert_eq!(args.mask, "*");
        assert_eq!(args.csv_delimiter, ',');
        assert_eq!(args.algo, AlgorithmKind::Bloomspan);
        assert_eq!(args.out, PathBuf::from("results_max.csv"));
    }

    #[test]
    fn test_full_flag_surface() {
        let args = parse(&[
            "data.csv",
            "--n",
            "3",
            "--ngrams",
            "2",
            "--min-l",
            "4",
            "--mem",
            "256",
            "--threads",
            "8",
            "--cache",
            "50",
            "--sampling",
            "0.5",
            "--in-mem",
            "--preload",
            "--mask",
            "*.txt",
            "--csv-delimiter",
            "\\t",
            "--algo",
            "clospan",
            "--out",
            "phrases.csv",
        ])
        .unwrap();
        assert_eq!(args.min_docs, 3);
        assert_eq!(args.ngrams, 2);
        assert_eq!(args.min_len, 4);
        assert_eq!(args.mem, 256);
        assert_eq!(args.threads, 8);
        assert_eq!(args.cache, 50);
        assert_eq!(args.sampling, 0.5);
        assert!(args.in_mem);
        assert!(args.preload);
        assert_eq!(args.mask, "*.txt");
        assert_eq!(args.csv_delimiter, '\t');
        assert_eq!(args.algo, AlgorithmKind::Clospan);
        assert_eq!(args.out, PathBuf::from("phrases.csv"));
    }

    #[test]
    fn test_missing_input_is_usage_error() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_unknown_algorithm_is_usage_error() {
        assert!(parse(&["dir", "--algo", "prefixspan"]).is_err());
    }

    #[test]
    fn test_sampling_bounds() {
        assert!(parse(&["dir", "--sampling", "0"]).is_err());
        assert!(parse(&["dir", "--sampling", "1.5"]).is_err());
        assert!(parse(&["dir", "--sampling", "1.0"]).is_ok());
    }

    #[test]
    fn test_delimiter_escapes() {
        assert_eq!(parse(&["d", "--csv-delimiter", "\\n"]).unwrap().csv_delimiter, '\n');
        assert_eq!(parse(&["d", "--csv-delimiter", ";"]).unwrap().csv_delimiter, ';');
    }

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(parse(&["d"]).unwrap().verbosity(), 1);
        assert_eq!(parse(&["d", "-v"]).unwrap().verbosity(), 2);
        assert_eq!(parse(&["d", "-vv"]).unwrap().verbosity(), 3);
        assert_eq!(parse(&["d", "-q", "-v"]).unwrap().verbosity(), 0);
    }
}
