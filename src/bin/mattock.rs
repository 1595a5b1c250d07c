//! Mattock CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use mattock::cli::args::MattockArgs;
use mattock::cli::commands::execute_command;

fn main() {
    let args = match MattockArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too; only real usage mistakes
            // exit non-zero.
            let is_usage_error = e.use_stderr();
            let _ = e.print();
            process::exit(if is_usage_error { 1 } else { 0 });
        }
    };

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error, // Quiet mode
        1 => LevelFilter::Info,  // Default
        2 => LevelFilter::Info,  // Verbose
        _ => LevelFilter::Debug, // Very verbose (3+)
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
