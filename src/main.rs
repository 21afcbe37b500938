mod bg_db;
mod cli;
mod cluster_svs;
mod globals;
mod int_range;
mod job;
mod logger;
mod os_utils;
mod run_stats;
mod source_feed;
mod sv_overlap;
mod sv_record;
mod ucsc_bin;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::bg_db::{run_build, run_cleanup};
use crate::cli::Commands;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_store_dir_and_logger;

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Build(x) => {
            run_build(x)?;
        }
        Commands::Cleanup(x) => {
            run_cleanup(x)?;
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the store directory for the log file:
    setup_store_dir_and_logger(settings.get_store_dir(), settings.shared.debug);

    if let Err(err) = run(&settings) {
        eprintln!("{err}");
        process::exit(2);
    }
}
