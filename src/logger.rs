//! Methods specific to the bgsv logger
//!

use camino::Utf8Path;

use crate::globals::PROGRAM_NAME;
use crate::os_utils::create_dir_all;

/// If debug is true set the default logger to the more verbose debug level
///
fn setup_logger(store_dir: Option<&Utf8Path>, debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let logger = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    let logger = if let Some(store_dir) = store_dir {
        let log_filename = store_dir.join(PROGRAM_NAME.to_string() + ".log");
        logger.chain(fern::log_file(log_filename)?)
    } else {
        logger
    };

    logger.apply()?;
    Ok(())
}

/// Create the store directory if needed, then setup logger to append to a log file there
///
/// #Arguments
/// * `debug` - If true use debug log level, and info level otherwise
///
pub fn setup_store_dir_and_logger(store_dir: &Utf8Path, debug: bool) {
    // No logger is setup yet, so match the pre-logging error pattern of the command-line
    // settings validation
    if let Err(msg) = create_dir_all(store_dir, "store") {
        eprintln!("Invalid command-line setting: {}", msg);
        std::process::exit(exitcode::USAGE);
    }
    if let Err(e) = setup_logger(Some(store_dir), debug) {
        eprintln!("Unable to setup logger: {}", e);
        std::process::exit(exitcode::CANTCREAT);
    }
}
