//! Log setup for the resolve run
//!

use camino::Utf8Path;

use crate::cli;
use crate::globals::PROGRAM_NAME;

fn get_log_level(debug: bool) -> log::LevelFilter {
    if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Log to stderr, and also to a log file in `output_dir` if provided
///
fn setup_logger(output_dir: Option<&Utf8Path>, debug: bool) -> Result<(), fern::InitError> {
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
        .level(get_log_level(debug))
        .chain(std::io::stderr());

    let logger = match output_dir {
        Some(dir) => logger.chain(fern::log_file(dir.join(format!("{PROGRAM_NAME}.log")))?),
        None => logger,
    };

    logger.apply()?;
    Ok(())
}

/// Create the output directory if it does not exist already
///
fn create_output_dir(dir: &Utf8Path) {
    if !dir.is_dir()
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        panic!("Can't create new output directory at '{dir}': {e}");
    }
}

/// Check and create output directory, then setup logger to write there
///
/// An existing output directory is only accepted when `clobber` is set.
///
pub fn setup_output_dir_and_logger(output_dir: &Utf8Path, clobber: bool, debug: bool) {
    // No logger is available yet, so errors follow the command-line validation pattern
    if let Err(msg) = cli::check_novel_dirname(output_dir, "Output directory")
        && !(clobber && output_dir.is_dir())
    {
        eprintln!("Invalid command-line setting: {msg}");
        std::process::exit(exitcode::USAGE);
    }
    create_output_dir(output_dir);
    setup_logger(Some(output_dir), debug).unwrap();
}
