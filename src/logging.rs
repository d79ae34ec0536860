//! Logger setup for the cobs CLI.

use std::io::Write;
use std::time::Instant;

/// Initialize stderr logging for the process.
///
/// Verbose mode enables Info; otherwise only warnings surface. Each line
/// is stamped with the seconds elapsed since startup, which is the
/// useful clock while a long construction is running. Query results and
/// command output go to stdout and are never routed through here.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    let start = Instant::now();
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format(move |buf, record| {
            writeln!(
                buf,
                "[{:9.3}s] {}: {}",
                start.elapsed().as_secs_f64(),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}
