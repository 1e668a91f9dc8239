use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Sends log output to stderr with local timestamps, keeping stdout for the
/// summary. `verbose` lowers the level from info to debug.
pub fn init_logging(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut builder = ConfigBuilder::new();
    builder
        .set_target_level(LevelFilter::Off)
        .set_thread_level(LevelFilter::Off)
        .set_time_format_rfc3339();
    // Falls back to UTC when the offset cannot be read (multi-threaded Unix)
    let _ = builder.set_time_offset_to_local();

    TermLogger::init(level, builder.build(), TerminalMode::Stderr, ColorChoice::Auto)
}
