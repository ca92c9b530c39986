/*!
 Sends log records from the decoder and the application to stderr.
*/

use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

use crate::app::error::RuntimeError;

const STDERR_APPENDER: &str = "stderr";
const LOG_PATTERN: &str = "[{h({l:<5})} {t}] {m}{n}";

/// Pick the most verbose level that should reach the console
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

/// Install a console logger; stdout is left alone so exported data can be piped
pub fn init_logging(verbose: bool) -> Result<(), RuntimeError> {
    let level = level_for(verbose);

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build(STDERR_APPENDER, Box::new(stderr)),
        )
        .build(Root::builder().appender(STDERR_APPENDER).build(level))
        .map_err(|why| RuntimeError::LoggerError(why.to_string()))?;

    log4rs::init_config(config).map_err(|why| RuntimeError::LoggerError(why.to_string()))?;
    Ok(())
}
