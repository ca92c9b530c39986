#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]
mod app;
mod exporters;

pub use exporters::{exporter::Exporter, ndjson::NDJSON, txt::TXT};

use std::process::ExitCode;

use app::{
    logging::init_logging,
    options::{from_command_line, Options},
    runtime::Config,
};

fn main() -> ExitCode {
    // Get args from command line
    let args = from_command_line();
    // Create application options
    let options = match Options::from_args(&args) {
        Ok(options) => options,
        Err(why) => {
            eprintln!("{why}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(why) = init_logging(options.verbose) {
        eprintln!("Unable to launch: {why}");
        return ExitCode::FAILURE;
    }

    // Create app state and start
    match Config::new(options).and_then(|app| app.start()) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("{failed} source(s) could not be fully decoded");
            ExitCode::FAILURE
        }
        Err(why) => {
            eprintln!("Unable to export: {why}");
            ExitCode::FAILURE
        }
    }
}
