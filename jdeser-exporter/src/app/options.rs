use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, ArgMatches, Command,
};

use jdeser::stream::parser::{DecoderOptions, DEFAULT_MAX_DEPTH};

use crate::app::error::RuntimeError;

/// Option constants
pub const OPTION_INPUTS: &str = "inputs";
pub const OPTION_DIAGNOSTIC: &str = "diagnostics";
pub const OPTION_EXPORT_TYPE: &str = "format";
pub const OPTION_EXPORT_PATH: &str = "export-path";
pub const OPTION_MAX_DEPTH: &str = "max-depth";
pub const OPTION_VERBOSE: &str = "verbose";

// Other CLI Text
pub const SUPPORTED_FILE_TYPES: &str = "txt, ndjson";
pub const ABOUT: &str = concat!(
    "The `jdeser-exporter` binary decodes Java serialization streams without loading any classes\n",
    "and renders the objects they contain as an indented text tree or as newline-delimited JSON.\n",
    "Diagnostics summarize the handles and warnings of each stream instead."
);

/// Output formats the exporter can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
    /// Indented text tree
    Txt,
    /// One JSON document per line
    NdJson,
}

impl ExportType {
    /// Given user input, return the matching export type, if any
    pub fn from_cli(platform: &str) -> Option<Self> {
        match platform.to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "ndjson" => Some(Self::NdJson),
            _ => None,
        }
    }
}

impl Display for ExportType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExportType::Txt => write!(fmt, "txt"),
            ExportType::NdJson => write!(fmt, "ndjson"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Serialized streams to decode, in the order given
    pub inputs: Vec<PathBuf>,
    /// If true, print a summary of each stream instead of its contents
    pub diagnostic: bool,
    /// The format to render decoded streams as
    pub export_type: ExportType,
    /// Where to write the export; stdout if unset
    pub export_path: Option<PathBuf>,
    /// How deeply contents and superclass chains may nest before a stream is rejected
    pub max_depth: usize,
    /// If true, emit the decoder's debug logs
    pub verbose: bool,
}

impl Options {
    pub fn from_args(args: &ArgMatches) -> Result<Self, RuntimeError> {
        let inputs: Vec<PathBuf> = args
            .get_many::<String>(OPTION_INPUTS)
            .map(|values| values.map(PathBuf::from).collect())
            .unwrap_or_default();
        let diagnostic = args.get_flag(OPTION_DIAGNOSTIC);
        let user_export_type: Option<&String> = args.get_one(OPTION_EXPORT_TYPE);
        let user_export_path: Option<&String> = args.get_one(OPTION_EXPORT_PATH);
        let max_depth = args
            .get_one::<usize>(OPTION_MAX_DEPTH)
            .copied()
            .unwrap_or(DEFAULT_MAX_DEPTH);
        let verbose = args.get_flag(OPTION_VERBOSE);

        // Ensure an export type is specified if other export options are selected
        if diagnostic && user_export_type.is_some() {
            return Err(RuntimeError::InvalidOptions(format!(
                "Diagnostics are enabled; --{OPTION_EXPORT_TYPE} is disallowed"
            )));
        }
        if diagnostic && user_export_path.is_some() {
            return Err(RuntimeError::InvalidOptions(format!(
                "Diagnostics are enabled; --{OPTION_EXPORT_PATH} is disallowed"
            )));
        }
        if max_depth == 0 {
            return Err(RuntimeError::InvalidOptions(format!(
                "--{OPTION_MAX_DEPTH} must be at least 1"
            )));
        }

        // Ensure that if we want to export, the format is valid
        let export_type = match user_export_type {
            Some(export_type) => ExportType::from_cli(export_type).ok_or_else(|| {
                RuntimeError::InvalidOptions(format!(
                    "{export_type} is not a valid export type! Must be one of <{SUPPORTED_FILE_TYPES}>"
                ))
            })?,
            None => ExportType::Txt,
        };

        Ok(Options {
            inputs,
            diagnostic,
            export_type,
            export_path: user_export_path.map(PathBuf::from),
            max_depth,
            verbose,
        })
    }

    /// Settings for each decode session
    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            max_depth: self.max_depth,
        }
    }
}

/// Build the command line argument parser
fn get_command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(ABOUT)
        .long_about(crate_description!())
        .arg_required_else_help(true)
        .arg(
            Arg::new(OPTION_INPUTS)
                .help("Paths to serialized streams, as written by `java.io.ObjectOutputStream`")
                .value_name("PATH")
                .num_args(1..)
                .required(true)
                .display_order(0),
        )
        .arg(
            Arg::new(OPTION_DIAGNOSTIC)
                .short('d')
                .long(OPTION_DIAGNOSTIC)
                .help("Print a summary of the handles and warnings of each stream\nIf provided, --format and --export-path are disallowed\n")
                .action(ArgAction::SetTrue)
                .display_order(1),
        )
        .arg(
            Arg::new(OPTION_EXPORT_TYPE)
                .short('f')
                .long(OPTION_EXPORT_TYPE)
                .help("Specify a single file format to export decoded streams into\n")
                .display_order(2)
                .value_name(SUPPORTED_FILE_TYPES),
        )
        .arg(
            Arg::new(OPTION_EXPORT_PATH)
                .short('o')
                .long(OPTION_EXPORT_PATH)
                .help("Specify a file to write the export to\nIf omitted, the export is written to stdout\n")
                .display_order(3)
                .value_name("path/to/export.txt"),
        )
        .arg(
            Arg::new(OPTION_MAX_DEPTH)
                .long(OPTION_MAX_DEPTH)
                .help(format!("How deeply contents and superclass chains may nest before a stream is rejected\nIf omitted, the default is {DEFAULT_MAX_DEPTH}\n"))
                .value_parser(value_parser!(usize))
                .display_order(4)
                .value_name("depth"),
        )
        .arg(
            Arg::new(OPTION_VERBOSE)
                .short('v')
                .long(OPTION_VERBOSE)
                .help("Log descriptor and handle activity to stderr\n")
                .action(ArgAction::SetTrue)
                .display_order(5),
        )
}

/// Parse arguments from the command line
pub fn from_command_line() -> ArgMatches {
    get_command().get_matches()
}
