/*!
Errors that can happen during the application's runtime
*/

use std::{
    fmt::{Display, Formatter, Result},
    io::Error as IoError,
    path::PathBuf,
};

use jdeser::error::stream::JavaStreamError;

/// Errors that can happen during the application's runtime
#[derive(Debug)]
pub enum RuntimeError {
    InvalidOptions(String),
    CreateError(IoError, PathBuf),
    ReadError(IoError, PathBuf),
    DiskError(IoError),
    LoggerError(String),
    StreamError(JavaStreamError, PathBuf),
    JsonError(json::Error),
}

impl Display for RuntimeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            RuntimeError::InvalidOptions(why) => write!(fmt, "Invalid options!\n{why}"),
            RuntimeError::CreateError(why, path) => write!(fmt, "{why}: {path:?}"),
            RuntimeError::ReadError(why, path) => write!(fmt, "Unable to read {path:?}: {why}"),
            RuntimeError::DiskError(why) => write!(fmt, "{why}"),
            RuntimeError::LoggerError(why) => write!(fmt, "Unable to set up logging: {why}"),
            RuntimeError::StreamError(why, path) => write!(fmt, "{path:?}: {why}"),
            RuntimeError::JsonError(why) => write!(fmt, "Unable to build JSON: {why}"),
        }
    }
}
