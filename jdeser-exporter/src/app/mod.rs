pub mod error;
pub mod logging;
pub mod options;
pub mod runtime;
