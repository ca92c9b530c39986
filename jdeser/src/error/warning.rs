/*!
 Non-fatal problems found while decoding; the stream stays synchronized after any of these.
*/

use std::fmt::{Display, Formatter, Result};

/// Structural oddities that do not stop a decode session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// A class descriptor claims to be both serializable and externalizable
    FlagConflict(String),
    /// A construct that was consumed but whose meaning is not modelled, and the offset it started at
    UnsupportedConstruct(&'static str, usize),
}

impl Display for DecodeWarning {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            DecodeWarning::FlagConflict(class) => {
                write!(fmt, "{class}: serializable and externalizable flags conflict")
            }
            DecodeWarning::UnsupportedConstruct(construct, offset) => {
                write!(fmt, "Passed over {construct} at offset {offset:#x}")
            }
        }
    }
}
