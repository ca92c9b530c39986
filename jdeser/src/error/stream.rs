/*!
 Errors that can happen when decoding Java object serialization streams.
*/

use std::{
    error::Error,
    fmt::{Display, Formatter, Result},
};

use crate::stream::handles::Handle;

/// Errors that abort a decode session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JavaStreamError {
    /// The stream does not start with the expected magic number and version.
    /// The version is only present if the magic number matched.
    HeaderError(u16, Option<u16>),
    /// A byte that is not valid at this position in the grammar, and the offset it was found at
    UnexpectedTag(u8, usize),
    /// A back-reference outside of the assigned handle range, and the size of the table
    UnknownHandle(Handle, usize),
    /// The stream ended early; the offset we needed to reach, and the length of the stream
    TruncatedStream(usize, usize),
    /// Text data that is not valid modified UTF-8, starting at the given offset
    InvalidUtf(usize),
    /// A field descriptor type code that is not one of the known signatures
    InvalidTypeCode(u8, usize),
    /// A negative or otherwise unusable length prefix
    InvalidLength(i64, usize),
    /// A back-reference to an entity of the wrong kind, or to a class descriptor still being read
    InvalidReference(Handle, &'static str),
    /// An array whose class name does not describe an array type
    InvalidArrayClass(String),
    /// An externalizable class that wrote unframed data we cannot skip over
    ExternalContents(String),
    /// The content nesting is deeper than the configured limit
    DepthLimitExceeded(usize),
    /// A previous error left the handle table in an indeterminate state
    SessionAborted,
}

impl Display for JavaStreamError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            JavaStreamError::HeaderError(magic, None) => {
                write!(fmt, "Invalid stream header: magic {magic:#06x}!")
            }
            JavaStreamError::HeaderError(magic, Some(version)) => {
                write!(
                    fmt,
                    "Invalid stream header: magic {magic:#06x}, version {version:#06x}!"
                )
            }
            JavaStreamError::UnexpectedTag(tag, offset) => {
                write!(fmt, "Unexpected type tag {tag:#04x} at offset {offset:#x}")
            }
            JavaStreamError::UnknownHandle(handle, len) => {
                write!(fmt, "Handle {handle} is outside of a table with {len} entries!")
            }
            JavaStreamError::TruncatedStream(idx, len) => {
                write!(fmt, "Index {idx:x} is outside of range {len:x}!")
            }
            JavaStreamError::InvalidUtf(offset) => {
                write!(fmt, "Malformed modified UTF-8 at offset {offset:#x}")
            }
            JavaStreamError::InvalidTypeCode(code, offset) => {
                write!(fmt, "Invalid field type code {code:#04x} at offset {offset:#x}")
            }
            JavaStreamError::InvalidLength(len, offset) => {
                write!(fmt, "Invalid length {len} at offset {offset:#x}")
            }
            JavaStreamError::InvalidReference(handle, expected) => {
                write!(fmt, "Handle {handle} does not refer to a usable {expected}")
            }
            JavaStreamError::InvalidArrayClass(name) => {
                write!(fmt, "Class {name} does not describe an array")
            }
            JavaStreamError::ExternalContents(name) => {
                write!(fmt, "Class {name} wrote unframed external data")
            }
            JavaStreamError::DepthLimitExceeded(limit) => {
                write!(fmt, "Content nesting exceeds the limit of {limit}")
            }
            JavaStreamError::SessionAborted => {
                write!(fmt, "Decode session was aborted by an earlier error")
            }
        }
    }
}

impl Error for JavaStreamError {}
