/*!
 Contains logic and data structures used to decode Java object serialization streams into native Rust data structures.

 ## Overview

 The stream format is the binary protocol written by `java.io.ObjectOutputStream`. It is self-describing:
 class layouts are embedded in the stream the first time a class is used, and every class descriptor,
 string, object, and array after that is only referred to by a handle.

 ## Features

 - Pure Rust implementation that never loads or executes class code
 - Reconstructs class hierarchies, field values, arrays, enums, and back-references
 - Robust error handling for malformed, truncated, or hostile streams
*/

mod class_desc;
mod fields;
pub mod handles;
pub mod models;
pub mod parser;
pub mod reader;
pub mod tags;
mod tests;
