/*!
 Errors and warnings that can happen while decoding serialization streams.
*/

pub mod stream;
pub mod warning;
