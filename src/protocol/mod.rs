//! Line protocol shared by the shell, the main process and the render surfaces
//!
//! One command per line: `<name> [<index>] [seq=<id>] <key>=<value>&<key>=<value>...`.
//! Field values travel percent-encoded and are only decoded by the layer that
//! consumes them, so forwarding layers never re-encode anything.

mod codec;
pub mod replies;
pub mod verbs;

pub use codec::{decode, encode, Command, Fields};
pub use verbs::{DialogOptions, MainVerb, NumericField, SurfaceVerb};

/// Percent-encode a value for use in a command field
pub fn encode_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Percent-decode a field value
///
/// Values that do not decode to valid UTF-8 are returned unchanged.
pub fn decode_value(value: &str) -> String {
    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}
