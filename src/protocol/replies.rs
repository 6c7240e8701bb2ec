//! Builders for resolution and notification lines

use super::Command;

/// Resolution state for a request that succeeded
pub const STATE_OK: &str = "0";

/// Resolution state for a request that failed
pub const STATE_FAILED: &str = "1";

/// Encoded JSON `null`, the value of resolutions without a result
pub const NULL_VALUE: &str = "null";

/// Resolution sent from a surface back to the main process
///
/// `value` must already be percent-encoded.
pub fn resolve_to_main(index: usize, seq: &str, state: &str, value: &str) -> String {
    Command::new("resolve")
        .with_index(index)
        .with_seq(seq)
        .with_field("state", state)
        .with_field("value", value)
        .encode()
}

/// Resolution handed to a surface through `eval`
pub fn resolve_to_surface(seq: &str, state: &str, value: &str) -> String {
    Command::new("resolve")
        .with_seq(seq)
        .with_field("state", state)
        .with_field("value", value)
        .encode()
}

/// Event notification handed to a surface through `eval`
pub fn emit_to_surface(event: &str, value: &str) -> String {
    Command::new("emit")
        .with_value("event", event)
        .with_field("value", value)
        .encode()
}
