//! Byte-size estimation for serialized payloads.

/// Returns the footprint of a serialized payload in bytes.
///
/// This is the UTF-8 length, the same figure a browser Blob would report.
/// It is used for entries and for the index record alike.
pub fn estimate_size(serialized: &str) -> u64 {
    serialized.len() as u64
}
