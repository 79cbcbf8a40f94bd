//! String codec.
//!
//! Module strings are UTF-16LE code units; the object's `rtSize` header word holds the byte length.
//! Lengths reported by the module (for example a `strlen` export) therefore count UTF-16 code units,
//! not Rust `char`s or UTF-8 bytes.

use crate::layout::{MemoryError, object_size, slice};

/// Encode `text` as UTF-16LE bytes.
pub fn encode_utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Decode UTF-16LE bytes; unpaired surrogates become U+FFFD and a trailing odd byte is ignored.
pub fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Read the string object at `ptr`.
pub fn read_string(memory: &[u8], ptr: u32) -> Result<String, MemoryError> {
    let size = object_size(memory, ptr)?;
    Ok(decode_utf16(slice(memory, ptr, size & !1)?))
}
