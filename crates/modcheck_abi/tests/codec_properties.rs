//! Property tests for the layout helpers.

use modcheck_abi::layout::{read_u32, write_u32};
use modcheck_abi::rtti::TypeFlags;
use modcheck_abi::strings::{decode_utf16, encode_utf16, utf16_len};
use proptest::prelude::*;

proptest! {
    /// Property: any Rust string survives a trip through module string encoding.
    #[test]
    fn utf16_round_trip(text in any::<String>()) {
        prop_assert_eq!(decode_utf16(&encode_utf16(&text)), text);
    }

    /// Property: encoded byte length is twice the code unit count.
    #[test]
    fn utf16_byte_length(text in any::<String>()) {
        prop_assert_eq!(encode_utf16(&text).len(), utf16_len(&text) * 2);
    }

    /// Property: a written word reads back unchanged at any in-bounds address.
    #[test]
    fn u32_word_round_trip(value in any::<u32>(), addr in 0u32..60) {
        let mut memory = vec![0u8; 64];
        write_u32(&mut memory, addr, value).unwrap();
        prop_assert_eq!(read_u32(&memory, addr).unwrap(), value);
    }

    /// Property: alignment decoding picks the single set alignment bit.
    #[test]
    fn alignment_matches_flag_bit(align in 0u32..5, other in any::<u32>()) {
        let flags = TypeFlags((other & !(0b11111 << 5)) | 1 << (5 + align));
        prop_assert_eq!(flags.value_align(), Some(align));
    }
}
