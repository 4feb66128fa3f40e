// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversions of raw register bytes

use byteorder::{BigEndian, ByteOrder as _};

use crate::frame::Word;

/// Split raw register bytes into big-endian words.
///
/// A trailing odd byte is ignored.
#[must_use]
pub fn words_from_bytes(bytes: &[u8]) -> Vec<Word> {
    bytes.chunks_exact(2).map(BigEndian::read_u16).collect()
}

/// Combine two registers into a `u32`, high word first.
#[must_use]
pub fn u32_from_words(high: Word, low: Word) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

/// Combine two registers into an IEEE 754 `f32`, high word first.
#[must_use]
pub fn f32_from_words(high: Word, low: Word) -> f32 {
    f32::from_bits(u32_from_words(high, low))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_words() {
        assert_eq!(words_from_bytes(&[0x00, 0x64, 0xAB, 0xCD]), [100, 0xABCD]);
        assert_eq!(words_from_bytes(&[0x12, 0x34, 0x56]), [0x1234]);
        assert!(words_from_bytes(&[]).is_empty());
    }

    #[test]
    fn combine_words() {
        assert_eq!(u32_from_words(0x1234, 0x5678), 0x1234_5678);
        assert_eq!(f32_from_words(0x3F80, 0x0000), 1.0);
        assert_eq!(f32_from_words(0xC2C8, 0x0000), -100.0);
    }
}
