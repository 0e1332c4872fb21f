//! 128-bit integers stored as two little-endian 64-bit words `[lo, hi]`

const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

/// Interprets `hi << 64 | lo` as a two's-complement signed 128-bit value.
pub fn i128_from_words(lo: u64, hi: u64) -> i128 {
    (((hi as u128) << 64) | lo as u128) as i128
}

/// Splits a signed 128-bit value into `(lo, hi)` words.
pub fn words_from_i128(value: i128) -> (u64, u64) {
    let bits = value as u128;
    (bits as u64, (bits >> 64) as u64)
}

/// True when bit 63 of the high word is set.
pub fn is_negative_words(hi: u64) -> bool {
    hi & SIGN_BIT != 0
}
