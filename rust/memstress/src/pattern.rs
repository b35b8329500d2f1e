/// Letters cycled through to stamp successive blocks.
pub const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Byte stamped across the block at `index`.
#[inline]
pub fn fill_byte(index: usize) -> u8 {
    ALPHABET[index % ALPHABET.len()]
}
