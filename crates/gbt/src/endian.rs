//! Byte-order helpers for the 32-bit-word header layout.
//!
//! Headers are kept as big-endian 32-bit words internally and flipped to
//! the wire order right before hashing or submission.

use super::*;

fn flip_words(dest: &mut [u8], src: &[u8], words: usize) {
    for (d, s) in dest[..words * 4]
        .chunks_exact_mut(4)
        .zip(src[..words * 4].chunks_exact(4))
    {
        LittleEndian::write_u32(d, BigEndian::read_u32(s));
    }
}

/// Byte-swaps each of the eight 32-bit words.
pub fn flip32(src: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    flip_words(&mut out, src, 8);
    out
}

/// Byte-swaps each of the twenty 32-bit words of a block header.
pub fn flip80(src: &[u8]) -> [u8; 80] {
    let mut out = [0u8; 80];
    flip_words(&mut out, src, 20);
    out
}

pub fn flip128(src: &[u8]) -> [u8; 128] {
    let mut out = [0u8; 128];
    flip_words(&mut out, src, 32);
    out
}

pub fn flip168(src: &[u8]) -> [u8; 168] {
    let mut out = [0u8; 168];
    flip_words(&mut out, src, 42);
    out
}

/// Byte-swaps the first 180 bytes; the tail of a 192 byte buffer is
/// copied through untouched.
pub fn flip180(src: &[u8]) -> [u8; 192] {
    let mut out = [0u8; 192];
    flip_words(&mut out, src, 45);
    out[180..].copy_from_slice(&src[180..192]);
    out
}

/// Reverses the order of the eight 32-bit words, leaving the bytes of each
/// word in place.
pub fn swap256(src: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, word) in src.chunks_exact(4).enumerate() {
        let j = 7 - i;
        out[j * 4..j * 4 + 4].copy_from_slice(word);
    }
    out
}

/// Full 256-bit reversal: word order reversed and every word byte-swapped.
pub fn swab256(src: &[u8; 32]) -> [u8; 32] {
    let mut out = *src;
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        bytes
    }

    #[test]
    fn swap256_reverses_words_only() {
        let swapped = swap256(&counting());
        assert_eq!(&swapped[..4], &[28, 29, 30, 31]);
        assert_eq!(&swapped[28..], &[0, 1, 2, 3]);
    }

    #[test]
    fn swab256_reverses_bytes() {
        let swabbed = swab256(&counting());
        assert_eq!(swabbed[0], 31);
        assert_eq!(swabbed[31], 0);
    }

    #[test]
    fn swab256_is_swap256_then_flip32() {
        assert_eq!(flip32(&swap256(&counting())), swab256(&counting()));
    }

    #[test]
    fn flip32_swaps_within_words() {
        let flipped = flip32(&counting());
        assert_eq!(&flipped[..8], &[3, 2, 1, 0, 7, 6, 5, 4]);
        assert_eq!(flip32(&flipped), counting());
    }

    #[test]
    fn flip180_keeps_tail() {
        let mut data = [0u8; 192];
        data[0] = 1;
        data[191] = 9;
        let flipped = flip180(&data);
        assert_eq!(flipped[3], 1);
        assert_eq!(flipped[191], 9);
    }
}
