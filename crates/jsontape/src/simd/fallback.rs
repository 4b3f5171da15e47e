//! Portable scalar backend.
//!
//! Processes the same 64-byte windows as the SIMD backends using plain byte
//! loops and a precomputed classification table, so the scanner logic stays
//! identical across backends. This is the only backend on architectures
//! without an accelerated path and the target of the
//! `JSONTAPE_IMPLEMENTATION=fallback` override.

use super::{
    bits, ChunkScanner, CLASSIFY_HI_NIBBLE, CLASSIFY_LO_NIBBLE, CLASS_STRUCTURAL, CLASS_WHITESPACE,
};

/// Byte class per input byte, folded from the two nibble tables.
static CLASS: [u8; 256] = build_class_table();

const fn build_class_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut b = 0usize;
    while b < 256 {
        table[b] = CLASSIFY_LO_NIBBLE[b & 0xF] & CLASSIFY_HI_NIBBLE[b >> 4];
        b += 1;
    }
    table
}

pub(crate) struct Fallback;

impl ChunkScanner for Fallback {
    type Chunk = [u8; 64];

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> [u8; 64] {
        ptr.cast::<[u8; 64]>().read_unaligned()
    }

    #[inline(always)]
    unsafe fn eq(chunk: [u8; 64], m: u8) -> u64 {
        let mut mask = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            mask |= u64::from(b == m) << i;
        }
        mask
    }

    #[inline(always)]
    unsafe fn lteq(chunk: [u8; 64], m: u8) -> u64 {
        let mut mask = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            mask |= u64::from(b <= m) << i;
        }
        mask
    }

    #[inline(always)]
    unsafe fn whitespace_and_structurals(chunk: [u8; 64]) -> (u64, u64) {
        let mut whitespace = 0u64;
        let mut structurals = 0u64;
        for (i, &b) in chunk.iter().enumerate() {
            let class = CLASS[b as usize];
            whitespace |= u64::from(class & CLASS_WHITESPACE != 0) << i;
            structurals |= u64::from(class & CLASS_STRUCTURAL != 0) << i;
        }
        (whitespace, structurals)
    }

    #[inline(always)]
    unsafe fn any_non_ascii(chunk: [u8; 64]) -> bool {
        chunk.iter().any(|&b| b >= 0x80)
    }

    #[inline(always)]
    unsafe fn prefix_xor(bits: u64) -> u64 {
        bits::prefix_xor_portable(bits)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkScanner, Fallback, CLASS};

    fn chunk_from(text: &[u8]) -> [u8; 64] {
        let mut chunk = [0x20u8; 64];
        chunk[..text.len()].copy_from_slice(text);
        chunk
    }

    #[test]
    fn classification_table_matches_the_json_sets() {
        for b in 0..=255u8 {
            let structural = matches!(b, b'{' | b'}' | b'[' | b']' | b':' | b',');
            let whitespace = matches!(b, b' ' | b'\t' | b'\n' | b'\r');
            assert_eq!(CLASS[b as usize] & 0x7 != 0, structural, "byte {b:#x}");
            assert_eq!(CLASS[b as usize] & 0x18 != 0, whitespace, "byte {b:#x}");
        }
    }

    #[test]
    fn eq_and_lteq_masks() {
        let chunk = chunk_from(b"a\"b\\\x01");
        unsafe {
            assert_eq!(Fallback::eq(chunk, b'"'), 1 << 1);
            assert_eq!(Fallback::eq(chunk, b'\\'), 1 << 3);
            assert_eq!(Fallback::lteq(chunk, 0x1F), 1 << 4);
        }
    }
}
