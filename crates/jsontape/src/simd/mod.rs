//! Per-architecture 64-byte chunk primitives and one-time backend selection.
//!
//! The structural scanner is generic over [`ChunkScanner`]; each backend
//! module provides the chunk representation and the handful of mask
//! operations the scanner needs. A [`Implementation`] record bundles the
//! monomorphized scanner entry point with its availability predicate; the
//! parser picks one record at construction (CPUID, overridable through the
//! `JSONTAPE_IMPLEMENTATION` environment variable) and dispatches through it
//! for the rest of its life.

pub(crate) mod bits;
pub(crate) mod fallback;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) mod avx2;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) mod sse42;

use std::sync::OnceLock;

use crate::error::Result;
use crate::stage1::{ScanMode, ScanSummary};

/// Nibble lookup for whitespace/structural classification, low-nibble side.
///
/// `LO[b & 0xF] & HI[b >> 4]` yields `1`/`2`/`4` for `{}[]`, `,`, `:` and
/// `8`/`16` for the four JSON whitespace bytes; see the mask constants below.
pub(crate) const CLASSIFY_LO_NIBBLE: [u8; 16] =
    [16, 0, 0, 0, 0, 0, 0, 0, 0, 8, 12, 1, 2, 9, 0, 0];

/// High-nibble side of the classification lookup.
pub(crate) const CLASSIFY_HI_NIBBLE: [u8; 16] =
    [8, 0, 18, 4, 0, 1, 0, 1, 0, 0, 0, 3, 2, 1, 0, 0];

/// Classification bits naming the structural set `{ } [ ] : ,`.
pub(crate) const CLASS_STRUCTURAL: u8 = 0x7;

/// Classification bits naming the whitespace set `0x20 0x09 0x0A 0x0D`.
pub(crate) const CLASS_WHITESPACE: u8 = 0x18;

/// The operations the stage-1 scanner needs over one 64-byte chunk.
///
/// Implementations are zero-sized tag types; the chunk representation is an
/// associated type (four SSE lanes, two AVX2 lanes, or a plain byte array).
/// Every method is `unsafe` because the SIMD backends require their target
/// feature to be enabled in the calling context; the scanner entry points
/// carry the matching `#[target_feature]` attributes.
pub(crate) trait ChunkScanner {
    type Chunk: Copy;

    /// Loads 64 bytes starting at `ptr`. The caller guarantees readability.
    unsafe fn load(ptr: *const u8) -> Self::Chunk;

    /// Bit `i` of the result is set iff byte `i` equals `m`.
    unsafe fn eq(chunk: Self::Chunk, m: u8) -> u64;

    /// Bit `i` of the result is set iff byte `i` is `<= m` (unsigned).
    unsafe fn lteq(chunk: Self::Chunk, m: u8) -> u64;

    /// `(whitespace, structural)` bitmaps via the nibble lookups.
    unsafe fn whitespace_and_structurals(chunk: Self::Chunk) -> (u64, u64);

    /// True iff any byte has its high bit set.
    unsafe fn any_non_ascii(chunk: Self::Chunk) -> bool;

    /// Prefix-XOR used to build the in-string mask from quote bits.
    unsafe fn prefix_xor(bits: u64) -> u64;
}

/// A selected backend: name, availability predicate, and the monomorphized
/// stage-1 entry point.
pub(crate) struct Implementation {
    pub(crate) name: &'static str,
    pub(crate) available: fn() -> bool,
    /// # Safety
    /// `buf` must have at least `len + PADDING` readable bytes.
    pub(crate) stage1:
        unsafe fn(buf: &[u8], len: usize, indexes: &mut Vec<u32>, mode: ScanMode) -> Result<ScanSummary>,
}

pub(crate) static FALLBACK: Implementation = Implementation {
    name: "fallback",
    available: || true,
    stage1: crate::stage1::find_structural_bits_fallback,
};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) static SSE42: Implementation = Implementation {
    name: "sse42",
    available: || {
        is_x86_feature_detected!("sse4.2")
            && std::arch::is_x86_feature_detected!("ssse3")
            && std::arch::is_x86_feature_detected!("pclmulqdq")
    },
    stage1: crate::stage1::find_structural_bits_sse42,
};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) static AVX2: Implementation = Implementation {
    name: "avx2",
    available: || {
        is_x86_feature_detected!("avx2")
            && std::arch::is_x86_feature_detected!("pclmulqdq")
    },
    stage1: crate::stage1::find_structural_bits_avx2,
};

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
static CANDIDATES: [&Implementation; 3] = [&AVX2, &SSE42, &FALLBACK];

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
static CANDIDATES: [&Implementation; 1] = [&FALLBACK];

fn candidates() -> &'static [&'static Implementation] {
    &CANDIDATES
}

fn by_name(name: &str) -> Option<&'static Implementation> {
    candidates().iter().copied().find(|imp| imp.name == name)
}

/// Picks the best usable backend once per process.
///
/// `JSONTAPE_IMPLEMENTATION=avx2|sse42|fallback` forces a choice when that
/// backend is usable on the running CPU; unknown or unusable names fall back
/// to detection.
pub(crate) fn active_implementation() -> &'static Implementation {
    static CHOSEN: OnceLock<&'static Implementation> = OnceLock::new();
    CHOSEN.get_or_init(|| {
        if let Ok(name) = std::env::var("JSONTAPE_IMPLEMENTATION") {
            if let Some(imp) = by_name(name.trim()) {
                if (imp.available)() {
                    return imp;
                }
            }
        }
        *candidates()
            .iter()
            .find(|imp| (imp.available)())
            .expect("the fallback backend is always available")
    })
}

#[cfg(test)]
mod tests {
    use super::{active_implementation, candidates};

    #[test]
    fn detection_yields_a_usable_backend() {
        let imp = active_implementation();
        assert!((imp.available)());
        assert!(candidates().iter().any(|c| c.name == imp.name));
    }
}
