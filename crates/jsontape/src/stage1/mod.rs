//! Stage 1: structural discovery.
//!
//! Walks the padded input in 64-byte windows and produces the ordered stream
//! of byte offsets at which stage 2 (or the on-demand iterator) will find
//! structural characters and value starts, together with a UTF-8 verdict.
//!
//! Four carry words survive between windows: the odd-backslash carry, the
//! inside-quote mask, the pseudo-structural predecessor bit, and the
//! previous window's structural bitmap. The last one is deliberate latency
//! hiding: a window's bitmap is flattened into offsets while the *next*
//! window's masks are being computed.

pub(crate) mod utf8;

use crate::error::{Error, Result};
use crate::simd::bits::clear_lowest_bit;
use crate::simd::fallback::Fallback;
use crate::simd::ChunkScanner;
use utf8::Utf8State;

const EVEN_BITS: u64 = 0x5555_5555_5555_5555;
const ODD_BITS: u64 = !EVEN_BITS;

/// How the scan treats the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    /// The buffer holds one complete document: unclosed strings, truncated
    /// UTF-8 sequences, and an empty index stream are errors.
    Full,
    /// The buffer is a batch window over a larger stream: the index stream
    /// is trimmed to the last complete top-level document and conditions
    /// past that boundary are left for the next batch.
    Partial,
}

/// What a scan produced.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanSummary {
    /// Number of entries in the index stream, including the sentinel offset
    /// (but not the guard entry behind it).
    pub(crate) n_structurals: usize,
    /// Bytes of the window covered by complete documents. Equals the window
    /// length for [`ScanMode::Full`].
    pub(crate) consumed: usize,
}

/// Carry state threaded through the per-window step.
struct Carries {
    prev_ends_odd_backslash: u64,
    prev_inside_quote: u64,
    prev_pseudo_pred: u64,
    /// The previous window's structural bitmap, flattened one window late.
    structurals: u64,
}

/// Appends the absolute offsets of the set bits of `bits` (a bitmap of the
/// window *preceding* `base`) to the index stream, eight per unrolled batch.
#[inline(always)]
fn flatten_bits(indexes: &mut Vec<u32>, base: usize, mut bits: u64) {
    if bits == 0 {
        return;
    }
    let offset = (base as u32).wrapping_sub(64);
    let count = bits.count_ones() as usize;
    let start = indexes.len();
    indexes.reserve(count + 8);
    // Unconditionally write blocks of eight and fix the length afterwards;
    // the reserve above covers the overshoot.
    unsafe {
        let mut out = indexes.as_mut_ptr().add(start);
        loop {
            for _ in 0..8 {
                out.write(offset.wrapping_add(bits.trailing_zeros()));
                bits = clear_lowest_bit(bits);
                out = out.add(1);
            }
            if bits == 0 {
                break;
            }
        }
        indexes.set_len(start + count);
    }
}

/// One 64-byte window of the scan. `window` aliases the loaded chunk bytes
/// (used by the UTF-8 DFA), `base` is the window's absolute offset.
#[inline(always)]
unsafe fn step<B: ChunkScanner>(
    chunk: B::Chunk,
    window: &[u8],
    base: usize,
    carries: &mut Carries,
    utf8: &mut Utf8State,
    first_unescaped: &mut Option<usize>,
    indexes: &mut Vec<u32>,
) {
    let all_ascii = !B::any_non_ascii(chunk);
    utf8.update(window, base, all_ascii);

    // Positions ending an odd-length backslash run; these escape whatever
    // follows them.
    let bs_bits = B::eq(chunk, b'\\');
    let start_edges = bs_bits & !(bs_bits << 1);
    let even_start_mask = EVEN_BITS ^ carries.prev_ends_odd_backslash;
    let even_starts = start_edges & even_start_mask;
    let odd_starts = start_edges & !even_start_mask;
    let even_carries = bs_bits.wrapping_add(even_starts);
    let (mut odd_carries, ends_odd) = bs_bits.overflowing_add(odd_starts);
    // Push in bit zero as a potential end if the previous window finished on
    // an odd-length run.
    odd_carries |= carries.prev_ends_odd_backslash;
    carries.prev_ends_odd_backslash = u64::from(ends_odd);
    let even_carry_ends = even_carries & !bs_bits;
    let odd_carry_ends = odd_carries & !bs_bits;
    let even_start_odd_end = even_carry_ends & ODD_BITS;
    let odd_start_even_end = odd_carry_ends & EVEN_BITS;
    let odd_ends = even_start_odd_end | odd_start_even_end;

    // Unescaped quotes, then the half-open in-string mask via prefix-XOR.
    let quote_bits = B::eq(chunk, b'"') & !odd_ends;
    let mut quote_mask = B::prefix_xor(quote_bits);
    quote_mask ^= carries.prev_inside_quote;

    // Control characters must be escaped inside strings (RFC 8259).
    let unescaped = B::lteq(chunk, 0x1F);
    let in_string_controls = quote_mask & unescaped;
    if in_string_controls != 0 && first_unescaped.is_none() {
        *first_unescaped = Some(base + in_string_controls.trailing_zeros() as usize);
    }
    carries.prev_inside_quote = ((quote_mask as i64) >> 63) as u64;

    // Flatten the previous window while this window's masks settle.
    flatten_bits(indexes, base, carries.structurals);

    let (whitespace, mut structurals) = B::whitespace_and_structurals(chunk);

    // Mask off anything inside strings, then add the quote bits back so
    // strings are traversable by their opening quote.
    structurals &= !quote_mask;
    structurals |= quote_bits;

    // Pseudo-structural characters: the first non-whitespace byte after
    // whitespace or a structural character, outside any string. This is what
    // turns the start of every scalar token into an indexed position.
    let pseudo_pred = structurals | whitespace;
    let shifted_pseudo_pred = (pseudo_pred << 1) | carries.prev_pseudo_pred;
    carries.prev_pseudo_pred = pseudo_pred >> 63;
    let pseudo_structurals = shifted_pseudo_pred & !whitespace & !quote_mask;
    structurals |= pseudo_structurals;

    // Closing quotes served their purpose as pseudo-structural predecessors;
    // drop them so only opening quotes remain indexed.
    structurals &= !(quote_bits & !quote_mask);

    carries.structurals = structurals;
}

/// The scan driver, monomorphized per backend.
///
/// # Safety
/// `buf` must have at least `len + PADDING` readable bytes, and the caller
/// must satisfy `B`'s target-feature requirements.
#[inline(always)]
unsafe fn scan_impl<B: ChunkScanner>(
    buf: &[u8],
    len: usize,
    indexes: &mut Vec<u32>,
    mode: ScanMode,
) -> Result<ScanSummary> {
    indexes.clear();
    let ptr = buf.as_ptr();
    let mut utf8 = Utf8State::new();
    let mut first_unescaped: Option<usize> = None;
    let mut carries = Carries {
        prev_ends_odd_backslash: 0,
        prev_inside_quote: 0,
        // The virtual character before the input counts as whitespace so the
        // first byte of a bare scalar document gets indexed.
        prev_pseudo_pred: 1,
        structurals: 0,
    };

    let len_minus_64 = len.saturating_sub(64);
    let mut idx = 0usize;
    while idx < len_minus_64 {
        let chunk = B::load(ptr.add(idx));
        step::<B>(
            chunk,
            &buf[idx..idx + 64],
            idx,
            &mut carries,
            &mut utf8,
            &mut first_unescaped,
            indexes,
        );
        idx += 64;
    }

    // The final window is copied into a space-filled scratch so the
    // classification and UTF-8 invariants hold without touching padding
    // contents.
    if idx < len {
        let mut tail = [0x20u8; 64];
        tail[..len - idx].copy_from_slice(&buf[idx..len]);
        let chunk = B::load(tail.as_ptr());
        step::<B>(
            chunk,
            &tail,
            idx,
            &mut carries,
            &mut utf8,
            &mut first_unescaped,
            indexes,
        );
        idx += 64;
    }

    let ended_inside_quote = carries.prev_inside_quote != 0;
    flatten_bits(indexes, idx, carries.structurals);

    match mode {
        ScanMode::Full => {
            if ended_inside_quote {
                return Err(Error::UnclosedString);
            }
            if indexes.is_empty() {
                return Err(Error::Empty);
            }
            if indexes[indexes.len() - 1] as usize > len {
                return Err(Error::UnexpectedError);
            }
            if first_unescaped.is_some() {
                return Err(Error::UnescapedChars);
            }
            if !utf8.is_accepting() {
                return Err(Error::Utf8Error);
            }
            indexes.push(len as u32); // sentinel
            indexes.push(len as u32); // guard: safe to read one past the sentinel
            Ok(ScanSummary {
                n_structurals: indexes.len() - 1,
                consumed: len,
            })
        }
        ScanMode::Partial => {
            // A window with no structurals at all is pure whitespace; the
            // stream may slide past it wholesale.
            let consumed = if indexes.is_empty() {
                len
            } else {
                trim_to_document_boundary(buf, indexes)
            };
            if consumed == 0 {
                // The whole window belongs to one (oversized or broken)
                // document, so any error found anywhere in it is that
                // document's error.
                if first_unescaped.is_some() {
                    return Err(Error::UnescapedChars);
                }
                if utf8.first_error().is_some() {
                    return Err(Error::Utf8Error);
                }
            } else {
                if first_unescaped.is_some_and(|pos| pos < consumed) {
                    return Err(Error::UnescapedChars);
                }
                if utf8.first_error().is_some_and(|pos| pos < consumed) {
                    return Err(Error::Utf8Error);
                }
            }
            indexes.push(consumed as u32); // sentinel
            indexes.push(consumed as u32); // guard
            Ok(ScanSummary {
                n_structurals: indexes.len() - 1,
                consumed,
            })
        }
    }
}

/// Drops trailing indexes that belong to an incomplete top-level document
/// and returns how many input bytes the remaining complete documents cover.
///
/// A container document completes when its nesting returns to zero; a
/// top-level scalar completes once any later index proves its token ended.
/// The last index of a window is therefore never kept on the scalar path.
fn trim_to_document_boundary(buf: &[u8], indexes: &mut Vec<u32>) -> usize {
    let mut kept = 0usize;
    let mut consumed = 0usize;
    let mut depth = 0usize;
    for k in 0..indexes.len() {
        let ix = indexes[k] as usize;
        match buf[ix] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    kept = k + 1;
                    consumed = ix + 1;
                }
            }
            _ => {
                if depth == 0 && k + 1 < indexes.len() {
                    kept = k + 1;
                    consumed = indexes[k + 1] as usize;
                }
            }
        }
    }
    indexes.truncate(kept);
    consumed
}

/// Portable entry point.
///
/// # Safety
/// `buf` must have at least `len + PADDING` readable bytes.
pub(crate) unsafe fn find_structural_bits_fallback(
    buf: &[u8],
    len: usize,
    indexes: &mut Vec<u32>,
    mode: ScanMode,
) -> Result<ScanSummary> {
    scan_impl::<Fallback>(buf, len, indexes, mode)
}

/// SSE4.2 entry point.
///
/// # Safety
/// As [`find_structural_bits_fallback`], plus the CPU must support
/// `sse4.2`, `ssse3`, and `pclmulqdq`.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse4.2,ssse3,pclmulqdq")]
pub(crate) unsafe fn find_structural_bits_sse42(
    buf: &[u8],
    len: usize,
    indexes: &mut Vec<u32>,
    mode: ScanMode,
) -> Result<ScanSummary> {
    scan_impl::<crate::simd::sse42::Sse42>(buf, len, indexes, mode)
}

/// AVX2 entry point.
///
/// # Safety
/// As [`find_structural_bits_fallback`], plus the CPU must support `avx2`
/// and `pclmulqdq`.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2,pclmulqdq")]
pub(crate) unsafe fn find_structural_bits_avx2(
    buf: &[u8],
    len: usize,
    indexes: &mut Vec<u32>,
    mode: ScanMode,
) -> Result<ScanSummary> {
    scan_impl::<crate::simd::avx2::Avx2>(buf, len, indexes, mode)
}
