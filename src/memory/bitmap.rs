/*!
 * Mark Bitmaps
 * One bit per block, carved out of the caller's scratch buffer each cycle
 *
 * Bit `b` of a page lives in byte `b >> 3`, bit `b & 7`. Scans read the
 * bitmap 32 blocks at a time as little-endian words so that bit `b & 31`
 * of word `b >> 5` is the same bit.
 */

/// Load the 32-bit word holding blocks `index * 32 .. index * 32 + 32`
///
/// Bytes past the end of the page's slice read as zero.
#[inline]
pub(crate) fn word(bits: &[u8], index: usize) -> u32 {
    let start = index * 4;
    let mut buf = [0u8; 4];
    if start < bits.len() {
        let end = (start + 4).min(bits.len());
        buf[..end - start].copy_from_slice(&bits[start..end]);
    }
    u32::from_le_bytes(buf)
}

#[inline]
pub(crate) fn test(bits: &[u8], block: usize) -> bool {
    bits.get(block >> 3)
        .is_some_and(|byte| byte & (1 << (block & 7)) != 0)
}

#[inline]
pub(crate) fn set(bits: &mut [u8], block: usize) {
    bits[block >> 3] |= 1 << (block & 7);
}

/// Bytes needed for `max_blocks` bits
#[inline]
pub(crate) fn bytes_for(max_blocks: usize) -> usize {
    (max_blocks + 7) >> 3
}

/// True if no block from `first_block` onward is marked
///
/// Works at byte granularity; bits below `first_block` are never set.
pub(crate) fn is_clear_from(bits: &[u8], first_block: usize) -> bool {
    bits.get(first_block >> 3..)
        .map_or(true, |tail| tail.iter().all(|&b| b == 0))
}
