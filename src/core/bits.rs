/*!
 * Bit Scanning
 * Trailing-ones / trailing-zeroes primitives used by the bitmap scans
 *
 * The native versions lower to a single `tzcnt`/`bsf` on targets that have
 * one. Enabling the `portable-bitscan` feature swaps in a loop-based
 * implementation for targets where the intrinsic is unavailable or broken.
 */

/// Number of consecutive set bits starting at bit 0 (32 for `u32::MAX`)
#[inline(always)]
#[must_use]
pub fn trailing_ones(x: u32) -> u32 {
    #[cfg(not(feature = "portable-bitscan"))]
    {
        x.trailing_ones()
    }
    #[cfg(feature = "portable-bitscan")]
    {
        portable::trailing_ones(x)
    }
}

/// Number of consecutive clear bits starting at bit 0 (32 for `0`)
#[inline(always)]
#[must_use]
pub fn trailing_zeroes(x: u32) -> u32 {
    #[cfg(not(feature = "portable-bitscan"))]
    {
        x.trailing_zeros()
    }
    #[cfg(feature = "portable-bitscan")]
    {
        portable::trailing_zeroes(x)
    }
}

/// Loop-based fallbacks
pub mod portable {
    #[must_use]
    pub fn trailing_ones(mut x: u32) -> u32 {
        let mut n = 0;
        while n < 32 && x & 1 == 1 {
            x >>= 1;
            n += 1;
        }
        n
    }

    #[must_use]
    pub fn trailing_zeroes(mut x: u32) -> u32 {
        let mut n = 0;
        while n < 32 && x & 1 == 0 {
            x >>= 1;
            n += 1;
        }
        n
    }
}

/// Verify the primitives behave as the scans expect
///
/// Checked once when a heap is created.
#[must_use]
pub fn self_check() -> bool {
    let ones_ok =
        trailing_ones(0x0800_03FF) == 10 && trailing_ones(0) == 0 && trailing_ones(u32::MAX) == 32;
    let zeroes_ok = trailing_zeroes(!0x0800_03FFu32) == 10
        && trailing_zeroes(0) == 32
        && trailing_zeroes(u32::MAX) == 0;
    ones_ok && zeroes_ok
}
