/*!
 * Core Types
 * Common types used across the allocator
 */

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Round `size` up to a multiple of `align` (a power of two)
///
/// Returns `None` when the rounded value does not fit in a `Size`.
#[inline]
#[must_use]
pub fn align_up(size: Size, align: Size) -> Option<Size> {
    debug_assert!(align.is_power_of_two());
    size.checked_add(align - 1).map(|s| s & !(align - 1))
}
