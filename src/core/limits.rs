/*!
 * Allocator Limits and Constants
 *
 * Centralized location for the build-time classification table and the
 * page-layout constants of the block allocator.
 *
 * ## Layout
 * - Values are grouped by domain (partitions, pages, free lists, debug)
 * - Performance-critical constants are marked with [PERF]
 * - Values whose change alters the page layout are marked with [LAYOUT]
 */

use crate::core::types::Size;

// =============================================================================
// PARTITIONS
// =============================================================================

/// Total number of partitions (fixed + variable)
pub const GC_PARTITIONS: usize = 9;

/// Number of fixed partitions; they come first in the table
pub const GC_FIXED_PARTS: usize = 5;

/// Alignment granularity in bits (8 bytes on 64-bit, 4 bytes on 32-bit)
#[cfg(target_pointer_width = "64")]
pub const GC_ALIGN_BITS: u32 = 3;
#[cfg(not(target_pointer_width = "64"))]
pub const GC_ALIGN_BITS: u32 = 2;

/// Alignment granularity in bytes
pub const GC_ALIGN: Size = 1 << GC_ALIGN_BITS;

/// Block size of every partition
/// [LAYOUT] Fixed sizes are multiples of the alignment unit, variable sizes are powers of two
#[cfg(target_pointer_width = "64")]
pub const GC_SIZES: [Size; GC_PARTITIONS] = [8, 16, 24, 32, 40, 8, 64, 1 << 14, 1 << 22];
#[cfg(not(target_pointer_width = "64"))]
pub const GC_SIZES: [Size; GC_PARTITIONS] = [4, 8, 12, 16, 20, 8, 64, 1 << 14, 1 << 22];

/// log2 of the block size for variable partitions (0 for fixed ones)
pub const GC_SBITS: [u32; GC_PARTITIONS] = [0, 0, 0, 0, 0, 3, 6, 14, 22];

/// Largest run a variable allocation may span
/// [LAYOUT] Run lengths are stored in one byte per block
pub const GC_MAX_RUN: usize = 255;

// =============================================================================
// KINDS
// =============================================================================

/// Width of the page kind tag
pub const PAGE_KIND_BITS: u32 = 2;

/// Number of distinct kinds
pub const PAGE_KINDS: usize = 1 << PAGE_KIND_BITS;

/// Number of (partition, kind) pools
pub const GC_ALL_PAGES: usize = GC_PARTITIONS << PAGE_KIND_BITS;

// =============================================================================
// PAGES
// =============================================================================

/// Default page size (64KB)
/// Also the upper bound on blocks per page
pub const GC_PAGE_SIZE: Size = 1 << 16;

/// Smallest page size a heap may be configured with (1KB)
pub const MIN_PAGE_SIZE: Size = 1 << 10;

/// Slack added to a variable request before sizing a dedicated page
pub const LARGE_PAGE_PADDING: Size = 1024;

/// Pool length above which new pages start doubling in size
/// [PERF] Keeps page count growth in check for small-object pools
pub const PAGE_GROWTH_THRESHOLD: usize = 8;

/// Only pools with blocks smaller than this grow their pages
pub const PAGE_GROWTH_MAX_BLOCK: Size = 256;

/// Variable pages with at most this many blocks keep their size table inline
pub const INLINE_SIZE_TABLE: usize = 8;

// =============================================================================
// FREE LISTS
// =============================================================================

/// Number of free-list slots per kind, indexed by block count - 1
/// [PERF] Only gaps up to this many blocks are recycled through the fast path
pub const GC_FREELIST_MAX: usize = 16;

/// Partition served by the free-list fast path (8-byte variable blocks)
pub const GC_HOT_PARTITION: usize = GC_FIXED_PARTS;

// =============================================================================
// DEBUG
// =============================================================================

/// Fill byte for memory that is not part of a live allocation
pub const POISON_BYTE: u8 = 0xDD;

/// Fill byte for the end-of-block canary word
pub const CANARY_BYTE: u8 = 0xEE;

/// Size of the end-of-block canary word
pub const CANARY_BYTES: Size = std::mem::size_of::<usize>();
