/*!
 * Memory Traits
 * Seams between the allocator and the collector around it
 */

use super::provider::RawPage;
use super::types::*;
use crate::core::types::{Address, Size};

/// Source of raw page memory
///
/// Regions must be exactly `size` bytes; in `gc-debug` builds they must
/// arrive filled with the poison byte.
pub trait PageProvider {
    /// Allocate a region of `size` bytes tagged with `kind`
    fn allocate_page(&mut self, size: Size, kind: PageKind, max_blocks: usize) -> RawPage;

    /// Return a region obtained from `allocate_page`
    fn release_page(&mut self, page: RawPage, max_blocks: usize);
}

/// Block allocation interface
pub trait BlockAllocator {
    /// Allocate a block of at least `size` bytes
    fn allocate(&mut self, size: Size, kind: PageKind) -> HeapResult<BlockRef>;

    /// Start address of a block
    fn address_of(&self, block: BlockRef) -> HeapResult<Address>;

    /// Bytes covered by a block (its whole run in variable pages)
    fn block_size(&self, block: BlockRef) -> HeapResult<Size>;
}

/// Hooks the collector drives around its mark phase
pub trait CollectorHooks {
    /// Reset bitmaps and cursors, handing over the scratch buffer for this cycle
    ///
    /// Returns the previous cycle's buffer for reuse.
    fn before_mark(&mut self, scratch: Vec<u8>) -> HeapResult<Vec<u8>>;

    /// Paint a block live
    fn mark(&mut self, block: BlockRef) -> HeapResult<()>;

    /// Run finalizers and release empty pages
    fn after_mark(&mut self) -> SweepStats;
}
