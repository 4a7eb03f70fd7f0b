/*!
 * GC Block Allocator Library
 * Page-based, size-partitioned block allocation for a mark-and-sweep collector
 */

pub mod core;
pub mod memory;

// Re-exports
pub use memory::{
    classify, BlockAllocator, BlockRef, CollectorHooks, Heap, HeapConfig, HeapError, HeapResult,
    HeapStats, PageKind, PageProvider, SweepStats, SystemPageProvider, ZeroSizePolicy,
};
