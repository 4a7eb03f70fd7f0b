/*!
 * Size Classifier Tests
 */

use gc_block_allocator::core::limits::{GC_ALIGN, GC_FIXED_PARTS, GC_HOT_PARTITION, GC_MAX_RUN};
use gc_block_allocator::memory::{classify, HeapError, PageKind, ZeroSizePolicy};
use pretty_assertions::assert_eq;

#[test]
fn test_small_requests_use_fixed_partitions() {
    for size in 1..=5 * GC_ALIGN {
        let c = classify(size, PageKind::Dynamic, ZeroSizePolicy::SmallestBlock).unwrap();
        assert!(c.partition.is_fixed(), "size {} went variable", size);
        assert!(c.size >= size);
        assert_eq!(c.size, c.partition.block_size());
        assert_eq!(c.blocks(), 1);
    }
}

#[test]
fn test_finalizer_requests_always_go_variable() {
    for size in [1, 8, 24, 40] {
        let c = classify(size, PageKind::Finalizer, ZeroSizePolicy::SmallestBlock).unwrap();
        assert!(c.partition.index() >= GC_FIXED_PARTS);
        assert_eq!(c.partition.index(), GC_HOT_PARTITION);
    }
}

#[test]
fn test_run_length_stays_below_cap() {
    for size in [41, 100, 2039, 2040, 4096, 16_319, 16_320, 1 << 20] {
        let c = classify(size, PageKind::NoPtr, ZeroSizePolicy::SmallestBlock).unwrap();
        let block = c.partition.block_size();
        assert!(c.size >= size);
        assert_eq!(c.size % block, 0);
        assert!(c.size < block * GC_MAX_RUN);
        assert!(c.blocks() < GC_MAX_RUN);
    }
}

#[test]
fn test_unclassifiable_size() {
    let size = (1 << 22) * GC_MAX_RUN;
    assert_eq!(
        classify(size, PageKind::Raw, ZeroSizePolicy::SmallestBlock),
        Err(HeapError::ClassificationOverflow { size })
    );
}
