/*!
 * Fixed-Block Allocation Tests
 * Single-block partitions across mark cycles
 */

use super::common::{begin_cycle, payload, small_heap};
use gc_block_allocator::memory::{BlockRef, PageKind};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

#[test]
fn test_sequential_blocks_in_fresh_page() {
    let mut heap = small_heap();
    let blocks: Vec<BlockRef> = (0..3)
        .map(|_| heap.alloc(payload(16), PageKind::Dynamic).unwrap())
        .collect();

    let info = heap.page_info(blocks[0].page).unwrap();
    assert_eq!(info.block_size, 16);
    assert_eq!(info.max_blocks, 64);
    assert_eq!(info.first_block, 0);
    assert!(!info.has_bitmap);

    let addrs: Vec<usize> = blocks.iter().map(|b| heap.address_of(*b).unwrap()).collect();
    assert_eq!(addrs, vec![info.base, info.base + 16, info.base + 32]);
}

#[test]
fn test_unmarked_cycle_reuses_blocks_once() {
    let mut heap = small_heap();
    for _ in 0..3 {
        heap.alloc(payload(16), PageKind::Dynamic).unwrap();
    }

    begin_cycle(&mut heap);
    heap.after_mark();

    let mut seen = HashSet::new();
    for expected in 0..4 {
        let block = heap.alloc(payload(16), PageKind::Dynamic).unwrap();
        assert_eq!(block.index, expected);
        assert!(seen.insert(block), "block {} handed out twice", block);
    }
}

#[test]
fn test_marked_blocks_are_skipped() {
    let mut heap = small_heap();
    let blocks: Vec<BlockRef> = (0..3)
        .map(|_| heap.alloc(payload(16), PageKind::Dynamic).unwrap())
        .collect();

    begin_cycle(&mut heap);
    heap.mark(blocks[0]).unwrap();
    heap.mark(blocks[2]).unwrap();
    heap.after_mark();

    let base = heap.page_info(blocks[0].page).unwrap().base;
    let first = heap.alloc(payload(16), PageKind::Dynamic).unwrap();
    let second = heap.alloc(payload(16), PageKind::Dynamic).unwrap();
    assert_eq!(heap.address_of(first).unwrap(), base + 16);
    assert_eq!(heap.address_of(second).unwrap(), base + 48);
}

#[test]
fn test_fully_marked_page_moves_on() {
    let mut heap = small_heap();
    let blocks: Vec<BlockRef> = (0..64)
        .map(|_| heap.alloc(payload(16), PageKind::NoPtr).unwrap())
        .collect();
    assert!(blocks.iter().all(|b| b.page == blocks[0].page));

    begin_cycle(&mut heap);
    for block in &blocks {
        heap.mark(*block).unwrap();
    }
    heap.after_mark();

    let fresh = heap.alloc(payload(16), PageKind::NoPtr).unwrap();
    assert_ne!(fresh.page, blocks[0].page);
    assert_eq!(heap.stats().total_pages, 2);
}

#[test]
fn test_kinds_use_separate_pools() {
    let mut heap = small_heap();
    let dynamic = heap.alloc(payload(16), PageKind::Dynamic).unwrap();
    let raw = heap.alloc(payload(16), PageKind::Raw).unwrap();
    assert_ne!(dynamic.page, raw.page);
    assert_eq!(raw.index, 0);

    let stats = heap.stats();
    assert_eq!(stats.pools.len(), 2);
    assert_eq!(stats.total_bytes, 2048);
}
