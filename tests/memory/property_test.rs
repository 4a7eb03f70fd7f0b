/*!
 * Allocator Property Tests
 * Classification bounds and non-overlap of live blocks across cycles
 */

use gc_block_allocator::core::limits::GC_MAX_RUN;
use gc_block_allocator::memory::{
    classify, BlockRef, Heap, HeapConfig, PageKind, ZeroSizePolicy,
};
use proptest::prelude::*;

fn any_kind() -> impl Strategy<Value = PageKind> {
    prop_oneof![
        Just(PageKind::Dynamic),
        Just(PageKind::Raw),
        Just(PageKind::NoPtr),
        Just(PageKind::Finalizer),
    ]
}

/// Request sizes weighted towards the small partitions
fn any_size() -> impl Strategy<Value = usize> {
    prop_oneof![
        4 => 1usize..=48,
        3 => 49usize..=2048,
        1 => 2049usize..=40_000,
    ]
}

/// Address ranges of `blocks`, checked to lie inside their page
fn spans(heap: &Heap, blocks: &[BlockRef]) -> Vec<(usize, usize)> {
    blocks
        .iter()
        .map(|block| {
            let info = heap.page_info(block.page).unwrap();
            let start = heap.address_of(*block).unwrap();
            let len = heap.block_size(*block).unwrap();
            assert_eq!((start - info.base) % info.block_size, 0);
            assert!(start >= info.base + info.first_block * info.block_size);
            assert!(start + len <= info.base + info.max_blocks * info.block_size);
            (start, start + len)
        })
        .collect()
}

fn assert_disjoint(mut ranges: Vec<(usize, usize)>) {
    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        assert!(
            pair[0].1 <= pair[1].0,
            "blocks {:x?} and {:x?} overlap",
            pair[0],
            pair[1]
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn classification_covers_request(size in 1usize..(1 << 24), kind in any_kind()) {
        let c = classify(size, kind, ZeroSizePolicy::SmallestBlock).unwrap();
        let block = c.partition.block_size();
        prop_assert!(c.size >= size);
        prop_assert!(c.size >= block);
        if !c.partition.is_fixed() {
            prop_assert!(c.size < GC_MAX_RUN * block);
            prop_assert_eq!(c.size % block, 0);
        }
        prop_assert!(kind != PageKind::Finalizer || !c.partition.is_fixed());
    }

    #[test]
    fn live_blocks_never_overlap(
        first in prop::collection::vec((any_size(), any_kind()), 1..120),
        keep in prop::collection::vec(any::<bool>(), 120),
        second in prop::collection::vec((any_size(), any_kind()), 1..120),
    ) {
        let mut heap = Heap::new(HeapConfig::default().with_page_size(4096)).unwrap();

        let blocks: Vec<BlockRef> = first
            .iter()
            .map(|&(size, kind)| heap.alloc(size, kind).unwrap())
            .collect();
        assert_disjoint(spans(&heap, &blocks));

        let scratch = vec![0; heap.required_mark_bytes()];
        heap.before_mark(scratch).unwrap();
        let survivors: Vec<BlockRef> = blocks
            .iter()
            .zip(&keep)
            .filter(|(_, keep)| **keep)
            .map(|(block, _)| *block)
            .collect();
        for block in &survivors {
            heap.mark(*block).unwrap();
        }
        heap.after_mark();

        let mut live = survivors.clone();
        for &(size, kind) in &second {
            live.push(heap.alloc(size, kind).unwrap());
        }
        assert_disjoint(spans(&heap, &live));
    }
}
