/*!
 * Free-List Fast Path Tests
 * Gaps spilled by the variable scan and picked up by later requests
 */

use super::common::{begin_cycle, payload, small_heap};
use gc_block_allocator::memory::{Heap, HeapConfig, PageKind};
use pretty_assertions::assert_eq;

#[test]
fn test_skipped_gap_is_recycled() {
    let mut heap = small_heap();
    let a = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let b = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let c = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    assert_eq!([a.index, b.index, c.index], [32, 38, 44]);

    begin_cycle(&mut heap);
    heap.mark(a).unwrap();
    heap.mark(c).unwrap();
    heap.after_mark();

    // too big for b's gap, which gets queued on the way past
    let d = heap.alloc(payload(56), PageKind::Dynamic).unwrap();
    assert_eq!(d.index, 50);
    assert_eq!(heap.stats().free_list_entries, 1);

    let e = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    assert_eq!(e, b);
    assert_eq!(heap.run_length(e), Some(6));
    assert!(heap.is_marked(e));
    assert_eq!(heap.stats().free_list_entries, 0);
}

#[test]
fn test_gap_of_other_length_is_not_used() {
    let mut heap = small_heap();
    let a = heap.alloc(payload(48), PageKind::Raw).unwrap();
    let _b = heap.alloc(payload(48), PageKind::Raw).unwrap();
    let c = heap.alloc(payload(48), PageKind::Raw).unwrap();

    begin_cycle(&mut heap);
    heap.mark(a).unwrap();
    heap.mark(c).unwrap();
    heap.after_mark();

    let d = heap.alloc(payload(56), PageKind::Raw).unwrap();
    let other = heap.alloc(payload(56), PageKind::Raw).unwrap();
    assert_eq!(other.index, d.index + 7, "7-block request took the 6-block gap");
    assert_eq!(heap.stats().free_list_entries, 1);
}

#[test]
fn test_lists_do_not_survive_before_mark() {
    let mut heap = small_heap();
    let a = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let b = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let c = heap.alloc(payload(48), PageKind::Dynamic).unwrap();

    begin_cycle(&mut heap);
    heap.mark(a).unwrap();
    heap.mark(c).unwrap();
    heap.after_mark();
    heap.alloc(payload(56), PageKind::Dynamic).unwrap();
    assert_eq!(heap.stats().free_list_entries, 1);

    begin_cycle(&mut heap);
    assert_eq!(heap.stats().free_list_entries, 0);
    heap.mark(a).unwrap();
    heap.mark(c).unwrap();
    heap.after_mark();

    // b is found again by the scan itself
    let again = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    assert_eq!(again, b);
}

#[test]
fn test_other_partitions_never_spill() {
    let mut heap = Heap::new(HeapConfig::default().with_page_size(16384)).unwrap();
    let x = heap.alloc(payload(2048), PageKind::NoPtr).unwrap();
    let _y = heap.alloc(payload(2048), PageKind::NoPtr).unwrap();
    let z = heap.alloc(payload(2048), PageKind::NoPtr).unwrap();
    let info = heap.page_info(x.page).unwrap();
    assert_eq!(info.block_size, 64);
    assert_eq!([x.index, z.index], [info.first_block, info.first_block + 64]);

    begin_cycle(&mut heap);
    heap.mark(x).unwrap();
    heap.mark(z).unwrap();
    heap.after_mark();

    // walks past y's 32-block gap without queueing it
    let wide = heap.alloc(payload(2560), PageKind::NoPtr).unwrap();
    assert_eq!(wide.index, z.index + 32);
    assert_eq!(heap.stats().free_list_entries, 0);
}

#[test]
fn test_single_block_gap_serves_next_small_request() {
    let mut heap = small_heap();
    // finalizable 8-byte requests are the only ones in the hot partition
    let a = heap.alloc(payload(8), PageKind::Finalizer).unwrap();
    let b = heap.alloc(payload(8), PageKind::Finalizer).unwrap();
    let c = heap.alloc(payload(8), PageKind::Finalizer).unwrap();
    assert_eq!([a.index, b.index, c.index], [32, 33, 34]);

    begin_cycle(&mut heap);
    heap.mark(a).unwrap();
    heap.mark(c).unwrap();
    heap.after_mark();

    let d = heap.alloc(payload(16), PageKind::Finalizer).unwrap();
    assert_eq!(d.index, 35);
    assert_eq!(heap.stats().free_list_entries, 1);

    let again = heap.alloc(payload(8), PageKind::Finalizer).unwrap();
    assert_eq!(again, b);
    assert_eq!(heap.run_length(again), Some(1));
    assert_eq!(heap.stats().free_list_entries, 0);
}

#[test]
fn test_only_gaps_up_to_sixteen_blocks_are_queued() {
    let mut heap = small_heap();
    let a = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let g16 = heap.alloc(payload(8 * 16), PageKind::Dynamic).unwrap();
    let m = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let g17 = heap.alloc(payload(8 * 17), PageKind::Dynamic).unwrap();
    let z = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    assert_eq!(
        [a.index, g16.index, m.index, g17.index, z.index],
        [32, 38, 54, 60, 77]
    );

    begin_cycle(&mut heap);
    heap.mark(a).unwrap();
    heap.mark(m).unwrap();
    heap.mark(z).unwrap();
    heap.after_mark();

    // walks past both gaps, only the 16-block one is queued
    let wide = heap.alloc(payload(8 * 20), PageKind::Dynamic).unwrap();
    assert_eq!(wide.index, 83);
    assert_eq!(heap.stats().free_list_entries, 1);

    let reused = heap.alloc(payload(8 * 16), PageKind::Dynamic).unwrap();
    assert_eq!(reused, g16);
    assert_eq!(heap.stats().free_list_entries, 0);

    let fresh = heap.alloc(payload(8 * 17), PageKind::Dynamic).unwrap();
    assert_ne!(fresh, g17);
    assert_eq!(fresh.index, 103);
}

#[test]
fn test_gap_queued_while_marking_is_dropped_at_sweep() {
    let mut heap = small_heap();
    let a = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let b = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let c = heap.alloc(payload(48), PageKind::Dynamic).unwrap();

    begin_cycle(&mut heap);
    heap.mark(a).unwrap();
    heap.mark(c).unwrap();
    // queues b's gap before the sweep has run
    let d = heap.alloc(payload(56), PageKind::Dynamic).unwrap();
    assert_eq!(d.index, 50);
    assert_eq!(heap.stats().free_list_entries, 1);

    heap.after_mark();
    assert_eq!(heap.stats().free_list_entries, 0);

    let e = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    let f = heap.alloc(payload(48), PageKind::Dynamic).unwrap();
    assert_ne!(e, b);
    assert_eq!([e.index, f.index], [57, 63]);

    // the next cycle starts cleanly with the dead gap poisoned in debug builds
    begin_cycle(&mut heap);
    assert_eq!(heap.stats().free_list_entries, 0);
    heap.after_mark();
}
