/*!
 * Shared helpers for the memory tests
 */

use gc_block_allocator::memory::{Heap, HeapConfig};

/// Heap with small pages so scenarios stay within one page
pub fn small_heap() -> Heap {
    let _ = env_logger::builder().is_test(true).try_init();
    Heap::new(HeapConfig::default().with_page_size(1024)).expect("valid config")
}

/// Request size that lands in a block of `block` bytes
///
/// With end-of-block canaries on, the heap pads every request by one word.
pub fn payload(block: usize) -> usize {
    #[cfg(feature = "gc-memchk")]
    {
        block.saturating_sub(gc_block_allocator::core::limits::CANARY_BYTES)
    }
    #[cfg(not(feature = "gc-memchk"))]
    {
        block
    }
}

/// Start a cycle with a scratch buffer of exactly the required size
pub fn begin_cycle(heap: &mut Heap) {
    let scratch = vec![0; heap.required_mark_bytes()];
    heap.before_mark(scratch).expect("scratch sized from heap");
}
