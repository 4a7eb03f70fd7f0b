/*!
 * Mark/Sweep Integration
 * Cycle hooks driven by the collector around its mark phase
 *
 * `before_mark` hands every page a zeroed bitmap slice from the caller's
 * scratch buffer and rewinds all cursors. The collector then paints live
 * blocks with `mark`. `after_mark` drops any free-list entries queued
 * during marking, runs finalizers of unmarked blocks, poisons dead memory
 * in debug builds and returns empty pages of the eligible pools.
 */

use super::Heap;
use crate::core::types::Address;
use crate::memory::bitmap;
use crate::memory::traits::PageProvider;
use crate::memory::types::*;
use log::{debug, info};
use std::time::Instant;

impl<P: PageProvider> Heap<P> {
    /// Start a cycle with a fresh scratch buffer
    ///
    /// The buffer must hold at least [`Heap::required_mark_bytes`] bytes.
    /// Returns the buffer of the previous cycle.
    pub fn before_mark(&mut self, mut scratch: Vec<u8>) -> HeapResult<Vec<u8>> {
        let required = self.required_mark_bytes();
        if scratch.len() < required {
            return Err(HeapError::ScratchTooSmall {
                required,
                provided: scratch.len(),
            });
        }
        scratch[..required].fill(0);

        let mut offset = 0;
        for pool in PoolId::all() {
            let mut cursor = self.pools.head(pool);
            self.pools.set_free(pool, cursor);
            while let Some(id) = cursor {
                let page = self.pages.get_mut(id);
                offset += page.assign_bitmap(offset);
                page.next_block = page.first_block();
                cursor = page.next_page;
            }
        }
        self.drain_free_lists();

        let previous = std::mem::replace(&mut self.scratch, scratch);
        self.phase = CyclePhase::Marking;
        debug!(
            "Mark cycle started: {} pages, {} bitmap bytes",
            self.pages.len(),
            required
        );
        Ok(previous)
    }

    /// Paint a block live for this cycle
    ///
    /// Pages created after `before_mark` have no bitmap and are kept whole,
    /// so marking their blocks is a no-op.
    pub fn mark(&mut self, block: BlockRef) -> HeapResult<()> {
        if self.phase != CyclePhase::Marking {
            return Err(HeapError::InvariantViolation(format!(
                "mark of {} outside a mark cycle",
                block
            )));
        }
        let page = self.live_page(block)?;
        if let Some(range) = page.bitmap_range() {
            bitmap::set(&mut self.scratch[range], block.index);
        }
        Ok(())
    }

    /// Mark the block covering `addr`
    pub fn mark_address(&mut self, addr: Address) -> HeapResult<BlockRef> {
        let block = self
            .block_interior(addr)
            .ok_or(HeapError::UnknownAddress(addr))?;
        self.mark(block)?;
        Ok(block)
    }

    pub fn is_marked(&self, block: BlockRef) -> bool {
        self.pages
            .try_get(block.page)
            .and_then(|page| page.bitmap_range())
            .is_some_and(|range| bitmap::test(&self.scratch[range], block.index))
    }

    /// Finish a cycle
    pub fn after_mark(&mut self) -> SweepStats {
        invariant!(
            self.phase == CyclePhase::Marking,
            "after_mark without a matching before_mark"
        );
        let started = Instant::now();
        let mut stats = SweepStats::new();

        // gaps queued while marking may since have been marked or swept
        self.drain_free_lists();
        self.call_finalizers(&mut stats);
        #[cfg(feature = "gc-debug")]
        self.clear_unmarked_mem(&mut stats);
        self.flush_empty_pages(&mut stats);

        stats.duration_us = started.elapsed().as_micros() as u64;
        self.phase = CyclePhase::Allocating;
        info!(
            "Sweep complete: {} finalizers run, {} pages released ({} bytes) in {}us",
            stats.finalizers_run, stats.pages_released, stats.bytes_released, stats.duration_us
        );
        stats
    }

    fn call_finalizers(&mut self, stats: &mut SweepStats) {
        for pool in PoolId::all().filter(|p| p.kind().is_finalizer()) {
            let mut cursor = self.pools.head(pool);
            while let Some(id) = cursor {
                let page = self.pages.get_mut(id);
                cursor = page.next_page;
                let Some(range) = page.bitmap_range() else {
                    continue;
                };
                let bits = &self.scratch[range];

                for bid in page.first_block()..page.max_blocks() {
                    let run = page.size_at(bid);
                    if run == 0 || bitmap::test(bits, bid) {
                        continue;
                    }
                    let finalizer = page.take_finalizer(bid);
                    page.set_size(bid, 0);
                    if let Some(finalizer) = finalizer {
                        if self.finalizers.invoke(finalizer, page.address_of(bid)) {
                            stats.finalizers_run += 1;
                        }
                    }
                    #[cfg(feature = "gc-debug")]
                    {
                        page.poison(bid, run as usize * page.block_size());
                        stats.blocks_poisoned += 1;
                    }
                }
            }
        }
    }

    #[cfg(feature = "gc-debug")]
    fn clear_unmarked_mem(&mut self, stats: &mut SweepStats) {
        for pool in PoolId::all() {
            let mut cursor = self.pools.head(pool);
            while let Some(id) = cursor {
                let page = self.pages.get_mut(id);
                cursor = page.next_page;
                let Some(range) = page.bitmap_range() else {
                    continue;
                };
                let bits = &self.scratch[range];

                for bid in page.first_block()..page.max_blocks() {
                    if page.has_sizes() && page.size_at(bid) == 0 {
                        continue;
                    }
                    let span = page.span(bid);
                    invariant!(
                        bid * page.block_size() + span <= page.page_size(),
                        "invalid block size {} at {} of {}",
                        span,
                        bid,
                        id
                    );
                    #[cfg(feature = "gc-memchk")]
                    invariant!(
                        canary_intact(page.bytes(bid, span)),
                        "Block written out of bounds at {} of {}",
                        bid,
                        id
                    );
                    if !bitmap::test(bits, bid) {
                        page.poison(bid, span);
                        if page.has_sizes() {
                            page.set_size(bid, 0);
                        }
                        stats.blocks_poisoned += 1;
                    }
                }
            }
        }
    }

    fn flush_empty_pages(&mut self, stats: &mut SweepStats) {
        for pool in PoolId::all().filter(|p| p.releases_empty_pages()) {
            let mut prev: Option<PageId> = None;
            let mut cursor = self.pools.head(pool);
            while let Some(id) = cursor {
                let page = self.pages.get(id);
                let next = page.next_page;
                let empty = page
                    .bitmap_range()
                    .is_some_and(|range| bitmap::is_clear_from(&self.scratch[range], page.first_block()));
                cursor = next;
                if !empty {
                    prev = Some(id);
                    continue;
                }

                match prev {
                    Some(prev) => self.pages.get_mut(prev).next_page = next,
                    None => self.pools.set_head(pool, next),
                }
                if self.pools.free(pool) == Some(id) {
                    self.pools.set_free(pool, next);
                }

                let page = self.pages.remove(id);
                let max_blocks = page.max_blocks();
                stats.pages_released += 1;
                stats.bytes_released += page.page_size();
                debug!(
                    "Releasing empty {} page {} ({} bytes)",
                    pool.kind(),
                    id,
                    page.page_size()
                );
                self.provider.release_page(page.into_raw(), max_blocks);

                // queued gaps may point into the released page
                if pool.partition().is_hot() {
                    self.free_lists.clear_kind(pool.kind());
                }
            }
        }
    }
}

/// Last machine word of a block still holds the canary or the poison
#[cfg(feature = "gc-memchk")]
fn canary_intact(block: &[u8]) -> bool {
    use crate::core::limits::{CANARY_BYTE, CANARY_BYTES, POISON_BYTE};
    let tail = &block[block.len().saturating_sub(CANARY_BYTES)..];
    tail.iter().all(|&b| b == CANARY_BYTE) || tail.iter().all(|&b| b == POISON_BYTE)
}
