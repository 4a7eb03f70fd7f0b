/*!
 * Variable-Block Allocation
 * Runs of contiguous blocks, with run lengths kept in the size-byte table
 *
 * Only the first block of a run gets a bitmap bit. A scan alternates
 * between used runs, skipped through the size-byte table, and free runs,
 * counted with trailing-zero scans until one is long enough.
 */

use super::Heap;
use crate::core::bits::{trailing_ones, trailing_zeroes};
use crate::core::limits::GC_FREELIST_MAX;
use crate::core::types::Size;
use crate::memory::bitmap;
use crate::memory::page::Page;
use crate::memory::traits::PageProvider;
use crate::memory::types::{invariant, BlockRef, PageId, PageKind, PartitionId, PoolId};

/// Free-list slots that short gaps are spilled into
pub(crate) type Spill<'a> = Option<&'a mut [Option<BlockRef>; GC_FREELIST_MAX]>;

/// Look for `nblocks` free blocks from the page cursor
///
/// On success the cursor points at the start of the run. Otherwise it is
/// left past everything scanned so later calls in this cycle skip it.
/// Gaps too short for this request are pushed to `spill` when given.
pub(crate) fn find_run(
    page: &mut Page,
    id: PageId,
    bits: &[u8],
    nblocks: usize,
    mut spill: Spill<'_>,
) -> bool {
    let max = page.max_blocks();
    let mut next = page.next_block;
    if next + nblocks > max {
        return false;
    }

    let mut avail = 0;
    loop {
        let fid = next >> 5;
        let fetch = bitmap::word(bits, fid);
        loop {
            let shift = next & 31;
            let ones = trailing_ones(fetch >> shift) as usize;
            if ones > 0 {
                if avail > 0 && avail <= GC_FREELIST_MAX {
                    if let Some(slots) = spill.as_deref_mut() {
                        let start = next - avail;
                        page.write_link(start, BlockRef::encode(slots[avail - 1]));
                        slots[avail - 1] = Some(BlockRef::new(id, start));
                    }
                }
                avail = 0;

                // last run start of the marked stretch
                next += ones - 1;
                if next >= max {
                    page.next_block = max;
                    return false;
                }
                let run = page.size_at(next) as usize;
                invariant!(
                    run != 0,
                    "Marked block {} of {} has no recorded run",
                    next,
                    id
                );
                next += run;
                if next + nblocks > max {
                    page.next_block = next.min(max);
                    return false;
                }
                if next >> 5 != fid {
                    break;
                }
                continue;
            }

            // cap the count at the end of the fetched word
            let capped = if shift != 0 {
                (fetch >> shift) | (1 << (32 - shift))
            } else {
                fetch
            };
            let zeros = trailing_zeroes(capped) as usize;
            avail += zeros;
            next += zeros;
            if next > max {
                avail -= next - max;
                next = max;
                if avail < nblocks {
                    page.next_block = next;
                    return false;
                }
            }
            if avail >= nblocks {
                page.next_block = next - avail;
                return true;
            }
            if next & 31 == 0 {
                break;
            }
        }
    }
}

#[inline]
pub(crate) fn run_byte(nblocks: usize) -> u8 {
    match u8::try_from(nblocks) {
        Ok(run) => run,
        Err(_) => crate::memory::types::fatal(crate::memory::types::HeapError::InvariantViolation(
            format!("run of {} blocks does not fit the size table", nblocks),
        )),
    }
}

impl<P: PageProvider> Heap<P> {
    pub(crate) fn alloc_var(&mut self, part: PartitionId, size: Size, kind: PageKind) -> BlockRef {
        let pool = PoolId::new(part, kind);
        let nblocks = part.blocks_for(size);
        let mut cursor = self.pools.free(pool);
        let mut found: Option<PageId> = None;

        while let Some(id) = cursor {
            let page = self.pages.get_mut(id);
            let fits = match page.bitmap_range() {
                Some(range) => {
                    let spill = if part.is_hot() {
                        Some(self.free_lists.slots_mut(kind))
                    } else {
                        None
                    };
                    find_run(page, id, &self.scratch[range], nblocks, spill)
                }
                None => page.next_block + nblocks <= page.max_blocks(),
            };
            if fits {
                found = Some(id);
                break;
            }
            cursor = page.next_page;
        }

        let id = match found {
            Some(id) => id,
            None => {
                let mut page_size = self.config.page_size;
                while page_size < size + self.config.large_page_padding {
                    page_size <<= 1;
                }
                self.new_page(pool, part.block_size(), page_size, kind, true)
            }
        };

        let page = self.pages.get_mut(id);
        let bid = page.next_block;

        #[cfg(feature = "gc-debug")]
        {
            invariant!(
                bid >= page.first_block() && bid + nblocks <= page.max_blocks(),
                "Run {}+{} outside {}..{} of {}",
                bid,
                nblocks,
                page.first_block(),
                page.max_blocks(),
                id
            );
            invariant!(
                page.is_poisoned(bid, size),
                "Run at {} of {} was not poisoned",
                bid,
                id
            );
        }

        if let Some(range) = page.bitmap_range() {
            let bits = &mut self.scratch[range];
            #[cfg(feature = "gc-debug")]
            for b in bid..bid + nblocks {
                invariant!(
                    !bitmap::test(bits, b),
                    "Alloc on marked block {} of {}",
                    b,
                    id
                );
            }
            bitmap::set(bits, bid);
        }

        if nblocks > 1 {
            page.clear_sizes(bid, nblocks);
        }
        page.set_size(bid, run_byte(nblocks));
        page.next_block += nblocks;
        if kind.is_finalizer() {
            page.take_finalizer(bid);
        }

        self.pools.set_free(pool, Some(id));
        BlockRef::new(id, bid)
    }
}
