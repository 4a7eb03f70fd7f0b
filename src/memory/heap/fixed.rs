/*!
 * Fixed-Block Allocation
 * One block per allocation, found by skipping marked runs in the bitmap
 */

use super::Heap;
use crate::core::bits::trailing_ones;
use crate::memory::bitmap;
use crate::memory::page::Page;
use crate::memory::traits::PageProvider;
use crate::memory::types::{BlockRef, PageId, PageKind, PartitionId, PoolId};

/// Advance the cursor past marked blocks; true if a free block remains
fn skip_marked(page: &mut Page, bits: &[u8]) -> bool {
    let max = page.max_blocks();
    let mut next = page.next_block;
    loop {
        let fetch = bitmap::word(bits, next >> 5);
        let ones = trailing_ones(fetch >> (next & 31)) as usize;
        next += ones;
        // run reached the end of the word, keep going in the next one
        if next & 31 == 0 && ones > 0 && next < max {
            continue;
        }
        page.next_block = next.min(max);
        return next < max;
    }
}

impl<P: PageProvider> Heap<P> {
    pub(crate) fn alloc_fixed(&mut self, part: PartitionId, kind: PageKind) -> BlockRef {
        let pool = PoolId::new(part, kind);
        let mut cursor = self.pools.free(pool);
        let mut found: Option<PageId> = None;

        while let Some(id) = cursor {
            let page = self.pages.get_mut(id);
            let has_room = match page.bitmap_range() {
                Some(range) => skip_marked(page, &self.scratch[range]),
                None => page.next_block < page.max_blocks(),
            };
            if has_room {
                found = Some(id);
                break;
            }
            cursor = page.next_page;
        }

        let id = match found {
            Some(id) => id,
            None => {
                let page_size = self.config.page_size;
                self.new_page(pool, part.block_size(), page_size, kind, false)
            }
        };

        let page = self.pages.get_mut(id);
        let bid = page.next_block;

        #[cfg(feature = "gc-debug")]
        {
            use crate::memory::types::invariant;
            invariant!(
                page.in_range(bid),
                "Fixed block {} outside {}..{} of {}",
                bid,
                page.first_block(),
                page.max_blocks(),
                id
            );
            if let Some(range) = page.bitmap_range() {
                invariant!(
                    !bitmap::test(&self.scratch[range], bid),
                    "Alloc on marked bit {} of {}",
                    bid,
                    id
                );
            }
            invariant!(
                page.is_poisoned(bid, page.block_size()),
                "Fixed block {} of {} was not poisoned",
                bid,
                id
            );
        }

        page.next_block += 1;
        self.pools.set_free(pool, Some(id));
        BlockRef::new(id, bid)
    }
}
