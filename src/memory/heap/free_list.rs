/*!
 * Free-List Fast Path
 * Per-kind lists of short gaps in the 8-byte variable partition
 *
 * Lists are populated only while the variable allocator walks past gaps
 * that are too short for the request at hand. Each entry's first eight
 * bytes hold the encoded link to the next entry. Slot `n` holds gaps of
 * exactly `n + 1` blocks.
 */

use super::Heap;
use crate::core::limits::{GC_FREELIST_MAX, PAGE_KINDS};
use crate::memory::bitmap;
use crate::memory::partition::Classification;
use crate::memory::traits::PageProvider;
use crate::memory::types::{invariant, BlockRef, PageKind};

#[derive(Debug, Default)]
pub(crate) struct FreeLists {
    heads: [[Option<BlockRef>; GC_FREELIST_MAX]; PAGE_KINDS],
}

impl FreeLists {
    #[inline]
    pub fn slots_mut(&mut self, kind: PageKind) -> &mut [Option<BlockRef>; GC_FREELIST_MAX] {
        &mut self.heads[kind.index()]
    }

    #[inline]
    pub fn slots(&self, kind: PageKind) -> &[Option<BlockRef>; GC_FREELIST_MAX] {
        &self.heads[kind.index()]
    }

    pub fn clear_kind(&mut self, kind: PageKind) {
        self.heads[kind.index()] = [None; GC_FREELIST_MAX];
    }

    pub fn clear(&mut self) {
        for kind in PageKind::ALL {
            self.clear_kind(kind);
        }
    }
}

impl<P: PageProvider> Heap<P> {
    /// Pop a recycled gap of exactly the requested length
    pub(crate) fn freelist_pickup(
        &mut self,
        class: Classification,
        kind: PageKind,
    ) -> Option<BlockRef> {
        if !class.partition.is_hot() {
            return None;
        }
        let nblocks = class.blocks();
        let index = nblocks.checked_sub(1)?;
        if index >= GC_FREELIST_MAX {
            return None;
        }

        let block = self.free_lists.slots(kind)[index]?;
        let page = self.pages.get_mut(block.page);
        self.free_lists.slots_mut(kind)[index] = BlockRef::decode(page.read_link(block.index));

        page.clear_sizes(block.index, nblocks);
        page.set_size(block.index, nblocks as u8);
        match page.bitmap_range() {
            Some(range) => bitmap::set(&mut self.scratch[range], block.index),
            None => invariant!(false, "Free-list entry {} on a page without bitmap", block),
        }
        if kind.is_finalizer() {
            page.take_finalizer(block.index);
        }
        Some(block)
    }

    /// Entries currently queued on every list
    pub(crate) fn free_list_entries(&self) -> usize {
        let mut count = 0;
        for kind in PageKind::ALL {
            for head in self.free_lists.slots(kind) {
                let mut cursor = *head;
                while let Some(block) = cursor {
                    count += 1;
                    cursor = BlockRef::decode(self.pages.get(block.page).read_link(block.index));
                }
            }
        }
        count
    }

    /// Drop every list at a cycle boundary
    ///
    /// Debug builds poison the link words again so the gaps look untouched
    /// to the next scan.
    pub(crate) fn drain_free_lists(&mut self) {
        #[cfg(feature = "gc-debug")]
        for kind in PageKind::ALL {
            for index in 0..GC_FREELIST_MAX {
                let mut cursor = self.free_lists.slots(kind)[index];
                while let Some(block) = cursor {
                    let page = self.pages.get_mut(block.page);
                    cursor = BlockRef::decode(page.read_link(block.index));
                    page.poison(block.index, 8);
                }
            }
        }
        self.free_lists.clear();
    }
}
