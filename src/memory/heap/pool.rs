/*!
 * Page Pools
 * Page storage, per-(partition, kind) page lists and page creation
 */

use super::Heap;
use crate::core::limits::{GC_ALL_PAGES, GC_PAGE_SIZE, PAGE_GROWTH_MAX_BLOCK};
use crate::core::types::{Address, Size};
use crate::memory::page::Page;
use crate::memory::traits::PageProvider;
use crate::memory::types::{invariant, PageId, PageKind, PartitionId, PoolId};
use log::debug;
use std::collections::BTreeMap;

/// Slab of pages addressed by [`PageId`]; vacated slots are reused
///
/// `by_base` orders live pages by base address for pointer lookups.
#[derive(Debug, Default)]
pub(crate) struct PageSlab {
    slots: Vec<Option<Page>>,
    vacant: Vec<PageId>,
    by_base: BTreeMap<Address, PageId>,
}

impl PageSlab {
    pub fn insert(&mut self, page: Page) -> PageId {
        let base = page.base();
        let id = match self.vacant.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(page);
                id
            }
            None => {
                let id = PageId(self.slots.len() as u32);
                self.slots.push(Some(page));
                id
            }
        };
        self.by_base.insert(base, id);
        id
    }

    pub fn remove(&mut self, id: PageId) -> Page {
        let page = self.slots.get_mut(id.index()).and_then(Option::take);
        match page {
            Some(page) => {
                self.vacant.push(id);
                self.by_base.remove(&page.base());
                page
            }
            None => crate::memory::types::fatal(
                crate::memory::types::HeapError::InvariantViolation(format!(
                    "removing vacant {}",
                    id
                )),
            ),
        }
    }

    #[inline]
    pub fn try_get(&self, id: PageId) -> Option<&Page> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn try_get_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Page reached through a pool link; a dangling link is fatal
    #[inline]
    pub fn get(&self, id: PageId) -> &Page {
        match self.try_get(id) {
            Some(page) => page,
            None => dangling(id),
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: PageId) -> &mut Page {
        match self.try_get_mut(id) {
            Some(page) => page,
            None => dangling(id),
        }
    }

    /// Live page whose allocatable range covers `addr`
    pub fn find(&self, addr: Address) -> Option<(PageId, &Page)> {
        let (_, &id) = self.by_base.range(..=addr).next_back()?;
        let page = self.get(id);
        page.contains(addr).then_some((id, page))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PageId, &Page)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (PageId(i as u32), p)))
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }
}

#[cold]
fn dangling(id: PageId) -> ! {
    crate::memory::types::fatal(crate::memory::types::HeapError::InvariantViolation(format!(
        "pool link to vacant {}",
        id
    )))
}

/// Heads of the page list of every pool
///
/// `all` is the list itself, most recent page first. `free` is a cursor
/// into the same list: the first page that may still have room this cycle.
#[derive(Debug)]
pub(crate) struct PoolTable {
    all: [Option<PageId>; GC_ALL_PAGES],
    free: [Option<PageId>; GC_ALL_PAGES],
}

impl Default for PoolTable {
    fn default() -> Self {
        Self {
            all: [None; GC_ALL_PAGES],
            free: [None; GC_ALL_PAGES],
        }
    }
}

impl PoolTable {
    #[inline]
    pub fn head(&self, pool: PoolId) -> Option<PageId> {
        self.all[pool.index()]
    }

    #[inline]
    pub fn set_head(&mut self, pool: PoolId, page: Option<PageId>) {
        self.all[pool.index()] = page;
    }

    #[inline]
    pub fn free(&self, pool: PoolId) -> Option<PageId> {
        self.free[pool.index()]
    }

    #[inline]
    pub fn set_free(&mut self, pool: PoolId, page: Option<PageId>) {
        self.free[pool.index()] = page;
    }
}

impl<P: PageProvider> Heap<P> {
    /// Walk a pool's page list
    pub(crate) fn pool_pages(&self, pool: PoolId) -> PoolIter<'_> {
        PoolIter {
            pages: &self.pages,
            cursor: self.pools.head(pool),
        }
    }

    /// Map a fresh page for `pool` and push it at the head of the pool
    ///
    /// Pools of small blocks that already hold many pages get bigger pages
    /// so that page count grows sub-linearly.
    pub(crate) fn new_page(
        &mut self,
        pool: PoolId,
        block: Size,
        mut size: Size,
        kind: PageKind,
        varsize: bool,
    ) -> PageId {
        if block < PAGE_GROWTH_MAX_BLOCK {
            let mut num_pages = self.pool_pages(pool).count();
            while num_pages > self.config.growth_threshold && (size << 1) / block <= GC_PAGE_SIZE {
                size <<= 1;
                num_pages /= 3;
            }
        }

        let max_blocks = size / block;
        let raw = self.provider.allocate_page(size, kind, max_blocks);
        invariant!(
            raw.len() == size && raw.kind() == kind,
            "page provider returned {} bytes of kind {} for a {} byte {} request",
            raw.len(),
            raw.kind(),
            size,
            kind
        );

        let partition: PartitionId = pool.partition();
        let mut page = Page::new(raw, partition, block, varsize);
        page.next_page = self.pools.head(pool);
        let id = self.pages.insert(page);
        self.pools.set_head(pool, Some(id));

        debug!(
            "New {} page {} for partition {} ({} bytes, {} blocks of {} bytes)",
            kind,
            id,
            partition.index(),
            size,
            max_blocks,
            block
        );
        id
    }
}

/// Iterator over the pages of one pool, head first
pub(crate) struct PoolIter<'a> {
    pages: &'a PageSlab,
    cursor: Option<PageId>,
}

impl<'a> Iterator for PoolIter<'a> {
    type Item = (PageId, &'a Page);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let page = self.pages.get(id);
        self.cursor = page.next_page;
        Some((id, page))
    }
}
