/*!
 * Heap
 * Allocator context owning every page pool of one heap
 *
 * All state lives in the context: independent heaps never share pools,
 * free lists or bitmaps. The embedding collector serializes calls.
 */

mod fixed;
mod free_list;
mod gc;
mod pool;
mod var;

use self::free_list::FreeLists;
use self::pool::{PageSlab, PoolTable};
use super::config::HeapConfig;
use super::finalizer::{FinalizerFn, FinalizerRegistry};
use super::page::Page;
use super::partition::{classify, Classification};
use super::provider::SystemPageProvider;
use super::traits::{BlockAllocator, CollectorHooks, PageProvider};
use super::types::*;
use crate::core::bits;
use crate::core::types::{Address, Size};
use log::info;

/// A page-based, size-partitioned block heap
#[derive(Debug)]
pub struct Heap<P: PageProvider = SystemPageProvider> {
    config: HeapConfig,
    provider: P,
    pages: PageSlab,
    pools: PoolTable,
    free_lists: FreeLists,
    finalizers: FinalizerRegistry,
    /// Mark bitmaps of the current cycle
    scratch: Vec<u8>,
    phase: CyclePhase,
}

impl Heap<SystemPageProvider> {
    /// Create a heap backed by the global allocator
    pub fn new(config: HeapConfig) -> HeapResult<Self> {
        Self::with_provider(config, SystemPageProvider::new())
    }
}

impl<P: PageProvider> Heap<P> {
    pub fn with_provider(config: HeapConfig, provider: P) -> HeapResult<Self> {
        config.validate()?;
        invariant!(
            bits::self_check(),
            "Invalid builtin bit-scan primitives"
        );

        info!(
            "Heap initialized: {} byte pages, growth after {} pages",
            config.page_size, config.growth_threshold
        );

        Ok(Self {
            config,
            provider,
            pages: PageSlab::default(),
            pools: PoolTable::default(),
            free_lists: FreeLists::default(),
            finalizers: FinalizerRegistry::new(),
            scratch: Vec::new(),
            phase: CyclePhase::Allocating,
        })
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Allocate a block of at least `size` bytes in a `kind` page
    pub fn alloc(&mut self, size: Size, kind: PageKind) -> HeapResult<BlockRef> {
        #[cfg(feature = "gc-memchk")]
        let size = match size {
            0 if self.config.zero_size == super::config::ZeroSizePolicy::Reject => {
                return Err(HeapError::ClassificationOverflow { size });
            }
            n => n
                .checked_add(crate::core::limits::CANARY_BYTES)
                .ok_or(HeapError::ClassificationOverflow { size })?,
        };

        let class = classify(size, kind, self.config.zero_size)?;
        let block = self.alloc_classified(class, kind);

        #[cfg(feature = "gc-memchk")]
        self.write_canary(block);

        Ok(block)
    }

    pub(crate) fn alloc_classified(&mut self, class: Classification, kind: PageKind) -> BlockRef {
        if class.partition.is_fixed() {
            return self.alloc_fixed(class.partition, kind);
        }
        match self.freelist_pickup(class, kind) {
            Some(block) => block,
            None => self.alloc_var(class.partition, class.size, kind),
        }
    }

    #[cfg(feature = "gc-memchk")]
    fn write_canary(&mut self, block: BlockRef) {
        use crate::core::limits::{CANARY_BYTE, CANARY_BYTES};
        let page = self.pages.get_mut(block.page);
        let span = page.span(block.index);
        page.bytes_mut(block.index, span)[span - CANARY_BYTES..].fill(CANARY_BYTE);
    }

    /// Page of a live block, with the block checked against its layout
    fn live_page(&self, block: BlockRef) -> HeapResult<&Page> {
        match self.pages.try_get(block.page) {
            Some(page)
                if page.in_range(block.index)
                    && (!page.has_sizes() || page.size_at(block.index) != 0) =>
            {
                Ok(page)
            }
            _ => Err(HeapError::UnknownBlock(block)),
        }
    }

    fn live_page_mut(&mut self, block: BlockRef) -> HeapResult<&mut Page> {
        self.live_page(block)?;
        Ok(self.pages.get_mut(block.page))
    }

    pub fn address_of(&self, block: BlockRef) -> HeapResult<Address> {
        Ok(self.live_page(block)?.address_of(block.index))
    }

    /// Bytes covered by a block: its whole run in variable pages
    pub fn block_size(&self, block: BlockRef) -> HeapResult<Size> {
        Ok(self.live_page(block)?.span(block.index))
    }

    /// Run length recorded for a block, `None` on fixed pages
    pub fn run_length(&self, block: BlockRef) -> Option<u8> {
        let page = self.pages.try_get(block.page)?;
        (page.has_sizes() && page.in_range(block.index)).then(|| page.size_at(block.index))
    }

    pub fn block_bytes(&self, block: BlockRef) -> HeapResult<&[u8]> {
        let page = self.live_page(block)?;
        Ok(page.bytes(block.index, page.span(block.index)))
    }

    pub fn block_bytes_mut(&mut self, block: BlockRef) -> HeapResult<&mut [u8]> {
        let page = self.live_page_mut(block)?;
        let span = page.span(block.index);
        Ok(page.bytes_mut(block.index, span))
    }

    /// Block starting exactly at `addr`
    pub fn block_id(&self, addr: Address) -> Option<BlockRef> {
        let (id, page) = self.page_containing(addr)?;
        page.block_index(addr).map(|bid| BlockRef::new(id, bid))
    }

    /// Block whose run covers `addr`
    pub fn block_interior(&self, addr: Address) -> Option<BlockRef> {
        let (id, page) = self.page_containing(addr)?;
        page.interior_index(addr).map(|bid| BlockRef::new(id, bid))
    }

    fn page_containing(&self, addr: Address) -> Option<(PageId, &Page)> {
        self.pages.find(addr)
    }

    pub fn page_info(&self, id: PageId) -> Option<PageInfo> {
        self.pages.try_get(id).map(|page| page.info(id))
    }

    /// Pages of one pool in traversal order
    pub fn pool_info(&self, partition: PartitionId, kind: PageKind) -> Vec<PageInfo> {
        self.pool_pages(PoolId::new(partition, kind))
            .map(|(id, page)| page.info(id))
            .collect()
    }

    pub fn register_finalizer(&mut self, finalizer: FinalizerFn) -> FinalizerId {
        self.finalizers.register(finalizer)
    }

    /// Attach a registered finalizer to a block of a finalizer page
    pub fn set_finalizer(&mut self, block: BlockRef, finalizer: FinalizerId) -> HeapResult<()> {
        if !self.finalizers.contains(finalizer) {
            return Err(HeapError::InvariantViolation(format!(
                "unregistered finalizer {:?}",
                finalizer
            )));
        }
        let page = self.live_page_mut(block)?;
        if !page.kind().is_finalizer() {
            return Err(HeapError::NotFinalizable(block));
        }
        page.attach_finalizer(block.index, finalizer);
        Ok(())
    }

    /// Scratch bytes the next `before_mark` needs
    pub fn required_mark_bytes(&self) -> usize {
        self.pages.iter().map(|(_, page)| page.bitmap_bytes()).sum()
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            free_list_entries: self.free_list_entries(),
            ..HeapStats::default()
        };
        for pool in PoolId::all() {
            let (pages, bytes) = self
                .pool_pages(pool)
                .fold((0, 0), |(n, b), (_, page)| (n + 1, b + page.page_size()));
            if pages == 0 {
                continue;
            }
            stats.pools.push(PoolStats {
                partition: pool.partition(),
                kind: pool.kind(),
                block_size: pool.partition().block_size(),
                pages,
                bytes,
            });
            stats.total_pages += pages;
            stats.total_bytes += bytes;
        }
        stats
    }
}

impl<P: PageProvider> BlockAllocator for Heap<P> {
    fn allocate(&mut self, size: Size, kind: PageKind) -> HeapResult<BlockRef> {
        self.alloc(size, kind)
    }

    fn address_of(&self, block: BlockRef) -> HeapResult<Address> {
        Heap::address_of(self, block)
    }

    fn block_size(&self, block: BlockRef) -> HeapResult<Size> {
        Heap::block_size(self, block)
    }
}

impl<P: PageProvider> CollectorHooks for Heap<P> {
    fn before_mark(&mut self, scratch: Vec<u8>) -> HeapResult<Vec<u8>> {
        Heap::before_mark(self, scratch)
    }

    fn mark(&mut self, block: BlockRef) -> HeapResult<()> {
        Heap::mark(self, block)
    }

    fn after_mark(&mut self) -> SweepStats {
        Heap::after_mark(self)
    }
}
