/*!
 * Heap Pages
 * Block layout, size-byte table and address accessors of one page
 *
 * A page is a raw region split into `max_blocks` blocks of `block_size`
 * bytes. Variable pages keep a one-byte-per-block run-length table; for
 * more than eight blocks it sits at the start of the region and the blocks
 * it overlaps (everything before `first_block`) are never handed out.
 */

use super::bitmap;
use super::provider::RawPage;
use super::types::{invariant, FinalizerId, PageId, PageInfo, PageKind, PartitionId};
use crate::core::limits::{GC_PAGE_SIZE, INLINE_SIZE_TABLE};
use crate::core::types::{Address, Size};
use ahash::HashMap;
use std::ops::Range;

/// Where a variable page keeps its run lengths
#[derive(Debug)]
enum SizeTable {
    Inline([u8; INLINE_SIZE_TABLE]),
    Header,
}

#[derive(Debug)]
pub(crate) struct Page {
    raw: RawPage,
    partition: PartitionId,
    block_size: Size,
    max_blocks: usize,
    first_block: usize,
    /// Scan cursor, reset to `first_block` every cycle
    pub(crate) next_block: usize,
    sizes: Option<SizeTable>,
    /// Byte range of this page's bitmap inside the heap's scratch buffer
    bmp: Option<Range<usize>>,
    /// Next page in the pool
    pub(crate) next_page: Option<PageId>,
    finalizers: HashMap<usize, FinalizerId>,
}

impl Page {
    /// Lay out blocks over a freshly provided region
    pub(crate) fn new(
        mut raw: RawPage,
        partition: PartitionId,
        block_size: Size,
        varsize: bool,
    ) -> Self {
        let max_blocks = raw.len() / block_size;
        invariant!(
            max_blocks <= GC_PAGE_SIZE,
            "Too many blocks for this page ({} blocks of {} bytes)",
            max_blocks,
            block_size
        );

        let mut start_pos = 0;
        let sizes = if !varsize {
            None
        } else if max_blocks <= INLINE_SIZE_TABLE {
            Some(SizeTable::Inline([0; INLINE_SIZE_TABLE]))
        } else {
            raw.bytes_mut()[..max_blocks].fill(0);
            start_pos += max_blocks;
            Some(SizeTable::Header)
        };
        let rem = start_pos % block_size;
        if rem != 0 {
            start_pos += block_size - rem;
        }
        let first_block = start_pos / block_size;
        invariant!(
            first_block < max_blocks,
            "Size table leaves no blocks in a {} byte page",
            raw.len()
        );

        Self {
            raw,
            partition,
            block_size,
            max_blocks,
            first_block,
            next_block: first_block,
            sizes,
            bmp: None,
            next_page: None,
            finalizers: HashMap::default(),
        }
    }

    #[inline]
    pub(crate) fn block_size(&self) -> Size {
        self.block_size
    }

    #[inline]
    pub(crate) fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    #[inline]
    pub(crate) fn first_block(&self) -> usize {
        self.first_block
    }

    #[inline]
    pub(crate) fn page_size(&self) -> Size {
        self.raw.len()
    }

    #[inline]
    pub(crate) fn kind(&self) -> PageKind {
        self.raw.kind()
    }

    #[inline]
    pub(crate) fn base(&self) -> Address {
        self.raw.base()
    }

    pub(crate) fn info(&self, id: PageId) -> PageInfo {
        PageInfo {
            id,
            kind: self.kind(),
            partition: self.partition,
            base: self.base(),
            page_size: self.page_size(),
            block_size: self.block_size(),
            max_blocks: self.max_blocks,
            first_block: self.first_block,
            next_block: self.next_block,
            has_bitmap: self.bmp.is_some(),
        }
    }

    pub(crate) fn into_raw(self) -> RawPage {
        self.raw
    }

    // --- size-byte table ---

    #[inline]
    pub(crate) fn has_sizes(&self) -> bool {
        self.sizes.is_some()
    }

    /// Run length recorded at `bid`, 0 if it does not start a run
    #[inline]
    pub(crate) fn size_at(&self, bid: usize) -> u8 {
        match &self.sizes {
            Some(SizeTable::Inline(table)) => table[bid],
            Some(SizeTable::Header) => self.raw.bytes()[bid],
            None => 0,
        }
    }

    #[inline]
    pub(crate) fn set_size(&mut self, bid: usize, run: u8) {
        match &mut self.sizes {
            Some(SizeTable::Inline(table)) => table[bid] = run,
            Some(SizeTable::Header) => self.raw.bytes_mut()[bid] = run,
            None => invariant!(false, "Size table write on a fixed page"),
        }
    }

    /// Zero the run lengths of `bid..bid + count`
    pub(crate) fn clear_sizes(&mut self, bid: usize, count: usize) {
        match &mut self.sizes {
            Some(SizeTable::Inline(table)) => table[bid..bid + count].fill(0),
            Some(SizeTable::Header) => self.raw.bytes_mut()[bid..bid + count].fill(0),
            None => invariant!(false, "Size table write on a fixed page"),
        }
    }

    // --- bitmap slot ---

    #[inline]
    pub(crate) fn bitmap_range(&self) -> Option<Range<usize>> {
        self.bmp.clone()
    }

    #[inline]
    pub(crate) fn bitmap_bytes(&self) -> usize {
        bitmap::bytes_for(self.max_blocks)
    }

    pub(crate) fn assign_bitmap(&mut self, offset: usize) -> usize {
        let len = self.bitmap_bytes();
        self.bmp = Some(offset..offset + len);
        len
    }

    // --- addressing ---

    #[inline]
    pub(crate) fn address_of(&self, bid: usize) -> Address {
        self.base() + bid * self.block_size()
    }

    #[inline]
    pub(crate) fn contains(&self, addr: Address) -> bool {
        let base = self.base();
        addr >= base && addr < base + self.max_blocks * self.block_size
    }

    /// Block starting exactly at `addr`
    ///
    /// `None` unless `addr` is block aligned, inside the allocatable range
    /// and, on variable pages, the start of a recorded run.
    pub(crate) fn block_index(&self, addr: Address) -> Option<usize> {
        let offset = addr.checked_sub(self.base())?;
        if offset % self.block_size != 0 {
            return None;
        }
        let bid = offset / self.block_size;
        if bid < self.first_block || bid >= self.max_blocks {
            return None;
        }
        if self.has_sizes() && self.size_at(bid) == 0 {
            return None;
        }
        Some(bid)
    }

    /// Block whose run covers `addr`
    pub(crate) fn interior_index(&self, addr: Address) -> Option<usize> {
        let offset = addr.checked_sub(self.base())?;
        let mut bid = offset / self.block_size;
        if bid < self.first_block || bid >= self.max_blocks {
            return None;
        }
        if self.has_sizes() {
            while self.size_at(bid) == 0 {
                if bid == self.first_block {
                    return None;
                }
                bid -= 1;
            }
            if bid + self.size_at(bid) as usize <= offset / self.block_size {
                return None;
            }
        }
        Some(bid)
    }

    #[inline]
    pub(crate) fn in_range(&self, bid: usize) -> bool {
        bid >= self.first_block && bid < self.max_blocks
    }

    /// Bytes covered by the block at `bid`
    #[inline]
    pub(crate) fn span(&self, bid: usize) -> Size {
        if self.has_sizes() {
            self.size_at(bid) as usize * self.block_size()
        } else {
            self.block_size()
        }
    }

    pub(crate) fn bytes(&self, bid: usize, len: Size) -> &[u8] {
        let start = bid * self.block_size;
        &self.raw.bytes()[start..start + len]
    }

    pub(crate) fn bytes_mut(&mut self, bid: usize, len: Size) -> &mut [u8] {
        let start = bid * self.block_size;
        &mut self.raw.bytes_mut()[start..start + len]
    }

    // --- intrusive free-list links ---

    pub(crate) fn write_link(&mut self, bid: usize, link: u64) {
        self.bytes_mut(bid, 8).copy_from_slice(&link.to_le_bytes());
    }

    pub(crate) fn read_link(&self, bid: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.bytes(bid, 8));
        u64::from_le_bytes(buf)
    }

    // --- finalizers ---

    pub(crate) fn attach_finalizer(&mut self, bid: usize, id: FinalizerId) {
        self.finalizers.insert(bid, id);
    }

    pub(crate) fn take_finalizer(&mut self, bid: usize) -> Option<FinalizerId> {
        self.finalizers.remove(&bid)
    }

    // --- debug poisoning ---

    #[cfg(feature = "gc-debug")]
    pub(crate) fn is_poisoned(&self, bid: usize, len: Size) -> bool {
        self.bytes(bid, len)
            .iter()
            .all(|&b| b == crate::core::limits::POISON_BYTE)
    }

    #[cfg(feature = "gc-debug")]
    pub(crate) fn poison(&mut self, bid: usize, len: Size) {
        self.bytes_mut(bid, len)
            .fill(crate::core::limits::POISON_BYTE);
    }
}
