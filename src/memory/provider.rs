/*!
 * Raw Page Provider
 * Backing memory for heap pages
 */

use super::traits::PageProvider;
use super::types::PageKind;
use crate::core::types::Size;
use log::debug;

/// A raw memory region handed out by a [`PageProvider`]
#[derive(Debug)]
pub struct RawPage {
    memory: Box<[u8]>,
    kind: PageKind,
}

impl RawPage {
    /// Wrap a region; `fill` is the byte every location starts with
    pub fn new(size: Size, kind: PageKind, fill: u8) -> Self {
        Self {
            memory: vec![fill; size].into_boxed_slice(),
            kind,
        }
    }

    #[inline]
    pub fn len(&self) -> Size {
        self.memory.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    #[inline]
    pub fn kind(&self) -> PageKind {
        self.kind
    }

    /// Start address of the region
    #[inline]
    pub fn base(&self) -> usize {
        self.memory.as_ptr() as usize
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.memory
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

/// Default provider backed by the global allocator
///
/// Pages come back zero-filled, or poisoned with `0xDD` when the
/// `gc-debug` feature is on.
#[derive(Debug, Default)]
pub struct SystemPageProvider {
    live_pages: usize,
    live_bytes: Size,
}

impl SystemPageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages currently handed out
    pub fn live_pages(&self) -> usize {
        self.live_pages
    }

    /// Bytes currently handed out
    pub fn live_bytes(&self) -> Size {
        self.live_bytes
    }
}

impl PageProvider for SystemPageProvider {
    fn allocate_page(&mut self, size: Size, kind: PageKind, max_blocks: usize) -> RawPage {
        #[cfg(feature = "gc-debug")]
        let fill = crate::core::limits::POISON_BYTE;
        #[cfg(not(feature = "gc-debug"))]
        let fill = 0;

        self.live_pages += 1;
        self.live_bytes += size;
        debug!(
            "Mapped {} byte {} page ({} blocks), {} pages live",
            size, kind, max_blocks, self.live_pages
        );
        RawPage::new(size, kind, fill)
    }

    fn release_page(&mut self, page: RawPage, max_blocks: usize) {
        self.live_pages = self.live_pages.saturating_sub(1);
        self.live_bytes = self.live_bytes.saturating_sub(page.len());
        debug!(
            "Released {} byte {} page ({} blocks), {} pages live",
            page.len(),
            page.kind(),
            max_blocks,
            self.live_pages
        );
    }
}
