/*!
 * Memory Types
 * Common types for the block allocator
 */

use crate::core::limits::{GC_FIXED_PARTS, GC_PARTITIONS, PAGE_KINDS, PAGE_KIND_BITS};
use crate::core::types::Size;
use log::error;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Allocator operation result
pub type HeapResult<T> = Result<T, HeapError>;

/// Allocator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("Required memory allocation too big: {size} bytes cannot be mapped to any partition")]
    ClassificationOverflow { size: Size },

    #[error("Allocator invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid heap configuration: {0}")]
    InvalidConfig(String),

    #[error("Mark scratch buffer too small: {required} bytes required, {provided} provided")]
    ScratchTooSmall { required: Size, provided: Size },

    #[error("Address 0x{0:x} does not belong to any live block")]
    UnknownAddress(usize),

    #[error("Unknown block {0}")]
    UnknownBlock(BlockRef),

    #[error("Block {0} does not live in a finalizer page")]
    NotFinalizable(BlockRef),
}

/// Report an unrecoverable allocator fault and abort the current operation
#[cold]
#[track_caller]
pub(crate) fn fatal(err: HeapError) -> ! {
    error!("{}", err);
    panic!("{}", err)
}

/// Abort with `InvariantViolation` unless the condition holds
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::memory::types::fatal($crate::memory::types::HeapError::InvariantViolation(
                format!($($arg)+),
            ));
        }
    };
}
pub(crate) use invariant;

/// Page kind tag, orthogonal to the size partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PageKind {
    /// Ordinary blocks that may hold references
    Dynamic = 0,
    /// Raw blocks scanned conservatively
    Raw = 1,
    /// Blocks known to hold no references
    NoPtr = 2,
    /// Blocks carrying a finalizer
    Finalizer = 3,
}

impl PageKind {
    /// Every kind, in tag order
    pub const ALL: [PageKind; PAGE_KINDS] = [
        PageKind::Dynamic,
        PageKind::Raw,
        PageKind::NoPtr,
        PageKind::Finalizer,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index & (PAGE_KINDS - 1)]
    }

    #[inline]
    pub fn is_finalizer(self) -> bool {
        self == PageKind::Finalizer
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PageKind::Dynamic => write!(f, "dynamic"),
            PageKind::Raw => write!(f, "raw"),
            PageKind::NoPtr => write!(f, "noptr"),
            PageKind::Finalizer => write!(f, "finalizer"),
        }
    }
}

/// Index into the partition table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId(pub(crate) u8);

impl PartitionId {
    pub fn new(index: usize) -> Option<Self> {
        (index < GC_PARTITIONS).then(|| Self(index as u8))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-block partitions
    #[inline]
    pub fn is_fixed(self) -> bool {
        self.index() < GC_FIXED_PARTS
    }

    /// Partition with the largest blocks
    #[inline]
    pub fn is_largest(self) -> bool {
        self.index() == GC_PARTITIONS - 1
    }
}

/// Identifies one `(partition, kind)` page pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PoolId(usize);

impl PoolId {
    #[inline]
    pub fn new(partition: PartitionId, kind: PageKind) -> Self {
        Self((partition.index() << PAGE_KIND_BITS) | kind.index())
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub fn partition(self) -> PartitionId {
        PartitionId((self.0 >> PAGE_KIND_BITS) as u8)
    }

    #[inline]
    pub fn kind(self) -> PageKind {
        PageKind::from_index(self.0)
    }

    /// Pools that release fully empty pages after a sweep
    ///
    /// Small, common pools stay resident to avoid page churn.
    #[inline]
    pub fn releases_empty_pages(self) -> bool {
        self.kind().is_finalizer() || self.partition().is_largest()
    }

    pub fn all() -> impl Iterator<Item = PoolId> {
        (0..crate::core::limits::GC_ALL_PAGES).map(PoolId)
    }
}

/// Slot of a page inside a heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub(crate) u32);

impl PageId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// A block inside a page: the unit every allocation is named by
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub page: PageId,
    pub index: usize,
}

impl BlockRef {
    pub fn new(page: PageId, index: usize) -> Self {
        Self { page, index }
    }

    const NONE: u64 = u64::MAX;

    /// Encode an optional block as one machine-independent word
    pub(crate) fn encode(block: Option<BlockRef>) -> u64 {
        match block {
            Some(b) => ((b.page.0 as u64) << 32) | (b.index as u64 & 0xFFFF_FFFF),
            None => Self::NONE,
        }
    }

    pub(crate) fn decode(word: u64) -> Option<BlockRef> {
        (word != Self::NONE).then(|| BlockRef {
            page: PageId((word >> 32) as u32),
            index: (word & 0xFFFF_FFFF) as usize,
        })
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({}, index={})", self.page, self.index)
    }
}

/// Handle to a registered finalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FinalizerId(pub(crate) u32);

/// Heap phase across a collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Mutator is allocating; bitmaps describe the last mark
    Allocating,
    /// Between `before_mark` and `after_mark`
    Marking,
}

/// Read-only view of a page's layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub id: PageId,
    pub kind: PageKind,
    pub partition: PartitionId,
    pub base: usize,
    pub page_size: Size,
    pub block_size: Size,
    pub max_blocks: usize,
    pub first_block: usize,
    pub next_block: usize,
    pub has_bitmap: bool,
}

/// Per-pool statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PoolStats {
    pub partition: PartitionId,
    pub kind: PageKind,
    pub block_size: Size,
    pub pages: usize,
    pub bytes: Size,
}

/// Heap statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HeapStats {
    pub pools: Vec<PoolStats>,
    pub total_pages: usize,
    pub total_bytes: Size,
    pub free_list_entries: usize,
}

/// Statistics of one `after_mark` sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SweepStats {
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub finalizers_run: usize,
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub blocks_poisoned: usize,
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub pages_released: usize,
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub bytes_released: Size,
    #[serde(default)]
    pub duration_us: u64,
}

impl SweepStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the sweep gave anything back
    pub fn reclaimed_any(&self) -> bool {
        self.pages_released > 0 || self.finalizers_run > 0
    }
}

fn is_zero_usize(v: &usize) -> bool {
    *v == 0
}
