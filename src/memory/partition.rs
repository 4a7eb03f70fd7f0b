/*!
 * Size Classifier
 * Maps a request to its partition and normalized size
 */

use super::config::ZeroSizePolicy;
use super::types::{HeapError, HeapResult, PageKind, PartitionId};
use crate::core::limits::{
    GC_ALIGN, GC_ALIGN_BITS, GC_FIXED_PARTS, GC_HOT_PARTITION, GC_MAX_RUN, GC_PARTITIONS,
    GC_SBITS, GC_SIZES,
};
use crate::core::types::{align_up, Size};

/// One size class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub block_size: Size,
    pub shift_bits: u32,
}

impl Partition {
    /// Normalized requests must stay below this to fit one run
    #[inline]
    pub fn run_limit(&self) -> Size {
        self.block_size * GC_MAX_RUN
    }
}

impl PartitionId {
    /// Static description of this partition
    #[inline]
    pub fn partition(self) -> Partition {
        Partition {
            block_size: GC_SIZES[self.index()],
            shift_bits: GC_SBITS[self.index()],
        }
    }

    #[inline]
    pub fn block_size(self) -> Size {
        self.partition().block_size
    }

    /// Variable partition served by the free-list fast path
    #[inline]
    pub fn is_hot(self) -> bool {
        self.index() == GC_HOT_PARTITION
    }

    /// Blocks a normalized request spans in this partition
    #[inline]
    pub fn blocks_for(self, size: Size) -> usize {
        size >> self.partition().shift_bits
    }
}

/// Result of classifying a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub partition: PartitionId,
    /// Request rounded up to what the partition hands out
    pub size: Size,
}

impl Classification {
    /// Blocks this allocation spans
    pub fn blocks(&self) -> usize {
        if self.partition.is_fixed() {
            1
        } else {
            self.partition.blocks_for(self.size)
        }
    }
}

/// Map a requested size and kind to a partition
///
/// Requests no larger than the biggest fixed block go to the smallest
/// fitting fixed partition, unless they carry a finalizer. Everything else
/// goes to the first variable partition whose run stays under the one-byte
/// run-length cap.
pub fn classify(size: Size, kind: PageKind, zero: ZeroSizePolicy) -> HeapResult<Classification> {
    let overflow = || HeapError::ClassificationOverflow { size };

    let requested = match (size, zero) {
        (0, ZeroSizePolicy::Reject) => return Err(overflow()),
        (0, ZeroSizePolicy::SmallestBlock) => GC_ALIGN,
        (n, _) => n,
    };
    let sz = align_up(requested, GC_ALIGN).ok_or_else(overflow)?;

    if sz <= GC_SIZES[GC_FIXED_PARTS - 1] && !kind.is_finalizer() {
        let partition = PartitionId(((sz >> GC_ALIGN_BITS) - 1) as u8);
        return Ok(Classification {
            partition,
            size: partition.block_size(),
        });
    }

    for index in GC_FIXED_PARTS..GC_PARTITIONS {
        let partition = PartitionId(index as u8);
        let class = partition.partition();
        let Some(query) = align_up(sz, class.block_size) else {
            continue;
        };
        if query < class.run_limit() {
            return Ok(Classification {
                partition,
                size: query,
            });
        }
    }

    Err(overflow())
}
