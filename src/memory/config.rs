/*!
 * Heap Configuration
 * Runtime tuning knobs layered over the build-time limits
 */

use super::types::{HeapError, HeapResult};
use crate::core::limits::{
    GC_PAGE_SIZE, LARGE_PAGE_PADDING, MIN_PAGE_SIZE, PAGE_GROWTH_THRESHOLD,
};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};

/// How zero-byte requests are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroSizePolicy {
    /// Serve the request with the smallest block of its partition
    #[default]
    SmallestBlock,
    /// Fail with `ClassificationOverflow`
    Reject,
}

/// Heap configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct HeapConfig {
    /// Size of a regular page, a power of two
    pub page_size: Size,
    /// Pages a pool may hold before new pages start doubling
    pub growth_threshold: usize,
    /// Slack reserved on top of a request when sizing a dedicated variable page
    pub large_page_padding: Size,
    /// Treatment of zero-byte requests
    pub zero_size: ZeroSizePolicy,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            page_size: GC_PAGE_SIZE,
            growth_threshold: PAGE_GROWTH_THRESHOLD,
            large_page_padding: LARGE_PAGE_PADDING,
            zero_size: ZeroSizePolicy::default(),
        }
    }
}

impl HeapConfig {
    pub fn with_page_size(mut self, page_size: Size) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_zero_size(mut self, policy: ZeroSizePolicy) -> Self {
        self.zero_size = policy;
        self
    }

    pub fn with_growth_threshold(mut self, threshold: usize) -> Self {
        self.growth_threshold = threshold;
        self
    }

    pub fn validate(&self) -> HeapResult<()> {
        if !self.page_size.is_power_of_two() {
            return Err(HeapError::InvalidConfig(format!(
                "page size {} is not a power of two",
                self.page_size
            )));
        }
        if !(MIN_PAGE_SIZE..=GC_PAGE_SIZE).contains(&self.page_size) {
            return Err(HeapError::InvalidConfig(format!(
                "page size {} outside {}..={}",
                self.page_size, MIN_PAGE_SIZE, GC_PAGE_SIZE
            )));
        }
        Ok(())
    }
}
