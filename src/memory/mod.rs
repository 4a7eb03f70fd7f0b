/*!
 * Memory Module
 * Block allocator backing a mark-and-sweep collector
 */

mod bitmap;
pub mod config;
pub mod finalizer;
pub mod heap;
mod page;
pub mod partition;
pub mod provider;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::{HeapConfig, ZeroSizePolicy};
pub use finalizer::{FinalizerFn, FinalizerRegistry};
pub use heap::Heap;
pub use partition::{classify, Classification, Partition};
pub use provider::{RawPage, SystemPageProvider};
pub use traits::*;
pub use types::*;
