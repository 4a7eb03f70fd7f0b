/*!
 * Core Module
 * Fundamental types, limits and bit utilities
 */

pub mod bits;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use types::*;
