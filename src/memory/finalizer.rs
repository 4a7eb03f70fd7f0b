/*!
 * Finalizer Registry
 * Typed finalizer handles attached to finalizable blocks
 */

use super::types::FinalizerId;
use crate::core::types::Address;

/// Callback run with the address of an unreachable block
pub type FinalizerFn = Box<dyn FnMut(Address)>;

/// Registered finalizers, addressed by [`FinalizerId`]
#[derive(Default)]
pub struct FinalizerRegistry {
    entries: Vec<FinalizerFn>,
}

impl FinalizerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, finalizer: FinalizerFn) -> FinalizerId {
        let id = FinalizerId(self.entries.len() as u32);
        self.entries.push(finalizer);
        id
    }

    pub fn contains(&self, id: FinalizerId) -> bool {
        (id.0 as usize) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a finalizer; unknown ids are ignored
    pub(crate) fn invoke(&mut self, id: FinalizerId, address: Address) -> bool {
        match self.entries.get_mut(id.0 as usize) {
            Some(f) => {
                f(address);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for FinalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizerRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}
