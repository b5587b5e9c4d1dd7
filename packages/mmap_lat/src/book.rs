//! Per-worker bookkeeping of mapped regions.

use crate::region::{self, RegionHandle};

/// The per-worker record of the regions produced in the map phase and consumed
/// in the unmap phase.
///
/// A book is allocated by the coordinator, handed to exactly one map worker
/// which writes every slot exactly once (in index order), then handed to the
/// unmap worker of the same slot index which takes every slot exactly once.
/// No two workers ever share a book, so no locking is involved.
///
/// Write-once/take-once is asserted in debug builds. Any region still present
/// when the book is dropped is released, so abandoned books (for example on
/// the error path of a run) do not leak address space.
#[derive(Debug)]
pub struct AddressBook {
    slots: Vec<Option<RegionHandle>>,
}

impl AddressBook {
    /// Creates a book with `capacity` empty slots, one per planned operation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// The number of slots in the book, equal to the owning worker's
    /// operation count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the book has no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Records the handle produced by the map operation for `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds. Writing a slot twice panics in
    /// debug builds and overwrites in release builds.
    pub fn set(&mut self, index: usize, handle: RegionHandle) {
        let slot = self
            .slots
            .get_mut(index)
            .expect("books are sized to the worker's operation count");

        debug_assert!(slot.is_none(), "address book slot written twice");

        *slot = Some(handle);
    }

    /// Removes and returns the handle recorded for `index`, leaving the slot
    /// empty so the region cannot be released twice.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds. Taking a slot twice panics in debug
    /// builds and yields the invalid sentinel in release builds.
    pub fn take(&mut self, index: usize) -> RegionHandle {
        let slot = self
            .slots
            .get_mut(index)
            .expect("books are sized to the worker's operation count");

        debug_assert!(slot.is_some(), "address book slot taken twice");

        slot.take().unwrap_or_else(RegionHandle::invalid)
    }
}

impl Drop for AddressBook {
    fn drop(&mut self) {
        for handle in self.slots.iter_mut().filter_map(Option::take) {
            _ = region::unmap_region(handle);
        }
    }
}
