//! Handle-indexed table of active patches.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Patch, PatchHandle, PatchHandleGenerator, PatchType, PortConfig};
use crate::HalError;

/// Active patches keyed by handle.
///
/// Every method takes the table lock for the duration of one lookup or
/// mutation only. Patches are returned by value so no guard escapes.
#[derive(Debug, Default)]
pub struct PatchTable {
    patches: Mutex<HashMap<PatchHandle, Patch>>,
    generator: PatchHandleGenerator,
}

impl PatchTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table whose handles start at `first`.
    pub fn with_first_handle(first: i32) -> Self {
        Self {
            patches: Mutex::new(HashMap::new()),
            generator: PatchHandleGenerator::starting_at(first),
        }
    }

    /// Builds a patch with a fresh handle without inserting it.
    pub fn allocate(
        &self,
        patch_type: PatchType,
        sources: &[PortConfig],
        sinks: &[PortConfig],
    ) -> Patch {
        Patch {
            handle: self.generator.next_handle(),
            patch_type,
            sources: sources.to_vec(),
            sinks: sinks.to_vec(),
        }
    }

    /// Inserts a patch, replacing any patch with the same handle.
    pub fn insert(&self, patch: Patch) {
        self.patches.lock().insert(patch.handle, patch);
    }

    /// Overwrites an existing patch's shape and ports.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidArgument`] if no patch has `handle`.
    pub fn update(
        &self,
        handle: PatchHandle,
        patch_type: PatchType,
        sources: &[PortConfig],
        sinks: &[PortConfig],
    ) -> Result<(), HalError> {
        let mut patches = self.patches.lock();
        let patch = patches
            .get_mut(&handle)
            .ok_or_else(|| HalError::invalid(format!("patch handle {handle} not found")))?;
        patch.patch_type = patch_type;
        patch.sources = sources.to_vec();
        patch.sinks = sinks.to_vec();
        Ok(())
    }

    /// Returns a copy of the patch with `handle`.
    pub fn get(&self, handle: PatchHandle) -> Option<Patch> {
        self.patches.lock().get(&handle).cloned()
    }

    /// Returns `true` if a patch has `handle`.
    pub fn contains(&self, handle: PatchHandle) -> bool {
        self.patches.lock().contains_key(&handle)
    }

    /// Removes and returns the patch with `handle`.
    pub fn remove(&self, handle: PatchHandle) -> Option<Patch> {
        self.patches.lock().remove(&handle)
    }

    /// Number of active patches.
    pub fn len(&self) -> usize {
        self.patches.lock().len()
    }

    /// Returns `true` if no patch is active.
    pub fn is_empty(&self) -> bool {
        self.patches.lock().is_empty()
    }

    /// Handles of every active patch, sorted.
    pub fn handles(&self) -> Vec<PatchHandle> {
        let mut handles: Vec<_> = self.patches.lock().keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}
