//! Lazily allocated ROM/RAM regions for cards.
//!
//! Cards allocate their backing memory during start. Allocation is
//! idempotent: a second call — same size or not — leaves the original
//! buffer in place, so configuration paths that re-enter allocation
//! cannot invalidate a buffer that may already be installed as a bank.
//! Fresh buffers are filled with `0xFF` (erased-EPROM convention).

use crate::space::{OPEN_BUS, SharedRam};
use std::cell::RefCell;
use std::rc::Rc;

/// One card-owned memory region, shareable with an address space as a
/// bank backing buffer.
#[derive(Default)]
pub struct Region {
    data: Option<SharedRam>,
}

impl Region {
    #[must_use]
    pub const fn new() -> Self {
        Self { data: None }
    }

    /// Allocate the region. Returns `true` if the buffer was newly
    /// created, `false` if the call was an idempotent no-op.
    pub fn allocate(&mut self, size: usize) -> bool {
        if self.data.is_some() {
            return false;
        }
        self.data = Some(Rc::new(RefCell::new(vec![OPEN_BUS; size])));
        true
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Shared handle to the backing buffer, e.g. for bank installation.
    #[must_use]
    pub fn share(&self) -> Option<SharedRam> {
        self.data.as_ref().map(Rc::clone)
    }

    /// Copy an image into the region, truncating to whichever is
    /// shorter. No-op if unallocated.
    pub fn load(&self, image: &[u8]) {
        if let Some(data) = self.data.as_ref() {
            let mut data = data.borrow_mut();
            let n = data.len().min(image.len());
            data[..n].copy_from_slice(&image[..n]);
        }
    }

    #[must_use]
    pub fn read(&self, offset: usize) -> u8 {
        self.data
            .as_ref()
            .and_then(|data| data.borrow().get(offset).copied())
            .unwrap_or(OPEN_BUS)
    }

    pub fn write(&self, offset: usize, value: u8) {
        if let Some(data) = self.data.as_ref() {
            if let Some(cell) = data.borrow_mut().get_mut(offset) {
                *cell = value;
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.borrow().len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
