//! RAM expansion card, mapped as a named bank.

use crate::{A1BusCard, A1BusInstaller};
use expansion_core::{ConfigError, Region, SharedRam};

/// Static RAM expansion occupying a fixed window.
pub struct RamCard {
    ram: Region,
    base: u32,
    size: u32,
}

impl RamCard {
    #[must_use]
    pub fn new(base: u32, size: u32) -> Self {
        Self {
            ram: Region::new(),
            base,
            size,
        }
    }

    /// Allocate the backing RAM. Idempotent.
    pub fn ram_alloc(&mut self, size: usize) {
        self.ram.allocate(size);
    }

    #[must_use]
    pub fn ram(&self) -> Option<SharedRam> {
        self.ram.share()
    }
}

impl A1BusCard for RamCard {
    fn start(&mut self, bus: &mut A1BusInstaller<'_>) -> Result<(), ConfigError> {
        self.ram.allocate(self.size as usize);
        if let Some(data) = self.ram.share() {
            bus.install_bank(self.base, self.base + self.size - 1, "a1ram", data);
        }
        Ok(())
    }
}
