//! Zorro-II fast RAM expansion board.
//!
//! Presents a memory-pool descriptor during autoconfig; once the host
//! writes the base address register ($48) the board allocates its RAM
//! and claims the assigned window. $4C is the shut-up register: the
//! board drops out without claiming anything.

use crate::autoconfig::{BoardDescriptor, SizeCode};
use crate::{AutoconfigAck, ZorroCard, ZorroInstaller};
use expansion_core::{Region, SharedRam};

const REG_BASE_ADDRESS: u32 = 0x48;
const REG_SHUT_UP: u32 = 0x4C;

/// Fast RAM expansion.
pub struct FastRamCard {
    descriptor: BoardDescriptor,
    ram: Region,
    base: Option<u32>,
    shut_up: bool,
}

impl FastRamCard {
    #[must_use]
    pub fn new(size: SizeCode) -> Self {
        Self {
            descriptor: BoardDescriptor {
                size,
                memory: true,
                product: 0x51,
                manufacturer: 0x07DB,
                serial: 0x0000_0001,
            },
            ram: Region::new(),
            base: None,
            shut_up: false,
        }
    }

    /// Assigned base address, once configured.
    #[must_use]
    pub fn base(&self) -> Option<u32> {
        self.base
    }

    /// Whether the board was told to shut up this power cycle.
    #[must_use]
    pub fn is_shut_up(&self) -> bool {
        self.shut_up
    }

    /// Allocate the RAM. Idempotent.
    pub fn ram_alloc(&mut self) {
        self.ram.allocate(self.descriptor.size.bytes() as usize);
    }

    #[must_use]
    pub fn ram(&self) -> Option<SharedRam> {
        self.ram.share()
    }
}

impl ZorroCard for FastRamCard {
    fn autoconfig_read(&mut self, offset: u32) -> u8 {
        self.descriptor.read(offset)
    }

    fn autoconfig_write(
        &mut self,
        bus: &mut ZorroInstaller<'_>,
        offset: u32,
        value: u8,
    ) -> AutoconfigAck {
        match offset {
            REG_BASE_ADDRESS => {
                let base = u32::from(value) << 16;
                self.ram_alloc();
                if let Some(data) = self.ram.share() {
                    bus.install_bank(base, base + self.descriptor.size.bytes() - 1, "fastram", data);
                }
                self.base = Some(base);
                AutoconfigAck::Configured
            }
            REG_SHUT_UP => {
                self.shut_up = true;
                AutoconfigAck::ShutUp
            }
            _ => AutoconfigAck::Busy,
        }
    }

    fn reset(&mut self) {
        self.base = None;
        self.shut_up = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn descriptor_identifies_a_memory_board() {
        let mut card = FastRamCard::new(SizeCode::M2);
        // Type register: Zorro-II, memory pool, 2 MiB.
        assert_eq!(card.autoconfig_read(0x00), 0xEF);
    }

    #[test]
    fn ram_alloc_is_idempotent() {
        let mut card = FastRamCard::new(SizeCode::K64);
        card.ram_alloc();
        let first = card.ram().expect("allocated");
        card.ram_alloc();
        let second = card.ram().expect("still allocated");
        assert!(Rc::ptr_eq(&first, &second));
    }
}
