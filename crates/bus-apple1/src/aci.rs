//! Apple Cassette Interface card.
//!
//! The ACI carries a 256-byte monitor ROM at $C100-$C1FF and decodes
//! $C000-$C0FF as its tape strobe window: a read there toggles the tape
//! output level and returns the ROM byte at the same offset (the ROM's
//! read path doubles as the strobe, so the monitor can time the tape by
//! executing reads).

use crate::{A1BusCard, A1BusCtl, A1BusInstaller};
use expansion_core::{ConfigError, Region, SharedRam};

const ROM_WINDOW: u8 = 0;
const TAPE_WINDOW: u8 = 1;

const ROM_SIZE: usize = 0x100;

/// Apple Cassette Interface.
pub struct AciCard {
    rom: Region,
    /// Current tape output level; flips on every strobe-window access.
    output_level: bool,
}

impl Default for AciCard {
    fn default() -> Self {
        Self::new()
    }
}

impl AciCard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rom: Region::new(),
            output_level: false,
        }
    }

    /// Allocate the monitor ROM. Idempotent; a later call leaves the
    /// original buffer (and anything loaded into it) untouched.
    pub fn rom_alloc(&mut self, size: usize) {
        self.rom.allocate(size);
    }

    /// Load a ROM image, allocating first if needed.
    pub fn load_rom(&mut self, image: &[u8]) {
        self.rom.allocate(ROM_SIZE);
        self.rom.load(image);
    }

    /// Shared handle to the ROM buffer, if allocated.
    #[must_use]
    pub fn rom(&self) -> Option<SharedRam> {
        self.rom.share()
    }

    #[must_use]
    pub fn output_level(&self) -> bool {
        self.output_level
    }
}

impl A1BusCard for AciCard {
    fn start(&mut self, bus: &mut A1BusInstaller<'_>) -> Result<(), ConfigError> {
        self.rom.allocate(ROM_SIZE);
        bus.install_device(0xC100, 0xC1FF, ROM_WINDOW);
        bus.install_device(0xC000, 0xC0FF, TAPE_WINDOW);
        Ok(())
    }

    fn window_read(&mut self, _ctl: &mut A1BusCtl<'_>, window: u8, offset: u32) -> u8 {
        match window {
            ROM_WINDOW => self.rom.read(offset as usize),
            TAPE_WINDOW => {
                self.output_level = !self.output_level;
                self.rom.read(offset as usize)
            }
            _ => expansion_core::OPEN_BUS,
        }
    }

    fn reset(&mut self) {
        self.output_level = false;
    }
}
