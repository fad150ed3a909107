//! Kanji character generator ROM card.
//!
//! Two write-only latch ports select a character cell; two read ports
//! return the left and right bytes of the selected glyph row. The ROM
//! is 128 KiB of 16x16 cells, two bytes per row.

use crate::{Bml3Card, Bml3BusCtl, Bml3BusInstaller};
use expansion_core::{ConfigError, OPEN_BUS, Region};

const PORT_WINDOW: u8 = 0;

/// Port window base in the host I/O page.
const PORT_BASE: u32 = 0xFF75;

const ROM_SIZE: usize = 0x20000;

/// Kanji ROM card.
pub struct KanjiRomCard {
    rom: Region,
    /// Latched cell/row address; each cell row yields two data bytes.
    address: u16,
}

impl Default for KanjiRomCard {
    fn default() -> Self {
        Self::new()
    }
}

impl KanjiRomCard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rom: Region::new(),
            address: 0,
        }
    }

    pub fn load_rom(&mut self, image: &[u8]) {
        self.rom.allocate(ROM_SIZE);
        self.rom.load(image);
    }

    #[must_use]
    pub fn address(&self) -> u16 {
        self.address
    }
}

impl Bml3Card for KanjiRomCard {
    fn start(&mut self, bus: &mut Bml3BusInstaller<'_>) -> Result<(), ConfigError> {
        self.rom.allocate(ROM_SIZE);
        // +0/+1: address latch low/high (write), data left/right (read)
        bus.install_device(PORT_BASE, PORT_BASE + 1, PORT_WINDOW);
        Ok(())
    }

    fn window_read(&mut self, _ctl: &mut Bml3BusCtl<'_>, window: u8, offset: u32) -> u8 {
        if window != PORT_WINDOW {
            return OPEN_BUS;
        }
        let base = usize::from(self.address) * 2;
        match offset {
            0 => self.rom.read(base),
            1 => self.rom.read(base + 1),
            _ => OPEN_BUS,
        }
    }

    fn window_write(&mut self, _ctl: &mut Bml3BusCtl<'_>, window: u8, offset: u32, value: u8) {
        if window != PORT_WINDOW {
            return;
        }
        match offset {
            0 => self.address = (self.address & 0xFF00) | u16::from(value),
            1 => self.address = (self.address & 0x00FF) | (u16::from(value) << 8),
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.address = 0;
    }
}
