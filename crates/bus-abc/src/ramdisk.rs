//! Battery-backed RAM disk card.
//!
//! Selected via its option-number on the CS strobe (factory default
//! $2D). The host sets a 24-bit cursor with C1/C2/C3 (low/mid/high
//! byte), then streams data with OUT (write, post-increment) and INP
//! (read, post-increment). C4 rewinds the cursor. STAT bit 0 is the
//! ready flag, held high once the RAM is present.

use crate::{AbcBusCard, AbcBusCtl};
use expansion_core::{OPEN_BUS, Region, SharedRam};

const RAM_SIZE: usize = 0x10000;

/// STAT bit 0: card present and ready.
const STAT_READY: u8 = 0x01;

/// RAM disk card.
pub struct RamDiskCard {
    select_code: u8,
    selected: bool,
    ram: Region,
    cursor: u32,
}

impl RamDiskCard {
    #[must_use]
    pub fn new(select_code: u8) -> Self {
        let mut ram = Region::new();
        ram.allocate(RAM_SIZE);
        Self {
            select_code,
            selected: false,
            ram,
            cursor: 0,
        }
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    #[must_use]
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    #[must_use]
    pub fn ram(&self) -> Option<SharedRam> {
        self.ram.share()
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % RAM_SIZE as u32;
    }
}

impl AbcBusCard for RamDiskCard {
    fn cs_w(&mut self, data: u8) {
        self.selected = data == self.select_code;
    }

    fn inp_r(&mut self, _ctl: &mut AbcBusCtl<'_>) -> u8 {
        if !self.selected {
            return OPEN_BUS;
        }
        let value = self.ram.read(self.cursor as usize);
        self.advance();
        value
    }

    fn out_w(&mut self, _ctl: &mut AbcBusCtl<'_>, data: u8) {
        if !self.selected {
            return;
        }
        self.ram.write(self.cursor as usize, data);
        self.advance();
    }

    fn stat_r(&mut self, _ctl: &mut AbcBusCtl<'_>) -> u8 {
        if !self.selected {
            return OPEN_BUS;
        }
        STAT_READY
    }

    fn c1_w(&mut self, _ctl: &mut AbcBusCtl<'_>, data: u8) {
        if self.selected {
            self.cursor = (self.cursor & 0xFF_FF00) | u32::from(data);
        }
    }

    fn c2_w(&mut self, _ctl: &mut AbcBusCtl<'_>, data: u8) {
        if self.selected {
            self.cursor = (self.cursor & 0xFF_00FF) | (u32::from(data) << 8);
        }
    }

    fn c3_w(&mut self, _ctl: &mut AbcBusCtl<'_>, data: u8) {
        if self.selected {
            self.cursor = (self.cursor & 0x00_FFFF) | (u32::from(data) << 16);
        }
    }

    fn c4_w(&mut self, _ctl: &mut AbcBusCtl<'_>, _data: u8) {
        if self.selected {
            self.cursor = 0;
        }
    }

    fn reset(&mut self) {
        self.selected = false;
        self.cursor = 0;
    }
}
