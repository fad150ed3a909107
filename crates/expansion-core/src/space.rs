//! Host address-space windows.
//!
//! A bus owns an [`AddressSpace`]: an ordered table of inclusive address
//! ranges, each routing either to a device window (an opaque token the
//! owning bus resolves to a card entry point) or to a named memory bank
//! backed by a shared buffer. Cards never touch the table directly; they
//! request installations through their bus, which is the sole mutator.
//!
//! Later installations shadow earlier ones over any overlap, matching
//! the install-handler semantics of the underlying memory system.
//! Addresses nothing claims float to [`OPEN_BUS`].

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

/// Value read from an address nothing drives.
pub const OPEN_BUS: u8 = 0xFF;

/// Backing buffer for a bank, shared between the installing card and the
/// space.
pub type SharedRam = Rc<RefCell<Vec<u8>>>;

/// Resolution of one address: who services the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access<T> {
    /// A device window; the bus dispatches to a card with this token.
    Device { token: T, offset: u32 },
    /// A bank; the space services the access itself.
    Bank { bank: usize, offset: u32 },
    /// Nobody home.
    Open,
}

#[derive(Clone, Copy)]
enum Target<T> {
    Device(T),
    Bank(usize),
    Open,
}

struct Entry<T> {
    start: u32,
    end: u32,
    target: Target<T>,
}

struct Bank {
    tag: String,
    data: SharedRam,
    writable: bool,
}

/// Ordered range table over one host address space.
///
/// `T` is the bus family's window token — whatever it needs to route a
/// hit back to the owning card (a window id, a slot/window pair, ...).
pub struct AddressSpace<T: Copy> {
    entries: Vec<Entry<T>>,
    banks: Vec<Bank>,
}

impl<T: Copy> Default for AddressSpace<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            banks: Vec::new(),
        }
    }
}

impl<T: Copy> AddressSpace<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `start..=end` to a device window.
    pub fn install_device(&mut self, start: u32, end: u32, token: T) {
        debug_assert!(start <= end);
        debug!("install device window {start:06X}-{end:06X}");
        self.entries.push(Entry {
            start,
            end,
            target: Target::Device(token),
        });
    }

    /// Bind `start..=end` to a named read/write bank.
    pub fn install_bank(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.install_backed(start, end, tag, data, true);
    }

    /// Bind `start..=end` to a named read-only bank; writes are dropped.
    pub fn install_rom(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.install_backed(start, end, tag, data, false);
    }

    fn install_backed(&mut self, start: u32, end: u32, tag: &str, data: SharedRam, writable: bool) {
        debug_assert!(start <= end);
        debug!("install bank {tag:?} {start:06X}-{end:06X} (writable: {writable})");
        let bank = self.banks.len();
        self.banks.push(Bank {
            tag: tag.to_string(),
            data,
            writable,
        });
        self.entries.push(Entry {
            start,
            end,
            target: Target::Bank(bank),
        });
    }

    /// Detach `start..=end` from whatever claimed it; reads float again.
    pub fn unmap(&mut self, start: u32, end: u32) {
        debug_assert!(start <= end);
        debug!("unmap {start:06X}-{end:06X}");
        self.entries.push(Entry {
            start,
            end,
            target: Target::Open,
        });
    }

    /// Resolve one address against the table, newest entry first.
    #[must_use]
    pub fn resolve(&self, addr: u32) -> Access<T> {
        for entry in self.entries.iter().rev() {
            if addr >= entry.start && addr <= entry.end {
                return match entry.target {
                    Target::Device(token) => Access::Device {
                        token,
                        offset: addr - entry.start,
                    },
                    Target::Bank(bank) => Access::Bank {
                        bank,
                        offset: addr - entry.start,
                    },
                    Target::Open => Access::Open,
                };
            }
        }
        Access::Open
    }

    #[must_use]
    pub fn bank_read(&self, bank: usize, offset: u32) -> u8 {
        let Some(bank) = self.banks.get(bank) else {
            return OPEN_BUS;
        };
        bank.data
            .borrow()
            .get(offset as usize)
            .copied()
            .unwrap_or(OPEN_BUS)
    }

    pub fn bank_write(&mut self, bank: usize, offset: u32, value: u8) {
        let Some(bank) = self.banks.get(bank) else {
            return;
        };
        if !bank.writable {
            return;
        }
        if let Some(cell) = bank.data.borrow_mut().get_mut(offset as usize) {
            *cell = value;
        }
    }

    /// Tag of an installed bank, for diagnostics.
    #[must_use]
    pub fn bank_tag(&self, bank: usize) -> Option<&str> {
        self.banks.get(bank).map(|b| b.tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(bytes: &[u8]) -> SharedRam {
        Rc::new(RefCell::new(bytes.to_vec()))
    }

    #[test]
    fn unmapped_addresses_float() {
        let space: AddressSpace<u8> = AddressSpace::new();
        assert_eq!(space.resolve(0x1234), Access::Open);
    }

    #[test]
    fn device_window_resolves_with_offset() {
        let mut space = AddressSpace::new();
        space.install_device(0xC100, 0xC1FF, 7u8);
        assert_eq!(
            space.resolve(0xC180),
            Access::Device {
                token: 7,
                offset: 0x80
            }
        );
        assert_eq!(space.resolve(0xC200), Access::Open);
    }

    #[test]
    fn later_installation_shadows_earlier() {
        let mut space = AddressSpace::new();
        space.install_device(0x0000, 0xFFFF, 1u8);
        space.install_device(0x4000, 0x4FFF, 2u8);
        assert!(matches!(
            space.resolve(0x4800),
            Access::Device { token: 2, .. }
        ));
        assert!(matches!(
            space.resolve(0x3FFF),
            Access::Device { token: 1, .. }
        ));
    }

    #[test]
    fn banks_service_reads_and_writes() {
        let mut space: AddressSpace<u8> = AddressSpace::new();
        let backing = ram(&[0x11, 0x22, 0x33]);
        space.install_bank(0x8000, 0x8002, "test", Rc::clone(&backing));

        let Access::Bank { bank, offset } = space.resolve(0x8001) else {
            panic!("expected bank hit");
        };
        assert_eq!(space.bank_read(bank, offset), 0x22);

        space.bank_write(bank, offset, 0xAB);
        assert_eq!(backing.borrow()[1], 0xAB);
    }

    #[test]
    fn rom_banks_drop_writes() {
        let mut space: AddressSpace<u8> = AddressSpace::new();
        let backing = ram(&[0x5A]);
        space.install_rom(0xE000, 0xE000, "rom", Rc::clone(&backing));

        let Access::Bank { bank, offset } = space.resolve(0xE000) else {
            panic!("expected bank hit");
        };
        space.bank_write(bank, offset, 0x00);
        assert_eq!(space.bank_read(bank, offset), 0x5A);
    }

    #[test]
    fn unmap_reopens_a_range() {
        let mut space = AddressSpace::new();
        space.install_device(0x0000, 0x0FFF, 1u8);
        space.unmap(0x0400, 0x07FF);
        assert_eq!(space.resolve(0x0500), Access::Open);
        assert!(matches!(space.resolve(0x0300), Access::Device { .. }));
    }

    #[test]
    fn bank_read_past_backing_floats() {
        let mut space: AddressSpace<u8> = AddressSpace::new();
        space.install_bank(0x0000, 0x00FF, "short", ram(&[0x01]));
        let Access::Bank { bank, .. } = space.resolve(0x0000) else {
            panic!("expected bank hit");
        };
        assert_eq!(space.bank_read(bank, 0x80), OPEN_BUS);
    }
}
