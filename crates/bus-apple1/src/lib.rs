//! Apple-1 style 44-pin expansion connector.
//!
//! The simplest bus topology: one physical connector, at most one card.
//! The connector carries the full CPU address and data bus, so a card
//! claims whatever address windows it likes by asking the bus to install
//! them; there is no slot decode and no chip-select protocol. IRQ and
//! NMI from the card are forwarded straight to the host CPU.
//!
//! Registration is last-wins: by convention only one card ever attaches,
//! and a second registration simply replaces the first, matching how a
//! physically re-seated card would behave.

mod aci;
mod ram;

pub use aci::AciCard;
pub use ram::RamCard;

use expansion_core::{
    Access, AddressSpace, BusDevice, CardReceiver, CardRegistry, ConfigError, CpuLine,
    LineCallback, OPEN_BUS, OutputLine, SharedCpu, SharedRam, Slot, input_line,
};
use log::debug;
use std::any::Any;
use std::collections::HashMap;

/// Slot for an [`A1Bus`].
pub type A1BusSlot = Slot<A1Bus>;

/// Card-facing view of the bus during card start: window and bank
/// installation into the host address space.
pub struct A1BusInstaller<'a> {
    space: &'a mut AddressSpace<u8>,
}

impl A1BusInstaller<'_> {
    /// Map `start..=end` to this card; accesses arrive at
    /// [`A1BusCard::window_read`]/[`A1BusCard::window_write`] carrying
    /// `window` and the in-window offset.
    pub fn install_device(&mut self, start: u32, end: u32, window: u8) {
        self.space.install_device(start, end, window);
    }

    /// Bind `start..=end` to a named read/write bank backed by card
    /// memory.
    pub fn install_bank(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.space.install_bank(start, end, tag, data);
    }

    /// Bind `start..=end` to a named read-only bank.
    pub fn install_rom(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.space.install_rom(start, end, tag, data);
    }
}

/// Card-facing view of the bus lines during dispatch.
pub struct A1BusCtl<'a> {
    irq: &'a mut OutputLine,
    nmi: &'a mut OutputLine,
}

impl A1BusCtl<'_> {
    pub fn irq_w(&mut self, state: bool) {
        self.irq.set(state);
    }

    pub fn nmi_w(&mut self, state: bool) {
        self.nmi.set(state);
    }
}

/// Contract for cards plugging into the Apple-1 connector.
pub trait A1BusCard {
    /// Card start: allocate backing memory and claim address windows.
    fn start(&mut self, bus: &mut A1BusInstaller<'_>) -> Result<(), ConfigError> {
        let _ = bus;
        Ok(())
    }

    /// Read from one of the card's installed windows.
    fn window_read(&mut self, ctl: &mut A1BusCtl<'_>, window: u8, offset: u32) -> u8 {
        let _ = (ctl, window, offset);
        OPEN_BUS
    }

    /// Write to one of the card's installed windows.
    fn window_write(&mut self, ctl: &mut A1BusCtl<'_>, window: u8, offset: u32, value: u8) {
        let _ = (ctl, window, offset, value);
    }

    fn reset(&mut self) {}
}

/// The Apple-1 expansion connector.
pub struct A1Bus {
    tag: String,
    cputag: String,
    space: AddressSpace<u8>,
    irq: OutputLine,
    nmi: OutputLine,
    card: Option<Box<dyn A1BusCard>>,
}

impl A1Bus {
    #[must_use]
    pub fn new(tag: &str, cputag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            cputag: cputag.to_string(),
            space: AddressSpace::new(),
            irq: OutputLine::new(),
            nmi: OutputLine::new(),
            card: None,
        }
    }

    /// Override the default IRQ wiring (which targets the host CPU's
    /// IRQ input). Must be called before start.
    pub fn set_out_irq(&mut self, callback: LineCallback) {
        self.irq.set_callback(callback);
    }

    /// Override the default NMI wiring.
    pub fn set_out_nmi(&mut self, callback: LineCallback) {
        self.nmi.set_callback(callback);
    }

    #[must_use]
    pub fn has_card(&self) -> bool {
        self.card.is_some()
    }

    /// The current card, for host glue that dispatches into it
    /// directly.
    #[must_use]
    pub fn card(&self) -> Option<&dyn A1BusCard> {
        self.card.as_deref()
    }

    pub fn card_mut(&mut self) -> Option<&mut (dyn A1BusCard + 'static)> {
        self.card.as_deref_mut()
    }

    /// Host-side read. Routed to the card window or bank claiming the
    /// address; open bus floats `0xFF`.
    pub fn read(&mut self, addr: u32) -> u8 {
        match self.space.resolve(addr) {
            Access::Device { token, offset } => {
                let Self {
                    card, irq, nmi, ..
                } = self;
                card.as_mut().map_or(OPEN_BUS, |card| {
                    let mut ctl = A1BusCtl { irq, nmi };
                    card.window_read(&mut ctl, token, offset)
                })
            }
            Access::Bank { bank, offset } => self.space.bank_read(bank, offset),
            Access::Open => OPEN_BUS,
        }
    }

    /// Host-side write.
    pub fn write(&mut self, addr: u32, value: u8) {
        match self.space.resolve(addr) {
            Access::Device { token, offset } => {
                let Self {
                    card, irq, nmi, ..
                } = self;
                if let Some(card) = card.as_mut() {
                    let mut ctl = A1BusCtl { irq, nmi };
                    card.window_write(&mut ctl, token, offset, value);
                }
            }
            Access::Bank { bank, offset } => self.space.bank_write(bank, offset, value),
            Access::Open => {}
        }
    }

    /// Drive the bus IRQ line (card side).
    pub fn irq_w(&mut self, state: bool) {
        self.irq.set(state);
    }

    /// Drive the bus NMI line (card side).
    pub fn nmi_w(&mut self, state: bool) {
        self.nmi.set(state);
    }

    #[must_use]
    pub fn irq_state(&self) -> bool {
        self.irq.state()
    }

    #[must_use]
    pub fn nmi_state(&self) -> bool {
        self.nmi.state()
    }
}

impl CardReceiver for A1Bus {
    type Card = dyn A1BusCard;

    fn attach_card(&mut self, slot_tag: &str, card: Box<dyn A1BusCard>) -> Result<(), ConfigError> {
        debug!("{:?}: card attached at {slot_tag:?}", self.tag);
        self.card = Some(card);
        Ok(())
    }
}

impl BusDevice for A1Bus {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn start(&mut self, cpus: &HashMap<String, SharedCpu>) -> Result<(), ConfigError> {
        let cpu = cpus
            .get(&self.cputag)
            .ok_or_else(|| ConfigError::NoSuchCpu(self.cputag.clone()))?;
        if !self.irq.has_callback() {
            self.irq.set_callback(input_line(cpu, CpuLine::Irq));
        }
        if !self.nmi.has_callback() {
            self.nmi.set_callback(input_line(cpu, CpuLine::Nmi));
        }
        Ok(())
    }

    fn start_cards(&mut self) -> Result<(), ConfigError> {
        let Self { card, space, .. } = self;
        if let Some(card) = card.as_mut() {
            card.start(&mut A1BusInstaller { space })?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        if let Some(card) = self.card.as_mut() {
            card.reset();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Cards selectable for the Apple-1 connector.
#[must_use]
pub fn a1bus_cards() -> CardRegistry<dyn A1BusCard> {
    let mut cards: CardRegistry<dyn A1BusCard> = CardRegistry::new();
    cards.register("aci", || Box::new(AciCard::new()));
    cards.register("ram", || Box::new(RamCard::new(0x1000, 0x1000)));
    cards
}
