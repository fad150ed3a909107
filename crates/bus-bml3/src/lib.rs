//! Hitachi MB-689x (Basic Master Level 3) style expansion bus.
//!
//! A fixed backplane of numbered slots, tagged `"#1"` through `"#N"`.
//! Each slot position holds at most one card; cards claim address
//! windows in the shared host space, and the three interrupt lines
//! (IRQ, NMI, FIRQ) are open-collector: the bus output is the wired-OR
//! of every slot's drive state, so the host only sees edges of the
//! aggregate.

mod kanji;

pub use kanji::KanjiRomCard;

use expansion_core::{
    Access, AddressSpace, BusDevice, CardReceiver, CardRegistry, ConfigError, CpuLine,
    LineCallback, OPEN_BUS, SharedCpu, SharedRam, Slot, WiredOrLine, input_line,
};
use log::debug;
use std::any::Any;
use std::collections::HashMap;

/// Slot for a [`Bml3Bus`].
pub type Bml3BusSlot = Slot<Bml3Bus>;

/// Routing token: which slot's card, and which of its windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub slot: u8,
    pub window: u8,
}

/// Card-facing installation view; the owning slot index is baked in.
pub struct Bml3BusInstaller<'a> {
    space: &'a mut AddressSpace<SlotWindow>,
    slot: u8,
}

impl Bml3BusInstaller<'_> {
    pub fn install_device(&mut self, start: u32, end: u32, window: u8) {
        self.space.install_device(
            start,
            end,
            SlotWindow {
                slot: self.slot,
                window,
            },
        );
    }

    pub fn install_bank(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.space.install_bank(start, end, tag, data);
    }

    pub fn install_rom(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.space.install_rom(start, end, tag, data);
    }
}

/// Card-facing line view during dispatch; drives are attributed to the
/// card's own slot position in the wired-OR masks.
pub struct Bml3BusCtl<'a> {
    irq: &'a mut WiredOrLine,
    nmi: &'a mut WiredOrLine,
    firq: &'a mut WiredOrLine,
    slot: usize,
}

impl Bml3BusCtl<'_> {
    pub fn irq_w(&mut self, state: bool) {
        self.irq.drive(self.slot, state);
    }

    pub fn nmi_w(&mut self, state: bool) {
        self.nmi.drive(self.slot, state);
    }

    pub fn firq_w(&mut self, state: bool) {
        self.firq.drive(self.slot, state);
    }
}

/// Contract for cards on the MB-689x backplane.
pub trait Bml3Card {
    fn start(&mut self, bus: &mut Bml3BusInstaller<'_>) -> Result<(), ConfigError> {
        let _ = bus;
        Ok(())
    }

    fn window_read(&mut self, ctl: &mut Bml3BusCtl<'_>, window: u8, offset: u32) -> u8 {
        let _ = (ctl, window, offset);
        OPEN_BUS
    }

    fn window_write(&mut self, ctl: &mut Bml3BusCtl<'_>, window: u8, offset: u32, value: u8) {
        let _ = (ctl, window, offset, value);
    }

    fn reset(&mut self) {}
}

/// The fixed-array expansion bus.
pub struct Bml3Bus {
    tag: String,
    cputag: String,
    space: AddressSpace<SlotWindow>,
    cards: Vec<Option<Box<dyn Bml3Card>>>,
    irq: WiredOrLine,
    nmi: WiredOrLine,
    firq: WiredOrLine,
}

impl Bml3Bus {
    /// A bus with `nslots` positions, tagged `"#1"`..=`"#{nslots}"`.
    #[must_use]
    pub fn new(tag: &str, cputag: &str, nslots: usize) -> Self {
        debug_assert!((1..=32).contains(&nslots));
        Self {
            tag: tag.to_string(),
            cputag: cputag.to_string(),
            space: AddressSpace::new(),
            cards: (0..nslots).map(|_| None).collect(),
            irq: WiredOrLine::new(),
            nmi: WiredOrLine::new(),
            firq: WiredOrLine::new(),
        }
    }

    #[must_use]
    pub fn nslots(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn occupied(&self, slot: usize) -> bool {
        self.cards.get(slot).is_some_and(Option::is_some)
    }

    /// The card at a slot position, if any.
    #[must_use]
    pub fn card(&self, slot: usize) -> Option<&dyn Bml3Card> {
        self.cards.get(slot).and_then(|card| card.as_deref())
    }

    pub fn card_mut(&mut self, slot: usize) -> Option<&mut (dyn Bml3Card + 'static)> {
        self.cards.get_mut(slot).and_then(|card| card.as_deref_mut())
    }

    pub fn set_out_irq(&mut self, callback: LineCallback) {
        self.irq.set_callback(callback);
    }

    pub fn set_out_nmi(&mut self, callback: LineCallback) {
        self.nmi.set_callback(callback);
    }

    pub fn set_out_firq(&mut self, callback: LineCallback) {
        self.firq.set_callback(callback);
    }

    /// Parse a `"#N"` slot tag to its zero-based index.
    fn slot_index(&self, slot_tag: &str) -> Result<usize, ConfigError> {
        let number: usize = slot_tag
            .strip_prefix('#')
            .and_then(|digits| digits.parse().ok())
            .ok_or_else(|| ConfigError::BadSlotTag(slot_tag.to_string()))?;
        if number < 1 || number > self.cards.len() {
            return Err(ConfigError::SlotOutOfRange {
                bus: self.tag.clone(),
                slot: number,
                slots: self.cards.len(),
            });
        }
        Ok(number - 1)
    }

    /// Host-side read.
    pub fn read(&mut self, addr: u32) -> u8 {
        match self.space.resolve(addr) {
            Access::Device { token, offset } => {
                let Self {
                    cards,
                    irq,
                    nmi,
                    firq,
                    ..
                } = self;
                let slot = token.slot as usize;
                cards[slot].as_mut().map_or(OPEN_BUS, |card| {
                    let mut ctl = Bml3BusCtl {
                        irq,
                        nmi,
                        firq,
                        slot,
                    };
                    card.window_read(&mut ctl, token.window, offset)
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
                    cards,
                    irq,
                    nmi,
                    firq,
                    ..
                } = self;
                let slot = token.slot as usize;
                if let Some(card) = cards[slot].as_mut() {
                    let mut ctl = Bml3BusCtl {
                        irq,
                        nmi,
                        firq,
                        slot,
                    };
                    card.window_write(&mut ctl, token.window, offset, value);
                }
            }
            Access::Bank { bank, offset } => self.space.bank_write(bank, offset, value),
            Access::Open => {}
        }
    }

    /// Drive one slot's IRQ source (card side).
    pub fn set_irq(&mut self, slot: usize, state: bool) {
        self.irq.drive(slot, state);
    }

    pub fn set_nmi(&mut self, slot: usize, state: bool) {
        self.nmi.drive(slot, state);
    }

    pub fn set_firq(&mut self, slot: usize, state: bool) {
        self.firq.drive(slot, state);
    }

    #[must_use]
    pub fn irq_state(&self) -> bool {
        self.irq.state()
    }

    #[must_use]
    pub fn nmi_state(&self) -> bool {
        self.nmi.state()
    }

    #[must_use]
    pub fn firq_state(&self) -> bool {
        self.firq.state()
    }
}

impl CardReceiver for Bml3Bus {
    type Card = dyn Bml3Card;

    fn attach_card(&mut self, slot_tag: &str, card: Box<dyn Bml3Card>) -> Result<(), ConfigError> {
        let index = self.slot_index(slot_tag)?;
        debug!("{:?}: card attached at {slot_tag:?} (index {index})", self.tag);
        self.cards[index] = Some(card);
        Ok(())
    }
}

impl BusDevice for Bml3Bus {
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
        if !self.firq.has_callback() {
            self.firq.set_callback(input_line(cpu, CpuLine::Firq));
        }
        Ok(())
    }

    fn start_cards(&mut self) -> Result<(), ConfigError> {
        let Self { cards, space, .. } = self;
        for (index, slot) in cards.iter_mut().enumerate() {
            if let Some(card) = slot.as_mut() {
                card.start(&mut Bml3BusInstaller {
                    space,
                    slot: index as u8,
                })?;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.irq.clear();
        self.nmi.clear();
        self.firq.clear();
        for card in self.cards.iter_mut().flatten() {
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

/// Cards selectable for the MB-689x backplane.
#[must_use]
pub fn bml3bus_cards() -> CardRegistry<dyn Bml3Card> {
    let mut cards: CardRegistry<dyn Bml3Card> = CardRegistry::new();
    cards.register("kanji", || Box::new(KanjiRomCard::new()));
    cards
}
