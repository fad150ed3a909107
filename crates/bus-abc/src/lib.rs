//! Luxor ABC (Databoard 4680) expansion bus.
//!
//! The host talks to the bus through a small set of I/O strobes rather
//! than memory windows:
//!
//! | Strobe | Direction | Meaning                  |
//! |--------|-----------|--------------------------|
//! | OUT 0  | out       | data output              |
//! | OUT 1  | out       | CS — card select         |
//! | OUT 2  | out       | C1 — command 1           |
//! | OUT 3  | out       | C2 — command 2           |
//! | OUT 4  | out       | C3 — command 3           |
//! | OUT 5  | out       | C4 — command 4           |
//! | IN 0   | in        | INP — data input         |
//! | IN 1   | in        | STAT — status input      |
//! | IN 7   | in        | RST — reset strobe       |
//!
//! The CS strobe carries a select code; every card compares it against
//! its own address and only a selected card answers the other strobes.
//! An unselected (or absent) card is transparent: reads float `0xFF`,
//! writes do nothing. This lets the host scan the backplane by walking
//! select codes.
//!
//! Card-raised lines (IRQ, NMI, RDY, TRRQ) are latched on the bus with
//! host-side readback, and forwarded through output callbacks.

mod ramdisk;

pub use ramdisk::RamDiskCard;

use expansion_core::{
    BusDevice, CardReceiver, CardRegistry, ConfigError, CpuLine, LineCallback, OPEN_BUS,
    OutputLine, SharedCpu, Slot, input_line,
};
use log::debug;
use std::any::Any;
use std::collections::HashMap;

/// Slot for an [`AbcBus`].
pub type AbcBusSlot = Slot<AbcBus>;

/// Card-facing view of the bus lines.
pub struct AbcBusCtl<'a> {
    irq: &'a mut OutputLine,
    nmi: &'a mut OutputLine,
    rdy: &'a mut OutputLine,
    trrq: &'a mut OutputLine,
}

impl AbcBusCtl<'_> {
    pub fn irq_w(&mut self, state: bool) {
        self.irq.set(state);
    }

    pub fn nmi_w(&mut self, state: bool) {
        self.nmi.set(state);
    }

    pub fn rdy_w(&mut self, state: bool) {
        self.rdy.set(state);
    }

    pub fn trrq_w(&mut self, state: bool) {
        self.trrq.set(state);
    }
}

/// Contract for cards on the ABC bus.
///
/// Only the select strobe is mandatory; everything else defaults to
/// transparent. A card must answer `0xFF` / do nothing whenever the
/// last select code was not its own.
pub trait AbcBusCard {
    /// CS strobe: compare the select code, remember the outcome.
    fn cs_w(&mut self, data: u8);

    /// INP strobe: data input.
    fn inp_r(&mut self, ctl: &mut AbcBusCtl<'_>) -> u8 {
        let _ = ctl;
        OPEN_BUS
    }

    /// OUT strobe: data output.
    fn out_w(&mut self, ctl: &mut AbcBusCtl<'_>, data: u8) {
        let _ = (ctl, data);
    }

    /// STAT strobe: status input.
    fn stat_r(&mut self, ctl: &mut AbcBusCtl<'_>) -> u8 {
        let _ = ctl;
        OPEN_BUS
    }

    fn c1_w(&mut self, ctl: &mut AbcBusCtl<'_>, data: u8) {
        let _ = (ctl, data);
    }

    fn c2_w(&mut self, ctl: &mut AbcBusCtl<'_>, data: u8) {
        let _ = (ctl, data);
    }

    fn c3_w(&mut self, ctl: &mut AbcBusCtl<'_>, data: u8) {
        let _ = (ctl, data);
    }

    fn c4_w(&mut self, ctl: &mut AbcBusCtl<'_>, data: u8) {
        let _ = (ctl, data);
    }

    /// RST strobe.
    fn reset(&mut self) {}
}

macro_rules! strobe_read {
    ($bus:expr, $method:ident) => {{
        let Self {
            card,
            irq,
            nmi,
            rdy,
            trrq,
            ..
        } = $bus;
        card.as_mut().map_or(OPEN_BUS, |card| {
            let mut ctl = AbcBusCtl { irq, nmi, rdy, trrq };
            card.$method(&mut ctl)
        })
    }};
}

macro_rules! strobe_write {
    ($bus:expr, $method:ident, $data:expr) => {{
        let Self {
            card,
            irq,
            nmi,
            rdy,
            trrq,
            ..
        } = $bus;
        if let Some(card) = card.as_mut() {
            let mut ctl = AbcBusCtl { irq, nmi, rdy, trrq };
            card.$method(&mut ctl, $data);
        }
    }};
}

/// The ABC bus: one card position, strobe-based protocol.
pub struct AbcBus {
    tag: String,
    cputag: String,
    card: Option<Box<dyn AbcBusCard>>,
    irq: OutputLine,
    nmi: OutputLine,
    rdy: OutputLine,
    trrq: OutputLine,
}

impl AbcBus {
    #[must_use]
    pub fn new(tag: &str, cputag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            cputag: cputag.to_string(),
            card: None,
            irq: OutputLine::new(),
            nmi: OutputLine::new(),
            rdy: OutputLine::new(),
            trrq: OutputLine::new(),
        }
    }

    pub fn set_out_irq(&mut self, callback: LineCallback) {
        self.irq.set_callback(callback);
    }

    pub fn set_out_nmi(&mut self, callback: LineCallback) {
        self.nmi.set_callback(callback);
    }

    pub fn set_out_rdy(&mut self, callback: LineCallback) {
        self.rdy.set_callback(callback);
    }

    pub fn set_out_trrq(&mut self, callback: LineCallback) {
        self.trrq.set_callback(callback);
    }

    #[must_use]
    pub fn has_card(&self) -> bool {
        self.card.is_some()
    }

    // Computer interface.

    pub fn cs_w(&mut self, data: u8) {
        if let Some(card) = self.card.as_mut() {
            card.cs_w(data);
        }
    }

    /// RST strobe read: resets the card, data floats.
    pub fn rst_r(&mut self) -> u8 {
        BusDevice::reset(self);
        OPEN_BUS
    }

    pub fn inp_r(&mut self) -> u8 {
        strobe_read!(self, inp_r)
    }

    pub fn out_w(&mut self, data: u8) {
        strobe_write!(self, out_w, data);
    }

    pub fn stat_r(&mut self) -> u8 {
        strobe_read!(self, stat_r)
    }

    pub fn c1_w(&mut self, data: u8) {
        strobe_write!(self, c1_w, data);
    }

    pub fn c2_w(&mut self, data: u8) {
        strobe_write!(self, c2_w, data);
    }

    pub fn c3_w(&mut self, data: u8) {
        strobe_write!(self, c3_w, data);
    }

    pub fn c4_w(&mut self, data: u8) {
        strobe_write!(self, c4_w, data);
    }

    // Latched line readback.

    #[must_use]
    pub fn irq_r(&self) -> bool {
        self.irq.state()
    }

    #[must_use]
    pub fn nmi_r(&self) -> bool {
        self.nmi.state()
    }

    #[must_use]
    pub fn rdy_r(&self) -> bool {
        self.rdy.state()
    }

    #[must_use]
    pub fn trrq_r(&self) -> bool {
        self.trrq.state()
    }
}

impl CardReceiver for AbcBus {
    type Card = dyn AbcBusCard;

    fn attach_card(&mut self, slot_tag: &str, card: Box<dyn AbcBusCard>) -> Result<(), ConfigError> {
        debug!("{:?}: card attached at {slot_tag:?}", self.tag);
        self.card = Some(card);
        Ok(())
    }
}

impl BusDevice for AbcBus {
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

/// Cards selectable for the ABC bus.
#[must_use]
pub fn abcbus_cards() -> CardRegistry<dyn AbcBusCard> {
    let mut cards: CardRegistry<dyn AbcBusCard> = CardRegistry::new();
    cards.register("ramdisk", || Box::new(RamDiskCard::new(0x2D)));
    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bus_strobes_float() {
        let mut bus = AbcBus::new("bus", "maincpu");
        assert_eq!(bus.inp_r(), OPEN_BUS);
        assert_eq!(bus.stat_r(), OPEN_BUS);
        bus.cs_w(0x2D);
        bus.out_w(0x00);
        bus.c1_w(0x00);
        assert_eq!(bus.inp_r(), OPEN_BUS);
    }

    #[test]
    fn rst_strobe_resets_and_floats() {
        let mut bus = AbcBus::new("bus", "maincpu");
        bus.attach_card("io1", Box::new(RamDiskCard::new(0x2D)))
            .expect("attach");
        bus.cs_w(0x2D);
        assert_ne!(bus.stat_r(), OPEN_BUS); // selected
        assert_eq!(bus.rst_r(), OPEN_BUS);
        assert_eq!(bus.stat_r(), OPEN_BUS); // deselected by reset
    }

    #[test]
    fn card_lines_latch_with_readback() {
        let mut bus = AbcBus::new("bus", "maincpu");
        bus.irq.set(true);
        assert!(bus.irq_r());
        assert!(!bus.nmi_r());
        bus.irq.set(false);
        assert!(!bus.irq_r());
    }
}
