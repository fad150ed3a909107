//! Amiga Zorro-II style daisy-chained expansion bus.
//!
//! Cards sit on an ordered chain — insertion order is chain order, and
//! chain order is autoconfiguration priority. At reset the bus raises
//! `CONFIG_IN` on the first card; the host then talks to that card
//! through the shared autoconfig window ($E80000-$E8FFFF), reading its
//! descriptor nibbles and finally writing it a base address (or telling
//! it to shut up). Completion passes `CONFIG_OUT` down the chain to the
//! next card, until the chain is exhausted and the bus settles idle.
//!
//! Outside the autoconfig window, configured cards answer at whatever
//! windows they installed. INT2 and INT6 are wired-OR across the chain;
//! the CPU function code is broadcast to every card.

mod autoconfig;
mod fastram;

pub use autoconfig::{BoardDescriptor, SizeCode};
pub use fastram::FastRamCard;

use expansion_core::{
    Access, AddressSpace, BusDevice, CardReceiver, CardRegistry, ConfigError, CpuLine,
    LineCallback, OPEN_BUS, SharedCpu, SharedRam, Slot, WiredOrLine, input_line,
};
use log::{debug, warn};
use std::any::Any;
use std::collections::HashMap;

/// Slot for a [`ZorroBus`].
pub type ZorroBusSlot = Slot<ZorroBus>;

/// Base of the shared autoconfig window.
pub const AUTOCONFIG_BASE: u32 = 0x00E8_0000;
/// Last address of the shared autoconfig window.
pub const AUTOCONFIG_END: u32 = 0x00E8_FFFF;

/// Autoconfiguration sequencing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoconfigState {
    /// Chain exhausted (or never started).
    Idle,
    /// The card at this chain position owns the autoconfig window.
    Configuring(usize),
}

/// A configuring card's answer to an autoconfig register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoconfigAck {
    /// Still collecting register writes.
    Busy,
    /// Base address accepted; the card has claimed its window.
    Configured,
    /// Card asked to shut up; it will never claim a window.
    ShutUp,
}

/// Routing token: chain position plus the card's window id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardWindow {
    pub card: u8,
    pub window: u8,
}

/// Card-facing installation view, bound to one chain position.
pub struct ZorroInstaller<'a> {
    space: &'a mut AddressSpace<CardWindow>,
    card: u8,
}

impl ZorroInstaller<'_> {
    pub fn install_device(&mut self, start: u32, end: u32, window: u8) {
        self.space.install_device(
            start,
            end,
            CardWindow {
                card: self.card,
                window,
            },
        );
    }

    pub fn install_bank(&mut self, start: u32, end: u32, tag: &str, data: SharedRam) {
        self.space.install_bank(start, end, tag, data);
    }
}

/// Card-facing line view during dispatch.
pub struct ZorroBusCtl<'a> {
    int2: &'a mut WiredOrLine,
    int6: &'a mut WiredOrLine,
    card: usize,
}

impl ZorroBusCtl<'_> {
    pub fn int2_w(&mut self, state: bool) {
        self.int2.drive(self.card, state);
    }

    pub fn int6_w(&mut self, state: bool) {
        self.int6.drive(self.card, state);
    }
}

/// Contract for cards on the Zorro chain.
pub trait ZorroCard {
    /// `CONFIG_IN` asserted: this card now owns the autoconfig window.
    fn cfgin(&mut self) {}

    /// Descriptor nibble read while configuring.
    fn autoconfig_read(&mut self, offset: u32) -> u8 {
        let _ = offset;
        OPEN_BUS
    }

    /// Register write while configuring. A `Configured` or `ShutUp`
    /// answer passes `CONFIG_OUT` down the chain.
    fn autoconfig_write(
        &mut self,
        bus: &mut ZorroInstaller<'_>,
        offset: u32,
        value: u8,
    ) -> AutoconfigAck {
        let _ = (bus, offset, value);
        AutoconfigAck::Busy
    }

    /// Read from a window the card installed after configuration.
    fn window_read(&mut self, ctl: &mut ZorroBusCtl<'_>, window: u8, offset: u32) -> u8 {
        let _ = (ctl, window, offset);
        OPEN_BUS
    }

    /// Write to a window the card installed after configuration.
    fn window_write(&mut self, ctl: &mut ZorroBusCtl<'_>, window: u8, offset: u32, value: u8) {
        let _ = (ctl, window, offset, value);
    }

    /// CPU function code broadcast.
    fn fc_w(&mut self, code: u8) {
        let _ = code;
    }

    fn reset(&mut self) {}
}

/// The Zorro-II chain bus.
pub struct ZorroBus {
    tag: String,
    cputag: String,
    space: AddressSpace<CardWindow>,
    cards: Vec<Box<dyn ZorroCard>>,
    state: AutoconfigState,
    int2: WiredOrLine,
    int6: WiredOrLine,
}

impl ZorroBus {
    #[must_use]
    pub fn new(tag: &str, cputag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            cputag: cputag.to_string(),
            space: AddressSpace::new(),
            cards: Vec::new(),
            state: AutoconfigState::Idle,
            int2: WiredOrLine::new(),
            int6: WiredOrLine::new(),
        }
    }

    #[must_use]
    pub fn ncards(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn autoconfig_state(&self) -> AutoconfigState {
        self.state
    }

    /// The card at a chain position, if any.
    #[must_use]
    pub fn card(&self, index: usize) -> Option<&dyn ZorroCard> {
        self.cards.get(index).map(|card| &**card)
    }

    pub fn card_mut(&mut self, index: usize) -> Option<&mut (dyn ZorroCard + 'static)> {
        self.cards.get_mut(index).map(|card| &mut **card)
    }

    pub fn set_out_int2(&mut self, callback: LineCallback) {
        self.int2.set_callback(callback);
    }

    pub fn set_out_int6(&mut self, callback: LineCallback) {
        self.int6.set_callback(callback);
    }

    /// `CONFIG_OUT` from the configuring card: advance the chain to the
    /// next card, or settle idle past the end.
    pub fn cfgout_w(&mut self) {
        match self.state {
            AutoconfigState::Configuring(current) => {
                let next = current + 1;
                if next < self.cards.len() {
                    debug!("{:?}: autoconfig advances to card {next}", self.tag);
                    self.state = AutoconfigState::Configuring(next);
                    self.cards[next].cfgin();
                } else {
                    debug!("{:?}: autoconfig chain exhausted", self.tag);
                    self.state = AutoconfigState::Idle;
                }
            }
            AutoconfigState::Idle => {
                warn!("{:?}: CONFIG_OUT with no card configuring", self.tag);
            }
        }
    }

    /// Host-side read.
    pub fn read(&mut self, addr: u32) -> u8 {
        if (AUTOCONFIG_BASE..=AUTOCONFIG_END).contains(&addr) {
            return match self.state {
                AutoconfigState::Configuring(current) => {
                    self.cards[current].autoconfig_read(addr - AUTOCONFIG_BASE)
                }
                AutoconfigState::Idle => OPEN_BUS,
            };
        }
        match self.space.resolve(addr) {
            Access::Device { token, offset } => {
                let Self {
                    cards, int2, int6, ..
                } = self;
                let index = token.card as usize;
                let mut ctl = ZorroBusCtl {
                    int2,
                    int6,
                    card: index,
                };
                cards[index].window_read(&mut ctl, token.window, offset)
            }
            Access::Bank { bank, offset } => self.space.bank_read(bank, offset),
            Access::Open => OPEN_BUS,
        }
    }

    /// Host-side write. A write into the autoconfig window goes to the
    /// configuring card; its completion acknowledgement advances the
    /// chain.
    pub fn write(&mut self, addr: u32, value: u8) {
        if (AUTOCONFIG_BASE..=AUTOCONFIG_END).contains(&addr) {
            let AutoconfigState::Configuring(current) = self.state else {
                return;
            };
            let Self { cards, space, .. } = self;
            let ack = cards[current].autoconfig_write(
                &mut ZorroInstaller {
                    space,
                    card: current as u8,
                },
                addr - AUTOCONFIG_BASE,
                value,
            );
            match ack {
                AutoconfigAck::Busy => {}
                AutoconfigAck::Configured | AutoconfigAck::ShutUp => {
                    debug!("{:?}: card {current} {ack:?}", self.tag);
                    self.cfgout_w();
                }
            }
            return;
        }
        match self.space.resolve(addr) {
            Access::Device { token, offset } => {
                let Self {
                    cards, int2, int6, ..
                } = self;
                let index = token.card as usize;
                let mut ctl = ZorroBusCtl {
                    int2,
                    int6,
                    card: index,
                };
                cards[index].window_write(&mut ctl, token.window, offset, value);
            }
            Access::Bank { bank, offset } => self.space.bank_write(bank, offset, value),
            Access::Open => {}
        }
    }

    /// Drive one card's INT2 source (card side).
    pub fn int2_w(&mut self, card: usize, state: bool) {
        self.int2.drive(card, state);
    }

    /// Drive one card's INT6 source (card side).
    pub fn int6_w(&mut self, card: usize, state: bool) {
        self.int6.drive(card, state);
    }

    #[must_use]
    pub fn int2_state(&self) -> bool {
        self.int2.state()
    }

    #[must_use]
    pub fn int6_state(&self) -> bool {
        self.int6.state()
    }

    /// Broadcast the CPU function code to every card, chain order.
    pub fn fc_w(&mut self, code: u8) {
        for card in &mut self.cards {
            card.fc_w(code);
        }
    }
}

impl CardReceiver for ZorroBus {
    type Card = dyn ZorroCard;

    fn attach_card(&mut self, slot_tag: &str, card: Box<dyn ZorroCard>) -> Result<(), ConfigError> {
        debug!(
            "{:?}: card appended at {slot_tag:?} (chain position {})",
            self.tag,
            self.cards.len()
        );
        self.cards.push(card);
        Ok(())
    }
}

impl BusDevice for ZorroBus {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn start(&mut self, cpus: &HashMap<String, SharedCpu>) -> Result<(), ConfigError> {
        let cpu = cpus
            .get(&self.cputag)
            .ok_or_else(|| ConfigError::NoSuchCpu(self.cputag.clone()))?;
        if !self.int2.has_callback() {
            self.int2.set_callback(input_line(cpu, CpuLine::Irq));
        }
        if !self.int6.has_callback() {
            self.int6.set_callback(input_line(cpu, CpuLine::Nmi));
        }
        Ok(())
    }

    fn start_cards(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Reset re-seeds the autoconfig chain: first card in, everyone
    /// else waits for `CONFIG_OUT` to ripple down.
    fn reset(&mut self) {
        self.int2.clear();
        self.int6.clear();
        for card in &mut self.cards {
            card.reset();
        }
        if self.cards.is_empty() {
            self.state = AutoconfigState::Idle;
        } else {
            debug!("{:?}: autoconfig starts at card 0", self.tag);
            self.state = AutoconfigState::Configuring(0);
            self.cards[0].cfgin();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Cards selectable for the Zorro chain.
#[must_use]
pub fn zorro_cards() -> CardRegistry<dyn ZorroCard> {
    let mut cards: CardRegistry<dyn ZorroCard> = CardRegistry::new();
    cards.register("fastram", || Box::new(FastRamCard::new(SizeCode::M2)));
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type VisitLog = Rc<RefCell<Vec<usize>>>;

    /// Chain member that logs every `CONFIG_IN` it receives.
    struct ChainProbe {
        id: usize,
        visits: VisitLog,
    }

    impl ZorroCard for ChainProbe {
        fn cfgin(&mut self) {
            self.visits.borrow_mut().push(self.id);
        }
    }

    fn chain_of(n: usize) -> (ZorroBus, VisitLog) {
        let visits: VisitLog = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ZorroBus::new("zorro", "maincpu");
        for id in 0..n {
            let probe = ChainProbe {
                id,
                visits: Rc::clone(&visits),
            };
            bus.attach_card(&format!("z{id}"), Box::new(probe))
                .expect("attach");
        }
        (bus, visits)
    }

    #[test]
    fn reset_seeds_the_first_card() {
        let (mut bus, visits) = chain_of(3);
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Idle);
        bus.reset();
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Configuring(0));
        assert_eq!(*visits.borrow(), vec![0]);
    }

    #[test]
    fn chain_visits_each_card_once_in_order() {
        let (mut bus, visits) = chain_of(3);
        bus.reset();

        bus.cfgout_w();
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Configuring(1));
        bus.cfgout_w();
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Configuring(2));
        bus.cfgout_w();
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Idle);

        // Every card visited exactly once, first-inserted first.
        assert_eq!(*visits.borrow(), vec![0, 1, 2]);

        // Extra CONFIG_OUT past the end stays idle.
        bus.cfgout_w();
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Idle);
        assert_eq!(visits.borrow().len(), 3);
    }

    #[test]
    fn empty_chain_stays_idle_over_reset() {
        let (mut bus, _visits) = chain_of(0);
        bus.reset();
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Idle);
        assert_eq!(bus.read(AUTOCONFIG_BASE), OPEN_BUS);
    }

    #[test]
    fn autoconfig_window_floats_when_idle() {
        let (mut bus, visits) = chain_of(2);
        // No reset yet: nobody owns the window.
        assert_eq!(bus.read(AUTOCONFIG_BASE + 0x40), OPEN_BUS);
        bus.write(AUTOCONFIG_BASE + 0x48, 0x20); // dropped
        assert_eq!(bus.autoconfig_state(), AutoconfigState::Idle);
        assert!(visits.borrow().is_empty());
    }

    #[test]
    fn interrupts_aggregate_per_chain_position() {
        let (mut bus, _visits) = chain_of(2);
        bus.int2_w(0, true);
        bus.int2_w(1, true);
        bus.int2_w(0, false);
        assert!(bus.int2_state());
        bus.int2_w(1, false);
        assert!(!bus.int2_state());
        assert!(!bus.int6_state());
    }
}
