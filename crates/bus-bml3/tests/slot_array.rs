//! Machine-level tests for the fixed-array bus: per-slot dispatch,
//! wired-OR aggregation observed at the CPU pins, and slot addressing
//! errors surfaced through the backplane.

use bus_bml3::{
    Bml3Bus, Bml3BusCtl, Bml3BusInstaller, Bml3BusSlot, Bml3Card, KanjiRomCard, bml3bus_cards,
};
use expansion_core::{Backplane, ConfigError, OPEN_BUS};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test card claiming a one-byte window; writes drive FIRQ with bit 0.
struct FirqCard {
    base: u32,
    last: u8,
}

impl FirqCard {
    fn new(base: u32) -> Self {
        Self { base, last: 0 }
    }
}

impl Bml3Card for FirqCard {
    fn start(&mut self, bus: &mut Bml3BusInstaller<'_>) -> Result<(), ConfigError> {
        bus.install_device(self.base, self.base, 0);
        Ok(())
    }

    fn window_read(&mut self, _ctl: &mut Bml3BusCtl<'_>, _window: u8, _offset: u32) -> u8 {
        self.last
    }

    fn window_write(&mut self, ctl: &mut Bml3BusCtl<'_>, _window: u8, _offset: u32, value: u8) {
        self.last = value;
        ctl.firq_w(value & 0x01 != 0);
    }
}

fn assembled(cards: &[(&str, u32)]) -> Backplane {
    init_logging();
    let mut backplane = Backplane::new();
    backplane.add_cpu("maincpu");
    backplane.add_bus(Bml3Bus::new("exp", "maincpu", 6));
    for (slot_tag, base) in cards {
        backplane.add_slot(
            Bml3BusSlot::new("exp", slot_tag).with_card(Box::new(FirqCard::new(*base))),
        );
    }
    backplane.start().expect("start");
    backplane
}

#[test]
fn each_slot_answers_its_own_window() {
    let mut backplane = assembled(&[("#1", 0xFF70), ("#3", 0xFF80)]);
    let bus = backplane.bus_mut::<Bml3Bus>("exp").expect("bus");

    bus.write(0xFF70, 0x10);
    bus.write(0xFF80, 0x30);
    assert_eq!(bus.read(0xFF70), 0x10);
    assert_eq!(bus.read(0xFF80), 0x30);
    assert_eq!(bus.read(0xFF71), OPEN_BUS);
}

#[test]
fn firq_aggregates_across_slots() {
    let mut backplane = assembled(&[("#1", 0xFF70), ("#3", 0xFF80)]);
    let cpu = backplane.cpu("maincpu").expect("cpu");
    let bus = backplane.bus_mut::<Bml3Bus>("exp").expect("bus");

    bus.write(0xFF70, 0x01); // slot 0 asserts
    assert!(cpu.borrow().firq);
    bus.write(0xFF80, 0x01); // slot 2 joins, no change visible
    assert!(cpu.borrow().firq);
    bus.write(0xFF70, 0x00); // slot 2 still drives the line
    assert!(cpu.borrow().firq);
    bus.write(0xFF80, 0x00);
    assert!(!cpu.borrow().firq);
}

#[test]
fn out_of_range_slot_aborts_machine_start() {
    let mut backplane = Backplane::new();
    backplane.add_cpu("maincpu");
    backplane.add_bus(Bml3Bus::new("exp", "maincpu", 2));
    backplane
        .add_slot(Bml3BusSlot::new("exp", "#5").with_card(Box::new(KanjiRomCard::new())));

    let err = backplane.start().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::SlotOutOfRange { slot: 5, slots: 2, .. }
    ));
}

#[test]
fn registry_builds_the_kanji_card() {
    let registry = bml3bus_cards();
    assert!(registry.contains("kanji"));

    let mut backplane = Backplane::new();
    backplane.add_cpu("maincpu");
    backplane.add_bus(Bml3Bus::new("exp", "maincpu", 6));
    backplane.add_slot(
        Bml3BusSlot::new("exp", "#2").with_card(registry.create("kanji").expect("kanji")),
    );
    backplane.start().expect("start");

    let bus = backplane.bus_mut::<Bml3Bus>("exp").expect("bus");
    // Freshly allocated ROM reads erased.
    bus.write(0xFF75, 0x00);
    bus.write(0xFF76, 0x00);
    assert_eq!(bus.read(0xFF75), 0xFF);
}
