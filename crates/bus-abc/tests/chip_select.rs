//! Machine-level tests for the strobe bus: select-code scanning,
//! transparent non-selection observed through the bus, and latched line
//! forwarding to the CPU pins.

use bus_abc::{AbcBus, AbcBusCard, AbcBusCtl, AbcBusSlot, abcbus_cards};
use expansion_core::{Backplane, OPEN_BUS};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Card that asserts IRQ while selected.
struct IrqWhileSelected {
    select_code: u8,
    selected: bool,
}

impl AbcBusCard for IrqWhileSelected {
    fn cs_w(&mut self, data: u8) {
        self.selected = data == self.select_code;
    }

    fn stat_r(&mut self, ctl: &mut AbcBusCtl<'_>) -> u8 {
        if self.selected {
            ctl.irq_w(true);
            0x01
        } else {
            OPEN_BUS
        }
    }

    fn c1_w(&mut self, ctl: &mut AbcBusCtl<'_>, _data: u8) {
        if self.selected {
            ctl.irq_w(false);
        }
    }
}

fn machine_with(card: Box<dyn AbcBusCard>) -> Backplane {
    init_logging();
    let mut backplane = Backplane::new();
    backplane.add_cpu("maincpu");
    backplane.add_bus(AbcBus::new("bus", "maincpu"));
    backplane.add_slot(AbcBusSlot::new("bus", "io1").with_card(card));
    backplane.start().expect("start");
    backplane
}

#[test]
fn select_scan_finds_only_the_configured_code() {
    let registry = abcbus_cards();
    let mut backplane = machine_with(registry.create("ramdisk").expect("known"));
    let bus = backplane.bus_mut::<AbcBus>("bus").expect("bus");

    let mut answering = Vec::new();
    for code in 0u8..=0xFF {
        bus.cs_w(code);
        if bus.stat_r() != OPEN_BUS {
            answering.push(code);
        }
    }
    assert_eq!(answering, vec![0x2D]);
}

#[test]
fn unselected_strobes_have_no_side_effects() {
    let registry = abcbus_cards();
    let mut backplane = machine_with(registry.create("ramdisk").expect("known"));
    let bus = backplane.bus_mut::<AbcBus>("bus").expect("bus");

    // Write a marker while selected.
    bus.cs_w(0x2D);
    bus.c4_w(0x00); // rewind
    bus.out_w(0x77);

    // Deselect and hammer every strobe.
    bus.cs_w(0x00);
    bus.c4_w(0x00);
    bus.out_w(0x12);
    assert_eq!(bus.inp_r(), OPEN_BUS);
    assert_eq!(bus.stat_r(), OPEN_BUS);

    // The marker survived and the cursor never moved.
    bus.cs_w(0x2D);
    bus.c4_w(0x00);
    assert_eq!(bus.inp_r(), 0x77);
}

#[test]
fn selected_irq_reaches_the_cpu_and_readback() {
    let mut backplane = machine_with(Box::new(IrqWhileSelected {
        select_code: 0x36,
        selected: false,
    }));
    let cpu = backplane.cpu("maincpu").expect("cpu");
    let bus = backplane.bus_mut::<AbcBus>("bus").expect("bus");

    bus.cs_w(0x36);
    bus.stat_r();
    assert!(bus.irq_r());
    assert!(cpu.borrow().irq);

    bus.c1_w(0x00);
    assert!(!bus.irq_r());
    assert!(!cpu.borrow().irq);
}

#[test]
fn empty_slot_scans_clean() {
    init_logging();
    let mut backplane = Backplane::new();
    backplane.add_cpu("maincpu");
    backplane.add_bus(AbcBus::new("bus", "maincpu"));
    backplane.add_slot(AbcBusSlot::new("bus", "io1")); // unpopulated
    backplane.start().expect("start");

    let bus = backplane.bus_mut::<AbcBus>("bus").expect("bus");
    for code in 0u8..=0xFF {
        bus.cs_w(code);
        assert_eq!(bus.stat_r(), OPEN_BUS);
        assert_eq!(bus.inp_r(), OPEN_BUS);
    }
}
