//! The backplane: device tree and start ordering.
//!
//! Hardware composition is two-phase by nature — slot wiring happens
//! before power-on. The backplane makes that ordering explicit:
//!
//! 1. every bus starts, resolving its CPU tag and defaulting any
//!    unwired interrupt output callbacks;
//! 2. every slot registers, looking its bus up by tag (a failed lookup
//!    or family downcast aborts start) and transferring its card into
//!    the bus — the slot is consumed and plays no further part;
//! 3. every bus starts its cards, which is when cards request their
//!    address-space windows.
//!
//! A configuration error anywhere aborts the whole sequence; there is no
//! partial bring-up of a mis-wired machine.

use crate::cpu::SharedCpu;
use crate::error::ConfigError;
use std::any::Any;
use std::collections::HashMap;

use log::debug;

/// A bus instance ownable by the backplane.
///
/// Implementations also expose their family-specific surface (card
/// traits, dispatch entry points); the backplane only needs the
/// lifecycle hooks and a way to recover the concrete type for slot
/// registration.
pub trait BusDevice: Any {
    /// The tag slots use to find this bus.
    fn tag(&self) -> &str;

    /// Phase 1: resolve host resources (CPU tag, default line wiring).
    fn start(&mut self, cpus: &HashMap<String, SharedCpu>) -> Result<(), ConfigError>;

    /// Phase 3: start attached cards; cards install their windows here.
    fn start_cards(&mut self) -> Result<(), ConfigError>;

    /// Power-on / warm reset. Autoconfiguring topologies re-seed their
    /// chain here; others propagate the reset to their cards.
    fn reset(&mut self);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A slot placeholder awaiting registration (phase 2). Consumed by
/// [`Backplane::start`].
pub trait SlotDevice {
    fn bus_tag(&self) -> &str;
    fn slot_tag(&self) -> &str;

    /// Find the owning bus and hand the plugged card over. No-op for an
    /// unpopulated slot.
    fn register(self: Box<Self>, buses: &mut [Box<dyn BusDevice>]) -> Result<(), ConfigError>;
}

/// The machine's device tree: host CPUs, buses, and pending slots.
#[derive(Default)]
pub struct Backplane {
    cpus: HashMap<String, SharedCpu>,
    buses: Vec<Box<dyn BusDevice>>,
    slots: Vec<Box<dyn SlotDevice>>,
}

impl Backplane {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host CPU under a tag and return its shared handle (tests
    /// and host glue keep it to observe interrupt pins).
    pub fn add_cpu(&mut self, tag: &str) -> SharedCpu {
        let cpu = crate::cpu::HostCpu::new_shared();
        self.cpus.insert(tag.to_string(), cpu.clone());
        cpu
    }

    pub fn add_bus<B: BusDevice>(&mut self, bus: B) {
        self.buses.push(Box::new(bus));
    }

    pub fn add_slot<S: SlotDevice + 'static>(&mut self, slot: S) {
        self.slots.push(Box::new(slot));
    }

    /// Run the three start phases in order.
    pub fn start(&mut self) -> Result<(), ConfigError> {
        for bus in &mut self.buses {
            debug!("starting bus {:?}", bus.tag());
            bus.start(&self.cpus)?;
        }
        for slot in std::mem::take(&mut self.slots) {
            debug!(
                "registering slot {:?} on bus {:?}",
                slot.slot_tag(),
                slot.bus_tag()
            );
            slot.register(&mut self.buses)?;
        }
        for bus in &mut self.buses {
            bus.start_cards()?;
        }
        Ok(())
    }

    /// Reset every bus, in configuration order.
    pub fn reset(&mut self) {
        for bus in &mut self.buses {
            bus.reset();
        }
    }

    #[must_use]
    pub fn cpu(&self, tag: &str) -> Option<SharedCpu> {
        self.cpus.get(tag).cloned()
    }

    /// Typed access to a bus by tag.
    pub fn bus<B: BusDevice>(&self, tag: &str) -> Result<&B, ConfigError> {
        let bus = self
            .buses
            .iter()
            .find(|bus| bus.tag() == tag)
            .ok_or_else(|| ConfigError::NoSuchBus(tag.to_string()))?;
        bus.as_any()
            .downcast_ref::<B>()
            .ok_or_else(|| ConfigError::WrongBusType {
                tag: tag.to_string(),
                expected: std::any::type_name::<B>(),
            })
    }

    /// Typed mutable access to a bus by tag.
    pub fn bus_mut<B: BusDevice>(&mut self, tag: &str) -> Result<&mut B, ConfigError> {
        let bus = self
            .buses
            .iter_mut()
            .find(|bus| bus.tag() == tag)
            .ok_or_else(|| ConfigError::NoSuchBus(tag.to_string()))?;
        bus.as_any_mut()
            .downcast_mut::<B>()
            .ok_or_else(|| ConfigError::WrongBusType {
                tag: tag.to_string(),
                expected: std::any::type_name::<B>(),
            })
    }
}
