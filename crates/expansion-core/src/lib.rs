//! Core plumbing for expansion-bus families.
//!
//! Every bus family (single-card, fixed-array, daisy-chained) shares the
//! same composition machinery: a backplane that owns buses and drives the
//! two-phase start ordering, slot placeholders that carry card choices
//! from configuration into the owning bus, string-keyed card registries,
//! host address-space windows, and interrupt output lines. The family
//! crates supply the card traits and dispatch rules; everything here is
//! topology-agnostic.

mod backplane;
mod config;
mod cpu;
mod error;
mod line;
mod region;
mod registry;
mod slot;
mod space;

pub use backplane::{Backplane, BusDevice, SlotDevice};
pub use config::{MachineConfig, SlotEntry};
pub use cpu::{CpuLine, HostCpu, SharedCpu, input_line};
pub use error::ConfigError;
pub use line::{LineCallback, OutputLine, WiredOrLine};
pub use region::Region;
pub use registry::{CardFactory, CardRegistry};
pub use slot::{CardReceiver, Slot};
pub use space::{Access, AddressSpace, OPEN_BUS, SharedRam};
