//! Configuration-error taxonomy.
//!
//! Everything here is a machine-description mistake: a tag that resolves
//! to nothing, a card pushed at a bus of the wrong family, a slot index
//! past the end of the backplane. These are fatal at start time — the
//! backplane aborts bring-up on the first one rather than powering on a
//! mis-wired machine.

use thiserror::Error;

/// A fatal error in the machine description, raised during device start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A slot names a bus tag that no configured bus carries.
    #[error("no bus named {0:?}")]
    NoSuchBus(String),

    /// The named bus exists but is not of the family the slot expects.
    #[error("bus {tag:?} is not a {expected}")]
    WrongBusType {
        tag: String,
        expected: &'static str,
    },

    /// A bus names a CPU tag that no configured CPU carries.
    #[error("no CPU named {0:?}")]
    NoSuchCpu(String),

    /// A card registered to a slot index past the end of the bus.
    #[error("slot {slot} out of range for bus {bus:?} ({slots} slots)")]
    SlotOutOfRange {
        bus: String,
        slot: usize,
        slots: usize,
    },

    /// A slot tag that does not parse as a slot position.
    #[error("malformed slot tag {0:?}")]
    BadSlotTag(String),

    /// A card name with no factory in the family's registry.
    #[error("unknown card type {0:?}")]
    UnknownCard(String),
}
