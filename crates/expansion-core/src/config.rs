//! Declarative machine configuration.
//!
//! A machine description can carry its slot assignments as data — which
//! bus, which slot position, which card name (resolved against the
//! family's registry). The JSON form is what runners and test harnesses
//! feed in.

use serde::{Deserialize, Serialize};

/// One slot assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Tag of the owning bus.
    pub bus: String,
    /// Slot position tag on that bus.
    pub slot: String,
    /// Registry name of the plugged card; `None` leaves the slot empty.
    #[serde(default)]
    pub card: Option<String>,
}

/// The slot table of one machine description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub slots: Vec<SlotEntry>,
}

impl MachineConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
