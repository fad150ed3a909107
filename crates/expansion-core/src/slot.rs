//! Slot placeholders.
//!
//! A [`Slot`] exists only to carry the declarative choice of "which card
//! occupies this bus position" from machine-description assembly into
//! the owning bus. During backplane phase 2 it looks its bus up by tag,
//! recovers the concrete bus type, and hands the card over — after
//! which the slot is gone. Leaving a slot empty is a perfectly normal
//! configuration (a card-less backplane position) and registers
//! nothing.

use crate::backplane::{BusDevice, SlotDevice};
use crate::error::ConfigError;

use log::trace;

/// Implemented by each bus family: how a card is accepted from a slot.
///
/// Single-card buses overwrite their card pointer (last registration
/// wins), array buses index by the parsed slot tag, chain buses append
/// in registration order.
pub trait CardReceiver {
    /// The family's card trait object type.
    type Card: ?Sized;

    fn attach_card(&mut self, slot_tag: &str, card: Box<Self::Card>) -> Result<(), ConfigError>;
}

/// Configuration-time placeholder for one bus position.
pub struct Slot<B: CardReceiver + BusDevice> {
    bus_tag: String,
    slot_tag: String,
    card: Option<Box<B::Card>>,
}

impl<B: CardReceiver + BusDevice> Slot<B> {
    #[must_use]
    pub fn new(bus_tag: &str, slot_tag: &str) -> Self {
        Self {
            bus_tag: bus_tag.to_string(),
            slot_tag: slot_tag.to_string(),
            card: None,
        }
    }

    /// Plug a card in. Replaces any previously plugged card.
    pub fn plug(&mut self, card: Box<B::Card>) {
        self.card = Some(card);
    }

    /// Builder-style [`plug`](Self::plug).
    #[must_use]
    pub fn with_card(mut self, card: Box<B::Card>) -> Self {
        self.card = Some(card);
        self
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.card.is_some()
    }
}

impl<B: CardReceiver + BusDevice> SlotDevice for Slot<B> {
    fn bus_tag(&self) -> &str {
        &self.bus_tag
    }

    fn slot_tag(&self) -> &str {
        &self.slot_tag
    }

    fn register(self: Box<Self>, buses: &mut [Box<dyn BusDevice>]) -> Result<(), ConfigError> {
        let this = *self;
        let Some(card) = this.card else {
            trace!("slot {:?} unpopulated", this.slot_tag);
            return Ok(());
        };

        let bus = buses
            .iter_mut()
            .find(|bus| bus.tag() == this.bus_tag)
            .ok_or_else(|| ConfigError::NoSuchBus(this.bus_tag.clone()))?;
        let bus = bus
            .as_any_mut()
            .downcast_mut::<B>()
            .ok_or_else(|| ConfigError::WrongBusType {
                tag: this.bus_tag.clone(),
                expected: std::any::type_name::<B>(),
            })?;
        bus.attach_card(&this.slot_tag, card)
    }
}
