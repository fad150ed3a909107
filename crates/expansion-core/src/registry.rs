//! Selectable-card registries.
//!
//! Each bus family publishes a registry mapping short card names (the
//! names a machine description selects by, e.g. `"aci"` or `"fastram"`)
//! to factories producing a boxed card of that family. Resolution
//! happens once, at machine-description build time.

use crate::error::ConfigError;
use std::collections::HashMap;

/// Factory producing one card instance in its power-on state.
pub type CardFactory<C> = fn() -> Box<C>;

/// String-keyed card factory table for one bus family.
pub struct CardRegistry<C: ?Sized> {
    factories: HashMap<&'static str, CardFactory<C>>,
}

impl<C: ?Sized> Default for CardRegistry<C> {
    fn default() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
}

impl<C: ?Sized> CardRegistry<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a card type. Re-registering a name replaces the factory.
    pub fn register(&mut self, name: &'static str, factory: CardFactory<C>) {
        self.factories.insert(name, factory);
    }

    /// Instantiate a card by name.
    pub fn create(&self, name: &str) -> Result<Box<C>, ConfigError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownCard(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Widget: std::fmt::Debug {
        fn id(&self) -> u8;
    }

    #[derive(Debug)]
    struct A;
    impl Widget for A {
        fn id(&self) -> u8 {
            1
        }
    }

    #[test]
    fn create_by_name() {
        let mut registry: CardRegistry<dyn Widget> = CardRegistry::new();
        registry.register("a", || Box::new(A));
        assert_eq!(registry.create("a").expect("registered").id(), 1);
    }

    #[test]
    fn unknown_names_are_config_errors() {
        let registry: CardRegistry<dyn Widget> = CardRegistry::new();
        let err = registry.create("nope").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCard(name) if name == "nope"));
    }
}
