//! Component registry.
//!
//! Maps [`ComponentDescription`] patterns to processor factories. A registry is
//! an ordinary value: create one, register components, and hand it to every
//! [`Graph`](crate::Graph) that should see them. There is no process-wide table.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use patchbay_core::{ComponentDescription, ComponentRegistry, Graph};
//!
//! let registry = Arc::new(ComponentRegistry::new());
//! registry.register(
//!     ComponentDescription::from_bytes(b"aufx", b"gain", b"pbay"),
//!     "gain",
//!     |_: &ComponentDescription, config: &[u8]| Gain::from_config(config),
//! );
//! let graph = Graph::new(registry);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::ComponentDescription;
use crate::error::ProcessorError;
use crate::processor::NodeProcessor;

/// Creates processors for a family of component descriptions.
pub trait ProcessorFactory: Send + Sync {
    /// Builds a processor for `description` configured by `config`.
    fn instantiate(
        &self,
        description: &ComponentDescription,
        config: &[u8],
    ) -> Result<Box<dyn NodeProcessor>, ProcessorError>;
}

impl<F> ProcessorFactory for F
where
    F: Fn(&ComponentDescription, &[u8]) -> Result<Box<dyn NodeProcessor>, ProcessorError>
        + Send
        + Sync,
{
    fn instantiate(
        &self,
        description: &ComponentDescription,
        config: &[u8],
    ) -> Result<Box<dyn NodeProcessor>, ProcessorError> {
        self(description, config)
    }
}

/// One registered component family.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Pattern matched against node descriptions. Wildcard fields match anything.
    pub pattern: ComponentDescription,
    /// Human-readable name.
    pub name: &'static str,
    factory: Arc<dyn ProcessorFactory>,
}

impl RegistryEntry {
    /// Instantiates a processor through this entry's factory.
    pub fn instantiate(
        &self,
        description: &ComponentDescription,
        config: &[u8],
    ) -> Result<Box<dyn NodeProcessor>, ProcessorError> {
        self.factory.instantiate(description, config)
    }
}

impl core::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("pattern", &self.pattern)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Thread-safe table of processor factories.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for descriptions matching `pattern`.
    ///
    /// Later registrations shadow earlier ones with overlapping patterns.
    pub fn register<F>(&self, pattern: ComponentDescription, name: &'static str, factory: F)
    where
        F: ProcessorFactory + 'static,
    {
        tracing::debug!(%pattern, name, "registered component");
        self.entries.write().push(RegistryEntry {
            pattern,
            name,
            factory: Arc::new(factory),
        });
    }

    /// Removes every registration whose pattern equals `pattern`.
    ///
    /// Returns the number of entries removed. Nodes already instantiated keep
    /// their processors.
    pub fn unregister(&self, pattern: &ComponentDescription) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.pattern != *pattern);
        before - entries.len()
    }

    /// Returns the most recently registered entry matching `description`.
    pub fn find(&self, description: &ComponentDescription) -> Option<RegistryEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|e| e.pattern.matches(description))
            .cloned()
    }

    /// Snapshot of every registration in registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.read().clone()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl core::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{FourCc, types};
    use crate::error::RenderError;
    use crate::processor::{Inputs, Outputs, RenderContext};

    struct Tagged(u8);

    impl NodeProcessor for Tagged {
        fn output_count(&self) -> usize {
            self.0 as usize
        }

        fn render(
            &mut self,
            _ctx: &RenderContext<'_>,
            _inputs: &Inputs<'_>,
            _outputs: &mut Outputs<'_>,
        ) -> Result<(), RenderError> {
            Ok(())
        }
    }

    fn tagged(tag: u8) -> impl ProcessorFactory {
        move |_: &ComponentDescription, _: &[u8]| -> Result<Box<dyn NodeProcessor>, ProcessorError> {
            Ok(Box::new(Tagged(tag)))
        }
    }

    fn gain() -> ComponentDescription {
        ComponentDescription::from_bytes(b"aufx", b"gain", b"pbay")
    }

    #[test]
    fn find_returns_latest_match() {
        let registry = ComponentRegistry::new();
        registry.register(ComponentDescription::any_of_type(types::EFFECT), "any", tagged(1));
        registry.register(gain(), "gain", tagged(2));

        let entry = registry.find(&gain()).unwrap();
        assert_eq!(entry.name, "gain");
        assert_eq!(entry.instantiate(&gain(), &[]).unwrap().output_count(), 2);

        let other = ComponentDescription::new(types::EFFECT, FourCc(*b"dely"), FourCc(*b"pbay"));
        assert_eq!(registry.find(&other).unwrap().name, "any");
    }

    #[test]
    fn unregister_removes_exact_pattern() {
        let registry = ComponentRegistry::new();
        registry.register(gain(), "gain", tagged(1));
        registry.register(gain(), "gain-v2", tagged(2));
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.unregister(&gain()), 2);
        assert!(registry.is_empty());
        assert!(registry.find(&gain()).is_none());
    }

    #[test]
    fn unknown_description_is_none() {
        let registry = ComponentRegistry::new();
        registry.register(gain(), "gain", tagged(1));
        assert!(registry.find(&ComponentDescription::SUB_GRAPH).is_none());
        registry.clear();
        assert_eq!(registry.entries().len(), 0);
    }
}
