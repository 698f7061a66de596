//! One check per layer kind, looked up by [`LayerKind`].

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::model::{LayerKind, NeuralNetworkLayer};

use super::network::NeuralNetworkSpecValidator;

/// Pull the kind-specific parameters out of a layer whose kind the registry already matched
macro_rules! layer_params {
    ($layer:expr, $variant:ident) => {
        match &$layer.layer {
            crate::model::LayerParams::$variant(params) => params,
            _ => return Err(super::kind_mismatch($layer)),
        }
    };
}

mod control_flow;
mod dense;
mod elementwise;
mod generators;
mod recurrent;
mod shape_ops;
mod spatial;

/// Validation function for a single layer within the current scope
pub type LayerCheck = fn(&mut NeuralNetworkSpecValidator<'_>, &NeuralNetworkLayer) -> Result<()>;

fn kind_mismatch(layer: &NeuralNetworkLayer) -> Error {
    Error::params(format!(
        "Layer '{}' is registered as {} but carries parameters of another kind.",
        layer.name,
        layer.kind()
    ))
}

/// Registry of layer checks keyed by layer kind
#[derive(Clone, Default)]
pub struct LayerRegistry {
    checks: HashMap<LayerKind, LayerCheck>,
}

impl fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("kinds", &self.checks.len())
            .finish()
    }
}

impl LayerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { checks: HashMap::new() }
    }

    /// Register a check, returning the one it replaces
    pub fn register(&mut self, kind: LayerKind, check: LayerCheck) -> Option<LayerCheck> {
        self.checks.insert(kind, check)
    }

    pub fn get(&self, kind: LayerKind) -> Option<LayerCheck> {
        self.checks.get(&kind).copied()
    }

    pub fn contains(&self, kind: LayerKind) -> bool {
        self.checks.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Registry holding a check for every layer kind
    pub fn standard() -> Self {
        let mut registry = Self::new();
        spatial::register(&mut registry);
        dense::register(&mut registry);
        recurrent::register(&mut registry);
        elementwise::register(&mut registry);
        shape_ops::register(&mut registry);
        control_flow::register(&mut registry);
        generators::register(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_standard_registry_covers_every_kind() {
        let registry = LayerRegistry::standard();
        let missing: Vec<LayerKind> = LayerKind::iter().filter(|k| !registry.contains(*k)).collect();
        assert!(missing.is_empty(), "no check registered for {:?}", missing);
        assert_eq!(registry.len(), LayerKind::iter().count());
    }

    #[test]
    fn test_register_replaces_previous_check() {
        fn accept(_: &mut NeuralNetworkSpecValidator<'_>, _: &NeuralNetworkLayer) -> Result<()> {
            Ok(())
        }
        let mut registry = LayerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(LayerKind::Softmax, accept).is_none());
        assert!(registry.register(LayerKind::Softmax, accept).is_some());
        assert!(registry.get(LayerKind::Copy).is_none());
    }
}
