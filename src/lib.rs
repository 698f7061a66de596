pub mod error;
pub mod model;
pub mod shape;
pub mod validation;

// Re-export commonly used types
pub use error::{Error, Result, ResultType};
pub use model::{
    FeatureDescription, FeatureType, LayerKind, LayerParams, Model, ModelDescription, ModelKind, NeuralNetwork,
    NeuralNetworkLayer, WeightParams,
};
pub use shape::{NeuralNetworkShaper, RangeValue, ShapeConstraint, ShapeRange};
pub use validation::{validate, LayerRegistry, ValidationOptions, Validator};
