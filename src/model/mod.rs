//! Typed, deserialized model description tree.
//!
//! Everything here is plain data; validation lives in [`crate::validation`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::error::Result;

pub mod feature;
pub mod kinds;
pub mod layers;
pub mod network;
pub mod update;
pub mod weights;

pub use feature::*;
pub use kinds::*;
pub use layers::*;
pub use network::*;
pub use update::*;
pub use weights::*;

/// Root of a model description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub specification_version: i32,
    pub description: ModelDescription,
    pub is_updatable: bool,
    /// Exactly one kind must be set for a valid model
    pub kind: Option<ModelKind>,
}

/// Kind-specific parameters of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display, AsRefStr)]
pub enum ModelKind {
    NeuralNetwork(NeuralNetwork),
    NeuralNetworkClassifier(NeuralNetworkClassifier),
    NeuralNetworkRegressor(NeuralNetworkRegressor),
    GlmRegressor(GlmRegressor),
    GlmClassifier(GlmClassifier),
    OneHotEncoder(OneHotEncoder),
    DictVectorizer(DictVectorizer),
    Imputer(Imputer),
    Normalizer(Normalizer),
    FeatureVectorizer(FeatureVectorizer),
    ArrayFeatureExtractor(ArrayFeatureExtractor),
    CategoricalMapping(CategoricalMapping),
    Identity,
    Scaler(Scaler),
    CustomModel(CustomModel),
    Pipeline(Pipeline),
    PipelineClassifier(Pipeline),
    PipelineRegressor(Pipeline),
}

impl Model {
    pub fn new(specification_version: i32, description: ModelDescription, kind: ModelKind) -> Self {
        Self {
            specification_version,
            description,
            is_updatable: false,
            kind: Some(kind),
        }
    }

    /// Parse a model description from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON model description from disk
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The neural network carried by any of the three network kinds
    pub fn neural_network(&self) -> Option<&NeuralNetwork> {
        match self.kind.as_ref()? {
            ModelKind::NeuralNetwork(nn) => Some(nn),
            ModelKind::NeuralNetworkClassifier(c) => Some(&c.network),
            ModelKind::NeuralNetworkRegressor(r) => Some(&r.network),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_kind_deserializes_as_none() {
        let model = Model::from_json_str(r#"{"specification_version": 4}"#).unwrap();
        assert_eq!(model.specification_version, 4);
        assert!(model.kind.is_none());
        assert!(model.neural_network().is_none());
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(ModelKind::Identity.as_ref(), "Identity");
        assert_eq!(ModelKind::Pipeline(Pipeline::default()).to_string(), "Pipeline");
    }

    #[test]
    fn test_malformed_json_is_a_deserialization_error() {
        let err = Model::from_json_str("{not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ResultType::DeserializationFailed);
    }
}
