//! Static validation of model descriptions.
//!
//! [`Validator::validate`] dispatches on the model kind, checks the shared
//! interface, and runs the kind-specific validator. The first failure is
//! returned; nothing is accumulated.

use log::debug;

use crate::error::{Error, Result};
use crate::model::{Model, ModelKind};

pub mod interface;
pub mod layers;
mod models;
pub mod network;
mod neural_network;
pub mod options;
pub mod parameters;
mod updatable;
pub mod utils;

pub use layers::{LayerCheck, LayerRegistry};
pub use network::NeuralNetworkSpecValidator;
pub use neural_network::{min_specification_version, RANK_FLEXIBLE_MIN_VERSION};
pub use options::ValidationOptions;

/// Newest specification version this validator understands
pub const MAX_SPECIFICATION_VERSION: i32 = 5;

/// Validates models against a fixed set of options and layer checks
#[derive(Debug, Clone)]
pub struct Validator {
    options: ValidationOptions,
    registry: LayerRegistry,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationOptions::default())
    }
}

impl Validator {
    /// Create a validator using the standard layer checks
    pub fn new(options: ValidationOptions) -> Self {
        Self::with_registry(options, LayerRegistry::standard())
    }

    /// Create a validator with a custom set of layer checks
    pub fn with_registry(options: ValidationOptions, registry: LayerRegistry) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Validate a complete model, stopping at the first violation
    pub fn validate(&self, model: &Model) -> Result<()> {
        validate_specification_version(model)?;
        let kind = model
            .kind
            .as_ref()
            .ok_or_else(|| Error::params("Model did not specify a valid model-parameter type."))?;
        debug!("validating {} model (specification version {})", kind, model.specification_version);

        interface::validate_model_description(model)?;
        if model.is_updatable && model.neural_network().is_none() {
            return Err(Error::InvalidUpdatableConfiguration(format!(
                "Model of type {} cannot be marked as updatable; only neural networks support on-device training.",
                kind
            )));
        }

        match kind {
            ModelKind::NeuralNetwork(nn) => neural_network::validate_neural_network(self, model, nn),
            ModelKind::NeuralNetworkClassifier(c) => neural_network::validate_neural_network_classifier(self, model, c),
            ModelKind::NeuralNetworkRegressor(r) => neural_network::validate_neural_network_regressor(self, model, r),
            ModelKind::GlmRegressor(glm) => models::validate_glm_regressor(model, glm),
            ModelKind::GlmClassifier(glm) => models::validate_glm_classifier(model, glm),
            ModelKind::OneHotEncoder(encoder) => models::validate_one_hot_encoder(model, encoder),
            ModelKind::DictVectorizer(vectorizer) => models::validate_dict_vectorizer(model, vectorizer),
            ModelKind::Imputer(imputer) => models::validate_imputer(model, imputer),
            ModelKind::Normalizer(_) => models::validate_normalizer(model),
            ModelKind::FeatureVectorizer(vectorizer) => models::validate_feature_vectorizer(model, vectorizer),
            ModelKind::ArrayFeatureExtractor(extractor) => models::validate_array_feature_extractor(model, extractor),
            ModelKind::CategoricalMapping(mapping) => models::validate_categorical_mapping(model, mapping),
            ModelKind::Identity => models::validate_identity(model),
            ModelKind::Scaler(scaler) => models::validate_scaler(model, scaler),
            ModelKind::CustomModel(custom) => models::validate_custom_model(model, custom),
            ModelKind::Pipeline(pipeline) => models::validate_pipeline(self, model, pipeline),
            ModelKind::PipelineClassifier(pipeline) => models::validate_pipeline_classifier(self, model, pipeline),
            ModelKind::PipelineRegressor(pipeline) => models::validate_pipeline_regressor(self, model, pipeline),
        }
    }
}

fn validate_specification_version(model: &Model) -> Result<()> {
    if !(1..=MAX_SPECIFICATION_VERSION).contains(&model.specification_version) {
        return Err(Error::params(format!(
            "Specification version {} is not supported; expected a version between 1 and {}.",
            model.specification_version, MAX_SPECIFICATION_VERSION
        )));
    }
    Ok(())
}

/// Validate a model with the default options
pub fn validate(model: &Model) -> Result<()> {
    Validator::default().validate(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultType;
    use crate::model::ModelDescription;

    #[test]
    fn test_version_bounds() {
        let model = Model::new(0, ModelDescription::default(), ModelKind::Identity);
        assert!(validate(&model).unwrap_err().message().contains("version 0"));
        let model = Model::new(MAX_SPECIFICATION_VERSION + 1, ModelDescription::default(), ModelKind::Identity);
        assert_eq!(validate(&model).unwrap_err().kind(), ResultType::InvalidModelParameters);
    }

    #[test]
    fn test_missing_kind() {
        let model = Model {
            specification_version: 1,
            ..Default::default()
        };
        assert!(validate(&model).unwrap_err().message().contains("model-parameter type"));
    }

    #[test]
    fn test_only_networks_are_updatable() {
        let mut model = Model::new(4, ModelDescription::default(), ModelKind::Identity);
        model.is_updatable = true;
        assert_eq!(
            validate(&model).unwrap_err().kind(),
            ResultType::InvalidUpdatableModelConfiguration
        );
    }
}
