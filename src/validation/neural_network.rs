//! Top-level validation of the three neural network model kinds.
//!
//! Decides between the legacy rank-5 interpretation and rank-flexible mode,
//! checks the network interface, walks the layer list, and finally runs the
//! legacy shaper for networks that still use the rank-5 layout.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use super::interface::{validate_classifier_interface, validate_regressor_interface};
use super::network::NeuralNetworkSpecValidator;
use super::{updatable, Validator};
use crate::error::{Error, Result};
use crate::model::{
    ArrayFeatureType, ArrayInputShapeMapping, ArrayShapeFlexibility, FeatureDescription, FeatureKind,
    ImageInputShapeMapping, LayerKind, Model, NeuralNetwork, NeuralNetworkClassifier, NeuralNetworkRegressor,
};
use crate::shape::NeuralNetworkShaper;

/// First specification version that understands rank-flexible layers and updatable models
pub const RANK_FLEXIBLE_MIN_VERSION: i32 = 4;

/// What the layer walk leaves behind for the kind-specific output checks
struct NetworkSummary {
    /// Blobs produced by layers, excluding the model inputs
    produced: BTreeSet<String>,
    nd_array_interpretation: bool,
}

/// Layers that run under the original rank-5 execution model
fn is_rank5_layer(kind: LayerKind) -> bool {
    use LayerKind::*;
    matches!(
        kind,
        Convolution
            | Pooling
            | Activation
            | InnerProduct
            | Embedding
            | Batchnorm
            | Mvn
            | L2Normalize
            | Softmax
            | Lrn
            | Crop
            | Padding
            | Upsample
            | ResizeBilinear
            | CropResize
            | Unary
            | Add
            | Multiply
            | Average
            | Scale
            | Bias
            | Max
            | Min
            | Dot
            | Reduce
            | LoadConstant
            | Reshape
            | Flatten
            | Permute
            | Concat
            | Split
            | SequenceRepeat
            | ReorganizeData
            | Slice
            | SimpleRecurrent
            | Gru
            | UniDirectionalLstm
            | BiDirectionalLstm
            | Custom
    )
}

/// Minimum specification version in which a layer kind may appear
pub fn min_specification_version(kind: LayerKind) -> i32 {
    if is_rank5_layer(kind) {
        1
    } else {
        RANK_FLEXIBLE_MIN_VERSION
    }
}

/// Every rank the declaration allows, taking shape flexibility into account
fn declared_ranks(array: &ArrayFeatureType) -> Vec<usize> {
    match &array.shape_flexibility {
        ArrayShapeFlexibility::EnumeratedShapes(shapes) if !shapes.is_empty() => shapes.iter().map(Vec::len).collect(),
        ArrayShapeFlexibility::ShapeRange(ranges) if !ranges.is_empty() => vec![ranges.len()],
        _ => vec![array.shape.len()],
    }
}

/// Rank the runtime gives a model input or output in rank-flexible mode
fn interface_rank(feature: &FeatureDescription, network: &NeuralNetwork) -> Option<i64> {
    match &feature.feature_type.kind {
        FeatureKind::MultiArray(array) => match declared_ranks(array).first() {
            Some(rank) if *rank > 0 => Some(*rank as i64),
            _ => None,
        },
        FeatureKind::Image(_) => match network.image_input_shape_mapping {
            ImageInputShapeMapping::Rank4ImageMapping => Some(4),
            ImageInputShapeMapping::Rank5ImageMapping => Some(5),
        },
        _ => None,
    }
}

fn decide_nd_array_interpretation(model: &Model, network: &NeuralNetwork) -> Result<bool> {
    let newer_layer = network.layers.iter().find(|layer| !is_rank5_layer(layer.kind()));

    if let Some(layer) = newer_layer {
        if model.specification_version < RANK_FLEXIBLE_MIN_VERSION {
            return Err(Error::params(format!(
                "Layer '{}' of type '{}' requires specification version {} or later, but the model declares version {}.",
                layer.name,
                layer.kind(),
                RANK_FLEXIBLE_MIN_VERSION,
                model.specification_version
            )));
        }
    }

    let nd = newer_layer.is_some()
        || network.array_input_shape_mapping != ArrayInputShapeMapping::Rank5ArrayMapping
        || network.image_input_shape_mapping != ImageInputShapeMapping::Rank5ImageMapping;

    let has_array_input = model.description.input.iter().any(|f| f.feature_type.is_multi_array());
    if nd && has_array_input && network.array_input_shape_mapping == ArrayInputShapeMapping::Rank5ArrayMapping {
        return Err(Error::params(
            "Neural Network Multi-Array input shape mapping cannot be 'RANK5_ARRAY_MAPPING' if the network \
             contains a layer added in version 4 or later. Use 'EXACT_ARRAY_MAPPING' instead.",
        ));
    }
    Ok(nd)
}

fn validate_network_interface(model: &Model, network: &NeuralNetwork) -> Result<()> {
    let description = &model.description;
    if description.input.is_empty() {
        return Err(Error::interface("Neural networks require at least one input."));
    }
    if description.output.is_empty() {
        return Err(Error::interface("Neural networks produce at least one output."));
    }
    if network.layers.is_empty() {
        return Err(Error::params("Neural networks require at least one layer."));
    }
    if description.input.iter().all(|f| f.feature_type.is_optional) {
        return Err(Error::interface("Neural networks require at least one non-optional input."));
    }
    if !description
        .input
        .iter()
        .all(|f| f.feature_type.is_image() || f.feature_type.is_multi_array())
    {
        return Err(Error::interface("Neural Networks only accept arrays or images as inputs."));
    }
    Ok(())
}

/// Rank-5 networks can only map vectors and image-like arrays onto their layout
fn validate_legacy_ranks(model: &Model) -> Result<()> {
    let description = &model.description;
    for (role, features, allow_unknown) in [("Input", &description.input, false), ("Output", &description.output, true)] {
        for feature in features {
            let Some(array) = feature.feature_type.as_multi_array() else {
                continue;
            };
            let valid = declared_ranks(array)
                .iter()
                .all(|rank| matches!(rank, 1 | 3) || (allow_unknown && *rank == 0));
            if !valid {
                return Err(Error::interface(format!(
                    "{} arrays to neural networks must be rank 1 (single vectors) or rank 3 (image-like arrays). \
                     Feature '{}' is not.",
                    role, feature.name
                )));
            }
        }
    }
    Ok(())
}

/// Checks shared by every network kind, ending with the layer walk
fn validate_network_common(validator: &Validator, model: &Model, network: &NeuralNetwork) -> Result<NetworkSummary> {
    validate_network_interface(model, network)?;
    let nd = decide_nd_array_interpretation(model, network)?;
    debug!(
        "validating {} layers, rank-flexible mode {}",
        network.layers.len(),
        if nd { "on" } else { "off" }
    );

    if !nd {
        validate_legacy_ranks(model)?;
    }

    let mut io_ranks = HashMap::new();
    if nd {
        let description = &model.description;
        for feature in description.input.iter().chain(description.output.iter()) {
            if let Some(rank) = interface_rank(feature, network) {
                io_ranks.insert(feature.name.clone(), rank);
            }
        }
    }

    let mut scope = NeuralNetworkSpecValidator::new(validator.registry(), validator.options(), io_ranks, nd);
    scope.seed_inputs(model.description.input.iter().map(|f| f.name.as_str()));
    scope.validate_layers(&network.layers)?;

    let produced = scope
        .blobs
        .into_keys()
        .filter(|name| model.description.input_named(name).is_none())
        .collect();
    Ok(NetworkSummary {
        produced,
        nd_array_interpretation: nd,
    })
}

/// Updatable checks and the legacy shaper, run once all hard checks passed
fn validate_network_tail(
    validator: &Validator,
    model: &Model,
    network: &NeuralNetwork,
    summary: &NetworkSummary,
    is_classifier: bool,
) -> Result<()> {
    if model.is_updatable && validator.options().validate_updatable {
        updatable::validate_updatable_network(model, network, is_classifier)?;
    }

    if !summary.nd_array_interpretation && validator.options().run_legacy_shaper {
        if let Err(e) = NeuralNetworkShaper::new(&model.description, &network.layers) {
            warn!("legacy shape inference failed: {}", e);
            return Err(Error::PotentiallyInvalidShapes(format!(
                "Error determining network blob shapes: {}",
                e
            )));
        }
    }
    Ok(())
}

fn ensure_outputs_produced(model: &Model, summary: &NetworkSummary, exempt: &[&str]) -> Result<()> {
    for output in &model.description.output {
        if !summary.produced.contains(&output.name) && !exempt.contains(&output.name.as_str()) {
            return Err(Error::params(format!(
                "Output layer '{}' is not produced by any layer of the neural network.",
                output.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_neural_network(validator: &Validator, model: &Model, network: &NeuralNetwork) -> Result<()> {
    if !model
        .description
        .output
        .iter()
        .all(|f| f.feature_type.is_image() || f.feature_type.is_multi_array())
    {
        return Err(Error::interface("Neural Networks only return arrays or images as outputs."));
    }
    let summary = validate_network_common(validator, model, network)?;
    ensure_outputs_produced(model, &summary, &[])?;
    validate_network_tail(validator, model, network, &summary, false)
}

pub(crate) fn validate_neural_network_classifier(
    validator: &Validator,
    model: &Model,
    classifier: &NeuralNetworkClassifier,
) -> Result<()> {
    validate_classifier_interface(model, classifier.class_labels.as_ref(), "Neural Network classifier")?;
    let summary = validate_network_common(validator, model, &classifier.network)?;

    let probability_blob = &classifier.label_probability_layer_name;
    if !probability_blob.is_empty() && !summary.produced.contains(probability_blob) {
        return Err(Error::params(format!(
            "Probabilities should be obtained from blob '{}', but this blob was not found in any layer of the network.",
            probability_blob
        )));
    }

    let description = &model.description;
    ensure_outputs_produced(
        model,
        &summary,
        &[
            description.predicted_feature_name.as_str(),
            description.predicted_probabilities_name.as_str(),
        ],
    )?;
    validate_network_tail(validator, model, &classifier.network, &summary, true)
}

pub(crate) fn validate_neural_network_regressor(
    validator: &Validator,
    model: &Model,
    regressor: &NeuralNetworkRegressor,
) -> Result<()> {
    validate_regressor_interface(model, "Neural Network regressor")?;
    let summary = validate_network_common(validator, model, &regressor.network)?;
    ensure_outputs_produced(model, &summary, &[])?;
    validate_network_tail(validator, model, &regressor.network, &summary, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultType;
    use crate::model::{
        ArrayDataType, FeatureType, LayerParams, ModelDescription, ModelKind, NeuralNetworkLayer, SizeRange,
    };
    use crate::validation::options::ValidationOptions;

    fn description(inputs: Vec<FeatureDescription>, outputs: Vec<FeatureDescription>) -> ModelDescription {
        ModelDescription {
            input: inputs,
            output: outputs,
            ..Default::default()
        }
    }

    fn copy_network(layers: Vec<NeuralNetworkLayer>) -> NeuralNetwork {
        NeuralNetwork::new(layers)
    }

    fn run(model: &Model) -> Result<()> {
        let validator = Validator::new(ValidationOptions::default());
        match &model.kind {
            Some(ModelKind::NeuralNetwork(nn)) => validate_neural_network(&validator, model, nn),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_version_gates_newer_layers() {
        let layers = vec![NeuralNetworkLayer::new("erf", ["x"], ["y"], LayerParams::Erf)];
        let network = copy_network(layers).with_exact_array_mapping();
        let desc = description(
            vec![FeatureDescription::new("x", FeatureType::multi_array(&[2, 3]))],
            vec![FeatureDescription::new("y", FeatureType::multi_array(&[2, 3]))],
        );
        let model = Model::new(3, desc.clone(), ModelKind::NeuralNetwork(network.clone()));
        assert!(run(&model).unwrap_err().message().contains("requires specification version 4"));

        let model = Model::new(4, desc, ModelKind::NeuralNetwork(network));
        assert!(run(&model).is_ok());
    }

    #[test]
    fn test_rank5_mapping_conflicts_with_newer_layers() {
        let layers = vec![NeuralNetworkLayer::new("erf", ["x"], ["y"], LayerParams::Erf)];
        let model = Model::new(
            4,
            description(
                vec![FeatureDescription::new("x", FeatureType::multi_array(&[3]))],
                vec![FeatureDescription::new("y", FeatureType::multi_array(&[3]))],
            ),
            ModelKind::NeuralNetwork(copy_network(layers)),
        );
        assert!(run(&model).unwrap_err().message().contains("EXACT_ARRAY_MAPPING"));
    }

    #[test]
    fn test_legacy_inputs_must_be_rank_one_or_three() {
        let layers = vec![NeuralNetworkLayer::new("sm", ["x"], ["y"], LayerParams::Softmax)];
        let model = Model::new(
            1,
            description(
                vec![FeatureDescription::new("x", FeatureType::multi_array(&[2, 3]))],
                vec![FeatureDescription::new("y", FeatureType::multi_array(&[]))],
            ),
            ModelKind::NeuralNetwork(copy_network(layers)),
        );
        let err = run(&model).unwrap_err();
        assert_eq!(err.kind(), ResultType::InvalidModelInterface);
        assert!(err.message().contains("'x'"));
    }

    #[test]
    fn test_flexible_rank_counts_as_declared_rank() {
        let array = ArrayFeatureType {
            shape: vec![3, 4, 4],
            data_type: ArrayDataType::Float32,
            shape_flexibility: ArrayShapeFlexibility::None,
        }
        .with_shape_range(vec![SizeRange::new(1, 3), SizeRange::new(1, -1), SizeRange::new(1, -1)]);
        assert_eq!(declared_ranks(&array), vec![3]);
    }

    #[test]
    fn test_all_optional_inputs_rejected() {
        let layers = vec![NeuralNetworkLayer::new("sm", ["x"], ["y"], LayerParams::Softmax)];
        let model = Model::new(
            1,
            description(
                vec![FeatureDescription::new("x", FeatureType::multi_array(&[3]).optional())],
                vec![FeatureDescription::new("y", FeatureType::multi_array(&[3]))],
            ),
            ModelKind::NeuralNetwork(copy_network(layers)),
        );
        assert!(run(&model).unwrap_err().message().contains("non-optional"));
    }

    #[test]
    fn test_undeclared_output_is_reported() {
        let layers = vec![NeuralNetworkLayer::new("sm", ["x"], ["y"], LayerParams::Softmax)];
        let model = Model::new(
            1,
            description(
                vec![FeatureDescription::new("x", FeatureType::multi_array(&[3]))],
                vec![FeatureDescription::new("z", FeatureType::multi_array(&[3]))],
            ),
            ModelKind::NeuralNetwork(copy_network(layers)),
        );
        assert!(run(&model).unwrap_err().message().contains("Output layer 'z'"));
    }

    #[test]
    fn test_min_specification_version() {
        assert_eq!(min_specification_version(LayerKind::Convolution), 1);
        assert_eq!(min_specification_version(LayerKind::Branch), RANK_FLEXIBLE_MIN_VERSION);
    }
}
