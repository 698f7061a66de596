//! Training configuration checks for neural networks marked updatable.
//!
//! Layers and loss layers become nodes of a directed graph with an edge from
//! the producer of every consumed blob to its consumer. Back-propagation
//! support is then checked on a reverse breadth-first walk from each loss.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::neural_network::RANK_FLEXIBLE_MIN_VERSION;
use super::parameters::{validate_double_parameter, validate_int64_parameter};
use crate::error::{Error, Result};
use crate::model::{
    ActivationParams, FeatureDescription, LayerParams, LossFunction, LossLayer, Model, NetworkUpdateParameters,
    NeuralNetwork, NeuralNetworkLayer, Optimizer,
};

fn config_error(message: impl Into<String>) -> Error {
    Error::InvalidUpdatableConfiguration(message.into())
}

fn params_error(message: impl Into<String>) -> Error {
    Error::InvalidUpdatableParameters(message.into())
}

#[derive(Debug, Clone, Copy)]
enum TrainingNode<'a> {
    Layer(&'a NeuralNetworkLayer),
    Loss(&'a LossLayer),
}

impl<'a> TrainingNode<'a> {
    fn name(&self) -> &'a str {
        match self {
            TrainingNode::Layer(layer) => &layer.name,
            TrainingNode::Loss(loss) => &loss.name,
        }
    }

    fn is_updatable(&self) -> bool {
        matches!(self, TrainingNode::Layer(layer) if layer.is_updatable)
    }

    fn is_softmax(&self) -> bool {
        matches!(self, TrainingNode::Layer(layer) if matches!(layer.layer, LayerParams::Softmax))
    }

    fn is_cross_entropy_loss(&self) -> bool {
        matches!(
            self,
            TrainingNode::Loss(LossLayer {
                loss: Some(LossFunction::CategoricalCrossEntropy { .. }),
                ..
            })
        )
    }

    /// Whether gradients can flow back through this node
    fn is_back_propagable(&self) -> bool {
        match self {
            TrainingNode::Loss(_) => true,
            TrainingNode::Layer(layer) => match &layer.layer {
                LayerParams::Convolution(_)
                | LayerParams::InnerProduct(_)
                | LayerParams::Flatten(_)
                | LayerParams::Pooling(_)
                | LayerParams::Batchnorm(_) => true,
                LayerParams::Activation(activation) => matches!(
                    activation,
                    ActivationParams::ReLU | ActivationParams::Sigmoid | ActivationParams::Tanh
                ),
                _ => false,
            },
        }
    }
}

/// Producer/consumer graph over the top-level layers and the loss layers
struct TrainingGraph<'a> {
    graph: DiGraph<TrainingNode<'a>, ()>,
    by_name: HashMap<&'a str, NodeIndex>,
    blob_producer: HashMap<&'a str, NodeIndex>,
}

impl<'a> TrainingGraph<'a> {
    fn build(network: &'a NeuralNetwork, loss_layers: &'a [LossLayer]) -> Self {
        let mut this = Self {
            graph: DiGraph::new(),
            by_name: HashMap::new(),
            blob_producer: HashMap::new(),
        };
        for layer in &network.layers {
            let node = this.insert(TrainingNode::Layer(layer));
            for input in &layer.input {
                this.connect(input, node);
            }
            for output in &layer.output {
                this.blob_producer.insert(output.as_str(), node);
            }
        }
        for loss in loss_layers {
            let node = this.insert(TrainingNode::Loss(loss));
            if let Some(function) = &loss.loss {
                this.connect(function.input(), node);
                this.connect(function.target(), node);
            }
        }
        this
    }

    fn insert(&mut self, node: TrainingNode<'a>) -> NodeIndex {
        let index = self.graph.add_node(node);
        self.by_name.insert(node.name(), index);
        index
    }

    fn connect(&mut self, blob: &str, consumer: NodeIndex) {
        if let Some(producer) = self.blob_producer.get(blob) {
            self.graph.update_edge(*producer, consumer, ());
        }
    }

    fn node(&self, name: &str) -> Result<NodeIndex> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| config_error(format!("Failed to look up node for '{}'.", name)))
    }

    fn produces(&self, blob: &str) -> bool {
        self.blob_producer.contains_key(blob)
    }

    fn parents(&self, node: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(node, Direction::Incoming)
    }
}

/// Only convolution and inner product layers train, with float, updatable parameters
fn validate_updatable_layer_support(network: &NeuralNetwork) -> Result<()> {
    let mut any_updatable = false;
    for layer in network.layers.iter().filter(|l| l.is_updatable) {
        any_updatable = true;
        let (has_bias, weights, bias) = match &layer.layer {
            LayerParams::Convolution(conv) => (conv.has_bias, &conv.weights, &conv.bias),
            LayerParams::InnerProduct(ip) => (ip.has_bias, &ip.weights, &ip.bias),
            _ => {
                return Err(params_error(format!(
                    "The layer named '{}' is marked as updatable, however, it is not supported as the type of \
                     this layer is neither convolution nor inner-product.",
                    layer.name
                )))
            }
        };
        if weights.has_quantization() || (has_bias && bias.has_quantization()) {
            return Err(params_error(format!(
                "An updatable layer, named '{}', has quantized weights/bias param. Quantized weights/bias not \
                 supported for update.",
                layer.name
            )));
        }
        if !weights.is_updatable || (has_bias && !bias.is_updatable) {
            return Err(params_error(format!(
                "An updatable layer, named '{}', has a weight/bias param which is not marked as updatable.",
                layer.name
            )));
        }
    }
    if !any_updatable {
        return Err(params_error(
            "The model is marked as updatable, but none of the layers are updatable.",
        ));
    }
    Ok(())
}

fn validate_name_collisions(network: &NeuralNetwork, params: &NetworkUpdateParameters) -> Result<()> {
    let mut names = HashSet::new();
    let layer_names = network.layers.iter().map(|l| l.name.as_str());
    let loss_names = params.loss_layers.iter().map(|l| l.name.as_str());
    for name in layer_names.chain(loss_names) {
        if !names.insert(name) {
            return Err(params_error(format!(
                "The updatable model has a name collision for: '{}', i.e., there are more than one layers or \
                 loss layers with this name.",
                name
            )));
        }
    }
    Ok(())
}

fn validate_loss_layer(loss: &LossLayer, graph: &TrainingGraph<'_>) -> Result<()> {
    match &loss.loss {
        Some(LossFunction::CategoricalCrossEntropy { input, target }) => {
            let node = graph.node(&loss.name)?;
            let fed_by_softmax = graph.parents(node).any(|parent| {
                let parent = graph.graph[parent];
                match parent {
                    TrainingNode::Layer(layer) => {
                        parent.is_softmax() && layer.output.first().map(String::as_str) == Some(input.as_str())
                    }
                    TrainingNode::Loss(_) => false,
                }
            });
            if !fed_by_softmax {
                return Err(config_error(format!(
                    "For the categorical cross entropy loss layer named '{}', input is not generated from a \
                     softmax output.",
                    loss.name
                )));
            }
            if graph.produces(target) {
                return Err(config_error(format!(
                    "For the cross entropy loss layer named '{}', target is generated within the graph.",
                    loss.name
                )));
            }
        }
        Some(LossFunction::MeanSquaredError { input, target }) => {
            if !graph.produces(input) {
                return Err(config_error(format!(
                    "For the MSE loss layer named '{}', input is not generated within the graph.",
                    loss.name
                )));
            }
            if graph.produces(target) {
                return Err(config_error(format!(
                    "For the MSE loss layer named '{}', target is generated within the graph.",
                    loss.name
                )));
            }
        }
        None => {
            return Err(config_error(format!(
                "Loss function is not recognized in the loss layer named '{}', only cross entropy loss and MSE \
                 are supported.",
                loss.name
            )))
        }
    }
    Ok(())
}

fn require<'p, T>(value: &'p Option<T>, optimizer: &Optimizer, field: &str) -> Result<&'p T> {
    value
        .as_ref()
        .ok_or_else(|| config_error(format!("{} optimizer should include {} parameter.", optimizer, field)))
}

fn validate_optimizer(optimizer: Option<&Optimizer>) -> Result<()> {
    let optimizer = optimizer.ok_or_else(|| config_error("Optimizer is not recognized."))?;
    match optimizer {
        Optimizer::Sgd(sgd) => {
            validate_double_parameter("learningRate", require(&sgd.learning_rate, optimizer, "learningRate")?)?;
            validate_int64_parameter(
                "miniBatchSize",
                require(&sgd.mini_batch_size, optimizer, "miniBatchSize")?,
                true,
            )?;
            if let Some(momentum) = &sgd.momentum {
                validate_double_parameter("momentum", momentum)?;
            }
        }
        Optimizer::Adam(adam) => {
            validate_double_parameter("learningRate", require(&adam.learning_rate, optimizer, "learningRate")?)?;
            validate_int64_parameter(
                "miniBatchSize",
                require(&adam.mini_batch_size, optimizer, "miniBatchSize")?,
                true,
            )?;
            validate_double_parameter("beta1", require(&adam.beta1, optimizer, "beta1")?)?;
            validate_double_parameter("beta2", require(&adam.beta2, optimizer, "beta2")?)?;
            validate_double_parameter("eps", require(&adam.eps, optimizer, "eps (epsilon)")?)?;
        }
    }
    Ok(())
}

fn validate_epochs_and_seed(params: &NetworkUpdateParameters) -> Result<()> {
    let epochs = params
        .epochs
        .as_ref()
        .ok_or_else(|| config_error("Epochs should be included in neural network update parameters."))?;
    validate_int64_parameter("epochs", epochs, true)?;
    if let Some(seed) = &params.seed {
        validate_int64_parameter("seed", seed, false)?;
    }
    Ok(())
}

/// Every layer between a loss and an updatable layer must back-propagate.
/// A softmax directly feeding a cross entropy loss is allowed.
fn validate_back_propagation(graph: &TrainingGraph<'_>, loss_layers: &[LossLayer]) -> Result<()> {
    let mut visited = HashSet::new();
    for loss in loss_layers {
        let mut queue = VecDeque::from([graph.node(&loss.name)?]);
        let mut blocking: Option<&str> = None;

        while let Some(current) = queue.pop_front() {
            let current_node = graph.graph[current];
            for parent in graph.parents(current) {
                if !visited.insert(parent) {
                    continue;
                }
                queue.push_back(parent);
                let parent_node = graph.graph[parent];

                if parent_node.is_updatable() {
                    if let Some(name) = blocking {
                        return Err(config_error(format!(
                            "There is a layer ({}), which does not support backpropagation, between an updatable \
                             marked layer and the loss function.",
                            name
                        )));
                    }
                }
                if !parent_node.is_back_propagable() {
                    if parent_node.is_softmax() && current_node.is_cross_entropy_loss() {
                        continue;
                    }
                    blocking = Some(parent_node.name());
                }
            }
        }
    }
    Ok(())
}

fn is_equivalent(a: &FeatureDescription, b: &FeatureDescription) -> bool {
    a.name == b.name && a.feature_type == b.feature_type
}

fn validate_training_inputs(model: &Model, params: &NetworkUpdateParameters, is_classifier: bool) -> Result<()> {
    let description = &model.description;
    if description.training_input.len() <= 1 {
        return Err(config_error(
            "Must provide training inputs for updatable neural network (expecting both input and target for \
             loss function).",
        ));
    }

    let exclusive: Vec<&FeatureDescription> = description
        .training_input
        .iter()
        .filter(|t| !description.input.iter().any(|i| is_equivalent(t, i)))
        .collect();
    if exclusive.is_empty() {
        return Err(config_error(
            "Training inputs don't describe required inputs for the loss (needs both the input and the target).",
        ));
    }
    if exclusive.len() == description.training_input.len() {
        return Err(config_error(
            "The training inputs must include at least one input from the model itself as required for training \
             (should have at least one input in common with those used for prediction).",
        ));
    }

    let target = params
        .loss_layers
        .first()
        .and_then(|l| l.loss.as_ref())
        .map(LossFunction::target)
        .unwrap_or_default();

    let mut satisfied = false;
    for training_input in exclusive {
        if is_classifier && training_input.name == description.predicted_feature_name {
            if let Some(output) = description.output_named(&training_input.name) {
                if output.feature_type != training_input.feature_type {
                    return Err(config_error(format!(
                        "The type of the training input provided: {} doesn't match the expected type of the \
                         classifier. Found: {}, expected: {}.",
                        training_input.name,
                        training_input.feature_type.tag(),
                        output.feature_type.tag()
                    )));
                }
                satisfied = true;
            }
        }
        if training_input.name == target {
            satisfied = true;
        }
    }

    if !satisfied {
        if is_classifier {
            return Err(config_error(format!(
                "The training inputs don't include the target of the classifier: {}",
                description.predicted_feature_name
            )));
        }
        return Err(config_error(format!(
            "The training inputs don't include the loss layer's target: {}",
            target
        )));
    }
    Ok(())
}

/// Validate the training configuration of an updatable network
pub(crate) fn validate_updatable_network(model: &Model, network: &NeuralNetwork, is_classifier: bool) -> Result<()> {
    if model.specification_version < RANK_FLEXIBLE_MIN_VERSION {
        return Err(config_error(format!(
            "Updatable models require specification version {} or later, but the model declares version {}.",
            RANK_FLEXIBLE_MIN_VERSION, model.specification_version
        )));
    }
    let params = network
        .update_params
        .as_ref()
        .ok_or_else(|| config_error("The model is marked as updatable, but carries no update parameters."))?;

    validate_updatable_layer_support(network)?;
    validate_name_collisions(network, params)?;

    match params.loss_layers.len() {
        0 => return Err(config_error("An updatable model must specify a loss layer.")),
        1 => {}
        _ => {
            return Err(config_error(
                "This model has more than one loss layers specified, which is not supported at the moment.",
            ))
        }
    }

    let graph = TrainingGraph::build(network, &params.loss_layers);
    for loss in &params.loss_layers {
        validate_loss_layer(loss, &graph)?;
    }
    validate_optimizer(params.optimizer.as_ref())?;
    validate_epochs_and_seed(params)?;
    validate_back_propagation(&graph, &params.loss_layers)?;
    validate_training_inputs(model, params, is_classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultType;
    use crate::model::{
        DoubleParameter, FeatureType, InnerProductLayerParams, Int64Parameter, ModelDescription, ModelKind,
        SgdOptimizer, WeightParams,
    };

    fn inner_product(name: &str, input: &str, output: &str) -> NeuralNetworkLayer {
        let params = InnerProductLayerParams {
            input_channels: 2,
            output_channels: 2,
            weights: WeightParams::from_f32(vec![0.0; 4]).updatable(),
            ..Default::default()
        };
        NeuralNetworkLayer::new(name, [input], [output], LayerParams::InnerProduct(params)).updatable()
    }

    fn update_params(loss: LossFunction) -> NetworkUpdateParameters {
        NetworkUpdateParameters {
            loss_layers: vec![LossLayer::new("loss", loss)],
            optimizer: Some(Optimizer::Sgd(SgdOptimizer {
                learning_rate: Some(DoubleParameter::new(0.01).in_range(0.0, 1.0)),
                mini_batch_size: Some(Int64Parameter::new(8).in_range(1, 64)),
                momentum: None,
            })),
            epochs: Some(Int64Parameter::new(10)),
            ..Default::default()
        }
    }

    fn training_model(layers: Vec<NeuralNetworkLayer>, params: NetworkUpdateParameters) -> (Model, NeuralNetwork) {
        let mut network = NeuralNetwork::new(layers);
        network.update_params = Some(params);
        let x = FeatureDescription::new("x", FeatureType::multi_array(&[2]));
        let description = ModelDescription {
            input: vec![x.clone()],
            output: vec![FeatureDescription::new("y", FeatureType::multi_array(&[2]))],
            training_input: vec![x, FeatureDescription::new("target", FeatureType::multi_array(&[2]))],
            ..Default::default()
        };
        let mut model = Model::new(4, description, ModelKind::NeuralNetwork(network.clone()));
        model.is_updatable = true;
        (model, network)
    }

    fn mse() -> LossFunction {
        LossFunction::MeanSquaredError {
            input: "y".into(),
            target: "target".into(),
        }
    }

    #[test]
    fn test_valid_mse_configuration() {
        let (model, network) = training_model(vec![inner_product("ip", "x", "y")], update_params(mse()));
        validate_updatable_network(&model, &network, false).unwrap();
    }

    #[test]
    fn test_non_backprop_layer_between_loss_and_updatable() {
        let layers = vec![
            inner_product("ip", "x", "h"),
            NeuralNetworkLayer::new("sm", ["h"], ["y"], LayerParams::Softmax),
        ];
        let (model, network) = training_model(layers, update_params(mse()));
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert_eq!(err.kind(), ResultType::InvalidUpdatableModelConfiguration);
        assert!(err.message().contains("(sm)"));
    }

    #[test]
    fn test_softmax_allowed_before_cross_entropy() {
        let layers = vec![
            inner_product("ip", "x", "h"),
            NeuralNetworkLayer::new("sm", ["h"], ["y"], LayerParams::Softmax),
        ];
        let loss = LossFunction::CategoricalCrossEntropy {
            input: "y".into(),
            target: "target".into(),
        };
        let (model, network) = training_model(layers, update_params(loss));
        validate_updatable_network(&model, &network, false).unwrap();
    }

    #[test]
    fn test_cross_entropy_needs_softmax_input() {
        let loss = LossFunction::CategoricalCrossEntropy {
            input: "y".into(),
            target: "target".into(),
        };
        let (model, network) = training_model(vec![inner_product("ip", "x", "y")], update_params(loss));
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert!(err.message().contains("not generated from a softmax output"));
    }

    #[test]
    fn test_name_collision_with_loss_layer() {
        let (model, network) = training_model(vec![inner_product("loss", "x", "y")], update_params(mse()));
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert_eq!(err.kind(), ResultType::InvalidUpdatableModelParameters);
        assert!(err.message().contains("name collision for: 'loss'"));
    }

    #[test]
    fn test_weights_must_be_updatable() {
        let mut layer = inner_product("ip", "x", "y");
        if let LayerParams::InnerProduct(ip) = &mut layer.layer {
            ip.weights.is_updatable = false;
        }
        let (model, network) = training_model(vec![layer], update_params(mse()));
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert!(err.message().contains("not marked as updatable"));
    }

    #[test]
    fn test_missing_epochs_and_optimizer_fields() {
        let mut params = update_params(mse());
        params.epochs = None;
        let (model, network) = training_model(vec![inner_product("ip", "x", "y")], params);
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert!(err.message().contains("Epochs"));

        let mut params = update_params(mse());
        params.optimizer = Some(Optimizer::Sgd(SgdOptimizer::default()));
        let (model, network) = training_model(vec![inner_product("ip", "x", "y")], params);
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert_eq!(err.message(), "SGD optimizer should include learningRate parameter.");
    }

    #[test]
    fn test_training_inputs_need_target() {
        let (mut model, network) = training_model(vec![inner_product("ip", "x", "y")], update_params(mse()));
        model.description.training_input[1].name = "other".into();
        let err = validate_updatable_network(&model, &network, false).unwrap_err();
        assert!(err.message().contains("loss layer's target: target"));
    }
}
