use serde::{Deserialize, Serialize};

use super::layers::NeuralNetworkLayer;
use super::update::NetworkUpdateParameters;

/// How multi-array inputs are laid out for the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayInputShapeMapping {
    /// Arrays are padded to the fixed rank-5 `[S, B, C, H, W]` layout
    #[default]
    Rank5ArrayMapping,
    ExactArrayMapping,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageInputShapeMapping {
    #[default]
    Rank5ImageMapping,
    Rank4ImageMapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralNetwork {
    pub layers: Vec<NeuralNetworkLayer>,
    pub array_input_shape_mapping: ArrayInputShapeMapping,
    pub image_input_shape_mapping: ImageInputShapeMapping,
    pub update_params: Option<NetworkUpdateParameters>,
}

impl NeuralNetwork {
    pub fn new(layers: Vec<NeuralNetworkLayer>) -> Self {
        Self { layers, ..Default::default() }
    }

    pub fn with_exact_array_mapping(mut self) -> Self {
        self.array_input_shape_mapping = ArrayInputShapeMapping::ExactArrayMapping;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassLabels {
    String(Vec<String>),
    Int64(Vec<i64>),
}

impl ClassLabels {
    pub fn len(&self) -> usize {
        match self {
            ClassLabels::String(v) => v.len(),
            ClassLabels::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralNetworkClassifier {
    #[serde(flatten)]
    pub network: NeuralNetwork,
    pub class_labels: Option<ClassLabels>,
    /// Layer whose output holds the class probabilities; empty means the last layer
    pub label_probability_layer_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralNetworkRegressor {
    #[serde(flatten)]
    pub network: NeuralNetwork,
}
