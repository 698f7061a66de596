use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Allowed values for an integer hyper-parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Int64AllowedValues {
    Range { min_value: i64, max_value: i64 },
    Set(Vec<i64>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Int64Parameter {
    pub default_value: i64,
    pub allowed_values: Option<Int64AllowedValues>,
}

impl Int64Parameter {
    pub fn new(default_value: i64) -> Self {
        Self { default_value, allowed_values: None }
    }

    pub fn in_range(mut self, min_value: i64, max_value: i64) -> Self {
        self.allowed_values = Some(Int64AllowedValues::Range { min_value, max_value });
        self
    }

    pub fn in_set(mut self, values: Vec<i64>) -> Self {
        self.allowed_values = Some(Int64AllowedValues::Set(values));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoubleRange {
    pub min_value: f64,
    pub max_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleParameter {
    pub default_value: f64,
    pub range: Option<DoubleRange>,
}

impl DoubleParameter {
    pub fn new(default_value: f64) -> Self {
        Self { default_value, range: None }
    }

    pub fn in_range(mut self, min_value: f64, max_value: f64) -> Self {
        self.range = Some(DoubleRange { min_value, max_value });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LossFunction {
    CategoricalCrossEntropy { input: String, target: String },
    MeanSquaredError { input: String, target: String },
}

impl LossFunction {
    pub fn input(&self) -> &str {
        match self {
            LossFunction::CategoricalCrossEntropy { input, .. }
            | LossFunction::MeanSquaredError { input, .. } => input,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            LossFunction::CategoricalCrossEntropy { target, .. }
            | LossFunction::MeanSquaredError { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossLayer {
    pub name: String,
    /// `None` when the serialized loss function could not be recognized
    #[serde(default)]
    pub loss: Option<LossFunction>,
}

impl LossLayer {
    pub fn new(name: &str, loss: LossFunction) -> Self {
        Self { name: name.to_string(), loss: Some(loss) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdOptimizer {
    pub learning_rate: Option<DoubleParameter>,
    pub mini_batch_size: Option<Int64Parameter>,
    pub momentum: Option<DoubleParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamOptimizer {
    pub learning_rate: Option<DoubleParameter>,
    pub mini_batch_size: Option<Int64Parameter>,
    pub beta1: Option<DoubleParameter>,
    pub beta2: Option<DoubleParameter>,
    pub eps: Option<DoubleParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
pub enum Optimizer {
    #[strum(serialize = "SGD")]
    Sgd(SgdOptimizer),
    #[strum(serialize = "ADAM")]
    Adam(AdamOptimizer),
}

/// Training configuration carried by an updatable neural network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkUpdateParameters {
    pub loss_layers: Vec<LossLayer>,
    pub optimizer: Option<Optimizer>,
    pub epochs: Option<Int64Parameter>,
    pub shuffle: Option<bool>,
    pub seed: Option<Int64Parameter>,
}
