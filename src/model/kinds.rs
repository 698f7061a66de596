//! Parameters of the non-network model kinds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::network::ClassLabels;
use super::Model;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostEvaluationTransform {
    #[default]
    NoTransform,
    Logit,
    Probit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmRegressor {
    /// One weight vector per regression target
    pub weights: Vec<Vec<f64>>,
    pub offset: Vec<f64>,
    pub post_evaluation_transform: PostEvaluationTransform,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassEncoding {
    #[default]
    ReferenceClass,
    OneVsRest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmClassifier {
    pub weights: Vec<Vec<f64>>,
    pub offset: Vec<f64>,
    pub post_evaluation_transform: PostEvaluationTransform,
    pub class_encoding: ClassEncoding,
    pub class_labels: Option<ClassLabels>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CategoryList {
    String(Vec<String>),
    Int64(Vec<i64>),
}

impl CategoryList {
    pub fn is_empty(&self) -> bool {
        match self {
            CategoryList::String(v) => v.is_empty(),
            CategoryList::Int64(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleUnknown {
    #[default]
    ErrorOnUnknown,
    IgnoreUnknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneHotEncoder {
    pub categories: Option<CategoryList>,
    pub output_sparse: bool,
    pub handle_unknown: HandleUnknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictVectorizer {
    /// Keys in output order
    pub map: Option<CategoryList>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputedValue {
    Double(f64),
    Int64(i64),
    String(String),
    DoubleArray(Vec<f64>),
    Int64Array(Vec<i64>),
    StringDictionary(HashMap<String, f64>),
    Int64Dictionary(HashMap<i64, f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplaceValue {
    Double(f64),
    Int64(i64),
    String(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Imputer {
    pub imputed_value: Option<ImputedValue>,
    pub replace_value: Option<ReplaceValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormType {
    #[default]
    LMax,
    L1,
    L2,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalizer {
    pub norm_type: NormType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputColumn {
    pub input_column: String,
    pub input_dimensions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureVectorizer {
    pub input_list: Vec<InputColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayFeatureExtractor {
    pub extract_index: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CategoricalMappingType {
    StringToInt64(Vec<(String, i64)>),
    Int64ToString(Vec<(i64, String)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappingDefault {
    String(String),
    Int64(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoricalMapping {
    pub mapping: Option<CategoricalMappingType>,
    pub default_value: Option<MappingDefault>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scaler {
    pub shift_value: Vec<f64>,
    pub scale_value: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomModelParamValue {
    Double(f64),
    String(String),
    Int(i32),
    Long(i64),
    Bool(bool),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomModel {
    pub class_name: String,
    pub parameters: HashMap<String, CustomModelParamValue>,
    pub description: String,
}

/// Models evaluated in order, each consuming outputs of earlier ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub models: Vec<Model>,
}

impl Pipeline {
    pub fn new(models: Vec<Model>) -> Self {
        Self { models }
    }
}
