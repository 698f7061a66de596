use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Shared interface of every model: named, typed inputs and outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDescription {
    pub input: Vec<FeatureDescription>,
    pub output: Vec<FeatureDescription>,
    /// Inputs required for on-device training (updatable models only)
    pub training_input: Vec<FeatureDescription>,
    pub predicted_feature_name: String,
    pub predicted_probabilities_name: String,
}

impl ModelDescription {
    /// Look up a declared input by name
    pub fn input_named(&self, name: &str) -> Option<&FeatureDescription> {
        self.input.iter().find(|f| f.name == name)
    }

    /// Look up a declared output by name
    pub fn output_named(&self, name: &str) -> Option<&FeatureDescription> {
        self.output.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureDescription {
    pub name: String,
    pub short_description: String,
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
}

impl FeatureDescription {
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            short_description: String::new(),
            feature_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureType {
    pub is_optional: bool,
    pub kind: FeatureKind,
}

impl FeatureType {
    pub fn int64() -> Self {
        FeatureKind::Int64.into()
    }

    pub fn double() -> Self {
        FeatureKind::Double.into()
    }

    pub fn string() -> Self {
        FeatureKind::String.into()
    }

    /// Fixed-shape float32 multi-array
    pub fn multi_array(shape: &[i64]) -> Self {
        FeatureKind::MultiArray(ArrayFeatureType {
            shape: shape.to_vec(),
            data_type: ArrayDataType::Float32,
            shape_flexibility: ArrayShapeFlexibility::None,
        })
        .into()
    }

    /// Fixed-size RGB image
    pub fn image(width: i64, height: i64) -> Self {
        FeatureKind::Image(ImageFeatureType {
            width,
            height,
            color_space: ColorSpace::Rgb,
            size_flexibility: ImageSizeFlexibility::None,
        })
        .into()
    }

    pub fn dictionary(key_type: DictionaryKeyType) -> Self {
        FeatureKind::Dictionary(DictionaryFeatureType { key_type }).into()
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, FeatureKind::Image(_))
    }

    pub fn is_multi_array(&self) -> bool {
        matches!(self.kind, FeatureKind::MultiArray(_))
    }

    pub fn as_multi_array(&self) -> Option<&ArrayFeatureType> {
        match &self.kind {
            FeatureKind::MultiArray(array) => Some(array),
            _ => None,
        }
    }

    pub fn tag(&self) -> FeatureTag {
        match self.kind {
            FeatureKind::Unset => FeatureTag::Unset,
            FeatureKind::Int64 => FeatureTag::Int64,
            FeatureKind::Double => FeatureTag::Double,
            FeatureKind::String => FeatureTag::String,
            FeatureKind::Image(_) => FeatureTag::Image,
            FeatureKind::MultiArray(_) => FeatureTag::MultiArray,
            FeatureKind::Dictionary(_) => FeatureTag::Dictionary,
            FeatureKind::Sequence(_) => FeatureTag::Sequence,
        }
    }
}

impl From<FeatureKind> for FeatureType {
    fn from(kind: FeatureKind) -> Self {
        Self { is_optional: false, kind }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Unset,
    Int64,
    Double,
    String,
    Image(ImageFeatureType),
    MultiArray(ArrayFeatureType),
    Dictionary(DictionaryFeatureType),
    Sequence(SequenceFeatureType),
}

/// Payload-free discriminant of [`FeatureKind`], used for allowed-type lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum FeatureTag {
    Unset,
    Int64,
    Double,
    String,
    Image,
    MultiArray,
    Dictionary,
    Sequence,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayDataType {
    #[default]
    Invalid,
    Float32,
    Double,
    Int32,
    Float16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayFeatureType {
    pub shape: Vec<i64>,
    pub data_type: ArrayDataType,
    pub shape_flexibility: ArrayShapeFlexibility,
}

impl ArrayFeatureType {
    pub fn with_shape_range(mut self, ranges: Vec<SizeRange>) -> Self {
        self.shape_flexibility = ArrayShapeFlexibility::ShapeRange(ranges);
        self
    }

    pub fn with_enumerated_shapes(mut self, shapes: Vec<Vec<i64>>) -> Self {
        self.shape_flexibility = ArrayShapeFlexibility::EnumeratedShapes(shapes);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ArrayShapeFlexibility {
    #[default]
    None,
    EnumeratedShapes(Vec<Vec<i64>>),
    ShapeRange(Vec<SizeRange>),
}

/// Allowed extent of one axis; a negative upper bound means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeRange {
    pub lower_bound: u64,
    pub upper_bound: i64,
}

impl SizeRange {
    pub fn new(lower_bound: u64, upper_bound: i64) -> Self {
        Self { lower_bound, upper_bound }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    Invalid,
    Grayscale,
    Rgb,
    Bgr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFeatureType {
    pub width: i64,
    pub height: i64,
    pub color_space: ColorSpace,
    pub size_flexibility: ImageSizeFlexibility,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u64,
    pub height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ImageSizeFlexibility {
    #[default]
    None,
    EnumeratedSizes(Vec<ImageSize>),
    SizeRange { width_range: SizeRange, height_range: SizeRange },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DictionaryKeyType {
    #[default]
    Unset,
    Int64,
    String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryFeatureType {
    pub key_type: DictionaryKeyType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceElementType {
    #[default]
    Unset,
    Int64,
    String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceFeatureType {
    pub element_type: SequenceElementType,
    pub size_range: Option<SizeRange>,
}
