//! Checks on the declared input/output schema shared by every model kind.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{
    ArrayDataType, ArrayShapeFlexibility, ClassLabels, ColorSpace, DictionaryKeyType, FeatureDescription,
    FeatureKind, FeatureTag, ImageSizeFlexibility, Model, SequenceElementType, SizeRange,
};

/// Minimum specification version for sequence features
const SEQUENCE_MIN_VERSION: i32 = 4;

/// Validate one feature declaration on its own
pub fn validate_feature_description(feature: &FeatureDescription, version: i32) -> Result<()> {
    if feature.name.is_empty() {
        return Err(Error::interface("Feature description must have a non-empty name."));
    }
    let name = &feature.name;

    match &feature.feature_type.kind {
        FeatureKind::Unset => Err(Error::interface(format!(
            "Feature description '{}' must specify a valid feature type.",
            name
        ))),
        FeatureKind::Int64 | FeatureKind::Double | FeatureKind::String => Ok(()),
        FeatureKind::MultiArray(array) => {
            if array.data_type == ArrayDataType::Invalid {
                return Err(Error::interface(format!(
                    "Description of multiarray feature '{}' has an invalid or unspecified dataType. \
                     It must be specified as DOUBLE, FLOAT32, FLOAT16 or INT32",
                    name
                )));
            }
            if array.shape.iter().any(|d| *d < 0) {
                return Err(Error::interface(format!(
                    "Description of multiarray feature '{}' has a negative shape dimension.",
                    name
                )));
            }
            match &array.shape_flexibility {
                ArrayShapeFlexibility::EnumeratedShapes(shapes) => {
                    if shapes.iter().flatten().any(|d| *d < 0) {
                        return Err(Error::interface(format!(
                            "Description of multiarray feature '{}' has an enumerated shape with a negative dimension.",
                            name
                        )));
                    }
                }
                ArrayShapeFlexibility::ShapeRange(ranges) => {
                    if !array.shape.is_empty() && ranges.len() != array.shape.len() {
                        return Err(Error::interface(format!(
                            "Description of multiarray feature '{}' has a default {}-d shape but a {}-d shape range",
                            name,
                            array.shape.len(),
                            ranges.len()
                        )));
                    }
                    for (axis, range) in ranges.iter().enumerate() {
                        check_size_range(name, &format!("dimension {}", axis), range)?;
                    }
                }
                ArrayShapeFlexibility::None => {}
            }
            Ok(())
        }
        FeatureKind::Image(image) => {
            if image.color_space == ColorSpace::Invalid {
                return Err(Error::interface(format!(
                    "Description of image feature '{}' has missing or non-standard colorspace.",
                    name
                )));
            }
            if image.width < 0 || image.height < 0 {
                return Err(Error::interface(format!(
                    "Description of image feature '{}' has a negative width or height.",
                    name
                )));
            }
            match &image.size_flexibility {
                ImageSizeFlexibility::EnumeratedSizes(sizes) if sizes.is_empty() => Err(Error::interface(format!(
                    "Description of image feature '{}' has an empty list of enumerated sizes.",
                    name
                ))),
                ImageSizeFlexibility::SizeRange { width_range, height_range } => {
                    check_size_range(name, "width", width_range)?;
                    check_size_range(name, "height", height_range)
                }
                _ => Ok(()),
            }
        }
        FeatureKind::Dictionary(dict) => {
            if dict.key_type == DictionaryKeyType::Unset {
                return Err(Error::interface(format!(
                    "Description of dictionary feature '{}' must contain a key type of either Int64 or String.",
                    name
                )));
            }
            Ok(())
        }
        FeatureKind::Sequence(sequence) => {
            if version < SEQUENCE_MIN_VERSION {
                return Err(Error::interface(format!(
                    "Sequence feature '{}' requires specification version {} or later.",
                    name, SEQUENCE_MIN_VERSION
                )));
            }
            if sequence.element_type == SequenceElementType::Unset {
                return Err(Error::interface(format!(
                    "Description of sequence feature '{}' must specify an Int64 or String element type.",
                    name
                )));
            }
            if let Some(range) = &sequence.size_range {
                check_size_range(name, "sequence length", range)?;
            }
            Ok(())
        }
    }
}

fn check_size_range(name: &str, what: &str, range: &SizeRange) -> Result<()> {
    if range.upper_bound >= 0 && (range.lower_bound as i64) > range.upper_bound {
        return Err(Error::interface(format!(
            "Description of feature '{}' has an invalid range for {}: lower bound {} exceeds upper bound {}.",
            name, what, range.lower_bound, range.upper_bound
        )));
    }
    Ok(())
}

/// Validate every declared input and output plus name uniqueness per role
pub fn validate_model_description(model: &Model) -> Result<()> {
    let description = &model.description;
    for (role, features) in [("input", &description.input), ("output", &description.output)] {
        let mut seen = HashSet::new();
        for feature in features {
            validate_feature_description(feature, model.specification_version)?;
            if !seen.insert(feature.name.as_str()) {
                return Err(Error::interface(format!(
                    "Model description declares more than one {} named '{}'.",
                    role, feature.name
                )));
            }
        }
    }
    for feature in &description.training_input {
        validate_feature_description(feature, model.specification_version)?;
    }
    Ok(())
}

/// Require between `min` and `max` features (`None` for no upper bound)
pub fn validate_feature_count(
    features: &[FeatureDescription],
    role: &str,
    model_name: &str,
    min: usize,
    max: Option<usize>,
) -> Result<()> {
    if features.len() < min {
        return Err(Error::TooFewFeatures(format!(
            "{} model requires at least {} {}(s), but {} were given.",
            model_name,
            min,
            role,
            features.len()
        )));
    }
    if let Some(max) = max {
        if features.len() > max {
            return Err(Error::TooManyFeatures(format!(
                "{} model accepts at most {} {}(s), but {} were given.",
                model_name,
                max,
                role,
                features.len()
            )));
        }
    }
    Ok(())
}

/// Require every feature to carry one of the allowed types
pub fn validate_feature_types(
    features: &[FeatureDescription],
    role: &str,
    model_name: &str,
    allowed: &[FeatureTag],
) -> Result<()> {
    for feature in features {
        let tag = feature.feature_type.tag();
        if !allowed.contains(&tag) {
            let names: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            return Err(Error::UnsupportedFeatureType(format!(
                "Unsupported type \"{}\" for feature \"{}\" ({}) of a {} model. Should be one of: {}.",
                tag,
                feature.name,
                role,
                model_name,
                names.join(", ")
            )));
        }
    }
    Ok(())
}

/// Classifier contract: the predicted feature is a declared output whose type
/// agrees with the class labels, and the optional probability output is a
/// dictionary keyed the same way (or a multi-array).
pub fn validate_classifier_interface(model: &Model, labels: Option<&ClassLabels>, model_name: &str) -> Result<()> {
    let description = &model.description;
    let labels = labels.ok_or_else(|| Error::params(format!("{} models must specify class labels.", model_name)))?;
    if labels.is_empty() {
        return Err(Error::params(format!(
            "{} models must have at least one class label.",
            model_name
        )));
    }

    if description.predicted_feature_name.is_empty() {
        return Err(Error::interface("Specification is missing classifier predictedFeatureName"));
    }
    let predicted = description
        .output_named(&description.predicted_feature_name)
        .ok_or_else(|| {
            Error::FeatureNameMismatch(format!(
                "Classifier predicted feature '{}' is not among the declared outputs.",
                description.predicted_feature_name
            ))
        })?;

    let (label_tag, key_type) = match labels {
        ClassLabels::String(_) => (FeatureTag::String, DictionaryKeyType::String),
        ClassLabels::Int64(_) => (FeatureTag::Int64, DictionaryKeyType::Int64),
    };
    if predicted.feature_type.tag() != label_tag {
        return Err(Error::TypeMismatch(format!(
            "Type of the predicted feature '{}' ({}) does not match the type of the class labels ({}).",
            predicted.name,
            predicted.feature_type.tag(),
            label_tag
        )));
    }

    if !description.predicted_probabilities_name.is_empty() {
        let probabilities = description
            .output_named(&description.predicted_probabilities_name)
            .ok_or_else(|| {
                Error::FeatureNameMismatch(format!(
                    "Classifier probabilities output '{}' is not among the declared outputs.",
                    description.predicted_probabilities_name
                ))
            })?;
        match &probabilities.feature_type.kind {
            FeatureKind::Dictionary(dict) if dict.key_type == key_type => {}
            FeatureKind::MultiArray(_) => {}
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "Classifier probabilities output '{}' must be a dictionary keyed by {} or a multi-array.",
                    probabilities.name, label_tag
                )))
            }
        }
    }
    Ok(())
}

/// Regressor contract: at least one output, and a declared predicted feature
/// must be a double or multi-array output.
pub fn validate_regressor_interface(model: &Model, model_name: &str) -> Result<()> {
    let description = &model.description;
    validate_feature_count(&description.output, "output", model_name, 1, None)?;
    if description.predicted_feature_name.is_empty() {
        return Ok(());
    }
    let predicted = description
        .output_named(&description.predicted_feature_name)
        .ok_or_else(|| {
            Error::FeatureNameMismatch(format!(
                "Regressor predicted feature '{}' is not among the declared outputs.",
                description.predicted_feature_name
            ))
        })?;
    validate_feature_types(
        std::slice::from_ref(predicted),
        "output",
        model_name,
        &[FeatureTag::Double, FeatureTag::MultiArray],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultType;
    use crate::model::{FeatureType, ModelDescription, ModelKind};

    fn model_with(description: ModelDescription) -> Model {
        Model::new(4, description, ModelKind::Identity)
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let err = validate_feature_description(&FeatureDescription::new("", FeatureType::double()), 4).unwrap_err();
        assert_eq!(err.kind(), ResultType::InvalidModelInterface);
    }

    #[test]
    fn test_sequence_requires_version_four() {
        let feature = FeatureDescription::new(
            "seq",
            FeatureKind::Sequence(crate::model::SequenceFeatureType {
                element_type: SequenceElementType::String,
                size_range: None,
            })
            .into(),
        );
        assert!(validate_feature_description(&feature, 3).is_err());
        assert!(validate_feature_description(&feature, 4).is_ok());
    }

    #[test]
    fn test_duplicate_inputs_are_rejected() {
        let model = model_with(ModelDescription {
            input: vec![
                FeatureDescription::new("x", FeatureType::double()),
                FeatureDescription::new("x", FeatureType::int64()),
            ],
            ..Default::default()
        });
        let err = validate_model_description(&model).unwrap_err();
        assert!(err.message().contains("more than one input named 'x'"));
    }

    #[test]
    fn test_classifier_label_type_must_match_prediction() {
        let model = model_with(ModelDescription {
            output: vec![FeatureDescription::new("label", FeatureType::int64())],
            predicted_feature_name: "label".into(),
            ..Default::default()
        });
        let labels = ClassLabels::String(vec!["cat".into(), "dog".into()]);
        let err = validate_classifier_interface(&model, Some(&labels), "Classifier").unwrap_err();
        assert_eq!(err.kind(), ResultType::TypeMismatch);

        let labels = ClassLabels::Int64(vec![0, 1]);
        assert!(validate_classifier_interface(&model, Some(&labels), "Classifier").is_ok());
    }

    #[test]
    fn test_feature_count_bounds() {
        let features = vec![FeatureDescription::new("a", FeatureType::double())];
        let err = validate_feature_count(&features, "input", "Scaler", 2, None).unwrap_err();
        assert_eq!(err.kind(), ResultType::TooFewFeaturesForModelType);
        let err = validate_feature_count(&features, "input", "Scaler", 0, Some(0)).unwrap_err();
        assert_eq!(err.kind(), ResultType::TooManyFeaturesForModelType);
    }
}
