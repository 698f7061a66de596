//! Validators for the model kinds that do not carry a neural network.

use std::collections::HashSet;

use log::debug;
use rayon::prelude::*;

use super::interface::{
    validate_classifier_interface, validate_feature_count, validate_feature_types, validate_regressor_interface,
};
use super::Validator;
use crate::error::{Error, Result};
use crate::model::{
    ArrayFeatureExtractor, CategoricalMapping, CategoricalMappingType, CategoryList, ClassEncoding, CustomModel,
    DictVectorizer, DictionaryKeyType, FeatureDescription, FeatureKind, FeatureTag, FeatureVectorizer,
    GlmClassifier, GlmRegressor, ImputedValue, Imputer, MappingDefault, Model, OneHotEncoder, Pipeline,
    ReplaceValue, Scaler,
};

const NUMERIC_INPUTS: [FeatureTag; 3] = [FeatureTag::Int64, FeatureTag::Double, FeatureTag::MultiArray];

fn single_input<'a>(model: &'a Model, model_name: &str) -> Result<&'a FeatureDescription> {
    let description = &model.description;
    validate_feature_count(&description.input, "input", model_name, 1, Some(1))?;
    validate_feature_count(&description.output, "output", model_name, 1, Some(1))?;
    Ok(&description.input[0])
}

/// Weight rows must share one length and pair up with the offsets
fn validate_glm_weights(weights: &[Vec<f64>], offset: &[f64], model_name: &str) -> Result<()> {
    if weights.is_empty() {
        return Err(Error::params(format!("{} must have at least one weight vector.", model_name)));
    }
    if weights.len() != offset.len() {
        return Err(Error::params(format!(
            "{} has {} weight vectors but {} offsets; they must be the same length.",
            model_name,
            weights.len(),
            offset.len()
        )));
    }
    let width = weights[0].len();
    if width == 0 || weights.iter().any(|row| row.len() != width) {
        return Err(Error::params(format!(
            "{} weight vectors must be non-empty and of equal length.",
            model_name
        )));
    }
    Ok(())
}

pub(crate) fn validate_glm_regressor(model: &Model, glm: &GlmRegressor) -> Result<()> {
    let name = "GLM regressor";
    validate_feature_count(&model.description.input, "input", name, 1, None)?;
    validate_feature_types(&model.description.input, "input", name, &NUMERIC_INPUTS)?;
    validate_regressor_interface(model, name)?;
    validate_glm_weights(&glm.weights, &glm.offset, name)
}

pub(crate) fn validate_glm_classifier(model: &Model, glm: &GlmClassifier) -> Result<()> {
    let name = "GLM classifier";
    validate_feature_count(&model.description.input, "input", name, 1, None)?;
    validate_feature_types(&model.description.input, "input", name, &NUMERIC_INPUTS)?;
    validate_classifier_interface(model, glm.class_labels.as_ref(), name)?;
    validate_glm_weights(&glm.weights, &glm.offset, name)?;

    let classes = glm.class_labels.as_ref().map_or(0, |labels| labels.len());
    if classes < 2 {
        return Err(Error::params(format!("{} requires at least two classes.", name)));
    }
    let rows = glm.weights.len();
    // binary problems always collapse to a single weight vector
    let valid = match glm.class_encoding {
        ClassEncoding::ReferenceClass => rows == classes - 1,
        ClassEncoding::OneVsRest => rows == classes || (classes == 2 && rows == 1),
    };
    if !valid {
        return Err(Error::params(format!(
            "{} with {} classes and {:?} encoding cannot use {} weight vectors.",
            name, classes, glm.class_encoding, rows
        )));
    }
    Ok(())
}

fn category_tag(categories: &CategoryList) -> FeatureTag {
    match categories {
        CategoryList::String(_) => FeatureTag::String,
        CategoryList::Int64(_) => FeatureTag::Int64,
    }
}

pub(crate) fn validate_one_hot_encoder(model: &Model, encoder: &OneHotEncoder) -> Result<()> {
    let name = "One-hot encoder";
    let input = single_input(model, name)?;
    validate_feature_types(
        std::slice::from_ref(input),
        "input",
        name,
        &[FeatureTag::Int64, FeatureTag::String],
    )?;
    let output_types: &[FeatureTag] = if encoder.output_sparse {
        &[FeatureTag::Dictionary]
    } else {
        &[FeatureTag::MultiArray]
    };
    validate_feature_types(&model.description.output, "output", name, output_types)?;

    let categories = encoder
        .categories
        .as_ref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::params("One-hot encoder must have a non-empty category list."))?;
    if category_tag(categories) != input.feature_type.tag() {
        return Err(Error::TypeMismatch(format!(
            "One-hot encoder categories are {} but the input '{}' is {}.",
            category_tag(categories),
            input.name,
            input.feature_type.tag()
        )));
    }
    Ok(())
}

pub(crate) fn validate_dict_vectorizer(model: &Model, vectorizer: &DictVectorizer) -> Result<()> {
    let name = "Dictionary vectorizer";
    let input = single_input(model, name)?;
    validate_feature_types(std::slice::from_ref(input), "input", name, &[FeatureTag::Dictionary])?;
    validate_feature_types(&model.description.output, "output", name, &[FeatureTag::MultiArray])?;

    let map = vectorizer
        .map
        .as_ref()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| Error::params("Dictionary vectorizer must list at least one key."))?;
    let FeatureKind::Dictionary(dict) = &input.feature_type.kind else {
        return Ok(());
    };
    let matches = matches!(
        (map, dict.key_type),
        (CategoryList::String(_), DictionaryKeyType::String) | (CategoryList::Int64(_), DictionaryKeyType::Int64)
    );
    if !matches {
        return Err(Error::TypeMismatch(format!(
            "Dictionary vectorizer keys are {} but the input dictionary '{}' is keyed differently.",
            category_tag(map),
            input.name
        )));
    }
    Ok(())
}

fn imputed_value_fits(value: &ImputedValue, feature: &FeatureDescription) -> bool {
    match (value, &feature.feature_type.kind) {
        (ImputedValue::Double(_), FeatureKind::Double)
        | (ImputedValue::Int64(_), FeatureKind::Int64)
        | (ImputedValue::String(_), FeatureKind::String) => true,
        (ImputedValue::DoubleArray(values), FeatureKind::MultiArray(array)) => {
            array.shape.is_empty() || array.shape.iter().product::<i64>() == values.len() as i64
        }
        (ImputedValue::Int64Array(values), FeatureKind::MultiArray(array)) => {
            array.shape.is_empty() || array.shape.iter().product::<i64>() == values.len() as i64
        }
        (ImputedValue::StringDictionary(_), FeatureKind::Dictionary(dict)) => dict.key_type == DictionaryKeyType::String,
        (ImputedValue::Int64Dictionary(_), FeatureKind::Dictionary(dict)) => dict.key_type == DictionaryKeyType::Int64,
        _ => false,
    }
}

pub(crate) fn validate_imputer(model: &Model, imputer: &Imputer) -> Result<()> {
    let name = "Imputer";
    let input = single_input(model, name)?;
    let output = &model.description.output[0];
    validate_feature_types(
        std::slice::from_ref(input),
        "input",
        name,
        &[
            FeatureTag::Int64,
            FeatureTag::Double,
            FeatureTag::String,
            FeatureTag::MultiArray,
            FeatureTag::Dictionary,
        ],
    )?;
    if input.feature_type.tag() != output.feature_type.tag() {
        return Err(Error::TypeMismatch(format!(
            "Imputer input '{}' ({}) and output '{}' ({}) must have the same type.",
            input.name,
            input.feature_type.tag(),
            output.name,
            output.feature_type.tag()
        )));
    }
    if let (FeatureKind::MultiArray(a), FeatureKind::MultiArray(b)) = (&input.feature_type.kind, &output.feature_type.kind) {
        if a.shape != b.shape {
            return Err(Error::TypeMismatch(format!(
                "Imputer input '{}' and output '{}' must have the same shape.",
                input.name, output.name
            )));
        }
    }

    let value = imputer
        .imputed_value
        .as_ref()
        .ok_or_else(|| Error::params("Imputer must specify an imputed value."))?;
    if !imputed_value_fits(value, input) {
        return Err(Error::TypeMismatch(format!(
            "Imputed value does not match the type of input '{}'.",
            input.name
        )));
    }
    if let Some(replace) = &imputer.replace_value {
        let fits = match (replace, &input.feature_type.kind) {
            (ReplaceValue::String(_), FeatureKind::String) => true,
            (ReplaceValue::Int64(_), FeatureKind::Int64) => true,
            (ReplaceValue::Double(_), FeatureKind::Double | FeatureKind::MultiArray(_)) => true,
            (ReplaceValue::Int64(_), FeatureKind::MultiArray(_)) => true,
            _ => false,
        };
        if !fits {
            return Err(Error::TypeMismatch(format!(
                "Replace value does not match the type of input '{}'.",
                input.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_normalizer(model: &Model) -> Result<()> {
    let name = "Normalizer";
    let input = single_input(model, name)?;
    validate_feature_types(std::slice::from_ref(input), "input", name, &[FeatureTag::MultiArray])?;
    validate_feature_types(&model.description.output, "output", name, &[FeatureTag::MultiArray])
}

pub(crate) fn validate_feature_vectorizer(model: &Model, vectorizer: &FeatureVectorizer) -> Result<()> {
    let name = "Feature vectorizer";
    let description = &model.description;
    validate_feature_count(&description.input, "input", name, 1, None)?;
    validate_feature_count(&description.output, "output", name, 1, Some(1))?;
    validate_feature_types(&description.input, "input", name, &NUMERIC_INPUTS)?;
    validate_feature_types(&description.output, "output", name, &[FeatureTag::MultiArray])?;

    if vectorizer.input_list.is_empty() {
        return Err(Error::params("Feature vectorizer must list at least one input column."));
    }
    for column in &vectorizer.input_list {
        if description.input_named(&column.input_column).is_none() {
            return Err(Error::FeatureNameMismatch(format!(
                "Feature vectorizer column '{}' is not a declared input.",
                column.input_column
            )));
        }
        if column.input_dimensions == 0 {
            return Err(Error::params(format!(
                "Feature vectorizer column '{}' must have a positive dimension.",
                column.input_column
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_array_feature_extractor(model: &Model, extractor: &ArrayFeatureExtractor) -> Result<()> {
    let name = "Array feature extractor";
    let input = single_input(model, name)?;
    validate_feature_types(std::slice::from_ref(input), "input", name, &[FeatureTag::MultiArray])?;

    if extractor.extract_index.is_empty() {
        return Err(Error::params("Array feature extractor must extract at least one index."));
    }
    if let Some(array) = input.feature_type.as_multi_array() {
        if let [length] = array.shape.as_slice() {
            if let Some(index) = extractor.extract_index.iter().find(|i| **i as i64 >= *length) {
                return Err(Error::params(format!(
                    "Array feature extractor index {} is out of bounds for input '{}' of length {}.",
                    index, input.name, length
                )));
            }
        }
    }
    let output_types: &[FeatureTag] = if extractor.extract_index.len() == 1 {
        &[FeatureTag::Double, FeatureTag::Int64, FeatureTag::MultiArray]
    } else {
        &[FeatureTag::MultiArray]
    };
    validate_feature_types(&model.description.output, "output", name, output_types)
}

pub(crate) fn validate_categorical_mapping(model: &Model, mapping: &CategoricalMapping) -> Result<()> {
    let name = "Categorical mapping";
    let input = single_input(model, name)?;
    let kind = mapping
        .mapping
        .as_ref()
        .ok_or_else(|| Error::params("Categorical mapping must specify its mapping type."))?;
    let (from, to) = match kind {
        CategoricalMappingType::StringToInt64(_) => (FeatureTag::String, FeatureTag::Int64),
        CategoricalMappingType::Int64ToString(_) => (FeatureTag::Int64, FeatureTag::String),
    };
    validate_feature_types(std::slice::from_ref(input), "input", name, &[from])?;
    validate_feature_types(&model.description.output, "output", name, &[to])?;

    let keys: Vec<String> = match kind {
        CategoricalMappingType::StringToInt64(pairs) => pairs.iter().map(|(k, _)| k.clone()).collect(),
        CategoricalMappingType::Int64ToString(pairs) => pairs.iter().map(|(k, _)| k.to_string()).collect(),
    };
    let mut seen = HashSet::new();
    if let Some(duplicate) = keys.iter().find(|k| !seen.insert(k.as_str())) {
        return Err(Error::params(format!(
            "Categorical mapping lists the key '{}' more than once.",
            duplicate
        )));
    }

    if let Some(default) = &mapping.default_value {
        let default_tag = match default {
            MappingDefault::String(_) => FeatureTag::String,
            MappingDefault::Int64(_) => FeatureTag::Int64,
        };
        if default_tag != to {
            return Err(Error::TypeMismatch(format!(
                "Categorical mapping default value is {} but the mapping produces {}.",
                default_tag, to
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_identity(model: &Model) -> Result<()> {
    let description = &model.description;
    validate_feature_count(&description.input, "input", "Identity", 1, None)?;
    validate_feature_count(&description.output, "output", "Identity", 1, None)
}

pub(crate) fn validate_scaler(model: &Model, scaler: &Scaler) -> Result<()> {
    let name = "Scaler";
    let input = single_input(model, name)?;
    validate_feature_types(std::slice::from_ref(input), "input", name, &NUMERIC_INPUTS)?;
    validate_feature_types(
        &model.description.output,
        "output",
        name,
        &[FeatureTag::Double, FeatureTag::MultiArray],
    )?;

    let (shift, scale) = (scaler.shift_value.len(), scaler.scale_value.len());
    if shift > 1 && scale > 1 && shift != scale {
        return Err(Error::params(format!(
            "Scaler shift ({}) and scale ({}) vectors must have matching lengths.",
            shift, scale
        )));
    }
    if let Some(array) = input.feature_type.as_multi_array().filter(|a| !a.shape.is_empty()) {
        let length = array
            .shape
            .iter()
            .try_fold(1i64, |acc, d| acc.checked_mul(*d))
            .ok_or_else(|| {
                Error::params(format!(
                    "Scaler input '{}' declares a shape whose element count overflows.",
                    input.name
                ))
            })?;
        for (what, len) in [("shift", shift), ("scale", scale)] {
            if len > 1 && len as i64 != length {
                return Err(Error::params(format!(
                    "Scaler {} vector has {} values but input '{}' has {} elements.",
                    what, len, input.name, length
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_custom_model(model: &Model, custom: &CustomModel) -> Result<()> {
    if custom.class_name.is_empty() {
        return Err(Error::params(
            "Custom model must specify a non-empty 'className' linking it to its implementation.",
        ));
    }
    validate_feature_count(&model.description.input, "input", "Custom model", 1, None)
}

/// Sub-models are validated on their own, then the data flow between them:
/// each stage may only read pipeline inputs or outputs of earlier stages.
pub(crate) fn validate_pipeline(validator: &Validator, model: &Model, pipeline: &Pipeline) -> Result<()> {
    if pipeline.models.is_empty() {
        return Err(Error::params("Pipeline must contain at least one model."));
    }
    for (index, stage) in pipeline.models.iter().enumerate() {
        if stage.specification_version > model.specification_version {
            return Err(Error::params(format!(
                "Pipeline model {} declares specification version {}, newer than the pipeline's {}.",
                index, stage.specification_version, model.specification_version
            )));
        }
    }

    if validator.options().parallel_pipelines {
        debug!("validating {} pipeline stages in parallel", pipeline.models.len());
        let results: Vec<Result<()>> = pipeline.models.par_iter().map(|m| validator.validate(m)).collect();
        results.into_iter().collect::<Result<()>>()?;
    } else {
        for stage in &pipeline.models {
            validator.validate(stage)?;
        }
    }

    let mut available: HashSet<&str> = model.description.input.iter().map(|f| f.name.as_str()).collect();
    for (index, stage) in pipeline.models.iter().enumerate() {
        for input in &stage.description.input {
            if !available.contains(input.name.as_str()) {
                return Err(Error::FeatureNameMismatch(format!(
                    "Pipeline model {} consumes '{}', which is neither a pipeline input nor produced by an earlier model.",
                    index, input.name
                )));
            }
        }
        available.extend(stage.description.output.iter().map(|f| f.name.as_str()));
    }
    for output in &model.description.output {
        if !available.contains(output.name.as_str()) {
            return Err(Error::FeatureNameMismatch(format!(
                "Pipeline output '{}' is not produced by any model in the pipeline.",
                output.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_pipeline_classifier(validator: &Validator, model: &Model, pipeline: &Pipeline) -> Result<()> {
    let description = &model.description;
    if description.predicted_feature_name.is_empty() {
        return Err(Error::interface("Specification is missing classifier predictedFeatureName"));
    }
    if description.output_named(&description.predicted_feature_name).is_none() {
        return Err(Error::FeatureNameMismatch(format!(
            "Classifier predicted feature '{}' is not among the declared outputs.",
            description.predicted_feature_name
        )));
    }
    validate_pipeline(validator, model, pipeline)
}

pub(crate) fn validate_pipeline_regressor(validator: &Validator, model: &Model, pipeline: &Pipeline) -> Result<()> {
    validate_regressor_interface(model, "Pipeline regressor")?;
    validate_pipeline(validator, model, pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultType;
    use crate::model::{ClassLabels, FeatureType, ModelDescription, ModelKind};
    use crate::validation::options::ValidationOptions;

    fn io(inputs: Vec<FeatureDescription>, outputs: Vec<FeatureDescription>) -> ModelDescription {
        ModelDescription {
            input: inputs,
            output: outputs,
            ..Default::default()
        }
    }

    fn glm_classifier(rows: usize, classes: usize, encoding: ClassEncoding) -> (Model, GlmClassifier) {
        let glm = GlmClassifier {
            weights: vec![vec![1.0, 2.0]; rows],
            offset: vec![0.0; rows],
            class_encoding: encoding,
            class_labels: Some(ClassLabels::Int64((0..classes as i64).collect())),
            ..Default::default()
        };
        let mut description = io(
            vec![FeatureDescription::new("x", FeatureType::multi_array(&[2]))],
            vec![FeatureDescription::new("label", FeatureType::int64())],
        );
        description.predicted_feature_name = "label".into();
        (Model::new(1, description, ModelKind::GlmClassifier(glm.clone())), glm)
    }

    #[test]
    fn test_glm_classifier_weight_counts() {
        let (model, glm) = glm_classifier(1, 2, ClassEncoding::ReferenceClass);
        assert!(validate_glm_classifier(&model, &glm).is_ok());
        let (model, glm) = glm_classifier(1, 2, ClassEncoding::OneVsRest);
        assert!(validate_glm_classifier(&model, &glm).is_ok());
        let (model, glm) = glm_classifier(3, 3, ClassEncoding::OneVsRest);
        assert!(validate_glm_classifier(&model, &glm).is_ok());
        let (model, glm) = glm_classifier(3, 3, ClassEncoding::ReferenceClass);
        assert!(validate_glm_classifier(&model, &glm).is_err());
    }

    #[test]
    fn test_glm_regressor_offsets_match_weights() {
        let glm = GlmRegressor {
            weights: vec![vec![1.0], vec![2.0]],
            offset: vec![0.0],
            ..Default::default()
        };
        let model = Model::new(
            1,
            io(
                vec![FeatureDescription::new("x", FeatureType::double())],
                vec![FeatureDescription::new("y", FeatureType::double())],
            ),
            ModelKind::GlmRegressor(glm.clone()),
        );
        assert!(validate_glm_regressor(&model, &glm).unwrap_err().message().contains("2 weight vectors but 1 offsets"));
    }

    #[test]
    fn test_imputer_types_must_agree() {
        let imputer = Imputer {
            imputed_value: Some(ImputedValue::Double(0.0)),
            replace_value: None,
        };
        let model = Model::new(
            1,
            io(
                vec![FeatureDescription::new("x", FeatureType::double())],
                vec![FeatureDescription::new("y", FeatureType::int64())],
            ),
            ModelKind::Imputer(imputer.clone()),
        );
        assert_eq!(validate_imputer(&model, &imputer).unwrap_err().kind(), ResultType::TypeMismatch);
    }

    #[test]
    fn test_one_hot_encoder_needs_categories() {
        let encoder = OneHotEncoder::default();
        let model = Model::new(
            1,
            io(
                vec![FeatureDescription::new("x", FeatureType::string())],
                vec![FeatureDescription::new("y", FeatureType::multi_array(&[3]))],
            ),
            ModelKind::OneHotEncoder(encoder.clone()),
        );
        assert!(validate_one_hot_encoder(&model, &encoder).is_err());
    }

    #[test]
    fn test_too_many_inputs() {
        let model = Model::new(
            1,
            io(
                vec![
                    FeatureDescription::new("a", FeatureType::multi_array(&[3])),
                    FeatureDescription::new("b", FeatureType::multi_array(&[3])),
                ],
                vec![FeatureDescription::new("y", FeatureType::multi_array(&[3]))],
            ),
            ModelKind::Normalizer(Default::default()),
        );
        assert_eq!(validate_normalizer(&model).unwrap_err().kind(), ResultType::TooManyFeaturesForModelType);
    }

    fn identity(input: &str, output: &str) -> Model {
        Model::new(
            1,
            io(
                vec![FeatureDescription::new(input, FeatureType::double())],
                vec![FeatureDescription::new(output, FeatureType::double())],
            ),
            ModelKind::Identity,
        )
    }

    #[test]
    fn test_pipeline_wiring() {
        let validator = Validator::new(ValidationOptions::default());
        let description = io(
            vec![FeatureDescription::new("a", FeatureType::double())],
            vec![FeatureDescription::new("c", FeatureType::double())],
        );
        let pipeline = Pipeline::new(vec![identity("a", "b"), identity("b", "c")]);
        let model = Model::new(1, description.clone(), ModelKind::Pipeline(pipeline.clone()));
        validate_pipeline(&validator, &model, &pipeline).unwrap();

        let reversed = Pipeline::new(vec![identity("b", "c"), identity("a", "b")]);
        let err = validate_pipeline(&validator, &model, &reversed).unwrap_err();
        assert_eq!(err.kind(), ResultType::InterfaceFeatureNameMismatch);
    }

    #[test]
    fn test_parallel_pipeline_reports_first_failure() {
        let validator = Validator::new(ValidationOptions::default().set_parallel_pipelines(true));
        let broken = Model::new(1, ModelDescription::default(), ModelKind::Identity);
        let pipeline = Pipeline::new(vec![identity("a", "b"), broken]);
        let model = Model::new(
            1,
            io(
                vec![FeatureDescription::new("a", FeatureType::double())],
                vec![FeatureDescription::new("b", FeatureType::double())],
            ),
            ModelKind::Pipeline(pipeline.clone()),
        );
        let err = validate_pipeline(&validator, &model, &pipeline).unwrap_err();
        assert_eq!(err.kind(), ResultType::TooFewFeaturesForModelType);
    }
}
