use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{LayerKind, NeuralNetworkLayer, QuantizationKind, WeightParamType, WeightParams};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    element_count, input_rank, is_precision_mix, validate_general_weight_params, validate_input_count, validate_input_output_rank_equality,
    validate_io_counts, validate_output_count, validate_rank_count,
};

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::InnerProduct, validate_inner_product);
    registry.register(LayerKind::Embedding, validate_embedding);
    registry.register(LayerKind::EmbeddingNd, validate_embedding_nd);
    registry.register(LayerKind::Batchnorm, validate_batchnorm);
    registry.register(LayerKind::BatchedMatMul, validate_batched_mat_mul);
    registry.register(LayerKind::Scale, validate_scale);
    registry.register(LayerKind::Bias, validate_bias);
    registry.register(LayerKind::LoadConstant, validate_load_constant);
    registry.register(LayerKind::LoadConstantNd, validate_load_constant_nd);
    registry.register(LayerKind::LayerNormalization, validate_layer_normalization);
}

/// Weight and optional bias must each use a single representation and must
/// not mix full and half precision.
fn validate_weight_bias_types(
    layer: &NeuralNetworkLayer,
    layer_class: &str,
    weights: &WeightParams,
    bias: Option<&WeightParams>,
) -> Result<()> {
    let weights_type = weights.value_type();
    let bias_type = bias.map(WeightParams::value_type);
    if weights_type == WeightParamType::Unspecified || bias_type == Some(WeightParamType::Unspecified) {
        return Err(Error::params(format!(
            "{} layer '{}' has invalid weights/bias fields.",
            layer_class, layer.name
        )));
    }
    if let Some(bias_type) = bias_type {
        if is_precision_mix(weights_type, bias_type) {
            return Err(Error::params(format!(
                "{} layer '{}' has unmatched precisions of weights/bias They should either be half or full precision.",
                layer_class, layer.name
            )));
        }
    }
    Ok(())
}

/// Dynamic int8 quantization needs per-tensor linear 8-bit weights and a
/// float32 bias.
fn validate_int8_dynamic_quantize(
    layer: &NeuralNetworkLayer,
    weights: &WeightParams,
    bias: Option<&WeightParams>,
) -> Result<()> {
    let linear_per_tensor = match &weights.quantization {
        Some(q) if weights.value_type() == WeightParamType::Quint && q.number_of_bits == 8 => {
            matches!(&q.kind, Some(QuantizationKind::Linear { scale, bias }) if scale.len() == 1 && bias.is_empty())
        }
        _ => false,
    };
    if !linear_per_tensor {
        return Err(Error::params(format!(
            "Layer '{}': when flag 'int8DynamicQuantize' is set to true, weights must be quantized to 8 bits \
             with a single linear scale and no quantization bias.",
            layer.name
        )));
    }
    if let Some(bias) = bias {
        if bias.value_type() != WeightParamType::Float32 {
            return Err(Error::params(format!(
                "Layer '{}': when flag 'int8DynamicQuantize' is set to true, the bias must be full precision.",
                layer.name
            )));
        }
    }
    Ok(())
}

fn validate_inner_product(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 1, Some(5))?;
    }
    let params = layer_params!(layer, InnerProduct);
    let bias = params.has_bias.then_some(&params.bias);
    validate_weight_bias_types(layer, "Inner product", &params.weights, bias)?;

    if params.int8_dynamic_quantize {
        validate_int8_dynamic_quantize(layer, &params.weights, bias)?;
    }

    if !params.has_bias && params.bias.value_type() != WeightParamType::Empty {
        return Err(Error::params(format!(
            "Layer '{}': bias vector being ignored since \"hasBias\" flag not set.",
            layer.name
        )));
    }

    let expected = element_count(&layer.name, &[params.input_channels, params.output_channels])?;
    if let Some(size) = params.weights.float_len() {
        if size as u64 != expected {
            return Err(Error::params(format!(
                "Layer '{}' has incorrect weight matrix size {} for inner product of size {} x {}.",
                layer.name, size, params.input_channels, params.output_channels
            )));
        }
    } else {
        validate_general_weight_params(
            &params.weights,
            expected,
            params.output_channels,
            "InnerProduct",
            &layer.name,
            "weight",
        )?;
    }
    if let Some(bias) = bias {
        validate_general_weight_params(bias, params.output_channels, 1, "InnerProduct", &layer.name, "bias")?;
    }
    Ok(())
}

fn validate_embedding(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 4, None)?;
    }
    let params = layer_params!(layer, Embedding);
    let bias = params.has_bias.then_some(&params.bias);
    validate_weight_bias_types(layer, "Embedding", &params.weights, bias)?;
    validate_general_weight_params(
        &params.weights,
        element_count(&layer.name, &[params.input_dim, params.output_channels])?,
        params.output_channels,
        "Embedding",
        &layer.name,
        "weight",
    )?;
    if let Some(bias) = bias {
        validate_general_weight_params(bias, params.output_channels, 1, "Embedding", &layer.name, "bias")?;
    }
    Ok(())
}

fn validate_embedding_nd(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_rank_count(layer, 1, Some(5))?;
    let params = layer_params!(layer, EmbeddingNd);
    let bias = params.has_bias.then_some(&params.bias);
    validate_weight_bias_types(layer, "EmbeddingND", &params.weights, bias)?;
    validate_general_weight_params(
        &params.weights,
        element_count(&layer.name, &[params.vocab_size, params.embedding_size])?,
        params.embedding_size,
        "EmbeddingND",
        &layer.name,
        "weight",
    )?;
    if let Some(bias) = bias {
        validate_general_weight_params(bias, params.embedding_size, 1, "EmbeddingND", &layer.name, "bias")?;
    }
    Ok(())
}

fn validate_batchnorm(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Batchnorm);
    if params.instance_normalization && !params.compute_mean_var {
        return Err(Error::params(format!(
            "Batchnorm layer '{}' must compute mean and variance when instance normalization is used.",
            layer.name
        )));
    }

    let mut blobs = vec![("gamma", &params.gamma), ("beta", &params.beta)];
    if !params.compute_mean_var {
        blobs.push(("mean", &params.mean));
        blobs.push(("variance", &params.variance));
    }

    let first_type = params.gamma.value_type();
    for (name, weight) in &blobs {
        let weight_type = weight.value_type();
        if weight_type == WeightParamType::Unspecified || is_precision_mix(first_type, weight_type) {
            return Err(Error::params(format!(
                "Batchnorm layer '{}' parameters have values for both full and half precision. Parameters \
                 should either be specified in half or full precision, mixed parameters are not supported ({}).",
                layer.name, name
            )));
        }
    }
    for (name, weight) in blobs {
        if let Some(size) = weight.float_len() {
            if size as u64 != params.channels {
                return Err(Error::params(format!(
                    "In layer '{}': incorrect {} size {}.",
                    layer.name, name, size
                )));
            }
        } else {
            validate_general_weight_params(weight, params.channels, 1, "Batchnorm", &layer.name, name)?;
        }
    }
    Ok(())
}

fn validate_batched_mat_mul(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(1))?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
    }
    let params = layer_params!(layer, BatchedMatMul);
    let rows = params.weight_matrix_first_dimension;
    let columns = params.weight_matrix_second_dimension;

    if layer.input.len() == 2 {
        if params.weights.value_type() != WeightParamType::Empty || params.has_bias {
            return Err(Error::params(format!(
                "BatchedMatMul layer '{}': with two inputs, weights and bias must not be provided.",
                layer.name
            )));
        }
        if params.int8_dynamic_quantize {
            return Err(Error::params(format!(
                "BatchedMatMul layer '{}': 'int8DynamicQuantize' is only supported with a single input.",
                layer.name
            )));
        }
        return Ok(());
    }

    if params.transpose_a || params.transpose_b {
        return Err(Error::params(format!(
            "BatchedMatMul layer '{}': transposes are not supported when the weight matrix is a parameter.",
            layer.name
        )));
    }
    if rows == 0 || columns == 0 {
        return Err(Error::params(format!(
            "BatchedMatMul layer '{}': weight matrix dimensions must be positive.",
            layer.name
        )));
    }
    let bias = params.has_bias.then_some(&params.bias);
    validate_weight_bias_types(layer, "BatchedMatMul", &params.weights, bias)?;
    if params.int8_dynamic_quantize {
        validate_int8_dynamic_quantize(layer, &params.weights, bias)?;
    }
    let units = element_count(&layer.name, &[rows, columns])?;
    validate_general_weight_params(&params.weights, units, columns, "BatchedMatMul", &layer.name, "weight")?;
    if let Some(bias) = bias {
        validate_general_weight_params(bias, columns, 1, "BatchedMatMul", &layer.name, "bias")?;
    }
    Ok(())
}

fn validate_scale(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Scale);
    let bias = params.has_bias.then_some(&params.bias);
    validate_weight_bias_types(layer, "Scale", &params.scale, bias)?;

    let scale_len = params.shape_scale.len();
    if scale_len != 1 && scale_len != 3 {
        return Err(Error::params(format!(
            "The shape vector for the scale layer '{}' is {} dimension but should be 1-D or 3-D.",
            layer.name, scale_len
        )));
    }
    let scale_units = element_count(&layer.name, &params.shape_scale)?;
    validate_general_weight_params(&params.scale, scale_units, 1, "Scale", &layer.name, "scale")?;

    if let Some(bias) = bias {
        let bias_len = params.shape_bias.len();
        if bias_len != 1 && bias_len != 3 {
            return Err(Error::params(format!(
                "The bias vector for scale layer '{}' is {} dimension but should be 1-D or 3-D.",
                layer.name, bias_len
            )));
        }
        let bias_units = element_count(&layer.name, &params.shape_bias)?;
        validate_general_weight_params(bias, bias_units, 1, "Scale", &layer.name, "bias")?;
    }
    Ok(())
}

fn validate_bias(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Bias);
    if params.shape.is_empty() || params.shape.len() > 3 {
        return Err(Error::params(format!(
            "Incorrect bias layer (name: {}). Has shape vector of length {} but requires 1, 2, or 3 elements.",
            layer.name,
            params.shape.len()
        )));
    }
    if params.bias.value_type() == WeightParamType::Unspecified {
        return Err(Error::params(format!(
            "Bias layer '{}' has invalid bias fields.",
            layer.name
        )));
    }
    let units = element_count(&layer.name, &params.shape)?;
    validate_general_weight_params(&params.bias, units, 1, "Bias", &layer.name, "bias")
}

fn validate_load_constant(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 0, 1)?;
    let params = layer_params!(layer, LoadConstant);
    if params.shape.len() != 3 {
        return Err(Error::params(format!(
            "Load constant layer '{}' requires a shape array of length 3.",
            layer.name
        )));
    }
    if params.data.value_type() == WeightParamType::Unspecified {
        return Err(Error::params(format!(
            "Load constant layer '{}' has invalid data fields.",
            layer.name
        )));
    }
    let units = element_count(&layer.name, &params.shape)?;
    validate_general_weight_params(&params.data, units, 1, "LoadConstant", &layer.name, "constant")
}

fn validate_load_constant_nd(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 0, 1)?;
    let params = layer_params!(layer, LoadConstantNd);
    if params.shape.is_empty() || params.shape.len() > 5 {
        return Err(Error::params(format!(
            "Load constant layer '{}' must be a tensor of rank between 1 and 5, but the shape has length {}.",
            layer.name,
            params.shape.len()
        )));
    }
    if params.data.value_type() == WeightParamType::Unspecified {
        return Err(Error::params(format!(
            "Load constant layer '{}' has invalid data fields.",
            layer.name
        )));
    }
    let units = element_count(&layer.name, &params.shape)?;
    validate_general_weight_params(&params.data, units, 1, "LoadConstantND", &layer.name, "constant")
}

fn validate_layer_normalization(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, LayerNormalization);
    let normalized = &params.normalized_shape;
    if normalized.is_empty() || normalized.iter().any(|d| *d <= 0) {
        return Err(Error::params(format!(
            "Layer '{}': normalized shape must be non-empty with positive dimensions.",
            layer.name
        )));
    }
    if let Some(rank) = input_rank(layer, 0) {
        if rank < normalized.len() as i64 {
            return Err(Error::params(format!(
                "Layer '{}': input rank {} is smaller than the length of the normalized shape {}.",
                layer.name,
                rank,
                normalized.len()
            )));
        }
    }

    let (Some(gamma), Some(beta)) = (&params.gamma, &params.beta) else {
        return Err(Error::params(format!(
            "Layer '{}': gamma and beta must both be provided.",
            layer.name
        )));
    };
    let dims: Vec<u64> = normalized.iter().map(|d| *d as u64).collect();
    let units = element_count(&layer.name, &dims)?;
    for (name, weight) in [("gamma", gamma), ("beta", beta)] {
        if weight.value_type() == WeightParamType::Quint {
            return Err(Error::params(format!(
                "Layer '{}': {} must not be quantized.",
                layer.name, name
            )));
        }
        validate_general_weight_params(weight, units, 1, "LayerNormalization", &layer.name, name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BatchnormLayerParams, BiasLayerParams, InnerProductLayerParams, LayerNormalizationLayerParams, LayerParams,
        QuantizationParams,
    };
    use crate::validation::layers::LayerRegistry;
    use crate::validation::options::ValidationOptions;
    use half::f16;
    use std::collections::HashMap;

    fn check(layer: &NeuralNetworkLayer) -> Result<()> {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = NeuralNetworkSpecValidator::new(&registry, &options, HashMap::new(), false);
        v.validate_layer(layer)
    }

    fn inner_product(weights: WeightParams, bias: Option<WeightParams>) -> NeuralNetworkLayer {
        let params = InnerProductLayerParams {
            input_channels: 4,
            output_channels: 2,
            has_bias: bias.is_some(),
            weights,
            bias: bias.unwrap_or_default(),
            int8_dynamic_quantize: false,
        };
        NeuralNetworkLayer::new("fc", ["x"], ["y"], LayerParams::InnerProduct(params))
    }

    #[test]
    fn test_inner_product_weight_size() {
        assert!(check(&inner_product(WeightParams::from_f32(vec![0.0; 8]), None)).is_ok());
        let err = check(&inner_product(WeightParams::from_f32(vec![0.0; 7]), None)).unwrap_err();
        assert_eq!(
            err.message(),
            "Layer 'fc' has incorrect weight matrix size 7 for inner product of size 4 x 2."
        );
    }

    #[test]
    fn test_inner_product_precision_mix() {
        let half_bias = WeightParams::from_f16(&[f16::ZERO, f16::ONE]);
        let err = check(&inner_product(WeightParams::from_f32(vec![0.0; 8]), Some(half_bias))).unwrap_err();
        assert!(err.message().contains("unmatched precisions"));

        let quantized = WeightParams::quantized(vec![0; 8], QuantizationParams::linear(8, vec![0.5], vec![]));
        assert!(check(&inner_product(quantized, Some(WeightParams::from_f32(vec![0.0; 2])))).is_ok());
    }

    #[test]
    fn test_int8_dynamic_quantize_requires_linear_weights() {
        let mut layer = inner_product(WeightParams::from_f32(vec![0.0; 8]), None);
        if let LayerParams::InnerProduct(params) = &mut layer.layer {
            params.int8_dynamic_quantize = true;
        }
        assert!(check(&layer).unwrap_err().message().contains("int8DynamicQuantize"));
    }

    #[test]
    fn test_batchnorm_sizes() {
        let params = BatchnormLayerParams {
            channels: 2,
            gamma: WeightParams::from_f32(vec![1.0; 2]),
            beta: WeightParams::from_f32(vec![0.0; 2]),
            mean: WeightParams::from_f32(vec![0.0; 2]),
            variance: WeightParams::from_f32(vec![1.0; 3]),
            ..Default::default()
        };
        let layer = NeuralNetworkLayer::new("bn", ["x"], ["y"], LayerParams::Batchnorm(params.clone()));
        assert_eq!(check(&layer).unwrap_err().message(), "In layer 'bn': incorrect variance size 3.");

        let layer = NeuralNetworkLayer::new(
            "bn",
            ["x"],
            ["y"],
            LayerParams::Batchnorm(BatchnormLayerParams { compute_mean_var: true, ..params }),
        );
        assert!(check(&layer).is_ok());
    }

    #[test]
    fn test_bias_shape_length() {
        let params = BiasLayerParams {
            shape: vec![1, 1, 1, 1],
            bias: WeightParams::from_f32(vec![0.0]),
        };
        let layer = NeuralNetworkLayer::new("b", ["x"], ["y"], LayerParams::Bias(params));
        assert!(check(&layer).unwrap_err().message().contains("requires 1, 2, or 3 elements"));
    }

    #[test]
    fn test_layer_normalization_needs_gamma_and_beta() {
        let params = LayerNormalizationLayerParams {
            normalized_shape: vec![2, 3],
            eps: 1e-5,
            gamma: Some(WeightParams::from_f32(vec![1.0; 6])),
            beta: None,
        };
        let layer = NeuralNetworkLayer::new("ln", ["x"], ["y"], LayerParams::LayerNormalization(params.clone()));
        assert!(check(&layer).is_err());

        let params = LayerNormalizationLayerParams {
            beta: Some(WeightParams::from_f32(vec![0.0; 6])),
            ..params
        };
        let layer = NeuralNetworkLayer::new("ln", ["x"], ["y"], LayerParams::LayerNormalization(params));
        assert!(check(&layer).is_ok());
    }
}
