//! Helpers shared by the per-layer checks.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{ActivationParams, NeuralNetworkLayer, QuantizationKind, WeightParamType, WeightParams};

/// Require the layer's input count to lie in `[min, max]`; `None` leaves it unbounded
pub fn validate_input_count(layer: &NeuralNetworkLayer, min: usize, max: Option<usize>) -> Result<()> {
    check_count(layer, "inputs", layer.input.len(), min, max)
}

/// Require the layer's output count to lie in `[min, max]`; `None` leaves it unbounded
pub fn validate_output_count(layer: &NeuralNetworkLayer, min: usize, max: Option<usize>) -> Result<()> {
    check_count(layer, "outputs", layer.output.len(), min, max)
}

/// Exact input and output counts
pub fn validate_io_counts(layer: &NeuralNetworkLayer, inputs: usize, outputs: usize) -> Result<()> {
    validate_input_count(layer, inputs, Some(inputs))?;
    validate_output_count(layer, outputs, Some(outputs))
}

fn check_count(layer: &NeuralNetworkLayer, what: &str, actual: usize, min: usize, max: Option<usize>) -> Result<()> {
    let expectation = match max {
        Some(max) if min == max && actual != min => Some(format!("exactly {}", min)),
        _ if actual < min => Some(format!("at least {}", min)),
        Some(max) if actual > max => Some(format!("at most {}", max)),
        _ => None,
    };
    match expectation {
        Some(expected) => Err(Error::params(format!(
            "Layer '{}' of type '{}' has {} {} but expects {}.",
            layer.name,
            layer.kind(),
            actual,
            what,
            expected
        ))),
        None => Ok(()),
    }
}

/// Rank attached to the i-th input edge, if any
pub fn input_rank(layer: &NeuralNetworkLayer, index: usize) -> Option<i64> {
    layer.input_tensor.get(index).map(|t| t.rank as i64)
}

pub fn output_rank(layer: &NeuralNetworkLayer, index: usize) -> Option<i64> {
    layer.output_tensor.get(index).map(|t| t.rank as i64)
}

/// First input and first output must carry the same rank
pub fn validate_input_output_rank_equality(layer: &NeuralNetworkLayer) -> Result<()> {
    if let (Some(input), Some(output)) = (input_rank(layer, 0), output_rank(layer, 0)) {
        if input != output {
            return Err(Error::params(format!(
                "Layer '{}' of type '{}' expects equal ranks for its input and output, but they are not equal.",
                layer.name,
                layer.kind()
            )));
        }
    }
    Ok(())
}

/// Bound the rank of the first input; `None` leaves the maximum open
pub fn validate_rank_count(layer: &NeuralNetworkLayer, min: i64, max: Option<i64>) -> Result<()> {
    let Some(rank) = input_rank(layer, 0) else {
        return Ok(());
    };
    if rank < min {
        return Err(Error::params(format!(
            "Layer '{}' of type '{}' has input rank {} but expects rank at least {}.",
            layer.name,
            layer.kind(),
            rank,
            min
        )));
    }
    if let Some(max) = max {
        if rank > max {
            return Err(Error::params(format!(
                "Layer '{}' of type '{}' has input rank {} but expects rank at most {}.",
                layer.name,
                layer.kind(),
                rank,
                max
            )));
        }
    }
    Ok(())
}

/// Axis must lie in `[-rank, rank)`
pub fn validate_axis(layer: &NeuralNetworkLayer, axis: i64, rank: i64) -> Result<()> {
    if axis < -rank || axis >= rank {
        return Err(Error::params(format!(
            "Value of axis must be in the range [-rank(tensor), rank(tensor)) for '{}' layer.",
            layer.name
        )));
    }
    Ok(())
}

/// Axis check against the first input's rank, widened by `extra` for layers
/// that insert a dimension
pub fn validate_axis_for_input(layer: &NeuralNetworkLayer, axis: i64, extra: i64) -> Result<()> {
    match input_rank(layer, 0) {
        Some(rank) => validate_axis(layer, axis, rank + extra),
        None => Ok(()),
    }
}

/// Output rank must equal `expected` when it is known
pub fn validate_output_rank(layer: &NeuralNetworkLayer, expected: i64) -> Result<()> {
    match output_rank(layer, 0) {
        Some(rank) if rank != expected => Err(Error::params(format!(
            "Layer '{}' of type '{}' has output rank {} but expects rank {}.",
            layer.name,
            layer.kind(),
            rank,
            expected
        ))),
        _ => Ok(()),
    }
}

/// Resolve negative axes against `rank`, rejecting out-of-range and repeated axes
pub fn normalized_axes(layer: &NeuralNetworkLayer, axes: &[i64], rank: i64) -> Result<Vec<i64>> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(axes.len());
    for axis in axes {
        validate_axis(layer, *axis, rank)?;
        let axis = if *axis < 0 { axis + rank } else { *axis };
        if !seen.insert(axis) {
            return Err(Error::params(format!(
                "Layer '{}' of type '{}' lists axis {} more than once.",
                layer.name,
                layer.kind(),
                axis
            )));
        }
        resolved.push(axis);
    }
    Ok(resolved)
}

/// True when one side is full precision and the other half precision
pub fn is_precision_mix(a: WeightParamType, b: WeightParamType) -> bool {
    matches!(
        (a, b),
        (WeightParamType::Float32, WeightParamType::Float16) | (WeightParamType::Float16, WeightParamType::Float32)
    )
}

/// Quantization metadata is well formed for `out_channels` channels
pub fn has_valid_quantization_params(weight: &WeightParams, out_channels: u64) -> bool {
    let Some(quant) = &weight.quantization else {
        return false;
    };
    if !(1..=8).contains(&quant.number_of_bits) {
        return false;
    }
    match &quant.kind {
        Some(QuantizationKind::Linear { scale, bias }) => {
            let scale_ok = scale.len() == 1 || scale.len() as u64 == out_channels;
            let bias_ok = bias.is_empty() || bias.len() == scale.len();
            scale_ok && bias_ok
        }
        Some(QuantizationKind::LookupTable { float_value }) => float_value.len() == 1usize << quant.number_of_bits,
        None => false,
    }
}

/// Element count implied by a layer's declared dimensions
pub fn element_count(layer_name: &str, dims: &[u64]) -> Result<u64> {
    dims.iter()
        .try_fold(1u64, |acc, d| acc.checked_mul(*d))
        .ok_or_else(|| {
            Error::params(format!(
                "Layer '{}' declares dimensions {:?} whose element count overflows.",
                layer_name, dims
            ))
        })
}

/// Size and storage checks common to every weight blob.
///
/// Float weights must hold exactly `expected_units` values; quantized weights
/// need enough raw bytes for that many values at their bit width plus valid
/// quantization metadata.
pub fn validate_general_weight_params(
    weight: &WeightParams,
    expected_units: u64,
    out_channels: u64,
    layer_class: &str,
    layer_name: &str,
    weight_name: &str,
) -> Result<()> {
    match weight.value_type() {
        WeightParamType::Float32 | WeightParamType::Float16 => {
            let actual = weight.float_len().unwrap_or(0) as u64;
            if actual != expected_units {
                return Err(Error::params(format!(
                    "{}Layer '{}' has incorrect {} size {} (expected {}).",
                    layer_class, layer_name, weight_name, actual, expected_units
                )));
            }
            Ok(())
        }
        WeightParamType::Quint => {
            let bits = weight.quantization.as_ref().map(|q| q.number_of_bits).unwrap_or(0);
            let needed = element_count(layer_name, &[expected_units, bits])?;
            let needed = needed / 8 + u64::from(needed % 8 != 0);
            if (weight.raw_value.len() as u64) < needed {
                return Err(Error::params(format!(
                    "{}Layer '{}' has insufficient bytes for quantized {} with {} units.",
                    layer_class, layer_name, weight_name, expected_units
                )));
            }
            if !has_valid_quantization_params(weight, out_channels) {
                return Err(Error::params(format!(
                    "{}Layer '{}' has invalid quantization parameters for quantized {}.",
                    layer_class, layer_name, weight_name
                )));
            }
            Ok(())
        }
        WeightParamType::Unspecified => Err(Error::params(format!(
            "{}Layer '{}' has unspecified {}.",
            layer_class, layer_name, weight_name
        ))),
        WeightParamType::Empty => Err(Error::params(format!(
            "{}Layer '{}' has empty {}.",
            layer_class, layer_name, weight_name
        ))),
    }
}

/// Non-linearities accepted by the activation layer
pub fn validate_activation_params(params: &ActivationParams) -> Result<()> {
    let consistent = match params {
        ActivationParams::Unset => {
            return Err(Error::params(format!(
                "Nonlinearity type {} is not supported in this version of CoreML.",
                params.name()
            )))
        }
        ActivationParams::PReLU { alpha } => alpha.value_type() != WeightParamType::Unspecified,
        ActivationParams::ParametricSoftplus { alpha, beta } => {
            let (a, b) = (alpha.value_type(), beta.value_type());
            a == b && a != WeightParamType::Unspecified
        }
        _ => true,
    };
    if !consistent {
        return Err(Error::params(format!(
            "Nonlinearity type {} has inconsistent weight parameter types.",
            params.name()
        )));
    }
    Ok(())
}

/// Recurrent gates only accept a reduced set of non-linearities
pub fn validate_recurrent_activation_params(params: &ActivationParams) -> Result<()> {
    match params {
        ActivationParams::Linear { .. }
        | ActivationParams::Sigmoid
        | ActivationParams::Tanh
        | ActivationParams::ScaledTanh { .. }
        | ActivationParams::SigmoidHard { .. }
        | ActivationParams::ReLU => Ok(()),
        other => Err(Error::params(format!(
            "Recurrent non-linearity type {} is not supported in this version of CoreML.",
            other.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultType;
    use crate::model::{LayerParams, QuantizationParams};

    fn softmax(inputs: usize, outputs: usize) -> NeuralNetworkLayer {
        let names = |prefix: &str, n: usize| (0..n).map(|i| format!("{}{}", prefix, i)).collect::<Vec<_>>();
        NeuralNetworkLayer::new("sm", names("in", inputs), names("out", outputs), LayerParams::Softmax)
    }

    #[test]
    fn test_count_messages() {
        let err = validate_io_counts(&softmax(2, 1), 1, 1).unwrap_err();
        assert_eq!(err.message(), "Layer 'sm' of type 'Softmax' has 2 inputs but expects exactly 1.");

        let err = validate_input_count(&softmax(1, 1), 2, None).unwrap_err();
        assert!(err.message().ends_with("has 1 inputs but expects at least 2."));

        let err = validate_output_count(&softmax(1, 3), 1, Some(2)).unwrap_err();
        assert!(err.message().ends_with("has 3 outputs but expects at most 2."));

        assert!(validate_input_count(&softmax(5, 1), 1, None).is_ok());
    }

    #[test]
    fn test_element_count() {
        assert_eq!(element_count("fc", &[4, 3, 2]).unwrap(), 24);
        assert_eq!(element_count("fc", &[]).unwrap(), 1);

        let err = element_count("fc", &[u64::MAX, 2]).unwrap_err();
        assert_eq!(err.kind(), ResultType::InvalidModelParameters);
        assert!(err.message().contains("'fc'"));
    }

    #[test]
    fn test_quantization_params_validity() {
        let w = WeightParams::quantized(vec![0; 4], QuantizationParams::linear(8, vec![1.0], vec![]));
        assert!(has_valid_quantization_params(&w, 4));

        let w = WeightParams::quantized(vec![0; 4], QuantizationParams::linear(8, vec![1.0, 2.0], vec![0.0]));
        assert!(!has_valid_quantization_params(&w, 2));

        let w = WeightParams::quantized(vec![0; 4], QuantizationParams::lookup_table(2, vec![0.0; 4]));
        assert!(has_valid_quantization_params(&w, 1));

        let w = WeightParams::quantized(vec![0; 4], QuantizationParams::linear(9, vec![1.0], vec![]));
        assert!(!has_valid_quantization_params(&w, 1));
    }

    #[test]
    fn test_general_weight_params() {
        let w = WeightParams::from_f32(vec![0.0; 6]);
        assert!(validate_general_weight_params(&w, 6, 1, "InnerProduct", "fc", "weight").is_ok());
        let err = validate_general_weight_params(&w, 7, 1, "InnerProduct", "fc", "weight").unwrap_err();
        assert_eq!(err.message(), "InnerProductLayer 'fc' has incorrect weight size 6 (expected 7).");

        let q = WeightParams::quantized(vec![0; 2], QuantizationParams::linear(4, vec![1.0], vec![]));
        assert!(validate_general_weight_params(&q, 4, 1, "InnerProduct", "fc", "weight").is_ok());
        assert!(validate_general_weight_params(&q, 5, 1, "InnerProduct", "fc", "weight").is_err());

        let err = validate_general_weight_params(&WeightParams::default(), 1, 1, "Scale", "s", "bias").unwrap_err();
        assert_eq!(err.message(), "ScaleLayer 's' has empty bias.");
    }

    #[test]
    fn test_recurrent_activation_subset() {
        assert!(validate_recurrent_activation_params(&ActivationParams::Sigmoid).is_ok());
        let err = validate_recurrent_activation_params(&ActivationParams::Softsign).unwrap_err();
        assert!(err.message().contains("softsign"));
        assert!(validate_activation_params(&ActivationParams::Softsign).is_ok());
        assert!(validate_activation_params(&ActivationParams::Unset).is_err());
    }
}
