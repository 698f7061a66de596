use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{ActivationParams, LayerKind, NeuralNetworkLayer};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    input_rank, validate_activation_params, validate_axis, validate_input_count, validate_input_output_rank_equality,
    validate_io_counts, validate_output_count, validate_rank_count,
};

const UNARY_MATH: [LayerKind; 18] = [
    LayerKind::Erf,
    LayerKind::Ceil,
    LayerKind::Floor,
    LayerKind::Round,
    LayerKind::Sign,
    LayerKind::Exp2,
    LayerKind::Sin,
    LayerKind::Cos,
    LayerKind::Tan,
    LayerKind::Asin,
    LayerKind::Acos,
    LayerKind::Atan,
    LayerKind::Sinh,
    LayerKind::Cosh,
    LayerKind::Tanh,
    LayerKind::Asinh,
    LayerKind::Acosh,
    LayerKind::Atanh,
];

const BINARY_BROADCASTABLE: [LayerKind; 7] = [
    LayerKind::AddBroadcastable,
    LayerKind::SubtractBroadcastable,
    LayerKind::MultiplyBroadcastable,
    LayerKind::DivideBroadcastable,
    LayerKind::FloorDivBroadcastable,
    LayerKind::ModBroadcastable,
    LayerKind::PowBroadcastable,
];

const COMPARISONS: [LayerKind; 6] = [
    LayerKind::Equal,
    LayerKind::NotEqual,
    LayerKind::LessThan,
    LayerKind::LessEqual,
    LayerKind::GreaterThan,
    LayerKind::GreaterEqual,
];

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::Activation, validate_activation);
    registry.register(LayerKind::Unary, validate_unary_math);
    registry.register(LayerKind::Gelu, validate_unary_math);
    for kind in UNARY_MATH {
        registry.register(kind, validate_unary_math);
    }

    for kind in [LayerKind::Add, LayerKind::Multiply, LayerKind::Average, LayerKind::Max, LayerKind::Min] {
        registry.register(kind, validate_variadic);
    }
    registry.register(LayerKind::Dot, validate_dot);
    registry.register(LayerKind::Mvn, validate_normalization);
    registry.register(LayerKind::L2Normalize, validate_normalization);
    registry.register(LayerKind::Softmax, validate_softmax);
    registry.register(LayerKind::SoftmaxNd, validate_softmax_nd);
    registry.register(LayerKind::Clip, validate_clip);

    for kind in BINARY_BROADCASTABLE {
        registry.register(kind, validate_binary_broadcastable);
    }
    registry.register(LayerKind::MaxBroadcastable, validate_extremum_broadcastable);
    registry.register(LayerKind::MinBroadcastable, validate_extremum_broadcastable);
    registry.register(LayerKind::WhereBroadcastable, validate_where);
    for kind in COMPARISONS {
        registry.register(kind, validate_comparison);
    }
    registry.register(LayerKind::LogicalAnd, validate_binary_logical);
    registry.register(LayerKind::LogicalOr, validate_binary_logical);
    registry.register(LayerKind::LogicalXor, validate_binary_logical);
    registry.register(LayerKind::LogicalNot, validate_unary_math);
}

fn validate_activation(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, Activation);
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        // channel-wise parameters need a channel axis
        if matches!(params, ActivationParams::PReLU { .. } | ActivationParams::ParametricSoftplus { .. }) {
            validate_rank_count(layer, 3, None)?;
        }
    }
    validate_activation_params(params)
}

/// One input, one output, same rank
fn validate_unary_math(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)
}

fn validate_variadic(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, None)?;
    validate_output_count(layer, 1, Some(1))
}

fn validate_dot(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)
}

fn validate_normalization(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    Ok(())
}

fn validate_softmax(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    Ok(())
}

fn validate_softmax_nd(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, SoftmaxNd);
    match input_rank(layer, 0) {
        Some(rank) => validate_axis(layer, params.axis, rank),
        None => Ok(()),
    }
}

fn validate_clip(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, Clip);
    if params.min_val > params.max_val {
        return Err(Error::params(format!(
            "Value of minVal ({}) must not exceed maxVal ({}) for clip layer '{}'.",
            params.min_val, params.max_val, layer.name
        )));
    }
    Ok(())
}

fn validate_binary_broadcastable(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)
}

fn validate_extremum_broadcastable(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 2, None)?;
    validate_output_count(layer, 1, Some(1))
}

fn validate_where(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 3, 1)
}

/// A single input compares against the scalar `alpha`
fn validate_comparison(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(1))
}

fn validate_binary_logical(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AxisLayerParams, ClipLayerParams, LayerParams, ScalarAlphaParams};
    use crate::validation::options::ValidationOptions;
    use std::collections::HashMap;

    fn check(layer: &NeuralNetworkLayer) -> Result<()> {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = NeuralNetworkSpecValidator::new(&registry, &options, HashMap::new(), true);
        v.validate_layer(layer)
    }

    #[test]
    fn test_where_takes_three_inputs() {
        let layer = NeuralNetworkLayer::new("w", ["c", "a"], ["y"], LayerParams::WhereBroadcastable);
        let err = check(&layer).unwrap_err();
        assert!(err.message().contains("'w'") && err.message().contains("exactly 3"));
        let layer = NeuralNetworkLayer::new("w", ["c", "a", "b"], ["y"], LayerParams::WhereBroadcastable);
        assert!(check(&layer).is_ok());
    }

    #[test]
    fn test_comparison_accepts_scalar_form() {
        let layer = NeuralNetworkLayer::new("eq", ["a"], ["y"], LayerParams::Equal(ScalarAlphaParams { alpha: 1.0 }));
        assert!(check(&layer).is_ok());
        let layer = NeuralNetworkLayer::new(
            "eq",
            ["a", "b", "c"],
            ["y"],
            LayerParams::Equal(ScalarAlphaParams::default()),
        );
        assert!(check(&layer).is_err());
    }

    #[test]
    fn test_softmax_nd_axis_range() {
        let layer = NeuralNetworkLayer::new("sm", ["x"], ["y"], LayerParams::SoftmaxNd(AxisLayerParams { axis: -4 }))
            .with_ranks(&[3], &[3]);
        let err = check(&layer).unwrap_err();
        assert!(err.message().contains("[-rank(tensor), rank(tensor))"));

        let layer = NeuralNetworkLayer::new("sm", ["x"], ["y"], LayerParams::SoftmaxNd(AxisLayerParams { axis: -3 }))
            .with_ranks(&[3], &[3]);
        assert!(check(&layer).is_ok());
    }

    #[test]
    fn test_unary_rank_must_be_preserved() {
        let layer = NeuralNetworkLayer::new("s", ["x"], ["y"], LayerParams::Sin).with_ranks(&[2], &[3]);
        assert!(check(&layer).unwrap_err().message().contains("expects equal ranks"));
    }

    #[test]
    fn test_clip_bounds() {
        let params = ClipLayerParams { min_val: 1.0, max_val: 0.0 };
        let layer = NeuralNetworkLayer::new("c", ["x"], ["y"], LayerParams::Clip(params));
        assert!(check(&layer).is_err());
    }
}
