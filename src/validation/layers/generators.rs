use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{LayerKind, LayerParams, NeuralNetworkLayer, RandomLayerParams, ReduceNdParams};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    input_rank, normalized_axes, validate_axis_for_input, validate_input_count, validate_input_output_rank_equality,
    validate_io_counts, validate_output_count, validate_output_rank, validate_rank_count,
};

const REDUCTIONS: [LayerKind; 10] = [
    LayerKind::ReduceL1,
    LayerKind::ReduceL2,
    LayerKind::ReduceMax,
    LayerKind::ReduceMin,
    LayerKind::ReduceSum,
    LayerKind::ReduceProd,
    LayerKind::ReduceMean,
    LayerKind::ReduceLogSum,
    LayerKind::ReduceSumSquare,
    LayerKind::ReduceLogSumExp,
];

const RANDOM: [LayerKind; 9] = [
    LayerKind::RandomNormalLike,
    LayerKind::RandomNormalStatic,
    LayerKind::RandomNormalDynamic,
    LayerKind::RandomUniformLike,
    LayerKind::RandomUniformStatic,
    LayerKind::RandomUniformDynamic,
    LayerKind::RandomBernoulliLike,
    LayerKind::RandomBernoulliStatic,
    LayerKind::RandomBernoulliDynamic,
];

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::FillLike, validate_fill);
    registry.register(LayerKind::FillStatic, validate_fill);
    registry.register(LayerKind::FillDynamic, validate_fill);
    registry.register(LayerKind::RangeStatic, validate_range);
    registry.register(LayerKind::RangeDynamic, validate_range);
    for kind in RANDOM {
        registry.register(kind, validate_random);
    }
    registry.register(LayerKind::CategoricalDistribution, validate_categorical_distribution);

    registry.register(LayerKind::Reduce, validate_reduce);
    for kind in REDUCTIONS {
        registry.register(kind, validate_reduce_nd);
    }
    registry.register(LayerKind::TopK, validate_top_k);
    registry.register(LayerKind::ArgMax, validate_arg_reduce);
    registry.register(LayerKind::ArgMin, validate_arg_reduce);
    registry.register(LayerKind::NonMaximumSuppression, validate_non_maximum_suppression);
}

fn validate_fill(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    match &layer.layer {
        LayerParams::FillStatic(params) => {
            validate_io_counts(layer, 0, 1)?;
            if params.target_shape.is_empty() || params.target_shape.contains(&0) {
                return Err(Error::params(format!(
                    "Target shape of fill layer '{}' must be non-empty with positive dimensions.",
                    layer.name
                )));
            }
            validate_output_rank(layer, params.target_shape.len() as i64)
        }
        LayerParams::FillLike(_) => {
            validate_io_counts(layer, 1, 1)?;
            validate_input_output_rank_equality(layer)
        }
        LayerParams::FillDynamic(_) => {
            validate_io_counts(layer, 1, 1)?;
            validate_rank_count(layer, 1, Some(1))
        }
        _ => Err(super::kind_mismatch(layer)),
    }
}

fn validate_range(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    let params = match &layer.layer {
        LayerParams::RangeStatic(params) => {
            validate_io_counts(layer, 0, 1)?;
            params
        }
        LayerParams::RangeDynamic(params) => {
            validate_input_count(layer, 1, Some(3))?;
            validate_output_count(layer, 1, Some(1))?;
            params
        }
        _ => return Err(super::kind_mismatch(layer)),
    };
    if params.step_size == 0.0 && layer.input.len() < 3 {
        return Err(Error::params(format!(
            "Range layer '{}' has a step size of zero.",
            layer.name
        )));
    }
    validate_output_rank(layer, 1)
}

/// The nine random layers share parameters; the distribution decides which
/// of them matter and the variant decides where the shape comes from.
fn validate_random(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    let (params, is_static): (&RandomLayerParams, bool) = match &layer.layer {
        LayerParams::RandomNormalStatic(p) | LayerParams::RandomUniformStatic(p) | LayerParams::RandomBernoulliStatic(p) => {
            (p, true)
        }
        LayerParams::RandomNormalLike(p)
        | LayerParams::RandomNormalDynamic(p)
        | LayerParams::RandomUniformLike(p)
        | LayerParams::RandomUniformDynamic(p)
        | LayerParams::RandomBernoulliLike(p)
        | LayerParams::RandomBernoulliDynamic(p) => (p, false),
        _ => return Err(super::kind_mismatch(layer)),
    };

    if is_static {
        validate_io_counts(layer, 0, 1)?;
        if params.output_shape.is_empty() || params.output_shape.contains(&0) {
            return Err(Error::params(format!(
                "Layer '{}' of type '{}' requires a non-empty static output shape with positive dimensions.",
                layer.name,
                layer.kind()
            )));
        }
        validate_output_rank(layer, params.output_shape.len() as i64)?;
    } else {
        validate_io_counts(layer, 1, 1)?;
    }

    match layer.kind() {
        LayerKind::RandomUniformLike | LayerKind::RandomUniformStatic | LayerKind::RandomUniformDynamic
            if params.min_val > params.max_val =>
        {
            Err(Error::params(format!(
                "Layer '{}': minVal ({}) must not exceed maxVal ({}).",
                layer.name, params.min_val, params.max_val
            )))
        }
        LayerKind::RandomBernoulliLike | LayerKind::RandomBernoulliStatic | LayerKind::RandomBernoulliDynamic
            if !(0.0..=1.0).contains(&params.prob) =>
        {
            Err(Error::params(format!(
                "Layer '{}': probability {} must lie in [0, 1].",
                layer.name, params.prob
            )))
        }
        LayerKind::RandomNormalLike | LayerKind::RandomNormalStatic | LayerKind::RandomNormalDynamic
            if params.std_dev < 0.0 =>
        {
            Err(Error::params(format!(
                "Layer '{}': standard deviation must not be negative.",
                layer.name
            )))
        }
        _ => Ok(()),
    }
}

fn validate_categorical_distribution(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, CategoricalDistribution);
    if params.num_samples < 1 {
        return Err(Error::params(format!(
            "Categorical distribution layer '{}' must draw at least one sample.",
            layer.name
        )));
    }
    if params.temperature < 0.0 {
        return Err(Error::params(format!(
            "Categorical distribution layer '{}' has a negative temperature.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_reduce(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    Ok(())
}

fn reduce_params(layer: &NeuralNetworkLayer) -> Result<&ReduceNdParams> {
    match &layer.layer {
        LayerParams::ReduceL1(p)
        | LayerParams::ReduceL2(p)
        | LayerParams::ReduceMax(p)
        | LayerParams::ReduceMin(p)
        | LayerParams::ReduceSum(p)
        | LayerParams::ReduceProd(p)
        | LayerParams::ReduceMean(p)
        | LayerParams::ReduceLogSum(p)
        | LayerParams::ReduceSumSquare(p)
        | LayerParams::ReduceLogSumExp(p) => Ok(p),
        _ => Err(super::kind_mismatch(layer)),
    }
}

fn validate_reduce_nd(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = reduce_params(layer)?;
    if !params.reduce_all && params.axes.is_empty() {
        return Err(Error::params(format!(
            "Layer '{}' of type '{}' must either reduce all axes or list the axes to reduce.",
            layer.name,
            layer.kind()
        )));
    }
    let Some(rank) = input_rank(layer, 0) else {
        return Ok(());
    };
    let reduced = if params.reduce_all {
        rank
    } else {
        normalized_axes(layer, &params.axes, rank)?.len() as i64
    };
    let expected = if params.keep_dims { rank } else { (rank - reduced).max(1) };
    validate_output_rank(layer, expected)
}

fn validate_top_k(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 2, Some(2))?;
    let params = layer_params!(layer, TopK);
    if layer.input.len() == 1 && params.k == 0 {
        return Err(Error::params(format!(
            "TopK layer '{}' must select at least one element.",
            layer.name
        )));
    }
    validate_axis_for_input(layer, params.axis, 0)?;
    validate_input_output_rank_equality(layer)
}

fn validate_arg_reduce(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = match &layer.layer {
        LayerParams::ArgMax(p) | LayerParams::ArgMin(p) => p,
        _ => return Err(super::kind_mismatch(layer)),
    };
    validate_axis_for_input(layer, params.axis, 0)?;
    if let Some(rank) = input_rank(layer, 0) {
        let expected = if params.remove_dim { (rank - 1).max(1) } else { rank };
        validate_output_rank(layer, expected)?;
    }
    Ok(())
}

/// Boxes and scores, plus optional overrides for the three thresholds
fn validate_non_maximum_suppression(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 2, Some(5))?;
    validate_output_count(layer, 4, Some(4))?;
    let params = layer_params!(layer, NonMaximumSuppression);
    if !(0.0..=1.0).contains(&params.iou_threshold) {
        return Err(Error::params(format!(
            "Non maximum suppression layer '{}' has an IOU threshold {} outside [0, 1].",
            layer.name, params.iou_threshold
        )));
    }
    if layer.input.len() < 5 && params.max_boxes == 0 {
        return Err(Error::params(format!(
            "Non maximum suppression layer '{}' must keep at least one box.",
            layer.name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArgReduceLayerParams, TopKLayerParams};
    use crate::validation::options::ValidationOptions;
    use std::collections::HashMap;

    fn check(layer: &NeuralNetworkLayer) -> Result<()> {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = NeuralNetworkSpecValidator::new(&registry, &options, HashMap::new(), true);
        v.validate_layer(layer)
    }

    #[test]
    fn test_random_bernoulli_probability() {
        let params = RandomLayerParams {
            prob: 1.5,
            output_shape: vec![2, 2],
            ..Default::default()
        };
        let layer = NeuralNetworkLayer::new("r", Vec::<String>::new(), ["y"], LayerParams::RandomBernoulliStatic(params));
        assert!(check(&layer).unwrap_err().message().contains("probability 1.5"));
    }

    #[test]
    fn test_random_static_needs_shape() {
        let params = RandomLayerParams { max_val: 1.0, ..Default::default() };
        let layer = NeuralNetworkLayer::new("r", Vec::<String>::new(), ["y"], LayerParams::RandomUniformStatic(params));
        assert!(check(&layer).unwrap_err().message().contains("static output shape"));
    }

    #[test]
    fn test_reduce_output_rank() {
        let reduce = |keep_dims: bool, out: u32| {
            let params = ReduceNdParams {
                axes: vec![-1],
                keep_dims,
                reduce_all: false,
            };
            NeuralNetworkLayer::new("sum", ["x"], ["y"], LayerParams::ReduceSum(params)).with_ranks(&[3], &[out])
        };
        assert!(check(&reduce(true, 3)).is_ok());
        assert!(check(&reduce(false, 2)).is_ok());
        assert!(check(&reduce(false, 3)).is_err());
    }

    #[test]
    fn test_top_k_outputs_and_axis() {
        let params = TopKLayerParams { axis: 2, k: 3, use_bottom_k: false };
        let layer = NeuralNetworkLayer::new("topk", ["x"], ["values", "indices"], LayerParams::TopK(params.clone()))
            .with_ranks(&[2], &[2, 2]);
        assert!(check(&layer).unwrap_err().message().contains("[-rank(tensor), rank(tensor))"));

        let layer = NeuralNetworkLayer::new("topk", ["x"], ["values"], LayerParams::TopK(params));
        assert!(check(&layer).unwrap_err().message().contains("exactly 2"));
    }

    #[test]
    fn test_arg_max_remove_dim() {
        let params = ArgReduceLayerParams { axis: 0, remove_dim: true };
        let layer = NeuralNetworkLayer::new("am", ["x"], ["y"], LayerParams::ArgMax(params)).with_ranks(&[3], &[2]);
        assert!(check(&layer).is_ok());
    }
}
