//! Reshaping, reordering, slicing, padding and indexing layers.

use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{LayerKind, NeuralNetworkLayer};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    input_rank, normalized_axes, validate_axis_for_input, validate_input_count, validate_input_output_rank_equality,
    validate_io_counts, validate_output_count, validate_output_rank, validate_rank_count,
};

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::Reshape, validate_reshape);
    registry.register(LayerKind::Flatten, validate_flatten);
    registry.register(LayerKind::Permute, validate_permute);
    registry.register(LayerKind::Concat, validate_concat);
    registry.register(LayerKind::Split, validate_split);
    registry.register(LayerKind::SequenceRepeat, validate_one_to_one);

    registry.register(LayerKind::Transpose, validate_transpose);
    registry.register(LayerKind::ConcatNd, validate_concat_nd);
    registry.register(LayerKind::SplitNd, validate_split_nd);
    registry.register(LayerKind::Stack, validate_stack);
    registry.register(LayerKind::Reverse, validate_reverse);
    registry.register(LayerKind::ReverseSeq, validate_reverse_seq);
    registry.register(LayerKind::Tile, validate_tile);
    registry.register(LayerKind::GetShape, validate_get_shape);

    registry.register(LayerKind::RankPreservingReshape, validate_rank_preserving_reshape);
    registry.register(LayerKind::ReshapeStatic, validate_reshape_static);
    registry.register(LayerKind::ReshapeLike, validate_two_to_one);
    registry.register(LayerKind::ReshapeDynamic, validate_two_to_one);
    registry.register(LayerKind::ExpandDims, validate_expand_dims);
    registry.register(LayerKind::Squeeze, validate_squeeze);
    registry.register(LayerKind::FlattenTo2D, validate_flatten_to_2d);
    registry.register(LayerKind::BroadcastToStatic, validate_broadcast_to_static);
    registry.register(LayerKind::BroadcastToLike, validate_two_to_one);
    registry.register(LayerKind::BroadcastToDynamic, validate_two_to_one);
    registry.register(LayerKind::SlidingWindows, validate_sliding_windows);

    registry.register(LayerKind::SliceStatic, validate_slice_static);
    registry.register(LayerKind::SliceDynamic, validate_slice_dynamic);
    registry.register(LayerKind::ConstantPad, validate_constant_pad);

    registry.register(LayerKind::Gather, validate_gather);
    registry.register(LayerKind::GatherAlongAxis, validate_gather);
    registry.register(LayerKind::Scatter, validate_scatter);
    registry.register(LayerKind::ScatterAlongAxis, validate_scatter);
    registry.register(LayerKind::GatherNd, validate_two_to_one);
    registry.register(LayerKind::ScatterNd, validate_three_to_one);
    registry.register(LayerKind::WhereNonZero, validate_where_non_zero);

    registry.register(LayerKind::MatrixBandPart, validate_matrix);
    registry.register(LayerKind::UpperTriangular, validate_matrix);
    registry.register(LayerKind::LowerTriangular, validate_matrix);
}

fn validate_target_shape(layer: &NeuralNetworkLayer, target_shape: &[i64]) -> Result<()> {
    if target_shape.is_empty() {
        return Err(Error::params(format!(
            "Target shape of layer '{}' must not be empty.",
            layer.name
        )));
    }
    if target_shape.iter().filter(|d| **d == -1).count() > 1 {
        return Err(Error::params(format!(
            "Target shape of layer '{}' may contain at most one -1.",
            layer.name
        )));
    }
    if target_shape.iter().any(|d| *d < -1) {
        return Err(Error::params(format!(
            "Target shape of layer '{}' contains an invalid negative dimension.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_one_to_one(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)
}

fn validate_two_to_one(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)
}

fn validate_three_to_one(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 3, 1)
}

fn validate_reshape(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, Reshape);
    let len = params.target_shape.len();
    if len != 3 && len != 4 {
        return Err(Error::params(format!(
            "Reshape layer '{}' requires a target shape of exactly 3 or 4 elements.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_flatten(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_rank_count(layer, 3, None)?;
    }
    Ok(())
}

fn validate_permute(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 4, None)?;
    }
    let params = layer_params!(layer, Permute);
    let mut sorted = params.axis.clone();
    sorted.sort_unstable();
    if sorted != [0u64, 1, 2, 3] {
        return Err(Error::params(format!(
            "Permute layer '{}' requires an axis parameter of length 4 holding a permutation of 0, 1, 2, 3.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_concat(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 2, None)?;
    validate_output_count(layer, 1, Some(1))?;
    let params = layer_params!(layer, Concat);
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        let min_rank = if params.sequence_concat { 5 } else { 3 };
        validate_rank_count(layer, min_rank, None)?;
    }
    Ok(())
}

fn validate_split(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(1))?;
    validate_output_count(layer, 2, None)?;
    let params = layer_params!(layer, Split);
    if params.n_outputs != 0 && params.n_outputs as usize != layer.output.len() {
        return Err(Error::params(format!(
            "Split layer '{}' declares {} outputs but lists {}.",
            layer.name,
            params.n_outputs,
            layer.output.len()
        )));
    }
    Ok(())
}

fn validate_transpose(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, Transpose);
    let mut sorted = params.axes.clone();
    sorted.sort_unstable();
    let is_permutation = sorted.iter().enumerate().all(|(i, a)| *a == i as u64);
    let matches_rank = input_rank(layer, 0).map_or(true, |rank| rank == params.axes.len() as i64);
    if params.axes.is_empty() || !is_permutation || !matches_rank {
        return Err(Error::params(format!(
            "Axes of transpose layer '{}' must be a permutation of 0..rank of its input.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_concat_nd(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 2, None)?;
    validate_output_count(layer, 1, Some(1))?;
    let params = layer_params!(layer, ConcatNd);
    let ranks: Vec<i64> = (0..layer.input.len()).filter_map(|i| input_rank(layer, i)).collect();
    if ranks.windows(2).any(|w| w[0] != w[1]) {
        return Err(Error::params(format!(
            "All inputs of concat layer '{}' must have the same rank.",
            layer.name
        )));
    }
    validate_input_output_rank_equality(layer)?;
    validate_axis_for_input(layer, params.axis, 0)
}

fn validate_split_nd(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(1))?;
    validate_output_count(layer, 2, None)?;
    let params = layer_params!(layer, SplitNd);
    validate_axis_for_input(layer, params.axis, 0)?;
    let outputs = layer.output.len();
    if !params.split_sizes.is_empty() {
        if params.split_sizes.len() != outputs {
            return Err(Error::params(format!(
                "Split layer '{}' lists {} split sizes but has {} outputs.",
                layer.name,
                params.split_sizes.len(),
                outputs
            )));
        }
    } else if params.num_splits as usize != outputs {
        return Err(Error::params(format!(
            "Split layer '{}' declares {} splits but has {} outputs.",
            layer.name, params.num_splits, outputs
        )));
    }
    Ok(())
}

fn validate_stack(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, None)?;
    validate_output_count(layer, 1, Some(1))?;
    let params = layer_params!(layer, Stack);
    validate_axis_for_input(layer, params.axis, 1)?;
    if let Some(rank) = input_rank(layer, 0) {
        validate_output_rank(layer, rank + 1)?;
    }
    Ok(())
}

fn validate_reverse(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, Reverse);
    if let Some(rank) = input_rank(layer, 0) {
        if params.reverse_dim.len() as i64 != rank {
            return Err(Error::params(format!(
                "Reverse layer '{}' has {} reverse flags for an input of rank {}.",
                layer.name,
                params.reverse_dim.len(),
                rank
            )));
        }
    }
    Ok(())
}

fn validate_reverse_seq(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, ReverseSeq);
    if let Some(rank) = input_rank(layer, 0) {
        let axes = normalized_axes(layer, &[params.batch_axis, params.sequence_axis], rank);
        if axes.is_err() {
            return Err(Error::params(format!(
                "Batch and sequence axes of reverse sequence layer '{}' must be distinct and lie in [-rank, rank).",
                layer.name
            )));
        }
    }
    Ok(())
}

fn validate_tile(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(1))?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, Tile);
    if layer.input.len() == 2 {
        return Ok(());
    }
    let rank = input_rank(layer, 0);
    let reps = params.reps.len() as i64;
    if reps == 0 || (reps != 1 && rank.map_or(false, |r| r != reps)) {
        return Err(Error::params(format!(
            "Tile layer '{}' must provide either one repetition count or one per input dimension.",
            layer.name
        )));
    }
    if params.reps.contains(&0) {
        return Err(Error::params(format!(
            "Tile layer '{}' has a repetition count of zero.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_get_shape(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_output_rank(layer, 1)
}

fn validate_rank_preserving_reshape(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, RankPreservingReshape);
    validate_target_shape(layer, &params.target_shape)?;
    if let Some(rank) = input_rank(layer, 0) {
        if params.target_shape.len() as i64 != rank {
            return Err(Error::params(format!(
                "Rank preserving reshape layer '{}' has a target shape of length {} for an input of rank {}.",
                layer.name,
                params.target_shape.len(),
                rank
            )));
        }
    }
    Ok(())
}

fn validate_reshape_static(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, ReshapeStatic);
    validate_target_shape(layer, &params.target_shape)?;
    validate_output_rank(layer, params.target_shape.len() as i64)
}

fn validate_expand_dims(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, ExpandDims);
    if params.axes.is_empty() {
        return Err(Error::params(format!(
            "Axes parameter of expand dims layer '{}' must not be empty.",
            layer.name
        )));
    }
    let added = params.axes.len() as i64;
    if let Some(rank) = input_rank(layer, 0) {
        validate_output_rank(layer, rank + added)?;
        normalized_axes(layer, &params.axes, rank + added)?;
    } else {
        let mut distinct = params.axes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != params.axes.len() {
            return Err(Error::params(format!(
                "Axes parameter of expand dims layer '{}' must not repeat an axis.",
                layer.name
            )));
        }
    }
    Ok(())
}

fn validate_squeeze(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, Squeeze);
    if params.squeeze_all {
        return Ok(());
    }
    if params.axes.is_empty() {
        return Err(Error::params(format!(
            "Squeeze layer '{}' must either squeeze all dimensions or list the axes to squeeze.",
            layer.name
        )));
    }
    if let Some(rank) = input_rank(layer, 0) {
        let axes = normalized_axes(layer, &params.axes, rank)?;
        validate_output_rank(layer, (rank - axes.len() as i64).max(1))?;
    }
    Ok(())
}

/// The flattening axis may also equal the rank
fn validate_flatten_to_2d(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, FlattenTo2D);
    if let Some(rank) = input_rank(layer, 0) {
        if params.axis < -rank || params.axis > rank {
            return Err(Error::params(format!(
                "Value of axis must be in the range [-rank(tensor), rank(tensor)] for '{}' layer.",
                layer.name
            )));
        }
    }
    validate_output_rank(layer, 2)
}

fn validate_broadcast_to_static(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, BroadcastToStatic);
    validate_target_shape(layer, &params.target_shape)?;
    validate_output_rank(layer, params.target_shape.len() as i64)
}

fn validate_sliding_windows(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, SlidingWindows);
    if params.window_size == 0 || params.step == 0 {
        return Err(Error::params(format!(
            "Sliding windows layer '{}' requires a positive window size and step.",
            layer.name
        )));
    }
    validate_axis_for_input(layer, params.axis, 0)?;
    if let Some(rank) = input_rank(layer, 0) {
        validate_output_rank(layer, rank + 1)?;
    }
    Ok(())
}

fn validate_slice_static(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    let params = layer_params!(layer, SliceStatic);
    let len = params.begin_ids.len();
    let lengths = [
        params.begin_masks.len(),
        params.end_ids.len(),
        params.end_masks.len(),
        params.strides.len(),
    ];
    if lengths.iter().any(|l| *l != len) || (!params.squeeze_masks.is_empty() && params.squeeze_masks.len() != len)
    {
        return Err(Error::params(format!(
            "Parameters of slice layer '{}' must all have the same length.",
            layer.name
        )));
    }
    if let Some(rank) = input_rank(layer, 0) {
        if len as i64 != rank {
            return Err(Error::params(format!(
                "Slice layer '{}' has parameters of length {} for an input of rank {}.",
                layer.name, len, rank
            )));
        }
    }
    if params.strides.contains(&0) {
        return Err(Error::params(format!(
            "Slice layer '{}' has a zero stride.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_slice_dynamic(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 2, Some(7))?;
    validate_output_count(layer, 1, Some(1))?;
    let params = layer_params!(layer, SliceDynamic);
    if params.strides.contains(&0) {
        return Err(Error::params(format!(
            "Slice layer '{}' has a zero stride.",
            layer.name
        )));
    }
    Ok(())
}

/// Pad amounts come in (begin, end) pairs for trailing dimensions. In
/// output-size mode each pair names a target size, so only one side is set.
fn validate_constant_pad(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(1))?;
    validate_input_output_rank_equality(layer)?;
    let params = layer_params!(layer, ConstantPad);
    if layer.input.len() == 2 {
        return Ok(());
    }
    let amounts = &params.pad_amounts;
    if amounts.is_empty() || amounts.len() % 2 != 0 {
        return Err(Error::params(format!(
            "Length of 'padAmounts' parameter in constant pad layer '{}' must be a non-zero even number.",
            layer.name
        )));
    }
    if amounts.iter().all(|a| *a == 0) {
        return Err(Error::params(format!(
            "Constant pad layer '{}' must pad at least one dimension.",
            layer.name
        )));
    }
    if let Some(rank) = input_rank(layer, 0) {
        if (amounts.len() / 2) as i64 > rank {
            return Err(Error::params(format!(
                "Length of 'padAmounts' parameter in constant pad layer '{}' cannot exceed twice the input rank.",
                layer.name
            )));
        }
    }
    if params.pad_to_given_output_size_mode && amounts.chunks(2).any(|pair| pair[0] != 0 && pair[1] != 0) {
        return Err(Error::params(format!(
            "Constant pad layer '{}': in output size mode, only one of each pair of pad amounts may be non-zero.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_gather(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)?;
    let axis = match &layer.layer {
        crate::model::LayerParams::Gather(params) | crate::model::LayerParams::GatherAlongAxis(params) => params.axis,
        _ => return Err(super::kind_mismatch(layer)),
    };
    validate_axis_for_input(layer, axis, 0)
}

fn validate_scatter(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 3, 1)?;
    let axis = match &layer.layer {
        crate::model::LayerParams::Scatter(params) | crate::model::LayerParams::ScatterAlongAxis(params) => {
            params.axis
        }
        _ => return Err(super::kind_mismatch(layer)),
    };
    validate_axis_for_input(layer, axis, 0)?;
    validate_input_output_rank_equality(layer)
}

fn validate_where_non_zero(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_output_rank(layer, 2)
}

fn validate_matrix(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    validate_input_output_rank_equality(layer)?;
    validate_rank_count(layer, 2, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AxesLayerParams, AxisLayerParams, ConstantPaddingLayerParams, LayerParams, PermuteLayerParams,
        SqueezeLayerParams,
    };
    use crate::validation::options::ValidationOptions;
    use std::collections::HashMap;

    fn check(layer: &NeuralNetworkLayer) -> Result<()> {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = NeuralNetworkSpecValidator::new(&registry, &options, HashMap::new(), true);
        v.validate_layer(layer)
    }

    #[test]
    fn test_expand_dims_rank_relation() {
        let expand = |axes: Vec<i64>, out: u32| {
            NeuralNetworkLayer::new("e", ["x"], ["y"], LayerParams::ExpandDims(AxesLayerParams { axes }))
                .with_ranks(&[2], &[out])
        };
        assert!(check(&expand(vec![0, -1], 4)).is_ok());
        assert!(check(&expand(vec![0], 4)).unwrap_err().message().contains("output rank 4"));
        assert!(check(&expand(vec![0, -4], 4)).unwrap_err().message().contains("more than once"));
        assert!(check(&expand(vec![4], 4)).is_err());
    }

    #[test]
    fn test_squeeze_axes() {
        let squeeze = |axes: Vec<i64>, squeeze_all: bool| {
            NeuralNetworkLayer::new("s", ["x"], ["y"], LayerParams::Squeeze(SqueezeLayerParams { axes, squeeze_all }))
                .with_ranks(&[3], &[2])
        };
        assert!(check(&squeeze(vec![1], false)).is_ok());
        assert!(check(&squeeze(vec![], false)).is_err());
        assert!(check(&squeeze(vec![], true)).is_ok());
        assert!(check(&squeeze(vec![1, 2], false)).is_err());
    }

    #[test]
    fn test_flatten_to_2d_axis_is_inclusive() {
        let flatten = |axis: i64| {
            NeuralNetworkLayer::new("f", ["x"], ["y"], LayerParams::FlattenTo2D(AxisLayerParams { axis }))
                .with_ranks(&[3], &[2])
        };
        assert!(check(&flatten(3)).is_ok());
        assert!(check(&flatten(-3)).is_ok());
        let err = check(&flatten(4)).unwrap_err();
        assert!(err.message().contains("[-rank(tensor), rank(tensor)]"));
    }

    #[test]
    fn test_constant_pad_amounts() {
        let pad = |amounts: Vec<u64>, output_size_mode: bool| {
            let params = ConstantPaddingLayerParams {
                value: 0.0,
                pad_amounts: amounts,
                pad_to_given_output_size_mode: output_size_mode,
            };
            NeuralNetworkLayer::new("p", ["x"], ["y"], LayerParams::ConstantPad(params)).with_ranks(&[2], &[2])
        };
        assert!(check(&pad(vec![1, 0, 0, 2], false)).is_ok());
        assert!(check(&pad(vec![1, 0, 0], false)).is_err());
        assert!(check(&pad(vec![0, 0], false)).is_err());
        assert!(check(&pad(vec![1, 1, 1, 1, 1, 1], false)).is_err());
        assert!(check(&pad(vec![1, 2], true)).is_err());
    }

    #[test]
    fn test_permute_requires_permutation() {
        let permute = |axis: Vec<u64>| {
            NeuralNetworkLayer::new("p", ["x"], ["y"], LayerParams::Permute(PermuteLayerParams { axis }))
        };
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = NeuralNetworkSpecValidator::new(&registry, &options, HashMap::new(), false);
        assert!(v.validate_layer(&permute(vec![0, 3, 2, 1])).is_ok());
        assert!(v.validate_layer(&permute(vec![0, 1, 2])).is_err());
        assert!(v.validate_layer(&permute(vec![0, 1, 1, 2])).is_err());
    }
}
