use std::collections::HashMap;

use log::trace;

use super::constraint::{Axis, ShapeConstraint};
use super::range::ShapeRange;
use super::ShapeError;
use crate::model::{
    ArrayShapeFlexibility, ConvolutionLayerParams, ConvolutionPadding, FeatureDescription, FeatureKind,
    LayerParams, ModelDescription, NeuralNetworkLayer, PoolingLayerParams, PoolingPadding, ReduceAxis,
    ReorganizationType, SliceAxis,
};

/// Fixed-point shape propagation over a legacy rank-5 network.
///
/// Seeds every model input from its interface declaration, then walks the
/// layer list forward until no constraint narrows any further. Declared
/// outputs are intersected last, so a network whose computed shapes
/// contradict its interface fails construction.
#[derive(Debug, Clone)]
pub struct NeuralNetworkShaper {
    blobs: HashMap<String, ShapeConstraint>,
}

impl NeuralNetworkShaper {
    pub fn new(description: &ModelDescription, layers: &[NeuralNetworkLayer]) -> Result<Self, ShapeError> {
        for feature in description.input.iter().chain(description.output.iter()) {
            check_legacy_rank(feature)?;
        }

        let mut shaper = Self { blobs: HashMap::new() };
        for input in description.input.iter().filter(|f| is_shaped(f)) {
            shaper.entry(&input.name).update_constraint(&input.feature_type)?;
        }

        // One more pass than layers covers the longest forward chain; the
        // extra pass confirms stability.
        for pass in 0..layers.len() + 2 {
            let before = shaper.blobs.clone();
            for layer in layers {
                shaper
                    .propagate(layer)
                    .map_err(|e| ShapeError(format!("Layer '{}': {}", layer.name, e)))?;
            }
            if shaper.blobs == before {
                trace!("shape propagation converged after {} passes", pass + 1);
                break;
            }
        }

        for output in description.output.iter().filter(|f| is_shaped(f)) {
            shaper.entry(&output.name).update_constraint(&output.feature_type)?;
        }
        Ok(shaper)
    }

    /// The inferred constraint for a blob, if it was reached
    pub fn shape(&self, name: &str) -> Option<&ShapeConstraint> {
        self.blobs.get(name)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    fn entry(&mut self, name: &str) -> &mut ShapeConstraint {
        self.blobs
            .entry(name.to_string())
            .or_insert_with(|| ShapeConstraint::new(name))
    }

    fn current(&mut self, name: &str) -> ShapeConstraint {
        self.entry(name).clone()
    }

    fn propagate(&mut self, layer: &NeuralNetworkLayer) -> Result<(), ShapeError> {
        let inputs: Vec<ShapeConstraint> = layer.input.iter().map(|n| self.current(n)).collect();
        let evidence = derive_outputs(layer, &inputs)?;
        for (name, ev) in layer.output.iter().zip(evidence.iter()) {
            self.entry(name).copy_from(ev)?;
        }

        if preserves_shape(&layer.layer) {
            if let (Some(input), Some(output)) = (layer.input.first(), layer.output.first()) {
                let out = self.current(output);
                self.entry(input).copy_from(&out)?;
            }
        }

        if let LayerParams::Convolution(conv) = &layer.layer {
            if !conv.is_deconvolution && conv.kernel_channels > 0 {
                if let Some(input) = layer.input.first() {
                    let groups = conv.n_groups.max(1);
                    let channels = conv.kernel_channels.saturating_mul(groups) as usize;
                    self.entry(input).set_value(Axis::Channel, channels)?;
                }
            }
        }
        Ok(())
    }
}

/// Only images and arrays carry a shape; label and dictionary outputs are skipped
fn is_shaped(feature: &FeatureDescription) -> bool {
    feature.feature_type.is_image() || feature.feature_type.is_multi_array()
}

fn check_legacy_rank(feature: &FeatureDescription) -> Result<(), ShapeError> {
    let FeatureKind::MultiArray(array) = &feature.feature_type.kind else {
        return Ok(());
    };
    let ranks: Vec<usize> = match &array.shape_flexibility {
        ArrayShapeFlexibility::EnumeratedShapes(shapes) if !shapes.is_empty() => {
            shapes.iter().map(Vec::len).collect()
        }
        ArrayShapeFlexibility::ShapeRange(ranges) if !ranges.is_empty() => vec![ranges.len()],
        _ => vec![array.shape.len()],
    };
    match ranks.iter().find(|r| !matches!(r, 0 | 1 | 3)) {
        Some(rank) => Err(ShapeError(format!(
            "Feature '{}' has rank {}, but only ranks 1 and 3 can be mapped to the rank-5 layout.",
            feature.name, rank
        ))),
        None => Ok(()),
    }
}

fn preserves_shape(params: &LayerParams) -> bool {
    matches!(
        params,
        LayerParams::Activation(_)
            | LayerParams::Batchnorm(_)
            | LayerParams::Mvn(_)
            | LayerParams::L2Normalize(_)
            | LayerParams::Softmax
            | LayerParams::Lrn(_)
            | LayerParams::Unary(_)
            | LayerParams::Bias(_)
            | LayerParams::Scale(_)
            | LayerParams::Copy
    )
}

/// Evidence for each output blob computed from the current input constraints
fn derive_outputs(layer: &NeuralNetworkLayer, inputs: &[ShapeConstraint]) -> Result<Vec<ShapeConstraint>, ShapeError> {
    let fresh = |i: usize| ShapeConstraint::new(layer.output.get(i).map(String::as_str).unwrap_or(""));
    let mut out = fresh(0);

    let Some(first) = inputs.first() else {
        if let LayerParams::LoadConstant(params) = &layer.layer {
            if let [c, h, w] = params.shape.as_slice() {
                out.set_value(Axis::Sequence, 1)?;
                out.set_value(Axis::Batch, 1)?;
                out.set_value(Axis::Channel, *c as usize)?;
                out.set_value(Axis::Height, *h as usize)?;
                out.set_value(Axis::Width, *w as usize)?;
            }
        }
        return Ok(vec![out]);
    };

    out.update_range(Axis::Sequence, &first.sequence())?;
    out.update_range(Axis::Batch, &first.batch())?;

    match &layer.layer {
        LayerParams::Convolution(conv) => {
            out.set_value(Axis::Channel, conv.output_channels as usize)?;
            let (h, w) = convolution_extent(conv, first);
            out.update_range(Axis::Height, &h)?;
            out.update_range(Axis::Width, &w)?;
        }
        LayerParams::Pooling(pool) => {
            out.update_range(Axis::Channel, &first.channel())?;
            let (h, w) = pooling_extent(pool, first);
            out.update_range(Axis::Height, &h)?;
            out.update_range(Axis::Width, &w)?;
        }
        LayerParams::InnerProduct(ip) => flat_channels(&mut out, ip.output_channels as usize)?,
        LayerParams::Embedding(e) => flat_channels(&mut out, e.output_channels as usize)?,
        LayerParams::Reduce(params) => {
            let (c, h, w) = match params.axis {
                ReduceAxis::Chw => (true, true, true),
                ReduceAxis::Hw => (false, true, true),
                ReduceAxis::C => (true, false, false),
                ReduceAxis::H => (false, true, false),
                ReduceAxis::W => (false, false, true),
            };
            out.update_range(Axis::Channel, &reduced(c, first.channel()))?;
            out.update_range(Axis::Height, &reduced(h, first.height()))?;
            out.update_range(Axis::Width, &reduced(w, first.width()))?;
        }
        LayerParams::Padding(pad) => {
            out.update_range(Axis::Channel, &first.channel())?;
            let (ph, pw) = match pad.padding_amounts.as_slice() {
                [h, w] => (
                    h.start_edge_size.saturating_add(h.end_edge_size),
                    w.start_edge_size.saturating_add(w.end_edge_size),
                ),
                _ => (0, 0),
            };
            out.update_range(Axis::Height, &(first.height() + ph as usize))?;
            out.update_range(Axis::Width, &(first.width() + pw as usize))?;
        }
        LayerParams::Crop(crop) => {
            out.update_range(Axis::Channel, &first.channel())?;
            if let Some(reference) = inputs.get(1) {
                out.update_range(Axis::Height, &reference.height())?;
                out.update_range(Axis::Width, &reference.width())?;
            } else if let [h, w] = crop.crop_amounts.as_slice() {
                let ch = h.start_edge_size.saturating_add(h.end_edge_size) as usize;
                let cw = w.start_edge_size.saturating_add(w.end_edge_size) as usize;
                out.update_range(Axis::Height, &(first.height() - ch))?;
                out.update_range(Axis::Width, &(first.width() - cw))?;
            }
        }
        LayerParams::Upsample(up) => {
            out.update_range(Axis::Channel, &first.channel())?;
            if up.fractional_scaling_factor.is_empty() {
                let factor = |i: usize| up.scaling_factor.get(i).copied().unwrap_or(1).max(1) as usize;
                out.update_range(Axis::Height, &(first.height() * factor(0)))?;
                out.update_range(Axis::Width, &(first.width() * factor(1)))?;
            }
        }
        LayerParams::ResizeBilinear(resize) => {
            out.update_range(Axis::Channel, &first.channel())?;
            fixed_target(&mut out, &resize.target_size)?;
        }
        LayerParams::CropResize(resize) => {
            out.update_range(Axis::Channel, &first.channel())?;
            fixed_target(&mut out, &resize.target_size)?;
        }
        LayerParams::Add(_)
        | LayerParams::Multiply(_)
        | LayerParams::Average
        | LayerParams::Max
        | LayerParams::Min => {
            for axis in [Axis::Channel, Axis::Height, Axis::Width] {
                let span = inputs
                    .iter()
                    .skip(1)
                    .fold(first.range(axis), |acc, c| acc.unify(&c.range(axis)));
                out.update_range(axis, &span)?;
            }
        }
        LayerParams::Dot(_) => flat_channels(&mut out, 1)?,
        LayerParams::Reshape(reshape) => match reshape.target_shape.as_slice() {
            [c, h, w] => fixed_chw(&mut out, *c, *h, *w)?,
            [s, c, h, w] => {
                out = fresh(0);
                out.update_range(Axis::Batch, &first.batch())?;
                out.set_value(Axis::Sequence, (*s).max(0) as usize)?;
                fixed_chw(&mut out, *c, *h, *w)?;
            }
            _ => {}
        },
        LayerParams::Flatten(_) => {
            let volume = first.channel() * first.height() * first.width();
            out.update_range(Axis::Channel, &volume)?;
            out.set_value(Axis::Height, 1)?;
            out.set_value(Axis::Width, 1)?;
        }
        LayerParams::Permute(permute) => {
            let source = [first.sequence(), first.channel(), first.height(), first.width()];
            if permute.axis.len() == 4 && permute.axis.iter().all(|a| *a < 4) {
                out = fresh(0);
                out.update_range(Axis::Batch, &first.batch())?;
                let targets = [Axis::Sequence, Axis::Channel, Axis::Height, Axis::Width];
                for (target, from) in targets.iter().zip(permute.axis.iter()) {
                    out.update_range(*target, &source[*from as usize])?;
                }
            }
        }
        LayerParams::Concat(concat) => {
            let summed = if concat.sequence_concat { Axis::Sequence } else { Axis::Channel };
            let total = inputs
                .iter()
                .skip(1)
                .fold(first.range(summed), |acc, c| acc + c.range(summed));
            if concat.sequence_concat {
                out = fresh(0);
                out.update_range(Axis::Batch, &first.batch())?;
                out.update_range(Axis::Channel, &first.channel())?;
            }
            out.update_range(summed, &total)?;
            out.update_range(Axis::Height, &first.height())?;
            out.update_range(Axis::Width, &first.width())?;
        }
        LayerParams::Split(_) => {
            let parts = layer.output.len().max(1);
            let mut outs = Vec::with_capacity(parts);
            for i in 0..parts {
                let mut part = fresh(i);
                part.update_range(Axis::Sequence, &first.sequence())?;
                part.update_range(Axis::Batch, &first.batch())?;
                part.update_range(Axis::Channel, &(first.channel() / parts))?;
                part.update_range(Axis::Height, &first.height())?;
                part.update_range(Axis::Width, &first.width())?;
                outs.push(part);
            }
            return Ok(outs);
        }
        LayerParams::SequenceRepeat(repeat) => {
            out = fresh(0);
            out.update_range(Axis::Batch, &first.batch())?;
            let reps = repeat.n_repetitions.max(1) as usize;
            out.update_range(Axis::Sequence, &(first.sequence() * reps))?;
            out.copy_from_no_batch_seq(first)?;
        }
        LayerParams::ReorganizeData(reorg) => {
            let block = reorg.block_size as usize;
            if block > 0 {
                let area = block.saturating_mul(block);
                let (c, h, w) = match reorg.mode {
                    ReorganizationType::SpaceToDepth => {
                        (first.channel() * area, first.height() / block, first.width() / block)
                    }
                    ReorganizationType::DepthToSpace | ReorganizationType::PixelShuffle => {
                        (first.channel() / area, first.height() * block, first.width() * block)
                    }
                };
                out.update_range(Axis::Channel, &c)?;
                out.update_range(Axis::Height, &h)?;
                out.update_range(Axis::Width, &w)?;
            }
        }
        LayerParams::Slice(slice) => {
            let axis = match slice.axis {
                SliceAxis::Channel => Axis::Channel,
                SliceAxis::Height => Axis::Height,
                SliceAxis::Width => Axis::Width,
            };
            let source = first.range(axis);
            out = fresh(0);
            out.update_range(Axis::Sequence, &first.sequence())?;
            out.update_range(Axis::Batch, &first.batch())?;
            for other in [Axis::Channel, Axis::Height, Axis::Width] {
                if other != axis {
                    out.update_range(other, &first.range(other))?;
                }
            }
            if source.is_fixed() {
                let extent = sliced_extent(source.minimum_value(), slice.start_index, slice.end_index, slice.stride);
                out.set_value(axis, extent)?;
            } else {
                out.upper_bound(axis, source.maximum())?;
            }
        }
        LayerParams::SimpleRecurrent(rnn) => {
            return recurrent_outputs(layer, first, rnn.output_vector_size as usize, rnn.sequence_output, 1)
        }
        LayerParams::Gru(gru) => {
            return recurrent_outputs(layer, first, gru.output_vector_size as usize, gru.sequence_output, 1)
        }
        LayerParams::UniDirectionalLstm(lstm) => {
            return recurrent_outputs(
                layer,
                first,
                lstm.output_vector_size as usize,
                lstm.params.sequence_output,
                1,
            )
        }
        LayerParams::BiDirectionalLstm(lstm) => {
            return recurrent_outputs(
                layer,
                first,
                lstm.output_vector_size as usize,
                lstm.params.sequence_output,
                2,
            )
        }
        params if preserves_shape(params) => out.copy_from_no_batch_seq(first)?,
        // Custom layers and anything outside the rank-5 catalogue stay unconstrained.
        _ => {}
    }
    Ok(vec![out])
}

fn reduced(collapse: bool, range: ShapeRange) -> ShapeRange {
    if collapse {
        ShapeRange::fixed(1)
    } else {
        range
    }
}

fn flat_channels(out: &mut ShapeConstraint, channels: usize) -> Result<(), ShapeError> {
    out.set_value(Axis::Channel, channels)?;
    out.set_value(Axis::Height, 1)?;
    out.set_value(Axis::Width, 1)
}

fn fixed_chw(out: &mut ShapeConstraint, c: i64, h: i64, w: i64) -> Result<(), ShapeError> {
    out.set_value(Axis::Channel, c.max(0) as usize)?;
    out.set_value(Axis::Height, h.max(0) as usize)?;
    out.set_value(Axis::Width, w.max(0) as usize)
}

fn fixed_target(out: &mut ShapeConstraint, target: &[u64]) -> Result<(), ShapeError> {
    if let [h, w] = target {
        out.set_value(Axis::Height, *h as usize)?;
        out.set_value(Axis::Width, *w as usize)?;
    }
    Ok(())
}

fn dimension(values: &[u64], index: usize, default: u64) -> usize {
    values.get(index).copied().filter(|v| *v > 0).unwrap_or(default) as usize
}

fn convolution_extent(conv: &ConvolutionLayerParams, input: &ShapeConstraint) -> (ShapeRange, ShapeRange) {
    let extent = |axis: Axis, i: usize| {
        let kernel = dimension(&conv.kernel_size, i, 3);
        let stride = dimension(&conv.stride, i, 1);
        let dilation = dimension(&conv.dilation_factor, i, 1);
        let effective = (kernel - 1).saturating_mul(dilation).saturating_add(1);
        let size = input.range(axis);
        if conv.is_deconvolution {
            if let Some(fixed) = conv.output_shape.get(i) {
                return ShapeRange::fixed(*fixed as usize);
            }
            return match &conv.padding {
                Some(ConvolutionPadding::Same(_)) => size * stride,
                Some(ConvolutionPadding::Valid(borders)) => {
                    let pad = border_total(borders, i);
                    ((size - 1) * stride + effective) - pad
                }
                None => ShapeRange::new(),
            };
        }
        match &conv.padding {
            Some(ConvolutionPadding::Same(_)) => size.divide_and_round_up(stride),
            Some(ConvolutionPadding::Valid(borders)) => {
                let pad = border_total(borders, i);
                ((size + pad) - effective) / stride + 1
            }
            None => ShapeRange::new(),
        }
    };
    (extent(Axis::Height, 0), extent(Axis::Width, 1))
}

fn pooling_extent(pool: &PoolingLayerParams, input: &ShapeConstraint) -> (ShapeRange, ShapeRange) {
    if pool.global_pooling {
        return (ShapeRange::fixed(1), ShapeRange::fixed(1));
    }
    let extent = |axis: Axis, i: usize| {
        let kernel = dimension(&pool.kernel_size, i, 3);
        let stride = dimension(&pool.stride, i, 1);
        let size = input.range(axis);
        match &pool.padding {
            Some(PoolingPadding::Same(_)) => size.divide_and_round_up(stride),
            Some(PoolingPadding::Valid(borders)) => {
                let pad = border_total(borders, i);
                ((size + pad) - kernel) / stride + 1
            }
            Some(PoolingPadding::IncludeLastPixel(pads)) => {
                let pad = pads.get(i).copied().unwrap_or(0) as usize;
                ((size + pad.saturating_mul(2)) - kernel).divide_and_round_up(stride) + 1
            }
            None => ShapeRange::new(),
        }
    };
    (extent(Axis::Height, 0), extent(Axis::Width, 1))
}

fn border_total(borders: &[crate::model::BorderAmount], index: usize) -> usize {
    borders
        .get(index)
        .map(|b| b.start_edge_size.saturating_add(b.end_edge_size) as usize)
        .unwrap_or(0)
}

/// Length of a strided slice with python-style negative indices
fn sliced_extent(size: usize, start: i64, end: i64, stride: u64) -> usize {
    let size = size as i64;
    let normalize = |i: i64| if i < 0 { (size + i).max(0) } else { i.min(size) };
    let (start, end) = (normalize(start), if end == 0 { size } else { normalize(end) });
    let stride = i64::try_from(stride.max(1)).unwrap_or(i64::MAX);
    if end <= start {
        return 0;
    }
    ((end - start - 1) / stride + 1) as usize
}

fn recurrent_outputs(
    layer: &NeuralNetworkLayer,
    input: &ShapeConstraint,
    hidden: usize,
    sequence_output: bool,
    directions: usize,
) -> Result<Vec<ShapeConstraint>, ShapeError> {
    let mut outs = Vec::with_capacity(layer.output.len());
    for (i, name) in layer.output.iter().enumerate() {
        let mut out = ShapeConstraint::new(name.as_str());
        out.update_range(Axis::Batch, &input.batch())?;
        if i == 0 {
            if sequence_output {
                out.update_range(Axis::Sequence, &input.sequence())?;
            } else {
                out.set_value(Axis::Sequence, 1)?;
            }
            out.set_value(Axis::Channel, hidden.saturating_mul(directions))?;
        } else {
            out.set_value(Axis::Sequence, 1)?;
            out.set_value(Axis::Channel, hidden)?;
        }
        out.set_value(Axis::Height, 1)?;
        out.set_value(Axis::Width, 1)?;
        outs.push(out);
    }
    Ok(outs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ActivationParams, BorderAmount, ConcatLayerParams, FeatureType, InnerProductLayerParams,
    };

    fn description(inputs: Vec<FeatureDescription>, outputs: Vec<FeatureDescription>) -> ModelDescription {
        ModelDescription {
            input: inputs,
            output: outputs,
            ..Default::default()
        }
    }

    fn conv(kernel: u64, padding: ConvolutionPadding) -> LayerParams {
        LayerParams::Convolution(ConvolutionLayerParams {
            output_channels: 8,
            kernel_channels: 3,
            kernel_size: vec![kernel, kernel],
            padding: Some(padding),
            ..Default::default()
        })
    }

    #[test]
    fn test_valid_convolution_shrinks_spatial_extent() {
        let desc = description(
            vec![FeatureDescription::new("x", FeatureType::multi_array(&[3, 32, 32]))],
            vec![FeatureDescription::new("y", FeatureType::multi_array(&[8, 30, 30]))],
        );
        let layers = vec![NeuralNetworkLayer::new("c", ["x"], ["y"], conv(3, ConvolutionPadding::Valid(vec![])))];
        let shaper = NeuralNetworkShaper::new(&desc, &layers).unwrap();
        let y = shaper.shape("y").unwrap();
        assert!(y.channel().equals(8));
        assert!(y.height().equals(30));
        assert!(y.width().equals(30));
    }

    #[test]
    fn test_same_padding_keeps_extent() {
        let desc = description(vec![FeatureDescription::new("x", FeatureType::multi_array(&[3, 9, 9]))], vec![]);
        let padding = ConvolutionPadding::Same(Default::default());
        let layers = vec![NeuralNetworkLayer::new("c", ["x"], ["y"], conv(3, padding))];
        let shaper = NeuralNetworkShaper::new(&desc, &layers).unwrap();
        assert!(shaper.shape("y").unwrap().height().equals(9));
    }

    #[test]
    fn test_channel_mismatch_with_kernel_fails() {
        let desc = description(vec![FeatureDescription::new("x", FeatureType::multi_array(&[4, 9, 9]))], vec![]);
        let layers = vec![NeuralNetworkLayer::new("c", ["x"], ["y"], conv(3, ConvolutionPadding::Valid(vec![])))];
        let err = NeuralNetworkShaper::new(&desc, &layers).unwrap_err();
        assert!(err.0.contains("Layer 'c'"));
        assert!(err.0.contains("channel"));
    }

    #[test]
    fn test_declared_output_must_agree_with_inference() {
        let desc = description(
            vec![FeatureDescription::new("x", FeatureType::multi_array(&[16]))],
            vec![FeatureDescription::new("y", FeatureType::multi_array(&[5]))],
        );
        let ip = LayerParams::InnerProduct(InnerProductLayerParams {
            input_channels: 16,
            output_channels: 4,
            ..Default::default()
        });
        let layers = vec![NeuralNetworkLayer::new("fc", ["x"], ["y"], ip)];
        assert!(NeuralNetworkShaper::new(&desc, &layers).is_err());
    }

    #[test]
    fn test_activation_propagates_and_concat_sums_channels() {
        let desc = description(vec![FeatureDescription::new("x", FeatureType::multi_array(&[2, 4, 4]))], vec![]);
        let layers = vec![
            NeuralNetworkLayer::new("relu", ["x"], ["a"], LayerParams::Activation(ActivationParams::ReLU)),
            NeuralNetworkLayer::new(
                "cat",
                ["x", "a"],
                ["b"],
                LayerParams::Concat(ConcatLayerParams::default()),
            ),
        ];
        let shaper = NeuralNetworkShaper::new(&desc, &layers).unwrap();
        assert!(shaper.shape("a").unwrap().has_fixed_chw());
        assert!(shaper.shape("b").unwrap().channel().equals(4));
        assert!(shaper.shape("b").unwrap().height().equals(4));
    }

    #[test]
    fn test_padding_grows_extent() {
        let desc = description(vec![FeatureDescription::new("x", FeatureType::multi_array(&[1, 5, 5]))], vec![]);
        let pad = LayerParams::Padding(crate::model::PaddingLayerParams {
            padding_type: Some(crate::model::PaddingType::Reflection),
            padding_amounts: vec![
                BorderAmount { start_edge_size: 1, end_edge_size: 1 },
                BorderAmount { start_edge_size: 2, end_edge_size: 0 },
            ],
        });
        let layers = vec![NeuralNetworkLayer::new("pad", ["x"], ["y"], pad)];
        let shaper = NeuralNetworkShaper::new(&desc, &layers).unwrap();
        assert!(shaper.shape("y").unwrap().height().equals(7));
        assert!(shaper.shape("y").unwrap().width().equals(7));
    }

    #[test]
    fn test_rank_two_interface_is_rejected() {
        let desc = description(vec![FeatureDescription::new("x", FeatureType::multi_array(&[2, 2]))], vec![]);
        let err = NeuralNetworkShaper::new(&desc, &[]).unwrap_err();
        assert!(err.0.contains("rank 2"));
    }

    #[test]
    fn test_sliced_extent_handles_negative_end() {
        assert_eq!(sliced_extent(10, 2, -1, 1), 7);
        assert_eq!(sliced_extent(10, 0, 0, 3), 4);
        assert_eq!(sliced_extent(4, 3, 1, 1), 0);
        assert_eq!(sliced_extent(10, 0, 0, u64::MAX), 1);
    }

    #[test]
    fn test_label_outputs_are_not_constrained() {
        let desc = description(
            vec![FeatureDescription::new("x", FeatureType::multi_array(&[3]))],
            vec![
                FeatureDescription::new("probs", FeatureType::multi_array(&[3])),
                FeatureDescription::new("label", FeatureType::string()),
            ],
        );
        let layers = vec![NeuralNetworkLayer::new("sm", ["x"], ["probs"], LayerParams::Softmax)];
        let shaper = NeuralNetworkShaper::new(&desc, &layers).unwrap();
        assert!(shaper.shape("probs").unwrap().channel().equals(3));
        assert!(!shaper.is_known("label"));
    }

    #[test]
    fn test_huge_kernel_dimensions_saturate() {
        let desc = description(vec![FeatureDescription::new("x", FeatureType::multi_array(&[3, 9, 9]))], vec![]);
        let params = LayerParams::Convolution(ConvolutionLayerParams {
            output_channels: 8,
            kernel_channels: u64::MAX,
            n_groups: 2,
            kernel_size: vec![u64::MAX, 3],
            dilation_factor: vec![u64::MAX, 1],
            padding: Some(ConvolutionPadding::Valid(vec![])),
            ..Default::default()
        });
        let layers = vec![NeuralNetworkLayer::new("c", ["x"], ["y"], params)];
        assert!(NeuralNetworkShaper::new(&desc, &layers).is_err());
    }
}
