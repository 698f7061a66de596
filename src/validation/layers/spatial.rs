use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{
    InterpolationMode, LayerKind, LinearUpsampleMode, NeuralNetworkLayer, PoolingPadding, WeightParamType,
};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    element_count, is_precision_mix, validate_general_weight_params, validate_input_count, validate_input_output_rank_equality,
    validate_io_counts, validate_output_count, validate_rank_count,
};

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::Convolution, validate_convolution);
    registry.register(LayerKind::Pooling, validate_pooling);
    registry.register(LayerKind::Padding, validate_padding);
    registry.register(LayerKind::Crop, validate_crop);
    registry.register(LayerKind::Upsample, validate_upsample);
    registry.register(LayerKind::ResizeBilinear, validate_resize_bilinear);
    registry.register(LayerKind::CropResize, validate_crop_resize);
    registry.register(LayerKind::ReorganizeData, validate_reorganize_data);
    registry.register(LayerKind::Lrn, validate_lrn);
    registry.register(LayerKind::Slice, validate_slice);
}

/// Convolution and deconvolution.
///
/// A second input supplies the weights at runtime, which is only possible in
/// rank-flexible mode and only for plain (non-dilated) convolution. Otherwise
/// the weight count must equal `outC * kernelC * kH * kW` (deconvolution:
/// `kernelC * outC / groups * kH * kW`).
fn validate_convolution(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(1))?;
    let params = layer_params!(layer, Convolution);
    let name = &layer.name;
    let weights_as_input = layer.input.len() > 1;

    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 4, None)?;
    } else if weights_as_input {
        return Err(Error::params(format!(
            "Convolution Layer '{}' does not support weight as input tensor when RANK5_ARRAY_MAPPING == true.",
            name
        )));
    }

    if params.padding.is_none() {
        return Err(Error::params(format!(
            "Padding type for convolution layer '{}' is not set.",
            name
        )));
    }
    if params.is_deconvolution && weights_as_input {
        return Err(Error::params(format!(
            "Deconvolution Layer '{}' does not support weight as input tensor.",
            name
        )));
    }
    if weights_as_input && params.dilation_factor.iter().any(|d| *d > 1) {
        return Err(Error::params(format!(
            "Convolution layer: '{}' , dilated convolution does not support weight as input tensor.",
            name
        )));
    }

    let groups = params.n_groups.max(1);
    let kernel_height = params.kernel_size.first().copied().unwrap_or(3);
    let kernel_width = params.kernel_size.get(1).copied().unwrap_or(3);
    let out_channels = params.output_channels;
    let kernel_channels = params.kernel_channels;

    if weights_as_input {
        return Ok(());
    }

    let weights_type = params.weights.value_type();
    let bias_type = params.bias.value_type();
    if weights_type == WeightParamType::Unspecified
        || (params.has_bias && bias_type == WeightParamType::Unspecified)
    {
        return Err(Error::params(format!(
            "Convolution layer '{}'  has invalid weights/bias fields.",
            name
        )));
    }
    if params.has_bias && is_precision_mix(weights_type, bias_type) {
        return Err(Error::params(format!(
            "Convolution layer {} has unmatched precisions of weights/bias They should either be half or full precision.",
            name
        )));
    }

    let expected = if params.is_deconvolution {
        element_count(name, &[kernel_channels, out_channels / groups, kernel_height, kernel_width])?
    } else {
        element_count(name, &[out_channels, kernel_channels, kernel_height, kernel_width])?
    };

    match weights_type {
        WeightParamType::Float32 | WeightParamType::Float16 => {
            let size = params.weights.float_len().unwrap_or(0) as u64;
            if size != expected {
                let message = if params.is_deconvolution {
                    format!(
                        "Deconvolution layer '{}' has incorrect weight matrix size {} to encode a {} x {} x {} x {} convolution.",
                        name,
                        size,
                        kernel_channels,
                        out_channels / groups,
                        kernel_height,
                        kernel_width
                    )
                } else {
                    format!(
                        "Convolution layer '{}' has incorrect weight matrix size {} to encode a {} x {} x {} x {} convolution.",
                        name, size, out_channels, kernel_channels, kernel_height, kernel_width
                    )
                };
                return Err(Error::params(message));
            }
        }
        WeightParamType::Quint => {
            validate_general_weight_params(&params.weights, expected, out_channels, "Convolution", name, "weight")?;
        }
        WeightParamType::Empty => {
            return Err(Error::params(format!("Layer {} has not specified weights.", name)));
        }
        WeightParamType::Unspecified => {}
    }

    if params.has_bias {
        match bias_type {
            WeightParamType::Float32 | WeightParamType::Float16 => {
                let size = params.bias.float_len().unwrap_or(0) as u64;
                if size != out_channels {
                    return Err(Error::params(format!(
                        "Convolution layer '{}' has a bias vector of size {} but should be {}.",
                        name, size, out_channels
                    )));
                }
            }
            WeightParamType::Quint => {
                validate_general_weight_params(&params.bias, out_channels, 1, "Convolution", name, "bias")?;
            }
            WeightParamType::Empty => {
                return Err(Error::params(format!("Layer {} has not specified bias.", name)));
            }
            WeightParamType::Unspecified => {}
        }
    }
    Ok(())
}

fn validate_pooling(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 4, None)?;
    }
    let params = layer_params!(layer, Pooling);
    match &params.padding {
        None => Err(Error::params(format!(
            "Padding type for the pooling layer '{}' is not set.",
            layer.name
        ))),
        Some(PoolingPadding::IncludeLastPixel(amounts)) if !amounts.is_empty() && amounts.len() != 2 => {
            Err(Error::params(format!(
                "Padding amounts for the pooling layer '{}' must have length 0 or 2.",
                layer.name
            )))
        }
        Some(_) if !params.kernel_size.is_empty() && params.kernel_size.len() != 2 => Err(Error::params(format!(
            "Kernel size for the pooling layer '{}' must have length 0 or 2.",
            layer.name
        ))),
        Some(_) => Ok(()),
    }
}

fn validate_padding(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 2, None)?;
    }
    let params = layer_params!(layer, Padding);
    if params.padding_type.is_none() {
        return Err(Error::params(format!(
            "Padding type for the padding layer '{}' is not set.",
            layer.name
        )));
    }
    let count = params.padding_amounts.len();
    if count != 0 && count != 2 {
        return Err(Error::params(format!(
            "Padding layer '{}' specifies {} padding amounts, but it should specify either 0 or 2.",
            layer.name, count
        )));
    }
    Ok(())
}

fn validate_crop(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(1))?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Crop);
    if layer.input.len() == 1 && params.crop_amounts.len() != 2 {
        return Err(Error::params(format!(
            "Crop layer '{}' with a single input must specify crop amounts for height and width.",
            layer.name
        )));
    }
    if layer.input.len() == 2 && params.offset.len() != 2 {
        return Err(Error::params(format!(
            "Crop layer '{}' with two inputs must specify an offset of length 2.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_upsample(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Upsample);
    let integral = &params.scaling_factor;
    let fractional = &params.fractional_scaling_factor;

    if !integral.is_empty() && !fractional.is_empty() {
        return Err(Error::params(format!(
            "Only one of scalingFactor and fractionalScalingFactor can be set for Upsample layer '{}'.",
            layer.name
        )));
    }
    if (!integral.is_empty() && integral.len() != 2) || (!fractional.is_empty() && fractional.len() != 2) {
        return Err(Error::params(format!(
            "Scaling factor for Upsample layer '{}' must have length 2 (height, width).",
            layer.name
        )));
    }
    let bilinear = params.mode == InterpolationMode::Bilinear;
    if !fractional.is_empty() && (!bilinear || params.linear_upsample_mode == LinearUpsampleMode::Default) {
        return Err(Error::params(format!(
            "Upsample layer '{}': fractional scaling factors require bilinear mode with an align-corners setting.",
            layer.name
        )));
    }
    if params.linear_upsample_mode != LinearUpsampleMode::Default && !bilinear {
        return Err(Error::params(format!(
            "Upsample layer '{}': linear upsample mode is only valid with bilinear interpolation.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_resize_bilinear(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, ResizeBilinear);
    if !params.target_size.is_empty() && params.target_size.len() != 2 {
        return Err(Error::params(format!(
            "Target Size in the resize bilinear layer '{}' must be a vector of size 2 (i.e height, width) but is a vector of size {}.",
            layer.name,
            params.target_size.len()
        )));
    }
    Ok(())
}

fn validate_crop_resize(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 2, 1)?;
    if v.nd_array_interpretation {
        validate_rank_count(layer, 5, None)?;
    }
    let params = layer_params!(layer, CropResize);
    if !params.target_size.is_empty() && params.target_size.len() != 2 {
        return Err(Error::params(format!(
            "Target Size in the crop resize layer '{}' must be a vector of size 2 (i.e height, width) but is a vector of size {}.",
            layer.name,
            params.target_size.len()
        )));
    }
    Ok(())
}

fn validate_reorganize_data(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, ReorganizeData);
    if params.block_size < 2 {
        return Err(Error::params(format!(
            "Block size for layer '{}' must be > 1.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_lrn(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Lrn);
    if params.k < 0.0 {
        return Err(Error::params(format!(
            "Parameter 'K' for the LRN layer '{}' must be positive.",
            layer.name
        )));
    }
    if params.local_size == 0 {
        return Err(Error::params(format!(
            "Parameter 'localSize' for the LRN layer '{}' must be positive.",
            layer.name
        )));
    }
    Ok(())
}

fn validate_slice(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 3, None)?;
    }
    let params = layer_params!(layer, Slice);
    if params.stride == 0 || params.stride > i64::MAX as u64 {
        return Err(Error::params(format!(
            "Stride length for the slice layer '{}' must be > 0 and at most {}.",
            layer.name,
            i64::MAX
        )));
    }
    if params.start_index >= 0 && params.end_index > 0 && params.start_index >= params.end_index {
        return Err(Error::params(format!(
            "Slice layer '{}': start index {} must be smaller than end index {}.",
            layer.name, params.start_index, params.end_index
        )));
    }
    Ok(())
}
