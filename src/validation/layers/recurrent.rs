//! Simple RNN, GRU and LSTM layers.
//!
//! Every gate carries an input matrix (`input x output`), a recursion matrix
//! (`output x output`) and optionally a bias or peephole vector (`output`).
//! All of a layer's weights share one storage precision.

use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{
    ActivationParams, LayerKind, LstmParams, LstmWeightParams, NeuralNetworkLayer, WeightParamType, WeightParams,
};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    element_count, is_precision_mix, validate_general_weight_params, validate_input_count, validate_input_output_rank_equality,
    validate_output_count, validate_rank_count, validate_recurrent_activation_params,
};

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::SimpleRecurrent, validate_simple_recurrent);
    registry.register(LayerKind::Gru, validate_gru);
    registry.register(LayerKind::UniDirectionalLstm, validate_uni_directional_lstm);
    registry.register(LayerKind::BiDirectionalLstm, validate_bi_directional_lstm);
}

/// Sizes of one layer's gates, used to phrase diagnostics
struct GateShape<'a> {
    layer_class: &'a str,
    layer_name: &'a str,
    input_size: u64,
    output_size: u64,
}

impl GateShape<'_> {
    fn input_matrix(&self, what: &str, weight: &WeightParams) -> Result<()> {
        self.matrix(what, weight, self.input_size)
    }

    fn recursion_matrix(&self, what: &str, weight: &WeightParams) -> Result<()> {
        self.matrix(what, weight, self.output_size)
    }

    fn matrix(&self, what: &str, weight: &WeightParams, rows: u64) -> Result<()> {
        let expected = element_count(self.layer_name, &[rows, self.output_size])?;
        match weight.float_len() {
            Some(size) if size as u64 != expected => Err(Error::params(format!(
                "{} layer '{}' expects {} of size {} x {} but provides {}.",
                self.layer_class, self.layer_name, what, rows, self.output_size, size
            ))),
            Some(_) => Ok(()),
            None => validate_general_weight_params(
                weight,
                expected,
                self.output_size,
                self.layer_class,
                self.layer_name,
                what,
            ),
        }
    }

    fn vector(&self, what: &str, weight: &WeightParams) -> Result<()> {
        match weight.float_len() {
            Some(size) if size as u64 != self.output_size => Err(Error::params(format!(
                "{} layer '{}' has {} of size {} but expects size {}.",
                self.layer_class, self.layer_name, what, size, self.output_size
            ))),
            Some(_) => Ok(()),
            None => validate_general_weight_params(weight, self.output_size, 1, self.layer_class, self.layer_name, what),
        }
    }
}

fn validate_consistent_types<'w>(
    layer_class: &str,
    weights: impl IntoIterator<Item = &'w WeightParams>,
) -> Result<()> {
    let mut first: Option<WeightParamType> = None;
    for weight in weights {
        let weight_type = weight.value_type();
        let inconsistent = weight_type == WeightParamType::Unspecified
            || first.map_or(false, |f| is_precision_mix(f, weight_type));
        if inconsistent {
            return Err(Error::params(format!(
                "{} weight parameters have inconsistent field value types. Types should match and should be \
                 either half or full precision",
                layer_class
            )));
        }
        first.get_or_insert(weight_type);
    }
    Ok(())
}

fn validate_activations(layer: &NeuralNetworkLayer, activations: &[ActivationParams], expected: usize) -> Result<()> {
    if activations.len() != expected {
        return Err(Error::params(format!(
            "Layer '{}' of type '{}' must provide {} activations, but {} were given.",
            layer.name,
            layer.kind(),
            expected,
            activations.len()
        )));
    }
    activations.iter().try_for_each(validate_recurrent_activation_params)
}

fn validate_recurrent_ranks(v: &NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    if v.nd_array_interpretation {
        validate_input_output_rank_equality(layer)?;
        validate_rank_count(layer, 5, Some(5))?;
    }
    Ok(())
}

fn validate_simple_recurrent(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(2))?;
    validate_recurrent_ranks(v, layer)?;
    let params = layer_params!(layer, SimpleRecurrent);

    let mut weights = vec![&params.weight_matrix, &params.recursion_matrix];
    if params.has_bias_vector {
        weights.push(&params.bias_vector);
    }
    validate_consistent_types("SimpleRNN", weights)?;

    let gates = GateShape {
        layer_class: "SimpleRNN",
        layer_name: &layer.name,
        input_size: params.input_vector_size,
        output_size: params.output_vector_size,
    };
    gates.input_matrix("weight matrix", &params.weight_matrix)?;
    gates.recursion_matrix("recursion matrix", &params.recursion_matrix)?;
    if params.has_bias_vector {
        gates.vector("bias vector", &params.bias_vector)?;
    }
    validate_recurrent_activation_params(&params.activation)
}

fn validate_gru(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(2))?;
    validate_output_count(layer, 1, Some(2))?;
    validate_recurrent_ranks(v, layer)?;
    let params = layer_params!(layer, Gru);

    let mut weights = vec![
        &params.update_gate_weight_matrix,
        &params.reset_gate_weight_matrix,
        &params.output_gate_weight_matrix,
        &params.update_gate_recursion_matrix,
        &params.reset_gate_recursion_matrix,
        &params.output_gate_recursion_matrix,
    ];
    if params.has_bias_vectors {
        weights.extend([
            &params.update_gate_bias_vector,
            &params.reset_gate_bias_vector,
            &params.output_gate_bias_vector,
        ]);
    }
    validate_consistent_types("GRU", weights)?;

    let gates = GateShape {
        layer_class: "GRU",
        layer_name: &layer.name,
        input_size: params.input_vector_size,
        output_size: params.output_vector_size,
    };
    gates.input_matrix("update gate weight matrix", &params.update_gate_weight_matrix)?;
    gates.input_matrix("reset gate weight matrix", &params.reset_gate_weight_matrix)?;
    gates.input_matrix("output gate weight matrix", &params.output_gate_weight_matrix)?;
    gates.recursion_matrix("update gate recursion matrix", &params.update_gate_recursion_matrix)?;
    gates.recursion_matrix("reset gate recursion matrix", &params.reset_gate_recursion_matrix)?;
    gates.recursion_matrix("output gate recursion matrix", &params.output_gate_recursion_matrix)?;
    if params.has_bias_vectors {
        gates.vector("update gate bias vector", &params.update_gate_bias_vector)?;
        gates.vector("reset gate bias vector", &params.reset_gate_bias_vector)?;
        gates.vector("output gate bias vector", &params.output_gate_bias_vector)?;
    }
    validate_activations(layer, &params.activations, 2)
}

/// Weights of one LSTM direction. With a coupled input and forget gate the
/// input gate carries no parameters.
fn validate_lstm_weights(gates: &GateShape<'_>, params: &LstmParams, weights: &LstmWeightParams) -> Result<()> {
    let coupled = params.coupled_input_and_forget_gate;

    let mut all = Vec::new();
    if !coupled {
        all.push(&weights.input_gate_weight_matrix);
        all.push(&weights.input_gate_recursion_matrix);
    }
    all.extend([
        &weights.forget_gate_weight_matrix,
        &weights.block_input_weight_matrix,
        &weights.output_gate_weight_matrix,
        &weights.forget_gate_recursion_matrix,
        &weights.block_input_recursion_matrix,
        &weights.output_gate_recursion_matrix,
    ]);
    if params.has_bias_vectors {
        if !coupled {
            all.push(&weights.input_gate_bias_vector);
        }
        all.extend([
            &weights.forget_gate_bias_vector,
            &weights.block_input_bias_vector,
            &weights.output_gate_bias_vector,
        ]);
    }
    if params.has_peephole_vectors {
        if !coupled {
            all.push(&weights.input_gate_peephole_vector);
        }
        all.extend([&weights.forget_gate_peephole_vector, &weights.output_gate_peephole_vector]);
    }
    validate_consistent_types("LSTM", all)?;

    if !coupled {
        gates.input_matrix("input gate weight matrix", &weights.input_gate_weight_matrix)?;
        gates.recursion_matrix("input gate recursion matrix", &weights.input_gate_recursion_matrix)?;
    }
    gates.input_matrix("forget gate weight matrix", &weights.forget_gate_weight_matrix)?;
    gates.input_matrix("block input gate weight matrix", &weights.block_input_weight_matrix)?;
    gates.input_matrix("output gate weight matrix", &weights.output_gate_weight_matrix)?;
    gates.recursion_matrix("forget gate recursion matrix", &weights.forget_gate_recursion_matrix)?;
    gates.recursion_matrix("block input gate recursion matrix", &weights.block_input_recursion_matrix)?;
    gates.recursion_matrix("output gate recursion matrix", &weights.output_gate_recursion_matrix)?;

    if params.has_bias_vectors {
        if !coupled {
            gates.vector("input gate bias vector", &weights.input_gate_bias_vector)?;
        }
        gates.vector("forget gate bias vector", &weights.forget_gate_bias_vector)?;
        gates.vector("block input gate bias vector", &weights.block_input_bias_vector)?;
        gates.vector("output gate bias vector", &weights.output_gate_bias_vector)?;
    }
    if params.has_peephole_vectors {
        if !coupled {
            gates.vector("input gate peep hole vector", &weights.input_gate_peephole_vector)?;
        }
        gates.vector("forget gate peep hole vector", &weights.forget_gate_peephole_vector)?;
        gates.vector("output gate peep hole vector", &weights.output_gate_peephole_vector)?;
    }
    Ok(())
}

fn validate_uni_directional_lstm(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(3))?;
    validate_output_count(layer, 1, Some(3))?;
    validate_recurrent_ranks(v, layer)?;
    let params = layer_params!(layer, UniDirectionalLstm);

    validate_activations(layer, &params.activations, 3)?;
    let gates = GateShape {
        layer_class: "LSTM",
        layer_name: &layer.name,
        input_size: params.input_vector_size,
        output_size: params.output_vector_size,
    };
    validate_lstm_weights(&gates, &params.params, &params.weight_params)
}

fn validate_bi_directional_lstm(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 1, Some(5))?;
    validate_output_count(layer, 1, Some(5))?;
    validate_recurrent_ranks(v, layer)?;
    let params = layer_params!(layer, BiDirectionalLstm);

    validate_activations(layer, &params.activations_forward_lstm, 3)?;
    validate_activations(layer, &params.activations_backward_lstm, 3)?;

    if params.weight_params.len() != 2 {
        return Err(Error::params(format!(
            "Bidirectional LSTM layer '{}' must provide forward and backward weights, but {} weight sets were given.",
            layer.name,
            params.weight_params.len()
        )));
    }
    let gates = GateShape {
        layer_class: "LSTM",
        layer_name: &layer.name,
        input_size: params.input_vector_size,
        output_size: params.output_vector_size,
    };
    for weights in &params.weight_params {
        validate_lstm_weights(&gates, &params.params, weights)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GruLayerParams, LayerParams, SimpleRecurrentLayerParams, UniDirectionalLstmLayerParams};
    use crate::validation::options::ValidationOptions;
    use half::f16;
    use std::collections::HashMap;

    fn check(layer: &NeuralNetworkLayer) -> Result<()> {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = NeuralNetworkSpecValidator::new(&registry, &options, HashMap::new(), false);
        v.validate_layer(layer)
    }

    fn floats(n: usize) -> WeightParams {
        WeightParams::from_f32(vec![0.0; n])
    }

    fn simple_rnn(weight: WeightParams) -> NeuralNetworkLayer {
        let params = SimpleRecurrentLayerParams {
            input_vector_size: 3,
            output_vector_size: 2,
            activation: ActivationParams::Tanh,
            weight_matrix: weight,
            recursion_matrix: floats(4),
            ..Default::default()
        };
        NeuralNetworkLayer::new("rnn", ["x"], ["y"], LayerParams::SimpleRecurrent(params))
    }

    #[test]
    fn test_simple_rnn_matrix_sizes() {
        assert!(check(&simple_rnn(floats(6))).is_ok());
        let err = check(&simple_rnn(floats(5))).unwrap_err();
        assert_eq!(
            err.message(),
            "SimpleRNN layer 'rnn' expects weight matrix of size 3 x 2 but provides 5."
        );
    }

    #[test]
    fn test_simple_rnn_precision_mix() {
        let half = WeightParams::from_f16(&[f16::ZERO; 6]);
        let err = check(&simple_rnn(half)).unwrap_err();
        assert!(err.message().starts_with("SimpleRNN weight parameters have inconsistent field value types."));
    }

    #[test]
    fn test_gru_needs_two_activations() {
        let params = GruLayerParams {
            input_vector_size: 1,
            output_vector_size: 1,
            activations: vec![ActivationParams::Sigmoid],
            update_gate_weight_matrix: floats(1),
            reset_gate_weight_matrix: floats(1),
            output_gate_weight_matrix: floats(1),
            update_gate_recursion_matrix: floats(1),
            reset_gate_recursion_matrix: floats(1),
            output_gate_recursion_matrix: floats(1),
            ..Default::default()
        };
        let layer = NeuralNetworkLayer::new("gru", ["x"], ["y"], LayerParams::Gru(params.clone()));
        assert!(check(&layer).unwrap_err().message().contains("must provide 2 activations"));

        let params = GruLayerParams {
            activations: vec![ActivationParams::Sigmoid, ActivationParams::Tanh],
            ..params
        };
        let layer = NeuralNetworkLayer::new("gru", ["x"], ["y"], LayerParams::Gru(params));
        assert!(check(&layer).is_ok());
    }

    #[test]
    fn test_lstm_rejects_unsupported_activation() {
        let weights = LstmWeightParams {
            input_gate_weight_matrix: floats(1),
            forget_gate_weight_matrix: floats(1),
            block_input_weight_matrix: floats(1),
            output_gate_weight_matrix: floats(1),
            input_gate_recursion_matrix: floats(1),
            forget_gate_recursion_matrix: floats(1),
            block_input_recursion_matrix: floats(1),
            output_gate_recursion_matrix: floats(1),
            ..Default::default()
        };
        let params = UniDirectionalLstmLayerParams {
            input_vector_size: 1,
            output_vector_size: 1,
            activations: vec![ActivationParams::Sigmoid, ActivationParams::Tanh, ActivationParams::Softsign],
            weight_params: weights,
            ..Default::default()
        };
        let layer = NeuralNetworkLayer::new("lstm", ["x"], ["y"], LayerParams::UniDirectionalLstm(params.clone()));
        assert!(check(&layer).unwrap_err().message().contains("softsign"));

        let params = UniDirectionalLstmLayerParams {
            activations: vec![ActivationParams::Sigmoid, ActivationParams::Tanh, ActivationParams::Tanh],
            ..params
        };
        let layer = NeuralNetworkLayer::new("lstm", ["x"], ["y"], LayerParams::UniDirectionalLstm(params));
        assert!(check(&layer).is_ok());
    }
}
