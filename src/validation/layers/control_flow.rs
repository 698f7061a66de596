//! Copy, branch, loop and custom layers.
//!
//! Branch and loop bodies are validated by child validators seeded with the
//! current scope. Afterwards only some of the child scopes flow back:
//! a branch promotes the blobs visible in both arms, a loop promotes its
//! condition network's blobs and those body blobs the condition network also
//! sees (all body blobs when there is no condition network).

use super::LayerRegistry;
use crate::error::{Error, Result};
use crate::model::{LayerKind, NeuralNetworkLayer, WeightParamType};
use crate::validation::network::NeuralNetworkSpecValidator;
use crate::validation::utils::{
    validate_input_count, validate_input_output_rank_equality, validate_io_counts, validate_output_count,
};

pub(super) fn register(registry: &mut LayerRegistry) {
    registry.register(LayerKind::Copy, validate_copy);
    registry.register(LayerKind::Branch, validate_branch);
    registry.register(LayerKind::Loop, validate_loop);
    registry.register(LayerKind::LoopBreak, validate_loop_escape);
    registry.register(LayerKind::LoopContinue, validate_loop_escape);
    registry.register(LayerKind::Custom, validate_custom);
}

fn validate_copy(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 1)?;
    if layer.input[0] == layer.output[0] {
        return Err(Error::params(format!(
            "Copy layer '{}' has identical input and output names.",
            layer.name
        )));
    }
    validate_input_output_rank_equality(layer)
}

fn validate_branch(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 1, 0)?;
    let params = layer_params!(layer, Branch);
    if params.if_branch.is_empty() {
        return Err(Error::params(format!(
            "Branch layer '{}': ifBranch must not be empty.",
            layer.name
        )));
    }

    let mut if_scope = v.nested(layer, false)?;
    if_scope.validate_layers(&params.if_branch.layers)?;

    if params.else_branch.is_empty() {
        return Ok(());
    }
    let mut else_scope = v.nested(layer, false)?;
    else_scope.validate_layers(&params.else_branch.layers)?;

    let shared: Vec<&String> = if_scope
        .blobs
        .keys()
        .filter(|name| else_scope.blobs.contains_key(*name))
        .collect();
    for name in shared {
        v.merge_blob(name, &if_scope);
        v.merge_blob(name, &else_scope);
    }
    Ok(())
}

fn validate_loop(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_input_count(layer, 0, Some(1))?;
    validate_output_count(layer, 0, Some(0))?;
    let params = layer_params!(layer, Loop);

    let has_condition = !params.condition_network.is_empty();
    if has_condition != !params.condition_var.is_empty() {
        return Err(Error::params(format!(
            "Loop layer '{}': conditionVar and conditionNetwork must be provided together.",
            layer.name
        )));
    }
    if params.body_network.is_empty() {
        return Err(Error::params(format!(
            "Loop layer '{}' has an empty body network.",
            layer.name
        )));
    }
    if layer.input.is_empty() && !has_condition && params.max_loop_iterations == 0 {
        return Err(Error::params(format!(
            "Loop layer '{}' needs an iteration count input, maxLoopIterations or a condition network.",
            layer.name
        )));
    }

    let condition_scope = if has_condition {
        let mut scope = v.nested(layer, false)?;
        scope.validate_layers(&params.condition_network.layers)?;
        if !scope.blobs.contains_key(&params.condition_var) {
            return Err(Error::params(format!(
                "Loop layer '{}': condition variable '{}' is not produced by the condition network.",
                layer.name, params.condition_var
            )));
        }
        Some(scope)
    } else {
        None
    };

    let mut body_scope = v.nested(layer, true)?;
    if let Some(condition) = &condition_scope {
        let visible: Vec<&String> = condition.blobs.keys().collect();
        for name in visible {
            body_scope.merge_blob(name, condition);
        }
    }
    body_scope.validate_layers(&params.body_network.layers)?;

    match &condition_scope {
        Some(condition) => {
            for name in condition.blobs.keys() {
                v.merge_blob(name, condition);
                v.merge_blob(name, &body_scope);
            }
        }
        None => {
            for name in body_scope.blobs.keys() {
                v.merge_blob(name, &body_scope);
            }
        }
    }
    Ok(())
}

/// Loop break and continue may only appear inside a loop body
fn validate_loop_escape(v: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    validate_io_counts(layer, 0, 0)?;
    if v.loop_depth == 0 {
        return Err(Error::params(format!(
            "Layer '{}' of type '{}' must be inside a loop body.",
            layer.name,
            layer.kind()
        )));
    }
    Ok(())
}

fn validate_custom(_: &mut NeuralNetworkSpecValidator<'_>, layer: &NeuralNetworkLayer) -> Result<()> {
    let params = layer_params!(layer, Custom);
    if params.class_name.is_empty() {
        return Err(Error::params(format!(
            "Custom layer '{}' has an empty 'className' field. This field is required in order to link \
             to the implementation of the custom layer.",
            layer.name
        )));
    }
    for (index, weight) in params.weights.iter().enumerate() {
        if weight.value_type() == WeightParamType::Unspecified {
            return Err(Error::params(format!(
                "Custom layer '{}' has invalid storage for weight {}.",
                layer.name, index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BranchLayerParams, LayerParams, LoopLayerParams, SubNetwork};
    use crate::validation::options::ValidationOptions;
    use std::collections::HashMap;

    fn copy(name: &str, input: &str, output: &str) -> NeuralNetworkLayer {
        NeuralNetworkLayer::new(name, [input], [output], LayerParams::Copy)
    }

    fn scope<'a>(registry: &'a LayerRegistry, options: &'a ValidationOptions) -> NeuralNetworkSpecValidator<'a> {
        let mut v = NeuralNetworkSpecValidator::new(registry, options, HashMap::new(), false);
        v.seed_inputs(["x", "cond"]);
        v
    }

    #[test]
    fn test_copy_needs_a_new_name() {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = scope(&registry, &options);
        let err = v.validate_layers(&[copy("same", "x", "x")]).unwrap_err();
        assert!(err.message().contains("identical input and output names"));
        v.validate_layers(&[copy("rename", "x", "y")]).unwrap();
    }

    #[test]
    fn test_branch_promotes_only_shared_blobs() {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = scope(&registry, &options);
        let branch = NeuralNetworkLayer::new(
            "if",
            ["cond"],
            Vec::<String>::new(),
            LayerParams::Branch(BranchLayerParams {
                if_branch: SubNetwork::new(vec![copy("c1", "x", "a"), copy("c2", "x", "b")]),
                else_branch: SubNetwork::new(vec![copy("c3", "x", "b")]),
            }),
        );
        v.validate_layers(&[branch]).unwrap();
        assert!(!v.blobs.contains_key("a"));
        let producers = &v.blobs["b"];
        assert!(producers.contains("c2") && producers.contains("c3"));
    }

    #[test]
    fn test_loop_break_outside_loop() {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = scope(&registry, &options);
        let brk = NeuralNetworkLayer::new("brk", Vec::<String>::new(), Vec::<String>::new(), LayerParams::LoopBreak);
        let err = v.validate_layers(&[brk.clone()]).unwrap_err();
        assert!(err.message().contains("inside a loop body"));

        let mut v = scope(&registry, &options);
        let looped = NeuralNetworkLayer::new(
            "loop",
            Vec::<String>::new(),
            Vec::<String>::new(),
            LayerParams::Loop(LoopLayerParams {
                max_loop_iterations: 3,
                body_network: SubNetwork::new(vec![copy("c", "x", "y"), brk]),
                ..Default::default()
            }),
        );
        v.validate_layers(&[looped]).unwrap();
        assert!(v.blobs.contains_key("y"));
    }

    #[test]
    fn test_loop_condition_must_be_produced() {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = scope(&registry, &options);
        let looped = NeuralNetworkLayer::new(
            "loop",
            Vec::<String>::new(),
            Vec::<String>::new(),
            LayerParams::Loop(LoopLayerParams {
                condition_var: "keep_going".into(),
                condition_network: SubNetwork::new(vec![copy("c", "cond", "other")]),
                body_network: SubNetwork::new(vec![copy("b", "x", "z")]),
                ..Default::default()
            }),
        );
        let err = v.validate_layers(&[looped]).unwrap_err();
        assert!(err.message().contains("'keep_going'"));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default().set_max_nesting_depth(1);
        let mut v = scope(&registry, &options);
        let inner = NeuralNetworkLayer::new(
            "inner",
            ["cond"],
            Vec::<String>::new(),
            LayerParams::Branch(BranchLayerParams {
                if_branch: SubNetwork::new(vec![copy("c", "x", "a")]),
                ..Default::default()
            }),
        );
        let outer = NeuralNetworkLayer::new(
            "outer",
            ["cond"],
            Vec::<String>::new(),
            LayerParams::Branch(BranchLayerParams {
                if_branch: SubNetwork::new(vec![inner]),
                ..Default::default()
            }),
        );
        let err = v.validate_layers(&[outer]).unwrap_err();
        assert!(err.message().contains("maximum supported nesting depth of 1"));
    }

    #[test]
    fn test_custom_needs_class_name() {
        let registry = LayerRegistry::standard();
        let options = ValidationOptions::default();
        let mut v = scope(&registry, &options);
        let layer = NeuralNetworkLayer::new("cust", ["x"], ["y"], LayerParams::Custom(Default::default()));
        assert!(v.validate_layer(&layer).unwrap_err().message().contains("'className'"));
    }
}
