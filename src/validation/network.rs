use std::collections::{BTreeSet, HashMap};

use log::trace;

use super::layers::LayerRegistry;
use super::options::ValidationOptions;
use crate::error::{Error, Result};
use crate::model::{LayerKind, NeuralNetworkLayer, Tensor};

/// Producer name recorded for blobs that enter the network from the model interface
pub const INPUT_PRODUCER: &str = "__input";

/// Blob name to the set of layers producing it
pub type BlobScope = HashMap<String, BTreeSet<String>>;

/// Walks one (sub-)network layer by layer, tracking which blobs are visible
/// and, in rank-flexible mode, the rank of every blob.
///
/// Branch and loop layers validate their bodies with a fresh child validator
/// seeded from this scope, then merge the child's visible blobs back.
pub struct NeuralNetworkSpecValidator<'a> {
    pub blobs: BlobScope,
    pub blob_name_to_rank: HashMap<String, i64>,
    pub model_io_blob_name_to_rank: HashMap<String, i64>,
    pub nd_array_interpretation: bool,
    /// Number of enclosing loop bodies
    pub loop_depth: usize,
    /// Number of enclosing branch or loop bodies
    pub nesting_depth: usize,
    registry: &'a LayerRegistry,
    options: &'a ValidationOptions,
}

impl<'a> NeuralNetworkSpecValidator<'a> {
    pub fn new(
        registry: &'a LayerRegistry,
        options: &'a ValidationOptions,
        model_io_blob_name_to_rank: HashMap<String, i64>,
        nd_array_interpretation: bool,
    ) -> Self {
        Self {
            blobs: BlobScope::new(),
            blob_name_to_rank: model_io_blob_name_to_rank.clone(),
            model_io_blob_name_to_rank,
            nd_array_interpretation,
            loop_depth: 0,
            nesting_depth: 0,
            registry,
            options,
        }
    }

    /// Mark model inputs as visible
    pub fn seed_inputs<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) {
        for name in names {
            self.blobs
                .entry(name.to_string())
                .or_default()
                .insert(INPUT_PRODUCER.to_string());
        }
    }

    /// Child validator for a nested body, seeded with a copy of this scope
    pub fn nested(&self, owner: &NeuralNetworkLayer, enters_loop: bool) -> Result<Self> {
        if self.nesting_depth + 1 > self.options.max_nesting_depth {
            return Err(Error::params(format!(
                "Layer '{}' exceeds the maximum supported nesting depth of {}.",
                owner.name, self.options.max_nesting_depth
            )));
        }
        Ok(Self {
            blobs: self.blobs.clone(),
            blob_name_to_rank: self.blob_name_to_rank.clone(),
            model_io_blob_name_to_rank: self.model_io_blob_name_to_rank.clone(),
            nd_array_interpretation: self.nd_array_interpretation,
            loop_depth: self.loop_depth + usize::from(enters_loop),
            nesting_depth: self.nesting_depth + 1,
            registry: self.registry,
            options: self.options,
        })
    }

    /// Add every producer of `name` recorded in `from` to this scope
    pub fn merge_blob(&mut self, name: &str, from: &NeuralNetworkSpecValidator<'_>) {
        if let Some(producers) = from.blobs.get(name) {
            self.blobs
                .entry(name.to_string())
                .or_default()
                .extend(producers.iter().cloned());
        }
        if let Some(rank) = from.blob_name_to_rank.get(name) {
            self.blob_name_to_rank.entry(name.to_string()).or_insert(*rank);
        }
    }

    /// Validate a layer list in order, growing the scope as layers produce blobs
    pub fn validate_layers(&mut self, layers: &[NeuralNetworkLayer]) -> Result<()> {
        for layer in layers {
            trace!("validating layer '{}' of type {}", layer.name, layer.kind());
            if self.nd_array_interpretation {
                self.validate_tensor_ranks(layer)?;
            }

            self.validate_layer(layer)?;

            for input in &layer.input {
                if !self.blobs.contains_key(input) {
                    return Err(Error::params(format!(
                        "Layer '{}' consumes an input named '{}' which is not present in this network.",
                        layer.name, input
                    )));
                }
            }

            for output in &layer.output {
                if layer.kind() != LayerKind::Copy {
                    if let Some(producer) = self.blobs.get(output).and_then(|p| p.iter().next()) {
                        return Err(Error::params(format!(
                            "Layer '{}' produces an output named '{}' which was already produced by the layer '{}'.",
                            layer.name, output, producer
                        )));
                    }
                }
                self.blobs
                    .entry(output.clone())
                    .or_default()
                    .insert(layer.name.clone());
            }
        }
        Ok(())
    }

    /// Dispatch to the check registered for the layer's kind
    pub fn validate_layer(&mut self, layer: &NeuralNetworkLayer) -> Result<()> {
        let registry = self.registry;
        match registry.get(layer.kind()) {
            Some(check) => check(self, layer),
            None => Err(Error::params(format!(
                "Unsupported layer type ({}) for layer '{}'.",
                layer.kind(),
                layer.name
            ))),
        }
    }

    fn validate_tensor_ranks(&mut self, layer: &NeuralNetworkLayer) -> Result<()> {
        if !layer.input_tensor.is_empty() && layer.input_tensor.len() != layer.input.len() {
            return Err(Error::params(format!(
                "Layer '{}''s input and inputTensors have different lengths",
                layer.name
            )));
        }
        if !layer.output_tensor.is_empty() && layer.output_tensor.len() != layer.output.len() {
            return Err(Error::params(format!(
                "Layer '{}''s output and \"outputTensors\" property have different lengths",
                layer.name
            )));
        }

        for (name, tensor) in layer.input.iter().zip(layer.input_tensor.iter()) {
            self.record_rank(layer, name, tensor, "input", "an input to the model")?;
        }
        for (name, tensor) in layer.output.iter().zip(layer.output_tensor.iter()) {
            self.record_rank(layer, name, tensor, "output", "an output of the model")?;
        }
        Ok(())
    }

    fn record_rank(
        &mut self,
        layer: &NeuralNetworkLayer,
        name: &str,
        tensor: &Tensor,
        role: &str,
        model_role: &str,
    ) -> Result<()> {
        validate_tensor_message(layer, tensor)?;
        let rank = tensor.rank as i64;

        if let Some(declared) = self.model_io_blob_name_to_rank.get(name) {
            if *declared != rank {
                return Err(Error::params(format!(
                    "Layer '{}''s {} '{}' is also {}. However, for this tensor the rank provided in the layer \
                     description does not match the one provided in the model description",
                    layer.name, role, name, model_role
                )));
            }
        }

        match self.blob_name_to_rank.get(name) {
            Some(known) if *known != rank => Err(Error::params(format!(
                "Inconsistent rank for the blob named '{}'.",
                name
            ))),
            Some(_) => Ok(()),
            None => {
                self.blob_name_to_rank.insert(name.to_string(), rank);
                Ok(())
            }
        }
    }
}

fn validate_tensor_message(layer: &NeuralNetworkLayer, tensor: &Tensor) -> Result<()> {
    if tensor.rank == 0 {
        return Err(Error::params(format!(
            "Layer '{}' has a tensor with rank 0; ranks must be at least 1.",
            layer.name
        )));
    }
    if !tensor.dim_value.is_empty() && tensor.dim_value.len() != tensor.rank as usize {
        return Err(Error::params(format!(
            "Layer '{}' has a tensor whose rank ({}) does not match the length of its dimValue ({}).",
            layer.name,
            tensor.rank,
            tensor.dim_value.len()
        )));
    }
    Ok(())
}
