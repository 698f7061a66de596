use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;

use mlmodel_validator::{
    model::{
        ActivationParams, FeatureDescription, FeatureType, InnerProductLayerParams, LayerParams, Model,
        ModelDescription, ModelKind, NeuralNetwork, NeuralNetworkLayer, Pipeline, WeightParams,
    },
    ValidationOptions, Validator,
};

// =====================================================================
// Model generation
// =====================================================================

/// Random activation for a chain link
fn random_activation(rng: &mut StdRng) -> ActivationParams {
    match rng.gen_range(0..4) {
        0 => ActivationParams::ReLU,
        1 => ActivationParams::Tanh,
        2 => ActivationParams::Sigmoid,
        _ => ActivationParams::LeakyReLU { alpha: rng.gen_range(0.01..0.3) },
    }
}

/// Alternating inner-product and activation layers over vectors of `width`,
/// reading `input` and ending in `output`
fn chain_network(rng: &mut StdRng, depth: usize, width: u64, input: &str, output: &str) -> Model {
    let mut layers = Vec::with_capacity(depth * 2);
    let mut current = input.to_string();
    for i in 0..depth {
        let hidden = format!("{}_fc{}", output, i);
        let weights: Vec<f32> = (0..width * width).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let bias: Vec<f32> = (0..width).map(|_| rng.gen_range(-1.0..1.0)).collect();
        layers.push(NeuralNetworkLayer::new(
            &format!("fc{}", i),
            [current.as_str()],
            [hidden.as_str()],
            LayerParams::InnerProduct(InnerProductLayerParams {
                input_channels: width,
                output_channels: width,
                has_bias: true,
                weights: WeightParams::from_f32(weights),
                bias: WeightParams::from_f32(bias),
                int8_dynamic_quantize: false,
            }),
        ));

        let activated = if i + 1 == depth {
            output.to_string()
        } else {
            format!("{}_act{}", output, i)
        };
        layers.push(NeuralNetworkLayer::new(
            &format!("act{}", i),
            [hidden.as_str()],
            [activated.as_str()],
            LayerParams::Activation(random_activation(rng)),
        ));
        current = activated;
    }

    let shape = [width as i64];
    let description = ModelDescription {
        input: vec![FeatureDescription::new(input, FeatureType::multi_array(&shape))],
        output: vec![FeatureDescription::new(output, FeatureType::multi_array(&shape))],
        ..Default::default()
    };
    Model::new(1, description, ModelKind::NeuralNetwork(NeuralNetwork::new(layers)))
}

/// Pipeline of `stages` chained networks, stage `i` reading `s{i}` and producing `s{i+1}`
fn chain_pipeline(rng: &mut StdRng, stages: usize, depth: usize, width: u64) -> Model {
    let models: Vec<Model> = (0..stages)
        .map(|i| chain_network(rng, depth, width, &format!("s{}", i), &format!("s{}", i + 1)))
        .collect();
    let shape = [width as i64];
    let description = ModelDescription {
        input: vec![FeatureDescription::new("s0", FeatureType::multi_array(&shape))],
        output: vec![FeatureDescription::new(
            format!("s{}", stages),
            FeatureType::multi_array(&shape),
        )],
        ..Default::default()
    };
    Model::new(1, description, ModelKind::Pipeline(Pipeline::new(models)))
}

// =====================================================================
// Benchmarks
// =====================================================================

fn bench_network_depth(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("network_depth");

    let with_shaper = Validator::default();
    let without_shaper = Validator::new(ValidationOptions::default().set_run_legacy_shaper(false));

    for depth in [4usize, 32, 128] {
        let model = chain_network(&mut rng, depth, 16, "x", "y");
        group.bench_with_input(BenchmarkId::new("layers_only", depth), &model, |b, m| {
            b.iter(|| without_shaper.validate(m).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("with_shaper", depth), &model, |b, m| {
            b.iter(|| with_shaper.validate(m).unwrap())
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let mut group = c.benchmark_group("pipeline");
    let model = chain_pipeline(&mut rng, 8, 16, 32);

    let sequential = Validator::default();
    let parallel = Validator::new(ValidationOptions::default().set_parallel_pipelines(true));

    group.bench_function(BenchmarkId::new("stages", "sequential"), |b| {
        b.iter(|| sequential.validate(&model).unwrap())
    });
    group.bench_function(BenchmarkId::new("stages", "parallel"), |b| {
        b.iter(|| parallel.validate(&model).unwrap())
    });
    group.finish();
}

fn bench_json_load(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let json = chain_network(&mut rng, 32, 16, "x", "y").to_json_string().unwrap();
    let validator = Validator::default();

    c.bench_function("load_and_validate_json", |b| {
        b.iter(|| {
            let model = Model::from_json_str(&json).unwrap();
            validator.validate(&model).unwrap()
        })
    });
}

criterion_group!(benches, bench_network_depth, bench_pipeline, bench_json_load);
criterion_main!(benches);
