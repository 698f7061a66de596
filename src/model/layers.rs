use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumDiscriminants, EnumIter};

use super::weights::WeightParams;

/// Per-edge tensor metadata attached to layer inputs and outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tensor {
    pub rank: u32,
    pub dim_value: Vec<i64>,
}

impl Tensor {
    pub fn with_rank(rank: u32) -> Self {
        Self { rank, dim_value: Vec::new() }
    }
}

/// An ordered layer list nested inside a control-flow layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubNetwork {
    pub layers: Vec<NeuralNetworkLayer>,
}

impl SubNetwork {
    pub fn new(layers: Vec<NeuralNetworkLayer>) -> Self {
        Self { layers }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetworkLayer {
    pub name: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default)]
    pub input_tensor: Vec<Tensor>,
    #[serde(default)]
    pub output_tensor: Vec<Tensor>,
    #[serde(default)]
    pub is_updatable: bool,
    pub layer: LayerParams,
}

impl NeuralNetworkLayer {
    pub fn new<I, O>(name: &str, inputs: I, outputs: O, layer: LayerParams) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            name: name.to_string(),
            input: inputs.into_iter().map(Into::into).collect(),
            output: outputs.into_iter().map(Into::into).collect(),
            input_tensor: Vec::new(),
            output_tensor: Vec::new(),
            is_updatable: false,
            layer,
        }
    }

    pub fn kind(&self) -> LayerKind {
        LayerKind::from(&self.layer)
    }

    /// Attach rank-only tensor metadata to every input and output
    pub fn with_ranks(mut self, input_ranks: &[u32], output_ranks: &[u32]) -> Self {
        self.input_tensor = input_ranks.iter().map(|r| Tensor::with_rank(*r)).collect();
        self.output_tensor = output_ranks.iter().map(|r| Tensor::with_rank(*r)).collect();
        self
    }

    pub fn updatable(mut self) -> Self {
        self.is_updatable = true;
        self
    }
}

/// Kind-specific parameters of a layer. [`LayerKind`] is its payload-free tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(LayerKind))]
#[strum_discriminants(derive(Hash, Display, EnumIter, AsRefStr, Serialize, Deserialize))]
pub enum LayerParams {
    // Layers available since the first rank-5 format
    Convolution(ConvolutionLayerParams),
    Pooling(PoolingLayerParams),
    Activation(ActivationParams),
    InnerProduct(InnerProductLayerParams),
    Embedding(EmbeddingLayerParams),
    Batchnorm(BatchnormLayerParams),
    Mvn(MeanVarianceNormalizeLayerParams),
    L2Normalize(L2NormalizeLayerParams),
    Softmax,
    Lrn(LrnLayerParams),
    Crop(CropLayerParams),
    Padding(PaddingLayerParams),
    Upsample(UpsampleLayerParams),
    ResizeBilinear(ResizeBilinearLayerParams),
    CropResize(CropResizeLayerParams),
    Unary(UnaryFunctionLayerParams),
    Add(ScalarAlphaParams),
    Multiply(ScalarAlphaParams),
    Average,
    Scale(ScaleLayerParams),
    Bias(BiasLayerParams),
    Max,
    Min,
    Dot(DotProductLayerParams),
    Reduce(ReduceLayerParams),
    LoadConstant(LoadConstantLayerParams),
    Reshape(ReshapeLayerParams),
    Flatten(FlattenLayerParams),
    Permute(PermuteLayerParams),
    Concat(ConcatLayerParams),
    Split(SplitLayerParams),
    SequenceRepeat(SequenceRepeatLayerParams),
    ReorganizeData(ReorganizeDataLayerParams),
    Slice(SliceLayerParams),
    SimpleRecurrent(SimpleRecurrentLayerParams),
    Gru(GruLayerParams),
    UniDirectionalLstm(UniDirectionalLstmLayerParams),
    BiDirectionalLstm(BiDirectionalLstmLayerParams),
    Custom(CustomLayerParams),

    // Control flow
    Copy,
    Branch(BranchLayerParams),
    Loop(LoopLayerParams),
    LoopBreak,
    LoopContinue,

    // Elementwise unary
    Erf,
    Gelu(GeluLayerParams),
    Clip(ClipLayerParams),
    Ceil,
    Floor,
    Round,
    Sign,
    Exp2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,

    // Elementwise binary and logical
    AddBroadcastable,
    SubtractBroadcastable,
    MultiplyBroadcastable,
    DivideBroadcastable,
    MaxBroadcastable,
    MinBroadcastable,
    FloorDivBroadcastable,
    ModBroadcastable,
    PowBroadcastable,
    WhereBroadcastable,
    Equal(ScalarAlphaParams),
    NotEqual(ScalarAlphaParams),
    LessThan(ScalarAlphaParams),
    LessEqual(ScalarAlphaParams),
    GreaterThan(ScalarAlphaParams),
    GreaterEqual(ScalarAlphaParams),
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    LogicalNot,

    // Matrix ops
    BatchedMatMul(BatchedMatMulLayerParams),
    MatrixBandPart(MatrixBandPartLayerParams),
    UpperTriangular(TriangularLayerParams),
    LowerTriangular(TriangularLayerParams),

    // Shape manipulation
    Transpose(TransposeLayerParams),
    ConcatNd(AxisLayerParams),
    SoftmaxNd(AxisLayerParams),
    SplitNd(SplitNdLayerParams),
    Stack(AxisLayerParams),
    Reverse(ReverseLayerParams),
    ReverseSeq(ReverseSeqLayerParams),
    Tile(TileLayerParams),
    GetShape,
    RankPreservingReshape(TargetShapeParams),
    ReshapeLike,
    ReshapeStatic(TargetShapeParams),
    ReshapeDynamic,
    ExpandDims(AxesLayerParams),
    Squeeze(SqueezeLayerParams),
    FlattenTo2D(AxisLayerParams),
    BroadcastToLike,
    BroadcastToStatic(TargetShapeParams),
    BroadcastToDynamic,
    SlidingWindows(SlidingWindowsLayerParams),
    SliceStatic(SliceStaticLayerParams),
    SliceDynamic(SliceDynamicLayerParams),
    ConstantPad(ConstantPaddingLayerParams),

    // Gather and scatter
    Gather(AxisLayerParams),
    Scatter(AxisLayerParams),
    GatherNd,
    ScatterNd,
    GatherAlongAxis(AxisLayerParams),
    ScatterAlongAxis(AxisLayerParams),
    WhereNonZero,

    // Tensor creation
    LoadConstantNd(LoadConstantNdLayerParams),
    FillLike(FillLayerParams),
    FillStatic(FillLayerParams),
    FillDynamic(FillLayerParams),
    RangeStatic(RangeLayerParams),
    RangeDynamic(RangeLayerParams),
    EmbeddingNd(EmbeddingNdLayerParams),
    RandomNormalLike(RandomLayerParams),
    RandomNormalStatic(RandomLayerParams),
    RandomNormalDynamic(RandomLayerParams),
    RandomUniformLike(RandomLayerParams),
    RandomUniformStatic(RandomLayerParams),
    RandomUniformDynamic(RandomLayerParams),
    RandomBernoulliLike(RandomLayerParams),
    RandomBernoulliStatic(RandomLayerParams),
    RandomBernoulliDynamic(RandomLayerParams),
    CategoricalDistribution(CategoricalDistributionLayerParams),

    // Reductions and selection
    ReduceL1(ReduceNdParams),
    ReduceL2(ReduceNdParams),
    ReduceMax(ReduceNdParams),
    ReduceMin(ReduceNdParams),
    ReduceSum(ReduceNdParams),
    ReduceProd(ReduceNdParams),
    ReduceMean(ReduceNdParams),
    ReduceLogSum(ReduceNdParams),
    ReduceSumSquare(ReduceNdParams),
    ReduceLogSumExp(ReduceNdParams),
    TopK(TopKLayerParams),
    ArgMax(ArgReduceLayerParams),
    ArgMin(ArgReduceLayerParams),

    // Normalization and detection
    LayerNormalization(LayerNormalizationLayerParams),
    NonMaximumSuppression(NonMaximumSuppressionLayerParams),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderAmount {
    pub start_edge_size: u64,
    pub end_edge_size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamePaddingMode {
    #[default]
    BottomRightHeavy,
    TopLeftHeavy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConvolutionPadding {
    /// Explicit border amounts, height first then width
    Valid(Vec<BorderAmount>),
    Same(SamePaddingMode),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionLayerParams {
    pub output_channels: u64,
    pub kernel_channels: u64,
    pub n_groups: u64,
    pub kernel_size: Vec<u64>,
    pub stride: Vec<u64>,
    pub dilation_factor: Vec<u64>,
    pub padding: Option<ConvolutionPadding>,
    pub is_deconvolution: bool,
    pub has_bias: bool,
    pub weights: WeightParams,
    pub bias: WeightParams,
    pub output_shape: Vec<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolingType {
    #[default]
    Max,
    Average,
    L2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PoolingPadding {
    Valid(Vec<BorderAmount>),
    Same(SamePaddingMode),
    IncludeLastPixel(Vec<u64>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolingLayerParams {
    pub pooling_type: PoolingType,
    pub kernel_size: Vec<u64>,
    pub stride: Vec<u64>,
    pub padding: Option<PoolingPadding>,
    pub avg_pool_exclude_padding: bool,
    pub global_pooling: bool,
}

/// Non-linearity applied by activation and recurrent layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ActivationParams {
    #[default]
    Unset,
    ReLU,
    LeakyReLU { alpha: f32 },
    Tanh,
    ScaledTanh { alpha: f32, beta: f32 },
    Sigmoid,
    SigmoidHard { alpha: f32, beta: f32 },
    Linear { alpha: f32, beta: f32 },
    Elu { alpha: f32 },
    Softplus,
    PReLU { alpha: WeightParams },
    ParametricSoftplus { alpha: WeightParams, beta: WeightParams },
    ThresholdedReLU { alpha: f32 },
    Softsign,
}

impl ActivationParams {
    pub fn name(&self) -> &'static str {
        match self {
            ActivationParams::Unset => "NONLINEARITYTYPE_NOT_SET",
            ActivationParams::ReLU => "ReLU",
            ActivationParams::LeakyReLU { .. } => "leakyReLU",
            ActivationParams::Tanh => "tanh",
            ActivationParams::ScaledTanh { .. } => "scaledTanh",
            ActivationParams::Sigmoid => "sigmoid",
            ActivationParams::SigmoidHard { .. } => "sigmoidHard",
            ActivationParams::Linear { .. } => "linear",
            ActivationParams::Elu { .. } => "ELU",
            ActivationParams::Softplus => "softplus",
            ActivationParams::PReLU { .. } => "PReLU",
            ActivationParams::ParametricSoftplus { .. } => "parametricSoftplus",
            ActivationParams::ThresholdedReLU { .. } => "thresholdedReLU",
            ActivationParams::Softsign => "softsign",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InnerProductLayerParams {
    pub input_channels: u64,
    pub output_channels: u64,
    pub has_bias: bool,
    pub weights: WeightParams,
    pub bias: WeightParams,
    pub int8_dynamic_quantize: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingLayerParams {
    pub input_dim: u64,
    pub output_channels: u64,
    pub has_bias: bool,
    pub weights: WeightParams,
    pub bias: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchnormLayerParams {
    pub channels: u64,
    pub compute_mean_var: bool,
    pub instance_normalization: bool,
    pub epsilon: f32,
    pub gamma: WeightParams,
    pub beta: WeightParams,
    pub mean: WeightParams,
    pub variance: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanVarianceNormalizeLayerParams {
    pub across_channels: bool,
    pub normalize_variance: bool,
    pub epsilon: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct L2NormalizeLayerParams {
    pub epsilon: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrnLayerParams {
    pub alpha: f32,
    pub beta: f32,
    pub local_size: u64,
    pub k: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropLayerParams {
    pub crop_amounts: Vec<BorderAmount>,
    pub offset: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaddingType {
    Constant { value: f32 },
    Reflection,
    Replication,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingLayerParams {
    pub padding_type: Option<PaddingType>,
    pub padding_amounts: Vec<BorderAmount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    #[default]
    NearestNeighbor,
    Bilinear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearUpsampleMode {
    #[default]
    Default,
    AlignCornersTrue,
    AlignCornersFalse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpsampleLayerParams {
    pub scaling_factor: Vec<u64>,
    pub fractional_scaling_factor: Vec<f32>,
    pub mode: InterpolationMode,
    pub linear_upsample_mode: LinearUpsampleMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeBilinearLayerParams {
    pub target_size: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropResizeLayerParams {
    pub target_size: Vec<u64>,
    pub normalized_coordinates: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperation {
    #[default]
    Sqrt,
    Rsqrt,
    Inverse,
    Power,
    Exp,
    Log,
    Abs,
    Threshold,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnaryFunctionLayerParams {
    pub operation: UnaryOperation,
    pub alpha: f32,
    pub epsilon: f32,
    pub shift: f32,
    pub scale: f32,
}

/// Layers whose only parameter is a scalar operand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarAlphaParams {
    pub alpha: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleLayerParams {
    pub shape_scale: Vec<u64>,
    pub scale: WeightParams,
    pub has_bias: bool,
    pub shape_bias: Vec<u64>,
    pub bias: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasLayerParams {
    pub shape: Vec<u64>,
    pub bias: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotProductLayerParams {
    pub cosine_similarity: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceAxis {
    #[default]
    Chw,
    Hw,
    C,
    H,
    W,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceOperation {
    #[default]
    Sum,
    Avg,
    Prod,
    LogSum,
    SumSquare,
    L1,
    L2,
    Max,
    Min,
    ArgMax,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceLayerParams {
    pub mode: ReduceOperation,
    pub epsilon: f32,
    pub axis: ReduceAxis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConstantLayerParams {
    pub shape: Vec<u64>,
    pub data: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReshapeLayerParams {
    pub target_shape: Vec<i64>,
    pub channel_last: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenLayerParams {
    pub channel_last: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermuteLayerParams {
    pub axis: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatLayerParams {
    pub sequence_concat: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitLayerParams {
    pub n_outputs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceRepeatLayerParams {
    pub n_repetitions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReorganizationType {
    #[default]
    SpaceToDepth,
    DepthToSpace,
    PixelShuffle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorganizeDataLayerParams {
    pub mode: ReorganizationType,
    pub block_size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceAxis {
    #[default]
    Channel,
    Height,
    Width,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceLayerParams {
    pub start_index: i64,
    pub end_index: i64,
    pub stride: u64,
    pub axis: SliceAxis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleRecurrentLayerParams {
    pub input_vector_size: u64,
    pub output_vector_size: u64,
    pub activation: ActivationParams,
    pub sequence_output: bool,
    pub has_bias_vector: bool,
    pub weight_matrix: WeightParams,
    pub recursion_matrix: WeightParams,
    pub bias_vector: WeightParams,
    pub reverse_input: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GruLayerParams {
    pub input_vector_size: u64,
    pub output_vector_size: u64,
    pub activations: Vec<ActivationParams>,
    pub sequence_output: bool,
    pub has_bias_vectors: bool,
    pub update_gate_weight_matrix: WeightParams,
    pub reset_gate_weight_matrix: WeightParams,
    pub output_gate_weight_matrix: WeightParams,
    pub update_gate_recursion_matrix: WeightParams,
    pub reset_gate_recursion_matrix: WeightParams,
    pub output_gate_recursion_matrix: WeightParams,
    pub update_gate_bias_vector: WeightParams,
    pub reset_gate_bias_vector: WeightParams,
    pub output_gate_bias_vector: WeightParams,
    pub reverse_input: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmParams {
    pub sequence_output: bool,
    pub has_bias_vectors: bool,
    pub forget_bias: bool,
    pub has_peephole_vectors: bool,
    pub coupled_input_and_forget_gate: bool,
    pub cell_clip_threshold: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmWeightParams {
    pub input_gate_weight_matrix: WeightParams,
    pub forget_gate_weight_matrix: WeightParams,
    pub block_input_weight_matrix: WeightParams,
    pub output_gate_weight_matrix: WeightParams,
    pub input_gate_recursion_matrix: WeightParams,
    pub forget_gate_recursion_matrix: WeightParams,
    pub block_input_recursion_matrix: WeightParams,
    pub output_gate_recursion_matrix: WeightParams,
    pub input_gate_bias_vector: WeightParams,
    pub forget_gate_bias_vector: WeightParams,
    pub block_input_bias_vector: WeightParams,
    pub output_gate_bias_vector: WeightParams,
    pub input_gate_peephole_vector: WeightParams,
    pub forget_gate_peephole_vector: WeightParams,
    pub output_gate_peephole_vector: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniDirectionalLstmLayerParams {
    pub input_vector_size: u64,
    pub output_vector_size: u64,
    pub activations: Vec<ActivationParams>,
    pub params: LstmParams,
    pub weight_params: LstmWeightParams,
    pub reverse_input: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiDirectionalLstmLayerParams {
    pub input_vector_size: u64,
    pub output_vector_size: u64,
    pub activations_forward_lstm: Vec<ActivationParams>,
    pub activations_backward_lstm: Vec<ActivationParams>,
    pub params: LstmParams,
    /// Forward weights first, backward second
    pub weight_params: Vec<LstmWeightParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomLayerParamValue {
    Double(f64),
    String(String),
    Int(i32),
    Long(i64),
    Bool(bool),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomLayerParams {
    pub class_name: String,
    pub weights: Vec<WeightParams>,
    pub parameters: HashMap<String, CustomLayerParamValue>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchLayerParams {
    pub if_branch: SubNetwork,
    pub else_branch: SubNetwork,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopLayerParams {
    pub max_loop_iterations: u64,
    pub condition_var: String,
    pub condition_network: SubNetwork,
    pub body_network: SubNetwork,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeluMode {
    #[default]
    Exact,
    TanhApproximation,
    SigmoidApproximation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeluLayerParams {
    pub mode: GeluMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipLayerParams {
    pub min_val: f32,
    pub max_val: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchedMatMulLayerParams {
    pub transpose_a: bool,
    pub transpose_b: bool,
    pub weight_matrix_first_dimension: u64,
    pub weight_matrix_second_dimension: u64,
    pub has_bias: bool,
    pub weights: WeightParams,
    pub bias: WeightParams,
    pub int8_dynamic_quantize: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixBandPartLayerParams {
    pub num_lower: i64,
    pub num_upper: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangularLayerParams {
    pub k: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransposeLayerParams {
    pub axes: Vec<u64>,
}

/// Layers parameterized by a single (possibly negative) axis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisLayerParams {
    pub axis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesLayerParams {
    pub axes: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqueezeLayerParams {
    pub axes: Vec<i64>,
    pub squeeze_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitNdLayerParams {
    pub axis: i64,
    pub num_splits: u64,
    pub split_sizes: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseLayerParams {
    pub reverse_dim: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseSeqLayerParams {
    pub batch_axis: i64,
    pub sequence_axis: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerParams {
    pub reps: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetShapeParams {
    pub target_shape: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidingWindowsLayerParams {
    pub axis: i64,
    pub window_size: u64,
    pub step: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceStaticLayerParams {
    pub begin_ids: Vec<i64>,
    pub begin_masks: Vec<bool>,
    pub end_ids: Vec<i64>,
    pub end_masks: Vec<bool>,
    pub strides: Vec<i64>,
    pub squeeze_masks: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceDynamicLayerParams {
    pub begin_masks: Vec<bool>,
    pub end_ids: Vec<i64>,
    pub end_masks: Vec<bool>,
    pub strides: Vec<i64>,
    pub squeeze_masks: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantPaddingLayerParams {
    pub value: f32,
    pub pad_amounts: Vec<u64>,
    pub pad_to_given_output_size_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConstantNdLayerParams {
    pub shape: Vec<u64>,
    pub data: WeightParams,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillLayerParams {
    pub value: f32,
    pub target_shape: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeLayerParams {
    pub start_value: f32,
    pub end_value: f32,
    pub step_size: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingNdLayerParams {
    pub vocab_size: u64,
    pub embedding_size: u64,
    pub has_bias: bool,
    pub weights: WeightParams,
    pub bias: WeightParams,
}

/// Shared parameters of the normal, uniform and Bernoulli random layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomLayerParams {
    pub seed: i64,
    pub mean: f32,
    pub std_dev: f32,
    pub min_val: f32,
    pub max_val: f32,
    pub prob: f32,
    pub output_shape: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoricalDistributionLayerParams {
    pub seed: i64,
    pub num_samples: i64,
    pub is_log_probabilities: bool,
    pub eps: f32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceNdParams {
    pub axes: Vec<i64>,
    pub keep_dims: bool,
    pub reduce_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopKLayerParams {
    pub axis: i64,
    pub k: u64,
    pub use_bottom_k: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgReduceLayerParams {
    pub axis: i64,
    pub remove_dim: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerNormalizationLayerParams {
    pub normalized_shape: Vec<i64>,
    pub eps: f32,
    pub gamma: Option<WeightParams>,
    pub beta: Option<WeightParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonMaximumSuppressionLayerParams {
    pub iou_threshold: f32,
    pub score_threshold: f32,
    pub max_boxes: u64,
    pub per_class_suppression: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_params() {
        let layer = NeuralNetworkLayer::new("s", ["x"], ["y"], LayerParams::Softmax);
        assert_eq!(layer.kind(), LayerKind::Softmax);
        assert_eq!(layer.kind().to_string(), "Softmax");
        assert_eq!(LayerKind::from(&LayerParams::LoopBreak), LayerKind::LoopBreak);
    }

    #[test]
    fn test_layer_deserializes_from_json() {
        let json = r#"{
            "name": "relu",
            "input": ["x"],
            "output": ["y"],
            "layer": {"Activation": "ReLU"}
        }"#;
        let layer: NeuralNetworkLayer = serde_json::from_str(json).unwrap();
        assert_eq!(layer.kind(), LayerKind::Activation);
        assert_eq!(layer.layer, LayerParams::Activation(ActivationParams::ReLU));
        assert!(layer.input_tensor.is_empty());
    }
}
