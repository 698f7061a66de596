use bytes::Bytes;
use half::f16;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Storage class of a populated [`WeightParams`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum WeightParamType {
    Float32,
    Float16,
    /// Unsigned quantized bytes with dequantization metadata
    Quint,
    /// More than one representation populated
    Unspecified,
    Empty,
}

/// A weight blob holding at most one of float32 values, packed float16
/// bytes, or quantized raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightParams {
    pub float_value: Vec<f32>,
    pub float16_value: Bytes,
    pub raw_value: Bytes,
    pub quantization: Option<QuantizationParams>,
    pub is_updatable: bool,
}

impl WeightParams {
    pub fn from_f32(values: Vec<f32>) -> Self {
        Self {
            float_value: values,
            ..Default::default()
        }
    }

    pub fn from_f16(values: &[f16]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self {
            float16_value: Bytes::from(bytes),
            ..Default::default()
        }
    }

    pub fn quantized(raw: Vec<u8>, quantization: QuantizationParams) -> Self {
        Self {
            raw_value: Bytes::from(raw),
            quantization: Some(quantization),
            ..Default::default()
        }
    }

    pub fn updatable(mut self) -> Self {
        self.is_updatable = true;
        self
    }

    pub fn has_quantization(&self) -> bool {
        self.quantization.is_some()
    }

    /// Number of packed float16 elements
    pub fn float16_len(&self) -> usize {
        self.float16_value.len() / std::mem::size_of::<f16>()
    }

    /// Decode the packed float16 payload
    pub fn float16_values(&self) -> Vec<f16> {
        self.float16_value
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    pub fn value_type(&self) -> WeightParamType {
        let mut populated = 0;
        let mut kind = WeightParamType::Empty;
        if !self.float_value.is_empty() {
            kind = WeightParamType::Float32;
            populated += 1;
        }
        if !self.float16_value.is_empty() {
            kind = WeightParamType::Float16;
            populated += 1;
        }
        if !self.raw_value.is_empty() && self.has_quantization() {
            kind = WeightParamType::Quint;
            populated += 1;
        }
        if populated > 1 {
            return WeightParamType::Unspecified;
        }
        kind
    }

    /// Element count for float storage, `None` for quantized or mixed storage
    pub fn float_len(&self) -> Option<usize> {
        match self.value_type() {
            WeightParamType::Float32 => Some(self.float_value.len()),
            WeightParamType::Float16 => Some(self.float16_len()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationParams {
    pub number_of_bits: u64,
    pub kind: Option<QuantizationKind>,
}

impl QuantizationParams {
    pub fn linear(number_of_bits: u64, scale: Vec<f32>, bias: Vec<f32>) -> Self {
        Self {
            number_of_bits,
            kind: Some(QuantizationKind::Linear { scale, bias }),
        }
    }

    pub fn lookup_table(number_of_bits: u64, float_value: Vec<f32>) -> Self {
        Self {
            number_of_bits,
            kind: Some(QuantizationKind::LookupTable { float_value }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantizationKind {
    Linear { scale: Vec<f32>, bias: Vec<f32> },
    LookupTable { float_value: Vec<f32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_detects_single_representation() {
        assert_eq!(WeightParams::default().value_type(), WeightParamType::Empty);
        assert_eq!(WeightParams::from_f32(vec![1.0]).value_type(), WeightParamType::Float32);

        let half = WeightParams::from_f16(&[f16::from_f32(1.0), f16::from_f32(2.0)]);
        assert_eq!(half.value_type(), WeightParamType::Float16);
        assert_eq!(half.float16_len(), 2);
        assert_eq!(half.float16_values()[1], f16::from_f32(2.0));
    }

    #[test]
    fn test_mixed_storage_is_unspecified() {
        let mut w = WeightParams::from_f32(vec![1.0]);
        w.float16_value = Bytes::from_static(&[0, 60]);
        assert_eq!(w.value_type(), WeightParamType::Unspecified);
        assert_eq!(w.float_len(), None);
    }

    #[test]
    fn test_raw_bytes_without_quantization_are_empty() {
        let w = WeightParams {
            raw_value: Bytes::from_static(&[1, 2, 3]),
            ..Default::default()
        };
        assert_eq!(w.value_type(), WeightParamType::Empty);
    }
}
