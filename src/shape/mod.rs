//! Shape range arithmetic and the legacy rank-5 shape inference pass.

use thiserror::Error;

pub mod constraint;
pub mod range;
pub mod shaper;

pub use constraint::ShapeConstraint;
pub use range::{RangeValue, ShapeRange};
pub use shaper::NeuralNetworkShaper;

/// Inconsistency found while narrowing shape ranges
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ShapeError(pub String);
