use strum_macros::{AsRefStr, Display, EnumIter};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, AsRefStr)]
pub enum ResultType {
    InvalidModelParameters,
    UnsupportedFeatureTypeForModelType,
    TooManyFeaturesForModelType,
    TooFewFeaturesForModelType,
    InterfaceFeatureNameMismatch,
    TypeMismatch,
    InvalidModelInterface,
    InvalidUpdatableModelConfiguration,
    InvalidUpdatableModelParameters,
    PotentiallyInvalidNeuralNetworkShapes,
    DeserializationFailed,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid model parameters: {0}")]
    InvalidModelParameters(String),

    #[error("Unsupported feature type: {0}")]
    UnsupportedFeatureType(String),

    #[error("Too many features: {0}")]
    TooManyFeatures(String),

    #[error("Too few features: {0}")]
    TooFewFeatures(String),

    #[error("Interface feature name mismatch: {0}")]
    FeatureNameMismatch(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid model interface: {0}")]
    InvalidInterface(String),

    #[error("Invalid updatable model configuration: {0}")]
    InvalidUpdatableConfiguration(String),

    #[error("Invalid updatable model parameters: {0}")]
    InvalidUpdatableParameters(String),

    #[error("Potentially invalid neural network shapes: {0}")]
    PotentiallyInvalidShapes(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to deserialize model: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an error of the given kind
    pub fn new(kind: ResultType, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ResultType::InvalidModelParameters => Error::InvalidModelParameters(message),
            ResultType::UnsupportedFeatureTypeForModelType => Error::UnsupportedFeatureType(message),
            ResultType::TooManyFeaturesForModelType => Error::TooManyFeatures(message),
            ResultType::TooFewFeaturesForModelType => Error::TooFewFeatures(message),
            ResultType::InterfaceFeatureNameMismatch => Error::FeatureNameMismatch(message),
            ResultType::TypeMismatch => Error::TypeMismatch(message),
            ResultType::InvalidModelInterface => Error::InvalidInterface(message),
            ResultType::InvalidUpdatableModelConfiguration => Error::InvalidUpdatableConfiguration(message),
            ResultType::InvalidUpdatableModelParameters => Error::InvalidUpdatableParameters(message),
            ResultType::PotentiallyInvalidNeuralNetworkShapes => Error::PotentiallyInvalidShapes(message),
            ResultType::DeserializationFailed => {
                Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
            }
        }
    }

    /// The error kind
    pub fn kind(&self) -> ResultType {
        match self {
            Error::InvalidModelParameters(_) => ResultType::InvalidModelParameters,
            Error::UnsupportedFeatureType(_) => ResultType::UnsupportedFeatureTypeForModelType,
            Error::TooManyFeatures(_) => ResultType::TooManyFeaturesForModelType,
            Error::TooFewFeatures(_) => ResultType::TooFewFeaturesForModelType,
            Error::FeatureNameMismatch(_) => ResultType::InterfaceFeatureNameMismatch,
            Error::TypeMismatch(_) => ResultType::TypeMismatch,
            Error::InvalidInterface(_) => ResultType::InvalidModelInterface,
            Error::InvalidUpdatableConfiguration(_) => ResultType::InvalidUpdatableModelConfiguration,
            Error::InvalidUpdatableParameters(_) => ResultType::InvalidUpdatableModelParameters,
            Error::PotentiallyInvalidShapes(_) => ResultType::PotentiallyInvalidNeuralNetworkShapes,
            Error::Io(_) | Error::Json(_) => ResultType::DeserializationFailed,
        }
    }

    /// Human readable diagnostic without the kind prefix
    pub fn message(&self) -> String {
        match self {
            Error::InvalidModelParameters(m)
            | Error::UnsupportedFeatureType(m)
            | Error::TooManyFeatures(m)
            | Error::TooFewFeatures(m)
            | Error::FeatureNameMismatch(m)
            | Error::TypeMismatch(m)
            | Error::InvalidInterface(m)
            | Error::InvalidUpdatableConfiguration(m)
            | Error::InvalidUpdatableParameters(m)
            | Error::PotentiallyInvalidShapes(m) => m.clone(),
            Error::Io(e) => e.to_string(),
            Error::Json(e) => e.to_string(),
        }
    }

    /// Legacy shape inference failures are reported with reduced severity
    pub fn is_warning(&self) -> bool {
        matches!(self, Error::PotentiallyInvalidShapes(_))
    }

    pub(crate) fn params(message: impl Into<String>) -> Self {
        Error::InvalidModelParameters(message.into())
    }

    pub(crate) fn interface(message: impl Into<String>) -> Self {
        Error::InvalidInterface(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_round_trips_through_constructor() {
        for kind in ResultType::iter().filter(|k| *k != ResultType::DeserializationFailed) {
            let err = Error::new(kind, "boom");
            assert_eq!(err.kind(), kind);
            assert_eq!(err.message(), "boom");
        }
    }

    #[test]
    fn test_only_shape_errors_are_warnings() {
        assert!(Error::PotentiallyInvalidShapes("x".into()).is_warning());
        assert!(!Error::params("x").is_warning());
        assert_eq!(ResultType::TypeMismatch.to_string(), "TypeMismatch");
    }
}
