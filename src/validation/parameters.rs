//! Range and set checks for scalar training hyper-parameters.

use std::fmt::Display;

use num_traits::{Float, Num};

use crate::error::{Error, Result};
use crate::model::{DoubleParameter, Int64AllowedValues, Int64Parameter};

/// Fail unless `min <= value <= max`
fn check_in_range<T>(name: &str, value: T, min: T, max: T) -> Result<()>
where
    T: Num + PartialOrd + Copy + Display,
{
    if value < min || value > max {
        return Err(Error::InvalidUpdatableParameters(format!(
            "Specified Default Value ({}) out of Allowed Value Range for '{}'",
            value, name
        )));
    }
    Ok(())
}

fn check_positive<T>(name: &str, value: T) -> Result<()>
where
    T: Num + PartialOrd + Copy,
{
    if value <= T::zero() {
        return Err(Error::InvalidUpdatableParameters(format!(
            "Default Value for {} must be positive.",
            name
        )));
    }
    Ok(())
}

/// Validate an integer parameter's default against its allowed values
pub fn validate_int64_parameter(name: &str, param: &Int64Parameter, should_be_positive: bool) -> Result<()> {
    let value = param.default_value;
    if should_be_positive {
        check_positive(name, value)?;
    }

    match &param.allowed_values {
        Some(Int64AllowedValues::Range { min_value, max_value }) => {
            if should_be_positive && *min_value < 0 {
                return Err(Error::InvalidUpdatableParameters(format!(
                    "Specified minimum value for {} must be positive.",
                    name
                )));
            }
            check_in_range(name, value, *min_value, *max_value)
        }
        Some(Int64AllowedValues::Set(values)) => {
            if values.iter().any(|v| should_be_positive && *v <= 0) {
                return Err(Error::InvalidUpdatableParameters(format!(
                    "Allowed Value Set for {} must contain only positive values.",
                    name
                )));
            }
            if !values.contains(&value) {
                return Err(Error::InvalidUpdatableParameters(format!(
                    "Specified Default Value ({}) out of Allowed Value Set for '{}'",
                    value, name
                )));
            }
            Ok(())
        }
        None => Ok(()),
    }
}

/// Validate a floating point parameter's default against its range
pub fn validate_double_parameter(name: &str, param: &DoubleParameter) -> Result<()> {
    check_finite(name, param.default_value)?;
    if let Some(range) = &param.range {
        if range.min_value > range.max_value {
            return Err(Error::InvalidUpdatableParameters(format!(
                "Allowed Value Range for '{}' has a minimum larger than its maximum.",
                name
            )));
        }
        check_in_range(name, param.default_value, range.min_value, range.max_value)?;
    }
    Ok(())
}

fn check_finite<T: Float>(name: &str, value: T) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidUpdatableParameters(format!(
            "Default Value for '{}' must be a finite number.",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_int_rejects_zero() {
        let err = validate_int64_parameter("epochs", &Int64Parameter::new(0), true).unwrap_err();
        assert_eq!(err.message(), "Default Value for epochs must be positive.");
        assert!(validate_int64_parameter("seed", &Int64Parameter::new(0), false).is_ok());
    }

    #[test]
    fn test_int_range_and_set() {
        let ranged = Int64Parameter::new(10).in_range(1, 5);
        let err = validate_int64_parameter("miniBatchSize", &ranged, true).unwrap_err();
        assert!(err.message().contains("out of Allowed Value Range for 'miniBatchSize'"));

        let set = Int64Parameter::new(4).in_set(vec![2, 4, 8]);
        assert!(validate_int64_parameter("miniBatchSize", &set, true).is_ok());
        let missing = Int64Parameter::new(3).in_set(vec![2, 4, 8]);
        assert!(validate_int64_parameter("miniBatchSize", &missing, true).is_err());
    }

    #[test]
    fn test_double_range() {
        let ok = DoubleParameter::new(0.01).in_range(0.0, 1.0);
        assert!(validate_double_parameter("learningRate", &ok).is_ok());
        let bad = DoubleParameter::new(2.0).in_range(0.0, 1.0);
        assert!(validate_double_parameter("learningRate", &bad).is_err());
        assert!(validate_double_parameter("eps", &DoubleParameter::new(f64::NAN)).is_err());
    }
}
