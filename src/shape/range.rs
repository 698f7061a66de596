use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use super::ShapeError;
use crate::model::SizeRange;

/// A natural number extended with an unbounded value.
///
/// Arithmetic propagates `Unbounded` and clamps finite subtraction at zero.
/// Operations with no meaningful result (subtracting an unbounded value from
/// a finite one, dividing by zero or by an unbounded value) panic: they can
/// only be reached by a caller bug, never by model contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeValue {
    Finite(usize),
    Unbounded,
}

impl RangeValue {
    pub fn is_unbound(&self) -> bool {
        matches!(self, RangeValue::Unbounded)
    }

    /// The finite value. Panics when unbounded.
    pub fn value(&self) -> usize {
        match self {
            RangeValue::Finite(v) => *v,
            RangeValue::Unbounded => panic!("Attempting to access unbound value of a range value."),
        }
    }

    /// Ceiling division. Unbounded operands or a zero divisor yield `Unbounded`.
    pub fn divide_and_round_up(&self, divisor: usize) -> RangeValue {
        match self {
            RangeValue::Unbounded => RangeValue::Unbounded,
            _ if divisor == 0 => RangeValue::Unbounded,
            RangeValue::Finite(0) => RangeValue::Finite(0),
            RangeValue::Finite(v) => RangeValue::Finite((v - 1) / divisor + 1),
        }
    }

    /// Add a signed offset, clamping at zero.
    pub fn offset(&self, delta: i64) -> RangeValue {
        if delta < 0 {
            *self - delta.unsigned_abs() as usize
        } else {
            *self + delta as usize
        }
    }
}

impl Default for RangeValue {
    fn default() -> Self {
        RangeValue::Unbounded
    }
}

impl From<usize> for RangeValue {
    fn from(v: usize) -> Self {
        RangeValue::Finite(v)
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeValue::Finite(v) => write!(f, "{}", v),
            RangeValue::Unbounded => write!(f, "inf"),
        }
    }
}

impl Ord for RangeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RangeValue::Unbounded, RangeValue::Unbounded) => Ordering::Equal,
            (RangeValue::Unbounded, _) => Ordering::Greater,
            (_, RangeValue::Unbounded) => Ordering::Less,
            (RangeValue::Finite(a), RangeValue::Finite(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for RangeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<usize> for RangeValue {
    fn eq(&self, other: &usize) -> bool {
        matches!(self, RangeValue::Finite(v) if v == other)
    }
}

impl PartialOrd<usize> for RangeValue {
    fn partial_cmp(&self, other: &usize) -> Option<Ordering> {
        Some(self.cmp(&RangeValue::Finite(*other)))
    }
}

impl Add<usize> for RangeValue {
    type Output = RangeValue;

    fn add(self, rhs: usize) -> RangeValue {
        match self {
            RangeValue::Finite(v) => RangeValue::Finite(v.saturating_add(rhs)),
            RangeValue::Unbounded => RangeValue::Unbounded,
        }
    }
}

impl Add for RangeValue {
    type Output = RangeValue;

    fn add(self, rhs: RangeValue) -> RangeValue {
        match rhs {
            RangeValue::Finite(v) => self + v,
            RangeValue::Unbounded => RangeValue::Unbounded,
        }
    }
}

impl Mul<usize> for RangeValue {
    type Output = RangeValue;

    fn mul(self, rhs: usize) -> RangeValue {
        match self {
            RangeValue::Finite(v) => RangeValue::Finite(v.saturating_mul(rhs)),
            RangeValue::Unbounded => RangeValue::Unbounded,
        }
    }
}

impl Mul for RangeValue {
    type Output = RangeValue;

    fn mul(self, rhs: RangeValue) -> RangeValue {
        match rhs {
            RangeValue::Finite(v) => self * v,
            RangeValue::Unbounded => RangeValue::Unbounded,
        }
    }
}

impl Sub<usize> for RangeValue {
    type Output = RangeValue;

    fn sub(self, rhs: usize) -> RangeValue {
        match self {
            RangeValue::Finite(v) => RangeValue::Finite(v.saturating_sub(rhs)),
            RangeValue::Unbounded => RangeValue::Unbounded,
        }
    }
}

impl Sub for RangeValue {
    type Output = RangeValue;

    fn sub(self, rhs: RangeValue) -> RangeValue {
        match (self, rhs) {
            (RangeValue::Finite(_), RangeValue::Unbounded) => {
                panic!("Subtracting unbound range {} from bound range {}", rhs, self)
            }
            (RangeValue::Unbounded, RangeValue::Unbounded) => RangeValue::Unbounded,
            (_, RangeValue::Finite(v)) => self - v,
        }
    }
}

impl Div<usize> for RangeValue {
    type Output = RangeValue;

    fn div(self, rhs: usize) -> RangeValue {
        match self {
            RangeValue::Unbounded => RangeValue::Unbounded,
            RangeValue::Finite(_) if rhs == 0 => panic!("Dividing range {} by 0.", self),
            RangeValue::Finite(v) => RangeValue::Finite(v / rhs),
        }
    }
}

impl Div for RangeValue {
    type Output = RangeValue;

    fn div(self, rhs: RangeValue) -> RangeValue {
        match rhs {
            RangeValue::Unbounded => panic!("Dividing range {} by unbound value.", self),
            RangeValue::Finite(v) => self / v,
        }
    }
}

/// Closed interval `[minimum, maximum]` over [`RangeValue`].
///
/// The minimum is always finite and never exceeds the maximum. Setters only
/// accept values inside the current interval, so ranges can narrow but not
/// be moved arbitrarily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeRange {
    minimum: RangeValue,
    maximum: RangeValue,
}

impl Default for ShapeRange {
    fn default() -> Self {
        Self {
            minimum: RangeValue::Finite(0),
            maximum: RangeValue::Unbounded,
        }
    }
}

impl ShapeRange {
    /// `[0, inf]`
    pub fn new() -> Self {
        Self::default()
    }

    /// `[min, inf]`
    pub fn at_least(min: usize) -> Self {
        Self {
            minimum: RangeValue::Finite(min),
            maximum: RangeValue::Unbounded,
        }
    }

    /// `[min, max]`, panicking when the interval would be empty.
    pub fn bounded(min: usize, max: usize) -> Self {
        Self::bounded_by(RangeValue::Finite(min), RangeValue::Finite(max))
    }

    /// `[min, max]` over range values. Panics on an unbound minimum or an empty interval.
    pub fn bounded_by(min: RangeValue, max: RangeValue) -> Self {
        if min.is_unbound() {
            panic!("Constructing invalid shape range with unbound minimum value.");
        }
        if min > max {
            panic!("Constructing invalid shape range with {}, {}", min, max);
        }
        Self { minimum: min, maximum: max }
    }

    /// `[value, value]`
    pub fn fixed(value: usize) -> Self {
        Self::bounded(value, value)
    }

    pub fn minimum(&self) -> RangeValue {
        self.minimum
    }

    pub fn maximum(&self) -> RangeValue {
        self.maximum
    }

    pub fn minimum_value(&self) -> usize {
        self.minimum.value()
    }

    pub fn is_valid(&self, value: RangeValue) -> bool {
        self.minimum <= value && self.maximum >= value
    }

    pub fn is_unbound(&self) -> bool {
        self.maximum.is_unbound()
    }

    pub fn is_fixed(&self) -> bool {
        !self.maximum.is_unbound() && self.maximum == self.minimum
    }

    pub fn equals(&self, value: usize) -> bool {
        self.minimum == value && self.maximum == value
    }

    pub fn try_set_lower(&mut self, value: RangeValue) -> Result<(), ShapeError> {
        if !self.is_valid(value) {
            return Err(ShapeError(format!("Invalid setLower {} for range: {}", value, self)));
        }
        self.minimum = value;
        Ok(())
    }

    pub fn try_set_upper(&mut self, value: RangeValue) -> Result<(), ShapeError> {
        if !self.is_valid(value) {
            return Err(ShapeError(format!("Invalid setUpper {} for range: {}", value, self)));
        }
        self.maximum = value;
        Ok(())
    }

    pub fn try_set_value(&mut self, value: RangeValue) -> Result<(), ShapeError> {
        if value.is_unbound() {
            return Err(ShapeError("Can't set shape range to have value 'unbound'.".to_string()));
        }
        if !self.is_valid(value) {
            return Err(ShapeError(format!("Invalid setValue {} for range: {}", value, self)));
        }
        self.minimum = value;
        self.maximum = value;
        Ok(())
    }

    /// Raise the lower bound. Panics if the value lies outside the range.
    pub fn set_lower(&mut self, value: RangeValue) {
        if let Err(e) = self.try_set_lower(value) {
            panic!("{}", e);
        }
    }

    /// Lower the upper bound. Panics if the value lies outside the range.
    pub fn set_upper(&mut self, value: RangeValue) {
        if let Err(e) = self.try_set_upper(value) {
            panic!("{}", e);
        }
    }

    /// Pin the range to a single value. Panics if the value lies outside the range.
    pub fn set_value(&mut self, value: RangeValue) {
        if let Err(e) = self.try_set_value(value) {
            panic!("{}", e);
        }
    }

    pub fn try_intersect(&self, other: &ShapeRange) -> Result<ShapeRange, ShapeError> {
        let mut out = ShapeRange::new();
        let (lower, upper) = (self.minimum.max(other.minimum), self.maximum.min(other.maximum));
        let invalid = || ShapeError(format!("Invalid intersection between {} and {}", self, other));
        out.try_set_lower(lower).map_err(|_| invalid())?;
        out.try_set_upper(upper).map_err(|_| invalid())?;
        if out.minimum.is_unbound() {
            return Err(invalid());
        }
        Ok(out)
    }

    /// Pointwise max of minimums and min of maximums. Panics when empty.
    pub fn intersect(&self, other: &ShapeRange) -> ShapeRange {
        match self.try_intersect(other) {
            Ok(range) => range,
            Err(e) => panic!("{}", e),
        }
    }

    /// Smallest range covering both operands, including any gap between them.
    pub fn unify(&self, other: &ShapeRange) -> ShapeRange {
        let mut out = ShapeRange::new();
        out.set_lower(self.minimum.min(other.minimum));
        out.set_upper(self.maximum.max(other.maximum));
        out
    }

    pub fn divide_and_round_up(&self, divisor: usize) -> ShapeRange {
        let mut out = ShapeRange::new();
        out.set_lower(self.minimum.divide_and_round_up(divisor));
        out.set_upper(self.maximum.divide_and_round_up(divisor));
        out
    }

    /// Shift both bounds by a signed amount, clamping at zero.
    pub fn offset(&self, delta: i64) -> ShapeRange {
        let mut out = ShapeRange::new();
        out.set_lower(self.minimum.offset(delta));
        out.set_upper(self.maximum.offset(delta));
        out
    }

    fn from_bounds(lower: RangeValue, upper: RangeValue) -> ShapeRange {
        let mut out = ShapeRange::new();
        out.set_lower(lower);
        out.set_upper(upper);
        out
    }
}

impl From<&SizeRange> for ShapeRange {
    fn from(range: &SizeRange) -> Self {
        let maximum = if range.upper_bound < 0 {
            RangeValue::Unbounded
        } else {
            RangeValue::Finite(range.upper_bound as usize)
        };
        Self {
            minimum: RangeValue::Finite(range.lower_bound as usize),
            maximum,
        }
    }
}

impl fmt::Display for ShapeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.minimum, self.maximum)
    }
}

impl Add<usize> for ShapeRange {
    type Output = ShapeRange;

    fn add(self, rhs: usize) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum + rhs, self.maximum + rhs)
    }
}

impl Sub<usize> for ShapeRange {
    type Output = ShapeRange;

    fn sub(self, rhs: usize) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum - rhs, self.maximum - rhs)
    }
}

impl Mul<usize> for ShapeRange {
    type Output = ShapeRange;

    fn mul(self, rhs: usize) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum * rhs, self.maximum * rhs)
    }
}

impl Div<usize> for ShapeRange {
    type Output = ShapeRange;

    fn div(self, rhs: usize) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum / rhs, self.maximum / rhs)
    }
}

impl Add for ShapeRange {
    type Output = ShapeRange;

    fn add(self, rhs: ShapeRange) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum + rhs.minimum, self.maximum + rhs.maximum)
    }
}

impl Sub for ShapeRange {
    type Output = ShapeRange;

    fn sub(self, rhs: ShapeRange) -> ShapeRange {
        if self.is_unbound() && rhs.is_unbound() {
            return ShapeRange::new();
        }
        ShapeRange::from_bounds(self.minimum - rhs.maximum, self.maximum - rhs.minimum)
    }
}

impl Mul for ShapeRange {
    type Output = ShapeRange;

    fn mul(self, rhs: ShapeRange) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum * rhs.minimum, self.maximum * rhs.maximum)
    }
}

impl Div for ShapeRange {
    type Output = ShapeRange;

    fn div(self, rhs: ShapeRange) -> ShapeRange {
        ShapeRange::from_bounds(self.minimum / rhs.maximum, self.maximum / rhs.minimum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_propagates_through_add_and_mul() {
        let inf = RangeValue::Unbounded;
        assert_eq!(RangeValue::Finite(3) + inf, inf);
        assert_eq!(inf * 0, inf);
        assert_eq!(RangeValue::Finite(3) * RangeValue::Finite(4), RangeValue::Finite(12));
    }

    #[test]
    fn test_finite_subtraction_clamps_at_zero() {
        assert_eq!(RangeValue::Finite(2) - 5, RangeValue::Finite(0));
        assert_eq!(RangeValue::Unbounded - RangeValue::Unbounded, RangeValue::Unbounded);
        assert_eq!(RangeValue::Finite(2).offset(-7), RangeValue::Finite(0));
    }

    #[test]
    #[should_panic(expected = "Subtracting unbound range")]
    fn test_subtracting_unbounded_from_finite_panics() {
        let _ = RangeValue::Finite(2) - RangeValue::Unbounded;
    }

    #[test]
    #[should_panic(expected = "by unbound value")]
    fn test_division_by_unbounded_panics() {
        let _ = RangeValue::Finite(2) / RangeValue::Unbounded;
    }

    #[test]
    fn test_ordering_puts_unbounded_last() {
        assert!(RangeValue::Unbounded > RangeValue::Finite(usize::MAX));
        assert_eq!(RangeValue::Unbounded, RangeValue::Unbounded);
        assert!(RangeValue::Finite(4) < 5);
    }

    #[test]
    fn test_divide_and_round_up() {
        assert_eq!(RangeValue::Finite(7).divide_and_round_up(2), RangeValue::Finite(4));
        assert_eq!(RangeValue::Finite(0).divide_and_round_up(2), RangeValue::Finite(0));
        assert_eq!(RangeValue::Finite(7).divide_and_round_up(0), RangeValue::Unbounded);
    }

    #[test]
    fn test_intersect_takes_inner_bounds() {
        let a = ShapeRange::bounded(2, 10);
        let b = ShapeRange::at_least(5);
        let c = a.intersect(&b);
        assert_eq!(c, ShapeRange::bounded(5, 10));
        assert_eq!(c.to_string(), "[5, 10]");
    }

    #[test]
    fn test_disjoint_intersection_fails() {
        let a = ShapeRange::bounded(1, 2);
        let b = ShapeRange::bounded(4, 8);
        assert!(a.try_intersect(&b).is_err());
    }

    #[test]
    fn test_unify_spans_the_gap() {
        let a = ShapeRange::bounded(1, 2);
        let b = ShapeRange::bounded(4, 8);
        assert_eq!(a.unify(&b), ShapeRange::bounded(1, 8));
    }

    #[test]
    #[should_panic(expected = "Invalid setValue")]
    fn test_set_value_outside_range_panics() {
        let mut r = ShapeRange::bounded(1, 3);
        r.set_value(RangeValue::Finite(4));
    }

    #[test]
    fn test_range_arithmetic() {
        let r = ShapeRange::bounded(2, 6);
        assert_eq!(r + 1, ShapeRange::bounded(3, 7));
        assert_eq!(r * 2, ShapeRange::bounded(4, 12));
        assert_eq!(r - ShapeRange::bounded(1, 2), ShapeRange::bounded(0, 5));
        assert_eq!(r.divide_and_round_up(4), ShapeRange::bounded(1, 2));
        assert!(ShapeRange::fixed(3).is_fixed());
        assert!(ShapeRange::new().is_unbound());
    }

    #[test]
    fn test_negative_upper_size_range_is_unbounded() {
        let r = ShapeRange::from(&SizeRange { lower_bound: 2, upper_bound: -1 });
        assert!(r.is_unbound());
        assert_eq!(r.minimum_value(), 2);
    }
}
