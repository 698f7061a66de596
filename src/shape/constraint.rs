use std::fmt;

use strum_macros::{Display, EnumIter};

use super::range::{RangeValue, ShapeRange};
use super::ShapeError;
use crate::model::{
    ArrayFeatureType, ArrayShapeFlexibility, ColorSpace, FeatureKind, FeatureType, ImageFeatureType,
    ImageSizeFlexibility,
};

/// One axis of the rank-5 `[S, B, C, H, W]` blob layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    Sequence,
    Batch,
    Channel,
    Height,
    Width,
}

/// Independently tracked ranges for the five axes of one named blob.
///
/// Every update intersects new evidence into the current range, so a
/// constraint only ever narrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeConstraint {
    name: String,
    sequence: ShapeRange,
    batch: ShapeRange,
    channel: ShapeRange,
    height: ShapeRange,
    width: ShapeRange,
}

impl ShapeConstraint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: ShapeRange::new(),
            batch: ShapeRange::new(),
            channel: ShapeRange::new(),
            height: ShapeRange::new(),
            width: ShapeRange::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self, axis: Axis) -> ShapeRange {
        match axis {
            Axis::Sequence => self.sequence,
            Axis::Batch => self.batch,
            Axis::Channel => self.channel,
            Axis::Height => self.height,
            Axis::Width => self.width,
        }
    }

    fn range_mut(&mut self, axis: Axis) -> &mut ShapeRange {
        match axis {
            Axis::Sequence => &mut self.sequence,
            Axis::Batch => &mut self.batch,
            Axis::Channel => &mut self.channel,
            Axis::Height => &mut self.height,
            Axis::Width => &mut self.width,
        }
    }

    pub fn sequence(&self) -> ShapeRange {
        self.sequence
    }

    pub fn batch(&self) -> ShapeRange {
        self.batch
    }

    pub fn channel(&self) -> ShapeRange {
        self.channel
    }

    pub fn height(&self) -> ShapeRange {
        self.height
    }

    pub fn width(&self) -> ShapeRange {
        self.width
    }

    /// Intersect `range` into the given axis
    pub fn update_range(&mut self, axis: Axis, range: &ShapeRange) -> Result<(), ShapeError> {
        let current = self.range(axis);
        let narrowed = current
            .try_intersect(range)
            .map_err(|e| ShapeError(format!("Invalid {} range in blob {}. {}", axis, self.name, e)))?;
        *self.range_mut(axis) = narrowed;
        Ok(())
    }

    /// Pin an axis to one value, which must lie in its current range
    pub fn set_value(&mut self, axis: Axis, value: usize) -> Result<(), ShapeError> {
        self.update_range(axis, &ShapeRange::fixed(value))
    }

    pub fn lower_bound(&mut self, axis: Axis, value: usize) -> Result<(), ShapeError> {
        self.update_range(axis, &ShapeRange::at_least(value))
    }

    /// Cap an axis; an unbounded cap leaves the axis untouched
    pub fn upper_bound(&mut self, axis: Axis, value: RangeValue) -> Result<(), ShapeError> {
        match value {
            RangeValue::Unbounded => Ok(()),
            RangeValue::Finite(v) => self.update_range(axis, &ShapeRange::bounded(0, v)),
        }
    }

    pub fn minimum(&self, axis: Axis) -> usize {
        self.range(axis).minimum_value()
    }

    pub fn has_fixed_chw(&self) -> bool {
        self.channel.is_fixed() && self.height.is_fixed() && self.width.is_fixed()
    }

    /// Intersect all five axes of `other` into this constraint
    pub fn copy_from(&mut self, other: &ShapeConstraint) -> Result<(), ShapeError> {
        self.update_range(Axis::Sequence, &other.sequence)?;
        self.update_range(Axis::Batch, &other.batch)?;
        self.copy_from_no_batch_seq(other)
    }

    /// Intersect only the channel, height and width axes of `other`
    pub fn copy_from_no_batch_seq(&mut self, other: &ShapeConstraint) -> Result<(), ShapeError> {
        self.update_range(Axis::Channel, &other.channel)?;
        self.update_range(Axis::Height, &other.height)?;
        self.update_range(Axis::Width, &other.width)
    }

    /// Narrow this constraint with an interface declaration.
    ///
    /// Panics for features that are neither images nor arrays, and for array
    /// ranks other than 0, 1 or 3. Callers screen declarations before
    /// constraining them.
    pub fn update_constraint(&mut self, feature: &FeatureType) -> Result<(), ShapeError> {
        match &feature.kind {
            FeatureKind::Image(image) => self.update_from_image(image),
            FeatureKind::MultiArray(array) => self.update_from_array(array),
            _ => panic!(
                "Attempting to constrain an input or output feature \"{}\" with an invalid feature type.",
                self.name
            ),
        }
    }

    fn update_from_image(&mut self, image: &ImageFeatureType) -> Result<(), ShapeError> {
        let channels = if image.color_space == ColorSpace::Grayscale { 1 } else { 3 };
        self.set_value(Axis::Channel, channels)?;

        match &image.size_flexibility {
            ImageSizeFlexibility::EnumeratedSizes(sizes) if !sizes.is_empty() => {
                let widths = sizes.iter().map(|s| s.width as usize);
                let heights = sizes.iter().map(|s| s.height as usize);
                self.update_range(Axis::Width, &span(widths))?;
                self.update_range(Axis::Height, &span(heights))
            }
            ImageSizeFlexibility::SizeRange { width_range, height_range } => {
                self.update_range(Axis::Width, &ShapeRange::from(width_range))?;
                self.update_range(Axis::Height, &ShapeRange::from(height_range))
            }
            _ => {
                self.set_value(Axis::Width, image.width.max(0) as usize)?;
                self.set_value(Axis::Height, image.height.max(0) as usize)
            }
        }
    }

    fn update_from_array(&mut self, array: &ArrayFeatureType) -> Result<(), ShapeError> {
        let ranges: Vec<ShapeRange> = match &array.shape_flexibility {
            ArrayShapeFlexibility::EnumeratedShapes(shapes) if !shapes.is_empty() => {
                let rank = shapes.iter().map(Vec::len).max().unwrap_or(0);
                (0..rank)
                    .map(|d| span(shapes.iter().filter_map(|s| s.get(d)).map(|v| (*v).max(0) as usize)))
                    .collect()
            }
            ArrayShapeFlexibility::ShapeRange(axes) if !axes.is_empty() => {
                axes.iter().map(ShapeRange::from).collect()
            }
            _ => array.shape.iter().map(|d| ShapeRange::fixed((*d).max(0) as usize)).collect(),
        };

        match ranges.as_slice() {
            [] => Ok(()),
            [c] => {
                self.update_range(Axis::Channel, c)?;
                self.set_value(Axis::Height, 1)?;
                self.set_value(Axis::Width, 1)
            }
            [c, h, w] => {
                self.update_range(Axis::Channel, c)?;
                self.update_range(Axis::Height, h)?;
                self.update_range(Axis::Width, w)
            }
            _ => panic!(
                "Attempting to constrain an input or output feature \"{}\" with an invalid array shape constraint.",
                self.name
            ),
        }
    }
}

/// `[min, max]` over a non-empty set of sizes
fn span(values: impl Iterator<Item = usize>) -> ShapeRange {
    let (lo, hi) = values.fold((usize::MAX, 0), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return ShapeRange::new();
    }
    ShapeRange::bounded(lo, hi)
}

impl fmt::Display for ShapeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: S {} B {} C {} H {} W {}",
            self.name, self.sequence, self.batch, self.channel, self.height, self.width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageSize, SizeRange};

    #[test]
    fn test_grayscale_image_fixes_chw() {
        let mut feature = FeatureType::image(32, 16);
        if let FeatureKind::Image(image) = &mut feature.kind {
            image.color_space = ColorSpace::Grayscale;
        }
        let mut c = ShapeConstraint::new("img");
        c.update_constraint(&feature).unwrap();
        assert!(c.channel().equals(1));
        assert!(c.width().equals(32));
        assert!(c.height().equals(16));
        assert!(c.has_fixed_chw());
        assert!(c.sequence().is_unbound());
    }

    #[test]
    fn test_enumerated_image_sizes_span_min_to_max() {
        let mut feature = FeatureType::image(10, 10);
        if let FeatureKind::Image(image) = &mut feature.kind {
            image.size_flexibility = ImageSizeFlexibility::EnumeratedSizes(vec![
                ImageSize { width: 10, height: 40 },
                ImageSize { width: 30, height: 20 },
            ]);
        }
        let mut c = ShapeConstraint::new("img");
        c.update_constraint(&feature).unwrap();
        assert_eq!(c.width(), ShapeRange::bounded(10, 30));
        assert_eq!(c.height(), ShapeRange::bounded(20, 40));
        assert!(c.channel().equals(3));
    }

    #[test]
    fn test_vector_array_maps_to_channel() {
        let mut c = ShapeConstraint::new("v");
        c.update_constraint(&FeatureType::multi_array(&[7])).unwrap();
        assert!(c.channel().equals(7));
        assert!(c.height().equals(1));
        assert!(c.width().equals(1));
    }

    #[test]
    fn test_ranged_array_keeps_unbounded_axis() {
        let array = ArrayFeatureType {
            shape: vec![3, 8, 8],
            ..Default::default()
        }
        .with_shape_range(vec![
            SizeRange::new(3, 3),
            SizeRange::new(1, -1),
            SizeRange::new(4, 16),
        ]);
        let mut c = ShapeConstraint::new("a");
        c.update_constraint(&FeatureKind::MultiArray(array).into()).unwrap();
        assert!(c.channel().equals(3));
        assert!(c.height().is_unbound());
        assert_eq!(c.width(), ShapeRange::bounded(4, 16));
    }

    #[test]
    fn test_conflicting_evidence_is_an_error() {
        let mut c = ShapeConstraint::new("x");
        c.set_value(Axis::Channel, 4).unwrap();
        let err = c.set_value(Axis::Channel, 5).unwrap_err();
        assert!(err.0.starts_with("Invalid channel range in blob x."));
    }

    #[test]
    fn test_upper_bound_ignores_unbounded() {
        let mut c = ShapeConstraint::new("x");
        c.upper_bound(Axis::Height, RangeValue::Unbounded).unwrap();
        assert!(c.height().is_unbound());
        c.upper_bound(Axis::Height, RangeValue::Finite(9)).unwrap();
        assert_eq!(c.height(), ShapeRange::bounded(0, 9));
    }

    #[test]
    fn test_copy_from_no_batch_seq_leaves_sequence() {
        let mut src = ShapeConstraint::new("src");
        src.set_value(Axis::Sequence, 2).unwrap();
        src.set_value(Axis::Channel, 6).unwrap();
        let mut dst = ShapeConstraint::new("dst");
        dst.copy_from_no_batch_seq(&src).unwrap();
        assert!(dst.channel().equals(6));
        assert!(dst.sequence().is_unbound());
        dst.copy_from(&src).unwrap();
        assert!(dst.sequence().equals(2));
    }

    #[test]
    #[should_panic(expected = "invalid array shape constraint")]
    fn test_rank_two_array_panics() {
        let mut c = ShapeConstraint::new("m");
        let _ = c.update_constraint(&FeatureType::multi_array(&[2, 2]));
    }
}
