//! Axis-aligned integer rectangles and translatable items.

use smallvec::SmallVec;

/// Coordinate / energy scalar. Products of sizes are unchecked; keep
/// coordinates below ~2^31 if energies must not overflow.
pub type IntegerValue = i64;

/// Closed-open axis-aligned box `[x_min, x_max) x [y_min, y_max)`.
///
/// Zero-size boxes (lines, points) are valid values; entry points state
/// whether they accept them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x_min: IntegerValue,
    pub x_max: IntegerValue,
    pub y_min: IntegerValue,
    pub y_max: IntegerValue,
}

impl Rectangle {
    pub fn new(
        x_min: IntegerValue,
        x_max: IntegerValue,
        y_min: IntegerValue,
        y_max: IntegerValue,
    ) -> Self {
        debug_assert!(x_min <= x_max && y_min <= y_max);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    #[inline]
    pub fn size_x(&self) -> IntegerValue {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn size_y(&self) -> IntegerValue {
        self.y_max - self.y_min
    }

    #[inline]
    pub fn area(&self) -> IntegerValue {
        self.size_x() * self.size_y()
    }

    /// True if the boxes share no interior point; touching boundaries
    /// count as disjoint.
    #[inline]
    pub fn is_disjoint(&self, other: &Rectangle) -> bool {
        self.x_min >= other.x_max
            || other.x_min >= self.x_max
            || self.y_min >= other.y_max
            || other.y_min >= self.y_max
    }

    /// Intersection of the two boxes, or the canonical empty box.
    pub fn intersect(&self, other: &Rectangle) -> Rectangle {
        let x_min = self.x_min.max(other.x_min);
        let y_min = self.y_min.max(other.y_min);
        let x_max = self.x_max.min(other.x_max);
        let y_max = self.y_max.min(other.y_max);
        if x_min > x_max || y_min > y_max {
            Rectangle {
                x_min: 0,
                x_max: 0,
                y_min: 0,
                y_max: 0,
            }
        } else {
            Rectangle {
                x_min,
                x_max,
                y_min,
                y_max,
            }
        }
    }

    #[inline]
    pub fn intersect_area(&self, other: &Rectangle) -> IntegerValue {
        self.intersect(other).area()
    }

    /// Grows in place to the bounding box of both rectangles.
    pub fn grow_to_include(&mut self, other: &Rectangle) {
        self.x_min = self.x_min.min(other.x_min);
        self.x_max = self.x_max.max(other.x_max);
        self.y_min = self.y_min.min(other.y_min);
        self.y_max = self.y_max.max(other.y_max);
    }

    /// Partitions `self \ other` into up to four disjoint boxes, in the
    /// order: left band, right band, bottom, top of the intersection.
    /// If the intersection has zero x-overlap, `self` comes back
    /// unchanged.
    pub fn region_difference(&self, other: &Rectangle) -> SmallVec<[Rectangle; 4]> {
        let intersect = self.intersect(other);
        if intersect.size_x() == 0 {
            return SmallVec::from_slice(&[*self]);
        }

        //-------------------
        //|   |    4    |   |
        //|   |---------|   |
        //| 1 |  other  | 2 |
        //|   |---------|   |
        //|   |    3    |   |
        //-------------------
        let mut result = SmallVec::new();
        if self.x_min < intersect.x_min {
            result.push(Rectangle {
                x_min: self.x_min,
                x_max: intersect.x_min,
                y_min: self.y_min,
                y_max: self.y_max,
            });
        }
        if self.x_max > intersect.x_max {
            result.push(Rectangle {
                x_min: intersect.x_max,
                x_max: self.x_max,
                y_min: self.y_min,
                y_max: self.y_max,
            });
        }
        if self.y_min < intersect.y_min {
            result.push(Rectangle {
                x_min: intersect.x_min,
                x_max: intersect.x_max,
                y_min: self.y_min,
                y_max: intersect.y_min,
            });
        }
        if self.y_max > intersect.y_max {
            result.push(Rectangle {
                x_min: intersect.x_min,
                x_max: intersect.x_max,
                y_min: intersect.y_max,
                y_max: self.y_max,
            });
        }
        result
    }
}

/// Minimum overlap of a size-`size` segment that may slide within
/// `[range_min, range_max]` with the fixed interval
/// `[interval_min, interval_max]`, over all feasible placements.
pub fn smallest_1d_intersection(
    range_min: IntegerValue,
    range_max: IntegerValue,
    size: IntegerValue,
    interval_min: IntegerValue,
    interval_max: IntegerValue,
) -> IntegerValue {
    // Leftmost placement: [range_min, range_min + size].
    let overlap_on_left = (range_min + size).min(interval_max) - range_min.max(interval_min);

    // Rightmost placement: [range_max - size, range_max].
    let overlap_on_right = range_max.min(interval_max) - (range_max - size).max(interval_min);

    overlap_on_left.min(overlap_on_right).max(0)
}

/// An axis-aligned item of fixed size whose bounding box may be placed
/// anywhere inside `bounding_area`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RectangleInRange {
    pub bounding_area: Rectangle,
    pub x_size: IntegerValue,
    pub y_size: IntegerValue,
}

impl RectangleInRange {
    pub fn new(bounding_area: Rectangle, x_size: IntegerValue, y_size: IntegerValue) -> Self {
        debug_assert!(x_size <= bounding_area.size_x());
        debug_assert!(y_size <= bounding_area.size_y());
        Self {
            bounding_area,
            x_size,
            y_size,
        }
    }

    /// Mandatory 1D overlaps `(dx, dy)` of the item with `probe`, over
    /// all feasible placements.
    pub fn minimum_intersection_sizes(&self, probe: &Rectangle) -> (IntegerValue, IntegerValue) {
        let dx = smallest_1d_intersection(
            self.bounding_area.x_min,
            self.bounding_area.x_max,
            self.x_size,
            probe.x_min,
            probe.x_max,
        );
        let dy = smallest_1d_intersection(
            self.bounding_area.y_min,
            self.bounding_area.y_max,
            self.y_size,
            probe.y_min,
            probe.y_max,
        );
        (dx, dy)
    }

    /// Mandatory overlap area of the item with `probe`.
    pub fn minimum_intersection_area(&self, probe: &Rectangle) -> IntegerValue {
        let (dx, dy) = self.minimum_intersection_sizes(probe);
        dx * dy
    }
}

/// Iterated region difference: a disjoint paving of
/// `(union of region) \ (union of area_to_remove)`.
pub fn paved_region_difference(
    mut region: Vec<Rectangle>,
    area_to_remove: &[Rectangle],
) -> Vec<Rectangle> {
    let mut new_area_to_cover = Vec::new();
    for rectangle in area_to_remove {
        new_area_to_cover.clear();
        for r in &region {
            new_area_to_cover.extend(r.region_difference(rectangle));
        }
        std::mem::swap(&mut region, &mut new_area_to_cover);
        if region.is_empty() {
            break;
        }
    }
    region
}

/// Pavement of the part of `bounding_box` not covered by
/// `occupied_rectangles`.
pub fn find_empty_spaces(
    bounding_box: &Rectangle,
    mut occupied_rectangles: Vec<Rectangle>,
) -> Vec<Rectangle> {
    // Not required for correctness, but keeps the paving small.
    occupied_rectangles.sort_by_key(|r| (r.x_min, -r.x_max, r.y_min));
    paved_region_difference(vec![*bounding_box], &occupied_rectangles)
}
