//! Incremental probe rectangle over a set of translatable items.
//!
//! Purpose
//! - Maintain, under monotone shrinking of a candidate window, the total
//!   mandatory energy (summed minimum overlap of every item with the
//!   window) and the marginal energy lost by the next shrink of each
//!   edge, both in amortized sub-linear time.
//!
//! Model
//! - Four sorted coordinate lists are built once per axis from each
//!   item's anchors: `x_min`, `x_min + x_size`, `x_max - x_size`,
//!   `x_max` (and the y analogues). A shrink moves one edge inward to
//!   the next coordinate where some item can still consume energy, so
//!   between shrinks the window is a valid probe.
//! - Items touching exactly one edge contribute to that edge's
//!   `intersect_length`; items touching two adjacent edges additionally
//!   count in the shared corner; items spanning both opposite edges of
//!   an axis live in a `touching_both` set and are re-evaluated exactly
//!   (their marginal contribution is not linear in the step size).

use std::ops::Range;

use rustc_hash::FxHashSet;

use super::rect::{smallest_1d_intersection, IntegerValue, Rectangle, RectangleInRange};

/// Window edges, also used as indices into the per-edge tallies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Left = 0,
    Bottom = 1,
    Right = 2,
    Top = 3,
}

/// All edges, in the order the search probes them.
pub(crate) const EDGES: [Edge; 4] = [Edge::Left, Edge::Bottom, Edge::Right, Edge::Top];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Corner {
    BottomLeft = 0,
    BottomRight = 1,
    TopLeft = 2,
    TopRight = 3,
}

/// Shrink axis; doubles as index into `touching_both`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    LeftRight = 0,
    BottomTop = 1,
}

struct OrthogonalInfo {
    edge: Edge,
    adjacent_corner: Corner,
}

struct EdgeInfo {
    opposite_edge: Edge,
    shrink_axis: Axis,
    orthogonal_shrink_axis: Axis,
    // Lower-coordinate edge first (Bottom before Top, Left before
    // Right); the touching-both fixup relies on this order.
    orthogonal_edges: [OrthogonalInfo; 2],
}

const fn edge_info(edge: Edge) -> &'static EdgeInfo {
    const LEFT: EdgeInfo = EdgeInfo {
        opposite_edge: Edge::Right,
        shrink_axis: Axis::LeftRight,
        orthogonal_shrink_axis: Axis::BottomTop,
        orthogonal_edges: [
            OrthogonalInfo {
                edge: Edge::Bottom,
                adjacent_corner: Corner::BottomLeft,
            },
            OrthogonalInfo {
                edge: Edge::Top,
                adjacent_corner: Corner::TopLeft,
            },
        ],
    };
    const RIGHT: EdgeInfo = EdgeInfo {
        opposite_edge: Edge::Left,
        shrink_axis: Axis::LeftRight,
        orthogonal_shrink_axis: Axis::BottomTop,
        orthogonal_edges: [
            OrthogonalInfo {
                edge: Edge::Bottom,
                adjacent_corner: Corner::BottomRight,
            },
            OrthogonalInfo {
                edge: Edge::Top,
                adjacent_corner: Corner::TopRight,
            },
        ],
    };
    const BOTTOM: EdgeInfo = EdgeInfo {
        opposite_edge: Edge::Top,
        shrink_axis: Axis::BottomTop,
        orthogonal_shrink_axis: Axis::LeftRight,
        orthogonal_edges: [
            OrthogonalInfo {
                edge: Edge::Left,
                adjacent_corner: Corner::BottomLeft,
            },
            OrthogonalInfo {
                edge: Edge::Right,
                adjacent_corner: Corner::BottomRight,
            },
        ],
    };
    const TOP: EdgeInfo = EdgeInfo {
        opposite_edge: Edge::Bottom,
        shrink_axis: Axis::BottomTop,
        orthogonal_shrink_axis: Axis::LeftRight,
        orthogonal_edges: [
            OrthogonalInfo {
                edge: Edge::Left,
                adjacent_corner: Corner::TopLeft,
            },
            OrthogonalInfo {
                edge: Edge::Right,
                adjacent_corner: Corner::TopRight,
            },
        ],
    };
    match edge {
        Edge::Left => &LEFT,
        Edge::Right => &RIGHT,
        Edge::Bottom => &BOTTOM,
        Edge::Top => &TOP,
    }
}

/// One item anchor on an axis; `index < 0` marks the sentinel
/// coordinates added outside the bounding box (never dereferenced).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct IntervalPoint {
    value: IntegerValue,
    index: isize,
}

/// All anchors sharing one coordinate, as a range into the sorted
/// point vector.
#[derive(Clone, Debug)]
struct PointsForCoordinate {
    coordinate: IntegerValue,
    items: Range<usize>,
}

/// True if the item is forced to overlap `rect` somewhere: `rect`
/// reaches past every extreme placement of the item. Works even where
/// the "inner" rectangle of the range would be malformed.
fn can_consume_energy(rect: &Rectangle, item: &RectangleInRange) -> bool {
    rect.x_max > item.bounding_area.x_max - item.x_size
        && rect.y_max > item.bounding_area.y_max - item.y_size
        && rect.x_min < item.bounding_area.x_min + item.x_size
        && rect.y_min < item.bounding_area.y_min + item.y_size
}

/// Which window edges sit inside the item's bounding range (indexed by
/// [`Edge`]); only meaningful when the item can consume energy.
fn possible_edge_intersection(rect: &Rectangle, item: &RectangleInRange) -> [bool; 4] {
    [
        rect.x_min >= item.bounding_area.x_min,
        rect.y_min >= item.bounding_area.y_min,
        rect.x_max <= item.bounding_area.x_max,
        rect.y_max <= item.bounding_area.y_max,
    ]
}

/// Mandatory 1D overlap of the item with `rect` along the given axis.
fn smallest_1d_for_axis(axis: Axis, item: &RectangleInRange, rect: &Rectangle) -> IntegerValue {
    match axis {
        Axis::LeftRight => smallest_1d_intersection(
            item.bounding_area.x_min,
            item.bounding_area.x_max,
            item.x_size,
            rect.x_min,
            rect.x_max,
        ),
        Axis::BottomTop => smallest_1d_intersection(
            item.bounding_area.y_min,
            item.bounding_area.y_max,
            item.y_size,
            rect.y_min,
            rect.y_max,
        ),
    }
}

/// Stops tracking `edge_to_erase` for an item that no longer touches
/// it: removes its length contribution and flags the corners it was
/// counted in (unless it spanned both orthogonal edges, which is
/// accounted in `touching_both` instead).
fn erase_item(
    intersect_length: &mut [IntegerValue; 4],
    remove_corner: &mut [bool; 4],
    edge_to_erase: Edge,
    item: &RectangleInRange,
    prev_rectangle: &Rectangle,
    touching_before: &[bool; 4],
) {
    let info = edge_info(edge_to_erase);
    intersect_length[edge_to_erase as usize] -=
        smallest_1d_for_axis(info.orthogonal_shrink_axis, item, prev_rectangle);

    if touching_before[info.orthogonal_edges[0].edge as usize]
        && touching_before[info.orthogonal_edges[1].edge as usize]
    {
        return;
    }
    for orthogonal in &info.orthogonal_edges {
        if touching_before[orthogonal.edge as usize] {
            remove_corner[orthogonal.adjacent_corner as usize] = true;
        }
    }
}

fn points_consume_energy(
    items: &[RectangleInRange],
    points: &[IntervalPoint],
    group: Range<usize>,
    rect: &Rectangle,
) -> bool {
    points[group]
        .iter()
        .any(|p| can_consume_energy(rect, &items[p.index as usize]))
}

/// Candidate window over a set of [`RectangleInRange`] items, shrinking
/// one edge at a time while tracking the mandatory energy inside it.
///
/// At rest the window is always a valid probe and
/// [`ProbingRectangle::minimum_energy`] equals the direct sum of every
/// item's mandatory overlap with it (checked by
/// [`ProbingRectangle::validate_invariants`]).
pub struct ProbingRectangle<'a> {
    items: &'a [RectangleInRange],

    points_x: Vec<IntervalPoint>,
    points_y: Vec<IntervalPoint>,
    grouped_x: Vec<PointsForCoordinate>,
    grouped_y: Vec<PointsForCoordinate>,

    // Positions of the four edges in the grouped coordinate lists, and
    // the next coordinate each edge would shrink to.
    indexes: [usize; 4],
    next_indexes: [usize; 4],

    minimum_energy: IntegerValue,
    full_energy: IntegerValue,
    probe_area: IntegerValue,

    // Summed mandatory 1D overlap of the items touching exactly this
    // edge (not its opposite), measured along the edge.
    intersect_length: [IntegerValue; 4],
    // Items touching two adjacent edges, per corner.
    corner_count: [IntegerValue; 4],
    cached_delta_energy: [IntegerValue; 4],
    // Items whose bounding range spans both edges of the axis.
    touching_both: [FxHashSet<usize>; 2],
}

impl<'a> ProbingRectangle<'a> {
    pub fn new(items: &'a [RectangleInRange]) -> Self {
        let mut probe = Self {
            items,
            points_x: Vec::new(),
            points_y: Vec::new(),
            grouped_x: Vec::new(),
            grouped_y: Vec::new(),
            indexes: [0; 4],
            next_indexes: [0; 4],
            minimum_energy: 0,
            full_energy: 0,
            probe_area: 0,
            intersect_length: [0; 4],
            corner_count: [0; 4],
            cached_delta_energy: [0; 4],
            touching_both: [FxHashSet::default(), FxHashSet::default()],
        };
        if items.is_empty() {
            return probe;
        }

        probe.points_x.reserve(items.len() * 4 + 2);
        probe.points_y.reserve(items.len() * 4 + 2);

        let mut bounding_box = Rectangle {
            x_min: IntegerValue::MAX,
            x_max: IntegerValue::MIN,
            y_min: IntegerValue::MAX,
            y_max: IntegerValue::MIN,
        };

        for (i, item) in items.iter().enumerate() {
            let index = i as isize;
            probe.minimum_energy += item.x_size * item.y_size;

            bounding_box.x_min = bounding_box.x_min.min(item.bounding_area.x_min);
            bounding_box.x_max = bounding_box.x_max.max(item.bounding_area.x_max);
            bounding_box.y_min = bounding_box.y_min.min(item.bounding_area.y_min);
            bounding_box.y_max = bounding_box.y_max.max(item.bounding_area.y_max);

            let b = &item.bounding_area;
            for value in [
                b.x_min,
                b.x_min + item.x_size,
                b.x_max - item.x_size,
                b.x_max,
            ] {
                probe.points_x.push(IntervalPoint { value, index });
            }
            for value in [
                b.y_min,
                b.y_min + item.y_size,
                b.y_max - item.y_size,
                b.y_max,
            ] {
                probe.points_y.push(IntervalPoint { value, index });
            }
        }

        probe.full_energy = probe.minimum_energy;

        // Sentinel coordinates outside every bounding range, so reset
        // can delegate all remaining setup to four shrinks.
        probe.points_x.push(IntervalPoint {
            value: bounding_box.x_min - 1,
            index: -1,
        });
        probe.points_x.push(IntervalPoint {
            value: bounding_box.x_max + 1,
            index: -1,
        });
        probe.points_y.push(IntervalPoint {
            value: bounding_box.y_min - 1,
            index: -1,
        });
        probe.points_y.push(IntervalPoint {
            value: bounding_box.y_max + 1,
            index: -1,
        });

        for points in [&mut probe.points_x, &mut probe.points_y] {
            points.sort_by_key(|p| (p.value, p.index));
            points.dedup();
        }
        probe.grouped_x = group_points(&probe.points_x);
        probe.grouped_y = group_points(&probe.points_y);

        probe.reset();
        probe
    }

    /// Restores the probe to the full bounding box of all item ranges.
    pub fn reset(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.indexes[Edge::Left as usize] = 0;
        self.indexes[Edge::Right as usize] = self.grouped_x.len() - 1;
        self.indexes[Edge::Bottom as usize] = 0;
        self.indexes[Edge::Top as usize] = self.grouped_y.len() - 1;

        self.next_indexes[Edge::Left as usize] = 1;
        self.next_indexes[Edge::Right as usize] = self.grouped_x.len() - 2;
        self.next_indexes[Edge::Bottom as usize] = 1;
        self.next_indexes[Edge::Top as usize] = self.grouped_y.len() - 2;

        self.minimum_energy = self.full_energy;
        self.touching_both[0].clear();
        self.touching_both[1].clear();
        self.intersect_length = [0; 4];
        self.corner_count = [0; 4];
        self.cached_delta_energy = [0; 4];

        // Step off the four sentinel coordinates.
        self.shrink(Edge::Left);
        self.shrink(Edge::Bottom);
        self.shrink(Edge::Right);
        self.shrink(Edge::Top);
    }

    pub fn current_rectangle(&self) -> Rectangle {
        Rectangle {
            x_min: self.grouped_x[self.indexes[Edge::Left as usize]].coordinate,
            x_max: self.grouped_x[self.indexes[Edge::Right as usize]].coordinate,
            y_min: self.grouped_y[self.indexes[Edge::Bottom as usize]].coordinate,
            y_max: self.grouped_y[self.indexes[Edge::Top as usize]].coordinate,
        }
    }

    #[inline]
    pub fn current_rectangle_area(&self) -> IntegerValue {
        self.probe_area
    }

    #[inline]
    pub fn minimum_energy(&self) -> IntegerValue {
        self.minimum_energy
    }

    /// Energy lost by shrinking `edge` next (cached).
    #[inline]
    pub fn shrink_delta_energy(&self, edge: Edge) -> IntegerValue {
        self.cached_delta_energy[edge as usize]
    }

    /// Area lost by shrinking `edge` next.
    pub fn shrink_delta_area(&self, edge: Edge) -> IntegerValue {
        let rect = self.current_rectangle();
        let sorted = match edge_info(edge).shrink_axis {
            Axis::LeftRight => &self.grouped_x,
            Axis::BottomTop => &self.grouped_y,
        };
        let coordinate = sorted[self.next_indexes[edge as usize]].coordinate;
        match edge {
            Edge::Left => (coordinate - rect.x_min) * rect.size_y(),
            Edge::Bottom => (coordinate - rect.y_min) * rect.size_x(),
            Edge::Right => (rect.x_max - coordinate) * rect.size_y(),
            Edge::Top => (rect.y_max - coordinate) * rect.size_x(),
        }
    }

    pub fn can_shrink(&self, edge: Edge) -> bool {
        match edge {
            // Shrinking from the left or from the right exhausts the
            // same axis, so the two conditions coincide.
            Edge::Left | Edge::Right => {
                self.next_indexes[Edge::Right as usize] > self.indexes[Edge::Left as usize]
            }
            Edge::Bottom | Edge::Top => {
                self.indexes[Edge::Top as usize] > self.next_indexes[Edge::Bottom as usize]
            }
        }
    }

    /// True when no further shrink is possible on either axis.
    pub fn is_minimal(&self) -> bool {
        !self.can_shrink(Edge::Left) && !self.can_shrink(Edge::Top)
    }

    /// Moves `edge` inward to its next interesting coordinate, updating
    /// the energy, the per-edge tallies, and the cached deltas.
    pub fn shrink(&mut self, edge: Edge) {
        let info = edge_info(edge);
        let e = edge as usize;
        let opp = info.opposite_edge as usize;
        let items = self.items;

        let mut update_next_index = [false; 4];
        update_next_index[e] = true;

        self.minimum_energy -= self.cached_delta_energy[e];

        let prev_rectangle = self.current_rectangle();
        self.indexes[e] = self.next_indexes[e];
        let current_rectangle = self.current_rectangle();

        let step_1d_size = match edge {
            Edge::Left => {
                self.next_indexes[e] = (self.indexes[e] + 1).min(self.indexes[opp]);
                self.next_indexes[opp] = self.indexes[e].max(self.next_indexes[opp]);
                current_rectangle.x_min - prev_rectangle.x_min
            }
            Edge::Bottom => {
                self.next_indexes[e] = (self.indexes[e] + 1).min(self.indexes[opp]);
                self.next_indexes[opp] = self.indexes[e].max(self.next_indexes[opp]);
                current_rectangle.y_min - prev_rectangle.y_min
            }
            Edge::Right => {
                self.next_indexes[e] = self.indexes[e].saturating_sub(1).max(self.indexes[opp]);
                self.next_indexes[opp] = self.indexes[e].min(self.next_indexes[opp]);
                prev_rectangle.x_max - current_rectangle.x_max
            }
            Edge::Top => {
                self.next_indexes[e] = self.indexes[e].saturating_sub(1).max(self.indexes[opp]);
                self.next_indexes[opp] = self.indexes[e].min(self.next_indexes[opp]);
                prev_rectangle.y_max - current_rectangle.y_max
            }
        };

        let crossed_group = match info.shrink_axis {
            Axis::LeftRight => self.grouped_x[self.indexes[e]].items.clone(),
            Axis::BottomTop => self.grouped_y[self.indexes[e]].items.clone(),
        };

        let mut delta_corner_count: [IntegerValue; 4] = [0; 4];
        for point_idx in crossed_group {
            let point = match info.shrink_axis {
                Axis::LeftRight => self.points_x[point_idx],
                Axis::BottomTop => self.points_y[point_idx],
            };
            debug_assert!(point.index >= 0);
            let item_idx = point.index as usize;
            let item = &items[item_idx];
            if !can_consume_energy(&prev_rectangle, item) {
                // Out of the area of interest.
                continue;
            }

            let touching_before = possible_edge_intersection(&prev_rectangle, item);
            let touching_after = if can_consume_energy(&current_rectangle, item) {
                possible_edge_intersection(&current_rectangle, item)
            } else {
                [false; 4]
            };

            let mut remove_corner = [false; 4];

            if touching_after[e] && !touching_before[e] {
                if touching_before[opp] {
                    self.touching_both[info.shrink_axis as usize].insert(item_idx);
                    erase_item(
                        &mut self.intersect_length,
                        &mut remove_corner,
                        info.opposite_edge,
                        item,
                        &prev_rectangle,
                        &touching_before,
                    );
                } else {
                    // The reverse of erase_item.
                    self.intersect_length[e] +=
                        smallest_1d_for_axis(info.orthogonal_shrink_axis, item, &prev_rectangle);
                    // Corner counts, unless it touches both orthogonal
                    // edges.
                    if !touching_before[info.orthogonal_edges[0].edge as usize]
                        || !touching_before[info.orthogonal_edges[1].edge as usize]
                    {
                        for orthogonal in &info.orthogonal_edges {
                            if touching_before[orthogonal.edge as usize] {
                                delta_corner_count[orthogonal.adjacent_corner as usize] += 1;
                            }
                        }
                    }
                }
            }

            for &edge_to_update in &EDGES {
                let u = edge_to_update as usize;
                if !(touching_before[u] && !touching_after[u]) {
                    continue;
                }
                let update_info = edge_info(edge_to_update);
                update_next_index[u] = true;

                if touching_before[update_info.opposite_edge as usize] {
                    self.touching_both[update_info.shrink_axis as usize].remove(&item_idx);
                } else {
                    erase_item(
                        &mut self.intersect_length,
                        &mut remove_corner,
                        edge_to_update,
                        item,
                        &prev_rectangle,
                        &touching_before,
                    );
                }
            }

            for i in 0..4 {
                self.corner_count[i] -= remove_corner[i] as IntegerValue;
            }
        }

        // Items spanning both edges of the shrink axis may enter or
        // leave the orthogonal intersect lengths as the window moves.
        for &item_idx in &self.touching_both[info.shrink_axis as usize] {
            let item = &items[item_idx];
            let touching_corner = match info.shrink_axis {
                Axis::LeftRight => [
                    current_rectangle.y_min >= item.bounding_area.y_min,
                    current_rectangle.y_max <= item.bounding_area.y_max,
                ],
                Axis::BottomTop => [
                    current_rectangle.x_min >= item.bounding_area.x_min,
                    current_rectangle.x_max <= item.bounding_area.x_max,
                ],
            };
            if touching_corner[0] == touching_corner[1] {
                // Touching neither (no length to fix) or both (covered
                // by the touching-both accounting).
                continue;
            }

            let incr = smallest_1d_for_axis(info.shrink_axis, item, &prev_rectangle)
                - smallest_1d_for_axis(info.shrink_axis, item, &current_rectangle);
            for i in 0..2 {
                if touching_corner[i] {
                    self.intersect_length[info.orthogonal_edges[i].edge as usize] -= incr;
                }
            }
        }

        // Corner items shorten the orthogonal edges by the step size.
        for orthogonal in &info.orthogonal_edges {
            self.intersect_length[orthogonal.edge as usize] -=
                self.corner_count[orthogonal.adjacent_corner as usize] * step_1d_size;
        }

        for i in 0..4 {
            self.corner_count[i] += delta_corner_count[i];
        }

        // Advance the affected next indexes past coordinates where no
        // item could consume energy anymore.
        if update_next_index[Edge::Left as usize] {
            while self.next_indexes[Edge::Left as usize] < self.indexes[Edge::Right as usize] {
                let group = self.grouped_x[self.next_indexes[Edge::Left as usize]].items.clone();
                if points_consume_energy(items, &self.points_x, group, &current_rectangle) {
                    break;
                }
                self.next_indexes[Edge::Left as usize] += 1;
            }
        }
        if update_next_index[Edge::Bottom as usize] {
            while self.next_indexes[Edge::Bottom as usize] < self.indexes[Edge::Top as usize] {
                let group = self.grouped_y[self.next_indexes[Edge::Bottom as usize]].items.clone();
                if points_consume_energy(items, &self.points_y, group, &current_rectangle) {
                    break;
                }
                self.next_indexes[Edge::Bottom as usize] += 1;
            }
        }
        if update_next_index[Edge::Right as usize] {
            while self.next_indexes[Edge::Right as usize] > self.indexes[Edge::Left as usize] {
                let group = self.grouped_x[self.next_indexes[Edge::Right as usize]].items.clone();
                if points_consume_energy(items, &self.points_x, group, &current_rectangle) {
                    break;
                }
                self.next_indexes[Edge::Right as usize] -= 1;
            }
        }
        if update_next_index[Edge::Top as usize] {
            while self.next_indexes[Edge::Top as usize] > self.indexes[Edge::Bottom as usize] {
                let group = self.grouped_y[self.next_indexes[Edge::Top as usize]].items.clone();
                if points_consume_energy(items, &self.points_y, group, &current_rectangle) {
                    break;
                }
                self.next_indexes[Edge::Top as usize] -= 1;
            }
        }

        self.probe_area = current_rectangle.area();
        self.cache_shrink_delta_energy(Axis::LeftRight);
        self.cache_shrink_delta_energy(Axis::BottomTop);
    }

    /// Recomputes the cached energy deltas for both edges of one axis.
    /// They share the exact re-evaluation of the touching-both items.
    fn cache_shrink_delta_energy(&mut self, axis: Axis) {
        let current_rectangle = self.current_rectangle();
        let mut next_rectangle_up = current_rectangle;
        let mut next_rectangle_down = current_rectangle;

        let (step_up, step_down, units_up, units_down, up_edge, down_edge) = match axis {
            Axis::LeftRight => {
                if !self.can_shrink(Edge::Left) {
                    self.cached_delta_energy[Edge::Left as usize] = 0;
                    self.cached_delta_energy[Edge::Right as usize] = 0;
                    return;
                }
                next_rectangle_up.x_min =
                    self.grouped_x[self.next_indexes[Edge::Left as usize]].coordinate;
                next_rectangle_down.x_max =
                    self.grouped_x[self.next_indexes[Edge::Right as usize]].coordinate;
                (
                    next_rectangle_up.x_min - current_rectangle.x_min,
                    current_rectangle.x_max - next_rectangle_down.x_max,
                    self.intersect_length[Edge::Left as usize],
                    self.intersect_length[Edge::Right as usize],
                    Edge::Left,
                    Edge::Right,
                )
            }
            Axis::BottomTop => {
                if !self.can_shrink(Edge::Top) {
                    self.cached_delta_energy[Edge::Bottom as usize] = 0;
                    self.cached_delta_energy[Edge::Top as usize] = 0;
                    return;
                }
                next_rectangle_up.y_min =
                    self.grouped_y[self.next_indexes[Edge::Bottom as usize]].coordinate;
                next_rectangle_down.y_max =
                    self.grouped_y[self.next_indexes[Edge::Top as usize]].coordinate;
                (
                    next_rectangle_up.y_min - current_rectangle.y_min,
                    current_rectangle.y_max - next_rectangle_down.y_max,
                    self.intersect_length[Edge::Bottom as usize],
                    self.intersect_length[Edge::Top as usize],
                    Edge::Bottom,
                    Edge::Top,
                )
            }
        };

        let mut delta_energy_up: IntegerValue = 0;
        let mut delta_energy_down: IntegerValue = 0;

        // Iteration order over the hash set does not matter: the sums
        // are commutative.
        for &item_idx in &self.touching_both[axis as usize] {
            let item = &self.items[item_idx];
            let curr_x = smallest_1d_for_axis(Axis::LeftRight, item, &current_rectangle);
            let curr_y = smallest_1d_for_axis(Axis::BottomTop, item, &current_rectangle);
            let curr = curr_x * curr_y;
            delta_energy_up += curr;
            delta_energy_down += curr;

            match axis {
                Axis::LeftRight => {
                    let up_x = smallest_1d_for_axis(Axis::LeftRight, item, &next_rectangle_up);
                    let down_x = smallest_1d_for_axis(Axis::LeftRight, item, &next_rectangle_down);
                    delta_energy_up -= curr_y * up_x;
                    delta_energy_down -= curr_y * down_x;
                }
                Axis::BottomTop => {
                    let up_y = smallest_1d_for_axis(Axis::BottomTop, item, &next_rectangle_up);
                    let down_y = smallest_1d_for_axis(Axis::BottomTop, item, &next_rectangle_down);
                    delta_energy_up -= curr_x * up_y;
                    delta_energy_down -= curr_x * down_y;
                }
            }
        }
        delta_energy_up += units_up * step_up;
        delta_energy_down += units_down * step_down;
        self.cached_delta_energy[up_edge as usize] = delta_energy_up;
        self.cached_delta_energy[down_edge as usize] = delta_energy_down;
    }

    /// Re-derives every tally from first principles and panics on any
    /// mismatch with the incremental state. Intended for tests.
    pub fn validate_invariants(&self) {
        let current_rectangle = self.current_rectangle();

        let mut intersect_length: [IntegerValue; 4] = [0; 4];
        let mut corner_count: [IntegerValue; 4] = [0; 4];
        let mut energy: IntegerValue = 0;

        assert!(self.next_indexes[Edge::Left as usize] <= self.indexes[Edge::Right as usize]);
        assert!(self.next_indexes[Edge::Bottom as usize] <= self.indexes[Edge::Top as usize]);
        assert!(self.next_indexes[Edge::Top as usize] >= self.indexes[Edge::Bottom as usize]);
        assert!(self.next_indexes[Edge::Right as usize] >= self.indexes[Edge::Left as usize]);

        for (item_idx, item) in self.items.iter().enumerate() {
            let (dx, dy) = item.minimum_intersection_sizes(&current_rectangle);
            assert!(dx <= item.x_size);
            assert!(dy <= item.y_size);
            energy += dx * dy;

            let consumes = can_consume_energy(&current_rectangle, item);
            assert_eq!(
                consumes && current_rectangle.area() != 0,
                item.minimum_intersection_area(&current_rectangle) != 0
            );
            let touching = if consumes {
                possible_edge_intersection(&current_rectangle, item)
            } else {
                [false; 4]
            };

            let l = touching[Edge::Left as usize];
            let b = touching[Edge::Bottom as usize];
            let r = touching[Edge::Right as usize];
            let t = touching[Edge::Top as usize];

            assert_eq!(
                l && r,
                self.touching_both[Axis::LeftRight as usize].contains(&item_idx)
            );
            assert_eq!(
                t && b,
                self.touching_both[Axis::BottomTop as usize].contains(&item_idx)
            );

            let along_y = smallest_1d_for_axis(Axis::BottomTop, item, &current_rectangle);
            let along_x = smallest_1d_for_axis(Axis::LeftRight, item, &current_rectangle);
            if l && !r {
                intersect_length[Edge::Left as usize] += along_y;
            }
            if r && !l {
                intersect_length[Edge::Right as usize] += along_y;
            }
            if t && !b {
                intersect_length[Edge::Top as usize] += along_x;
            }
            if b && !t {
                intersect_length[Edge::Bottom as usize] += along_x;
            }

            if (l && r) || (t && b) {
                // Accounted separately in touching_both.
                continue;
            }
            if b && l {
                corner_count[Corner::BottomLeft as usize] += 1;
            }
            if b && r {
                corner_count[Corner::BottomRight as usize] += 1;
            }
            if t && l {
                corner_count[Corner::TopLeft as usize] += 1;
            }
            if t && r {
                corner_count[Corner::TopRight as usize] += 1;
            }
        }

        assert_eq!(energy, self.minimum_energy);
        assert_eq!(intersect_length, self.intersect_length);
        assert_eq!(corner_count, self.corner_count);
    }
}

fn group_points(points: &[IntervalPoint]) -> Vec<PointsForCoordinate> {
    let mut grouped = Vec::with_capacity(points.len());
    let mut i = 0;
    while i < points.len() {
        let begin = i;
        while i < points.len() && points[i].value == points[begin].value {
            i += 1;
        }
        grouped.push(PointsForCoordinate {
            coordinate: points[begin].value,
            items: begin..i,
        });
    }
    grouped
}
