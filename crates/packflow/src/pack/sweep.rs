//! Sweep-line enumeration of pairwise rectangle intersections.
//!
//! Purpose
//! - Produce, in O((n + k) log n), a set of index pairs whose transitive
//!   closure connects every pair of intersecting rectangles: enough arcs
//!   to recover the connected components of the intersection graph
//!   without enumerating all O(n^2) intersecting pairs.
//!
//! The sweep keeps the y-axis cross-section as a set of disjoint
//! sub-intervals, each carrying one contributing rectangle. When a new
//! rectangle overlaps existing sub-intervals, an arc is emitted and the
//! overlap is re-split so that the piece that survives belongs to the
//! rectangle living longest along x (largest `x_max`) — this is what
//! guarantees no future intersection is lost.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use super::rect::{IntegerValue, Rectangle};

/// Sub-interval of the sweep cross-section; keyed by its start in the
/// active map, so only `end` and `index` live in the value.
#[derive(Clone, Copy, Debug)]
struct YInterval {
    end: IntegerValue,
    index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    Begin,
}

/// Union-find used to thin the emitted arcs down to a spanning forest.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(num_nodes: usize) -> Self {
        Self {
            parent: (0..num_nodes).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving.
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges the two classes; false if already joined.
    fn try_union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }
}

/// Keeps the arcs that first connect two components, in input order
/// (Kruskal over an unweighted, pre-sorted arc list).
fn spanning_forest(
    num_nodes: usize,
    arcs: impl IntoIterator<Item = (usize, usize)>,
) -> Vec<(usize, usize)> {
    let mut sets = DisjointSets::new(num_nodes);
    arcs.into_iter()
        .filter(|&(a, b)| sets.try_union(a, b))
        .collect()
}

/// Sweep-line pass over rectangles of positive area.
///
/// The returned pairs form a spanning forest of the pairwise
/// intersection graph: two rectangles intersect some chain of the input
/// iff they are connected through the returned arcs. Rectangles with
/// zero area are rejected in debug builds; use
/// [`find_partial_rectangle_intersections_also_empty`] for those.
pub fn find_partial_rectangle_intersections(
    rectangles: &[Rectangle],
) -> Vec<(usize, usize)> {
    let mut events = Vec::with_capacity(rectangles.len() * 2);
    for (i, r) in rectangles.iter().enumerate() {
        debug_assert!(r.size_x() > 0);
        debug_assert!(r.size_y() > 0);
        events.push((r.x_min, EventKind::Begin, i));
        events.push((r.x_max, EventKind::End, i));
    }
    events.sort();

    let mut interval_set: BTreeMap<IntegerValue, YInterval> = BTreeMap::new();
    let mut arcs: BTreeSet<(usize, usize)> = BTreeSet::new();

    for &(_, kind, index) in &events {
        let r = rectangles[index];
        match kind {
            EventKind::End => {
                // Drop every sub-interval still carried by this
                // rectangle within its y-span.
                let keys: Vec<IntegerValue> = interval_set
                    .range(r.y_min..r.y_max)
                    .filter(|(_, v)| v.index == index)
                    .map(|(&k, _)| k)
                    .collect();
                for k in keys {
                    interval_set.remove(&k);
                }
            }
            EventKind::Begin => {
                insert_and_split(rectangles, &mut interval_set, &mut arcs, index);
            }
        }
    }

    spanning_forest(rectangles.len(), arcs)
}

/// Inserts the y-span of rectangle `cur_index`, emitting an arc for
/// every existing sub-interval it overlaps and re-splitting each overlap
/// into up to three pieces (before, middle, after). The middle piece
/// keeps the index with the larger `x_max` so the longer-lived
/// rectangle stays represented.
fn insert_and_split(
    rectangles: &[Rectangle],
    interval_set: &mut BTreeMap<IntegerValue, YInterval>,
    arcs: &mut BTreeSet<(usize, usize)>,
    cur_index: usize,
) {
    let r = rectangles[cur_index];
    let mut to_insert = YInterval {
        end: r.y_max,
        index: cur_index,
    };
    let mut to_insert_start = r.y_min;

    // Start from the interval just before the insertion point, if any.
    let mut cursor: Option<IntegerValue> = match interval_set.range(..to_insert_start).next_back()
    {
        Some((&k, _)) => Some(k),
        None => interval_set.range(to_insert_start..).next().map(|(&k, _)| k),
    };

    while let Some(key) = cursor {
        let next_key = interval_set
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(&k, _)| k);
        if to_insert_start == to_insert.end {
            break;
        }
        let current = *interval_set.get(&key).expect("cursor key present");
        if current.end <= to_insert_start {
            cursor = next_key;
            continue;
        }
        if key >= to_insert.end {
            break;
        }

        // An intersection. Only report it while the carried index is
        // still the rectangle being inserted; afterwards the pieces
        // belong to rectangles that already met each other.
        if to_insert.index == cur_index {
            let a = to_insert.index.min(current.index);
            let b = to_insert.index.max(current.index);
            arcs.insert((a, b));
        }

        // The union splits into up to three parts:
        //   current     [                  ]
        //   to_insert            [                   ]
        //               | part1  |  part2  | part 3  |
        // where part1 and/or part3 may be empty.
        let first_index = if key < to_insert_start {
            current.index
        } else {
            to_insert.index
        };
        let middle_index =
            if rectangles[to_insert.index].x_max < rectangles[current.index].x_max {
                current.index
            } else {
                to_insert.index
            };
        let last_index = if current.end > to_insert.end {
            current.index
        } else {
            to_insert.index
        };

        let mut points = [key, current.end, to_insert_start, to_insert.end];
        points.sort();

        // The intersection is non-empty, so a middle part exists.
        debug_assert!(points[1] < points[2]);

        if points[0] == points[1] {
            // Both start together: current becomes part 2.
            let entry = interval_set.get_mut(&key).expect("cursor key present");
            entry.end = points[2];
            entry.index = middle_index;
        } else if points[0] == key {
            // Current starts first: current becomes part 1.
            let entry = interval_set.get_mut(&key).expect("cursor key present");
            entry.end = points[1];
            entry.index = first_index;

            // If part 2 and part 3 carry the same index, merge them
            // into the running to_insert instead of inserting part 2.
            if middle_index == last_index {
                to_insert_start = points[1];
                to_insert.end = points[3];
                to_insert.index = last_index;
                cursor = next_key;
                continue;
            }
            let previous = interval_set.insert(
                points[1],
                YInterval {
                    end: points[2],
                    index: middle_index,
                },
            );
            debug_assert!(previous.is_none());
        } else {
            debug_assert_eq!(points[1], key);

            // to_insert starts first: current becomes part 2.
            let entry = interval_set.get_mut(&key).expect("cursor key present");
            entry.end = points[2];
            entry.index = middle_index;

            let previous = interval_set.insert(
                points[0],
                YInterval {
                    end: points[1],
                    index: first_index,
                },
            );
            debug_assert!(previous.is_none());
        }

        // What remains to insert is part 3 (possibly empty).
        to_insert_start = points[2];
        to_insert.end = points[3];
        to_insert.index = last_index;
        cursor = next_key;
    }

    if to_insert_start < to_insert.end {
        let previous = interval_set.insert(to_insert_start, to_insert);
        debug_assert!(previous.is_none());
    }
}

/// Like [`find_partial_rectangle_intersections`], but also accepts
/// zero-area rectangles. Positive-area rectangles go through the sweep;
/// lines and points are matched against the other groups by direct
/// disjointness tests (area x line, area x point, horizontal x
/// vertical). Same-axis line/line and point/point contacts are not
/// reported.
pub fn find_partial_rectangle_intersections_also_empty(
    rectangles: &[Rectangle],
) -> Vec<(usize, usize)> {
    if rectangles
        .iter()
        .all(|r| r.size_x() > 0 && r.size_y() > 0)
    {
        // Nothing degenerate; skip the regrouping entirely.
        return find_partial_rectangle_intersections(rectangles);
    }

    let mut with_area = Vec::new();
    let mut with_area_indexes = Vec::new();
    let mut horizontal_lines = Vec::new();
    let mut horizontal_lines_indexes = Vec::new();
    let mut vertical_lines = Vec::new();
    let mut vertical_lines_indexes = Vec::new();
    let mut points = Vec::new();
    let mut points_indexes = Vec::new();

    for (i, r) in rectangles.iter().enumerate() {
        debug_assert!(r.size_x() >= 0 && r.size_y() >= 0);
        if r.size_x() > 0 && r.size_y() > 0 {
            with_area.push(*r);
            with_area_indexes.push(i);
        } else if r.size_x() > 0 {
            horizontal_lines.push(*r);
            horizontal_lines_indexes.push(i);
        } else if r.size_y() > 0 {
            vertical_lines.push(*r);
            vertical_lines_indexes.push(i);
        } else {
            points.push(*r);
            points_indexes.push(i);
        }
    }

    // Area x area through the sweep, mapped back to input indices.
    let mut arcs: Vec<(usize, usize)> = find_partial_rectangle_intersections(&with_area)
        .into_iter()
        .map(|(a, b)| (with_area_indexes[a], with_area_indexes[b]))
        .collect();

    // Area x degenerate by direct tests.
    for (i, r) in with_area.iter().enumerate() {
        let index = with_area_indexes[i];
        for (j, line) in vertical_lines.iter().enumerate() {
            if !r.is_disjoint(line) {
                arcs.push((index, vertical_lines_indexes[j]));
            }
        }
        for (j, line) in horizontal_lines.iter().enumerate() {
            if !r.is_disjoint(line) {
                arcs.push((index, horizontal_lines_indexes[j]));
            }
        }
        for (j, point) in points.iter().enumerate() {
            if !r.is_disjoint(point) {
                arcs.push((index, points_indexes[j]));
            }
        }
    }

    // Crossing lines.
    for (i, h) in horizontal_lines.iter().enumerate() {
        let index = horizontal_lines_indexes[i];
        for (j, v) in vertical_lines.iter().enumerate() {
            if !h.is_disjoint(v) {
                arcs.push((index, vertical_lines_indexes[j]));
            }
        }
    }

    spanning_forest(rectangles.len(), arcs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanning_forest_drops_redundant_arcs() {
        let arcs = vec![(0, 1), (1, 2), (0, 2), (3, 4)];
        let forest = spanning_forest(5, arcs);
        assert_eq!(forest, vec![(0, 1), (1, 2), (3, 4)]);
    }

    #[test]
    fn two_overlapping_rectangles() {
        let rectangles = vec![Rectangle::new(0, 4, 0, 4), Rectangle::new(2, 6, 2, 6)];
        let arcs = find_partial_rectangle_intersections(&rectangles);
        assert_eq!(arcs, vec![(0, 1)]);
    }

    #[test]
    fn touching_rectangles_emit_nothing() {
        let rectangles = vec![Rectangle::new(0, 4, 0, 4), Rectangle::new(4, 8, 0, 4)];
        let arcs = find_partial_rectangle_intersections(&rectangles);
        assert!(arcs.is_empty());
    }
}
