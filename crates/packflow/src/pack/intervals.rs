//! 1D interval sweeps shared by the packing propagators.

use super::rect::IntegerValue;

/// A closed-open interval `[start, end)` tagged with the index of the
/// task or box it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedInterval {
    pub index: usize,
    pub start: IntegerValue,
    pub end: IntegerValue,
}

/// Emits every maximal subset of intervals crossing a common point,
/// left to right. Subsets of size one are suppressed.
///
/// `intervals` is reordered in place (and gains a sentinel slot); pass
/// `already_sorted` when the input is known sorted by start.
pub fn construct_overlapping_sets(
    already_sorted: bool,
    intervals: &mut Vec<IndexedInterval>,
) -> Vec<Vec<usize>> {
    let mut result = Vec::new();
    if intervals.is_empty() {
        return result;
    }
    if already_sorted {
        debug_assert!(intervals.windows(2).all(|w| w[0].start <= w[1].start));
    } else {
        intervals.sort_by_key(|iv| iv.start);
    }
    let mut min_end_in_set = IntegerValue::MAX;
    intervals.push(IndexedInterval {
        index: usize::MAX,
        start: IntegerValue::MAX,
        end: IntegerValue::MAX,
    });
    let size = intervals.len();

    // Line sweep; the subset crossing the line just before `time` lives
    // in intervals[start_index..end_index] at the end of each round.
    let mut start_index = 0;
    let mut end_index = 0;
    while end_index < size {
        let time = intervals[end_index].start;

        // A deletion means the current set is maximal: flush it before
        // shrinking. Without deletion a superset comes later.
        if min_end_in_set <= time {
            let mut set = Vec::new();
            min_end_in_set = IntegerValue::MAX;
            for i in start_index..end_index {
                set.push(intervals[i].index);
                if intervals[i].end <= time {
                    intervals.swap(start_index, i);
                    start_index += 1;
                } else {
                    min_end_in_set = min_end_in_set.min(intervals[i].end);
                }
            }
            if set.len() != 1 {
                result.push(set);
            }
        }

        // Take in everything starting exactly at `time`.
        loop {
            min_end_in_set = min_end_in_set.min(intervals[end_index].end);
            end_index += 1;
            if end_index >= size || intervals[end_index].start != time {
                break;
            }
        }
    }
    result
}

/// Connected components of the interval overlap graph, each listed in
/// sorted order. `intervals` is sorted in place by `(start, end,
/// index)`; the full tie-breaking makes the output deterministic.
pub fn overlapping_interval_components(
    intervals: &mut Vec<IndexedInterval>,
) -> Vec<Vec<usize>> {
    let mut components: Vec<Vec<usize>> = Vec::new();
    if intervals.is_empty() {
        return components;
    }
    if intervals.len() == 1 {
        components.push(vec![intervals[0].index]);
        return components;
    }

    intervals.sort_by_key(|iv| (iv.start, iv.end, iv.index));

    let mut end_max_so_far = intervals[0].end;
    components.push(vec![intervals[0].index]);
    for interval in intervals.iter().skip(1) {
        if interval.start >= end_max_so_far {
            components.push(vec![interval.index]);
        } else {
            components.last_mut().unwrap().push(interval.index);
        }
        end_max_so_far = end_max_so_far.max(interval.end);
    }
    components
}

/// Intervals whose removal disconnects their overlap component.
///
/// Intervals must have positive length. `intervals` is sorted in place
/// by start.
pub fn interval_articulation_points(intervals: &mut Vec<IndexedInterval>) -> Vec<usize> {
    let mut articulation_points: Vec<usize> = Vec::new();
    if intervals.len() < 3 {
        return articulation_points;
    }
    debug_assert!(intervals.iter().all(|iv| iv.start < iv.end));

    intervals.sort_by_key(|iv| iv.start);

    let mut end_max_so_far = intervals[0].end;
    let mut index_of_max = 0usize;
    // Sentinel meaning "no previous max yet".
    let mut prev_end_max = IntegerValue::MIN;
    for i in 1..intervals.len() {
        let interval = intervals[i];
        if interval.start >= end_max_so_far {
            // New connected component.
            end_max_so_far = interval.end;
            index_of_max = i;
            prev_end_max = IntegerValue::MIN;
            continue;
        }
        // Same component: was the previous "max" an articulation point?
        if prev_end_max != IntegerValue::MIN && interval.start >= prev_end_max {
            // Guard against re-inserting the same point.
            if articulation_points.last() != Some(&index_of_max) {
                articulation_points.push(index_of_max);
            }
        }
        if interval.end > end_max_so_far {
            prev_end_max = end_max_so_far;
            end_max_so_far = interval.end;
            index_of_max = i;
        } else if interval.end > prev_end_max {
            prev_end_max = interval.end;
        }
    }
    // Positions to interval indices.
    articulation_points
        .into_iter()
        .map(|pos| intervals[pos].index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(index: usize, start: IntegerValue, end: IntegerValue) -> IndexedInterval {
        IndexedInterval { index, start, end }
    }

    #[test]
    fn overlapping_sets_basic() {
        // [0,4) and [2,6) overlap; [8,9) is alone.
        let mut intervals = vec![iv(0, 0, 4), iv(1, 2, 6), iv(2, 8, 9)];
        let sets = construct_overlapping_sets(false, &mut intervals);
        assert_eq!(sets, vec![vec![0, 1]]);
    }

    #[test]
    fn overlapping_sets_chain_emits_two_maximal_sets() {
        // 0 overlaps 1, 1 overlaps 2, but 0 and 2 do not meet.
        let mut intervals = vec![iv(0, 0, 4), iv(1, 3, 8), iv(2, 6, 10)];
        let sets = construct_overlapping_sets(false, &mut intervals);
        assert_eq!(sets, vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn components_split_on_gaps() {
        let mut intervals = vec![iv(3, 0, 2), iv(1, 1, 3), iv(0, 5, 7), iv(2, 6, 8)];
        let components = overlapping_interval_components(&mut intervals);
        assert_eq!(components, vec![vec![3, 1], vec![0, 2]]);
    }

    #[test]
    fn touching_intervals_are_separate_components() {
        let mut intervals = vec![iv(0, 0, 2), iv(1, 2, 4)];
        let components = overlapping_interval_components(&mut intervals);
        assert_eq!(components, vec![vec![0], vec![1]]);
    }

    #[test]
    fn articulation_point_in_a_chain() {
        // 1 is the only connection between 0 and 2.
        let mut intervals = vec![iv(0, 0, 4), iv(1, 3, 8), iv(2, 7, 10)];
        let points = interval_articulation_points(&mut intervals);
        assert_eq!(points, vec![1]);
    }

    #[test]
    fn no_articulation_point_when_all_share_a_point() {
        let mut intervals = vec![iv(0, 0, 10), iv(1, 1, 9), iv(2, 2, 8)];
        let points = interval_articulation_points(&mut intervals);
        assert!(points.is_empty());
    }
}
