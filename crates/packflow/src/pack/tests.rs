use super::probing::EDGES;
use super::*;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn brute_force_energy(items: &[RectangleInRange], probe: &Rectangle) -> IntegerValue {
    items
        .iter()
        .map(|item| item.minimum_intersection_area(probe))
        .sum()
}

fn random_items(rng: &mut StdRng, count: usize) -> Vec<RectangleInRange> {
    (0..count)
        .map(|_| {
            let x_min = rng.gen_range(-10..10);
            let width = rng.gen_range(1..12);
            let y_min = rng.gen_range(-10..10);
            let height = rng.gen_range(1..12);
            let bounding = Rectangle::new(x_min, x_min + width, y_min, y_min + height);
            RectangleInRange::new(bounding, rng.gen_range(1..=width), rng.gen_range(1..=height))
        })
        .collect()
}

struct Dsu {
    parent: Vec<usize>,
}

impl Dsu {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }
}

// ---------------------------------------------------------------------
// ProbingRectangle
// ---------------------------------------------------------------------

#[test]
fn probing_starts_from_the_full_bounding_box() {
    let items = vec![
        RectangleInRange::new(Rectangle::new(0, 10, 0, 10), 6, 6),
        RectangleInRange::new(Rectangle::new(0, 10, 0, 10), 6, 6),
    ];
    let probe = ProbingRectangle::new(&items);
    assert_eq!(probe.current_rectangle(), Rectangle::new(0, 10, 0, 10));
    assert_eq!(probe.current_rectangle_area(), 100);
    // Each item must overlap the full box by its own area.
    assert_eq!(probe.minimum_energy(), 72);
    probe.validate_invariants();
}

#[test]
fn probing_tracks_energy_through_random_walks() {
    for seed in 0..30u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(1..8);
        let items = random_items(&mut rng, count);
        let mut probe = ProbingRectangle::new(&items);
        probe.validate_invariants();
        assert_eq!(
            probe.minimum_energy(),
            brute_force_energy(&items, &probe.current_rectangle()),
            "seed {seed}"
        );

        while !probe.is_minimal() {
            let shrinkable: Vec<Edge> = EDGES
                .iter()
                .copied()
                .filter(|&e| probe.can_shrink(e))
                .collect();
            let edge = shrinkable[rng.gen_range(0..shrinkable.len())];
            let predicted_energy = probe.minimum_energy() - probe.shrink_delta_energy(edge);
            let predicted_area = probe.current_rectangle_area() - probe.shrink_delta_area(edge);
            probe.shrink(edge);
            probe.validate_invariants();
            assert_eq!(probe.minimum_energy(), predicted_energy, "seed {seed}");
            assert_eq!(probe.current_rectangle_area(), predicted_area, "seed {seed}");
            assert_eq!(
                probe.minimum_energy(),
                brute_force_energy(&items, &probe.current_rectangle()),
                "seed {seed}"
            );
        }
    }
}

#[test]
fn probing_reset_restores_the_initial_state() {
    let mut rng = StdRng::seed_from_u64(7);
    let items = random_items(&mut rng, 5);
    let mut probe = ProbingRectangle::new(&items);
    let initial_rectangle = probe.current_rectangle();
    let initial_energy = probe.minimum_energy();

    for _ in 0..3 {
        if probe.is_minimal() {
            break;
        }
        let edge = *EDGES.iter().find(|&&e| probe.can_shrink(e)).unwrap();
        probe.shrink(edge);
    }
    probe.reset();
    probe.validate_invariants();
    assert_eq!(probe.current_rectangle(), initial_rectangle);
    assert_eq!(probe.minimum_energy(), initial_energy);
}

#[test]
fn tight_probe_is_a_conflict_certificate() {
    // Two 6x6 items free inside the same 10x10 range: the window
    // {3,7}x{3,7} must absorb 9 from each item but only has area 16.
    let items = vec![
        RectangleInRange::new(Rectangle::new(0, 10, 0, 10), 6, 6),
        RectangleInRange::new(Rectangle::new(0, 10, 0, 10), 6, 6),
    ];
    let loose = Rectangle::new(2, 8, 2, 8);
    assert_eq!(brute_force_energy(&items, &loose), 32);
    assert!(brute_force_energy(&items, &loose) <= loose.area());

    let tight = Rectangle::new(3, 7, 3, 7);
    assert_eq!(brute_force_energy(&items, &tight), 18);
    assert!(brute_force_energy(&items, &tight) > tight.area());
}

// ---------------------------------------------------------------------
// Monte-Carlo conflict search
// ---------------------------------------------------------------------

#[test]
fn search_reports_an_unavoidable_conflict() {
    // Two items pinned to the same 4x4 cell: every probe the descent
    // can visit is in conflict, starting with the bounding box itself.
    let items = vec![
        RectangleInRange::new(Rectangle::new(0, 4, 0, 4), 4, 4),
        RectangleInRange::new(Rectangle::new(0, 4, 0, 4), 4, 4),
    ];
    let mut rng = StdRng::seed_from_u64(1);
    let result = find_energy_conflicts_mc(&items, &mut rng, 1.0, 0.9);
    assert!(!result.conflicts.is_empty());
    for conflict in &result.conflicts {
        assert!(brute_force_energy(&items, conflict) > conflict.area());
    }
}

#[test]
fn search_output_is_sound_for_every_seed() {
    let items = vec![
        RectangleInRange::new(Rectangle::new(0, 10, 0, 10), 6, 6),
        RectangleInRange::new(Rectangle::new(0, 10, 0, 10), 6, 6),
    ];
    for seed in 0..10u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = find_energy_conflicts_mc(&items, &mut rng, 1.0, 0.9);
        for conflict in &result.conflicts {
            assert!(
                brute_force_energy(&items, conflict) > conflict.area(),
                "seed {seed}"
            );
        }
        for candidate in &result.candidates {
            let energy = brute_force_energy(&items, candidate);
            assert!(
                energy as f64 > 0.9 * candidate.area() as f64,
                "seed {seed}"
            );
            assert!(energy <= candidate.area(), "seed {seed}");
        }
    }
}

#[test]
fn search_is_reproducible_for_a_fixed_seed() {
    let mut rng = StdRng::seed_from_u64(3);
    let items = random_items(&mut rng, 6);
    let mut rng_a = StdRng::seed_from_u64(42);
    let mut rng_b = StdRng::seed_from_u64(42);
    let a = find_energy_conflicts_mc(&items, &mut rng_a, 0.5, 0.9);
    let b = find_energy_conflicts_mc(&items, &mut rng_b, 0.5, 0.9);
    assert_eq!(a.conflicts, b.conflicts);
    assert_eq!(a.candidates, b.candidates);
}

#[test]
fn search_on_empty_input_returns_nothing() {
    let mut rng = StdRng::seed_from_u64(0);
    let result = find_energy_conflicts_mc(&[], &mut rng, 1.0, 0.9);
    assert!(result.conflicts.is_empty());
    assert!(result.candidates.is_empty());
}

#[test]
fn search_results_are_sound_on_random_instances() {
    for seed in 0..15u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(1..10);
        let items = random_items(&mut rng, count);
        let result = find_energy_conflicts_mc(&items, &mut rng, 1.0, 0.9);
        for conflict in &result.conflicts {
            assert!(
                brute_force_energy(&items, conflict) > conflict.area(),
                "seed {seed}"
            );
        }
    }
}

// ---------------------------------------------------------------------
// Sweep-line intersections
// ---------------------------------------------------------------------

fn random_rectangles(rng: &mut StdRng, count: usize) -> Vec<Rectangle> {
    (0..count)
        .map(|_| {
            let x_min = rng.gen_range(0..18);
            let y_min = rng.gen_range(0..18);
            Rectangle::new(
                x_min,
                x_min + rng.gen_range(1..6),
                y_min,
                y_min + rng.gen_range(1..6),
            )
        })
        .collect()
}

/// Asserts that `arcs` is a spanning forest of the graph whose edges
/// are given by `connected`.
fn assert_spanning_forest(
    n: usize,
    arcs: &[(usize, usize)],
    connected: impl Fn(usize, usize) -> bool,
) {
    let mut sweep_dsu = Dsu::new(n);
    for &(a, b) in arcs {
        assert!(connected(a, b), "arc ({a}, {b}) joins disjoint rectangles");
        assert!(sweep_dsu.union(a, b), "arc ({a}, {b}) closes a cycle");
    }
    let mut reference_dsu = Dsu::new(n);
    for a in 0..n {
        for b in a + 1..n {
            if connected(a, b) {
                reference_dsu.union(a, b);
            }
        }
    }
    for a in 0..n {
        for b in 0..n {
            assert_eq!(
                sweep_dsu.find(a) == sweep_dsu.find(b),
                reference_dsu.find(a) == reference_dsu.find(b),
                "components differ at ({a}, {b})"
            );
        }
    }
}

#[test]
fn sweep_components_match_brute_force() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(1..25);
        let rectangles = random_rectangles(&mut rng, count);
        let arcs = find_partial_rectangle_intersections(&rectangles);
        assert_spanning_forest(count, &arcs, |a, b| {
            !rectangles[a].is_disjoint(&rectangles[b])
        });
    }
}

#[test]
fn sweep_handles_identical_and_nested_rectangles() {
    let rectangles = vec![
        Rectangle::new(0, 10, 0, 10),
        Rectangle::new(0, 10, 0, 10),
        Rectangle::new(2, 5, 2, 5),
        Rectangle::new(3, 4, 3, 4),
        Rectangle::new(20, 22, 20, 22),
    ];
    let arcs = find_partial_rectangle_intersections(&rectangles);
    assert_spanning_forest(rectangles.len(), &arcs, |a, b| {
        !rectangles[a].is_disjoint(&rectangles[b])
    });
    // First four rectangles form one component, the far one is alone.
    assert_eq!(arcs.len(), 3);
}

/// Which degenerate class a rectangle falls into.
fn is_area(r: &Rectangle) -> bool {
    r.size_x() > 0 && r.size_y() > 0
}
fn is_horizontal(r: &Rectangle) -> bool {
    r.size_x() > 0 && r.size_y() == 0
}
fn is_vertical(r: &Rectangle) -> bool {
    r.size_x() == 0 && r.size_y() > 0
}

/// The pair kinds the degenerate-aware pass promises to connect.
fn reported_pair(a: &Rectangle, b: &Rectangle) -> bool {
    if a.is_disjoint(b) {
        return false;
    }
    is_area(a)
        || is_area(b)
        || (is_horizontal(a) && is_vertical(b))
        || (is_vertical(a) && is_horizontal(b))
}

#[test]
fn degenerate_rectangles_connect_through_lines_and_points() {
    // A square, a vertical line through it and a point on the line: any
    // two arcs covering the three pairings are enough.
    let rectangles = vec![
        Rectangle::new(0, 10, 0, 10),
        Rectangle::new(5, 5, 0, 10),
        Rectangle::new(5, 5, 5, 5),
    ];
    let arcs = find_partial_rectangle_intersections_also_empty(&rectangles);
    assert_eq!(arcs.len(), 2);
    assert_spanning_forest(3, &arcs, |a, b| {
        reported_pair(&rectangles[a], &rectangles[b])
    });
}

#[test]
fn degenerate_sweep_components_match_brute_force() {
    for seed in 0..40u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(1..20);
        let rectangles: Vec<Rectangle> = (0..count)
            .map(|_| {
                let x_min = rng.gen_range(0..15);
                let y_min = rng.gen_range(0..15);
                let (w, h) = match rng.gen_range(0..4) {
                    0 => (rng.gen_range(1..5), rng.gen_range(1..5)),
                    1 => (rng.gen_range(1..5), 0),
                    2 => (0, rng.gen_range(1..5)),
                    _ => (0, 0),
                };
                Rectangle::new(x_min, x_min + w, y_min, y_min + h)
            })
            .collect();
        let arcs = find_partial_rectangle_intersections_also_empty(&rectangles);
        assert_spanning_forest(count, &arcs, |a, b| {
            reported_pair(&rectangles[a], &rectangles[b])
        });
    }
}

// ---------------------------------------------------------------------
// Region difference paving
// ---------------------------------------------------------------------

fn covered_cells(rectangles: &[Rectangle]) -> Vec<(IntegerValue, IntegerValue)> {
    let mut cells = Vec::new();
    for r in rectangles {
        for x in r.x_min..r.x_max {
            for y in r.y_min..r.y_max {
                cells.push((x, y));
            }
        }
    }
    cells.sort_unstable();
    cells
}

#[test]
fn empty_spaces_pave_the_complement_exactly() {
    for seed in 0..25u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let bounding = Rectangle::new(0, 14, 0, 14);
        let count = rng.gen_range(0..8);
        let occupied: Vec<Rectangle> = (0..count)
            .map(|_| {
                let x_min = rng.gen_range(0..12);
                let y_min = rng.gen_range(0..12);
                Rectangle::new(
                    x_min,
                    (x_min + rng.gen_range(1..6)).min(14),
                    y_min,
                    (y_min + rng.gen_range(1..6)).min(14),
                )
            })
            .collect();

        let free = find_empty_spaces(&bounding, occupied.clone());

        // The paving is disjoint, avoids every occupied box, and covers
        // cell-for-cell the complement within the bounding box.
        for i in 0..free.len() {
            for o in &occupied {
                assert!(free[i].is_disjoint(o), "seed {seed}");
            }
            for j in i + 1..free.len() {
                assert!(free[i].is_disjoint(&free[j]), "seed {seed}");
            }
        }
        let mut expected = Vec::new();
        for x in bounding.x_min..bounding.x_max {
            for y in bounding.y_min..bounding.y_max {
                let cell = Rectangle::new(x, x + 1, y, y + 1);
                if occupied.iter().all(|o| cell.is_disjoint(o)) {
                    expected.push((x, y));
                }
            }
        }
        assert_eq!(covered_cells(&free), expected, "seed {seed}");
    }
}

// ---------------------------------------------------------------------
// Interval utilities vs. brute force
// ---------------------------------------------------------------------

#[test]
fn interval_components_match_brute_force() {
    for seed in 0..25u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(1..15);
        let mut intervals: Vec<IndexedInterval> = (0..count)
            .map(|index| {
                let start = rng.gen_range(0..20);
                IndexedInterval {
                    index,
                    start,
                    end: start + rng.gen_range(1..6),
                }
            })
            .collect();
        let reference = intervals.clone();

        let components = overlapping_interval_components(&mut intervals);

        let mut dsu = Dsu::new(count);
        for a in 0..count {
            for b in a + 1..count {
                if reference[a].start < reference[b].end && reference[b].start < reference[a].end {
                    dsu.union(a, b);
                }
            }
        }
        let mut component_of = vec![usize::MAX; count];
        for (c, component) in components.iter().enumerate() {
            for &index in component {
                component_of[index] = c;
            }
        }
        for a in 0..count {
            for b in 0..count {
                assert_eq!(
                    component_of[a] == component_of[b],
                    dsu.find(a) == dsu.find(b),
                    "seed {seed}"
                );
            }
        }
    }
}
