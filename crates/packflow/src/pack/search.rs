//! Monte-Carlo descent over probe windows.
//!
//! Starting from the bounding box of all item ranges, repeatedly shrink
//! one edge of the probe, chosen with probability proportional to
//! `exp(-(delta_energy - delta_area) / T)`: shrinks that lose little
//! energy relative to area move the probe toward an energy conflict.
//! Every window visited along the trajectory is tested; windows whose
//! mandatory energy exceeds their area are reported as conflicts,
//! near-tight windows as candidates.

use std::sync::OnceLock;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::debug;

use super::probing::{EDGES, ProbingRectangle};
use super::rect::{IntegerValue, Rectangle, RectangleInRange};

/// Windows found along one descent trajectory.
#[derive(Clone, Debug, Default)]
pub struct EnergyConflicts {
    /// Probes whose mandatory energy exceeds their area: no placement
    /// of the items is feasible inside them.
    pub conflicts: Vec<Rectangle>,
    /// Tight-but-feasible probes (energy above the candidate factor
    /// times the area), kept as witnesses for further processing.
    pub candidates: Vec<Rectangle>,
}

// exp(-(i - 50) / 5) for i in 0..=100, i.e. the exponent clamped to
// [-10, +10].
fn exp_table() -> &'static [f64; 101] {
    static TABLE: OnceLock<[f64; 101]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0; 101];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = (-(i as f64 - 50.0) / 5.0).exp();
        }
        table
    })
}

/// Runs one randomized shrink descent over `items`.
///
/// `temperature` controls how greedy the edge choice is (lower is
/// greedier); `candidate_energy_usage_factor` (e.g. `0.9`) sets the
/// tightness threshold for reporting near-conflicts. The caller
/// supplies the RNG, so seeded runs are reproducible.
pub fn find_energy_conflicts_mc<R: Rng + ?Sized>(
    items: &[RectangleInRange],
    rng: &mut R,
    temperature: f64,
    candidate_energy_usage_factor: f64,
) -> EnergyConflicts {
    let mut result = EnergyConflicts::default();
    if items.is_empty() {
        return result;
    }
    let mut ranges = ProbingRectangle::new(items);
    let table = exp_table();
    let inv_temp = 1.0 / temperature;

    let mut candidates: Vec<_> = Vec::with_capacity(4);
    let mut energy_deltas: Vec<IntegerValue> = Vec::with_capacity(4);
    let mut weights: Vec<f64> = Vec::with_capacity(4);
    while !ranges.is_minimal() {
        let rect_area = ranges.current_rectangle_area();
        let min_energy = ranges.minimum_energy();
        if min_energy > rect_area {
            result.conflicts.push(ranges.current_rectangle());
        } else if min_energy as f64 > candidate_energy_usage_factor * rect_area as f64 {
            result.candidates.push(ranges.current_rectangle());
        }
        if min_energy == 0 {
            break;
        }
        candidates.clear();
        energy_deltas.clear();

        for &edge in &EDGES {
            if !ranges.can_shrink(edge) {
                continue;
            }
            candidates.push(edge);
            let delta_area = ranges.shrink_delta_area(edge);
            let delta_energy = ranges.shrink_delta_energy(edge);
            energy_deltas.push(delta_energy - delta_area);
        }
        let min_energy_delta = *energy_deltas.iter().min().expect("a shrinkable edge");
        weights.clear();
        for &delta_slack in &energy_deltas {
            let exponent = ((delta_slack - min_energy_delta) * 5) as f64 * inv_temp + 50.0;
            let table_lookup = (exponent as i64).clamp(0, 100) as usize;
            weights.push(table[table_lookup]);
        }
        // Probability proportional to exp(-delta_E / T).
        let pick = WeightedIndex::new(&weights)
            .expect("weights are positive")
            .sample(rng);
        ranges.shrink(candidates[pick]);
    }
    if ranges.minimum_energy() > ranges.current_rectangle_area() {
        result.conflicts.push(ranges.current_rectangle());
    }
    debug!(
        num_conflicts = result.conflicts.len(),
        num_candidates = result.candidates.len(),
        "energy-conflict descent finished"
    );
    result
}
