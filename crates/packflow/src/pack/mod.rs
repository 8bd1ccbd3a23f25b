//! 2D rectangle kernels for packing/scheduling propagation.
//!
//! Purpose
//! - Decide whether a set of translatable rectangular items can fit by
//!   hunting for sub-rectangles of the plane whose mandatory energy
//!   (the summed minimum overlap of every item) exceeds their own area.
//!   Such a probe is an infeasibility certificate.
//!
//! Pieces
//! - [`Rectangle`] / [`RectangleInRange`]: axis-aligned integer boxes
//!   and items free to translate within a bounding range.
//! - [`find_partial_rectangle_intersections`]: sweep-line enumeration of
//!   pairwise intersections, reduced to a spanning forest.
//! - [`ProbingRectangle`]: incremental monotone-shrink window tracking
//!   mandatory energy and per-edge marginal energy gains.
//! - [`find_energy_conflicts_mc`]: Monte-Carlo descent over probe
//!   windows emitting conflicts and near-conflicts.
//!
//! Coordinates and energies are `i64`; products of sizes are unchecked,
//! so coordinates beyond roughly `2^31` can overflow energies (same
//! limitation as the reference algorithms this module derives from).

mod intervals;
mod probing;
mod rect;
mod search;
mod sweep;

pub use intervals::{
    construct_overlapping_sets, interval_articulation_points, overlapping_interval_components,
    IndexedInterval,
};
pub use probing::{Edge, ProbingRectangle};
pub use rect::{
    find_empty_spaces, paved_region_difference, smallest_1d_intersection, IntegerValue, Rectangle,
    RectangleInRange,
};
pub use search::{find_energy_conflicts_mc, EnergyConflicts};
pub use sweep::{
    find_partial_rectangle_intersections, find_partial_rectangle_intersections_also_empty,
};

#[cfg(test)]
mod tests;
