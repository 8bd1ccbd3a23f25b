//! Operations-research kernels: maximum flow and 2D energy probing.
//!
//! Two independent cores:
//! - `flow`: a push-relabel maximum-flow solver with highest-label
//!   selection, periodic global height recomputation, and anti-overflow
//!   handling. A minimum s-t cut falls out of the residual graph.
//! - `pack`: 2D rectangle kernels for packing/scheduling propagation —
//!   mandatory-intersection primitives, a sweep-line pairwise
//!   intersection pass, and a Monte-Carlo search for sub-rectangles
//!   whose mandatory energy exceeds their area.
//!
//! Both cores are single-threaded within one call and allocate their
//! working buffers once, up front. Randomized entry points take the RNG
//! as a parameter so callers control reproducibility.

pub mod flow;
pub mod pack;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::flow::{
        ArcIndex, FlowQuantity, MaxFlowEngine, NodeIndex, ResidualGraph, ReverseArcGraph, Status,
    };
    pub use crate::pack::{
        find_energy_conflicts_mc, find_partial_rectangle_intersections,
        find_partial_rectangle_intersections_also_empty, EnergyConflicts, IntegerValue,
        ProbingRectangle, Rectangle, RectangleInRange,
    };
}
