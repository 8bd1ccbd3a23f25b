//! Push-relabel maximum flow with highest-label selection.
//!
//! Purpose
//! - Compute a maximum s-t flow on a directed, capacitated graph and
//!   expose the minimum cut certified by the final residual graph.
//!
//! Design
//! - The solver works on preflows: excess is parked on nodes and pushed
//!   downhill along admissible arcs; heights are periodically recomputed
//!   by a reverse BFS from the sink (global update). A second phase
//!   cancels leftover excess back to the source so the reported flow is
//!   conserved everywhere except at the terminals.
//! - Capacities are `i64`; if the true maximum flow exceeds `i64::MAX`
//!   the solver still terminates and reports [`Status::IntOverflow`].
//!
//! The graph container is abstracted behind [`ResidualGraph`]; the
//! bundled [`ReverseArcGraph`] is a compact CSR implementation with
//! xor-paired direct/reverse arcs.

mod engine;
mod graph;
mod queue;

pub use engine::{MaxFlowEngine, Status};
pub use graph::{ArcIndex, FlowQuantity, NodeIndex, ResidualGraph, ReverseArcGraph};
pub use queue::RestrictedPriorityQueue;
