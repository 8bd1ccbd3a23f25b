//! Highest-label push-relabel engine.
//!
//! Purpose
//! - Drive a preflow to a maximum flow: saturate the source, discharge
//!   active nodes highest-first, periodically recompute heights with a
//!   reverse BFS from the sink, then cancel leftover excess back to the
//!   source so conservation holds everywhere except the terminals.
//!
//! Notes
//! - Heights are lower bounds on the residual distance to the sink. The
//!   source is pinned at `n`; a node at height `>= n` can no longer
//!   reach the sink and is left for the cancellation phase.
//! - All buffers are allocated once in [`MaxFlowEngine::new`] against
//!   the graph's reservations and reset by each `solve`.

use tracing::{debug, trace};

use super::graph::{is_direct, opposite, ArcIndex, FlowQuantity, NodeIndex, ResidualGraph};
use super::queue::RestrictedPriorityQueue;

/// Maximum representable flow quantity.
const MAX_FLOW_QUANTITY: FlowQuantity = FlowQuantity::MAX;

/// Outcome of the last call to [`MaxFlowEngine::solve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// `solve` has not run, or the problem was edited since it did.
    NotSolved,
    /// `solve` found an optimal flow.
    Optimal,
    /// The feasible flow exceeds the representable maximum; the reported
    /// flow is capped at `i64::MAX`.
    IntOverflow,
}

/// Push-relabel maximum-flow solver over a borrowed [`ResidualGraph`].
///
/// The engine owns the residual capacities: per direct arc `a`,
/// `residual[a] = capacity(a) - flow(a)` and `residual[opposite(a)] =
/// flow(a)`, so one array carries both capacity and flow for the pair.
pub struct MaxFlowEngine<'a, G: ResidualGraph> {
    graph: &'a G,
    source: NodeIndex,
    sink: NodeIndex,
    status: Status,
    node_excess: Vec<FlowQuantity>,
    // Height ("potential") per node; grows monotonically during a solve
    // except across the cancellation phase.
    node_potential: Vec<usize>,
    residual: Vec<FlowQuantity>,
    // Position into `graph.incident(node)` from which discharge resumes.
    // May be stale after a relabel elsewhere; discharge re-validates.
    first_admissible: Vec<usize>,
    active_by_height: RestrictedPriorityQueue<NodeIndex>,
    in_bfs_queue: Vec<bool>,
    bfs_queue: Vec<NodeIndex>,
}

impl<'a, G: ResidualGraph> MaxFlowEngine<'a, G> {
    /// Creates an engine for `graph`. `source` and `sink` may lie
    /// outside the node range; they are then treated as disconnected.
    pub fn new(graph: &'a G, source: NodeIndex, sink: NodeIndex) -> Self {
        let node_cap = graph.node_capacity().max(source + 1).max(sink + 1);
        let arc_slots = 2 * graph.arc_capacity();
        Self {
            graph,
            source,
            sink,
            status: Status::NotSolved,
            node_excess: vec![0; node_cap],
            node_potential: vec![0; node_cap],
            residual: vec![0; arc_slots],
            first_admissible: vec![0; node_cap],
            active_by_height: RestrictedPriorityQueue::new(),
            in_bfs_queue: Vec::new(),
            bfs_queue: Vec::with_capacity(node_cap),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn source(&self) -> NodeIndex {
        self.source
    }

    pub fn sink(&self) -> NodeIndex {
        self.sink
    }

    /// Net flow into the sink after `solve`.
    pub fn optimal_flow(&self) -> FlowQuantity {
        self.node_excess[self.sink]
    }

    /// Flow on `arc` per the residual encoding: the flow of a direct arc
    /// is the residual of its reverse, the flow of a reverse arc is
    /// negated.
    pub fn flow(&self, arc: ArcIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_arc_valid(arc));
        if is_direct(arc) {
            self.residual[opposite(arc)]
        } else {
            -self.residual[arc]
        }
    }

    /// Capacity of `arc`: the pair sum for a direct arc, zero for a
    /// reverse arc.
    pub fn capacity(&self, arc: ArcIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_arc_valid(arc));
        if is_direct(arc) {
            self.residual[arc] + self.residual[opposite(arc)]
        } else {
            0
        }
    }

    /// Sets the capacity of a direct arc and invalidates the last solve.
    ///
    /// If `new_capacity` is below the current flow on the arc, the arc
    /// is reset to an empty state on both sides. This knowingly breaks
    /// the preflow invariants; it is safe only because `solve` restarts
    /// from scratch, which is the documented contract.
    pub fn set_arc_capacity(&mut self, arc: ArcIndex, new_capacity: FlowQuantity) {
        debug_assert!(new_capacity >= 0);
        debug_assert!(is_direct(arc));
        let free_capacity = self.residual[arc];
        let capacity_delta = new_capacity - self.capacity(arc);
        if capacity_delta == 0 {
            return;
        }
        self.status = Status::NotSolved;
        if free_capacity + capacity_delta >= 0 {
            // Increase, or a decrease no larger than the free capacity.
            self.residual[arc] = free_capacity + capacity_delta;
        } else {
            self.set_capacity_and_clear_flow(arc, new_capacity);
        }
    }

    /// Computes a maximum flow and returns the resulting status.
    pub fn solve(&mut self) -> Status {
        self.status = Status::NotSolved;
        self.initialize_preflow();

        // Source and sink are specified independently of the graph; an
        // out-of-range terminal behaves as a disconnected one.
        let num_nodes = self.graph.num_nodes();
        if self.sink >= num_nodes || self.source >= num_nodes {
            self.status = Status::Optimal;
            return self.status;
        }

        self.refine_with_global_update();

        self.status = Status::Optimal;
        debug_assert!(self.check_result());

        if self.optimal_flow() == MAX_FLOW_QUANTITY && self.augmenting_path_exists() {
            // The true maximum flow is provably larger than what fits.
            self.status = Status::IntOverflow;
        }
        debug!(
            flow = self.optimal_flow(),
            status = ?self.status,
            "max-flow solve finished"
        );
        self.status
    }

    /// Nodes reachable from the source in the residual graph; their
    /// outgoing arcs form a minimum cut.
    pub fn source_side_min_cut(&mut self) -> Vec<NodeIndex> {
        self.compute_reachable_nodes(self.source, false)
    }

    /// Nodes that can reach the sink in the residual graph; their
    /// incoming arcs form a minimum cut. If this is the complement of
    /// the source side, the minimum cut is unique.
    pub fn sink_side_min_cut(&mut self) -> Vec<NodeIndex> {
        self.compute_reachable_nodes(self.sink, true)
    }

    /// True if the residual graph still contains a path from source to
    /// sink with positive capacity.
    pub fn augmenting_path_exists(&self) -> bool {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();
        let mut is_reached = vec![false; num_nodes];
        let mut to_process = Vec::new();

        to_process.push(self.source);
        is_reached[self.source] = true;
        while let Some(node) = to_process.pop() {
            for &arc in graph.incident(node) {
                if self.residual[arc] > 0 {
                    let head = graph.head(arc);
                    if !is_reached[head] {
                        is_reached[head] = true;
                        to_process.push(head);
                    }
                }
            }
        }
        is_reached[self.sink]
    }

    /// Debug-mode verifier: excesses cancel at the terminals and vanish
    /// elsewhere, residuals are non-negative, capacities reconstruct,
    /// and (absent overflow) no augmenting path remains.
    pub(crate) fn check_result(&self) -> bool {
        if self.node_excess[self.source] != -self.node_excess[self.sink] {
            return false;
        }
        for node in 0..self.graph.num_nodes() {
            if node != self.source && node != self.sink && self.node_excess[node] != 0 {
                return false;
            }
        }
        for pair in 0..self.graph.num_arcs() {
            let arc = 2 * pair;
            let direct_capacity = self.residual[arc];
            let opposite_capacity = self.residual[opposite(arc)];
            if direct_capacity < 0 || opposite_capacity < 0 {
                return false;
            }
            // The initial capacity of the direct arc is non-negative.
            if direct_capacity + opposite_capacity < 0 {
                return false;
            }
        }
        if self.optimal_flow() < MAX_FLOW_QUANTITY && self.augmenting_path_exists() {
            return false;
        }
        true
    }

    fn set_capacity_and_clear_flow(&mut self, arc: ArcIndex, capacity: FlowQuantity) {
        self.residual[arc] = capacity;
        self.residual[opposite(arc)] = 0;
    }

    fn is_admissible(&self, tail: NodeIndex, arc: ArcIndex) -> bool {
        self.residual[arc] > 0
            && self.node_potential[tail] == self.node_potential[self.graph.head(arc)] + 1
    }

    fn is_active(&self, node: NodeIndex) -> bool {
        node != self.source && node != self.sink && self.node_excess[node] > 0
    }

    fn push_active_node(&mut self, node: NodeIndex) {
        self.active_by_height.push(node, self.node_potential[node]);
    }

    fn initialize_preflow(&mut self) {
        // Clears any flow left by a previous solve; re-solving is not
        // incremental.
        self.node_excess.fill(0);
        for pair in 0..self.graph.num_arcs() {
            let arc = 2 * pair;
            let capacity = self.capacity(arc);
            self.set_capacity_and_clear_flow(arc, capacity);
        }
        // Heights start at zero except for the source, pinned at n.
        self.node_potential.fill(0);
        self.node_potential[self.source] = self.graph.num_nodes();
        self.first_admissible.fill(0);
    }

    /// Pushes `flow` on `arc` from `tail`, updating both residuals and
    /// both excesses.
    fn push_flow(&mut self, flow: FlowQuantity, tail: NodeIndex, arc: ArcIndex) {
        debug_assert_ne!(flow, 0);
        self.residual[arc] -= flow;
        self.residual[opposite(arc)] += flow;
        debug_assert!(self.residual[arc] >= 0);
        debug_assert!(self.residual[opposite(arc)] >= 0);
        // Excess stays non-negative off-source, except transiently while
        // cancelling flow on a cycle.
        self.node_excess[tail] -= flow;
        self.node_excess[self.graph.head(arc)] += flow;
    }

    /// Saturates the outgoing source arcs whose heads can still reach
    /// the sink. Caps the cumulative out-flow at the representable
    /// maximum so overflow is detectable later. Returns true if any flow
    /// was pushed.
    fn saturate_outgoing_arcs_from_source(&mut self) -> bool {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();

        // Nothing more can be pushed without overflowing a terminal.
        if self.node_excess[self.sink] == MAX_FLOW_QUANTITY {
            return false;
        }
        if self.node_excess[self.source] == -MAX_FLOW_QUANTITY {
            return false;
        }

        let mut flow_pushed = false;
        for &arc in graph.outgoing(self.source) {
            let flow = self.residual[arc];

            // The admissibility condition specialized to the source.
            if flow == 0 || self.node_potential[graph.head(arc)] >= num_nodes {
                continue;
            }

            let current_flow_out_of_source = -self.node_excess[self.source];
            debug_assert!(flow >= 0);
            debug_assert!(current_flow_out_of_source >= 0);
            let capped_flow = MAX_FLOW_QUANTITY - current_flow_out_of_source;
            if capped_flow < flow {
                // Push what fits; since the out-flow was below the cap at
                // entry, a zero capped_flow means something was pushed
                // earlier in this call.
                if capped_flow == 0 {
                    return true;
                }
                self.push_flow(capped_flow, self.source, arc);
                return true;
            }
            self.push_flow(flow, self.source, arc);
            flow_pushed = true;
        }
        debug_assert!(self.node_excess[self.source] <= 0);
        flow_pushed
    }

    /// Recomputes every height as the BFS distance to the sink in the
    /// reverse residual graph, absorbing reachable excess on the way,
    /// and refills the active queue in increasing height order.
    fn global_update(&mut self) {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();
        self.bfs_queue.clear();
        self.in_bfs_queue.clear();
        self.in_bfs_queue.resize(num_nodes, false);
        self.in_bfs_queue[self.sink] = true;

        // All source arcs are saturated (unless overflow forced a cap),
        // so the source cannot be reached from the sink in the reverse
        // residual graph; mark it visited so it is never relabeled.
        self.in_bfs_queue[self.source] = true;
        self.bfs_queue.push(self.sink);

        let mut queue_index = 0;
        while queue_index != self.bfs_queue.len() {
            let node = self.bfs_queue[queue_index];
            queue_index += 1;
            let candidate_distance = self.node_potential[node] + 1;
            for &arc in graph.incident(node) {
                let head = graph.head(arc);

                // Height already final (we are doing a reverse BFS).
                if self.in_bfs_queue[head] {
                    continue;
                }

                let opposite_arc = opposite(arc);
                if self.residual[opposite_arc] > 0 {
                    // If the head carries excess, steal as much of it as
                    // the reverse arc allows and push it along right
                    // away. This short-circuits work the discharge loop
                    // would otherwise redo.
                    if self.node_excess[head] > 0 {
                        let flow = self.node_excess[head].min(self.residual[opposite_arc]);
                        self.push_flow(flow, head, opposite_arc);

                        // Saturated: the arc left the residual graph, so
                        // `head` is not reached through it anymore.
                        if self.residual[opposite_arc] == 0 {
                            continue;
                        }
                    }

                    // The relaxed relabel tolerates stale admissibility
                    // hints, so they need no refresh here.
                    self.node_potential[head] = candidate_distance;
                    self.in_bfs_queue[head] = true;
                    self.bfs_queue.push(head);
                }
            }
        }

        // Unreached nodes can no longer reach the terminals; park them
        // at an unreachable height. This also keeps the anti-overflow
        // loop from resaturating arcs into dead ends forever.
        for node in 0..num_nodes {
            if !self.in_bfs_queue[node] {
                self.node_potential[node] = 2 * num_nodes - 1;
            }
        }

        // Refill the active queue in BFS order so nodes enter by
        // increasing height. bfs_queue[0] is the sink; skip it.
        debug_assert!(self.active_by_height.is_empty());
        for i in 1..self.bfs_queue.len() {
            let node = self.bfs_queue[i];
            if self.node_excess[node] > 0 {
                debug_assert!(self.is_active(node));
                self.push_active_node(node);
            }
        }
    }

    /// Outer optimization loop: saturate the source, then alternate
    /// global updates with highest-label discharges until no active node
    /// was deferred, and finally cancel excess back to the source.
    fn refine_with_global_update(&mut self) {
        let node_cap = self.node_excess.len();
        let mut skip_active_node: Vec<u8> = vec![0; node_cap];

        // Usually one saturation pass suffices; the loop only repeats
        // when more than the representable maximum could leave the
        // source, in which case the cancellation below frees headroom.
        while self.saturate_outgoing_arcs_from_source() {
            loop {
                let mut num_skipped = 0usize;
                skip_active_node.fill(0);
                skip_active_node[self.sink] = 2;
                skip_active_node[self.source] = 2;
                self.global_update();
                while !self.active_by_height.is_empty() {
                    let node = self.active_by_height.pop();
                    if skip_active_node[node] > 1 {
                        if node != self.sink && node != self.source {
                            num_skipped += 1;
                        }
                        continue;
                    }
                    let old_height = self.node_potential[node];
                    self.discharge(node);

                    // A height jump of more than one signals flow about
                    // to ping-pong back the way it came (a freshly
                    // isolated pocket); after two such jumps, defer the
                    // node to the next global update, which repairs the
                    // heights wholesale.
                    if self.node_potential[node] > old_height + 1 {
                        skip_active_node[node] += 1;
                    }
                }
                trace!(num_skipped, "discharge round done");
                if num_skipped == 0 {
                    break;
                }
            }

            // Two-phase scheme: the loop above finds the max-flow value
            // and a min-cut; this returns the stranded excess, which is
            // usually much cheaper.
            self.push_flow_excess_back_to_source();
        }
    }

    /// Drains `node` through admissible arcs, relabeling when stuck,
    /// until its excess vanishes or it can no longer reach the sink.
    fn discharge(&mut self, node: NodeIndex) {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();
        let arcs = graph.incident(node);

        loop {
            debug_assert!(self.is_active(node));
            let mut pos = self.first_admissible[node];
            while pos < arcs.len() {
                let arc = arcs[pos];
                if self.is_admissible(node, arc) {
                    let head = graph.head(arc);
                    if self.node_excess[head] == 0 {
                        // The push below activates it for sure. Pushing
                        // the sink here is harmless: the outer loop
                        // skips it.
                        self.push_active_node(head);
                    }
                    let delta = self.node_excess[node].min(self.residual[arc]);
                    self.push_flow(delta, node, arc);
                    if self.node_excess[node] == 0 {
                        // The arc may still be admissible.
                        self.first_admissible[node] = pos;
                        return;
                    }
                }
                pos += 1;
            }
            self.relabel(node);

            // Out of reach of the sink; the cancellation phase will
            // collect whatever is left here.
            if self.node_potential[node] >= num_nodes {
                break;
            }
        }
    }

    /// Relaxed relabel: raise the height to one above the lowest head
    /// reachable over a positive-residual arc, remembering that arc's
    /// position as the new admissibility hint. Because the hint may have
    /// been stale, the found minimum can equal the current height - 1,
    /// in which case the height does not change.
    fn relabel(&mut self, node: NodeIndex) {
        let graph = self.graph;
        let mut min_height = usize::MAX;
        let mut first_admissible_pos = usize::MAX;
        let arcs = graph.incident(node);
        for (pos, &arc) in arcs.iter().enumerate() {
            if self.residual[arc] > 0 {
                let head_height = self.node_potential[graph.head(arc)];
                if head_height < min_height {
                    min_height = head_height;
                    first_admissible_pos = pos;

                    // An admissible arc at the current height: this is
                    // the true first admissible position, stop here.
                    if min_height + 1 == self.node_potential[node] {
                        break;
                    }
                }
            }
        }
        // An active node always has an incoming flow, hence a positive
        // reverse residual arc.
        debug_assert_ne!(first_admissible_pos, usize::MAX);
        self.node_potential[node] = min_height + 1;
        self.first_admissible[node] = first_admissible_pos;
    }

    /// Cancels flow cycles with a DFS from the source over the direct
    /// arcs carrying positive flow (Tarjan-style, with a branch-index
    /// stack), then returns stranded excess along the DFS tree in
    /// reverse topological order. Afterwards every non-terminal node is
    /// balanced and `excess[source] == -excess[sink]`.
    ///
    /// Heights are meaningless after this runs; callers either stop or
    /// perform a global update next.
    fn push_flow_excess_back_to_source(&mut self) {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();

        // Settled nodes, already emitted to reverse_topological_order
        // (the sink is settled but never emitted).
        let mut stored = vec![false; num_nodes];
        stored[self.sink] = true;

        // Visited-but-unsettled nodes form the current DFS branch.
        let mut visited = vec![false; num_nodes];
        visited[self.sink] = true;

        // Stack of arcs to explore; the current node is the head of the
        // top arc. index_branch holds the arc-stack indices of the
        // current branch from the source to the current node.
        let mut arc_stack: Vec<ArcIndex> = Vec::new();
        let mut index_branch: Vec<usize> = Vec::new();
        let mut reverse_topological_order: Vec<NodeIndex> = Vec::new();

        // Seed with every source arc carrying flow; the source itself is
        // deliberately never emitted.
        for &arc in graph.outgoing(self.source) {
            if self.flow(arc) > 0 {
                arc_stack.push(arc);
            }
        }
        visited[self.source] = true;

        while let Some(&top_arc) = arc_stack.last() {
            let node = graph.head(top_arc);

            // Already visited: every arc below was explored, so this is
            // a backtrack. Settle the node and move on.
            if visited[node] {
                if !stored[node] {
                    stored[node] = true;
                    reverse_topological_order.push(node);
                    debug_assert!(!index_branch.is_empty());
                    index_branch.pop();
                }
                arc_stack.pop();
                continue;
            }

            debug_assert!(!stored[node]);
            debug_assert!(
                index_branch.is_empty() || arc_stack.len() - 1 > *index_branch.last().unwrap()
            );
            visited[node] = true;
            index_branch.push(arc_stack.len() - 1);

            for &arc in graph.outgoing(node) {
                let flow = self.flow(arc);
                let head = graph.head(arc);
                if flow > 0 && !stored[head] {
                    if !visited[head] {
                        arc_stack.push(arc);
                    } else {
                        // A back-edge closed a cycle. Locate where the
                        // cycle starts on the current branch.
                        let mut cycle_begin = index_branch.len();
                        while cycle_begin > 0
                            && graph.head(arc_stack[index_branch[cycle_begin - 1]]) != head
                        {
                            cycle_begin -= 1;
                        }

                        // Maximum cancellable flow and the first branch
                        // index whose arc will saturate.
                        let mut max_flow = flow;
                        let mut first_saturated_index = index_branch.len();
                        for i in (cycle_begin..index_branch.len()).rev() {
                            let arc_on_cycle = arc_stack[index_branch[i]];
                            if self.flow(arc_on_cycle) <= max_flow {
                                max_flow = self.flow(arc_on_cycle);
                                first_saturated_index = i;
                            }
                        }

                        let excess_before = self.node_excess[head];

                        // Cancel the flow around the cycle; nodes past
                        // the saturation point become unvisited so the
                        // DFS can reach them over other routes.
                        self.push_flow(-max_flow, node, arc);
                        for i in (cycle_begin..index_branch.len()).rev() {
                            let arc_on_cycle = arc_stack[index_branch[i]];
                            self.push_flow(-max_flow, graph.tail(arc_on_cycle), arc_on_cycle);
                            if i >= first_saturated_index {
                                debug_assert!(visited[graph.head(arc_on_cycle)]);
                                visited[graph.head(arc_on_cycle)] = false;
                            } else {
                                debug_assert!(self.flow(arc_on_cycle) > 0);
                            }
                        }

                        // Cancelling a cycle moves no net excess.
                        debug_assert_eq!(excess_before, self.node_excess[head]);

                        // Backtrack to just before the first saturated
                        // arc. If the current node survived, keep
                        // scanning its arcs.
                        if first_saturated_index < index_branch.len() {
                            arc_stack.truncate(index_branch[first_saturated_index]);
                            index_branch.truncate(first_saturated_index);
                            break;
                        }
                    }
                }
            }
        }
        debug_assert!(arc_stack.is_empty());
        debug_assert!(index_branch.is_empty());

        // Return the excess in reverse topological order, pushing on the
        // reverse arcs of incoming flow until each node balances.
        for i in 0..reverse_topological_order.len() {
            let node = reverse_topological_order[i];
            if self.node_excess[node] == 0 {
                continue;
            }
            for &arc in graph.incident(node) {
                if is_direct(arc) {
                    continue;
                }
                if self.residual[arc] > 0 {
                    let flow = self.node_excess[node].min(self.residual[arc]);
                    self.push_flow(flow, node, arc);
                    if self.node_excess[node] == 0 {
                        break;
                    }
                }
            }
            debug_assert_eq!(self.node_excess[node], 0);
        }
        debug_assert_eq!(-self.node_excess[self.source], self.node_excess[self.sink]);
    }

    /// BFS over the residual graph (or the reverse residual graph) from
    /// `start`. An out-of-range start reaches only itself: terminals are
    /// specified independently of the graph.
    fn compute_reachable_nodes(&mut self, start: NodeIndex, reverse: bool) -> Vec<NodeIndex> {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();
        if start >= num_nodes {
            return vec![start];
        }
        self.bfs_queue.clear();
        self.in_bfs_queue.clear();
        self.in_bfs_queue.resize(num_nodes, false);

        self.bfs_queue.push(start);
        self.in_bfs_queue[start] = true;
        let mut queue_index = 0;
        while queue_index != self.bfs_queue.len() {
            let node = self.bfs_queue[queue_index];
            queue_index += 1;
            for &arc in graph.incident(node) {
                let head = graph.head(arc);
                if self.in_bfs_queue[head] {
                    continue;
                }
                let residual_arc = if reverse { opposite(arc) } else { arc };
                if self.residual[residual_arc] == 0 {
                    continue;
                }
                self.in_bfs_queue[head] = true;
                self.bfs_queue.push(head);
            }
        }
        self.bfs_queue.clone()
    }
}
