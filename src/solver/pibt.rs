use std::cmp::Reverse;
use std::collections::HashSet;

use tracing::debug;

use crate::common::{Agent, Config};
use crate::distance::DistanceOracle;
use crate::graph::Graph;

/// Why no successor exists under the given constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// Two constraints claim the same vertex.
    ConstraintVertexConflict,
    /// An unconstrained agent has no unoccupied cell in its move set.
    NoMove,
    /// Two agents would cross the same edge in opposite directions.
    SwapConflict,
}

/// Priority-ordered greedy placement: produces at most one conflict-free
/// next configuration for `config` under the partial constraints, or a
/// tagged rejection. Never backtracks; resolving a rejection is the
/// constraint tree's job.
pub fn successor(
    graph: &Graph,
    oracle: &mut DistanceOracle,
    agents: &[Agent],
    config: &Config,
    constraints: &[(usize, usize)],
) -> Result<Config, Reject> {
    let n = agents.len();
    let mut next = vec![0; n];
    let mut placed = vec![false; n];
    let mut occupied = HashSet::with_capacity(n);

    // Constrained agents reserve their cell first.
    for &(agent, vertex) in constraints {
        if !occupied.insert(vertex) {
            debug!("constraints collide on vertex {vertex}");
            return Err(Reject::ConstraintVertexConflict);
        }
        next[agent] = vertex;
        placed[agent] = true;
    }

    // Remaining agents pick greedily, farthest from goal first so they
    // reserve their preferred cell before less pressed agents.
    let mut unconstrained: Vec<usize> = (0..n).filter(|&a| !placed[a]).collect();
    unconstrained
        .sort_by_key(|&a| (Reverse(oracle.distance(graph, config[a], agents[a].goal)), a));

    for a in unconstrained {
        let current = config[a];
        let goal = agents[a].goal;

        if current == goal && !occupied.contains(&current) {
            next[a] = current;
            occupied.insert(current);
            continue;
        }

        let mut best: Option<(usize, usize)> = None; // (distance, vertex)
        for &candidate in std::iter::once(&current).chain(graph.neighbors(current)) {
            if occupied.contains(&candidate) {
                continue;
            }
            let distance = oracle.distance(graph, candidate, goal);
            // Strict comparison keeps first-discovery order on ties.
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, candidate));
            }
        }

        match best {
            Some((_, vertex)) => {
                next[a] = vertex;
                occupied.insert(vertex);
            }
            None => {
                debug!("agent {a} has no unoccupied move from vertex {current}");
                return Err(Reject::NoMove);
            }
        }
    }

    // Vertex exclusivity held throughout; swaps need the pairwise scan.
    for i in 0..n {
        for j in (i + 1)..n {
            if config[i] == next[j] && config[j] == next[i] {
                debug!("agents {i} and {j} swap across {}-{}", config[i], config[j]);
                return Err(Reject::SwapConflict);
            }
        }
    }

    Ok(Config::new(next))
}
