use std::cmp::Reverse;
use std::collections::VecDeque;

use tracing::debug;

use super::lowlevel::ConstraintTree;
use crate::common::{Agent, Config};
use crate::distance::DistanceOracle;
use crate::graph::Graph;

/// One discovered joint configuration together with its low-level search
/// state. Owned by the solver's node arena; `id` equals the arena index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighLevelNode {
    pub id: usize,
    pub config: Config,
    /// Priority order used for constraint-tree depth assignment and by the
    /// successor generator. Fixed at construction.
    pub order: Vec<usize>,
    pub tree: ConstraintTree,
    /// FIFO of tree indices not yet selected, seeded with the root, so
    /// shallower constraints are tried before deeper ones.
    pub queue: VecDeque<usize>,
    pub parent: Option<usize>,
}

impl HighLevelNode {
    pub(crate) fn new(
        id: usize,
        config: Config,
        order: Vec<usize>,
        parent: Option<usize>,
        root_constraint_id: usize,
    ) -> Self {
        let tree = ConstraintTree::new(root_constraint_id);
        let mut queue = VecDeque::new();
        queue.push_back(tree.root());
        debug!("high level node {id} at {config:?}, order {order:?}");
        HighLevelNode {
            id,
            config,
            order,
            tree,
            queue,
            parent,
        }
    }
}

/// Priority order for the start configuration: descending distance from
/// start to goal, ties by agent id.
pub(crate) fn initial_order(
    agents: &[Agent],
    graph: &Graph,
    oracle: &mut DistanceOracle,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..agents.len()).collect();
    let distances: Vec<usize> = agents
        .iter()
        .map(|agent| oracle.distance(graph, agent.start, agent.goal))
        .collect();
    order.sort_by_key(|&a| (Reverse(distances[a]), a));
    order
}

/// Priority order for a successor configuration: agents still away from
/// their goal first, each partition by descending distance to goal, ties by
/// agent id. Keeps active agents early so their moves are fixed before
/// stationary agents get a say.
pub(crate) fn successor_order(
    agents: &[Agent],
    config: &Config,
    graph: &Graph,
    oracle: &mut DistanceOracle,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..agents.len()).collect();
    let distances: Vec<usize> = agents
        .iter()
        .map(|agent| oracle.distance(graph, config[agent.id], agent.goal))
        .collect();
    order.sort_by_key(|&a| (config[a] == agents[a].goal, Reverse(distances[a]), a));
    order
}
