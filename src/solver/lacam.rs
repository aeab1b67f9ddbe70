use std::collections::HashMap;

use anyhow::{bail, Result};
use tracing::{debug, info};

use super::comm::{initial_order, successor_order, ConstraintNode, HighLevelNode};
use super::pibt;
use super::snapshot::{History, Snapshot};
use crate::common::{Agent, Config, Solution};
use crate::distance::DistanceOracle;
use crate::graph::Graph;
use crate::stat::Stats;

/// One logical unit of search work. `step` performs exactly one phase per
/// call so a UI or test can inspect every intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Select,
    PopConstraint,
    ExpandTree,
    Generate,
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Solved,
    NoSolution,
}

/// LaCAM solver: depth-first search over joint configurations, with a lazy
/// constraint tree per configuration driving the PIBT successor generator.
pub struct LaCAM {
    agents: Vec<Agent>,
    graph: Graph,
    oracle: DistanceOracle,
    /// Arena of every discovered high-level node; a node's id is its index.
    nodes: Vec<HighLevelNode>,
    /// Depth-first frontier of node ids, top of stack last.
    open: Vec<usize>,
    /// Configuration fingerprint to the node that first produced it. The
    /// sole deduplication mechanism.
    explored: HashMap<String, usize>,
    phase: Phase,
    status: Status,
    current: Option<usize>,
    constraint: Option<usize>,
    generated: Option<Config>,
    solution: Option<Solution>,
    stats: Stats,
    next_constraint_id: usize,
    history: History,
}

impl LaCAM {
    pub fn new(agents: Vec<Agent>, graph: &Graph) -> Self {
        LaCAM {
            agents,
            graph: graph.clone(),
            oracle: DistanceOracle::new(),
            nodes: Vec::new(),
            open: Vec::new(),
            explored: HashMap::new(),
            phase: Phase::Select,
            status: Status::Running,
            current: None,
            constraint: None,
            generated: None,
            solution: None,
            stats: Stats::default(),
            next_constraint_id: 0,
            history: History::default(),
        }
    }

    /// Discards all search state and seeds the search with the start
    /// configuration. Fails without touching state when the input is
    /// invalid.
    pub fn initialize(&mut self) -> Result<()> {
        if self.agents.is_empty() {
            bail!("agent set is empty");
        }
        if self.graph.vertex_count() < 2 {
            bail!(
                "graph needs at least two vertices, got {}",
                self.graph.vertex_count()
            );
        }
        for agent in &self.agents {
            if !self.graph.contains(agent.start) {
                bail!("agent {} start {} is not a vertex", agent.id, agent.start);
            }
            if !self.graph.contains(agent.goal) {
                bail!("agent {} goal {} is not a vertex", agent.id, agent.goal);
            }
        }

        self.oracle.clear();
        self.nodes.clear();
        self.open.clear();
        self.explored.clear();
        self.history.clear();
        self.current = None;
        self.constraint = None;
        self.generated = None;
        self.solution = None;
        self.stats = Stats {
            steps: 0,
            nodes_generated: 1,
            configs_explored: 1,
        };

        let start = Config::new(self.agents.iter().map(|a| a.start).collect());
        let order = initial_order(&self.agents, &self.graph, &mut self.oracle);
        self.next_constraint_id = 1;
        let root = HighLevelNode::new(0, start.clone(), order, None, 0);
        self.explored.insert(start.fingerprint(), 0);
        self.nodes.push(root);
        self.open.push(0);
        self.phase = Phase::Select;
        self.status = Status::Running;

        info!(
            "initialized: {} agents on {} vertices",
            self.agents.len(),
            self.graph.vertex_count()
        );
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.initialize()
    }

    /// Advances the search by one phase. Returns false, doing nothing, once
    /// the search has terminated.
    pub fn step(&mut self) -> bool {
        if self.status != Status::Running {
            return false;
        }
        self.history.push(self.snapshot());
        self.stats.steps += 1;
        match self.phase {
            Phase::Select => self.phase_select(),
            Phase::PopConstraint => self.phase_pop_constraint(),
            Phase::ExpandTree => self.phase_expand_tree(),
            Phase::Generate => self.phase_generate(),
            Phase::Check => self.phase_check(),
        }
        true
    }

    /// Restores the state from before the most recent `step`. Returns false
    /// when no history remains.
    pub fn step_back(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Runs `initialize` and steps until termination.
    pub fn solve(&mut self) -> Result<Option<Solution>> {
        self.initialize()?;
        while self.step() {}
        Ok(self.solution.clone())
    }

    fn phase_select(&mut self) {
        let Some(&top) = self.open.last() else {
            self.current = None;
            self.constraint = None;
            self.status = Status::NoSolution;
            info!("search space exhausted after {} steps", self.stats.steps);
            return;
        };
        self.constraint = None;

        if self.is_goal(&self.nodes[top].config) {
            self.current = Some(top);
            self.solution = Some(self.reconstruct(top));
            self.status = Status::Solved;
            info!(
                "solved in {} steps, {} configurations",
                self.stats.steps, self.stats.configs_explored
            );
            return;
        }

        if self.nodes[top].queue.is_empty() {
            debug!("node {top} exhausted, backtracking");
            self.current = None;
            self.open.pop();
            return;
        }

        self.current = Some(top);
        self.phase = Phase::PopConstraint;
    }

    fn phase_pop_constraint(&mut self) {
        let m = self.current.expect("select recorded a current node");
        let index = self.nodes[m]
            .queue
            .pop_front()
            .expect("select checked the queue is nonempty");
        let node = self.nodes[m].tree.node_mut(index);
        node.selected = true;
        node.searched = true;
        self.constraint = Some(index);
        self.phase = Phase::ExpandTree;
    }

    fn phase_expand_tree(&mut self) {
        let m = self.current.expect("select recorded a current node");
        let index = self.constraint.expect("pop recorded a constraint node");
        let depth = self.nodes[m].tree.node(index).depth;

        // A node at full depth constrains every agent already.
        if depth < self.agents.len() {
            let agent = self.nodes[m].order[depth];
            let at = self.nodes[m].config[agent];
            let mut moves = vec![at];
            moves.extend_from_slice(self.graph.neighbors(at));
            for vertex in moves {
                let id = self.next_constraint_id;
                self.next_constraint_id += 1;
                let child = self.nodes[m].tree.add_child(index, id, agent, vertex);
                self.nodes[m].queue.push_back(child);
            }
        }
        self.phase = Phase::Generate;
    }

    fn phase_generate(&mut self) {
        let m = self.current.expect("select recorded a current node");
        let index = self.constraint.expect("pop recorded a constraint node");
        let constraints = self.nodes[m].tree.constraints(index);

        match pibt::successor(
            &self.graph,
            &mut self.oracle,
            &self.agents,
            &self.nodes[m].config,
            &constraints,
        ) {
            Ok(next) => {
                self.generated = Some(next);
                self.phase = Phase::Check;
            }
            Err(reason) => {
                debug!("node {m}: successor rejected, {reason:?}");
                self.generated = None;
                self.phase = Phase::Select;
            }
        }
    }

    fn phase_check(&mut self) {
        let next = self.generated.take().expect("generate stored a successor");
        self.phase = Phase::Select;

        let key = next.fingerprint();
        if self.explored.contains_key(&key) {
            debug!("configuration {key} already explored");
            return;
        }

        let m = self.current.expect("select recorded a current node");
        let id = self.nodes.len();
        let order = successor_order(&self.agents, &next, &self.graph, &mut self.oracle);
        let root_id = self.next_constraint_id;
        self.next_constraint_id += 1;
        debug!("expand node {m} into node {id}");
        self.nodes
            .push(HighLevelNode::new(id, next, order, Some(m), root_id));
        self.open.push(id);
        self.explored.insert(key, id);
        self.stats.nodes_generated += 1;
        self.stats.configs_explored += 1;
    }

    fn is_goal(&self, config: &Config) -> bool {
        self.agents.iter().all(|a| config[a.id] == a.goal)
    }

    fn reconstruct(&self, leaf: usize) -> Solution {
        let mut configs = Vec::new();
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            configs.push(self.nodes[id].config.clone());
            cursor = self.nodes[id].parent;
        }
        configs.reverse();
        Solution { configs }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            open: self.open.clone(),
            explored: self.explored.clone(),
            phase: self.phase,
            status: self.status,
            current: self.current,
            constraint: self.constraint,
            generated: self.generated.clone(),
            solution: self.solution.clone(),
            stats: self.stats.clone(),
            next_constraint_id: self.next_constraint_id,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.nodes = snapshot.nodes;
        self.open = snapshot.open;
        self.explored = snapshot.explored;
        self.phase = snapshot.phase;
        self.status = snapshot.status;
        self.current = snapshot.current;
        self.constraint = snapshot.constraint;
        self.generated = snapshot.generated;
        self.solution = snapshot.solution;
        self.stats = snapshot.stats;
        self.next_constraint_id = snapshot.next_constraint_id;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn node(&self, id: usize) -> Option<&HighLevelNode> {
        self.nodes.get(id)
    }

    pub fn current_node(&self) -> Option<&HighLevelNode> {
        self.current.and_then(|id| self.nodes.get(id))
    }

    pub fn current_config(&self) -> Option<&Config> {
        self.current_node().map(|node| &node.config)
    }

    pub fn current_constraint(&self) -> Option<&ConstraintNode> {
        let node = self.current_node()?;
        Some(node.tree.node(self.constraint?))
    }

    /// The successor awaiting its `Check` phase, if any.
    pub fn generated_config(&self) -> Option<&Config> {
        self.generated.as_ref()
    }

    /// OPEN contents, top of the stack first.
    pub fn open(&self) -> impl Iterator<Item = &HighLevelNode> {
        self.open.iter().rev().map(|&id| &self.nodes[id])
    }

    pub fn explored(&self) -> &HashMap<String, usize> {
        &self.explored
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .try_init();
    }

    fn line(n: usize) -> Graph {
        let mut graph = Graph::new();
        for _ in 0..n {
            graph.add_vertex();
        }
        for v in 1..n {
            graph.add_edge(v - 1, v);
        }
        graph
    }

    fn agent(id: usize, start: usize, goal: usize) -> Agent {
        Agent { id, start, goal }
    }

    fn assert_valid_solution(graph: &Graph, agents: &[Agent], solution: &Solution) {
        let first = solution.configs.first().unwrap();
        let last = solution.configs.last().unwrap();
        for a in agents {
            assert_eq!(first[a.id], a.start, "agent {} not at its start", a.id);
            assert_eq!(last[a.id], a.goal, "agent {} not at its goal", a.id);
        }
        for window in solution.configs.windows(2) {
            let (from, to) = (&window[0], &window[1]);
            for i in 0..agents.len() {
                assert!(
                    to[i] == from[i] || graph.neighbors(from[i]).contains(&to[i]),
                    "agent {i} teleported from {} to {}",
                    from[i],
                    to[i]
                );
                for j in (i + 1)..agents.len() {
                    assert_ne!(to[i], to[j], "vertex conflict between {i} and {j}");
                    assert!(
                        !(from[i] == to[j] && from[j] == to[i]),
                        "swap conflict between {i} and {j}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_initialize_rejects_bad_input() {
        let graph = line(3);
        assert!(LaCAM::new(Vec::new(), &graph).initialize().is_err());

        let mut single = Graph::new();
        single.add_vertex();
        assert!(LaCAM::new(vec![agent(0, 0, 0)], &single)
            .initialize()
            .is_err());

        assert!(LaCAM::new(vec![agent(0, 9, 2)], &graph)
            .initialize()
            .is_err());
        assert!(LaCAM::new(vec![agent(0, 0, 9)], &graph)
            .initialize()
            .is_err());
    }

    #[test]
    fn test_paper_example_phase_by_phase() {
        // Vertices a-b, b-c, a-d; agent 0: a -> d, agent 1: c -> b.
        let mut graph = Graph::new();
        let a = graph.add_vertex();
        let b = graph.add_vertex();
        let c = graph.add_vertex();
        let d = graph.add_vertex();
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        graph.add_edge(a, d);

        let mut solver = LaCAM::new(vec![agent(0, a, d), agent(1, c, b)], &graph);
        solver.initialize().unwrap();
        assert_eq!(solver.phase(), Phase::Select);
        assert_eq!(solver.stats().configs_explored, 1);

        let expected = [
            Phase::PopConstraint,
            Phase::ExpandTree,
            Phase::Generate,
            Phase::Check,
            Phase::Select,
        ];
        for phase in expected {
            assert!(solver.step());
            assert_eq!(solver.phase(), phase);
            assert_eq!(solver.status(), Status::Running);
        }

        // The first generated successor is already the goal configuration.
        assert!(solver.step());
        assert_eq!(solver.status(), Status::Solved);
        assert!(!solver.step());

        let solution = solver.solution().unwrap();
        assert_eq!(solution.makespan(), 1);
        assert_eq!(solution.configs.last().unwrap().positions(), &[d, b]);
        assert_valid_solution(&graph, solver.agents(), solution);
    }

    #[test]
    fn test_two_agents_on_a_line_cannot_swap() {
        let graph = line(3);
        let mut solver = LaCAM::new(vec![agent(0, 0, 2), agent(1, 2, 0)], &graph);

        let solution = solver.solve().unwrap();
        assert!(solution.is_none());
        assert_eq!(solver.status(), Status::NoSolution);
    }

    #[test]
    fn test_bypass_pocket_lets_agents_pass() {
        init_tracing();
        // A line t1..t5 with a side pocket t6 hanging off t3.
        let mut graph = line(5);
        let pocket = graph.add_vertex();
        graph.add_edge(2, pocket);

        let agents = vec![agent(0, 0, 4), agent(1, 4, 0)];
        let mut solver = LaCAM::new(agents.clone(), &graph);
        let solution = solver.solve().unwrap().expect("pocket makes this solvable");

        assert_valid_solution(&graph, &agents, &solution);
        // Some agent must wait in the pocket while the other passes.
        assert!(solution
            .configs
            .iter()
            .any(|config| config.positions().contains(&pocket)));
    }

    #[test]
    fn test_grid_diagonal_crossing() {
        let graph = Graph::grid(3, 3);
        let agents = vec![agent(0, 0, 8), agent(1, 2, 6)];
        let mut solver = LaCAM::new(agents.clone(), &graph);

        let solution = solver.solve().unwrap().expect("grid crossing is solvable");
        assert_valid_solution(&graph, &agents, &solution);
    }

    #[test]
    fn test_single_agent_takes_shortest_path() {
        let graph = Graph::grid(3, 3);
        let agents = vec![agent(0, 0, 8)];
        let mut solver = LaCAM::new(agents.clone(), &graph);

        let solution = solver.solve().unwrap().unwrap();
        assert_eq!(solution.makespan(), 4);
        assert_valid_solution(&graph, &agents, &solution);
    }

    #[test]
    fn test_already_solved_terminates_on_first_select() {
        let graph = line(3);
        let mut solver = LaCAM::new(vec![agent(0, 1, 1), agent(1, 2, 2)], &graph);

        let solution = solver.solve().unwrap().unwrap();
        assert_eq!(solution.makespan(), 0);
        assert_eq!(solver.stats().steps, 1);
    }

    #[test]
    fn test_explored_nodes_are_unique() {
        let graph = Graph::grid(3, 3);
        let mut solver = LaCAM::new(vec![agent(0, 0, 8), agent(1, 2, 6)], &graph);
        solver.solve().unwrap();

        let ids: HashSet<usize> = solver.explored().values().copied().collect();
        assert_eq!(ids.len(), solver.explored().len());
        for (fingerprint, &id) in solver.explored() {
            assert_eq!(solver.node(id).unwrap().config.fingerprint(), *fingerprint);
        }
    }

    #[test]
    fn test_constraint_trees_respect_depth_bound() {
        let mut graph = line(5);
        let pocket = graph.add_vertex();
        graph.add_edge(2, pocket);
        let mut solver = LaCAM::new(vec![agent(0, 0, 4), agent(1, 4, 0)], &graph);
        solver.solve().unwrap();

        let n = solver.agents().len();
        let mut id = 0;
        while let Some(node) = solver.node(id) {
            for constraint in node.tree.iter() {
                assert!(constraint.depth <= n);
                if constraint.depth == n {
                    assert!(constraint.children.is_empty());
                }
            }
            id += 1;
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let run = || {
            let graph = Graph::grid(3, 3);
            let mut solver = LaCAM::new(vec![agent(0, 0, 8), agent(1, 2, 6)], &graph);
            let solution = solver.solve().unwrap().unwrap();
            (solution, solver.stats().clone(), solver.explored().len())
        };

        let (solution_a, stats_a, explored_a) = run();
        let (solution_b, stats_b, explored_b) = run();
        assert_eq!(solution_a, solution_b);
        assert_eq!(stats_a, stats_b);
        assert_eq!(explored_a, explored_b);
    }

    #[test]
    fn test_step_back_rewinds_one_phase() {
        let graph = Graph::grid(3, 3);
        let mut solver = LaCAM::new(vec![agent(0, 0, 8), agent(1, 2, 6)], &graph);
        solver.initialize().unwrap();
        assert!(!solver.step_back(), "no history right after initialize");

        for _ in 0..4 {
            solver.step();
        }
        let phase = solver.phase();
        let steps = solver.stats().steps;

        solver.step();
        assert!(solver.step_back());
        assert_eq!(solver.phase(), phase);
        assert_eq!(solver.stats().steps, steps);
    }

    #[test]
    fn test_restore_preserves_future_evolution() {
        let graph = Graph::grid(3, 3);
        let agents = vec![agent(0, 0, 8), agent(1, 2, 6)];

        let mut undone = LaCAM::new(agents.clone(), &graph);
        undone.initialize().unwrap();
        let mut witness = LaCAM::new(agents, &graph);
        witness.initialize().unwrap();

        for _ in 0..6 {
            undone.step();
            witness.step();
        }
        // Walk forward then undo back to the common point.
        for _ in 0..3 {
            undone.step();
        }
        for _ in 0..3 {
            assert!(undone.step_back());
        }
        assert_eq!(undone.phase(), witness.phase());
        assert_eq!(undone.stats(), witness.stats());

        // From here on both runs must evolve identically.
        loop {
            let advanced = undone.step();
            assert_eq!(advanced, witness.step());
            assert_eq!(undone.phase(), witness.phase());
            assert_eq!(undone.status(), witness.status());
            if !advanced {
                break;
            }
        }
        assert_eq!(undone.solution(), witness.solution());
    }

    #[test]
    fn test_reset_reproduces_a_run() {
        let graph = Graph::grid(3, 3);
        let mut solver = LaCAM::new(vec![agent(0, 0, 8), agent(1, 2, 6)], &graph);

        let first = solver.solve().unwrap().unwrap();
        solver.reset().unwrap();
        assert_eq!(solver.status(), Status::Running);
        assert_eq!(solver.stats().steps, 0);
        while solver.step() {}
        assert_eq!(solver.solution(), Some(&first));
    }
}
