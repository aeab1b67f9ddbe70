use std::collections::{HashMap, VecDeque};

use crate::graph::Graph;

/// Memoized hop-distance queries over one graph.
///
/// A query runs a single-source BFS and caches the whole distance map, so
/// every later query touching that source is a lookup. The successor
/// generator asks for distance-to-goal per agent per phase, which makes the
/// goal side of the pair the natural BFS source.
#[derive(Debug, Clone, Default)]
pub struct DistanceOracle {
    sources: HashMap<usize, HashMap<usize, usize>>,
}

impl DistanceOracle {
    pub fn new() -> Self {
        DistanceOracle::default()
    }

    /// Hop distance between two vertices, `usize::MAX` when unreachable or
    /// when either endpoint is not in the graph. Symmetric in its arguments.
    pub fn distance(&mut self, graph: &Graph, from: usize, to: usize) -> usize {
        if !graph.contains(from) || !graph.contains(to) {
            return usize::MAX;
        }
        if from == to {
            return 0;
        }
        if let Some(map) = self.sources.get(&from) {
            return map.get(&to).copied().unwrap_or(usize::MAX);
        }
        if let Some(map) = self.sources.get(&to) {
            return map.get(&from).copied().unwrap_or(usize::MAX);
        }
        let map = bfs(graph, to);
        let distance = map.get(&from).copied().unwrap_or(usize::MAX);
        self.sources.insert(to, map);
        distance
    }

    /// Drops all memoized maps. Required after any graph edit.
    pub fn clear(&mut self) {
        self.sources.clear();
    }
}

fn bfs(graph: &Graph, source: usize) -> HashMap<usize, usize> {
    let mut distance = HashMap::new();
    let mut frontier = VecDeque::new();

    distance.insert(source, 0);
    frontier.push_back(source);

    while let Some(v) = frontier.pop_front() {
        let next = distance[&v] + 1;
        for &u in graph.neighbors(v) {
            if !distance.contains_key(&u) {
                distance.insert(u, next);
                frontier.push_back(u);
            }
        }
    }

    distance
}
