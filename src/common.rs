use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: usize,
    pub goal: usize,
}

/// Joint position of all agents at one timestep, indexed by agent id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Config {
    positions: Vec<usize>,
}

impl Config {
    pub fn new(positions: Vec<usize>) -> Self {
        Config { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Deduplication key: a pure function of the position sequence. Joined
    /// ids rather than a 64-bit hash, so two distinct configurations can
    /// never share a key.
    pub fn fingerprint(&self) -> String {
        let mut key = String::with_capacity(self.positions.len() * 3);
        for (i, v) in self.positions.iter().enumerate() {
            if i > 0 {
                key.push('-');
            }
            key.push_str(&v.to_string());
        }
        key
    }
}

impl std::ops::Index<usize> for Config {
    type Output = usize;

    fn index(&self, agent: usize) -> &usize {
        &self.positions[agent]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub configs: Vec<Config>,
}

impl Solution {
    /// Number of synchronous moves, one less than the number of configurations.
    pub fn makespan(&self) -> usize {
        self.configs.len().saturating_sub(1)
    }

    pub fn path_of(&self, agent: usize) -> Vec<usize> {
        self.configs.iter().map(|config| config[agent]).collect()
    }
}
