//! LaCAM Multi-Agent Path Finding over undirected graphs: a depth-first
//! search over joint configurations, with a lazy per-configuration
//! constraint tree driving a PIBT-style successor generator. The solver
//! advances one phase per `step` call so editors and tests can observe
//! every intermediate state, and keeps a bounded snapshot history for undo.

mod common;
mod distance;
mod graph;
pub mod scenario;
mod solver;
mod stat;

pub use common::{Agent, Config, Solution};
pub use distance::DistanceOracle;
pub use graph::{Graph, Vertex};
pub use solver::{
    successor, ConstraintNode, ConstraintTree, HighLevelNode, LaCAM, Phase, Reject, Status,
};
pub use stat::Stats;
