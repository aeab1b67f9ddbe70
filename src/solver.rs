mod comm;
mod lacam;
mod pibt;
mod snapshot;

pub use comm::{ConstraintNode, ConstraintTree, HighLevelNode};
pub use lacam::{LaCAM, Phase, Status};
pub use pibt::{successor, Reject};
