mod highlevel;
mod lowlevel;

pub use highlevel::HighLevelNode;
pub(crate) use highlevel::{initial_order, successor_order};
pub use lowlevel::{ConstraintNode, ConstraintTree};
