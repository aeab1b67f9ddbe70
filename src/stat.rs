/// Per-run search counters, reset by `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub steps: usize,
    pub nodes_generated: usize,
    pub configs_explored: usize,
}
