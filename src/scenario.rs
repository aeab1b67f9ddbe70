use anyhow::Result;
use rand::prelude::*;
use std::fs::File;
use std::io::{self, BufReader, Write};
use tracing::info;

use crate::common::Agent;
use crate::graph::Graph;

pub fn load_agents_from_yaml(path: &str) -> Result<Vec<Agent>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let agents = serde_yaml::from_reader(reader)?;
    Ok(agents)
}

pub fn load_agents_from_json(path: &str) -> Result<Vec<Agent>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let agents = serde_json::from_reader(reader)?;
    Ok(agents)
}

pub fn parse_agents_yaml(contents: &str) -> Result<Vec<Agent>> {
    let agents = serde_yaml::from_str(contents)?;
    Ok(agents)
}

pub fn write_agents_to_yaml(path: &str, agents: &[Agent]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    let yaml_data = serde_yaml::to_string(&agents)?;
    writer.write_all(yaml_data.as_bytes())?;

    Ok(())
}

/// Draws `num_agents` agents with pairwise distinct starts and pairwise
/// distinct goals from the graph's vertices.
pub fn generate_agents_randomly<R: Rng + ?Sized>(
    graph: &Graph,
    num_agents: usize,
    rng: &mut R,
) -> Result<Vec<Agent>, String> {
    let vertices: Vec<usize> = graph.vertices().map(|v| v.id).collect();
    if vertices.len() < num_agents {
        return Err("Not enough vertices to place every agent".to_string());
    }

    let mut starts = vertices.clone();
    starts.shuffle(rng);
    let mut goals = vertices;
    goals.shuffle(rng);

    let agents: Vec<Agent> = (0..num_agents)
        .map(|id| Agent {
            id,
            start: starts[id],
            goal: goals[id],
        })
        .collect();

    info!("Generate scen: {agents:?}");
    Ok(agents)
}
