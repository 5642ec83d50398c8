// src/dag/layers.rs

//! Topological layering of a [`DagGraph`] into generations.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::DagGraph;
use crate::errors::{PermflowError, Result};
use crate::types::TaskName;

/// Ordered, disjoint task-name sets.
///
/// Generation `k` holds every task whose predecessors all lie in generations
/// `0..k`. Within a generation, names keep graph insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generations {
    blocks: Vec<Vec<TaskName>>,
    index: HashMap<TaskName, usize>,
}

impl Generations {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, generation: usize) -> Option<&[TaskName]> {
        self.blocks.get(generation).map(|b| b.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[TaskName]> {
        self.blocks.iter().map(|b| b.as_slice())
    }

    /// Generation index of `task`, if it is part of the graph.
    pub fn generation_of(&self, task: &str) -> Option<usize> {
        self.index.get(task).copied()
    }

    pub fn task_count(&self) -> usize {
        self.index.len()
    }

    pub fn into_blocks(self) -> Vec<Vec<TaskName>> {
        self.blocks
    }
}

/// Compute generations by repeated layering.
///
/// Fails with [`PermflowError::TaskNotFound`] if a predecessor name is not a
/// node of the graph, and with [`PermflowError::DagCycle`] if layering stalls
/// before every node is placed.
pub fn compute_generations(graph: &DagGraph) -> Result<Generations> {
    validate_references(graph)?;

    let mut blocks: Vec<Vec<TaskName>> = Vec::new();
    let mut index: HashMap<TaskName, usize> = HashMap::new();

    while index.len() < graph.len() {
        let generation = blocks.len();

        // Decide the whole layer first so that a node never sees a sibling
        // of the same layer as "placed".
        let layer: Vec<TaskName> = graph
            .tasks()
            .filter(|name| !index.contains_key(*name))
            .filter(|name| {
                graph
                    .dependencies_of(name)
                    .iter()
                    .all(|dep| index.contains_key(dep))
            })
            .map(|s| s.to_string())
            .collect();

        if layer.is_empty() {
            return Err(cycle_error(graph, &index));
        }

        for name in &layer {
            index.insert(name.clone(), generation);
        }
        debug!(generation, tasks = ?layer, "computed generation");
        blocks.push(layer);
    }

    Ok(Generations { blocks, index })
}

fn validate_references(graph: &DagGraph) -> Result<()> {
    for name in graph.tasks() {
        for dep in graph.dependencies_of(name) {
            if !graph.contains(dep) {
                return Err(PermflowError::TaskNotFound(format!(
                    "task '{}' has unknown predecessor '{}'",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Build a diagnostic for a stalled layering.
///
/// Edge direction: dep -> task, restricted to the nodes that could not be
/// placed. A topological sort of that subgraph fails on a node of the cycle.
fn cycle_error(graph: &DagGraph, placed: &HashMap<TaskName, usize>) -> PermflowError {
    let mut remaining: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in graph.tasks().filter(|n| !placed.contains_key(*n)) {
        remaining.add_node(name);
    }
    for name in graph.tasks().filter(|n| !placed.contains_key(*n)) {
        for dep in graph.dependencies_of(name) {
            if !placed.contains_key(dep) {
                remaining.add_edge(dep.as_str(), name, ());
            }
        }
    }

    let node = match toposort(&remaining, None) {
        Err(cycle) => cycle.node_id().to_string(),
        // Unreachable for a stalled layering, but keep a useful message.
        Ok(order) => order.first().map(|s| s.to_string()).unwrap_or_default(),
    };

    PermflowError::DagCycle(format!(
        "cycle detected in task DAG involving task '{}'",
        node
    ))
}
