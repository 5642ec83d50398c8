// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::layers::{Generations, compute_generations};
use crate::errors::Result;
use crate::types::TaskName;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct predecessors: tasks that must complete before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that list this one as a predecessor.
    dependents: Vec<TaskName>,
}

/// In-memory task graph keyed by task name.
///
/// Insertion order is remembered so that generation layering is
/// deterministic. `insert` performs no validation: references to names that
/// do not exist yet (or never will) and cycles are both representable, and
/// are rejected by [`DagGraph::generations`].
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node with the given predecessors.
    ///
    /// Returns `false` (and leaves the graph untouched) if the name is
    /// already present.
    pub fn insert(&mut self, name: impl Into<TaskName>, deps: Vec<TaskName>) -> bool {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return false;
        }

        // Link into dependents of already-known predecessors. Predecessors
        // inserted later pick up their dependents in the loop below.
        for dep in &deps {
            if let Some(dep_node) = self.nodes.get_mut(dep) {
                if !dep_node.dependents.contains(&name) {
                    dep_node.dependents.push(name.clone());
                }
            }
        }

        let mut node = DagNode {
            deps,
            dependents: Vec::new(),
        };
        for existing in &self.order {
            let lists_us = self
                .nodes
                .get(existing)
                .is_some_and(|n| n.deps.contains(&name));
            if lists_us {
                node.dependents.push(existing.clone());
            }
        }

        self.order.push(name.clone());
        self.nodes.insert(name, node);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All task names in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Immediate predecessors of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Layer the graph into generations. See [`compute_generations`].
    pub fn generations(&self) -> Result<Generations> {
        compute_generations(self)
    }
}
