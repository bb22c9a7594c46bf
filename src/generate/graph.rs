//! Converter dependency graph
//!
//! An edge `A -> B` means `AConverter` calls `BConverter` for a nested field.
//! Any cycle would make the converters recurse without bound, so every
//! declaration that can reach one is rejected before generation.

use crate::declaration::ArtifactKind;
use crate::model::BatchContext;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph over every declaration of the batch that generates a converter
    pub fn from_batch(batch: &BatchContext) -> Self {
        let mut graph = Self::new();
        for name in batch.names() {
            let has_converter = batch
                .artifacts_of(name)
                .is_some_and(|a| a.contains(&ArtifactKind::Converter));
            if has_converter {
                graph.add(name, batch.converter_dependencies(name));
            }
        }
        graph
    }

    pub fn add(&mut self, node: impl Into<String>, dependencies: Vec<String>) {
        self.edges.entry(node.into()).or_default().extend(dependencies);
    }

    pub fn dependencies(&self, node: &str) -> &[String] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or_default()
    }

    /// First cycle reachable from `start`, as a closed path (`A, B, A`)
    pub fn cycle_from(&self, start: &str) -> Option<Vec<String>> {
        let mut visiting = Vec::new();
        let mut done = BTreeSet::new();
        self.visit(start, &mut visiting, &mut done)
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        visiting: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = visiting.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = visiting[pos..].iter().map(|n| n.to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }
        visiting.push(node);
        for dep in self.dependencies(node) {
            if let Some(cycle) = self.visit(dep, visiting, done) {
                return Some(cycle);
            }
        }
        visiting.pop();
        done.insert(node);
        None
    }
}
