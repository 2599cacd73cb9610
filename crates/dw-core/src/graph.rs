//! Package dependency graph and deterministic execution ordering.
//!
//! The graph is supplied by package manifests and treated as authoritative:
//! the engine consumes its topological order and never reorders packages on
//! its own. Ties between independent packages break lexicographically so
//! repeated deployments always see the same total order.

use crate::error::{CoreError, CoreResult};
use crate::package_name::PackageName;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A directed acyclic graph of package dependencies.
#[derive(Debug)]
pub struct PackageGraph {
    /// The underlying graph; an edge `a -> b` means `b` depends on `a`.
    graph: DiGraph<PackageName, ()>,

    /// Map from package name to node index
    node_map: HashMap<PackageName, NodeIndex>,
}

impl PackageGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add a package to the graph, returning its node index.
    pub fn add_package(&mut self, name: &PackageName) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name.as_str()) {
            idx
        } else {
            let idx = self.graph.add_node(name.clone());
            self.node_map.insert(name.clone(), idx);
            idx
        }
    }

    /// Record that `package` depends on `dep`.
    ///
    /// The edge runs from dependency to dependent so that topological order
    /// yields dependencies first.
    pub fn add_dependency(&mut self, package: &PackageName, dep: &PackageName) {
        let pkg_idx = self.add_package(package);
        let dep_idx = self.add_package(dep);
        self.graph.add_edge(dep_idx, pkg_idx, ());
    }

    /// Build the graph from a map of package name -> dependencies.
    ///
    /// Packages are inserted in sorted name order so the node layout, and
    /// therefore every derived ordering, is deterministic for identical
    /// inputs. The built graph is validated for cycles.
    pub fn build(dependencies: &BTreeMap<PackageName, Vec<PackageName>>) -> CoreResult<Self> {
        let mut graph = Self::new();

        for package in dependencies.keys() {
            graph.add_package(package);
        }

        for (package, deps) in dependencies {
            for dep in deps {
                graph.add_dependency(package, dep);
            }
        }

        graph.validate()?;

        Ok(graph)
    }

    /// Validate the graph has no cycles.
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::DependencyCycle {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Packages in topological order, dependencies first.
    ///
    /// Kahn's algorithm with a name-ordered ready set: among packages whose
    /// dependencies are all satisfied, the lexicographically smallest name
    /// runs next.
    pub fn topological_order(&self) -> CoreResult<Vec<PackageName>> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree = self
                    .graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .count();
                (idx, degree)
            })
            .collect();

        let mut ready: BTreeSet<(PackageName, NodeIndex)> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&idx, _)| (self.graph[idx].clone(), idx))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some((name, idx)) = ready.pop_first() {
            order.push(name);
            for edge in self.graph.edges_directed(idx, petgraph::Direction::Outgoing) {
                let target = edge.target();
                if let Some(degree) = in_degree.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((self.graph[target].clone(), target));
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            let remaining = self
                .graph
                .node_indices()
                .find(|idx| in_degree.get(idx).is_some_and(|&d| d > 0))
                .ok_or_else(|| CoreError::DependencyCycle {
                    cycle: "<unknown>".to_string(),
                })?;
            return Err(CoreError::DependencyCycle {
                cycle: self.find_cycle_path(remaining),
            });
        }

        Ok(order)
    }

    /// Direct dependencies of a package.
    pub fn dependencies(&self, package: &str) -> Vec<PackageName> {
        if let Some(&idx) = self.node_map.get(package) {
            self.graph
                .edges_directed(idx, petgraph::Direction::Incoming)
                .map(|e| self.graph[e.source()].clone())
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Check if a package exists in the graph.
    pub fn contains(&self, package: &str) -> bool {
        self.node_map.contains_key(package)
    }

    /// Walk a cycle starting from `start` for error reporting.
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }
}

impl Default for PackageGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
