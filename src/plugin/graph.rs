//! Plugin Dependency Graph
//!
//! Adjacency-list dependency graph maintained alongside the registry.
//! Tracks forward edges (dependencies), reverse edges (dependents) and the
//! order nodes were added, which breaks ties during topological ordering so
//! results are deterministic.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use super::error::{PluginError, PluginResult};

/// Dependency graph over plugin names
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Forward edges: node -> direct dependencies
    dependencies: HashMap<String, Vec<String>>,

    /// Reverse edges: node -> nodes that depend on it
    ///
    /// Entries may outlive the node itself: a plugin can be removed while
    /// inactive dependents still reference it, and the reverse edges must
    /// survive in case it is registered again.
    dependents: HashMap<String, Vec<String>>,

    /// Node names in the order they were added
    insertion: Vec<String>,
}

impl DependencyGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the graph
    pub fn len(&self) -> usize {
        self.insertion.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.insertion.is_empty()
    }

    /// Whether a node is present
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Node names in the order they were added
    pub fn nodes(&self) -> &[String] {
        &self.insertion
    }

    /// Add a node with its direct dependencies
    ///
    /// Duplicate dependency entries and self-references are dropped.
    /// Adding a name that is already present is a no-op; the registry
    /// rejects duplicates before the graph sees them.
    pub fn add_node(&mut self, name: &str, dependencies: &[String]) {
        if self.contains(name) {
            return;
        }
        let mut deps: Vec<String> = Vec::new();
        for dep in dependencies {
            if dep != name && !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        for dep in &deps {
            self.dependents.entry(dep.clone()).or_default().push(name.to_string());
        }
        self.dependencies.insert(name.to_string(), deps);
        self.insertion.push(name.to_string());
    }

    /// Remove a node, detaching it from its dependencies
    ///
    /// Reverse edges pointing at the removed node are kept so that
    /// surviving dependents keep their declared edges intact.
    pub fn remove_node(&mut self, name: &str) {
        if let Some(deps) = self.dependencies.remove(name) {
            for dep in deps {
                if let Some(list) = self.dependents.get_mut(&dep) {
                    list.retain(|n| n != name);
                }
            }
            self.insertion.retain(|n| n != name);
        }
    }

    /// Direct dependencies of a node, empty for unknown names
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct dependents of a node, empty for unknown names
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.dependents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check whether attaching `dependencies` to `name` would close a cycle
    ///
    /// Walks depth-first from each proposed dependency through existing
    /// forward edges looking for `name`. A self-reference counts as a
    /// cycle. Registration order alone cannot produce a cycle for a brand
    /// new node, so for registrations this catches self-references; the
    /// general walk also covers graphs assembled from descriptor files
    /// before validation.
    pub fn would_create_cycle<'a>(&'a self, name: &str, dependencies: &'a [String]) -> bool {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<&'a str> = Vec::new();
        for dep in dependencies {
            if seen.insert(dep.as_str()) {
                stack.push(dep.as_str());
            }
        }
        while let Some(node) = stack.pop() {
            if node == name {
                return true;
            }
            for dep in self.dependencies_of(node) {
                if seen.insert(dep.as_str()) {
                    stack.push(dep.as_str());
                }
            }
        }
        false
    }

    /// All transitive dependencies of a node, in the order they were added
    ///
    /// The node itself is excluded. Unknown names yield an empty list.
    pub fn transitive_dependencies(&self, name: &str) -> Vec<String> {
        let roots = [name.to_string()];
        self.closure(&roots)
            .into_iter()
            .filter(|n| n != name)
            .collect()
    }

    /// Transitive dependencies of a node followed by the node itself,
    /// ordered so every entry appears after all of its own dependencies
    pub fn dependency_chain(&self, name: &str) -> PluginResult<Vec<String>> {
        let roots = [name.to_string()];
        self.topological_order(&roots)
    }

    /// Topologically order the given nodes together with everything they
    /// transitively depend on
    ///
    /// Dependencies always precede dependents. Nodes that become ready at
    /// the same time are emitted in the order they were added to the
    /// graph, so the result is stable across runs. Names not present in
    /// the graph are ignored. Returns an error when the subgraph contains
    /// a cycle.
    pub fn topological_order(&self, roots: &[String]) -> PluginResult<Vec<String>> {
        let subset = self.closure(roots);
        let index_of: HashMap<&str, usize> = subset
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; subset.len()];
        let mut dependents_in: Vec<Vec<usize>> = vec![Vec::new(); subset.len()];
        for (i, name) in subset.iter().enumerate() {
            for dep in self.dependencies_of(name) {
                if let Some(&j) = index_of.get(dep.as_str()) {
                    in_degree[i] += 1;
                    dependents_in[j].push(i);
                }
            }
        }

        // Kahn's algorithm; the min-heap keys on insertion position so
        // independent nodes come out in registration order
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut emitted = vec![false; subset.len()];
        let mut order = Vec::with_capacity(subset.len());
        while let Some(Reverse(i)) = ready.pop() {
            emitted[i] = true;
            order.push(subset[i].clone());
            for &d in &dependents_in[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    ready.push(Reverse(d));
                }
            }
        }

        if order.len() != subset.len() {
            let stuck: Vec<&str> = subset
                .iter()
                .enumerate()
                .filter(|(i, _)| !emitted[*i])
                .map(|(_, n)| n.as_str())
                .collect();
            return Err(PluginError::cyclic_dependency(
                format!("unresolvable dependency order involving: {}", stuck.join(", "))
            ));
        }
        Ok(order)
    }

    /// The given nodes plus everything they transitively depend on,
    /// listed in the order nodes were added to the graph
    fn closure<'a>(&'a self, roots: &'a [String]) -> Vec<String> {
        let mut seen: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<&'a str> = Vec::new();
        for root in roots {
            if self.contains(root) && seen.insert(root.as_str()) {
                stack.push(root.as_str());
            }
        }
        while let Some(node) = stack.pop() {
            for dep in self.dependencies_of(node) {
                if self.contains(dep) && seen.insert(dep.as_str()) {
                    stack.push(dep.as_str());
                }
            }
        }
        self.insertion
            .iter()
            .filter(|n| seen.contains(n.as_str()))
            .cloned()
            .collect()
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    /// Random acyclic dependency sets: node i only ever depends on nodes
    /// with a smaller index, so every generated graph has a valid order
    fn acyclic_specs() -> impl Strategy<Value = Vec<Vec<prop::sample::Index>>> {
        prop::collection::vec(
            prop::collection::vec(any::<prop::sample::Index>(), 0..4),
            1..24,
        )
    }

    fn build_graph(spec: &[Vec<prop::sample::Index>]) -> (DependencyGraph, Vec<String>) {
        let names: Vec<String> = (0..spec.len()).map(|i| format!("p{}", i)).collect();
        let mut graph = DependencyGraph::new();
        for (i, picks) in spec.iter().enumerate() {
            let deps: Vec<String> = if i == 0 {
                Vec::new()
            } else {
                picks.iter().map(|pick| names[pick.index(i)].clone()).collect()
            };
            graph.add_node(&names[i], &deps);
        }
        (graph, names)
    }

    proptest! {
        #[test]
        fn topological_order_puts_dependencies_first(spec in acyclic_specs()) {
            let (graph, names) = build_graph(&spec);

            let order = graph.topological_order(&names).unwrap();
            prop_assert_eq!(order.len(), names.len());

            let position: HashMap<&str, usize> = order
                .iter()
                .enumerate()
                .map(|(pos, name)| (name.as_str(), pos))
                .collect();
            for name in &names {
                for dep in graph.dependencies_of(name) {
                    prop_assert!(position[dep.as_str()] < position[name.as_str()]);
                }
            }

            // insertion-order tie-breaking makes the order reproducible
            let again = graph.topological_order(&names).unwrap();
            prop_assert_eq!(again, order);
        }

        #[test]
        fn dependency_chain_is_self_contained(
            spec in acyclic_specs(),
            root in any::<prop::sample::Index>(),
        ) {
            let (graph, names) = build_graph(&spec);
            let root = &names[root.index(names.len())];

            let chain = graph.dependency_chain(root).unwrap();
            prop_assert_eq!(chain.last().map(String::as_str), Some(root.as_str()));

            let members: HashSet<&str> = chain.iter().map(String::as_str).collect();
            for member in &chain {
                for dep in graph.dependencies_of(member) {
                    prop_assert!(members.contains(dep.as_str()));
                }
            }
        }
    }
}
