//! Dependency Planner (§4.4) — builds a per-project dependency graph from
//! `Links` and `guerite.depends_on`, topologically orders it, and computes
//! the dependencies-ready predicate.
//!
//! No external graph crate: adjacency lists keyed by base container name,
//! Kahn's algorithm for the topological sort. The pack avoids `petgraph`
//! for this kind of relationship (the teacher's swarm task/service
//! topology code is hand-rolled too), so Guerite follows suit.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::inventory::MonitoredContainer;

/// One project's containers in dependency-topological order, plus which of
/// them are currently gated (a dependency isn't up and healthy).
pub struct DependencyPlan {
    pub order: Vec<String>,
    pub gated: BTreeSet<String>,
}

pub fn plan(containers: &[MonitoredContainer]) -> DependencyPlan {
    let by_name: BTreeMap<&str, &MonitoredContainer> =
        containers.iter().map(|c| (c.base_name(), c)).collect();

    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();
    for name in by_name.keys() {
        edges.entry(name.to_string()).or_default();
        indegree.entry(name.to_string()).or_insert(0);
    }

    for container in containers {
        let mut deps: BTreeSet<String> = container.depends_on.iter().cloned().collect();
        deps.extend(container.links.iter().cloned());

        for dep in deps {
            if !by_name.contains_key(dep.as_str()) {
                continue;
            }
            let node = container.base_name().to_string();
            if edges.entry(dep.clone()).or_default().insert(node.clone()) {
                *indegree.entry(node).or_insert(0) += 1;
            }
        }
    }

    let mut queue: VecDeque<String> = indegree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(name, _)| name.clone())
        .collect();
    let mut order = Vec::with_capacity(indegree.len());
    let mut remaining = indegree.clone();

    while let Some(node) = pop_smallest(&mut queue) {
        order.push(node.clone());
        if let Some(children) = edges.get(&node) {
            for child in children {
                if let Some(deg) = remaining.get_mut(child) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(child.clone());
                    }
                }
            }
        }
    }

    // Cycle: any node not yet ordered has an unresolved dependency. Break
    // deterministically by appending leftover nodes sorted by name.
    if order.len() < indegree.len() {
        let ordered: BTreeSet<&String> = order.iter().collect();
        let mut leftover: Vec<String> = indegree
            .keys()
            .filter(|n| !ordered.contains(n))
            .cloned()
            .collect();
        leftover.sort();
        tracing::warn!(
            nodes = ?leftover,
            "dependency cycle detected, breaking order deterministically by name"
        );
        order.extend(leftover);
    }

    let gated = order
        .iter()
        .filter(|name| {
            by_name
                .get(name.as_str())
                .map(|c| !dependencies_ready(c, &by_name))
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    DependencyPlan { order, gated }
}

fn pop_smallest(queue: &mut VecDeque<String>) -> Option<String> {
    if queue.is_empty() {
        return None;
    }
    let (idx, _) = queue
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .unwrap();
    queue.remove(idx)
}

fn dependencies_ready(
    container: &MonitoredContainer,
    by_name: &BTreeMap<&str, &MonitoredContainer>,
) -> bool {
    let mut deps: BTreeSet<&str> = container.depends_on.iter().map(String::as_str).collect();
    deps.extend(container.links.iter().map(String::as_str));

    deps.iter().all(|dep| match by_name.get(dep) {
        None => true,
        Some(dep_container) => dep_container.running && dep_container.is_healthy(),
    })
}
