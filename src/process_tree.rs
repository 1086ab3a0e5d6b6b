//! Task tree reconstruction from creation edges
//!
//! The backend records one `(parent, child)` edge per observed task
//! creation. Starting from the directly spawned command, a breadth-first
//! walk over those edges yields every task the command created, directly or
//! transitively. Only tasks in that set are eligible for reporting.

use crate::snapshot::{Edge, Tid};
use std::collections::{HashMap, HashSet, VecDeque};

/// Visit state of a task during the traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Queued but children not yet expanded
    Frontier,
    /// Children expanded
    Done,
}

/// Build the `parent -> children` adjacency list
///
/// Duplicate edges collapse. Every parent appears as a key.
pub fn build_adjacency(edges: &[Edge]) -> HashMap<Tid, Vec<Tid>> {
    let mut adjacency: HashMap<Tid, Vec<Tid>> = HashMap::new();
    for edge in edges {
        let children = adjacency.entry(edge.parent).or_default();
        if !children.contains(&edge.child) {
            children.push(edge.child);
        }
    }
    adjacency
}

/// Compute the set of tasks reachable from `root`, including `root`
///
/// # Example
/// ```
/// use schedtime::process_tree::reachable_tasks;
/// use schedtime::snapshot::Edge;
///
/// let edges = [Edge::new(1, 2), Edge::new(2, 3), Edge::new(1, 4)];
/// let tasks = reachable_tasks(2, &edges);
/// assert!(tasks.contains(&2) && tasks.contains(&3));
/// assert_eq!(tasks.len(), 2);
/// ```
pub fn reachable_tasks(root: Tid, edges: &[Edge]) -> HashSet<Tid> {
    let adjacency = build_adjacency(edges);

    // Absent from `colors` means unvisited
    let mut colors: HashMap<Tid, Color> = HashMap::new();
    let mut queue = VecDeque::from([root]);
    colors.insert(root, Color::Frontier);

    while let Some(task) = queue.pop_front() {
        for &child in adjacency.get(&task).into_iter().flatten() {
            if !colors.contains_key(&child) {
                colors.insert(child, Color::Frontier);
                queue.push_back(child);
            }
        }
        colors.insert(task, Color::Done);
    }

    debug_assert!(colors.values().all(|&c| c == Color::Done));
    tracing::debug!(root, tasks = colors.len(), "built task tree");

    colors.into_keys().collect()
}
