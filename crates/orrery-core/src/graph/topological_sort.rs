// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Kahn's algorithm over a job dependency graph.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency graph contains a cycle")]
pub struct CycleError;

struct Graph<T> {
    nodes: Vec<T>,
    adjacency: HashMap<T, Vec<T>>,
    in_degree: HashMap<T, usize>,
}

impl<T: Copy + Eq + Hash> Graph<T> {
    /// Builds adjacency and in-degree tables. Edges whose endpoints are not
    /// in `nodes` are ignored.
    fn build(nodes: impl IntoIterator<Item = T>, edges: impl IntoIterator<Item = (T, T)>) -> Self {
        let nodes: Vec<T> = nodes.into_iter().collect();
        let mut in_degree: HashMap<T, usize> = nodes.iter().map(|n| (*n, 0)).collect();
        let mut adjacency: HashMap<T, Vec<T>> = HashMap::new();

        for (parent, child) in edges {
            if !in_degree.contains_key(&parent) {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(&child) {
                *degree += 1;
                adjacency.entry(parent).or_default().push(child);
            }
        }

        Self {
            nodes,
            adjacency,
            in_degree,
        }
    }
}

/// Performs a topological sort on a directed graph.
///
/// `edges` are `(dependency, dependent)` pairs: the first element must come
/// before the second in the output. Ties keep the order of `nodes`.
///
/// Returns [`CycleError`] if the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError>
where
    T: Copy + Eq + Hash,
{
    let Graph {
        nodes,
        adjacency,
        mut in_degree,
    } = Graph::build(nodes, edges);

    let mut queue: VecDeque<T> = nodes
        .iter()
        .copied()
        .filter(|n| in_degree.get(n).copied().unwrap_or(0) == 0)
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        sorted.push(node);
        for &child in adjacency.get(&node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(&child) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if sorted.len() != nodes.len() {
        Err(CycleError)
    } else {
        Ok(sorted)
    }
}

/// Groups the nodes of a DAG into dependency levels.
///
/// Every node in level `n` only depends on nodes in levels `< n`, so all
/// nodes of one level may run concurrently once the previous level is done.
pub fn dependency_levels<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<Vec<T>>, CycleError>
where
    T: Copy + Eq + Hash,
{
    let Graph {
        nodes,
        adjacency,
        mut in_degree,
    } = Graph::build(nodes, edges);

    let mut current: Vec<T> = nodes
        .iter()
        .copied()
        .filter(|n| in_degree.get(n).copied().unwrap_or(0) == 0)
        .collect();

    let mut levels = Vec::new();
    let mut visited = 0;
    while !current.is_empty() {
        visited += current.len();
        let mut next = Vec::new();
        for node in &current {
            for &child in adjacency.get(node).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(&child) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(child);
                    }
                }
            }
        }
        levels.push(std::mem::replace(&mut current, next));
    }

    if visited != nodes.len() {
        Err(CycleError)
    } else {
        Ok(levels)
    }
}
