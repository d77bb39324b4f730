//! Deterministic topological ordering of plan steps

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

use super::errors::PlanError;
use super::plan::Step;

/// Orders steps so every step comes after all of its `run_after` entries
///
/// Among steps that are ready at the same time, the one emitted first goes
/// first, so identical input always yields identical output. Each returned
/// step has `order` set to its position.
///
/// # Errors
///
/// [`PlanError::DuplicateStep`] if two steps share an id,
/// [`PlanError::UnknownDependency`] if a step names a missing predecessor and
/// [`PlanError::CyclicDependency`] if the dependencies form a cycle.
pub fn sort_steps(steps: Vec<Step>) -> Result<Vec<Step>, PlanError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(steps.len(), steps.len());
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(steps.len());

    for (position, step) in steps.iter().enumerate() {
        let node = graph.add_node(position);
        if nodes.insert(step.id.as_str(), node).is_some() {
            return Err(PlanError::DuplicateStep {
                id: step.id.clone(),
            });
        }
    }

    for step in &steps {
        let to = nodes[step.id.as_str()];
        for dependency in &step.run_after {
            let from = nodes.get(dependency.id.as_str()).copied().ok_or_else(|| {
                PlanError::UnknownDependency {
                    step: step.id.clone(),
                    dependency: dependency.id.clone(),
                }
            })?;
            graph.update_edge(from, to, ());
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        let position = graph[cycle.node_id()];
        return Err(PlanError::CyclicDependency {
            step: steps[position].id.clone(),
        });
    }

    // Kahn's algorithm, ready set keyed by emission position
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|node| graph.neighbors_directed(node, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = graph
        .node_indices()
        .filter(|node| in_degree[node.index()] == 0)
        .map(|node| Reverse(graph[node]))
        .collect();

    let mut ordering = Vec::with_capacity(steps.len());
    while let Some(Reverse(position)) = ready.pop() {
        ordering.push(position);
        let node = NodeIndex::new(position);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.push(Reverse(graph[next]));
            }
        }
    }

    let mut slots: Vec<Option<Step>> = steps.into_iter().map(Some).collect();
    let sorted: Vec<Step> = ordering
        .into_iter()
        .enumerate()
        .filter_map(|(order, position)| {
            slots[position].take().map(|mut step| {
                step.order = order;
                step
            })
        })
        .collect();

    debug!(steps = sorted.len(), "steps sorted");
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionScope;
    use crate::planner::Dependency;
    use pretty_assertions::assert_eq;

    fn step(id: &str, after: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            name: id.to_string(),
            stage: "build".to_string(),
            scope: ActionScope::Project,
            action: format!("cid/{id}"),
            module: None,
            run_after: after
                .iter()
                .map(|dep| Dependency {
                    id: (*dep).to_string(),
                    action: format!("cid/{dep}"),
                })
                .collect(),
            order: 0,
            config: serde_json::Value::Null,
        }
    }

    fn ids(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_independent_steps_keep_emission_order() {
        let sorted = sort_steps(vec![step("0", &[]), step("1", &[]), step("2", &[])]).unwrap();
        assert_eq!(ids(&sorted), vec!["0", "1", "2"]);
        let orders: Vec<usize> = sorted.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_dependency_moves_consumer_after_producer() {
        let sorted = sort_steps(vec![step("0", &["2"]), step("1", &[]), step("2", &[])]).unwrap();
        assert_eq!(ids(&sorted), vec!["1", "2", "0"]);
    }

    #[test]
    fn test_ready_steps_break_ties_by_emission() {
        // 3 becomes ready after 0, but 1 and 2 were emitted earlier
        let sorted = sort_steps(vec![
            step("0", &[]),
            step("1", &[]),
            step("2", &[]),
            step("3", &["0"]),
        ])
        .unwrap();
        assert_eq!(ids(&sorted), vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn test_duplicate_dependency_entries() {
        let sorted = sort_steps(vec![step("0", &[]), step("1", &["0", "0"])]).unwrap();
        assert_eq!(ids(&sorted), vec!["0", "1"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = sort_steps(vec![step("0", &["1"]), step("1", &["0"])]).unwrap_err();
        assert!(matches!(err, PlanError::CyclicDependency { .. }));
    }

    #[test]
    fn test_self_loop_rejected() {
        let err = sort_steps(vec![step("0", &["0"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::CyclicDependency {
                step: "0".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = sort_steps(vec![step("0", &["9"])]).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownDependency {
                step: "0".to_string(),
                dependency: "9".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = sort_steps(vec![step("0", &[]), step("0", &[])]).unwrap_err();
        assert_eq!(err, PlanError::DuplicateStep { id: "0".to_string() });
    }

    #[test]
    fn test_empty_input() {
        assert!(sort_steps(Vec::new()).unwrap().is_empty());
    }
}
