use std::collections::{HashMap, HashSet};

use planner_core::graph::algorithms;
use planner_core::{Cancellation, PlannerResult};
use serde::{Deserialize, Serialize};

use crate::dependencies::DependencyGraph;
use crate::{ProjectId, Task, TaskId};

/// Health report for a project's stored dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyValidationResult {
    pub valid: bool,
    pub issues: Vec<String>,
    pub cycles: Vec<Vec<TaskId>>,
}

/// Audit active edges for problems that gated writes should have prevented
///
/// Edges can reach the store through imports, so nothing is assumed.
pub fn validate_graph(
    project_id: ProjectId,
    tasks: &[Task],
    graph: &DependencyGraph,
    cancel: &Cancellation,
) -> PlannerResult<DependencyValidationResult> {
    let mut issues = Vec::new();
    let cycles = algorithms::find_cycles(&graph.adjacency_list(), cancel)?;
    if !cycles.is_empty() {
        issues.push(format!(
            "Found {} circular dependency cycle(s)",
            cycles.len()
        ));
    }

    let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut pairs: HashSet<(TaskId, TaskId)> = HashSet::new();

    for edge in graph.active_edges() {
        cancel.check()?;

        if edge.source == edge.target {
            issues.push(format!("Dependency {} references itself", edge.id));
        }
        if !pairs.insert((edge.source, edge.target)) {
            issues.push(format!(
                "Duplicate active dependency {} -> {} ({})",
                edge.source, edge.target, edge.id
            ));
        }

        let endpoints = [by_id.get(&edge.source), by_id.get(&edge.target)];
        let [Some(predecessor), Some(successor)] = endpoints else {
            issues.push(format!(
                "Dependency {} references a task outside project {}",
                edge.id, project_id
            ));
            continue;
        };
        if edge.attrs.project_id != project_id
            || predecessor.project_id != project_id
            || successor.project_id != project_id
        {
            issues.push(format!("Found cross-project dependency: {}", edge.id));
        }
    }

    Ok(DependencyValidationResult {
        valid: issues.is_empty(),
        issues,
        cycles,
    })
}
