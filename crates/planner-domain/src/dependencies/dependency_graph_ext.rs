use std::collections::{BTreeMap, HashMap};

use planner_core::graph::algorithms;
use planner_core::Graph;

use super::{DependencyEdge, DependencyKind, DependencyLink};
use crate::{ProjectId, TaskId};

/// Type alias for the task dependency graph
pub type DependencyGraph = Graph<DependencyLink>;

/// Extension trait for task-specific dependency graph queries
///
/// All queries consider active edges only unless stated otherwise.
pub trait DependencyGraphExt {
    /// Active edges leaving a task (the task is the predecessor)
    fn edges_from(&self, task_id: TaskId) -> Vec<&DependencyEdge>;

    /// Active edges entering a task (the task is the successor)
    fn edges_to(&self, task_id: TaskId) -> Vec<&DependencyEdge>;

    /// Edges belonging to a project, optionally including deactivated ones
    fn all_edges(&self, project_id: ProjectId, include_inactive: bool) -> Vec<&DependencyEdge>;

    /// Every task the given task transitively depends on, sorted by id
    fn all_predecessors(&self, task_id: TaskId) -> Vec<TaskId>;

    /// Every task that transitively depends on the given task, sorted by id
    fn all_successors(&self, task_id: TaskId) -> Vec<TaskId>;

    /// The active edge from `predecessor` to `successor`, if any
    fn find_between(&self, predecessor: TaskId, successor: TaskId) -> Option<&DependencyEdge>;

    /// Fewest-hop path from `from` to `to`; empty when unreachable
    fn shortest_path(&self, from: TaskId, to: TaskId) -> Vec<TaskId>;

    /// Active edge count per kind; every kind is present
    fn statistics(&self) -> BTreeMap<DependencyKind, usize>;

    /// Tasks ranked by active degree (in + out), ties broken by id
    fn most_connected(&self, limit: usize) -> Vec<(TaskId, usize)>;

    /// Active edges whose lag is at least `min_lag_hours`
    fn external_constraints(&self, min_lag_hours: f64) -> Vec<&DependencyEdge>;
}

impl DependencyGraphExt for DependencyGraph {
    fn edges_from(&self, task_id: TaskId) -> Vec<&DependencyEdge> {
        sorted(self.outgoing_active(task_id))
    }

    fn edges_to(&self, task_id: TaskId) -> Vec<&DependencyEdge> {
        sorted(self.incoming_active(task_id))
    }

    fn all_edges(&self, project_id: ProjectId, include_inactive: bool) -> Vec<&DependencyEdge> {
        let edges = if include_inactive {
            self.edges()
        } else {
            self.active_edges()
        };
        edges
            .into_iter()
            .filter(|e| e.attrs.project_id == project_id)
            .collect()
    }

    fn all_predecessors(&self, task_id: TaskId) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .reaching(task_id)
            .into_iter()
            .filter(|id| *id != task_id)
            .collect();
        ids.sort();
        ids
    }

    fn all_successors(&self, task_id: TaskId) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .reachable_from(task_id)
            .into_iter()
            .filter(|id| *id != task_id)
            .collect();
        ids.sort();
        ids
    }

    fn find_between(&self, predecessor: TaskId, successor: TaskId) -> Option<&DependencyEdge> {
        self.find_active(predecessor, successor)
    }

    fn shortest_path(&self, from: TaskId, to: TaskId) -> Vec<TaskId> {
        algorithms::shortest_path(&self.adjacency_list(), from, to)
    }

    fn statistics(&self) -> BTreeMap<DependencyKind, usize> {
        let mut counts: BTreeMap<DependencyKind, usize> =
            DependencyKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        for edge in self.active_edges() {
            *counts.entry(edge.attrs.kind).or_insert(0) += 1;
        }
        counts
    }

    fn most_connected(&self, limit: usize) -> Vec<(TaskId, usize)> {
        let mut degree: HashMap<TaskId, usize> = HashMap::new();
        for edge in self.active_edges() {
            *degree.entry(edge.source).or_insert(0) += 1;
            *degree.entry(edge.target).or_insert(0) += 1;
        }

        let mut ranked: Vec<(TaskId, usize)> = degree.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    fn external_constraints(&self, min_lag_hours: f64) -> Vec<&DependencyEdge> {
        self.active_edges()
            .into_iter()
            .filter(|e| e.attrs.lag_hours >= min_lag_hours)
            .collect()
    }
}

fn sorted(mut edges: Vec<&DependencyEdge>) -> Vec<&DependencyEdge> {
    edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    edges
}
