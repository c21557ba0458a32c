use std::collections::HashMap;

use planner_core::{PlannerError, PlannerResult};
use serde::{Deserialize, Serialize};

use crate::dependencies::{DependencyEdge, DependencyGraph, DependencyGraphExt};
use crate::{Task, TaskId};

/// A task that cannot start yet, with the edges holding it back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedTask {
    pub task_id: TaskId,
    pub blocking: Vec<DependencyEdge>,
}

/// Start/block status derived from completion state, not from CPM dates
pub struct ReadinessAnalyzer<'a> {
    tasks: HashMap<TaskId, &'a Task>,
    graph: &'a DependencyGraph,
}

impl<'a> ReadinessAnalyzer<'a> {
    pub fn new(tasks: &'a [Task], graph: &'a DependencyGraph) -> Self {
        Self {
            tasks: tasks.iter().map(|t| (t.id, t)).collect(),
            graph,
        }
    }

    /// Every predecessor requirement is met and the task is not done yet
    pub fn can_task_start(&self, task_id: TaskId) -> PlannerResult<bool> {
        let task = self.task(task_id)?;
        Ok(!task.is_completed() && self.blocking_dependencies(task_id)?.is_empty())
    }

    /// Incoming active edges whose predecessor has not met the requirement
    pub fn blocking_dependencies(&self, task_id: TaskId) -> PlannerResult<Vec<&'a DependencyEdge>> {
        self.task(task_id)?;

        let mut blocking = Vec::new();
        for edge in self.graph.edges_to(task_id) {
            let predecessor = self.task(edge.source)?;
            if !edge.attrs.kind.is_satisfied_by(predecessor) {
                blocking.push(edge);
            }
        }
        Ok(blocking)
    }

    /// Unfinished tasks with at least one blocking edge, ordered by task id
    pub fn blocked_tasks(&self) -> PlannerResult<Vec<BlockedTask>> {
        let mut blocked = Vec::new();
        for task in self.sorted_tasks() {
            if task.is_completed() {
                continue;
            }
            let blocking = self.blocking_dependencies(task.id)?;
            if !blocking.is_empty() {
                blocked.push(BlockedTask {
                    task_id: task.id,
                    blocking: blocking.into_iter().cloned().collect(),
                });
            }
        }
        Ok(blocked)
    }

    /// Startable tasks on which no work has been recorded, ordered by task id
    pub fn tasks_ready_to_start(&self) -> PlannerResult<Vec<&'a Task>> {
        let mut ready = Vec::new();
        for task in self.sorted_tasks() {
            if task.progress == 0 && self.can_task_start(task.id)? {
                ready.push(task);
            }
        }
        Ok(ready)
    }

    fn task(&self, task_id: TaskId) -> PlannerResult<&'a Task> {
        self.tasks
            .get(&task_id)
            .copied()
            .ok_or_else(|| PlannerError::not_found("task", task_id))
    }

    fn sorted_tasks(&self) -> Vec<&'a Task> {
        let mut tasks: Vec<&'a Task> = self.tasks.values().copied().collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }
}
