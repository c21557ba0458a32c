use std::collections::HashMap;

use planner_core::{EdgeId, PlannerError, PlannerResult};
use planner_domain::{DependencyEdge, ProjectId, Task, TaskId};

use crate::document::ProjectDocument;

/// Indexed task and edge rows shared by the store backends
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    tasks: HashMap<TaskId, Task>,
    edges: HashMap<EdgeId, DependencyEdge>,
}

impl Tables {
    pub fn get_task(&self, task_id: TaskId) -> PlannerResult<Task> {
        self.tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| PlannerError::not_found("task", task_id))
    }

    /// Tasks of a project, oldest first
    pub fn tasks_by_project(&self, project_id: ProjectId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    pub fn all_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tasks
    }

    pub fn upsert_task(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    pub fn update_task<F>(&mut self, task_id: TaskId, change: F) -> PlannerResult<Task>
    where
        F: FnOnce(&mut Task),
    {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| PlannerError::not_found("task", task_id))?;
        change(task);
        Ok(task.clone())
    }

    pub fn load_edges(&self, project_id: ProjectId, include_inactive: bool) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .edges
            .values()
            .filter(|e| e.attrs.project_id == project_id)
            .filter(|e| include_inactive || e.is_active())
            .cloned()
            .collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        edges
    }

    pub fn get_edge(&self, edge_id: EdgeId) -> Option<DependencyEdge> {
        self.edges.get(&edge_id).cloned()
    }

    pub fn upsert_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a DependencyEdge>) {
        for edge in edges {
            self.edges.insert(edge.id, edge.clone());
        }
    }

    pub fn delete_edge(&mut self, edge_id: EdgeId) -> bool {
        self.edges.remove(&edge_id).is_some()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn to_document(&self) -> ProjectDocument {
        let mut edges: Vec<DependencyEdge> = self.edges.values().cloned().collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        ProjectDocument {
            tasks: self.all_tasks(),
            dependencies: edges,
        }
    }
}

impl From<ProjectDocument> for Tables {
    fn from(document: ProjectDocument) -> Self {
        Self {
            tasks: document.tasks.into_iter().map(|t| (t.id, t)).collect(),
            edges: document
                .dependencies
                .into_iter()
                .map(|e| (e.id, e))
                .collect(),
        }
    }
}
