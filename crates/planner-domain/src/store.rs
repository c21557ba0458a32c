use async_trait::async_trait;
use planner_core::{EdgeId, PlannerResult};
use serde::{Deserialize, Serialize};

use crate::dependencies::DependencyEdge;
use crate::{ProjectId, Task, TaskId};

/// Read access to tasks owned by an external system
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fails with `NotFound` for an unknown id
    async fn get_task(&self, task_id: TaskId) -> PlannerResult<Task>;

    async fn tasks_by_project(&self, project_id: ProjectId) -> PlannerResult<Vec<Task>>;
}

/// Persistence for dependency edges
///
/// Implementations return owned copies so callers work on a snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EdgeStore: Send + Sync {
    async fn load_edges(
        &self,
        project_id: ProjectId,
        include_inactive: bool,
    ) -> PlannerResult<Vec<DependencyEdge>>;

    async fn get_edge(&self, edge_id: EdgeId) -> PlannerResult<Option<DependencyEdge>>;

    /// Insert or replace one edge
    async fn save_edge(&self, edge: &DependencyEdge) -> PlannerResult<()>;

    /// Insert or replace several edges; either all are stored or none
    async fn save_edges(&self, edges: &[DependencyEdge]) -> PlannerResult<()>;

    /// Returns whether the edge existed
    async fn delete_edge(&self, edge_id: EdgeId) -> PlannerResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
    Deactivated,
    Reactivated,
}

/// Emitted after a dependency mutation has been persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChange {
    pub edge_id: EdgeId,
    pub project_id: ProjectId,
    pub kind: ChangeKind,
}
