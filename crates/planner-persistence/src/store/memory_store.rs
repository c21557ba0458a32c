use async_trait::async_trait;
use planner_core::{EdgeId, PlannerResult};
use planner_domain::{DependencyEdge, EdgeStore, ProjectId, Task, TaskId, TaskStore};
use tokio::sync::RwLock;

use crate::tables::Tables;

/// Process-local store, mainly for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut tables = Tables::default();
        for task in tasks {
            tables.upsert_task(task);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn insert_task(&self, task: Task) {
        self.tables.write().await.upsert_task(task);
    }

    pub async fn update_task<F>(&self, task_id: TaskId, change: F) -> PlannerResult<Task>
    where
        F: FnOnce(&mut Task) + Send,
    {
        self.tables.write().await.update_task(task_id, change)
    }

    /// Store edges without any validation, as an import would
    pub async fn import_edges(&self, edges: &[DependencyEdge]) {
        self.tables.write().await.upsert_edges(edges);
    }

    pub async fn edge_count(&self) -> usize {
        self.tables.read().await.edge_count()
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn get_task(&self, task_id: TaskId) -> PlannerResult<Task> {
        self.tables.read().await.get_task(task_id)
    }

    async fn tasks_by_project(&self, project_id: ProjectId) -> PlannerResult<Vec<Task>> {
        Ok(self.tables.read().await.tasks_by_project(project_id))
    }
}

#[async_trait]
impl EdgeStore for InMemoryStore {
    async fn load_edges(
        &self,
        project_id: ProjectId,
        include_inactive: bool,
    ) -> PlannerResult<Vec<DependencyEdge>> {
        Ok(self
            .tables
            .read()
            .await
            .load_edges(project_id, include_inactive))
    }

    async fn get_edge(&self, edge_id: EdgeId) -> PlannerResult<Option<DependencyEdge>> {
        Ok(self.tables.read().await.get_edge(edge_id))
    }

    async fn save_edge(&self, edge: &DependencyEdge) -> PlannerResult<()> {
        self.tables.write().await.upsert_edges([edge]);
        Ok(())
    }

    async fn save_edges(&self, edges: &[DependencyEdge]) -> PlannerResult<()> {
        self.tables.write().await.upsert_edges(edges);
        Ok(())
    }

    async fn delete_edge(&self, edge_id: EdgeId) -> PlannerResult<bool> {
        Ok(self.tables.write().await.delete_edge(edge_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_domain::{DependencyKind, DependencySpec};
    use uuid::Uuid;

    fn project() -> ProjectId {
        Uuid::from_u128(1)
    }

    fn task(title: &str) -> Task {
        Task::new(project(), title.to_string(), Some(4.0))
    }

    #[tokio::test]
    async fn test_project_filtering() {
        let a = task("A");
        let b = task("B");
        let mut other = task("Other");
        other.project_id = Uuid::from_u128(2);
        let store = InMemoryStore::with_tasks([a.clone(), b.clone(), other]);

        let tasks = store.tasks_by_project(project()).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(store.get_task(a.id).await.unwrap().title, "A");
        assert!(store.get_task(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_inactive_edges_are_filtered() {
        let a = task("A");
        let b = task("B");
        let store = InMemoryStore::with_tasks([a.clone(), b.clone()]);

        let mut edge = DependencySpec::new(b.id, a.id, DependencyKind::FinishToStart)
            .to_edge(Uuid::new_v4(), project());
        store.save_edge(&edge).await.unwrap();
        assert_eq!(store.load_edges(project(), false).await.unwrap().len(), 1);

        edge.archive();
        store.save_edge(&edge).await.unwrap();
        assert!(store.load_edges(project(), false).await.unwrap().is_empty());
        assert_eq!(store.load_edges(project(), true).await.unwrap().len(), 1);

        assert!(store.delete_edge(edge.id).await.unwrap());
        assert!(!store.delete_edge(edge.id).await.unwrap());
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_task_reports_unknown_ids() {
        let store = InMemoryStore::new();
        let err = store
            .update_task(Uuid::new_v4(), |t| t.complete())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Not found"));
    }
}
