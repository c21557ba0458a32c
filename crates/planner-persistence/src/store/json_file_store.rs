use std::path::{Path, PathBuf};

use async_trait::async_trait;
use planner_core::{EdgeId, PlannerResult};
use planner_domain::{DependencyEdge, EdgeStore, ProjectId, Task, TaskId, TaskStore};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{JsonEnvelope, ProjectDocument};
use crate::store::atomic_writer::AtomicWriter;
use crate::tables::Tables;

/// JSON file-backed store
///
/// The file is read once on open and rewritten in full after every
/// mutation, while the write lock is held, so the file always matches the
/// in-memory state.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    tables: RwLock<Tables>,
}

impl JsonFileStore {
    /// Open a planner file, starting empty if it does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> PlannerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let bytes = AtomicWriter::read_all(&path).await?;
            let envelope = JsonEnvelope::from_bytes(&bytes)?;
            tracing::info!(
                "Loaded {} tasks and {} dependencies from {}",
                envelope.data.tasks.len(),
                envelope.data.dependencies.len(),
                path.display()
            );
            Tables::from(envelope.data)
        } else {
            tracing::debug!("No planner file at {}, starting empty", path.display());
            Tables::default()
        };

        Ok(Self {
            path,
            instance_id: Uuid::new_v4(),
            tables: RwLock::new(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub async fn exists(&self) -> bool {
        self.path.exists()
    }

    pub async fn document(&self) -> ProjectDocument {
        self.tables.read().await.to_document()
    }

    pub async fn all_tasks(&self) -> Vec<Task> {
        self.tables.read().await.all_tasks()
    }

    pub async fn insert_task(&self, task: Task) -> PlannerResult<()> {
        self.commit(|tables| tables.upsert_task(task)).await
    }

    /// Fails with `NotFound` without touching the file
    pub async fn update_task<F>(&self, task_id: TaskId, change: F) -> PlannerResult<Task>
    where
        F: FnOnce(&mut Task) + Send,
    {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let task = staged.update_task(task_id, change)?;
        self.flush(&staged).await?;
        *tables = staged;
        Ok(task)
    }

    /// Apply a change to a copy, write it, and only then make it visible
    async fn commit<F, R>(&self, change: F) -> PlannerResult<R>
    where
        F: FnOnce(&mut Tables) -> R + Send,
        R: Send,
    {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let result = change(&mut staged);
        self.flush(&staged).await?;
        *tables = staged;
        Ok(result)
    }

    async fn flush(&self, tables: &Tables) -> PlannerResult<()> {
        let envelope = JsonEnvelope::new(tables.to_document(), self.instance_id);
        let bytes = envelope.to_bytes()?;
        AtomicWriter::write_atomic(&self.path, &bytes).await?;
        tracing::debug!("Saved {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn get_task(&self, task_id: TaskId) -> PlannerResult<Task> {
        self.tables.read().await.get_task(task_id)
    }

    async fn tasks_by_project(&self, project_id: ProjectId) -> PlannerResult<Vec<Task>> {
        Ok(self.tables.read().await.tasks_by_project(project_id))
    }
}

#[async_trait]
impl EdgeStore for JsonFileStore {
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
        self.commit(|tables| tables.upsert_edges([edge])).await
    }

    async fn save_edges(&self, edges: &[DependencyEdge]) -> PlannerResult<()> {
        self.commit(|tables| tables.upsert_edges(edges)).await
    }

    async fn delete_edge(&self, edge_id: EdgeId) -> PlannerResult<bool> {
        self.commit(|tables| tables.delete_edge(edge_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_domain::{DependencyKind, DependencySpec};
    use tempfile::tempdir;

    fn project() -> ProjectId {
        Uuid::from_u128(42)
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("plan.json")).await.unwrap();

        assert!(!store.exists().await);
        assert!(store.all_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");

        let design = Task::new(project(), "Design".into(), Some(8.0));
        let build = Task::new(project(), "Build".into(), None);
        let edge = DependencySpec::new(build.id, design.id, DependencyKind::FinishToStart)
            .with_lag(2.0)
            .to_edge(Uuid::new_v4(), project());
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.insert_task(design.clone()).await.unwrap();
            store.insert_task(build.clone()).await.unwrap();
            store.save_edge(&edge).await.unwrap();
            store.update_task(design.id, |t| t.set_progress(40)).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.exists().await);
        assert_eq!(reopened.get_task(design.id).await.unwrap().progress, 40);
        assert_eq!(reopened.get_task(build.id).await.unwrap().estimated_hours, None);

        let edges = reopened.load_edges(project(), false).await.unwrap();
        assert_eq!(edges, vec![edge.clone()]);

        assert!(reopened.delete_edge(edge.id).await.unwrap());
        let again = JsonFileStore::open(&path).await.unwrap();
        assert!(again.get_edge(edge.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_to_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "{ definitely not a plan").unwrap();

        assert!(JsonFileStore::open(&path).await.is_err());
    }
}
