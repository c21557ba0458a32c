use std::path::Path;
use std::sync::Arc;

use planner_core::{EngineConfig, PlannerResult};
use planner_domain::{DependencyService, ProjectId, Task, TaskId, TaskStore};
use planner_persistence::JsonFileStore;

pub type FileService = DependencyService<JsonFileStore, JsonFileStore>;

/// One CLI invocation's view of a planner file
pub struct CliContext {
    pub project_id: ProjectId,
    pub service: FileService,
    store: Arc<JsonFileStore>,
}

impl CliContext {
    pub async fn load(
        file_path: &Path,
        project_id: ProjectId,
        config: EngineConfig,
    ) -> PlannerResult<Self> {
        let store = Arc::new(JsonFileStore::open(file_path).await?);
        let service = DependencyService::new(store.clone(), store.clone(), config);
        Ok(Self {
            project_id,
            service,
            store,
        })
    }

    pub async fn add_task(&self, title: String, hours: Option<f64>) -> PlannerResult<Task> {
        let task = Task::new(self.project_id, title, hours);
        self.store.insert_task(task.clone()).await?;
        tracing::info!("Added task {} to project {}", task.id, self.project_id);
        Ok(task)
    }

    pub async fn task(&self, task_id: TaskId) -> PlannerResult<Task> {
        self.store.get_task(task_id).await
    }

    pub async fn list_tasks(&self) -> PlannerResult<Vec<Task>> {
        self.store.tasks_by_project(self.project_id).await
    }

    pub async fn complete_task(&self, task_id: TaskId) -> PlannerResult<Task> {
        self.store.update_task(task_id, |task| task.complete()).await
    }

    pub async fn set_progress(&self, task_id: TaskId, percent: u8) -> PlannerResult<Task> {
        self.store
            .update_task(task_id, |task| task.set_progress(percent))
            .await
    }
}
