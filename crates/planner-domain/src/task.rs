use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;
pub type ProjectId = Uuid;

/// Read-only view of a task as supplied by the task store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    /// Estimated effort in hours; `None` falls back to the configured default
    pub estimated_hours: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(project_id: ProjectId, title: String, estimated_hours: Option<f64>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title,
            estimated_hours: estimated_hours.map(|hours| hours.max(0.0)),
            start_date: None,
            end_date: None,
            completed: false,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Duration used for scheduling, never negative
    pub fn duration_hours(&self, default_hours: f64) -> f64 {
        self.estimated_hours.unwrap_or(default_hours).max(0.0)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Work has begun (some progress recorded, or already done)
    pub fn is_started(&self) -> bool {
        self.progress > 0 || self.completed
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        if self.progress == 100 {
            self.completed = true;
        }
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.completed = true;
        self.progress = 100;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_falls_back_to_default() {
        let project = Uuid::new_v4();
        let estimated = Task::new(project, "Wire harness".to_string(), Some(3.5));
        let unestimated = Task::new(project, "Paint frame".to_string(), None);

        assert_eq!(estimated.duration_hours(8.0), 3.5);
        assert_eq!(unestimated.duration_hours(8.0), 8.0);
    }

    #[test]
    fn test_negative_estimate_is_clamped() {
        let task = Task::new(Uuid::new_v4(), "Oops".to_string(), Some(-2.0));
        assert_eq!(task.duration_hours(8.0), 0.0);
    }

    #[test]
    fn test_progress_drives_started_and_completed() {
        let mut task = Task::new(Uuid::new_v4(), "Build gearbox".to_string(), Some(6.0));
        assert!(!task.is_started());

        task.set_progress(40);
        assert!(task.is_started());
        assert!(!task.is_completed());

        task.set_progress(150);
        assert_eq!(task.progress, 100);
        assert!(task.is_completed());
    }
}
