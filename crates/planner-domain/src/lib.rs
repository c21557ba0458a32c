pub mod commands;
pub mod dependencies;
pub mod field_update;
pub mod schedule;
pub mod service;
pub mod store;
pub mod task;
pub mod validation;

pub use dependencies::{
    DependencyEdge, DependencyGraph, DependencyGraphExt, DependencyKind, DependencyLink,
    DependencySpec, DependencyUpdate, TimeWindow,
};
pub use field_update::FieldUpdate;
pub use schedule::{
    BlockedTask, OptimizationResult, RiskAssessment, RiskLevel, RiskMetrics, ScheduleSnapshot,
    TaskTiming,
};
pub use service::DependencyService;
pub use store::{ChangeKind, DependencyChange, EdgeStore, TaskStore};
pub use task::{ProjectId, Task, TaskId};
pub use validation::DependencyValidationResult;
