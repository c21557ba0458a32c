//! Scheduling analyses over a project's dependency graph
//!
//! Everything here is read-only: results are derived from a task snapshot and
//! a graph, and are recomputed rather than cached.

pub mod cpm;
pub mod optimizer;
pub mod readiness;
pub mod risk;

use std::collections::BTreeMap;

use planner_core::EdgeId;
use serde::{Deserialize, Serialize};

use crate::TaskId;

pub use cpm::CriticalPathCalculator;
pub use optimizer::{OptimizationResult, ScheduleOptimizer};
pub use readiness::{BlockedTask, ReadinessAnalyzer};
pub use risk::{RiskAssessment, RiskAssessor, RiskLevel, RiskMetrics};

/// CPM timings of one task, in hours from the project epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskTiming {
    pub duration: f64,
    pub earliest_start: f64,
    pub earliest_finish: f64,
    pub latest_start: f64,
    pub latest_finish: f64,
    pub total_float: f64,
    pub critical: bool,
}

/// Full result of a critical path calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub timings: BTreeMap<TaskId, TaskTiming>,
    /// All tasks in the order the forward pass visited them
    pub order: Vec<TaskId>,
    /// Critical tasks in topological order
    pub critical_path: Vec<TaskId>,
    /// Chains of critical edges from a critical start to a critical end,
    /// at most `max_critical_chains` of them
    pub critical_chains: Vec<Vec<TaskId>>,
    /// Set when more chains exist than were listed
    pub critical_chains_truncated: bool,
    pub critical_edges: Vec<EdgeId>,
    pub total_duration: f64,
}

impl ScheduleSnapshot {
    pub fn timing(&self, task_id: TaskId) -> Option<&TaskTiming> {
        self.timings.get(&task_id)
    }

    pub fn is_critical(&self, task_id: TaskId) -> bool {
        self.timing(task_id).is_some_and(|t| t.critical)
    }

    pub fn float_of(&self, task_id: TaskId) -> Option<f64> {
        self.timing(task_id).map(|t| t.total_float)
    }

    pub fn is_critical_edge(&self, edge_id: EdgeId) -> bool {
        self.critical_edges.contains(&edge_id)
    }

    /// Share of tasks with zero float, 0.0 for an empty project
    pub fn zero_float_ratio(&self) -> f64 {
        if self.timings.is_empty() {
            return 0.0;
        }
        let critical = self.timings.values().filter(|t| t.critical).count();
        critical as f64 / self.timings.len() as f64
    }
}
