use std::collections::BTreeSet;

use planner_core::graph::algorithms;
use planner_core::{Cancellation, EngineConfig, PlannerResult};
use serde::{Deserialize, Serialize};

use super::{CriticalPathCalculator, ReadinessAnalyzer};
use crate::dependencies::{DependencyGraph, DependencyGraphExt};
use crate::{Task, TaskId};

/// Share of the critical path length above which blocked tasks are a risk
const BLOCKED_SHARE_LIMIT: f64 = 0.3;
/// Share of zero-float tasks above which the schedule is considered brittle
const ZERO_FLOAT_SHARE_LIMIT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    fn from_factors(has_cycles: bool, factor_count: usize) -> Self {
        if has_cycles {
            Self::Critical
        } else if factor_count >= 3 {
            Self::High
        } else if factor_count >= 1 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub cycle_count: usize,
    pub external_constraint_count: usize,
    pub blocked_task_count: usize,
    /// Unset when cycles prevent a critical path calculation
    pub critical_path_length: Option<usize>,
    pub project_duration: Option<f64>,
    pub zero_float_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
    pub high_risk_tasks: Vec<TaskId>,
    pub metrics: RiskMetrics,
}

pub struct RiskAssessor<'a> {
    tasks: &'a [Task],
    graph: &'a DependencyGraph,
    config: &'a EngineConfig,
}

impl<'a> RiskAssessor<'a> {
    pub fn new(tasks: &'a [Task], graph: &'a DependencyGraph, config: &'a EngineConfig) -> Self {
        Self {
            tasks,
            graph,
            config,
        }
    }

    /// Score the project's schedule risk
    ///
    /// A cyclic graph is not an error here: it yields a `Critical`
    /// assessment listing the cycle members, with the CPM metrics left
    /// unset. Only cancellation and unknown-task edges fail the call.
    pub fn assess(&self, cancel: &Cancellation) -> PlannerResult<RiskAssessment> {
        let mut factors = Vec::new();
        let mut high_risk: BTreeSet<TaskId> = BTreeSet::new();
        let mut metrics = RiskMetrics::default();

        let cycles = algorithms::find_cycles(&self.graph.adjacency_list(), cancel)?;
        metrics.cycle_count = cycles.len();
        if !cycles.is_empty() {
            factors.push(format!(
                "Circular dependencies detected ({} cycle(s))",
                cycles.len()
            ));
            high_risk.extend(cycles.iter().flatten().copied());
        }

        let external = self
            .graph
            .external_constraints(self.config.risk_external_lag_hours);
        metrics.external_constraint_count = external.len();
        if !external.is_empty() {
            factors.push(format!(
                "{} external dependencies with significant lead times",
                external.len()
            ));
            high_risk.extend(external.iter().map(|e| e.target));
        }

        let blocked = ReadinessAnalyzer::new(self.tasks, self.graph).blocked_tasks()?;
        metrics.blocked_task_count = blocked.len();

        if cycles.is_empty() {
            let snapshot =
                CriticalPathCalculator::new(self.tasks, self.graph, self.config).calculate(cancel)?;
            let critical_len = snapshot.critical_path.len();
            let zero_float_ratio = snapshot.zero_float_ratio();
            metrics.critical_path_length = Some(critical_len);
            metrics.project_duration = Some(snapshot.total_duration);
            metrics.zero_float_ratio = Some(zero_float_ratio);

            if blocked.len() as f64 > critical_len as f64 * BLOCKED_SHARE_LIMIT {
                factors.push(format!(
                    "High share of blocked tasks ({} blocked, critical path of {})",
                    blocked.len(),
                    critical_len
                ));
            }
            if zero_float_ratio > ZERO_FLOAT_SHARE_LIMIT {
                factors.push(format!(
                    "{:.0}% of tasks have no float",
                    zero_float_ratio * 100.0
                ));
            }
        }

        Ok(RiskAssessment {
            level: RiskLevel::from_factors(!cycles.is_empty(), factors.len()),
            factors,
            high_risk_tasks: high_risk.into_iter().collect(),
            metrics,
        })
    }
}
