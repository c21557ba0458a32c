use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use planner_core::{Cancellation, EngineConfig, PlannerResult};
use serde::{Deserialize, Serialize};

use super::{CriticalPathCalculator, ScheduleSnapshot};
use crate::dependencies::{DependencyGraph, DependencyGraphExt};
use crate::{Task, TaskId};

/// Advisory output; nothing here is applied to the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub recommendations: Vec<String>,
    /// Task id -> hours the task can shift without moving the finish date
    pub suggested_adjustments: BTreeMap<TaskId, f64>,
    /// Estimated hours saved if every recommendation were applied
    pub potential_reduction: f64,
    pub baseline_duration: f64,
}

pub struct ScheduleOptimizer<'a> {
    tasks: &'a [Task],
    graph: &'a DependencyGraph,
    config: &'a EngineConfig,
}

impl<'a> ScheduleOptimizer<'a> {
    pub fn new(tasks: &'a [Task], graph: &'a DependencyGraph, config: &'a EngineConfig) -> Self {
        Self {
            tasks,
            graph,
            config,
        }
    }

    pub fn optimize(&self, cancel: &Cancellation) -> PlannerResult<OptimizationResult> {
        let baseline =
            CriticalPathCalculator::new(self.tasks, self.graph, self.config).calculate(cancel)?;
        let titles: HashMap<TaskId, &str> =
            self.tasks.iter().map(|t| (t.id, t.title.as_str())).collect();
        let title = |id: &TaskId| titles.get(id).copied().unwrap_or("?");

        let mut recommendations = Vec::new();
        let mut suggested_adjustments = BTreeMap::new();
        let mut hypothetical = CriticalPathCalculator::new(self.tasks, self.graph, self.config);

        for task_id in self.feeders(&baseline) {
            let float = baseline.float_of(task_id).unwrap_or(0.0);
            recommendations.push(format!(
                "'{}' has {:.1}h of float and feeds the critical path; it can be re-timed by up to {:.1}h",
                title(&task_id),
                float,
                float
            ));
            suggested_adjustments.insert(task_id, float);
        }

        let long: HashSet<TaskId> = baseline
            .critical_path
            .iter()
            .copied()
            .filter(|id| {
                baseline
                    .timing(*id)
                    .is_some_and(|t| t.duration >= self.config.long_task_hours)
            })
            .collect();
        let (runs, singles) = long_runs(&baseline, self.graph, &long);
        for run in &runs {
            let hours: f64 = run
                .iter()
                .filter_map(|id| baseline.timing(*id))
                .map(|t| t.duration)
                .sum();
            let names: Vec<&str> = run.iter().map(title).collect();
            recommendations.push(format!(
                "Critical chain {} spans {:.1}h; consider splitting or parallelizing its tasks",
                names.join(" -> "),
                hours
            ));
        }
        for task_id in &singles {
            let hours = baseline.timing(*task_id).map_or(0.0, |t| t.duration);
            recommendations.push(format!(
                "Critical task '{}' takes {:.1}h; consider breaking it into smaller tasks",
                title(task_id),
                hours
            ));
        }
        for task_id in &long {
            if let Some(timing) = baseline.timing(*task_id) {
                let split = timing.duration * self.config.split_factor;
                hypothetical = hypothetical.with_duration(*task_id, split);
            }
        }

        for edge_id in &baseline.critical_edges {
            let Some(edge) = self.graph.get(*edge_id) else {
                continue;
            };
            if edge.attrs.lag_hours >= self.config.lag_review_hours {
                recommendations.push(format!(
                    "Review the {:.1}h lag on '{}' -> '{}'",
                    edge.attrs.lag_hours,
                    title(&edge.source),
                    title(&edge.target)
                ));
                hypothetical = hypothetical.with_lag(edge.id, 0.0);
            }
        }

        let external = self.graph.external_constraints(self.config.external_lag_hours);
        if !external.is_empty() {
            recommendations.push(format!(
                "Start procurement/ordering early for {} external dependencies",
                external.len()
            ));
        }

        let improved = hypothetical.calculate(cancel)?;
        let potential_reduction = (baseline.total_duration - improved.total_duration).max(0.0);

        Ok(OptimizationResult {
            recommendations,
            suggested_adjustments,
            potential_reduction,
            baseline_duration: baseline.total_duration,
        })
    }

    /// Tasks with float whose transitive successors include a critical task
    fn feeders(&self, baseline: &ScheduleSnapshot) -> Vec<TaskId> {
        let tolerance = self.config.float_tolerance;
        baseline
            .order
            .iter()
            .copied()
            .filter(|id| baseline.float_of(*id).is_some_and(|f| f > tolerance))
            .filter(|id| {
                self.graph
                    .all_successors(*id)
                    .iter()
                    .any(|succ| baseline.is_critical(*succ))
            })
            .collect()
    }
}

/// Group long critical tasks joined by critical edges into runs
///
/// A run is a connected group of long tasks linked by critical edges, listed
/// in topological order. Runs of two or more tasks are returned first; long
/// tasks that belong to no such run come back individually, in topological
/// order.
fn long_runs(
    baseline: &ScheduleSnapshot,
    graph: &DependencyGraph,
    long: &HashSet<TaskId>,
) -> (Vec<Vec<TaskId>>, Vec<TaskId>) {
    let mut linked: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for edge in baseline.critical_edges.iter().filter_map(|id| graph.get(*id)) {
        if long.contains(&edge.source) && long.contains(&edge.target) {
            linked.entry(edge.source).or_default().push(edge.target);
            linked.entry(edge.target).or_default().push(edge.source);
        }
    }

    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut runs = Vec::new();
    let mut singles = Vec::new();
    for &task_id in baseline.critical_path.iter().filter(|id| long.contains(id)) {
        if !seen.insert(task_id) {
            continue;
        }
        let mut members = BTreeSet::from([task_id]);
        let mut queue = vec![task_id];
        while let Some(current) = queue.pop() {
            for next in linked.get(&current).into_iter().flatten() {
                if seen.insert(*next) {
                    members.insert(*next);
                    queue.push(*next);
                }
            }
        }

        if members.len() > 1 {
            let run: Vec<TaskId> = baseline
                .critical_path
                .iter()
                .copied()
                .filter(|id| members.contains(id))
                .collect();
            runs.push(run);
        } else {
            singles.push(task_id);
        }
    }

    (runs, singles)
}
