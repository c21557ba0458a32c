use std::collections::{BTreeMap, HashMap, HashSet};

use planner_core::graph::algorithms;
use planner_core::{AdjacencyList, Cancellation, EdgeId, EngineConfig, PlannerError, PlannerResult};

use super::{ScheduleSnapshot, TaskTiming};
use crate::dependencies::{DependencyEdge, DependencyGraph, TimeWindow};
use crate::{Task, TaskId};

/// Critical Path Method over one project's tasks and active dependencies
///
/// Durations and lags can be overridden to evaluate hypothetical schedules
/// without touching the inputs.
pub struct CriticalPathCalculator<'a> {
    tasks: &'a [Task],
    graph: &'a DependencyGraph,
    config: &'a EngineConfig,
    duration_overrides: HashMap<TaskId, f64>,
    lag_overrides: HashMap<EdgeId, f64>,
}

impl<'a> CriticalPathCalculator<'a> {
    pub fn new(tasks: &'a [Task], graph: &'a DependencyGraph, config: &'a EngineConfig) -> Self {
        Self {
            tasks,
            graph,
            config,
            duration_overrides: HashMap::new(),
            lag_overrides: HashMap::new(),
        }
    }

    pub fn with_duration(mut self, task_id: TaskId, hours: f64) -> Self {
        self.duration_overrides.insert(task_id, hours.max(0.0));
        self
    }

    pub fn with_lag(mut self, edge_id: EdgeId, hours: f64) -> Self {
        self.lag_overrides.insert(edge_id, hours);
        self
    }

    /// Run the forward and backward passes
    ///
    /// Fails with `NotFound` when an active edge references a task outside
    /// the snapshot and with `GraphInconsistent` when the active edges cycle.
    pub fn calculate(&self, cancel: &Cancellation) -> PlannerResult<ScheduleSnapshot> {
        let durations = self.durations();
        let edges = self.graph.active_edges();

        let mut adj_list: AdjacencyList = HashMap::new();
        let mut incoming: HashMap<TaskId, Vec<&DependencyEdge>> = HashMap::new();
        let mut outgoing: HashMap<TaskId, Vec<&DependencyEdge>> = HashMap::new();
        for &edge in &edges {
            for endpoint in [edge.source, edge.target] {
                if !durations.contains_key(&endpoint) {
                    return Err(PlannerError::not_found("task", endpoint));
                }
            }
            adj_list.entry(edge.source).or_default().push(edge.target);
            outgoing.entry(edge.source).or_default().push(edge);
            incoming.entry(edge.target).or_default().push(edge);
        }

        let nodes: Vec<TaskId> = durations.keys().copied().collect();
        let order = algorithms::topological_sort(&nodes, &adj_list, cancel)?;

        let mut early: HashMap<TaskId, TimeWindow> = HashMap::with_capacity(order.len());
        for &task_id in &order {
            cancel.check()?;
            let duration = durations[&task_id];
            let mut start = 0.0_f64;
            for edge in incoming.get(&task_id).into_iter().flatten() {
                let predecessor = early[&edge.source];
                let bound = edge
                    .attrs
                    .kind
                    .earliest_successor_start(predecessor, self.lag(edge), duration);
                start = start.max(bound);
            }
            early.insert(task_id, TimeWindow::new(start, start + duration));
        }

        let total_duration = early.values().map(|w| w.finish).fold(0.0, f64::max);

        let mut late: HashMap<TaskId, TimeWindow> = HashMap::with_capacity(order.len());
        for &task_id in order.iter().rev() {
            cancel.check()?;
            let duration = durations[&task_id];
            let mut finish = total_duration;
            for edge in outgoing.get(&task_id).into_iter().flatten() {
                let successor = late[&edge.target];
                let bound = edge
                    .attrs
                    .kind
                    .latest_predecessor_finish(successor, self.lag(edge), duration);
                finish = finish.min(bound);
            }
            late.insert(task_id, TimeWindow::new(finish - duration, finish));
        }

        let tolerance = self.config.float_tolerance;
        let timings = order
            .iter()
            .map(|&task_id| {
                let (e, l) = (early[&task_id], late[&task_id]);
                let total_float = l.start - e.start;
                let timing = TaskTiming {
                    duration: durations[&task_id],
                    earliest_start: e.start,
                    earliest_finish: e.finish,
                    latest_start: l.start,
                    latest_finish: l.finish,
                    total_float,
                    critical: total_float.abs() <= tolerance,
                };
                (task_id, timing)
            })
            .collect::<BTreeMap<_, _>>();

        let critical_edges: Vec<&DependencyEdge> = edges
            .iter()
            .copied()
            .filter(|edge| {
                let both_critical =
                    timings[&edge.source].critical && timings[&edge.target].critical;
                let bound = edge.attrs.kind.earliest_successor_start(
                    early[&edge.source],
                    self.lag(edge),
                    durations[&edge.target],
                );
                both_critical && (bound - early[&edge.target].start).abs() <= tolerance
            })
            .collect();

        let critical_path: Vec<TaskId> = order
            .iter()
            .copied()
            .filter(|id| timings[id].critical)
            .collect();
        let (critical_chains, critical_chains_truncated) = chains(
            &order,
            &critical_path,
            &critical_edges,
            self.config.max_critical_chains,
            cancel,
        )?;

        Ok(ScheduleSnapshot {
            timings,
            order,
            critical_path,
            critical_chains,
            critical_chains_truncated,
            critical_edges: critical_edges.iter().map(|e| e.id).collect(),
            total_duration,
        })
    }

    fn durations(&self) -> HashMap<TaskId, f64> {
        self.tasks
            .iter()
            .map(|task| {
                let hours = self
                    .duration_overrides
                    .get(&task.id)
                    .copied()
                    .unwrap_or_else(|| task.duration_hours(self.config.default_task_hours));
                (task.id, hours)
            })
            .collect()
    }

    fn lag(&self, edge: &DependencyEdge) -> f64 {
        self.lag_overrides
            .get(&edge.id)
            .copied()
            .unwrap_or(edge.attrs.lag_hours)
    }
}

/// List maximal paths over critical edges, stopping after `limit` of them
///
/// Chains start at critical tasks without an incoming critical edge. A
/// critical task touching no critical edge forms a chain on its own. The
/// search is depth-first, so the work is bounded by `limit` descents. The
/// flag reports whether chains were left out.
fn chains(
    order: &[TaskId],
    critical_path: &[TaskId],
    critical_edges: &[&DependencyEdge],
    limit: usize,
    cancel: &Cancellation,
) -> PlannerResult<(Vec<Vec<TaskId>>, bool)> {
    let position: HashMap<TaskId, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut next: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut has_incoming: HashSet<TaskId> = HashSet::new();
    for edge in critical_edges {
        next.entry(edge.source).or_default().push(edge.target);
        has_incoming.insert(edge.target);
    }
    for targets in next.values_mut() {
        targets.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));
    }

    let mut result = Vec::new();
    for start in critical_path.iter().filter(|id| !has_incoming.contains(*id)) {
        let mut stack = vec![vec![*start]];
        while let Some(path) = stack.pop() {
            cancel.check()?;
            let Some(&last) = path.last() else {
                continue;
            };
            match next.get(&last) {
                Some(targets) if !targets.is_empty() => {
                    for target in targets.iter().rev() {
                        let mut extended = path.clone();
                        extended.push(*target);
                        stack.push(extended);
                    }
                }
                _ => {
                    if result.len() == limit {
                        return Ok((result, true));
                    }
                    result.push(path);
                }
            }
        }
    }

    Ok((result, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::{DependencyKind, DependencySpec};
    use uuid::Uuid;

    const EPS: f64 = 1e-9;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn project() -> Uuid {
        Uuid::from_u128(500)
    }

    fn task(n: u128, hours: f64) -> Task {
        Task::new(project(), format!("T{}", n), Some(hours)).with_id(id(n))
    }

    fn link(
        graph: &mut DependencyGraph,
        pred: u128,
        succ: u128,
        kind: DependencyKind,
        lag: f64,
    ) -> EdgeId {
        let edge_id = Uuid::new_v4();
        let edge = DependencySpec::new(id(succ), id(pred), kind)
            .with_lag(lag)
            .to_edge(edge_id, project());
        graph.add_edge(edge).unwrap();
        edge_id
    }

    fn fs(graph: &mut DependencyGraph, pred: u128, succ: u128) -> EdgeId {
        link(graph, pred, succ, DependencyKind::FinishToStart, 0.0)
    }

    fn run(tasks: &[Task], graph: &DependencyGraph) -> PlannerResult<ScheduleSnapshot> {
        let config = EngineConfig::default();
        CriticalPathCalculator::new(tasks, graph, &config).calculate(&Cancellation::new())
    }

    /// A(2) -> B(3), A -> C(1), B -> D(2), C -> D
    fn diamond() -> (Vec<Task>, DependencyGraph) {
        let tasks = vec![task(1, 2.0), task(2, 3.0), task(3, 1.0), task(4, 2.0)];
        let mut graph = DependencyGraph::new();
        fs(&mut graph, 1, 2);
        fs(&mut graph, 1, 3);
        fs(&mut graph, 2, 4);
        fs(&mut graph, 3, 4);
        (tasks, graph)
    }

    #[test]
    fn test_diamond_scenario() {
        let (tasks, graph) = diamond();
        let snapshot = run(&tasks, &graph).unwrap();

        let t = |n| *snapshot.timing(id(n)).unwrap();
        assert_eq!(t(1).earliest_finish, 2.0);
        assert_eq!(t(2).earliest_start, 2.0);
        assert_eq!(t(3).earliest_start, 2.0);
        assert_eq!(t(2).earliest_finish, 5.0);
        assert_eq!(t(3).earliest_finish, 3.0);
        assert_eq!(t(4).earliest_start, 5.0);
        assert_eq!(snapshot.total_duration, 7.0);
        assert_eq!(snapshot.critical_path, vec![id(1), id(2), id(4)]);
        assert_eq!(snapshot.critical_chains, vec![vec![id(1), id(2), id(4)]]);
        assert!((t(3).total_float - 2.0).abs() < EPS);
        assert_eq!(snapshot.critical_edges.len(), 2);
    }

    #[test]
    fn test_linear_chain_is_fully_critical() {
        let tasks: Vec<Task> = (1..=5).map(|n| task(n, 4.0)).collect();
        let mut graph = DependencyGraph::new();
        for n in 1..5 {
            fs(&mut graph, n, n + 1);
        }

        let snapshot = run(&tasks, &graph).unwrap();
        assert_eq!(snapshot.total_duration, 20.0);
        assert!(snapshot.timings.values().all(|t| t.total_float.abs() < EPS));
        let expected: Vec<Uuid> = (1..=5).map(id).collect();
        assert_eq!(snapshot.critical_path, expected);
        assert_eq!(snapshot.critical_chains, vec![expected]);
        assert_eq!(snapshot.critical_edges.len(), 4);
    }

    #[test]
    fn test_unconnected_tasks_start_at_epoch() {
        let tasks = vec![task(1, 3.0), task(2, 5.0)];
        let snapshot = run(&tasks, &DependencyGraph::new()).unwrap();

        assert_eq!(snapshot.total_duration, 5.0);
        assert_eq!(snapshot.timing(id(1)).unwrap().earliest_start, 0.0);
        assert_eq!(snapshot.float_of(id(1)), Some(2.0));
        assert_eq!(snapshot.critical_chains, vec![vec![id(2)]]);
    }

    #[test]
    fn test_empty_project() {
        let snapshot = run(&[], &DependencyGraph::new()).unwrap();
        assert_eq!(snapshot.total_duration, 0.0);
        assert!(snapshot.critical_path.is_empty());
        assert_eq!(snapshot.zero_float_ratio(), 0.0);
    }

    #[test]
    fn test_default_duration_applies_without_estimate() {
        let unestimated = Task::new(project(), "Unknown".to_string(), None).with_id(id(1));
        let snapshot = run(&[unestimated], &DependencyGraph::new()).unwrap();
        assert_eq!(snapshot.total_duration, 8.0);
    }

    #[test]
    fn test_lag_delays_successor() {
        let tasks = vec![task(1, 2.0), task(2, 2.0)];
        let mut graph = DependencyGraph::new();
        link(&mut graph, 1, 2, DependencyKind::FinishToStart, 3.0);

        let snapshot = run(&tasks, &graph).unwrap();
        assert_eq!(snapshot.timing(id(2)).unwrap().earliest_start, 5.0);
        assert_eq!(snapshot.total_duration, 7.0);
        assert_eq!(snapshot.critical_path, vec![id(1), id(2)]);
    }

    #[test]
    fn test_negative_lag_is_clamped_at_epoch() {
        let tasks = vec![task(1, 2.0), task(2, 2.0)];
        let mut graph = DependencyGraph::new();
        link(&mut graph, 1, 2, DependencyKind::StartToStart, -5.0);

        let snapshot = run(&tasks, &graph).unwrap();
        assert_eq!(snapshot.timing(id(2)).unwrap().earliest_start, 0.0);
        assert_eq!(snapshot.total_duration, 2.0);
    }

    #[test]
    fn test_start_to_start_with_lag() {
        let tasks = vec![task(1, 4.0), task(2, 2.0)];
        let mut graph = DependencyGraph::new();
        link(&mut graph, 1, 2, DependencyKind::StartToStart, 1.0);

        let snapshot = run(&tasks, &graph).unwrap();
        let b = snapshot.timing(id(2)).unwrap();
        assert_eq!(b.earliest_start, 1.0);
        assert_eq!(snapshot.total_duration, 4.0);
        assert!((b.total_float - 1.0).abs() < EPS);
        assert!(snapshot.is_critical(id(1)));
        assert!(snapshot.critical_edges.is_empty());
    }

    #[test]
    fn test_finish_to_finish_aligns_finishes() {
        let tasks = vec![task(1, 4.0), task(2, 2.0)];
        let mut graph = DependencyGraph::new();
        let edge = link(&mut graph, 1, 2, DependencyKind::FinishToFinish, 0.0);

        let snapshot = run(&tasks, &graph).unwrap();
        let b = snapshot.timing(id(2)).unwrap();
        assert_eq!(b.earliest_start, 2.0);
        assert_eq!(b.earliest_finish, 4.0);
        assert!(snapshot.is_critical_edge(edge));
        assert_eq!(snapshot.critical_chains, vec![vec![id(1), id(2)]]);
    }

    #[test]
    fn test_start_to_finish() {
        let tasks = vec![task(1, 3.0), task(2, 5.0), task(3, 10.0)];
        let mut graph = DependencyGraph::new();
        fs(&mut graph, 3, 1);
        link(&mut graph, 1, 2, DependencyKind::StartToFinish, 0.0);

        let snapshot = run(&tasks, &graph).unwrap();
        let b = snapshot.timing(id(2)).unwrap();
        // B must finish no earlier than A starts (10)
        assert_eq!(b.earliest_start, 5.0);
        assert_eq!(b.earliest_finish, 10.0);
        assert_eq!(snapshot.total_duration, 13.0);
    }

    #[test]
    fn test_parallel_equal_paths_report_every_chain() {
        let tasks = vec![task(1, 1.0), task(2, 2.0), task(3, 2.0), task(4, 1.0)];
        let mut graph = DependencyGraph::new();
        fs(&mut graph, 1, 2);
        fs(&mut graph, 1, 3);
        fs(&mut graph, 2, 4);
        fs(&mut graph, 3, 4);

        let snapshot = run(&tasks, &graph).unwrap();
        assert_eq!(
            snapshot.critical_chains,
            vec![vec![id(1), id(2), id(4)], vec![id(1), id(3), id(4)]]
        );
        assert_eq!(snapshot.critical_path, vec![id(1), id(2), id(3), id(4)]);
    }

    #[test]
    fn test_layered_diamonds_cap_chain_listing() {
        // hub_i -> {a_i, b_i} -> hub_{i+1}: 2^layers equally long paths
        let layers = 40u128;
        let hub = |i: u128| 1000 + i;
        let mut tasks = vec![task(hub(0), 1.0)];
        let mut graph = DependencyGraph::new();
        for i in 0..layers {
            for branch in [2 * i + 1, 2 * i + 2] {
                tasks.push(task(branch, 1.0));
                fs(&mut graph, hub(i), branch);
                fs(&mut graph, branch, hub(i + 1));
            }
            tasks.push(task(hub(i + 1), 1.0));
        }

        let config = EngineConfig {
            max_critical_chains: 8,
            ..EngineConfig::default()
        };
        let snapshot = CriticalPathCalculator::new(&tasks, &graph, &config)
            .calculate(&Cancellation::new())
            .unwrap();

        assert_eq!(snapshot.total_duration, (2 * layers + 1) as f64);
        assert_eq!(snapshot.critical_path.len(), tasks.len());
        assert_eq!(snapshot.critical_edges.len(), (4 * layers) as usize);
        assert_eq!(snapshot.critical_chains.len(), 8);
        assert!(snapshot.critical_chains_truncated);
        for chain in &snapshot.critical_chains {
            assert_eq!(chain.len(), (2 * layers + 1) as usize);
            assert_eq!(chain.first(), Some(&id(hub(0))));
            assert_eq!(chain.last(), Some(&id(hub(layers))));
        }
    }

    #[test]
    fn test_chain_listing_within_limit_is_not_truncated() {
        let (tasks, graph) = diamond();
        let snapshot = run(&tasks, &graph).unwrap();
        assert!(!snapshot.critical_chains_truncated);
    }

    #[test]
    fn test_cycle_is_graph_inconsistent() {
        let tasks = vec![task(1, 1.0), task(2, 1.0), task(3, 1.0)];
        let mut graph = DependencyGraph::new();
        fs(&mut graph, 1, 2);
        fs(&mut graph, 2, 3);
        fs(&mut graph, 3, 2);

        match run(&tasks, &graph).unwrap_err() {
            PlannerError::GraphInconsistent { remaining } => {
                assert_eq!(remaining, vec![id(2), id(3)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_edge_to_unknown_task_is_not_found() {
        let tasks = vec![task(1, 1.0)];
        let mut graph = DependencyGraph::new();
        fs(&mut graph, 1, 9);

        assert!(matches!(
            run(&tasks, &graph).unwrap_err(),
            PlannerError::NotFound(_)
        ));
    }

    #[test]
    fn test_inactive_edges_are_ignored() {
        let (tasks, mut graph) = diamond();
        let extra = fs(&mut graph, 3, 2);
        graph.archive_edge(extra).unwrap();

        let snapshot = run(&tasks, &graph).unwrap();
        assert_eq!(snapshot.total_duration, 7.0);
    }

    #[test]
    fn test_slack_edge_leaves_existing_floats_alone() {
        let (mut tasks, mut graph) = diamond();
        let before = run(&tasks, &graph).unwrap();

        tasks.push(task(5, 1.0));
        fs(&mut graph, 1, 5);
        let after = run(&tasks, &graph).unwrap();

        for n in 1..=4 {
            assert_eq!(before.float_of(id(n)), after.float_of(id(n)));
        }
        assert_eq!(after.total_duration, 7.0);
    }

    #[test]
    fn test_edge_onto_new_critical_path_consumes_float() {
        let (tasks, mut graph) = diamond();
        let edge = fs(&mut graph, 3, 2);

        let snapshot = run(&tasks, &graph).unwrap();
        assert_eq!(snapshot.total_duration, 8.0);
        assert!(snapshot.is_critical(id(3)));
        assert!(snapshot.is_critical_edge(edge));
        assert_eq!(snapshot.critical_path, vec![id(1), id(3), id(2), id(4)]);
    }

    #[test]
    fn test_overrides_do_not_touch_inputs() {
        let (tasks, graph) = diamond();
        let config = EngineConfig::default();
        let snapshot = CriticalPathCalculator::new(&tasks, &graph, &config)
            .with_duration(id(2), 1.0)
            .calculate(&Cancellation::new())
            .unwrap();

        assert_eq!(snapshot.total_duration, 5.0);
        assert_eq!(tasks[1].estimated_hours, Some(3.0));
    }

    #[test]
    fn test_cancelled_calculation() {
        let (tasks, graph) = diamond();
        let config = EngineConfig::default();
        let cancel = Cancellation::new();
        cancel.cancel();

        let err = CriticalPathCalculator::new(&tasks, &graph, &config)
            .calculate(&cancel)
            .unwrap_err();
        assert!(matches!(err, PlannerError::Cancelled));
    }
}
