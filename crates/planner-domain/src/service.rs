use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use planner_core::{BatchFailure, Cancellation, EdgeId, EngineConfig, PlannerError, PlannerResult};
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use uuid::Uuid;

use crate::commands::{
    Command, CommandContext, CreateDependenciesCommand, CreateDependencyCommand,
    DeactivateDependencyCommand, MarkCriticalEdgesCommand, ReactivateDependencyCommand,
    RemoveDependencyCommand, UpdateDependencyCommand,
};
use crate::dependencies::{
    DependencyEdge, DependencyGraph, DependencyGraphExt, DependencyKind, DependencySpec,
    DependencyUpdate,
};
use crate::schedule::{
    BlockedTask, CriticalPathCalculator, OptimizationResult, ReadinessAnalyzer, RiskAssessment,
    RiskAssessor, ScheduleOptimizer, ScheduleSnapshot,
};
use crate::store::{ChangeKind, DependencyChange, EdgeStore, TaskStore};
use crate::validation::{validate_graph, DependencyValidationResult};
use crate::{ProjectId, Task, TaskId};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Project id -> mutation lock, for projects with work in flight
type ProjectLocks = Mutex<HashMap<ProjectId, Arc<AsyncMutex<()>>>>;

/// Entry point for dependency management and schedule analysis
///
/// Mutations of one project are serialized by a per-project lock held from
/// loading the graph until the result is persisted. Queries work on owned
/// snapshots and take no lock.
pub struct DependencyService<T, E> {
    tasks: Arc<T>,
    edges: Arc<E>,
    config: EngineConfig,
    locks: ProjectLocks,
    changes: broadcast::Sender<DependencyChange>,
}

impl<T: TaskStore, E: EdgeStore> DependencyService<T, E> {
    pub fn new(tasks: Arc<T>, edges: Arc<E>, config: EngineConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tasks,
            edges,
            config,
            locks: Mutex::new(HashMap::new()),
            changes,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Receive an event after every persisted dependency mutation
    pub fn subscribe(&self) -> broadcast::Receiver<DependencyChange> {
        self.changes.subscribe()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub async fn create_dependency(&self, spec: DependencySpec) -> PlannerResult<DependencyEdge> {
        self.create_dependency_with(spec, &Cancellation::new()).await
    }

    /// Validate and persist one dependency
    ///
    /// Checks run in order: both tasks exist, no self-reference, same
    /// project, no active duplicate, no cycle.
    pub async fn create_dependency_with(
        &self,
        spec: DependencySpec,
        cancel: &Cancellation,
    ) -> PlannerResult<DependencyEdge> {
        let successor = self.tasks.get_task(spec.successor_id).await?;
        let project_id = successor.project_id;
        let lock = self.project_lock(project_id);
        let _guard = lock.lock().await;

        let tasks = self.task_index(project_id, &[spec.predecessor_id]).await?;
        let mut graph = self.load_graph(project_id, true).await?;
        let edge_id = Uuid::new_v4();
        self.execute(
            &CreateDependencyCommand { edge_id, spec },
            &mut graph,
            &tasks,
            cancel,
        )?;

        let edge = stored(&graph, edge_id)?;
        self.edges.save_edge(&edge).await?;
        tracing::info!(
            "Created {} dependency {} ({} -> {})",
            edge.attrs.kind,
            edge.id,
            edge.source,
            edge.target
        );
        self.notify(edge.id, project_id, ChangeKind::Created);
        Ok(edge)
    }

    pub async fn create_dependencies(
        &self,
        specs: Vec<DependencySpec>,
    ) -> PlannerResult<Vec<DependencyEdge>> {
        self.create_dependencies_with(specs, &Cancellation::new())
            .await
    }

    /// Create a batch of dependencies, all or nothing
    ///
    /// The batch is validated as if every edge were added together. Any
    /// invalid entry fails the call with `ValidationFailed`, listing each
    /// rejected entry by its position in `specs`.
    pub async fn create_dependencies_with(
        &self,
        specs: Vec<DependencySpec>,
        cancel: &Cancellation,
    ) -> PlannerResult<Vec<DependencyEdge>> {
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let mut failures = Vec::new();
        let mut groups: BTreeMap<ProjectId, Vec<(usize, EdgeId, DependencySpec)>> =
            BTreeMap::new();
        for (index, spec) in specs.into_iter().enumerate() {
            match self.tasks.get_task(spec.successor_id).await {
                Ok(successor) => groups.entry(successor.project_id).or_default().push((
                    index,
                    Uuid::new_v4(),
                    spec,
                )),
                Err(err @ PlannerError::NotFound(_)) => {
                    failures.push(BatchFailure::new(index, err.to_string()))
                }
                Err(err) => return Err(err),
            }
        }

        // ascending project order keeps concurrent batches from deadlocking
        let locks: Vec<Arc<AsyncMutex<()>>> =
            groups.keys().map(|id| self.project_lock(*id)).collect();
        let mut _guards = Vec::with_capacity(locks.len());
        for lock in &locks {
            _guards.push(lock.lock().await);
        }

        let mut created: Vec<(usize, DependencyEdge)> = Vec::new();
        for (project_id, entries) in &groups {
            let predecessors: Vec<TaskId> =
                entries.iter().map(|(_, _, spec)| spec.predecessor_id).collect();
            let tasks = self.task_index(*project_id, &predecessors).await?;
            let mut graph = self.load_graph(*project_id, true).await?;
            let command = CreateDependenciesCommand {
                entries: entries
                    .iter()
                    .map(|(_, edge_id, spec)| (*edge_id, spec.clone()))
                    .collect(),
            };

            match self.execute(&command, &mut graph, &tasks, cancel) {
                Ok(()) => {
                    for (index, edge_id, _) in entries {
                        created.push((*index, stored(&graph, *edge_id)?));
                    }
                }
                Err(PlannerError::ValidationFailed {
                    failures: rejected,
                }) => {
                    failures.extend(rejected.into_iter().map(|failure| {
                        let index = entries.get(failure.index).map_or(failure.index, |e| e.0);
                        BatchFailure::new(index, failure.message)
                    }));
                }
                Err(err) => return Err(err),
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|f| f.index);
            tracing::warn!("Rejected dependency batch: {} invalid entries", failures.len());
            return Err(PlannerError::ValidationFailed { failures });
        }

        created.sort_by_key(|(index, _)| *index);
        let edges: Vec<DependencyEdge> = created.into_iter().map(|(_, edge)| edge).collect();
        self.edges.save_edges(&edges).await?;

        tracing::info!("Created {} dependencies in one batch", edges.len());
        for edge in &edges {
            self.notify(edge.id, edge.attrs.project_id, ChangeKind::Created);
        }
        Ok(edges)
    }

    /// Change kind, lag or notes; endpoints never change
    pub async fn update_dependency(
        &self,
        edge_id: EdgeId,
        update: DependencyUpdate,
    ) -> PlannerResult<DependencyEdge> {
        let existing = self
            .edges
            .get_edge(edge_id)
            .await?
            .ok_or_else(|| PlannerError::not_found("dependency", edge_id))?;
        if update.is_empty() {
            tracing::debug!("Nothing to update on dependency {}", edge_id);
            return Ok(existing);
        }
        let project_id = existing.attrs.project_id;
        let lock = self.project_lock(project_id);
        let _guard = lock.lock().await;

        let mut graph = self.load_graph(project_id, true).await?;
        self.execute(
            &UpdateDependencyCommand { edge_id, update },
            &mut graph,
            &HashMap::new(),
            &Cancellation::new(),
        )?;

        let edge = stored(&graph, edge_id)?;
        self.edges.save_edge(&edge).await?;
        tracing::info!("Updated dependency {}", edge_id);
        self.notify(edge_id, project_id, ChangeKind::Updated);
        Ok(edge)
    }

    /// Set the kind of several dependencies; unknown ids are skipped
    pub async fn update_dependency_kinds(
        &self,
        edge_ids: &[EdgeId],
        kind: DependencyKind,
    ) -> PlannerResult<usize> {
        let mut updated = 0;
        for edge_id in edge_ids {
            let update = DependencyUpdate {
                kind: Some(kind),
                ..Default::default()
            };
            match self.update_dependency(*edge_id, update).await {
                Ok(_) => updated += 1,
                Err(PlannerError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(updated)
    }

    /// Hard-delete a dependency; returns false if it was already gone
    pub async fn remove_dependency(&self, edge_id: EdgeId) -> PlannerResult<bool> {
        let Some(existing) = self.edges.get_edge(edge_id).await? else {
            tracing::debug!("Dependency {} already removed", edge_id);
            return Ok(false);
        };
        let project_id = existing.attrs.project_id;
        let lock = self.project_lock(project_id);
        let _guard = lock.lock().await;

        let mut graph = self.load_graph(project_id, true).await?;
        self.execute(
            &RemoveDependencyCommand { edge_id },
            &mut graph,
            &HashMap::new(),
            &Cancellation::new(),
        )?;

        let removed = self.edges.delete_edge(edge_id).await?;
        if removed {
            tracing::info!("Removed dependency {}", edge_id);
            self.notify(edge_id, project_id, ChangeKind::Removed);
        }
        Ok(removed)
    }

    /// Remove several dependencies, returning how many actually existed
    pub async fn remove_dependencies(&self, edge_ids: &[EdgeId]) -> PlannerResult<usize> {
        let mut removed = 0;
        for edge_id in edge_ids {
            if self.remove_dependency(*edge_id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn remove_dependency_between(
        &self,
        predecessor_id: TaskId,
        successor_id: TaskId,
    ) -> PlannerResult<bool> {
        match self.find_dependency(predecessor_id, successor_id).await? {
            Some(edge) => self.remove_dependency(edge.id).await,
            None => Ok(false),
        }
    }

    /// Soft-delete every active dependency touching a task
    pub async fn deactivate_dependencies_for_task(&self, task_id: TaskId) -> PlannerResult<usize> {
        let task = self.tasks.get_task(task_id).await?;
        let lock = self.project_lock(task.project_id);
        let _guard = lock.lock().await;

        let mut graph = self.load_graph(task.project_id, true).await?;
        let targets: Vec<EdgeId> = graph
            .edges_involving(task_id)
            .into_iter()
            .filter(|e| e.is_active())
            .map(|e| e.id)
            .collect();

        let (tasks, cancel) = (HashMap::new(), Cancellation::new());
        for edge_id in &targets {
            let command = DeactivateDependencyCommand { edge_id: *edge_id };
            self.execute(&command, &mut graph, &tasks, &cancel)?;
        }

        self.persist_changes(&graph, &targets, ChangeKind::Deactivated)
            .await?;
        tracing::info!(
            "Deactivated {} dependencies of task {}",
            targets.len(),
            task_id
        );
        Ok(targets.len())
    }

    /// Restore soft-deleted dependencies of a task
    ///
    /// Edges that would now duplicate an active edge or close a cycle stay
    /// inactive and are not counted.
    pub async fn reactivate_dependencies_for_task(&self, task_id: TaskId) -> PlannerResult<usize> {
        let task = self.tasks.get_task(task_id).await?;
        let lock = self.project_lock(task.project_id);
        let _guard = lock.lock().await;

        let mut graph = self.load_graph(task.project_id, true).await?;
        let mut candidates: Vec<&DependencyEdge> = graph
            .edges_involving(task_id)
            .into_iter()
            .filter(|e| e.is_archived())
            .collect();
        candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let candidates: Vec<EdgeId> = candidates.into_iter().map(|e| e.id).collect();

        let (tasks, cancel) = (HashMap::new(), Cancellation::new());
        let mut restored = Vec::new();
        for edge_id in candidates {
            let command = ReactivateDependencyCommand { edge_id };
            match self.execute(&command, &mut graph, &tasks, &cancel) {
                Ok(()) => restored.push(edge_id),
                Err(PlannerError::InvalidDependency(_) | PlannerError::CycleDetected { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        self.persist_changes(&graph, &restored, ChangeKind::Reactivated)
            .await?;
        tracing::info!(
            "Reactivated {} dependencies of task {}",
            restored.len(),
            task_id
        );
        Ok(restored.len())
    }

    /// Hard-delete every dependency touching a task, active or not
    pub async fn remove_all_dependencies_for_task(&self, task_id: TaskId) -> PlannerResult<usize> {
        let task = self.tasks.get_task(task_id).await?;
        let lock = self.project_lock(task.project_id);
        let _guard = lock.lock().await;

        let mut graph = self.load_graph(task.project_id, true).await?;
        let targets: Vec<EdgeId> = graph
            .edges_involving(task_id)
            .into_iter()
            .map(|e| e.id)
            .collect();

        let (tasks, cancel) = (HashMap::new(), Cancellation::new());
        for edge_id in &targets {
            let command = RemoveDependencyCommand { edge_id: *edge_id };
            self.execute(&command, &mut graph, &tasks, &cancel)?;
        }

        let mut removed = 0;
        for edge_id in targets {
            if self.edges.delete_edge(edge_id).await? {
                removed += 1;
                self.notify(edge_id, task.project_id, ChangeKind::Removed);
            }
        }
        tracing::info!("Removed {} dependencies of task {}", removed, task_id);
        Ok(removed)
    }

    /// Store the current critical-path flag on every project edge
    ///
    /// Returns how many flags changed.
    pub async fn update_critical_path_markers(&self, project_id: ProjectId) -> PlannerResult<usize> {
        let lock = self.project_lock(project_id);
        let _guard = lock.lock().await;

        let tasks = self.tasks.tasks_by_project(project_id).await?;
        let mut graph = self.load_graph(project_id, true).await?;
        let cancel = Cancellation::new();
        let snapshot =
            CriticalPathCalculator::new(&tasks, &graph, &self.config).calculate(&cancel)?;

        let critical: HashSet<EdgeId> = snapshot.critical_edges.iter().copied().collect();
        let stale: Vec<EdgeId> = graph
            .edges()
            .into_iter()
            .filter(|e| e.attrs.on_critical_path != critical.contains(&e.id))
            .map(|e| e.id)
            .collect();

        self.execute(
            &MarkCriticalEdgesCommand { critical },
            &mut graph,
            &HashMap::new(),
            &cancel,
        )?;
        self.persist_changes(&graph, &stale, ChangeKind::Updated)
            .await?;
        tracing::info!(
            "Refreshed critical path markers for project {}: {} changed",
            project_id,
            stale.len()
        );
        Ok(stale.len())
    }

    // ------------------------------------------------------------------
    // Graph queries
    // ------------------------------------------------------------------

    pub async fn project_dependencies(
        &self,
        project_id: ProjectId,
        active_only: bool,
    ) -> PlannerResult<Vec<DependencyEdge>> {
        let graph = self.load_graph(project_id, !active_only).await?;
        Ok(graph
            .all_edges(project_id, !active_only)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Active edges into a task: what it depends on
    pub async fn task_dependencies(&self, task_id: TaskId) -> PlannerResult<Vec<DependencyEdge>> {
        let (_, graph) = self.task_graph(task_id).await?;
        Ok(graph.edges_to(task_id).into_iter().cloned().collect())
    }

    /// Active edges out of a task: what depends on it
    pub async fn task_dependents(&self, task_id: TaskId) -> PlannerResult<Vec<DependencyEdge>> {
        let (_, graph) = self.task_graph(task_id).await?;
        Ok(graph.edges_from(task_id).into_iter().cloned().collect())
    }

    pub async fn find_dependency(
        &self,
        predecessor_id: TaskId,
        successor_id: TaskId,
    ) -> PlannerResult<Option<DependencyEdge>> {
        let (_, graph) = self.task_graph(successor_id).await?;
        Ok(graph.find_between(predecessor_id, successor_id).cloned())
    }

    pub async fn would_create_cycle(
        &self,
        predecessor_id: TaskId,
        successor_id: TaskId,
    ) -> PlannerResult<bool> {
        self.would_create_cycle_with(predecessor_id, successor_id, &Cancellation::new())
            .await
    }

    /// Whether adding `predecessor -> successor` would close a cycle
    pub async fn would_create_cycle_with(
        &self,
        predecessor_id: TaskId,
        successor_id: TaskId,
        cancel: &Cancellation,
    ) -> PlannerResult<bool> {
        let (_, graph) = self.task_graph(successor_id).await?;
        graph.would_create_cycle(predecessor_id, successor_id, cancel)
    }

    pub async fn detect_cycles(&self, project_id: ProjectId) -> PlannerResult<Vec<Vec<TaskId>>> {
        self.detect_cycles_with(project_id, &Cancellation::new())
            .await
    }

    pub async fn detect_cycles_with(
        &self,
        project_id: ProjectId,
        cancel: &Cancellation,
    ) -> PlannerResult<Vec<Vec<TaskId>>> {
        let graph = self.load_graph(project_id, false).await?;
        planner_core::graph::algorithms::find_cycles(&graph.adjacency_list(), cancel)
    }

    pub async fn all_prerequisites(&self, task_id: TaskId) -> PlannerResult<Vec<TaskId>> {
        let (_, graph) = self.task_graph(task_id).await?;
        Ok(graph.all_predecessors(task_id))
    }

    pub async fn all_dependents(&self, task_id: TaskId) -> PlannerResult<Vec<TaskId>> {
        let (_, graph) = self.task_graph(task_id).await?;
        Ok(graph.all_successors(task_id))
    }

    /// Fewest-hop dependency chain from one task to another; empty if none
    pub async fn shortest_dependency_path(
        &self,
        from: TaskId,
        to: TaskId,
    ) -> PlannerResult<Vec<TaskId>> {
        let (_, graph) = self.task_graph(from).await?;
        Ok(graph.shortest_path(from, to))
    }

    pub async fn identify_external_constraints(
        &self,
        project_id: ProjectId,
        min_lag_hours: f64,
    ) -> PlannerResult<Vec<DependencyEdge>> {
        let graph = self.load_graph(project_id, false).await?;
        Ok(graph
            .external_constraints(min_lag_hours)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn most_connected_tasks(
        &self,
        project_id: ProjectId,
        limit: usize,
    ) -> PlannerResult<Vec<(TaskId, usize)>> {
        let graph = self.load_graph(project_id, false).await?;
        Ok(graph.most_connected(limit))
    }

    /// Active dependency counts per kind; kinds without edges report 0
    pub async fn dependency_statistics(
        &self,
        project_id: ProjectId,
    ) -> PlannerResult<BTreeMap<DependencyKind, usize>> {
        let graph = self.load_graph(project_id, false).await?;
        Ok(graph.statistics())
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    pub async fn calculate_critical_path(
        &self,
        project_id: ProjectId,
    ) -> PlannerResult<ScheduleSnapshot> {
        self.calculate_critical_path_with(project_id, &Cancellation::new())
            .await
    }

    pub async fn calculate_critical_path_with(
        &self,
        project_id: ProjectId,
        cancel: &Cancellation,
    ) -> PlannerResult<ScheduleSnapshot> {
        let (tasks, graph) = self.project_snapshot(project_id).await?;
        let snapshot = CriticalPathCalculator::new(&tasks, &graph, &self.config).calculate(cancel)?;
        tracing::debug!(
            "Critical path for project {}: {} of {} tasks critical, {:.2}h total",
            project_id,
            snapshot.critical_path.len(),
            tasks.len(),
            snapshot.total_duration
        );
        Ok(snapshot)
    }

    /// Total float of one task, in hours
    pub async fn calculate_task_float(&self, task_id: TaskId) -> PlannerResult<f64> {
        let task = self.tasks.get_task(task_id).await?;
        let snapshot = self.calculate_critical_path(task.project_id).await?;
        snapshot
            .float_of(task_id)
            .ok_or_else(|| PlannerError::not_found("task", task_id))
    }

    pub async fn validate_dependency_graph(
        &self,
        project_id: ProjectId,
    ) -> PlannerResult<DependencyValidationResult> {
        self.validate_dependency_graph_with(project_id, &Cancellation::new())
            .await
    }

    pub async fn validate_dependency_graph_with(
        &self,
        project_id: ProjectId,
        cancel: &Cancellation,
    ) -> PlannerResult<DependencyValidationResult> {
        let (tasks, graph) = self.project_snapshot(project_id).await?;
        let result = validate_graph(project_id, &tasks, &graph, cancel)?;
        if !result.valid {
            tracing::warn!(
                "Dependency graph of project {} has {} issue(s)",
                project_id,
                result.issues.len()
            );
        }
        Ok(result)
    }

    pub async fn blocked_tasks(&self, project_id: ProjectId) -> PlannerResult<Vec<BlockedTask>> {
        let (tasks, graph) = self.project_snapshot(project_id).await?;
        ReadinessAnalyzer::new(&tasks, &graph).blocked_tasks()
    }

    pub async fn tasks_ready_to_start(&self, project_id: ProjectId) -> PlannerResult<Vec<Task>> {
        let (tasks, graph) = self.project_snapshot(project_id).await?;
        let ready = ReadinessAnalyzer::new(&tasks, &graph).tasks_ready_to_start()?;
        Ok(ready.into_iter().cloned().collect())
    }

    pub async fn can_task_start(&self, task_id: TaskId) -> PlannerResult<bool> {
        let task = self.tasks.get_task(task_id).await?;
        let (tasks, graph) = self.project_snapshot(task.project_id).await?;
        ReadinessAnalyzer::new(&tasks, &graph).can_task_start(task_id)
    }

    pub async fn blocking_dependencies(&self, task_id: TaskId) -> PlannerResult<Vec<DependencyEdge>> {
        let task = self.tasks.get_task(task_id).await?;
        let (tasks, graph) = self.project_snapshot(task.project_id).await?;
        let blocking = ReadinessAnalyzer::new(&tasks, &graph).blocking_dependencies(task_id)?;
        Ok(blocking.into_iter().cloned().collect())
    }

    pub async fn optimize_schedule(&self, project_id: ProjectId) -> PlannerResult<OptimizationResult> {
        self.optimize_schedule_with(project_id, &Cancellation::new())
            .await
    }

    pub async fn optimize_schedule_with(
        &self,
        project_id: ProjectId,
        cancel: &Cancellation,
    ) -> PlannerResult<OptimizationResult> {
        let (tasks, graph) = self.project_snapshot(project_id).await?;
        let result = ScheduleOptimizer::new(&tasks, &graph, &self.config).optimize(cancel)?;
        tracing::debug!(
            "Optimization for project {}: {} recommendation(s), {:.2}h potential reduction",
            project_id,
            result.recommendations.len(),
            result.potential_reduction
        );
        Ok(result)
    }

    pub async fn assess_project_risk(&self, project_id: ProjectId) -> PlannerResult<RiskAssessment> {
        self.assess_project_risk_with(project_id, &Cancellation::new())
            .await
    }

    pub async fn assess_project_risk_with(
        &self,
        project_id: ProjectId,
        cancel: &Cancellation,
    ) -> PlannerResult<RiskAssessment> {
        let (tasks, graph) = self.project_snapshot(project_id).await?;
        RiskAssessor::new(&tasks, &graph, &self.config).assess(cancel)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Lock for one project's mutations
    ///
    /// Entries nobody holds or waits on are dropped here, so the map only
    /// keeps projects with work in flight.
    fn project_lock(&self, project_id: ProjectId) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.retain(|id, lock| *id == project_id || Arc::strong_count(lock) > 1);
        locks.entry(project_id).or_default().clone()
    }

    fn execute(
        &self,
        command: &dyn Command,
        graph: &mut DependencyGraph,
        tasks: &HashMap<TaskId, Task>,
        cancel: &Cancellation,
    ) -> PlannerResult<()> {
        let mut context = CommandContext::new(graph, tasks, cancel);
        match command.execute(&mut context) {
            Ok(()) => {
                tracing::debug!("Executed: {}", command.description());
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Rejected '{}': {}", command.description(), err);
                Err(err)
            }
        }
    }

    fn notify(&self, edge_id: EdgeId, project_id: ProjectId, kind: ChangeKind) {
        // no subscribers is not an error
        let _ = self.changes.send(DependencyChange {
            edge_id,
            project_id,
            kind,
        });
    }

    async fn persist_changes(
        &self,
        graph: &DependencyGraph,
        edge_ids: &[EdgeId],
        kind: ChangeKind,
    ) -> PlannerResult<()> {
        if edge_ids.is_empty() {
            return Ok(());
        }
        let edges = edge_ids
            .iter()
            .map(|id| stored(graph, *id))
            .collect::<PlannerResult<Vec<_>>>()?;
        self.edges.save_edges(&edges).await?;
        for edge in &edges {
            self.notify(edge.id, edge.attrs.project_id, kind);
        }
        Ok(())
    }

    async fn load_graph(
        &self,
        project_id: ProjectId,
        include_inactive: bool,
    ) -> PlannerResult<DependencyGraph> {
        let edges = self.edges.load_edges(project_id, include_inactive).await?;
        DependencyGraph::from_edges(edges)
    }

    async fn project_snapshot(
        &self,
        project_id: ProjectId,
    ) -> PlannerResult<(Vec<Task>, DependencyGraph)> {
        let tasks = self.tasks.tasks_by_project(project_id).await?;
        let graph = self.load_graph(project_id, false).await?;
        Ok((tasks, graph))
    }

    async fn task_graph(&self, task_id: TaskId) -> PlannerResult<(Task, DependencyGraph)> {
        let task = self.tasks.get_task(task_id).await?;
        let graph = self.load_graph(task.project_id, false).await?;
        Ok((task, graph))
    }

    /// Project tasks plus any listed task that lives elsewhere
    ///
    /// Unknown extra ids are left out so validation reports them.
    async fn task_index(
        &self,
        project_id: ProjectId,
        extra: &[TaskId],
    ) -> PlannerResult<HashMap<TaskId, Task>> {
        let mut index: HashMap<TaskId, Task> = self
            .tasks
            .tasks_by_project(project_id)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        for task_id in extra {
            if index.contains_key(task_id) {
                continue;
            }
            match self.tasks.get_task(*task_id).await {
                Ok(task) => {
                    index.insert(task.id, task);
                }
                Err(PlannerError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(index)
    }
}

fn stored(graph: &DependencyGraph, edge_id: EdgeId) -> PlannerResult<DependencyEdge> {
    graph
        .get(edge_id)
        .cloned()
        .ok_or_else(|| PlannerError::Internal(format!("dependency {} missing after write", edge_id)))
}
