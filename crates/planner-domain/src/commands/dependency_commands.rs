use std::collections::{HashMap, HashSet};

use planner_core::{BatchFailure, Cancellation, EdgeId, PlannerError, PlannerResult};

use super::{Command, CommandContext};
use crate::dependencies::{DependencyGraph, DependencySpec, DependencyUpdate};
use crate::{Task, TaskId};

/// Create a dependency after checking every graph invariant
pub struct CreateDependencyCommand {
    pub edge_id: EdgeId,
    pub spec: DependencySpec,
}

impl Command for CreateDependencyCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        insert_checked(
            context.graph,
            context.tasks,
            self.edge_id,
            &self.spec,
            context.cancel,
        )
    }

    fn description(&self) -> String {
        format!(
            "Create {} dependency: {} -> {}",
            self.spec.kind, self.spec.predecessor_id, self.spec.successor_id
        )
    }
}

/// Create several dependencies as one unit
///
/// Entries are validated in order against the graph plus every earlier
/// entry, so a cycle formed only by new edges is still caught. Any failure
/// rejects the whole batch.
pub struct CreateDependenciesCommand {
    pub entries: Vec<(EdgeId, DependencySpec)>,
}

impl Command for CreateDependenciesCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        let mut staged = context.graph.clone();
        let mut failures = Vec::new();

        for (index, (edge_id, spec)) in self.entries.iter().enumerate() {
            match insert_checked(&mut staged, context.tasks, *edge_id, spec, context.cancel) {
                Ok(()) => {}
                Err(PlannerError::Cancelled) => return Err(PlannerError::Cancelled),
                Err(err) => failures.push(BatchFailure::new(index, err.to_string())),
            }
        }

        if !failures.is_empty() {
            return Err(PlannerError::ValidationFailed { failures });
        }

        *context.graph = staged;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Create {} dependencies", self.entries.len())
    }
}

/// Change kind, lag or notes of an existing dependency
pub struct UpdateDependencyCommand {
    pub edge_id: EdgeId,
    pub update: DependencyUpdate,
}

impl Command for UpdateDependencyCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        if !context.graph.contains(self.edge_id) {
            return Err(PlannerError::not_found("dependency", self.edge_id));
        }
        if let Some(lag_hours) = self.update.lag_hours {
            check_lag(lag_hours)?;
        }

        let update = self.update.clone();
        context
            .graph
            .modify(self.edge_id, |link| update.apply_to(link))?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Update dependency {}", self.edge_id)
    }
}

/// Hard-delete a dependency; absent ids are a no-op
pub struct RemoveDependencyCommand {
    pub edge_id: EdgeId,
}

impl Command for RemoveDependencyCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        if context.graph.contains(self.edge_id) {
            context.graph.remove_edge(self.edge_id)?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Remove dependency {}", self.edge_id)
    }
}

/// Soft-delete a dependency
pub struct DeactivateDependencyCommand {
    pub edge_id: EdgeId,
}

impl Command for DeactivateDependencyCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        context.graph.archive_edge(self.edge_id)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Deactivate dependency {}", self.edge_id)
    }
}

/// Restore a soft-deleted dependency, re-running duplicate and cycle checks
pub struct ReactivateDependencyCommand {
    pub edge_id: EdgeId,
}

impl Command for ReactivateDependencyCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        let edge = context
            .graph
            .get(self.edge_id)
            .ok_or_else(|| PlannerError::not_found("dependency", self.edge_id))?;
        if edge.is_active() {
            return Ok(());
        }

        let (source, target) = (edge.source, edge.target);
        if context.graph.find_active(source, target).is_some() {
            return Err(PlannerError::InvalidDependency(format!(
                "an active dependency {} -> {} already exists",
                source, target
            )));
        }
        if let Some(path) = context.graph.cycle_path(source, target, context.cancel)? {
            return Err(PlannerError::CycleDetected { path });
        }

        context.graph.unarchive_edge(self.edge_id)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("Reactivate dependency {}", self.edge_id)
    }
}

/// Rewrite the critical-path flag of every edge in the graph
pub struct MarkCriticalEdgesCommand {
    pub critical: HashSet<EdgeId>,
}

impl Command for MarkCriticalEdgesCommand {
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()> {
        let stale: Vec<EdgeId> = context
            .graph
            .edges()
            .into_iter()
            .filter(|e| e.attrs.on_critical_path != self.critical.contains(&e.id))
            .map(|e| e.id)
            .collect();

        for edge_id in stale {
            let on_path = self.critical.contains(&edge_id);
            context
                .graph
                .modify(edge_id, |link| link.on_critical_path = on_path)?;
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Mark {} critical dependencies", self.critical.len())
    }
}

fn insert_checked(
    graph: &mut DependencyGraph,
    tasks: &HashMap<TaskId, Task>,
    edge_id: EdgeId,
    spec: &DependencySpec,
    cancel: &Cancellation,
) -> PlannerResult<()> {
    let successor = tasks
        .get(&spec.successor_id)
        .ok_or_else(|| PlannerError::not_found("task", spec.successor_id))?;
    let predecessor = tasks
        .get(&spec.predecessor_id)
        .ok_or_else(|| PlannerError::not_found("task", spec.predecessor_id))?;

    if successor.id == predecessor.id {
        return Err(PlannerError::InvalidDependency(format!(
            "task {} cannot depend on itself",
            successor.id
        )));
    }
    if successor.project_id != predecessor.project_id {
        return Err(PlannerError::InvalidDependency(format!(
            "tasks {} and {} belong to different projects",
            predecessor.id, successor.id
        )));
    }
    if let Some(lag_hours) = spec.lag_hours {
        check_lag(lag_hours)?;
    }
    if graph.contains(edge_id) {
        return Err(PlannerError::Internal(format!(
            "dependency id {} is already in use",
            edge_id
        )));
    }
    if graph.find_active(predecessor.id, successor.id).is_some() {
        return Err(PlannerError::InvalidDependency(format!(
            "an active dependency {} -> {} already exists",
            predecessor.id, successor.id
        )));
    }
    if let Some(path) = graph.cycle_path(predecessor.id, successor.id, cancel)? {
        return Err(PlannerError::CycleDetected { path });
    }

    graph.add_edge(spec.to_edge(edge_id, successor.project_id))
}

fn check_lag(lag_hours: f64) -> PlannerResult<()> {
    if lag_hours.is_finite() {
        Ok(())
    } else {
        Err(PlannerError::InvalidDependency(format!(
            "lag must be a finite number of hours, got {}",
            lag_hours
        )))
    }
}
