use std::collections::HashMap;

use planner_core::{Cancellation, PlannerResult};

pub mod dependency_commands;

pub use dependency_commands::*;

use crate::{DependencyGraph, Task, TaskId};

/// Trait for domain commands that mutate state
/// Commands represent intent and can be executed, queued, and persisted
pub trait Command: Send + Sync {
    /// Execute this command, mutating the domain state
    ///
    /// A failing command leaves the graph untouched.
    fn execute(&self, context: &mut CommandContext) -> PlannerResult<()>;

    /// Human-readable description of what this command does
    fn description(&self) -> String;
}

/// Context passed to commands for mutation
///
/// `graph` holds one project's edges; `tasks` is the task snapshot the
/// command validates against.
pub struct CommandContext<'a> {
    pub graph: &'a mut DependencyGraph,
    pub tasks: &'a HashMap<TaskId, Task>,
    pub cancel: &'a Cancellation,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        graph: &'a mut DependencyGraph,
        tasks: &'a HashMap<TaskId, Task>,
        cancel: &'a Cancellation,
    ) -> Self {
        Self {
            graph,
            tasks,
            cancel,
        }
    }
}
