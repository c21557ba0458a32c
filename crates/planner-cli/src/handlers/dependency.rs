use planner_core::PlannerError;
use planner_domain::{DependencyKind, DependencySpec, DependencyUpdate, FieldUpdate};

use crate::cli::{DepAction, DepAddArgs, DepUpdateArgs};
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &CliContext, action: DepAction) -> anyhow::Result<()> {
    match action {
        DepAction::Add(args) => {
            let edge = ctx.service.create_dependency(build_spec(args)).await?;
            output::output_success(&edge);
        }
        DepAction::AddBatch { links } => {
            let specs = links
                .into_iter()
                .map(|(predecessor, successor)| {
                    DependencySpec::new(successor, predecessor, DependencyKind::FinishToStart)
                })
                .collect();
            match ctx.service.create_dependencies(specs).await {
                Ok(edges) => output::output_list(edges),
                Err(PlannerError::ValidationFailed { failures }) => {
                    let details: Vec<String> = failures
                        .iter()
                        .map(|f| format!("#{}: {}", f.index, f.message))
                        .collect();
                    return output::output_error(&format!(
                        "Batch rejected: {}",
                        details.join("; ")
                    ));
                }
                Err(err) => return Err(err.into()),
            }
        }
        DepAction::Update(args) => {
            let id = args.id;
            let edge = ctx.service.update_dependency(id, build_update(args)).await?;
            output::output_success(&edge);
        }
        DepAction::Remove { ids } => {
            let removed = ctx.service.remove_dependencies(&ids).await?;
            output::output_success(serde_json::json!({
                "requested": ids.len(),
                "removed": removed
            }));
        }
        DepAction::List { task, all } => {
            let edges = match task {
                Some(task_id) => {
                    let mut edges = ctx.service.task_dependencies(task_id).await?;
                    edges.extend(ctx.service.task_dependents(task_id).await?);
                    edges
                }
                None => ctx.service.project_dependencies(ctx.project_id, !all).await?,
            };
            output::output_list(edges);
        }
        DepAction::Deactivate { task } => {
            let count = ctx.service.deactivate_dependencies_for_task(task).await?;
            output::output_success(serde_json::json!({ "deactivated": count }));
        }
        DepAction::Reactivate { task } => {
            let count = ctx.service.reactivate_dependencies_for_task(task).await?;
            output::output_success(serde_json::json!({ "reactivated": count }));
        }
        DepAction::Path { from, to } => {
            // an unknown target would otherwise read as "no path"
            ctx.task(to).await?;
            let path = ctx.service.shortest_dependency_path(from, to).await?;
            output::output_success(serde_json::json!({
                "path": path,
                "hops": path.len().saturating_sub(1)
            }));
        }
    }
    Ok(())
}

fn build_spec(args: DepAddArgs) -> DependencySpec {
    let mut spec = DependencySpec::new(args.successor, args.predecessor, args.kind);
    if let Some(lag) = args.lag {
        spec = spec.with_lag(lag);
    }
    if let Some(notes) = args.notes {
        spec = spec.with_notes(notes);
    }
    spec
}

fn build_update(args: DepUpdateArgs) -> DependencyUpdate {
    let notes = match (args.notes, args.clear_notes) {
        (Some(notes), _) => FieldUpdate::Set(notes),
        (None, true) => FieldUpdate::Clear,
        (None, false) => FieldUpdate::NoChange,
    };
    DependencyUpdate {
        kind: args.kind,
        lag_hours: args.lag,
        notes,
    }
}

