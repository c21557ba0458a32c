use crate::cli::ScheduleAction;
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &CliContext, action: ScheduleAction) -> anyhow::Result<()> {
    let project = ctx.project_id;
    let service = &ctx.service;

    match action {
        ScheduleAction::CriticalPath => {
            let snapshot = service.calculate_critical_path(project).await?;
            output::output_success(&snapshot);
        }
        ScheduleAction::Float { task } => {
            let float = service.calculate_task_float(task).await?;
            output::output_success(serde_json::json!({
                "task_id": task,
                "total_float": float
            }));
        }
        ScheduleAction::Ready => {
            let tasks = service.tasks_ready_to_start(project).await?;
            output::output_list(tasks);
        }
        ScheduleAction::Blocked => {
            let blocked = service.blocked_tasks(project).await?;
            output::output_list(blocked);
        }
        ScheduleAction::Optimize => {
            let result = service.optimize_schedule(project).await?;
            output::output_success(&result);
        }
        ScheduleAction::Validate => {
            let result = service.validate_dependency_graph(project).await?;
            output::output_success(&result);
        }
        ScheduleAction::Stats => {
            let stats = service.dependency_statistics(project).await?;
            output::output_success(&stats);
        }
        ScheduleAction::Risk => {
            let assessment = service.assess_project_risk(project).await?;
            output::output_success(&assessment);
        }
        ScheduleAction::External { min_lag } => {
            let edges = service
                .identify_external_constraints(project, min_lag)
                .await?;
            output::output_list(edges);
        }
        ScheduleAction::Connected { limit } => {
            let ranked: Vec<serde_json::Value> = service
                .most_connected_tasks(project, limit)
                .await?
                .into_iter()
                .map(|(task_id, connections)| {
                    serde_json::json!({ "task_id": task_id, "connections": connections })
                })
                .collect();
            output::output_list(ranked);
        }
        ScheduleAction::MarkCritical => {
            let changed = service.update_critical_path_markers(project).await?;
            output::output_success(serde_json::json!({ "changed": changed }));
        }
    }
    Ok(())
}
