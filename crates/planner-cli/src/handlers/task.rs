use crate::cli::TaskAction;
use crate::context::CliContext;
use crate::output;

pub async fn handle(ctx: &CliContext, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::Add { title, hours } => {
            if hours.is_some_and(|h| !h.is_finite() || h < 0.0) {
                return output::output_error("Hours must be a non-negative number");
            }
            let task = ctx.add_task(title, hours).await?;
            output::output_success(&task);
        }
        TaskAction::List => {
            let tasks = ctx.list_tasks().await?;
            output::output_list(tasks);
        }
        TaskAction::Complete { id } => {
            let task = ctx.complete_task(id).await?;
            output::output_success(&task);
        }
        TaskAction::Progress { id, percent } => {
            let task = ctx.set_progress(id, percent).await?;
            output::output_success(&task);
        }
    }
    Ok(())
}
