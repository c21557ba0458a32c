mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use planner_core::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("PLANNER_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        output::output_error(&format!("{:#}", err));
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "planner", &mut std::io::stdout());
        return Ok(());
    }

    let file_path = cli
        .file
        .ok_or_else(|| anyhow::anyhow!("--file is required for CLI operations"))?;
    let config = match cli.config {
        Some(path) => EngineConfig::load_from(&path)?,
        None => EngineConfig::load(),
    };

    let ctx = CliContext::load(&file_path, cli.project, config).await?;
    tracing::debug!("Loaded {} for project {}", file_path.display(), cli.project);

    match cli.command {
        Commands::Task(task_cmd) => handlers::task::handle(&ctx, task_cmd.action).await?,
        Commands::Dep(dep_cmd) => handlers::dependency::handle(&ctx, dep_cmd.action).await?,
        Commands::Schedule(schedule_cmd) => {
            handlers::schedule::handle(&ctx, schedule_cmd.action).await?
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}
