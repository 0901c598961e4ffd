use anyhow::Result;
use brain_cli::cli::Cli;
use brain_cli::cli::{Commands, LogLevel};
use brain_cli::commands;
use brain_cli::context::AppContext;
use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.unwrap_or(if cli.verbose { LogLevel::Debug } else { LogLevel::Info });
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::from(level))
        .init();

    let config = brain_config::Config::from_env()?;
    let ctx = AppContext::build(config, cli.project).await?;

    let outcome = match cli.command {
        Commands::Embed { project, limit, force } => commands::embed::execute(&ctx, project, limit, force).await,
        Commands::Session(cmd) => commands::session::execute(&ctx, cmd).await,
        Commands::Search { query, limit, threshold, mode } => {
            commands::search::execute(&ctx, query, limit, threshold, mode).await
        }
        Commands::Analyze { project, preview, mode, source_path, source_schema } => {
            commands::analyze::execute(&ctx, project, preview, mode, source_path, source_schema).await
        }
    };

    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
