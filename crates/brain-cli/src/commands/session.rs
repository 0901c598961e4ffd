use crate::cli::SessionCommand;
use crate::context::AppContext;
use anyhow::Result;
use brain_core::error::BrainError;
use brain_core::session::SessionState;
use colored::Colorize;
use tracing::warn;

/// Dispatches a session subcommand. Returns `false` (exit 1) only for an
/// invalid status transition; any other failure propagates as an error.
///
/// A session becoming IN_PROGRESS (create or resume) triggers the
/// embedding catch-up fire-and-forget, per the bootstrap dataflow: load
/// session -> evaluate gate -> trigger catch-up. Catch-up failures are
/// logged, never surfaced here.
pub async fn execute(ctx: &AppContext, command: SessionCommand) -> Result<bool> {
    let triggers_catch_up = matches!(command, SessionCommand::Create { .. } | SessionCommand::Resume { .. });

    let outcome = match command {
        SessionCommand::Create { topic } => ctx.sessions.create(topic).await,
        SessionCommand::Pause { id } => ctx.sessions.pause(&id).await,
        SessionCommand::Resume { id } => ctx.sessions.resume(&id).await,
        SessionCommand::Complete { id } => ctx.sessions.complete(&id).await,
    };

    match outcome {
        Ok(state) => {
            print_state(&state);
            if triggers_catch_up {
                if let Err(e) = ctx.pipeline.clone().catch_up(ctx.project.clone()).await {
                    warn!(error = %e, "catch-up did not start");
                }
            }
            Ok(true)
        }
        Err(e @ BrainError::InvalidStatusTransition { .. }) => {
            eprintln!("{} {e}", "invalid transition:".red().bold());
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_state(state: &SessionState) {
    println!("session {}", state.session_id);
    println!("  status:  {}", state.status);
    println!("  version: {}", state.version);
    println!("  mode:    {:?}", state.current_mode);
}
