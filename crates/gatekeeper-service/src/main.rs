//! Gatekeeper service entry point.

use clap::{Parser, Subcommand};
use gatekeeper_core::event::DomainEvent;
use gatekeeper_core::identifier::Identifier;
use gatekeeper_service::config::ServiceConfig;
use gatekeeper_service::error::AppError;
use gatekeeper_service::inspect::inspect_users;
use gatekeeper_service::state::AppState;
use gatekeeper_service::telemetry;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Wire the handlers and log committed events until interrupted.
    Run,
    /// Re-read users from the event store and print their current state.
    Inspect {
        /// User ids to reconstitute.
        #[arg(required = true)]
        ids: Vec<Identifier>,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = ServiceConfig::from_env()?;
    telemetry::init_tracing(config.log_format);

    tracing::info!("Starting Gatekeeper service");
    let state = AppState::from_config(&config).await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(state).await,
        Command::Inspect { ids } => inspect(&state, &ids).await,
    }
}

async fn run(state: AppState) -> Result<(), AppError> {
    let mut events = state.publisher.subscribe();
    tracing::info!("ready; waiting for events");
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("shutting down");
                return Ok(());
            }
            received = events.recv() => match received {
                Ok(event) => tracing::info!(
                    event_type = event.event_type(),
                    aggregate_id = %event.metadata().aggregate_id,
                    version = event.version(),
                    "event committed"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn inspect(state: &AppState, ids: &[Identifier]) -> Result<(), AppError> {
    let results = inspect_users(&state.dispatcher, ids).await;
    let mut failed = 0;
    for (user_id, result) in results {
        let line = match result {
            Ok(view) => serde_json::to_string(&view)?,
            Err(err) => {
                failed += 1;
                serde_json::json!({ "user_id": user_id, "error": err.to_string() }).to_string()
            }
        };
        println!("{line}");
    }

    if failed > 0 {
        return Err(AppError::InspectFailed {
            failed,
            requested: ids.len(),
        });
    }
    Ok(())
}
