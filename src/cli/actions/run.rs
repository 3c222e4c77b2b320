use crate::cli::{
    actions::{Action, server, sweep},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action, then flush pending spans.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Server(args) => server::execute(args).await,
        Action::Sweep(args) => sweep::execute(args).await,
    };
    telemetry::shutdown_tracer();
    result
}
