//! Shared helper for running task commands.

use stratus_runner::{CommandConfig, CommandRunner, ExecutionResult, RunConfig};
use tracing::error;

use crate::error::{IacError, IacResult};

/// Run `command`, turning a non-zero exit into [`IacError::CommandFailed`].
pub(crate) async fn run_checked(
    runner: &dyn CommandRunner,
    command: &CommandConfig,
    run_config: &RunConfig,
) -> IacResult<ExecutionResult> {
    let result = runner.run(command, run_config).await?;
    if !result.success() {
        error!("Command exited with {}: {}", result.exit_code, result.command);
        return Err(IacError::CommandFailed {
            command: result.command.clone(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        });
    }
    Ok(result)
}
