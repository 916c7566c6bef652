//! Lifecycle hooks (§4.9): shell commands run inside a target container via
//! the engine's exec facility. A non-zero exit or timeout is logged and
//! does not abort the action — `run_hook` never returns an error for that
//! reason, only for the case where there's no hook configured to run.

use std::time::Duration;

use crate::engine::EngineOps;

/// Runs `cmd` inside `container_id` if `hook` is `Some`, logging the
/// outcome under `point` (one of pre_check/pre_update/post_update/post_check).
pub async fn run_hook(
    engine: &dyn EngineOps,
    container_id: &str,
    point: &str,
    hook: &Option<(Vec<String>, Duration)>,
) {
    let Some((cmd, timeout)) = hook else {
        return;
    };
    if cmd.is_empty() {
        return;
    }

    match engine.exec(container_id, cmd, *timeout).await {
        Ok(result) if result.timed_out => {
            tracing::warn!(container_id, point, "lifecycle hook timed out");
        }
        Ok(result) if result.exit_code != Some(0) => {
            tracing::warn!(
                container_id,
                point,
                exit_code = ?result.exit_code,
                "lifecycle hook exited non-zero"
            );
        }
        Ok(_) => {
            tracing::debug!(container_id, point, "lifecycle hook succeeded");
        }
        Err(err) => {
            tracing::warn!(container_id, point, error = %err, "lifecycle hook failed to run");
        }
    }
}
