//! The per-container state machine (§4.6):
//! `Idle → Guarded → Prepared → Swapping → Probing → {Committed, RolledBack, Failed}`.
//!
//! Driven generically over `Arc<dyn EngineOps>` so the loop driver wires in
//! `LiveEngine` and tests wire in `FakeEngine`, mirroring the teacher's
//! `DockerOps` trait object usage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::Config;
use crate::engine::EngineOps;
use crate::inventory::MonitoredContainer;
use crate::scheduler::{ActionKind, PlannedAction};
use crate::state::BackoffRecord;

use super::hooks::run_hook;
use super::outcome::{Outcome, SkipReason};
use super::spec::build_create_body;
use super::stop_retry::stop_with_retry;

pub struct ActionEngine {
    engine: Arc<dyn EngineOps>,
}

impl ActionEngine {
    pub fn new(engine: Arc<dyn EngineOps>) -> Self {
        Self { engine }
    }

    /// Runs one container's state machine to a terminal outcome. The
    /// caller holds the container's action mutex for the duration.
    pub async fn execute(
        &self,
        config: &Config,
        container: &MonitoredContainer,
        action: &PlannedAction,
        record: &mut BackoffRecord,
        dependency_ready: bool,
        now: DateTime<Utc>,
    ) -> Outcome {
        let name = action.name.clone();
        let kind = action.kind;

        if !dependency_ready {
            return Outcome::Skipped {
                name,
                kind: Some(kind),
                reason: SkipReason::DependencyUnhealthy,
            };
        }

        if config.dry_run {
            tracing::info!(container = %name, kind = ?kind, "dry-run: no engine mutation performed");
            return Outcome::Skipped {
                name,
                kind: Some(kind),
                reason: SkipReason::DryRun,
            };
        }

        if action.modifiers.monitor_only {
            return Outcome::Skipped {
                name,
                kind: Some(kind),
                reason: SkipReason::MonitorOnly,
            };
        }

        if kind == ActionKind::Restart && action.modifiers.no_restart {
            return Outcome::Skipped {
                name,
                kind: Some(kind),
                reason: SkipReason::NoRestart,
            };
        }

        if kind == ActionKind::Update && action.modifiers.no_pull {
            return Outcome::Skipped {
                name,
                kind: Some(kind),
                reason: SkipReason::NoPull,
            };
        }

        run_hook(
            self.engine.as_ref(),
            &container.id,
            "pre_check",
            &container.hooks.pre_check,
        )
        .await;

        let (needs_swap, image) = match kind {
            ActionKind::Update => match self.engine.pull_image(&container.image).await {
                Ok(()) => match self.engine.inspect_image(&container.image).await {
                    Ok(new_image_id) => {
                        (new_image_id != container.image_id, container.image.clone())
                    }
                    Err(err) => {
                        tracing::warn!(container = %name, error = %err, "inspecting pulled image failed");
                        return Outcome::Failed {
                            name,
                            kind,
                            manual_intervention_required: false,
                        };
                    }
                },
                Err(err) => {
                    tracing::warn!(container = %name, error = %err, "image pull failed");
                    return Outcome::Failed {
                        name,
                        kind,
                        manual_intervention_required: false,
                    };
                }
            },
            ActionKind::Recreate | ActionKind::HealthRestart => (true, container.image.clone()),
            ActionKind::Restart => (false, container.image.clone()),
        };

        if !needs_swap {
            return self.in_place_restart(config, container, record, now).await;
        }

        self.swap(config, container, kind, &image, record, now).await
    }

    async fn in_place_restart(
        &self,
        config: &Config,
        container: &MonitoredContainer,
        record: &mut BackoffRecord,
        now: DateTime<Utc>,
    ) -> Outcome {
        let name = container.base_name().to_string();

        if let Err(err) = stop_with_retry(self.engine.as_ref(), &container.id, config.stop_timeout).await {
            tracing::warn!(container = %name, error = %err, "in-place restart: stop failed");
            record.record_failure(now, config.action_cooldown);
            return Outcome::RestartFailed {
                name,
                manual_intervention_required: false,
            };
        }

        let attempts = config.restart_retry_limit.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.engine.start_container(&container.id).await {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(err) => {
                    tracing::warn!(container = %name, error = %err, attempt, limit = attempts, "in-place restart: start failed");
                    last_err = Some(err);
                }
            }
        }
        if let Some(err) = last_err {
            tracing::warn!(container = %name, error = %err, attempts, "in-place restart: start failed after exhausting retry limit");
            record.record_failure(now, config.action_cooldown);
            return Outcome::RestartFailed {
                name,
                manual_intervention_required: false,
            };
        }

        record.record_success(now);
        Outcome::Restarted { name }
    }

    async fn swap(
        &self,
        config: &Config,
        container: &MonitoredContainer,
        kind: ActionKind,
        image: &str,
        record: &mut BackoffRecord,
        now: DateTime<Utc>,
    ) -> Outcome {
        let name = container.base_name().to_string();

        if let Some(failure) = preflight_mounts(container) {
            tracing::warn!(container = %name, reason = %failure, "preflight failed, action aborted");
            return Outcome::Failed {
                name,
                kind,
                manual_intervention_required: false,
            };
        }

        let suffix = swap_suffix(now);
        let old_name = format!("{name}-guerite-old-{suffix}");
        let new_name = format!("{name}-guerite-new-{suffix}");

        if let Err(err) = self.engine.rename_container(&container.id, &old_name).await {
            tracing::warn!(container = %name, error = %err, "rename to swap-old name failed before any mutation");
            return Outcome::Failed {
                name,
                kind,
                manual_intervention_required: false,
            };
        }

        match self
            .run_swap_and_probe(config, container, &old_name, &new_name, &name, image)
            .await
        {
            Ok(new_id) => {
                if let Err(err) = self.engine.remove_container(&container.id, true).await {
                    tracing::warn!(container = %name, error = %err, "removing old container after commit failed, left behind");
                }
                run_hook(
                    self.engine.as_ref(),
                    &new_id,
                    "post_update",
                    &container.hooks.post_update,
                )
                .await;
                if kind == ActionKind::Update {
                    if let Err(err) = self.engine.remove_image(&container.image_id).await {
                        tracing::debug!(container = %name, error = %err, "best-effort prior image removal failed");
                    }
                }
                record.record_success(now);
                if kind == ActionKind::HealthRestart {
                    record.record_health_restart(now);
                }
                Outcome::Committed { name, kind }
            }
            Err((stage, new_id)) => {
                tracing::warn!(container = %name, stage = %stage, "swap failed after rename, rolling back");
                let rollback_ok = self.rollback(&container.id, new_id.as_deref(), &name).await;
                record.record_failure(now, config.action_cooldown);
                if rollback_ok {
                    Outcome::RolledBack { name, kind }
                } else {
                    Outcome::Failed {
                        name,
                        kind,
                        manual_intervention_required: true,
                    }
                }
            }
        }
    }

    /// Create the replacement, run the pre-update hook against the
    /// still-running old container, stop it, rename+start the new one
    /// under the original name, then probe its health. Returns the new
    /// container's id on success, or the stage name plus whatever new
    /// container id exists so far on failure (for rollback).
    async fn run_swap_and_probe(
        &self,
        config: &Config,
        container: &MonitoredContainer,
        old_name: &str,
        new_name: &str,
        final_name: &str,
        image: &str,
    ) -> Result<String, (&'static str, Option<String>)> {
        let body = build_create_body(&container.raw, image).map_err(|e| {
            tracing::warn!(error = %e, "rebuilding create spec failed");
            ("build_spec", None)
        })?;

        let new_id = self
            .engine
            .create_container(new_name, body)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "creating replacement container failed");
                ("create", None)
            })?;

        run_hook(
            self.engine.as_ref(),
            &container.id,
            "pre_update",
            &container.hooks.pre_update,
        )
        .await;

        stop_with_retry(self.engine.as_ref(), &container.id, config.stop_timeout)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "stopping old container failed");
                ("stop_old", Some(new_id.clone()))
            })?;

        self.engine
            .rename_container(&new_id, final_name)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "renaming replacement to final name failed");
                ("rename_new", Some(new_id.clone()))
            })?;

        self.engine.start_container(&new_id).await.map_err(|e| {
            tracing::warn!(error = %e, "starting replacement container failed");
            ("start_new", Some(new_id.clone()))
        })?;

        self.probe_health(&new_id, container.has_healthcheck, config.health_check_timeout)
            .await
            .map_err(|_| ("health_probe", Some(new_id.clone())))?;

        run_hook(
            self.engine.as_ref(),
            &new_id,
            "post_check",
            &container.hooks.post_check,
        )
        .await;

        let _ = old_name;
        Ok(new_id)
    }

    async fn probe_health(&self, id: &str, has_healthcheck: bool, timeout: Duration) -> Result<(), ()> {
        if !has_healthcheck {
            return Ok(());
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.engine.inspect_container(id).await {
                Ok(raw) => {
                    let healthy = raw
                        .state
                        .as_ref()
                        .and_then(|s| s.health.as_ref())
                        .and_then(|h| h.status)
                        .map(|s| matches!(s, bollard::models::HealthStatusEnum::HEALTHY))
                        .unwrap_or(false);
                    if healthy {
                        return Ok(());
                    }
                }
                Err(_) => return Err(()),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// Best-effort rollback: stop+remove the new container if one exists,
    /// rename the old container back to the final name, start it.
    /// Returns whether the host ended up name-stable again.
    async fn rollback(&self, old_id: &str, new_id: Option<&str>, final_name: &str) -> bool {
        if let Some(new_id) = new_id {
            if let Err(err) = self.engine.stop_container(new_id, Duration::from_secs(5)).await {
                tracing::debug!(error = %err, "stopping failed replacement during rollback");
            }
            if let Err(err) = self.engine.remove_container(new_id, true).await {
                tracing::warn!(error = %err, "removing failed replacement during rollback");
            }
        }

        if let Err(err) = self.engine.rename_container(old_id, final_name).await {
            tracing::error!(error = %err, "rollback: renaming old container back to final name failed, manual intervention required");
            return false;
        }
        if let Err(err) = self.engine.start_container(old_id).await {
            tracing::error!(error = %err, "rollback: starting old container back up failed, manual intervention required");
            return false;
        }
        true
    }
}

/// Bind mounts whose host path is missing abort the action; non-local
/// volume drivers only warn.
fn preflight_mounts(container: &MonitoredContainer) -> Option<String> {
    let mounts = container.raw.mounts.clone().unwrap_or_default();
    for mount in mounts {
        let is_bind = matches!(mount.typ, Some(bollard::models::MountPointTypeEnum::BIND));
        if is_bind {
            if let Some(source) = mount.source.as_deref() {
                if !std::path::Path::new(source).exists() {
                    return Some(format!("bind mount source missing: {source}"));
                }
            }
        } else if let Some(driver) = mount.driver.as_deref() {
            if driver != "local" {
                tracing::warn!(driver, "non-local volume driver, continuing without preflight check");
            }
        }
    }
    None
}

/// Swap-artifact suffix: a leading swap-start unix timestamp (so pruning can
/// tell a fresh rollback artifact from a stale one without relying on the
/// container's own creation time, which reflects the original container's
/// age, not when it was renamed into a `-guerite-old-`/`-guerite-new-` pair)
/// followed by a short random token to keep concurrent swaps unique.
fn swap_suffix(now: DateTime<Utc>) -> String {
    let value: u32 = rand::rng().random::<u32>() & 0xff_ffff;
    format!("{}-{value:06x}", now.timestamp())
}
