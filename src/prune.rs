//! Pruning (§4.8). Runs on its own cron, independent of the per-container
//! scheduler: before invoking the engine's prune, scans the current
//! container list for `-guerite-old-*`/`-guerite-new-*` names created
//! within the rollback grace window and defers if any are found, since a
//! concurrent swap's artifacts are exactly the images a prune would want to
//! reclaim next. Grounded in the pack's `docker-maid` `prune_images`
//! function for the actual prune call (see `engine::live::LiveEngine::prune_images`).

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::engine::{ContainerInfo, EngineError, EngineOps};
use crate::notify::Event;

/// A swap that hasn't finished (or hasn't had its loser removed yet),
/// identified purely by its `-guerite-old-`/`-guerite-new-` name marker.
fn is_rollback_artifact(container: &ContainerInfo) -> bool {
    container.name.contains("-guerite-old-") || container.name.contains("-guerite-new-")
}

/// The swap-start unix timestamp embedded as the leading component of the
/// `-guerite-old-<ts>-<token>`/`-guerite-new-<ts>-<token>` suffix (see
/// `action::machine::swap_suffix`). Renaming a container doesn't change its
/// own creation time, so that timestamp can't tell a fresh rollback artifact
/// from a stale one — the age of the *swap*, not of the container, is what
/// the grace window guards.
fn artifact_swapped_at(name: &str) -> Option<DateTime<Utc>> {
    for marker in ["-guerite-old-", "-guerite-new-"] {
        if let Some(idx) = name.find(marker) {
            let rest = &name[idx + marker.len()..];
            let ts = rest.split('-').next()?.parse::<i64>().ok()?;
            return DateTime::<Utc>::from_timestamp(ts, 0);
        }
    }
    None
}

fn within_grace(container: &ContainerInfo, now: DateTime<Utc>, grace: std::time::Duration) -> bool {
    let reference = artifact_swapped_at(&container.name).unwrap_or_else(|| {
        tracing::warn!(
            container = %container.name,
            "rollback artifact name carries no parseable swap timestamp, falling back to container creation time"
        );
        DateTime::<Utc>::from_timestamp(container.created_at, 0).unwrap_or(now)
    });
    now - reference < chrono::Duration::from_std(grace).unwrap_or_default()
}

pub async fn run(engine: &dyn EngineOps, config: &Config, now: DateTime<Utc>) -> Result<Event, EngineError> {
    let containers = engine.list_containers(true).await?;

    let fresh_artifact = containers
        .iter()
        .find(|c| is_rollback_artifact(c) && within_grace(c, now, config.rollback_grace));

    if let Some(artifact) = fresh_artifact {
        let reason = format!(
            "deferred: rollback artifact {} is within the {}s grace window",
            artifact.name,
            config.rollback_grace.as_secs()
        );
        tracing::info!(container = %artifact.name, "prune deferred, rollback artifact present");
        return Ok(Event::PruneDeferred { reason });
    }

    let result = tokio::time::timeout(config.prune_timeout, engine.prune_images())
        .await
        .map_err(|_| EngineError::Timeout(config.prune_timeout))??;

    tracing::info!(
        images_deleted = result.images_deleted,
        space_reclaimed = result.space_reclaimed,
        "prune complete"
    );

    Ok(Event::Prune {
        images_deleted: result.images_deleted,
        space_reclaimed: result.space_reclaimed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeContainer;
    use crate::engine::FakeEngine;
    use bollard::models::ContainerInspectResponse;
    use std::collections::HashMap;

    fn container(name: &str, created_at: i64) -> FakeContainer {
        FakeContainer {
            info: ContainerInfo {
                id: name.to_string(),
                name: name.to_string(),
                image: "nginx:1.25".to_string(),
                image_id: "sha256:aaa".to_string(),
                state: "running".to_string(),
                labels: HashMap::new(),
                created_at,
                started_at: None,
                has_healthcheck: false,
                health: None,
                links: vec![],
                mounts: vec![],
                networks: vec![],
                raw: ContainerInspectResponse::default(),
            },
            running: true,
        }
    }

    #[tokio::test]
    async fn defers_when_fresh_rollback_artifact_present() {
        let engine = FakeEngine::new();
        let now = Utc::now();
        let swapped_at = now.timestamp() - 5;
        engine
            .add_container(container(&format!("web-guerite-old-{swapped_at}-ab12cd"), now.timestamp() - 100_000))
            .await;

        let config = Config::default_for_test();
        let event = run(&engine, &config, now).await.unwrap();
        assert!(matches!(event, Event::PruneDeferred { .. }));
    }

    #[tokio::test]
    async fn prunes_when_no_fresh_artifact_present() {
        let engine = FakeEngine::new();
        let now = Utc::now();
        engine.add_container(container("web", now.timestamp() - 100_000)).await;

        let config = Config::default_for_test();
        let event = run(&engine, &config, now).await.unwrap();
        assert!(matches!(event, Event::Prune { .. }));
    }

    #[tokio::test]
    async fn stale_artifact_outside_grace_window_does_not_defer() {
        let engine = FakeEngine::new();
        let now = Utc::now();
        let swapped_at = now.timestamp() - 100_000;
        engine
            .add_container(container(&format!("web-guerite-old-{swapped_at}-ab12cd"), now.timestamp() - 100_005))
            .await;

        let config = Config::default_for_test();
        let event = run(&engine, &config, now).await.unwrap();
        assert!(matches!(event, Event::Prune { .. }));
    }

    #[tokio::test]
    async fn long_running_container_swapped_moments_ago_still_defers() {
        // The bug this guards against: a container that's been running far
        // longer than the grace window gets renamed into a rollback artifact
        // seconds ago. Its *creation* time is ancient; its *swap* time is fresh.
        let engine = FakeEngine::new();
        let now = Utc::now();
        let swapped_at = now.timestamp() - 2;
        let ancient_created_at = now.timestamp() - 30 * 24 * 3600;
        engine
            .add_container(container(&format!("web-guerite-old-{swapped_at}-ab12cd"), ancient_created_at))
            .await;

        let config = Config::default_for_test();
        let event = run(&engine, &config, now).await.unwrap();
        assert!(matches!(event, Event::PruneDeferred { .. }));
    }
}
