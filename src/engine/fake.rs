//! `FakeEngine` — in-memory test double for [`EngineOps`].
//!
//! Grounded in the teacher's `client::fake::FakeDocker`: a `Mutex<Inner>`
//! holding canned state, with each trait method operating on it directly.
//! Narrowed to what the action engine, scheduler, and inventory actually
//! exercise in tests.

use std::collections::HashMap;
use std::time::Duration;

use bollard::models::{
    ContainerConfig, ContainerCreateBody, ContainerInspectResponse, ContainerState,
};
use tokio::sync::Mutex;

use super::error::EngineError;
use super::ops::{BoxFuture, EngineOps};
use super::types::{ContainerInfo, ExecResult, PruneResult};

#[derive(Clone, Debug)]
pub struct FakeContainer {
    pub info: ContainerInfo,
    pub running: bool,
}

#[derive(Default)]
struct Inner {
    containers: HashMap<String, FakeContainer>,
    images: HashMap<String, String>,
    pulls: Vec<String>,
    removed_images: Vec<String>,
    exec_results: HashMap<String, ExecResult>,
    exec_calls: Vec<(String, Vec<String>)>,
    next_id: u64,
    /// Remaining injected `start_container` failures, by container id.
    start_failures: HashMap<String, u32>,
}

/// Deterministic, dependency-free stand-in for a real Docker daemon.
pub struct FakeEngine {
    inner: Mutex<Inner>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn add_container(&self, container: FakeContainer) {
        let mut state = self.inner.lock().await;
        state
            .containers
            .insert(container.info.id.clone(), container);
    }

    /// Register the image id a `pull_image` call for `image` should resolve to.
    pub async fn set_latest_digest(&self, image: &str, digest: &str) {
        self.inner
            .lock()
            .await
            .images
            .insert(image.to_string(), digest.to_string());
    }

    /// Make the next `count` `start_container` calls against `container_id`
    /// fail before a call is allowed to succeed.
    pub async fn fail_start_times(&self, container_id: &str, count: u32) {
        self.inner
            .lock()
            .await
            .start_failures
            .insert(container_id.to_string(), count);
    }

    /// Canned result for the next `exec` call matching `container_id`.
    pub async fn set_exec_result(&self, container_id: &str, result: ExecResult) {
        self.inner
            .lock()
            .await
            .exec_results
            .insert(container_id.to_string(), result);
    }

    pub async fn pulls(&self) -> Vec<String> {
        self.inner.lock().await.pulls.clone()
    }

    pub async fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.inner.lock().await.exec_calls.clone()
    }

    pub async fn removed_images(&self) -> Vec<String> {
        self.inner.lock().await.removed_images.clone()
    }

    pub async fn container(&self, id: &str) -> Option<ContainerInfo> {
        self.inner.lock().await.containers.get(id).map(|c| c.info.clone())
    }

    /// Looks up a container by its current (possibly swap-decorated) name,
    /// for tests asserting on which container ended up running under a
    /// given name after a swap or rollback.
    pub async fn container_by_name(&self, name: &str) -> Option<ContainerInfo> {
        self.inner
            .lock()
            .await
            .containers
            .values()
            .find(|c| c.info.name == name)
            .map(|c| c.info.clone())
    }

    /// Stamps `id`'s inspect response with a healthcheck status, so
    /// `ActionEngine`'s health probe observes it on the next
    /// `inspect_container` call.
    pub async fn set_health(&self, id: &str, status: bollard::models::HealthStatusEnum) {
        let mut state = self.inner.lock().await;
        if let Some(container) = state.containers.get_mut(id) {
            container.info.has_healthcheck = true;
            container.info.health = match status {
                bollard::models::HealthStatusEnum::HEALTHY => Some(crate::engine::HealthStatus::Healthy),
                bollard::models::HealthStatusEnum::UNHEALTHY => Some(crate::engine::HealthStatus::Unhealthy),
                _ => Some(crate::engine::HealthStatus::Starting),
            };
            let health = bollard::models::Health {
                status: Some(status),
                ..Default::default()
            };
            let mut container_state = container.info.raw.state.clone().unwrap_or_default();
            container_state.health = Some(health);
            container.info.raw.state = Some(container_state);
        }
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineOps for FakeEngine {
    fn list_containers<'a>(&'a self, all: bool) -> BoxFuture<'a, Vec<ContainerInfo>> {
        Box::pin(async move {
            let state = self.inner.lock().await;
            Ok(state
                .containers
                .values()
                .filter(|c| all || c.running)
                .map(|c| c.info.clone())
                .collect())
        })
    }

    fn inspect_container<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ContainerInspectResponse> {
        Box::pin(async move {
            let state = self.inner.lock().await;
            state
                .containers
                .get(id)
                .map(|c| c.info.raw.clone())
                .ok_or_else(|| EngineError::ContainerNotFound(id.to_string()))
        })
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.pulls.push(image.to_string());
            Ok(())
        })
    }

    fn inspect_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let state = self.inner.lock().await;
            Ok(state
                .images
                .get(image)
                .cloned()
                .unwrap_or_else(|| format!("sha256:{image}")))
        })
    }

    fn create_container<'a>(
        &'a self,
        name: &'a str,
        body: ContainerCreateBody,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.next_id += 1;
            let id = format!("fake-{}", state.next_id);

            let image = body.image.clone().unwrap_or_default();
            let image_id = state
                .images
                .get(&image)
                .cloned()
                .unwrap_or_else(|| format!("sha256:{image}"));

            let raw = ContainerInspectResponse {
                id: Some(id.clone()),
                name: Some(format!("/{name}")),
                image: Some(image_id.clone()),
                config: Some(ContainerConfig {
                    image: Some(image.clone()),
                    labels: body.labels.clone(),
                    ..Default::default()
                }),
                host_config: body.host_config.clone(),
                state: Some(ContainerState {
                    status: Some(bollard::models::ContainerStateStatusEnum::CREATED),
                    ..Default::default()
                }),
                ..Default::default()
            };

            let info = ContainerInfo {
                id: id.clone(),
                name: name.to_string(),
                image,
                image_id,
                state: "created".to_string(),
                labels: body.labels.clone().unwrap_or_default(),
                created_at: 0,
                started_at: None,
                has_healthcheck: false,
                health: None,
                links: vec![],
                mounts: vec![],
                networks: vec![],
                raw,
            };

            state.containers.insert(
                id.clone(),
                FakeContainer {
                    info,
                    running: false,
                },
            );
            Ok(id)
        })
    }

    fn rename_container<'a>(&'a self, id: &'a str, new_name: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            let container = state
                .containers
                .get_mut(id)
                .ok_or_else(|| EngineError::ContainerNotFound(id.to_string()))?;
            container.info.name = new_name.to_string();
            container.info.raw.name = Some(format!("/{new_name}"));
            Ok(())
        })
    }

    fn start_container<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            if let Some(remaining) = state.start_failures.get_mut(id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(EngineError::Timeout(Duration::from_secs(0)));
                }
            }
            let container = state
                .containers
                .get_mut(id)
                .ok_or_else(|| EngineError::ContainerNotFound(id.to_string()))?;
            container.running = true;
            container.info.state = "running".to_string();
            Ok(())
        })
    }

    fn stop_container<'a>(&'a self, id: &'a str, _timeout: Duration) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            let container = state
                .containers
                .get_mut(id)
                .ok_or_else(|| EngineError::ContainerNotFound(id.to_string()))?;
            container.running = false;
            container.info.state = "exited".to_string();
            Ok(())
        })
    }

    fn remove_container<'a>(&'a self, id: &'a str, _force: bool) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state
                .containers
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| EngineError::ContainerNotFound(id.to_string()))
        })
    }

    fn exec<'a>(
        &'a self,
        id: &'a str,
        cmd: &'a [String],
        _timeout: Duration,
    ) -> BoxFuture<'a, ExecResult> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            if !state.containers.contains_key(id) {
                return Err(EngineError::ContainerNotFound(id.to_string()));
            }
            state.exec_calls.push((id.to_string(), cmd.to_vec()));
            Ok(state
                .exec_results
                .get(id)
                .cloned()
                .unwrap_or(ExecResult {
                    exit_code: Some(0),
                    timed_out: false,
                }))
        })
    }

    fn remove_image<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.removed_images.push(id.to_string());
            Ok(())
        })
    }

    fn prune_images<'a>(&'a self) -> BoxFuture<'a, PruneResult> {
        Box::pin(async move { Ok(PruneResult::default()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(id: &str, name: &str, running: bool) -> FakeContainer {
        FakeContainer {
            info: ContainerInfo {
                id: id.to_string(),
                name: name.to_string(),
                image: "nginx:1.25".to_string(),
                image_id: "sha256:old".to_string(),
                state: if running { "running" } else { "exited" }.to_string(),
                labels: HashMap::new(),
                created_at: 0,
                started_at: None,
                has_healthcheck: false,
                health: None,
                links: vec![],
                mounts: vec![],
                networks: vec![],
                raw: ContainerInspectResponse::default(),
            },
            running,
        }
    }

    #[tokio::test]
    async fn list_containers_filters_stopped_when_not_all() {
        let fake = FakeEngine::new();
        fake.add_container(container("a", "web", true)).await;
        fake.add_container(container("b", "db", false)).await;

        assert_eq!(fake.list_containers(false).await.unwrap().len(), 1);
        assert_eq!(fake.list_containers(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_start_stop_remove_roundtrip() {
        let fake = FakeEngine::new();
        let body = ContainerCreateBody {
            image: Some("nginx:1.26".to_string()),
            ..Default::default()
        };
        let id = fake.create_container("web-new", body).await.unwrap();

        fake.start_container(&id).await.unwrap();
        assert_eq!(fake.container(&id).await.unwrap().state, "running");

        fake.stop_container(&id, Duration::from_secs(1)).await.unwrap();
        assert_eq!(fake.container(&id).await.unwrap().state, "exited");

        fake.remove_container(&id, false).await.unwrap();
        assert!(fake.container(&id).await.is_none());
    }

    #[tokio::test]
    async fn inspect_missing_container_errors() {
        let fake = FakeEngine::new();
        let err = fake.inspect_container("missing").await.unwrap_err();
        assert!(matches!(err, EngineError::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn exec_records_command_and_returns_canned_result() {
        let fake = FakeEngine::new();
        fake.add_container(container("a", "web", true)).await;
        fake.set_exec_result(
            "a",
            ExecResult {
                exit_code: Some(1),
                timed_out: false,
            },
        )
        .await;

        let result = fake
            .exec("a", &["curl".to_string(), "-f".to_string()], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(fake.exec_calls().await.len(), 1);
    }
}
