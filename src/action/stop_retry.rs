//! `stop_with_retry` — shared between the in-place restart path (4.6.a) and
//! the swap's "stop the old container" step (Prepared → Swapping): timeout
//! once, retry with double the timeout, then force-kill.

use std::time::Duration;

use crate::engine::{EngineError, EngineOps};

pub async fn stop_with_retry(
    engine: &dyn EngineOps,
    id: &str,
    timeout: Duration,
) -> Result<(), EngineError> {
    if let Err(err) = engine.stop_container(id, timeout).await {
        tracing::warn!(container_id = id, error = %err, timeout = ?timeout, "stop timed out, retrying with doubled timeout");

        let doubled = timeout * 2;
        if let Err(err) = engine.stop_container(id, doubled).await {
            tracing::warn!(container_id = id, error = %err, timeout = ?doubled, "stop failed again, force-killing");
            return engine.stop_container(id, Duration::from_secs(0)).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::FakeContainer;
    use crate::engine::{ContainerInfo, FakeEngine};
    use bollard::models::ContainerInspectResponse;
    use std::collections::HashMap;

    fn container(id: &str) -> FakeContainer {
        FakeContainer {
            info: ContainerInfo {
                id: id.to_string(),
                name: "web".to_string(),
                image: "nginx:1.25".to_string(),
                image_id: "sha256:aaa".to_string(),
                state: "running".to_string(),
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
            running: true,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let engine = FakeEngine::new();
        engine.add_container(container("c1")).await;
        stop_with_retry(&engine, "c1", Duration::from_secs(10)).await.unwrap();
        assert_eq!(engine.container("c1").await.unwrap().state, "exited");
    }

    #[tokio::test]
    async fn missing_container_surfaces_not_found_after_exhausting_retries() {
        let engine = FakeEngine::new();
        let err = stop_with_retry(&engine, "missing", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ContainerNotFound(_)));
    }
}
