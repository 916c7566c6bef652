//! Container Inventory (§4.3) — queries the engine, filters, detects newly
//! seen containers, and groups the survivors by project.

use std::collections::{BTreeMap, HashSet};

use tokio::sync::Mutex;

use crate::config::Config;
use crate::engine::EngineOps;

use super::model::MonitoredContainer;

const SWARM_SERVICE_LABEL: &str = "com.docker.swarm.service.name";

pub struct InventoryCycle {
    /// Monitored containers grouped by project; `None` key = ungrouped
    /// singletons.
    pub groups: BTreeMap<Option<String>, Vec<MonitoredContainer>>,
    /// Names not seen in any previous cycle since process start.
    pub newly_detected: Vec<String>,
}

/// Tracks names seen across cycles so Detect events fire only for
/// containers genuinely new to this process's view of the world.
pub struct Inventory {
    previous_names: Mutex<HashSet<String>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            previous_names: Mutex::new(HashSet::new()),
        }
    }

    pub async fn collect(
        &self,
        engine: &dyn EngineOps,
        config: &Config,
    ) -> Result<InventoryCycle, crate::engine::EngineError> {
        let containers = engine.list_containers(true).await?;

        let mut monitored: Vec<MonitoredContainer> = containers
            .into_iter()
            .filter(|c| has_action_label(c, config))
            .filter(|c| !is_swarm_managed(c))
            .map(|c| MonitoredContainer::from((c, &config.labels)))
            .collect();

        if !config.include_containers.is_empty() {
            monitored.retain(|c| config.include_containers.iter().any(|n| n == c.base_name()));
        }
        if !config.exclude_containers.is_empty() {
            monitored.retain(|c| !config.exclude_containers.iter().any(|n| n == c.base_name()));
        }
        if let Some(scope) = &config.scope {
            monitored.retain(|c| c.labels.get(&config.labels.scope).map(|s| s.as_str()) == Some(scope.as_str()));
        }

        let current_names: HashSet<String> = monitored.iter().map(|c| c.name.clone()).collect();
        let mut previous = self.previous_names.lock().await;
        let newly_detected: Vec<String> = current_names
            .iter()
            .filter(|name| !previous.contains(*name))
            .cloned()
            .collect();
        *previous = current_names;
        drop(previous);

        let mut groups: BTreeMap<Option<String>, Vec<MonitoredContainer>> = BTreeMap::new();
        for container in monitored {
            groups.entry(container.project.clone()).or_default().push(container);
        }

        Ok(InventoryCycle {
            groups,
            newly_detected,
        })
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

fn has_action_label(info: &crate::engine::ContainerInfo, config: &Config) -> bool {
    let keys = &config.labels;
    [&keys.update, &keys.restart, &keys.recreate, &keys.health_check]
        .into_iter()
        .any(|key| info.labels.contains_key(key))
}

fn is_swarm_managed(info: &crate::engine::ContainerInfo) -> bool {
    info.labels.contains_key(SWARM_SERVICE_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::{ContainerInfo, FakeEngine};
    use crate::engine::fake::FakeContainer;
    use bollard::models::ContainerInspectResponse;
    use std::collections::HashMap;

    fn container(id: &str, name: &str, labels: HashMap<String, String>) -> FakeContainer {
        FakeContainer {
            info: ContainerInfo {
                id: id.into(),
                name: name.into(),
                image: "nginx:1.25".into(),
                image_id: "sha256:aaa".into(),
                state: "running".into(),
                labels,
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

    fn test_config() -> Config {
        let mut config = Config::default_for_test();
        config.labels = crate::config::LabelKeys::default();
        config
    }

    #[tokio::test]
    async fn excludes_containers_without_action_labels() {
        let fake = FakeEngine::new();
        fake.add_container(container("a", "plain", HashMap::new())).await;
        let config = test_config();

        let cycle = Inventory::new().collect(&fake, &config).await.unwrap();
        assert_eq!(cycle.groups.values().map(|v| v.len()).sum::<usize>(), 0);
    }

    #[tokio::test]
    async fn excludes_swarm_managed_containers() {
        let fake = FakeEngine::new();
        let keys = crate::config::LabelKeys::default();
        let mut labels = HashMap::new();
        labels.insert(keys.update.clone(), "* * * * *".into());
        labels.insert(SWARM_SERVICE_LABEL.to_string(), "svc_web".into());
        fake.add_container(container("a", "web", labels)).await;

        let config = test_config();
        let cycle = Inventory::new().collect(&fake, &config).await.unwrap();
        assert_eq!(cycle.groups.values().map(|v| v.len()).sum::<usize>(), 0);
    }

    #[tokio::test]
    async fn new_containers_are_detected_once() {
        let fake = FakeEngine::new();
        let keys = crate::config::LabelKeys::default();
        let mut labels = HashMap::new();
        labels.insert(keys.update.clone(), "* * * * *".into());
        fake.add_container(container("a", "web", labels)).await;

        let config = test_config();
        let inventory = Inventory::new();

        let first = inventory.collect(&fake, &config).await.unwrap();
        assert_eq!(first.newly_detected, vec!["web".to_string()]);

        let second = inventory.collect(&fake, &config).await.unwrap();
        assert!(second.newly_detected.is_empty());
    }

    #[tokio::test]
    async fn groups_by_project_label() {
        let fake = FakeEngine::new();
        let keys = crate::config::LabelKeys::default();
        let mut labels_a = HashMap::new();
        labels_a.insert(keys.update.clone(), "* * * * *".into());
        labels_a.insert("com.docker.compose.project".to_string(), "stack1".into());
        fake.add_container(container("a", "web", labels_a)).await;

        let mut labels_b = HashMap::new();
        labels_b.insert(keys.restart.clone(), "0 0 * * * *".into());
        fake.add_container(container("b", "standalone", labels_b)).await;

        let config = test_config();
        let cycle = Inventory::new().collect(&fake, &config).await.unwrap();

        assert!(cycle.groups.contains_key(&Some("stack1".to_string())));
        assert!(cycle.groups.contains_key(&None));
    }
}
