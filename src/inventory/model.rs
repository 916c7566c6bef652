//! `MonitoredContainer` — the per-cycle immutable snapshot the scheduler,
//! planner, and action engine all read from (§3).

use std::collections::HashMap;
use std::time::Duration;

use bollard::models::ContainerInspectResponse;
use chrono::{DateTime, Utc};

use crate::engine::{ContainerInfo, HealthStatus};

#[derive(Debug, Clone, Default)]
pub struct HookCommands {
    pub pre_check: Option<(Vec<String>, Duration)>,
    pub pre_update: Option<(Vec<String>, Duration)>,
    pub post_update: Option<(Vec<String>, Duration)>,
    pub post_check: Option<(Vec<String>, Duration)>,
}

#[derive(Debug, Clone, Default)]
pub struct ActionCrons {
    pub update: Option<String>,
    pub restart: Option<String>,
    pub recreate: Option<String>,
    pub health_check: Option<String>,
}

impl ActionCrons {
    pub fn is_empty(&self) -> bool {
        self.update.is_none()
            && self.restart.is_none()
            && self.recreate.is_none()
            && self.health_check.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub monitor_only: bool,
    pub no_pull: bool,
    pub no_restart: bool,
}

/// Immutable snapshot of one container, built fresh by Inventory at the
/// start of each cycle and never mutated afterward.
#[derive(Debug, Clone)]
pub struct MonitoredContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub image_id: String,
    pub project: Option<String>,
    pub links: Vec<String>,
    pub depends_on: Vec<String>,
    pub crons: ActionCrons,
    pub overrides: Overrides,
    pub hooks: HookCommands,
    pub has_healthcheck: bool,
    pub health: Option<HealthStatus>,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub labels: HashMap<String, String>,
    pub raw: ContainerInspectResponse,
}

impl MonitoredContainer {
    pub fn base_name(&self) -> &str {
        for marker in ["-guerite-old-", "-guerite-new-"] {
            if let Some(idx) = self.name.find(marker) {
                return &self.name[..idx];
            }
        }
        &self.name
    }

    pub fn is_healthy(&self) -> bool {
        !self.has_healthcheck || matches!(self.health, Some(HealthStatus::Healthy))
    }

    pub fn running_since(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.started_at.map(|t| now - t)
    }
}

impl From<(ContainerInfo, &crate::config::LabelKeys)> for MonitoredContainer {
    fn from((info, keys): (ContainerInfo, &crate::config::LabelKeys)) -> Self {
        let get = |key: &str| info.labels.get(key).cloned();
        let get_duration = |key: &str, default: u64| {
            info.labels
                .get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(default))
        };
        let hook = |cmd_key: &str, timeout_key: &str| {
            get(cmd_key).map(|cmd| {
                (
                    shell_words(&cmd),
                    get_duration(timeout_key, 60),
                )
            })
        };
        let list = |key: &str| {
            get(key)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        let flag = |key: &str| get(key).as_deref() == Some("true");

        let project = info
            .labels
            .get("com.docker.compose.project")
            .cloned()
            .or_else(|| info.labels.get(&keys.scope).cloned());

        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            image: info.image.clone(),
            image_id: info.image_id.clone(),
            project,
            links: info.links.clone(),
            depends_on: list(&keys.depends_on),
            crons: ActionCrons {
                update: get(&keys.update),
                restart: get(&keys.restart),
                recreate: get(&keys.recreate),
                health_check: get(&keys.health_check),
            },
            overrides: Overrides {
                monitor_only: flag(&keys.monitor_only),
                no_pull: flag(&keys.no_pull),
                no_restart: flag(&keys.no_restart),
            },
            hooks: HookCommands {
                pre_check: hook(&keys.hook_pre_check, &keys.hook_pre_check_timeout),
                pre_update: hook(&keys.hook_pre_update, &keys.hook_pre_update_timeout),
                post_update: hook(&keys.hook_post_update, &keys.hook_post_update_timeout),
                post_check: hook(&keys.hook_post_check, &keys.hook_post_check_timeout),
            },
            has_healthcheck: info.has_healthcheck,
            health: info.health,
            running: info.state == "running",
            started_at: info.started_at,
            labels: info.labels.clone(),
            raw: info.raw,
        }
    }
}

/// Minimal whitespace-based command splitting. Hook labels are plain shell
/// one-liners (`"curl -f http://localhost/health"`); Guerite does not
/// attempt quoting or variable expansion, it passes the split tokens
/// straight to the engine's exec facility.
fn shell_words(cmd: &str) -> Vec<String> {
    cmd.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelKeys;

    fn info_with_labels(labels: HashMap<String, String>) -> ContainerInfo {
        ContainerInfo {
            id: "abc".into(),
            name: "web".into(),
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
        }
    }

    #[test]
    fn parses_cron_labels_and_overrides() {
        let keys = LabelKeys::default();
        let mut labels = HashMap::new();
        labels.insert(keys.update.clone(), "* * * * *".to_string());
        labels.insert(keys.no_pull.clone(), "true".to_string());
        labels.insert(keys.depends_on.clone(), "db, cache".to_string());

        let monitored = MonitoredContainer::from((info_with_labels(labels), &keys));
        assert_eq!(monitored.crons.update.as_deref(), Some("* * * * *"));
        assert!(monitored.overrides.no_pull);
        assert!(!monitored.overrides.no_restart);
        assert_eq!(monitored.depends_on, vec!["db", "cache"]);
    }

    #[test]
    fn hook_command_and_timeout_parsed_together() {
        let keys = LabelKeys::default();
        let mut labels = HashMap::new();
        labels.insert(keys.hook_pre_check.clone(), "curl -f http://x/health".to_string());
        labels.insert(keys.hook_pre_check_timeout.clone(), "5".to_string());

        let monitored = MonitoredContainer::from((info_with_labels(labels), &keys));
        let (cmd, timeout) = monitored.hooks.pre_check.unwrap();
        assert_eq!(cmd, vec!["curl", "-f", "http://x/health"]);
        assert_eq!(timeout, Duration::from_secs(5));
    }

    #[test]
    fn base_name_strips_swap_suffix() {
        let keys = LabelKeys::default();
        let mut info = info_with_labels(HashMap::new());
        info.name = "web-guerite-old-ab12cd".to_string();
        let monitored = MonitoredContainer::from((info, &keys));
        assert_eq!(monitored.base_name(), "web");
    }
}
