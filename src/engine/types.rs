//! Engine-level DTOs — the data the rest of the crate reads out of a
//! container inspect, translated from `bollard`'s wire types the same way
//! the teacher's `docker::inventory::ContainerInfo` translates
//! `ContainerInspectResponse`, extended with the fields the action engine
//! needs (health, links, mounts, full recreate spec).

use std::collections::HashMap;

use bollard::models::ContainerInspectResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Starting,
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone)]
pub struct MountInfo {
    pub source: String,
    pub destination: String,
    pub is_bind: bool,
    pub driver: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: String,
    /// Current name, without the leading slash bollard reports.
    pub name: String,
    /// Image reference as configured on the container (`repo:tag`).
    pub image: String,
    /// Current resolved image id (`sha256:...`).
    pub image_id: String,
    pub state: String,
    pub labels: HashMap<String, String>,
    pub created_at: i64,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub has_healthcheck: bool,
    pub health: Option<HealthStatus>,
    pub links: Vec<String>,
    pub mounts: Vec<MountInfo>,
    pub networks: Vec<String>,
    /// Full inspect response, kept so a swap can reconstruct a
    /// `ContainerCreateBody` verbatim from the running container's spec.
    pub raw: ContainerInspectResponse,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// Base name without the `-guerite-old-<suffix>` / `-guerite-new-<suffix>`
    /// decoration a swap-in-progress container carries.
    pub fn base_name(&self) -> &str {
        for marker in ["-guerite-old-", "-guerite-new-"] {
            if let Some(idx) = self.name.find(marker) {
                return &self.name[..idx];
            }
        }
        &self.name
    }
}

impl From<ContainerInspectResponse> for ContainerInfo {
    fn from(details: ContainerInspectResponse) -> Self {
        let name = details
            .name
            .as_deref()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let config = details.config.clone();
        let labels = config
            .as_ref()
            .and_then(|c| c.labels.clone())
            .unwrap_or_default();

        let image = config
            .as_ref()
            .and_then(|c| c.image.clone())
            .unwrap_or_default();
        let image_id = details.image.clone().unwrap_or_default();

        let state = details
            .state
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .map(|s| s.to_string().to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());

        let started_at = details
            .state
            .as_ref()
            .and_then(|s| s.started_at.as_deref())
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc));

        let (has_healthcheck, health) = details
            .state
            .as_ref()
            .and_then(|s| s.health.as_ref())
            .map(|h| {
                let status = h.status.map(|s| match s {
                    bollard::models::HealthStatusEnum::STARTING => Some(HealthStatus::Starting),
                    bollard::models::HealthStatusEnum::HEALTHY => Some(HealthStatus::Healthy),
                    bollard::models::HealthStatusEnum::UNHEALTHY => Some(HealthStatus::Unhealthy),
                    _ => None,
                });
                (true, status.flatten())
            })
            .unwrap_or((false, None));

        let links = details
            .host_config
            .as_ref()
            .and_then(|hc| hc.links.clone())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|l| l.split(':').next().map(|s| s.trim_start_matches('/').to_string()))
            .collect();

        let mounts = details
            .mounts
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountInfo {
                source: m.source.unwrap_or_default(),
                destination: m.destination.unwrap_or_default(),
                is_bind: matches!(m.typ, Some(bollard::models::MountPointTypeEnum::BIND)),
                driver: m.driver,
            })
            .collect();

        let networks = details
            .network_settings
            .as_ref()
            .and_then(|ns| ns.networks.as_ref())
            .map(|n| n.keys().cloned().collect())
            .unwrap_or_default();

        let created_at = details
            .created
            .as_deref()
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.timestamp())
            .unwrap_or(0);

        Self {
            id: details.id.clone().unwrap_or_default(),
            name,
            image,
            image_id,
            state,
            labels,
            created_at,
            started_at,
            has_healthcheck,
            health,
            links,
            mounts,
            networks,
            raw: details,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub exit_code: Option<i64>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PruneResult {
    pub images_deleted: usize,
    pub space_reclaimed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_info(name: &str) -> ContainerInfo {
        ContainerInfo {
            id: "abc".into(),
            name: name.into(),
            image: "nginx:1.25".into(),
            image_id: "sha256:aaa".into(),
            state: "running".into(),
            labels: HashMap::new(),
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
    fn base_name_strips_old_suffix() {
        let info = base_info("web-guerite-old-ab12cd");
        assert_eq!(info.base_name(), "web");
    }

    #[test]
    fn base_name_strips_new_suffix() {
        let info = base_info("web-guerite-new-ab12cd");
        assert_eq!(info.base_name(), "web");
    }

    #[test]
    fn base_name_passthrough_for_plain_names() {
        let info = base_info("web");
        assert_eq!(info.base_name(), "web");
    }

    #[test]
    fn is_running_reflects_state() {
        let mut info = base_info("web");
        assert!(info.is_running());
        info.state = "exited".into();
        assert!(!info.is_running());
    }
}
