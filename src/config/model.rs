//! Model — `Config`, the typed settings struct every component reads from,
//! and `NotificationCategory`, the enabled-event filter set.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use super::labels::LabelKeys;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),
    #[error("invalid time zone `{0}`")]
    InvalidTimeZone(String),
    #[error("{0} must be > 0")]
    NotPositive(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    Update,
    Restart,
    Recreate,
    Health,
    Startup,
    Detect,
    Prune,
}

impl NotificationCategory {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "update" => Some(Self::Update),
            "restart" => Some(Self::Restart),
            "recreate" => Some(Self::Recreate),
            "health" => Some(Self::Health),
            "startup" => Some(Self::Startup),
            "detect" => Some(Self::Detect),
            "prune" => Some(Self::Prune),
            _ => None,
        }
    }

    const ALL: [NotificationCategory; 7] = [
        Self::Update,
        Self::Restart,
        Self::Recreate,
        Self::Health,
        Self::Startup,
        Self::Detect,
        Self::Prune,
    ];
}

/// Every tunable the daemon reads, resolved once at startup.
///
/// No component reaches into the environment directly after this struct is
/// built — they take the relevant field or the whole `Config` by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub docker_host: Option<String>,
    pub tz: chrono_tz::Tz,
    pub state_file: String,

    pub tick_interval: Duration,

    pub health_check_backoff: Duration,
    pub health_check_timeout: Duration,
    pub action_cooldown: Duration,
    pub restart_retry_limit: u32,
    pub stop_timeout: Duration,
    pub rollback_grace: Duration,
    pub prune_timeout: Duration,
    pub hook_timeout: Duration,

    pub prune_cron: Option<String>,

    pub notifications: HashSet<NotificationCategory>,
    pub notify_webhook_url: Option<String>,
    pub notify_pushover_token: Option<String>,
    pub notify_pushover_user_key: Option<String>,

    pub dry_run: bool,
    pub monitor_only: bool,
    pub no_pull: bool,
    pub no_restart: bool,
    pub rolling_restart: bool,
    pub run_once: bool,

    pub scope: Option<String>,
    pub include_containers: Vec<String>,
    pub exclude_containers: Vec<String>,

    pub http_api: bool,
    pub http_api_host: String,
    pub http_api_port: u16,
    pub http_api_token: Option<String>,
    pub http_api_metrics: bool,

    pub labels: LabelKeys,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.restart_retry_limit == 0 {
            return Err(ConfigError::NotPositive("GUERITE_RESTART_RETRY_LIMIT"));
        }
        if self.health_check_timeout.is_zero() {
            return Err(ConfigError::NotPositive("GUERITE_HEALTH_CHECK_TIMEOUT_SECONDS"));
        }
        Ok(())
    }

    pub fn notifies(&self, category: NotificationCategory) -> bool {
        self.notifications.contains(&category)
    }

    pub(super) fn parse_notifications(raw: &str) -> HashSet<NotificationCategory> {
        if raw.trim().is_empty() {
            return NotificationCategory::ALL.into_iter().collect();
        }
        let mut set = HashSet::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.eq_ignore_ascii_case("all") {
                return NotificationCategory::ALL.into_iter().collect();
            }
            if let Some(cat) = NotificationCategory::parse(part) {
                set.insert(cat);
            }
        }
        set
    }

    /// Fixture config for unit tests across other modules: defaults
    /// matching `from_env()` with no environment variables set.
    #[cfg(test)]
    pub fn default_for_test() -> Self {
        Self {
            docker_host: None,
            tz: chrono_tz::Tz::UTC,
            state_file: "/tmp/guerite-test-state.json".to_string(),
            tick_interval: Duration::from_secs(60),
            health_check_backoff: Duration::from_secs(300),
            health_check_timeout: Duration::from_secs(60),
            action_cooldown: Duration::from_secs(60),
            restart_retry_limit: 3,
            stop_timeout: Duration::from_secs(10),
            rollback_grace: Duration::from_secs(3600),
            prune_timeout: Duration::from_secs(180),
            hook_timeout: Duration::from_secs(60),
            prune_cron: None,
            notifications: NotificationCategory::ALL.into_iter().collect(),
            notify_webhook_url: None,
            notify_pushover_token: None,
            notify_pushover_user_key: None,
            dry_run: false,
            monitor_only: false,
            no_pull: false,
            no_restart: false,
            rolling_restart: false,
            run_once: false,
            scope: None,
            include_containers: Vec::new(),
            exclude_containers: Vec::new(),
            http_api: false,
            http_api_host: "0.0.0.0".to_string(),
            http_api_port: 8000,
            http_api_token: None,
            http_api_metrics: true,
            labels: LabelKeys::default(),
        }
    }
}
