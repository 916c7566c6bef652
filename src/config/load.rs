//! Load — `Config::from_env`, following the teacher's `AgentConfig::from_env`
//! shape: every field has a sensible default, parse failures fall back to
//! the default rather than aborting startup.

use std::time::Duration;

use super::labels::LabelKeys;
use super::model::{Config, ConfigError};

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let tz_name = std::env::var("GUERITE_TZ").unwrap_or_else(|_| "UTC".to_string());
        let tz: chrono_tz::Tz = tz_name
            .parse()
            .map_err(|_| ConfigError::InvalidTimeZone(tz_name.clone()))?;

        let http_api_host =
            std::env::var("GUERITE_HTTP_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let http_api_port = std::env::var("GUERITE_HTTP_API_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000u16);

        let config = Config {
            docker_host: std::env::var("DOCKER_HOST").ok(),
            tz,
            state_file: std::env::var("GUERITE_STATE_FILE")
                .unwrap_or_else(|_| "/var/lib/guerite/state.json".to_string()),

            tick_interval: env_secs("GUERITE_TICK_INTERVAL_SECONDS", 60),

            health_check_backoff: env_secs("GUERITE_HEALTH_CHECK_BACKOFF_SECONDS", 300),
            health_check_timeout: env_secs("GUERITE_HEALTH_CHECK_TIMEOUT_SECONDS", 60),
            action_cooldown: env_secs("GUERITE_ACTION_COOLDOWN_SECONDS", 60),
            restart_retry_limit: env_u32("GUERITE_RESTART_RETRY_LIMIT", 3),
            stop_timeout: env_secs("GUERITE_STOP_TIMEOUT_SECONDS", 10),
            rollback_grace: env_secs("GUERITE_ROLLBACK_GRACE_SECONDS", 3600),
            prune_timeout: env_secs("GUERITE_PRUNE_TIMEOUT_SECONDS", 180),
            hook_timeout: env_secs("GUERITE_HOOK_TIMEOUT_SECONDS", 60),

            prune_cron: std::env::var("GUERITE_PRUNE_CRON").ok(),

            notifications: Config::parse_notifications(
                &std::env::var("GUERITE_NOTIFICATIONS").unwrap_or_default(),
            ),
            notify_webhook_url: std::env::var("GUERITE_NOTIFY_WEBHOOK_URL").ok(),
            notify_pushover_token: std::env::var("GUERITE_NOTIFY_PUSHOVER_TOKEN").ok(),
            notify_pushover_user_key: std::env::var("GUERITE_NOTIFY_PUSHOVER_USER_KEY").ok(),

            dry_run: env_bool("GUERITE_DRY_RUN", false),
            monitor_only: env_bool("GUERITE_MONITOR_ONLY", false),
            no_pull: env_bool("GUERITE_NO_PULL", false),
            no_restart: env_bool("GUERITE_NO_RESTART", false),
            rolling_restart: env_bool("GUERITE_ROLLING_RESTART", false),
            run_once: env_bool("GUERITE_RUN_ONCE", false),

            scope: std::env::var("GUERITE_SCOPE").ok(),
            include_containers: env_list("GUERITE_INCLUDE_CONTAINERS"),
            exclude_containers: env_list("GUERITE_EXCLUDE_CONTAINERS"),

            http_api: env_bool("GUERITE_HTTP_API", false),
            http_api_host,
            http_api_port,
            http_api_token: std::env::var("GUERITE_HTTP_API_TOKEN").ok(),
            http_api_metrics: env_bool("GUERITE_HTTP_API_METRICS", true),

            labels: LabelKeys::from_env(),
        };

        config.validate()?;
        Ok(config)
    }
}
