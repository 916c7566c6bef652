//! `BackoffRecord` — the persisted per-container scheduling memory (§3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure backoff doubles up to this cap.
pub const MAX_BACKOFF: std::time::Duration = std::time::Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffRecord {
    pub last_health_restart_ts: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub backoff_until_ts: Option<DateTime<Utc>>,
    pub last_action_ts: Option<DateTime<Utc>>,

    /// Fields this build doesn't know about yet, preserved verbatim across
    /// a load/commit cycle so an older or newer Guerite build sharing the
    /// same state file doesn't lose data it can't interpret.
    #[serde(flatten)]
    pub unknown: serde_json::Map<String, serde_json::Value>,
}

impl Default for BackoffRecord {
    fn default() -> Self {
        Self {
            last_health_restart_ts: None,
            consecutive_failures: 0,
            backoff_until_ts: None,
            last_action_ts: None,
            unknown: serde_json::Map::new(),
        }
    }
}

impl BackoffRecord {
    pub fn is_in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.backoff_until_ts.is_some_and(|until| now < until)
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>, cooldown: std::time::Duration) -> bool {
        self.last_action_ts
            .is_some_and(|last| now < last + cooldown)
    }

    /// Record a successful action: clears failure state, stamps `last_action_ts`.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.backoff_until_ts = None;
        self.last_action_ts = Some(now);
    }

    /// Record a failed action: bumps `consecutive_failures` and doubles the
    /// backoff window up to `MAX_BACKOFF`.
    pub fn record_failure(&mut self, now: DateTime<Utc>, base: std::time::Duration) {
        self.consecutive_failures += 1;
        let backoff = base
            .saturating_mul(1 << self.consecutive_failures.min(16))
            .min(MAX_BACKOFF);
        self.backoff_until_ts = Some(now + backoff);
        self.last_action_ts = Some(now);
    }

    pub fn record_health_restart(&mut self, now: DateTime<Utc>) {
        self.last_health_restart_ts = Some(now);
        self.last_action_ts = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn success_clears_failure_state() {
        let mut record = BackoffRecord {
            consecutive_failures: 3,
            backoff_until_ts: Some(t(100)),
            ..Default::default()
        };
        record.record_success(t(50));
        assert_eq!(record.consecutive_failures, 0);
        assert!(record.backoff_until_ts.is_none());
        assert_eq!(record.last_action_ts, Some(t(50)));
    }

    #[test]
    fn failure_backoff_doubles_and_caps() {
        let mut record = BackoffRecord::default();
        let base = std::time::Duration::from_secs(60);

        record.record_failure(t(0), base);
        assert_eq!(record.consecutive_failures, 1);
        assert_eq!(record.backoff_until_ts, Some(t(0) + base * 2));

        record.record_failure(t(0), base);
        assert_eq!(record.consecutive_failures, 2);
        assert_eq!(record.backoff_until_ts, Some(t(0) + base * 4));
    }

    #[test]
    fn backoff_caps_at_one_hour() {
        let mut record = BackoffRecord {
            consecutive_failures: 20,
            ..Default::default()
        };
        record.record_failure(t(0), std::time::Duration::from_secs(60));
        assert_eq!(record.backoff_until_ts, Some(t(0) + MAX_BACKOFF));
    }

    #[test]
    fn in_backoff_and_cooldown_checks() {
        let record = BackoffRecord {
            backoff_until_ts: Some(t(100)),
            last_action_ts: Some(t(0)),
            ..Default::default()
        };
        assert!(record.is_in_backoff(t(50)));
        assert!(!record.is_in_backoff(t(150)));
        assert!(record.in_cooldown(t(30), std::time::Duration::from_secs(60)));
        assert!(!record.in_cooldown(t(90), std::time::Duration::from_secs(60)));
    }

    #[test]
    fn unknown_fields_round_trip() {
        let json = r#"{"last_health_restart_ts":null,"consecutive_failures":2,"backoff_until_ts":null,"last_action_ts":null,"future_field":"kept"}"#;
        let record: BackoffRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record.unknown.get("future_field").and_then(|v| v.as_str()),
            Some("kept")
        );
        let round_tripped = serde_json::to_string(&record).unwrap();
        assert!(round_tripped.contains("future_field"));
    }
}
