//! Process metrics (§6: `GET /v1/metrics`) — atomic counters in the shape
//! of the teacher's `SubscriptionMetrics` (`cluster::metrics`), rendered by
//! hand into Prometheus text exposition format since nothing in the
//! retrieval pack pulls in a dedicated Prometheus client crate.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::scheduler::ActionKind;

#[derive(Default)]
struct KindCounters {
    success: AtomicU64,
    failure: AtomicU64,
}

pub struct Metrics {
    cycles_executed: AtomicU64,
    rollbacks: AtomicU64,
    last_cycle_duration_ms: AtomicU64,
    monitored_containers: AtomicI64,
    update: KindCounters,
    recreate: KindCounters,
    restart: KindCounters,
    health_restart: KindCounters,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            cycles_executed: AtomicU64::new(0),
            rollbacks: AtomicU64::new(0),
            last_cycle_duration_ms: AtomicU64::new(0),
            monitored_containers: AtomicI64::new(0),
            update: KindCounters::default(),
            recreate: KindCounters::default(),
            restart: KindCounters::default(),
            health_restart: KindCounters::default(),
        }
    }

    fn counters(&self, kind: ActionKind) -> &KindCounters {
        match kind {
            ActionKind::Update => &self.update,
            ActionKind::Recreate => &self.recreate,
            ActionKind::Restart => &self.restart,
            ActionKind::HealthRestart => &self.health_restart,
        }
    }

    pub fn record_outcome(&self, outcome: &crate::action::Outcome) {
        use crate::action::Outcome;
        match outcome {
            Outcome::Restarted { .. } => {
                self.restart.success.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::RestartFailed { .. } => {
                self.restart.failure.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Committed { kind, .. } => {
                self.counters(*kind).success.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::RolledBack { kind, .. } => {
                self.counters(*kind).failure.fetch_add(1, Ordering::Relaxed);
                self.rollbacks.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed { kind, .. } => {
                self.counters(*kind).failure.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Skipped { .. } => {}
        }
    }

    pub fn record_cycle(&self, duration: std::time::Duration, monitored: usize) {
        self.cycles_executed.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_duration_ms
            .store(duration.as_millis() as u64, Ordering::Relaxed);
        self.monitored_containers.store(monitored as i64, Ordering::Relaxed);
    }

    /// Renders the Prometheus text exposition format described in §6:
    /// cycles executed, per-kind success/failure, rollback counter,
    /// last-cycle duration, currently-monitored-containers gauge.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP guerite_cycles_executed_total Number of scheduling cycles run.\n");
        out.push_str("# TYPE guerite_cycles_executed_total counter\n");
        out.push_str(&format!(
            "guerite_cycles_executed_total {}\n",
            self.cycles_executed.load(Ordering::Relaxed)
        ));

        out.push_str("# HELP guerite_action_total Actions attempted, by kind and outcome.\n");
        out.push_str("# TYPE guerite_action_total counter\n");
        for (label, counters) in [
            ("update", &self.update),
            ("recreate", &self.recreate),
            ("restart", &self.restart),
            ("health_restart", &self.health_restart),
        ] {
            out.push_str(&format!(
                "guerite_action_total{{kind=\"{label}\",outcome=\"success\"}} {}\n",
                counters.success.load(Ordering::Relaxed)
            ));
            out.push_str(&format!(
                "guerite_action_total{{kind=\"{label}\",outcome=\"failure\"}} {}\n",
                counters.failure.load(Ordering::Relaxed)
            ));
        }

        out.push_str("# HELP guerite_rollbacks_total Actions that ended RolledBack.\n");
        out.push_str("# TYPE guerite_rollbacks_total counter\n");
        out.push_str(&format!(
            "guerite_rollbacks_total {}\n",
            self.rollbacks.load(Ordering::Relaxed)
        ));

        out.push_str("# HELP guerite_last_cycle_duration_seconds Wall time of the most recent cycle.\n");
        out.push_str("# TYPE guerite_last_cycle_duration_seconds gauge\n");
        out.push_str(&format!(
            "guerite_last_cycle_duration_seconds {:.3}\n",
            self.last_cycle_duration_ms.load(Ordering::Relaxed) as f64 / 1000.0
        ));

        out.push_str("# HELP guerite_monitored_containers Containers monitored in the most recent cycle.\n");
        out.push_str("# TYPE guerite_monitored_containers gauge\n");
        out.push_str(&format!(
            "guerite_monitored_containers {}\n",
            self.monitored_containers.load(Ordering::Relaxed)
        ));

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Outcome;

    #[test]
    fn committed_update_increments_success_counter() {
        let metrics = Metrics::new();
        metrics.record_outcome(&Outcome::Committed {
            name: "web".into(),
            kind: ActionKind::Update,
        });
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("kind=\"update\",outcome=\"success\"} 1"));
    }

    #[test]
    fn rolled_back_increments_failure_and_rollback_counters() {
        let metrics = Metrics::new();
        metrics.record_outcome(&Outcome::RolledBack {
            name: "web".into(),
            kind: ActionKind::Recreate,
        });
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("kind=\"recreate\",outcome=\"failure\"} 1"));
        assert!(rendered.contains("guerite_rollbacks_total 1"));
    }

    #[test]
    fn cycle_recording_updates_gauges() {
        let metrics = Metrics::new();
        metrics.record_cycle(std::time::Duration::from_millis(2500), 7);
        let rendered = metrics.render_prometheus();
        assert!(rendered.contains("guerite_last_cycle_duration_seconds 2.500"));
        assert!(rendered.contains("guerite_monitored_containers 7"));
    }
}
