//! Scheduler (§4.5) — pure decision layer between Inventory/Planner and the
//! Action Engine. Given a cycle's containers, the time window since the
//! previous tick, and the persisted backoff state, decides at most one
//! `ActionKind` per container and applies the global/per-container
//! modifiers and rolling-restart fairness rule.
//!
//! Deliberately takes no engine handle: everything it needs is already in
//! `MonitoredContainer` and `BackoffRecord`, so it can be exercised with
//! plain fixtures and no I/O.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::cron::CronEvaluator;
use crate::inventory::MonitoredContainer;
use crate::state::BackoffRecord;

use super::types::{ActionKind, ActionModifiers, PlannedAction, RollingState};

pub struct Scheduler<'a> {
    pub evaluator: &'a CronEvaluator,
    pub config: &'a Config,
}

impl<'a> Scheduler<'a> {
    pub fn new(evaluator: &'a CronEvaluator, config: &'a Config) -> Self {
        Self { evaluator, config }
    }

    /// Decide planned actions for one cycle.
    ///
    /// `rolling` carries the scheduler's own fairness memory across cycles;
    /// it is not persisted, mirroring Inventory's in-memory `previous_names`
    /// set for the Detect batch.
    pub fn plan(
        &self,
        containers: &[MonitoredContainer],
        now: DateTime<Utc>,
        prev_tick: DateTime<Utc>,
        state: &BTreeMap<String, BackoffRecord>,
        rolling: &mut RollingState,
    ) -> Vec<PlannedAction> {
        let mut candidates: Vec<PlannedAction> = Vec::new();

        for container in containers {
            let name = container.base_name().to_string();
            let record = state.get(&name);

            if record.is_some_and(|r| r.is_in_backoff(now)) {
                continue;
            }
            if record.is_some_and(|r| r.in_cooldown(now, self.config.action_cooldown)) {
                continue;
            }

            let Some(kind) = self.resolve_kind(container, now, prev_tick, record) else {
                continue;
            };

            let modifiers = ActionModifiers {
                monitor_only: self.config.monitor_only || container.overrides.monitor_only,
                no_pull: self.config.no_pull || container.overrides.no_pull,
                no_restart: self.config.no_restart || container.overrides.no_restart,
            };

            candidates.push(PlannedAction {
                name,
                project: container.project.clone(),
                kind,
                modifiers,
            });
        }

        if self.config.rolling_restart {
            self.apply_rolling_cap(candidates, rolling)
        } else {
            candidates
        }
    }

    /// Evaluate the four per-container crons, in precedence order, and
    /// return the first that fired this cycle (§3: Update > Recreate >
    /// Restart > HealthRestart).
    fn resolve_kind(
        &self,
        container: &MonitoredContainer,
        now: DateTime<Utc>,
        prev_tick: DateTime<Utc>,
        record: Option<&BackoffRecord>,
    ) -> Option<ActionKind> {
        let fires = |expr: &Option<String>| -> bool {
            expr.as_deref().is_some_and(|e| {
                self.evaluator
                    .fires_between(e, prev_tick, now, self.config.tz)
                    .unwrap_or_else(|err| {
                        tracing::warn!(container = %container.name, error = %err, "invalid cron expression, skipping");
                        false
                    })
            })
        };

        if fires(&container.crons.update) {
            return Some(ActionKind::Update);
        }
        if fires(&container.crons.recreate) {
            return Some(ActionKind::Recreate);
        }
        if fires(&container.crons.restart) {
            return Some(ActionKind::Restart);
        }
        if fires(&container.crons.health_check) && self.health_restart_eligible(container, now, record) {
            return Some(ActionKind::HealthRestart);
        }
        None
    }

    /// HealthRestart additionally requires a declared healthcheck, a
    /// container that has been up for at least the health-check grace
    /// period, and that it isn't already healthy (§4.7).
    fn health_restart_eligible(
        &self,
        container: &MonitoredContainer,
        now: DateTime<Utc>,
        record: Option<&BackoffRecord>,
    ) -> bool {
        if !container.has_healthcheck {
            return false;
        }
        if container.is_healthy() {
            return false;
        }
        let grace_elapsed = container
            .running_since(now)
            .is_some_and(|since| since >= chrono::Duration::from_std(self.config.health_check_backoff).unwrap_or_default());
        if !grace_elapsed {
            return false;
        }
        let rate_limited = record.and_then(|r| r.last_health_restart_ts).is_some_and(|last| {
            now < last + chrono::Duration::from_std(self.config.health_check_backoff).unwrap_or_default()
        });
        !rate_limited
    }

    /// Project-scoped cap: at most one Update/Recreate candidate fires per
    /// project per cycle when rolling-restart is on. Picks the
    /// lexicographically-first eligible name that was not picked last
    /// cycle; falls back to the first eligible name if all were picked
    /// last cycle (see resolved Open Question on rolling-restart fairness).
    /// Restart and HealthRestart candidates are never capped.
    fn apply_rolling_cap(
        &self,
        candidates: Vec<PlannedAction>,
        rolling: &mut RollingState,
    ) -> Vec<PlannedAction> {
        let mut by_project: BTreeMap<Option<String>, Vec<PlannedAction>> = BTreeMap::new();
        let mut uncapped = Vec::new();

        for action in candidates {
            if matches!(action.kind, ActionKind::Update | ActionKind::Recreate) {
                by_project.entry(action.project.clone()).or_default().push(action);
            } else {
                uncapped.push(action);
            }
        }

        let mut result = uncapped;
        for (project, mut group) in by_project {
            if group.len() <= 1 {
                if let Some(action) = group.pop() {
                    rolling.last_pick.insert(project, action.name.clone());
                    result.push(action);
                }
                continue;
            }

            group.sort_by(|a, b| a.name.cmp(&b.name));
            let last = rolling.last_pick.get(&project);
            let pick_idx = group
                .iter()
                .position(|a| Some(&a.name) != last)
                .unwrap_or(0);
            let picked = group.remove(pick_idx);

            tracing::debug!(
                project = ?project,
                picked = %picked.name,
                deferred = ?group.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
                "rolling-restart cap deferred other candidates this cycle"
            );

            rolling.last_pick.insert(project, picked.name.clone());
            result.push(picked);
        }

        result
    }
}

/// Shared helper so the Action Engine's pull-skip logic and the
/// HealthRestart grace window use the same duration conversion.
pub fn std_to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ContainerInfo, HealthStatus};
    use bollard::models::ContainerInspectResponse;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn fixture(name: &str, project: Option<&str>, update_cron: Option<&str>) -> MonitoredContainer {
        let info = ContainerInfo {
            id: name.to_string(),
            name: name.to_string(),
            image: "nginx:1.25".to_string(),
            image_id: "sha256:aaa".to_string(),
            state: "running".to_string(),
            labels: Default::default(),
            created_at: 0,
            started_at: Some(t(-10_000)),
            has_healthcheck: false,
            health: None,
            links: vec![],
            mounts: vec![],
            networks: vec![],
            raw: ContainerInspectResponse::default(),
        };
        let keys = crate::config::LabelKeys::default();
        let mut monitored = MonitoredContainer::from((info, &keys));
        monitored.project = project.map(String::from);
        monitored.crons.update = update_cron.map(String::from);
        monitored
    }

    #[test]
    fn fires_update_when_cron_crosses_boundary() {
        let config = Config::default_for_test();
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let containers = vec![fixture("web", None, Some("* * * * *"))];
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(
            &containers,
            t(65),
            t(0),
            &BTreeMap::new(),
            &mut rolling,
        );

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].kind, ActionKind::Update);
    }

    #[test]
    fn update_takes_precedence_over_restart() {
        let config = Config::default_for_test();
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let mut container = fixture("web", None, Some("* * * * *"));
        container.crons.restart = Some("* * * * *".to_string());
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(&[container], t(65), t(0), &BTreeMap::new(), &mut rolling);

        assert_eq!(planned[0].kind, ActionKind::Update);
    }

    #[test]
    fn skips_container_in_backoff() {
        let config = Config::default_for_test();
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let containers = vec![fixture("web", None, Some("* * * * *"))];
        let mut state = BTreeMap::new();
        state.insert(
            "web".to_string(),
            BackoffRecord {
                backoff_until_ts: Some(t(1_000_000)),
                ..Default::default()
            },
        );
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(&containers, t(65), t(0), &state, &mut rolling);
        assert!(planned.is_empty());
    }

    #[test]
    fn monitor_only_modifier_is_carried_from_global_and_override() {
        let mut config = Config::default_for_test();
        config.monitor_only = true;
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let containers = vec![fixture("web", None, Some("* * * * *"))];
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(&containers, t(65), t(0), &BTreeMap::new(), &mut rolling);
        assert!(planned[0].modifiers.monitor_only);
    }

    #[test]
    fn health_restart_requires_healthcheck_and_grace_period() {
        let config = Config::default_for_test();
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let mut container = fixture("web", None, None);
        container.crons.health_check = Some("* * * * *".to_string());
        container.has_healthcheck = true;
        container.health = Some(HealthStatus::Unhealthy);
        container.started_at = Some(t(65) - chrono::Duration::seconds(10));
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(&[container], t(65), t(0), &BTreeMap::new(), &mut rolling);
        assert!(planned.is_empty(), "grace period not yet elapsed");
    }

    #[test]
    fn health_restart_fires_once_grace_elapsed() {
        let config = Config::default_for_test();
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let mut container = fixture("web", None, None);
        container.crons.health_check = Some("* * * * *".to_string());
        container.has_healthcheck = true;
        container.health = Some(HealthStatus::Unhealthy);
        container.started_at = Some(t(0) - chrono::Duration::hours(1));
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(&[container], t(65), t(0), &BTreeMap::new(), &mut rolling);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].kind, ActionKind::HealthRestart);
    }

    #[test]
    fn rolling_restart_caps_one_candidate_per_project_and_rotates() {
        let mut config = Config::default_for_test();
        config.rolling_restart = true;
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let containers = vec![
            fixture("alpha", Some("stack"), Some("* * * * *")),
            fixture("bravo", Some("stack"), Some("* * * * *")),
        ];
        let mut rolling = RollingState::default();

        let first = scheduler.plan(&containers, t(65), t(0), &BTreeMap::new(), &mut rolling);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "alpha");

        let second = scheduler.plan(&containers, t(125), t(65), &BTreeMap::new(), &mut rolling);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "bravo");
    }

    /// Scenario 4 (component spec §8): `health_check` cron fires but the
    /// container declares no healthcheck at all, so HealthRestart is never
    /// even a candidate — not gated, not skipped, just never proposed.
    #[test]
    fn health_check_cron_without_healthcheck_is_never_scheduled() {
        let config = Config::default_for_test();
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let mut container = fixture("cache", None, None);
        container.crons.health_check = Some("* * * * *".to_string());
        container.has_healthcheck = false;
        let mut rolling = RollingState::default();

        let planned = scheduler.plan(&[container], t(65), t(0), &BTreeMap::new(), &mut rolling);
        assert!(
            planned.is_empty(),
            "no healthcheck means HealthRestart is never eligible, regardless of the cron firing"
        );
    }

    /// Scenario 5 (component spec §8): three containers in one project all
    /// fire Update under rolling-restart; exactly one swaps per cycle and a
    /// different one is picked each subsequent cycle.
    #[test]
    fn rolling_restart_rotates_across_three_containers() {
        let mut config = Config::default_for_test();
        config.rolling_restart = true;
        let evaluator = CronEvaluator::new();
        let scheduler = Scheduler::new(&evaluator, &config);
        let containers = vec![
            fixture("alpha", Some("stack"), Some("* * * * *")),
            fixture("bravo", Some("stack"), Some("* * * * *")),
            fixture("charlie", Some("stack"), Some("* * * * *")),
        ];
        let mut rolling = RollingState::default();

        let cycle1 = scheduler.plan(&containers, t(65), t(0), &BTreeMap::new(), &mut rolling);
        assert_eq!(cycle1.len(), 1);
        assert_eq!(cycle1[0].name, "alpha");

        let cycle2 = scheduler.plan(&containers, t(125), t(65), &BTreeMap::new(), &mut rolling);
        assert_eq!(cycle2.len(), 1);
        assert_ne!(cycle2[0].name, "alpha", "a different container must be picked the next cycle");

        let cycle3 = scheduler.plan(&containers, t(185), t(125), &BTreeMap::new(), &mut rolling);
        assert_eq!(cycle3.len(), 1);
        assert_ne!(cycle3[0].name, cycle2[0].name);
    }
}
