//! Guerite binary entry point: two-phase tracing init, config load, engine
//! connect, and the outer tick loop wiring Inventory → Planner → Scheduler
//! → Action Engine → State Store + Notification Dispatcher together,
//! following the teacher's `main` shape (`cluster::main`) narrowed from a
//! GraphQL server boot to a periodic supervisor loop.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use guerite::action::{ActionEngine, ActionMutexMap};
use guerite::config::Config;
use guerite::control::{self, ControlState, Metrics};
use guerite::cron::CronEvaluator;
use guerite::engine::{EngineOps, LiveEngine};
use guerite::inventory::Inventory;
use guerite::notify::{Dispatcher, Event, Notifier, PushoverNotifier, WebhookNotifier};
use guerite::planner;
use guerite::scheduler::{RollingState, Scheduler};
use guerite::state::StateStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _basic_tracing = init_tracing_basic();

    info!("starting guerite v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("loading configuration")?;

    drop(_basic_tracing);
    init_tracing_from_config(&config);

    info!(docker_host = ?config.docker_host, tz = %config.tz, "configuration loaded");

    let engine: Arc<dyn EngineOps> = Arc::new(
        LiveEngine::connect(config.docker_host.as_deref()).context("connecting to container engine")?,
    );

    let notifier = build_notifier(&config);
    let dispatcher = Arc::new(Dispatcher::new(config.notifications.clone(), notifier));
    tokio::spawn(dispatcher.clone().run_detect_flusher());

    let metrics = Arc::new(Metrics::new());
    let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);

    if config.http_api {
        let control_state = ControlState {
            metrics: metrics.clone(),
            trigger: trigger_tx.clone(),
            metrics_enabled: config.http_api_metrics,
        };
        let router = control::build_router(control_state, config.http_api_token.clone());
        let addr = format!("{}:{}", config.http_api_host, config.http_api_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding control surface to {addr}"))?;
        info!(addr = %addr, "control surface listening");
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                warn!(error = %err, "control surface exited");
            }
        });
    }

    let inventory = Inventory::new();
    let evaluator = CronEvaluator::new();
    let state_store = StateStore::new(&config.state_file);
    let action_mutexes = ActionMutexMap::new();
    let action_engine = ActionEngine::new(engine.clone());

    let mut state = state_store.load().await;
    let mut rolling = RollingState::default();
    let mut prev_tick = Utc::now();
    let mut prune_prev_tick = prev_tick;

    let startup_cycle = inventory.collect(engine.as_ref(), &config).await;
    let monitored_at_startup = startup_cycle
        .as_ref()
        .map(|c| c.groups.values().map(Vec::len).sum())
        .unwrap_or(0);
    dispatcher
        .dispatch(Event::Startup {
            monitored: monitored_at_startup,
        })
        .await;

    let mut tick = tokio::time::interval(config.tick_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut pending_follow_up = false;

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            received = trigger_rx.recv() => {
                if received.is_none() {
                    warn!("trigger channel closed, continuing on tick alone");
                }
            }
        }

        let now = Utc::now();
        run_cycle(
            engine.as_ref(),
            &config,
            &inventory,
            &evaluator,
            &action_engine,
            &action_mutexes,
            &dispatcher,
            &metrics,
            &mut state,
            &mut rolling,
            prev_tick,
            now,
        )
        .await;
        prev_tick = now;

        if let Some(prune_cron) = &config.prune_cron {
            if evaluator
                .fires_between(prune_cron, prune_prev_tick, now, config.tz)
                .unwrap_or(false)
            {
                match guerite::prune::run(engine.as_ref(), &config, now).await {
                    Ok(event) => dispatcher.dispatch(event).await,
                    Err(err) => warn!(error = %err, "prune cycle failed"),
                }
            }
            prune_prev_tick = now;
        }

        if let Err(err) = state_store.commit(&state).await {
            warn!(error = %err, "failed to persist state");
        }

        if config.run_once {
            info!("GUERITE_RUN_ONCE set, exiting after one cycle");
            break;
        }

        // Drain any trigger that arrived mid-cycle into a single follow-up,
        // rather than letting select! pick it up immediately and skip the
        // tick interval's pacing entirely.
        while trigger_rx.try_recv().is_ok() {
            pending_follow_up = true;
        }
        if pending_follow_up {
            pending_follow_up = false;
            continue;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    engine: &dyn EngineOps,
    config: &Config,
    inventory: &Inventory,
    evaluator: &CronEvaluator,
    action_engine: &ActionEngine,
    action_mutexes: &ActionMutexMap,
    dispatcher: &Dispatcher,
    metrics: &Metrics,
    state: &mut std::collections::BTreeMap<String, guerite::state::BackoffRecord>,
    rolling: &mut RollingState,
    prev_tick: chrono::DateTime<Utc>,
    now: chrono::DateTime<Utc>,
) {
    let started = tokio::time::Instant::now();

    let cycle = match inventory.collect(engine, config).await {
        Ok(cycle) => cycle,
        Err(err) => {
            warn!(error = %err, "inventory collection failed, skipping cycle");
            return;
        }
    };

    if !cycle.newly_detected.is_empty() {
        dispatcher
            .dispatch(Event::Detect {
                names: cycle.newly_detected.clone(),
            })
            .await;
    }

    let mut known_names = HashSet::new();
    for containers in cycle.groups.values() {
        for c in containers {
            known_names.insert(c.base_name().to_string());
        }
    }
    action_mutexes.sweep(&known_names);

    let scheduler = Scheduler::new(evaluator, config);
    let monitored_total: usize = cycle.groups.values().map(Vec::len).sum();

    for (_project, containers) in &cycle.groups {
        let plan = planner::plan(containers);
        let planned = scheduler.plan(containers, now, prev_tick, state, rolling);

        let by_name: std::collections::HashMap<&str, &guerite::inventory::MonitoredContainer> =
            containers.iter().map(|c| (c.base_name(), c)).collect();
        let planned_by_name: std::collections::HashMap<&str, &guerite::scheduler::PlannedAction> =
            planned.iter().map(|a| (a.name.as_str(), a)).collect();

        // Tracks, for names acted on so far this cycle, whether that action
        // landed in a success-shaped outcome. `plan.gated` alone only
        // reflects last cycle's health snapshot; a dependency that rolls
        // back *this* cycle must also gate its dependents this cycle (§5,
        // §8 scenario 3).
        let mut cycle_ok: std::collections::HashMap<String, bool> = std::collections::HashMap::new();

        // Dependency-ordered, sequential within a project: each node's
        // mutex-guarded execution is awaited before the next, per §5's
        // "dependents wait until their dependencies reach Committed".
        for name in &plan.order {
            let Some(container) = by_name.get(name.as_str()) else {
                continue;
            };
            let Some(action) = planned_by_name.get(name.as_str()) else {
                continue;
            };

            let dependency_ready = !plan.gated.contains(name.as_str())
                && container
                    .depends_on
                    .iter()
                    .chain(container.links.iter())
                    .all(|dep| cycle_ok.get(dep).copied().unwrap_or(true));

            let mut record = state.entry(name.clone()).or_default().clone();

            let outcome = {
                let _guard = action_mutexes.acquire(name).await;
                action_engine
                    .execute(config, container, action, &mut record, dependency_ready, now)
                    .await
            };

            let ok = !matches!(
                outcome,
                guerite::action::Outcome::RolledBack { .. }
                    | guerite::action::Outcome::Failed { .. }
                    | guerite::action::Outcome::RestartFailed { .. }
            );
            cycle_ok.insert(name.clone(), ok);

            state.insert(name.clone(), record);
            metrics.record_outcome(&outcome);
            if let Some(event) = Event::from_outcome(&outcome) {
                dispatcher.dispatch(event).await;
            }
        }
    }

    metrics.record_cycle(started.elapsed(), monitored_total);
}

fn build_notifier(config: &Config) -> Option<Arc<dyn Notifier>> {
    if let (Some(token), Some(user_key)) = (
        config.notify_pushover_token.clone(),
        config.notify_pushover_user_key.clone(),
    ) {
        return Some(Arc::new(PushoverNotifier::new(token, user_key)));
    }
    if let Some(url) = config.notify_webhook_url.clone() {
        return Some(Arc::new(WebhookNotifier::new(url)));
    }
    None
}

fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,guerite=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

fn init_tracing_from_config(_config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let log_level = std::env::var("GUERITE_LOG").unwrap_or_else(|_| "info,guerite=debug".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
