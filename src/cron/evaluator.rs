//! Cron Evaluator (§4.1) — decides whether a cron expression fires inside
//! the half-open window `(t1, t2]`.
//!
//! Parsed schedules are cached by expression text so a label read on every
//! cycle doesn't reparse the same string, mirroring the general shape of
//! `docker-maid`'s housekeeping schedule (parse once, evaluate many times)
//! and the pack's `event_scheduler.rs` use of `cron::Schedule::from_str` +
//! `.after(...)`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use super::error::CronParseError;

/// `cron::Schedule` requires a leading seconds field (6-7 tokens); spec
/// labels are standard five-field cron. Prepend a `0` seconds field when
/// the expression has exactly five whitespace-separated tokens, leaving
/// 6/7-field expressions untouched.
fn normalize_five_field(expression: &str) -> String {
    if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    }
}

#[derive(Default)]
pub struct CronEvaluator {
    cache: Mutex<HashMap<String, Schedule>>,
}

impl CronEvaluator {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn parsed(&self, expression: &str) -> Result<Schedule, CronParseError> {
        if let Some(schedule) = self.cache.lock().unwrap().get(expression) {
            return Ok(schedule.clone());
        }
        let normalized = normalize_five_field(expression);
        let schedule =
            Schedule::from_str(&normalized).map_err(|source| CronParseError::InvalidExpression {
                expression: expression.to_string(),
                source,
            })?;
        self.cache
            .lock()
            .unwrap()
            .insert(expression.to_string(), schedule.clone());
        Ok(schedule)
    }

    /// True if `expression` has a firing instant in `(prev_tick, now]`, when
    /// evaluated in timezone `tz`.
    pub fn fires_between(
        &self,
        expression: &str,
        prev_tick: DateTime<Utc>,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<bool, CronParseError> {
        let schedule = self.parsed(expression)?;
        let prev_tz = prev_tick.with_timezone(&tz);
        let now_tz = now.with_timezone(&tz);

        Ok(schedule
            .after(&prev_tz)
            .next()
            .is_some_and(|next| next <= now_tz))
    }
}
