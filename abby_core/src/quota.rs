//! Usage counting and plan-limit gating.
//!
//! Counters are keyed by `(projectId, periodKey)` and only ever incremented;
//! the billing rollover is an external trigger that either resets the counter
//! or simply moves traffic onto the next period's key. The limit check sits on
//! the config-read hot path, so it is a single counter read — it never
//! recomputes historical usage over the network.
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// Period key for a point in time, one per billing month.
pub fn period_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Result of a plan-limit check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaStatus {
    /// Events counted in the current period.
    pub current: u64,
    /// The plan's events-per-period allowance. `None` means unlimited.
    pub limit: Option<u64>,
    /// Current usage is at or past 100% of the limit. Config reads serve 429.
    pub over_limit: bool,
    /// Current usage is at or past 80% of the limit. Triggers a one-time
    /// notification; events are still counted.
    pub is_near_limit: bool,
}

/// Near-limit threshold as a fraction of the plan limit.
const NEAR_LIMIT_RATIO: f64 = 0.8;

/// Tracks per-project usage counters and gates against plan limits.
#[derive(Default)]
pub struct QuotaEnforcer {
    /// Events-per-period allowance per project. Projects without an entry are
    /// unlimited.
    limits: RwLock<HashMap<String, u64>>,
    counters: RwLock<HashMap<(String, String), u64>>,
    /// `(project, period)` pairs whose near-limit notification already fired.
    notified: RwLock<HashSet<(String, String)>>,
}

impl QuotaEnforcer {
    /// Create an enforcer with no limits configured.
    pub fn new() -> QuotaEnforcer {
        QuotaEnforcer::default()
    }

    /// Create an enforcer with per-project plan limits.
    pub fn with_limits(limits: HashMap<String, u64>) -> QuotaEnforcer {
        QuotaEnforcer {
            limits: RwLock::new(limits),
            ..QuotaEnforcer::default()
        }
    }

    /// Set (or replace) a project's plan limit.
    pub fn set_limit(&self, project_id: &str, events_per_period: u64) {
        let mut limits = self
            .limits
            .write()
            .expect("thread holding quota lock should not panic");
        limits.insert(project_id.to_owned(), events_per_period);
    }

    /// Atomically bump a project's counter for a period. Returns the new
    /// count. Increments carry no ordering guarantee across projects.
    pub fn increment(&self, project_id: &str, period: &str) -> u64 {
        let mut counters = self
            .counters
            .write()
            .expect("thread holding quota lock should not panic");
        let count = counters
            .entry((project_id.to_owned(), period.to_owned()))
            .or_insert(0);
        *count += 1;
        *count
    }

    /// Check a project's usage against its plan limit for the current period.
    ///
    /// Cheap by contract: one counter read, no I/O.
    pub fn check_limit(&self, project_id: &str) -> QuotaStatus {
        self.check_limit_at(project_id, &period_key(Utc::now()))
    }

    /// [`QuotaEnforcer::check_limit`] for an explicit period.
    pub fn check_limit_at(&self, project_id: &str, period: &str) -> QuotaStatus {
        let current = {
            let counters = self
                .counters
                .read()
                .expect("thread holding quota lock should not panic");
            counters
                .get(&(project_id.to_owned(), period.to_owned()))
                .copied()
                .unwrap_or(0)
        };
        let limit = {
            let limits = self
                .limits
                .read()
                .expect("thread holding quota lock should not panic");
            limits.get(project_id).copied()
        };

        match limit {
            Some(limit) => QuotaStatus {
                current,
                limit: Some(limit),
                over_limit: current >= limit,
                is_near_limit: (current as f64) >= (limit as f64) * NEAR_LIMIT_RATIO,
            },
            None => QuotaStatus {
                current,
                limit: None,
                over_limit: false,
                is_near_limit: false,
            },
        }
    }

    /// Record that the near-limit notification for `(project, period)` has
    /// been sent. Returns `true` the first time, `false` afterwards, so the
    /// notification fires exactly once per period.
    pub fn mark_near_limit_notified(&self, project_id: &str, period: &str) -> bool {
        let mut notified = self
            .notified
            .write()
            .expect("thread holding quota lock should not panic");
        notified.insert((project_id.to_owned(), period.to_owned()))
    }

    /// Reset a project's counter for a period (billing rollover trigger).
    pub fn reset(&self, project_id: &str, period: &str) {
        let mut counters = self
            .counters
            .write()
            .expect("thread holding quota lock should not panic");
        counters.remove(&(project_id.to_owned(), period.to_owned()));

        let mut notified = self
            .notified
            .write()
            .expect("thread holding quota lock should not panic");
        notified.remove(&(project_id.to_owned(), period.to_owned()));
    }
}
