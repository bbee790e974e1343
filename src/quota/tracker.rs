use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use super::store::{QuotaState, QuotaStore};
use super::QuotaError;

/// Utilization ratio above which a warning is logged for a window.
const WARNING_RATIO: f64 = 0.8;

/// Configured page budgets for the two windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub daily: u32,
    pub monthly: u32,
}

/// Snapshot of current usage, with windows already rolled over to today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub daily_used: u32,
    pub daily_limit: u32,
    pub monthly_used: u32,
    pub monthly_limit: u32,
}

impl QuotaUsage {
    pub fn is_exhausted(&self) -> bool {
        self.daily_used >= self.daily_limit || self.monthly_used >= self.monthly_limit
    }
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// Gates calls to the paid OCR engine against daily and monthly budgets.
///
/// The store is loaded on every check and persisted on every update.
/// `track_quota_usage` holds an internal lock across its read-modify-write, so
/// a single tracker shared by all requests of a process never loses an
/// increment. Several processes sharing one store still need external locking.
pub struct QuotaTracker {
    store: Box<dyn QuotaStore>,
    limits: QuotaLimits,
    clock: Clock,
    write_lock: Mutex<()>,
}

impl QuotaTracker {
    pub fn new(store: Box<dyn QuotaStore>, limits: QuotaLimits) -> Self {
        Self {
            store,
            limits,
            clock: Box::new(|| Local::now().date_naive()),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the wall clock (tests pin the current date).
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// True when both windows still have budget left.
    ///
    /// Read-only: a stale window is treated as zero without writing it back.
    /// An unreadable store closes the gate.
    pub fn check_quota_available(&self) -> bool {
        match self.usage() {
            Ok(usage) => {
                let available = !usage.is_exhausted();
                if !available {
                    tracing::info!(
                        daily_used = usage.daily_used,
                        daily_limit = usage.daily_limit,
                        monthly_used = usage.monthly_used,
                        monthly_limit = usage.monthly_limit,
                        "Cloud OCR quota exhausted"
                    );
                }
                available
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot read cloud OCR quota, treating as exhausted");
                false
            }
        }
    }

    /// Add `pages_processed` to both windows and persist the result.
    pub fn track_quota_usage(&self, pages_processed: u32) -> Result<QuotaUsage, QuotaError> {
        let _guard = self.write_lock.lock().map_err(|_| QuotaError::LockPoisoned)?;

        let today = (self.clock)();
        let mut state = roll_over(self.store.load()?, today);
        state.daily_count = state.daily_count.saturating_add(pages_processed);
        state.monthly_count = state.monthly_count.saturating_add(pages_processed);
        self.store.save(&state)?;

        let usage = self.usage_of(&state);
        tracing::debug!(
            pages = pages_processed,
            daily_used = usage.daily_used,
            monthly_used = usage.monthly_used,
            "Cloud OCR usage tracked"
        );
        warn_if_near_limit("daily", usage.daily_used, usage.daily_limit);
        warn_if_near_limit("monthly", usage.monthly_used, usage.monthly_limit);

        Ok(usage)
    }

    /// Current usage for both windows.
    pub fn usage(&self) -> Result<QuotaUsage, QuotaError> {
        let state = roll_over(self.store.load()?, (self.clock)());
        Ok(self.usage_of(&state))
    }

    fn usage_of(&self, state: &QuotaState) -> QuotaUsage {
        QuotaUsage {
            daily_used: state.daily_count,
            daily_limit: self.limits.daily,
            monthly_used: state.monthly_count,
            monthly_limit: self.limits.monthly,
        }
    }
}

/// Reset each window whose stored date/month differs from `today`.
fn roll_over(mut state: QuotaState, today: NaiveDate) -> QuotaState {
    let day = today.format("%Y-%m-%d").to_string();
    let month = today.format("%Y-%m").to_string();

    if state.daily_date != day {
        state.daily_count = 0;
        state.daily_date = day;
    }
    if state.monthly_month != month {
        state.monthly_count = 0;
        state.monthly_month = month;
    }
    state
}

fn warn_if_near_limit(window: &str, used: u32, limit: u32) {
    if limit == 0 {
        return;
    }
    let ratio = used as f64 / limit as f64;
    if ratio >= WARNING_RATIO {
        tracing::warn!(
            window,
            used,
            limit,
            percent = (ratio * 100.0).round() as u32,
            "Cloud OCR quota nearly exhausted"
        );
    }
}
