//! Scheduled trigger for the daily reconciliation sweep.
//!
//! The schedule is a thin invoker: it owns a cron expression, sleeps to
//! the next fire time, and calls the reconciler with the previous day's
//! window. All sweep logic lives in [`crate::reconcile`], so the algorithm
//! is unit-testable without a scheduler and the scheduler is trivially
//! replaceable by an external job runner hitting the on-demand trigger.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use cron::Schedule;

use surge_core::Error as CoreError;

use crate::error::Result;
use crate::reconcile::Reconciler;

/// Default sweep schedule: daily at 03:00 UTC, after the claim peak.
pub const DAILY_SWEEP_CRON: &str = "0 0 3 * * *";

/// Returns the UTC day preceding `now`, the window a scheduled run sweeps.
#[must_use]
pub fn previous_day(now: DateTime<Utc>) -> NaiveDate {
    (now - chrono::Duration::days(1)).date_naive()
}

/// Cron-driven invoker for the daily sweep.
pub struct SweepSchedule {
    schedule: Schedule,
}

impl SweepSchedule {
    /// Creates a schedule from a cron expression (six-field, with seconds).
    ///
    /// # Errors
    ///
    /// Returns an error when the expression does not parse.
    pub fn new(expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            CoreError::InvalidInput(format!("invalid cron expression '{expression}': {e}"))
        })?;
        Ok(Self { schedule })
    }

    /// Creates the default daily 03:00 UTC schedule.
    ///
    /// # Errors
    ///
    /// Returns an error when the built-in expression fails to parse, which
    /// indicates a build misconfiguration.
    pub fn daily() -> Result<Self> {
        Self::new(DAILY_SWEEP_CRON)
    }

    /// Returns the next fire time strictly after `after`.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Runs the schedule loop forever.
    ///
    /// Each tick sweeps the previous UTC day. Sweep failures (including a
    /// contended run lock) are logged and never abort the loop; the next
    /// tick retries whatever the failed run left behind.
    pub async fn run(self, reconciler: Arc<Reconciler>) {
        loop {
            let now = Utc::now();
            let Some(next) = self.next_after(now) else {
                tracing::error!("sweep schedule yields no further fire times, stopping");
                return;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next = %next, "sleeping until next sweep");
            tokio::time::sleep(wait).await;

            let fired_at = Utc::now();
            let day = previous_day(fired_at);
            match reconciler.sweep_day(day, fired_at).await {
                Ok(summary) => {
                    tracing::info!(
                        day = %day,
                        persisted = summary.persisted,
                        failed = summary.failed,
                        "scheduled sweep finished"
                    );
                }
                Err(err) => {
                    tracing::error!(day = %day, error = %err, "scheduled sweep failed");
                }
            }
        }
    }
}
