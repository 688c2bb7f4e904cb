//! Scheduler Engine: fires the daily report jobs.
//!
//! Each job gets its own tokio task that sleeps until the next wall-clock
//! fire time, runs the job to completion, then computes the next fire time
//! from the current instant. A fire time that passes while the process is
//! down or suspended is skipped; there is no catch-up.
//!
//! Sleeps are capped at [`MAX_SLEEP`] and the wall clock is re-read after
//! each one, so clock steps and suspends are noticed within a minute.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use skycast_core::error::Result;
use skycast_core::types::DayOffset;
use skycast_weather::ForecastAssembler;
use tokio::task::JoinHandle;

use crate::broadcast::{BroadcastSummary, Broadcaster};
use crate::daily;

/// Longest single sleep before the wall clock is read again.
pub const MAX_SLEEP: Duration = Duration::from_secs(60);

/// A run that starts more than this many seconds past its fire instant is skipped.
pub const LATE_TOLERANCE_SECS: i64 = 300;

/// Source of wall-clock time for the timer loops.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A report broadcast that fires once a day at a fixed local time.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportJob {
    pub name: String,
    pub at: NaiveTime,
    pub day: DayOffset,
}

impl ReportJob {
    pub fn new(name: &str, at: NaiveTime, day: DayOffset) -> Self {
        Self {
            name: name.to_string(),
            at,
            day,
        }
    }

    /// Morning job: today's forecast.
    pub fn today(at: NaiveTime) -> Self {
        Self::new("today", at, DayOffset::Today)
    }

    /// Evening job: tomorrow's forecast.
    pub fn tomorrow(at: NaiveTime) -> Self {
        Self::new("tomorrow", at, DayOffset::Tomorrow)
    }
}

/// Result of one job run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Nobody registered; no report was built.
    Skipped,
    Broadcast(BroadcastSummary),
}

/// The scheduler engine: owns the jobs and what they need to run.
pub struct SchedulerEngine {
    jobs: Vec<ReportJob>,
    tz: Tz,
    assembler: Arc<ForecastAssembler>,
    broadcaster: Arc<Broadcaster>,
    clock: Arc<dyn Clock>,
}

impl SchedulerEngine {
    pub fn new(
        jobs: Vec<ReportJob>,
        tz: Tz,
        assembler: Arc<ForecastAssembler>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            jobs,
            tz,
            assembler,
            broadcaster,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock the timer loops read.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn jobs(&self) -> &[ReportJob] {
        &self.jobs
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Next fire instant of every job, as seen from `now`.
    pub fn next_runs(&self, now: DateTime<Utc>) -> Vec<(&ReportJob, DateTime<Utc>)> {
        self.jobs
            .iter()
            .map(|job| (job, daily::next_fire_after(job.at, self.tz, now)))
            .collect()
    }

    /// Build the job's report and broadcast it.
    /// Skips the build entirely when there is nobody to send to.
    pub async fn run_job(&self, job: &ReportJob) -> Result<JobOutcome> {
        if self.broadcaster.store().is_empty().await {
            tracing::info!("📭 Job '{}' skipped: no recipients", job.name);
            return Ok(JobOutcome::Skipped);
        }

        let text = self.assembler.build_report(job.day).await?;
        let summary = self.broadcaster.broadcast(&text).await?;
        Ok(JobOutcome::Broadcast(summary))
    }
}

/// Spawn one timer task per job. Tasks run until the runtime shuts down.
pub fn spawn_scheduler(engine: Arc<SchedulerEngine>) -> Vec<JoinHandle<()>> {
    tracing::info!(
        "⏰ Scheduler started: {} job(s) in {}",
        engine.jobs.len(),
        engine.tz.name()
    );

    engine
        .jobs
        .iter()
        .cloned()
        .map(|job| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { job_loop(engine, job).await })
        })
        .collect()
}

async fn job_loop(engine: Arc<SchedulerEngine>, job: ReportJob) {
    let mut last_fired: Option<DateTime<Utc>> = None;
    loop {
        // A backward clock step must not bring back an instant already fired.
        let now = engine.clock.now();
        let from = last_fired.map_or(now, |fired| now.max(fired));
        let next = daily::next_fire_after(job.at, engine.tz, from);
        tracing::info!(
            "📅 Job '{}' next fires at {} ({})",
            job.name,
            next.with_timezone(&engine.tz).format("%Y-%m-%d %H:%M %Z"),
            next
        );

        let woke = wait_until(engine.clock.as_ref(), next).await;
        last_fired = Some(next);

        let late = woke - next;
        if late > chrono::Duration::seconds(LATE_TOLERANCE_SECS) {
            tracing::warn!(
                "⏭ Job '{}' skipped: woke {} min after its fire time",
                job.name,
                late.num_minutes()
            );
            continue;
        }

        tracing::info!("🔔 Job '{}' triggered", job.name);
        match engine.run_job(&job).await {
            Ok(JobOutcome::Skipped) => {}
            Ok(JobOutcome::Broadcast(summary)) => {
                tracing::info!(
                    "✅ Job '{}' sent to {} recipient(s), pruned {}",
                    job.name,
                    summary.delivered.len(),
                    summary.pruned.len()
                );
            }
            Err(e) => {
                tracing::warn!("⚠️ Job '{}' failed this cycle: {e}", job.name);
            }
        }
    }
}

/// Sleep until `clock` reads at least `deadline`. Returns the time on waking.
async fn wait_until(clock: &dyn Clock, deadline: DateTime<Utc>) -> DateTime<Utc> {
    loop {
        let now = clock.now();
        let remaining = match (deadline - now).to_std() {
            Ok(remaining) if !remaining.is_zero() => remaining,
            _ => return now,
        };
        tokio::time::sleep(remaining.min(MAX_SLEEP)).await;
    }
}
