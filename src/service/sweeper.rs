//! Automatic absence sweep.
//!
//! Once a session has been over for the grace period, every student of its
//! class without a row for (session, today) gets an Absent row. The sweeper
//! only ever inserts; rows written by scans are never touched.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::clock::{Clock, LocalInstant, minutes_since_midnight};
use crate::error::AttendanceResult;
use crate::model::attendance::{AttendanceStatus, NewAttendance};
use crate::model::session::Session;
use crate::repository::{AttendanceLedger, ScheduleCatalog, StoreError, StudentDirectory};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    Running,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Sessions past their end plus grace.
    pub sessions_eligible: usize,
    pub absences_recorded: usize,
    /// Inserts that lost to a concurrent scan.
    pub races_skipped: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running.
    Skipped,
    Completed(SweepReport),
}

pub struct AbsenceSweeper {
    catalog: Arc<dyn ScheduleCatalog>,
    students: Arc<dyn StudentDirectory>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
    grace_minutes: u32,
    running: AtomicBool,
}

/// Returns the sweeper to Idle however the tick ends, including when its
/// future is dropped mid-flight.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AbsenceSweeper {
    pub fn new(
        catalog: Arc<dyn ScheduleCatalog>,
        students: Arc<dyn StudentDirectory>,
        ledger: Arc<dyn AttendanceLedger>,
        clock: Arc<dyn Clock>,
        grace_minutes: u32,
    ) -> Self {
        Self {
            catalog,
            students,
            ledger,
            clock,
            grace_minutes,
            running: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SweepState {
        if self.running.load(Ordering::Acquire) {
            SweepState::Running
        } else {
            SweepState::Idle
        }
    }

    fn try_begin(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    /// Runs one sweep unless one is already in progress.
    pub async fn tick(&self) -> AttendanceResult<TickOutcome> {
        let Some(_guard) = self.try_begin() else {
            tracing::debug!("Absence sweep still running, skipping tick");
            return Ok(TickOutcome::Skipped);
        };

        let run_id = Uuid::new_v4();
        let report = self.sweep(run_id).await?;
        if report.absences_recorded > 0 || report.failures > 0 {
            tracing::info!(
                %run_id,
                sessions_eligible = report.sessions_eligible,
                absences_recorded = report.absences_recorded,
                races_skipped = report.races_skipped,
                failures = report.failures,
                "Absence sweep finished"
            );
        }
        Ok(TickOutcome::Completed(report))
    }

    async fn sweep(&self, run_id: Uuid) -> AttendanceResult<SweepReport> {
        let now = LocalInstant::read(self.clock.as_ref());
        let now_minutes = now.minutes_since_midnight();
        let sessions = self.catalog.list_sessions_by_day(now.day()).await?;

        let mut report = SweepReport::default();
        for session in sessions
            .iter()
            .filter(|s| minutes_since_midnight(s.end_time) + self.grace_minutes <= now_minutes)
        {
            report.sessions_eligible += 1;
            if let Err(e) = self.sweep_session(session, &now, &mut report).await {
                report.failures += 1;
                tracing::error!(
                    %run_id,
                    session_id = %session.id,
                    error = %e,
                    "Absence sweep failed for session"
                );
            }
        }

        Ok(report)
    }

    async fn sweep_session(
        &self,
        session: &Session,
        now: &LocalInstant,
        report: &mut SweepReport,
    ) -> Result<(), StoreError> {
        let roster = self.students.list_ids_by_class(session.class_id).await?;
        if roster.is_empty() {
            return Ok(());
        }

        let covered: HashSet<_> = self
            .ledger
            .students_with_record(session.id, now.date, &roster)
            .await?
            .into_iter()
            .collect();

        for student_id in roster.into_iter().filter(|id| !covered.contains(id)) {
            let absent = NewAttendance {
                student_id,
                session_id: session.id,
                class_id: session.class_id,
                attendance_date: now.date,
                check_in: None,
                check_out: None,
                status: AttendanceStatus::Absent,
                remark: Some(AttendanceStatus::Absent.to_string()),
                recorded_at: now.timestamp(),
            };

            match self.ledger.insert(absent).await {
                Ok(_) => report.absences_recorded += 1,
                Err(StoreError::Duplicate) => report.races_skipped += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::error!(
                        student_id = %student_id,
                        session_id = %session.id,
                        error = %e,
                        "Failed to record automatic absence"
                    );
                }
            }
        }

        Ok(())
    }

    /// Starts ticking every `every` until the returned handle is stopped.
    /// Ticks that fall behind are skipped, not queued.
    pub fn spawn(self: Arc<Self>, every: Duration) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        tracing::info!(interval_secs = every.as_secs(), "Starting absence sweeper");

        let join = actix_web::rt::spawn(async move {
            let mut timer = tokio::time::interval(every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if let Err(e) = self.tick().await {
                            tracing::error!(error = %e, "Absence sweep tick failed");
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }

            tracing::info!("Absence sweeper stopped");
        });

        SweeperHandle { stop_tx, join }
    }
}

pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    join: actix_web::rt::task::JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Absence sweeper task ended abnormally");
        }
    }
}
