//! Scan-driven attendance state machine.
//!
//! A scan resolves a student and a session, then either opens the day's row
//! for that pair (check-in, manual status) or closes the latest open row
//! (check-out). The "already recorded" lookup is only a fast path: two
//! scans racing past it are separated by the ledger's unique key, whose
//! violation is reported as the same `Conflict`.

use std::sync::Arc;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::clock::{Clock, LocalInstant};
use crate::error::{AttendanceError, AttendanceResult, DUPLICATE_ATTENDANCE};
use crate::model::attendance::{
    AttendanceChanges, AttendanceCorrection, AttendanceRecord, AttendanceStatus, NewAttendance,
};
use crate::model::ids::SessionId;
use crate::model::session::Session;
use crate::model::student::Student;
use crate::repository::{AttendanceLedger, ScheduleCatalog, StudentDirectory};
use crate::service::punctuality::{check_in_remark, classify};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    CheckIn,
    CheckOut,
}

pub struct AttendanceRecorder {
    catalog: Arc<dyn ScheduleCatalog>,
    students: Arc<dyn StudentDirectory>,
    ledger: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
}

impl AttendanceRecorder {
    pub fn new(
        catalog: Arc<dyn ScheduleCatalog>,
        students: Arc<dyn StudentDirectory>,
        ledger: Arc<dyn AttendanceLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            students,
            ledger,
            clock,
        }
    }

    pub async fn record_scan(
        &self,
        kind: ScanKind,
        scan_token: &str,
        session_id: SessionId,
    ) -> AttendanceResult<AttendanceRecord> {
        match kind {
            ScanKind::CheckIn => self.check_in(scan_token, session_id).await,
            ScanKind::CheckOut => self.check_out(scan_token, session_id).await,
        }
    }

    pub async fn check_in(
        &self,
        scan_token: &str,
        session_id: SessionId,
    ) -> AttendanceResult<AttendanceRecord> {
        let (student, session) = self.resolve(scan_token, session_id).await?;
        let now = LocalInstant::read(self.clock.as_ref());
        self.ensure_unrecorded(&student, &session, &now).await?;

        let punctuality = classify(session.start_time, now.time);
        let record = self
            .ledger
            .insert(NewAttendance {
                student_id: student.id,
                session_id: session.id,
                class_id: session.class_id,
                attendance_date: now.date,
                check_in: Some(now.time),
                // overwritten by the check-out scan
                check_out: Some(now.time),
                status: AttendanceStatus::Present,
                remark: Some(punctuality.to_string()),
                recorded_at: now.timestamp(),
            })
            .await?;

        tracing::info!(
            student_id = %student.id,
            session_id = %session.id,
            remark = punctuality.as_ref(),
            "Checked in"
        );
        Ok(record)
    }

    /// Falls back to the student's latest row of the day on any session
    /// when nothing was recorded for `session_id`, so a check-out scanned
    /// against the wrong session still closes the student's day.
    pub async fn check_out(
        &self,
        scan_token: &str,
        session_id: SessionId,
    ) -> AttendanceResult<AttendanceRecord> {
        let (student, session) = self.resolve(scan_token, session_id).await?;
        let now = LocalInstant::read(self.clock.as_ref());

        let target = match self
            .ledger
            .find_for_key(student.id, session.id, now.date)
            .await?
        {
            Some(record) => record,
            None => {
                let fallback = self
                    .ledger
                    .latest_for_student_on(student.id, now.date)
                    .await?
                    .ok_or_else(|| {
                        AttendanceError::NotFound("Attendance record for today".to_string())
                    })?;
                tracing::warn!(
                    student_id = %student.id,
                    scanned_session_id = %session.id,
                    used_session_id = %fallback.session_id,
                    "Check-out matched a different session"
                );
                fallback
            }
        };

        let record = self
            .ledger
            .set_check_out(target.id, now.time, now.timestamp())
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("Attendance record {}", target.id)))?;

        tracing::info!(
            student_id = %student.id,
            session_id = %record.session_id,
            "Checked out"
        );
        Ok(record)
    }

    /// Records Leave, Sick or Absent without check-in/out times.
    pub async fn mark_status(
        &self,
        scan_token: &str,
        session_id: SessionId,
        status: AttendanceStatus,
    ) -> AttendanceResult<AttendanceRecord> {
        if !status.is_manual() {
            return Err(AttendanceError::InvalidArgument(
                "Status must be one of Leave, Sick or Absent".to_string(),
            ));
        }

        let (student, session) = self.resolve(scan_token, session_id).await?;
        let now = LocalInstant::read(self.clock.as_ref());
        self.ensure_unrecorded(&student, &session, &now).await?;

        let record = self
            .ledger
            .insert(NewAttendance {
                student_id: student.id,
                session_id: session.id,
                class_id: session.class_id,
                attendance_date: now.date,
                check_in: None,
                check_out: None,
                status,
                remark: Some(status.to_string()),
                recorded_at: now.timestamp(),
            })
            .await?;

        tracing::info!(
            student_id = %student.id,
            session_id = %session.id,
            status = status.as_ref(),
            "Attendance marked"
        );
        Ok(record)
    }

    pub async fn get(&self, id: u64) -> AttendanceResult<AttendanceRecord> {
        self.ledger
            .get(id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("Attendance record {id}")))
    }

    /// Applies an authorized correction. A manual status rewrites the
    /// remark to the status name; otherwise a new check-in time re-runs the
    /// punctuality classification against the (possibly new) session.
    pub async fn correct(
        &self,
        id: u64,
        correction: AttendanceCorrection,
    ) -> AttendanceResult<AttendanceRecord> {
        if correction.is_empty() {
            return Err(AttendanceError::InvalidArgument(
                "No fields provided for update".to_string(),
            ));
        }

        let current = self.get(id).await?;
        let mut changes = AttendanceChanges {
            session_id: correction.session_id,
            class_id: None,
            attendance_date: correction.attendance_date,
            check_in: correction.check_in,
            check_out: correction.check_out,
            status: correction.status,
            remark: correction.remark,
        };

        let new_session = match correction.session_id {
            Some(session_id) if session_id != current.session_id => {
                let session = self.session(session_id).await?;
                changes.class_id = Some(session.class_id);
                Some(session)
            }
            _ => None,
        };

        if let Some(status) = correction.status.filter(AttendanceStatus::is_manual) {
            changes.remark = Some(status.to_string());
        } else if let Some(check_in) = correction.check_in {
            let start = match &new_session {
                Some(session) => Some(session.start_time),
                None => self
                    .catalog
                    .get_session(current.session_id)
                    .await?
                    .map(|s| s.start_time),
            };
            changes.remark = Some(check_in_remark(start, check_in));
        }

        let now = LocalInstant::read(self.clock.as_ref());
        let record = self
            .ledger
            .update(id, changes, now.timestamp())
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("Attendance record {id}")))?;

        tracing::info!(attendance_id = id, "Attendance corrected");
        Ok(record)
    }

    pub async fn delete(&self, id: u64) -> AttendanceResult<()> {
        if !self.ledger.delete(id).await? {
            return Err(AttendanceError::NotFound(format!("Attendance record {id}")));
        }
        tracing::info!(attendance_id = id, "Attendance deleted");
        Ok(())
    }

    async fn resolve(
        &self,
        scan_token: &str,
        session_id: SessionId,
    ) -> AttendanceResult<(Student, Session)> {
        let token = scan_token.trim();
        if token.is_empty() {
            return Err(AttendanceError::InvalidArgument(
                "Scan token is required".to_string(),
            ));
        }

        let student = self
            .students
            .find_by_scan_token(token)
            .await?
            .ok_or_else(|| AttendanceError::NotFound("Student".to_string()))?;
        let session = self.session(session_id).await?;

        if student.class_id != session.class_id {
            return Err(AttendanceError::PolicyViolation(
                "Students may only record attendance for sessions of their own class".to_string(),
            ));
        }

        Ok((student, session))
    }

    async fn session(&self, session_id: SessionId) -> AttendanceResult<Session> {
        self.catalog
            .get_session(session_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("Session {session_id}")))
    }

    async fn ensure_unrecorded(
        &self,
        student: &Student,
        session: &Session,
        now: &LocalInstant,
    ) -> AttendanceResult<()> {
        if self
            .ledger
            .find_for_key(student.id, session.id, now.date)
            .await?
            .is_some()
        {
            return Err(AttendanceError::Conflict(DUPLICATE_ATTENDANCE.to_string()));
        }
        Ok(())
    }
}
