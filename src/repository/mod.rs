//! Storage seams used by the attendance core.
//!
//! The schedule catalog and student directory are read-only views of data
//! owned by other parts of the school system. The ledger owns the
//! `attendance` table and its (student, session, date) uniqueness key.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::model::attendance::{
    AttendanceChanges, AttendanceFilter, AttendanceRecord, AttendanceStatus, LatestAttendance,
    NewAttendance,
};
use crate::model::ids::{ClassId, SessionId, StudentId};
use crate::model::session::{ScheduleDay, Session};
use crate::model::student::Student;

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The (student, session, date) key is already taken.
    #[error("duplicate attendance key")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ScheduleCatalog: Send + Sync {
    async fn get_session(&self, id: SessionId) -> StoreResult<Option<Session>>;
    async fn list_sessions_by_day(&self, day: ScheduleDay) -> StoreResult<Vec<Session>>;
}

#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn find_by_scan_token(&self, token: &str) -> StoreResult<Option<Student>>;
    async fn list_ids_by_class(&self, class_id: ClassId) -> StoreResult<Vec<StudentId>>;
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    async fn get(&self, id: u64) -> StoreResult<Option<AttendanceRecord>>;

    /// Most recently created row for the key.
    async fn find_for_key(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Most recently created row for the student on `date`, any session.
    async fn latest_for_student_on(
        &self,
        student_id: StudentId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Fails with [`StoreError::Duplicate`] when the key is taken.
    async fn insert(&self, new: NewAttendance) -> StoreResult<AttendanceRecord>;

    async fn set_check_out(
        &self,
        id: u64,
        check_out: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Subset of `students` that already have a row for (session, date).
    async fn students_with_record(
        &self,
        session_id: SessionId,
        date: NaiveDate,
        students: &[StudentId],
    ) -> StoreResult<Vec<StudentId>>;

    /// Fails with [`StoreError::Duplicate`] when the change moves the row
    /// onto a key that is taken.
    async fn update(
        &self,
        id: u64,
        changes: AttendanceChanges,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Option<AttendanceRecord>>;

    async fn delete(&self, id: u64) -> StoreResult<bool>;

    /// Rows matching every set field of `filter`, newest date first, paged
    /// by `limit`/`offset` when a limit is set.
    async fn query(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>>;

    /// Row count per status over the whole ledger. Statuses without rows
    /// are omitted.
    async fn status_counts(&self) -> StoreResult<Vec<(AttendanceStatus, u64)>>;

    async fn latest(&self, limit: u32) -> StoreResult<Vec<LatestAttendance>>;
}
