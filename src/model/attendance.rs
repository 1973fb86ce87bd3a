use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::{IntoParams, ToSchema};

use super::ids::{ClassId, SessionId, StudentId, SubjectId, TeacherId};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
    sqlx::Type,
)]
pub enum AttendanceStatus {
    Present,
    Leave,
    Sick,
    Absent,
}

impl AttendanceStatus {
    /// Statuses that can be set by hand instead of by a scan.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            AttendanceStatus::Leave | AttendanceStatus::Sick | AttendanceStatus::Absent
        )
    }
}

/// One row of the attendance ledger. At most one exists per
/// (student, session, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "student_id": 101,
    "session_id": 11,
    "class_id": 5,
    "attendance_date": "2025-03-03",
    "check_in": "07:58:12",
    "check_out": "09:02:40",
    "status": "Present",
    "remark": "On time",
    "created_at": "2025-03-03T07:58:12",
    "updated_at": "2025-03-03T09:02:40"
}))]
pub struct AttendanceRecord {
    pub id: u64,
    #[schema(value_type = u64)]
    pub student_id: StudentId,
    #[schema(value_type = u64)]
    pub session_id: SessionId,
    #[schema(value_type = u64)]
    pub class_id: ClassId,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "time", nullable = true)]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time", nullable = true)]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[schema(nullable = true)]
    pub remark: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

/// Insert payload for the ledger.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub class_id: ClassId,
    pub attendance_date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub remark: Option<String>,
    pub recorded_at: NaiveDateTime,
}

/// Partial update applied by an authorized correction.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AttendanceCorrection {
    #[schema(value_type = Option<u64>, example = 11)]
    pub session_id: Option<SessionId>,
    #[schema(value_type = Option<String>, format = "date", example = "2025-03-03")]
    pub attendance_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = "time", example = "08:05:00")]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time", example = "09:00:00")]
    pub check_out: Option<NaiveTime>,
    pub status: Option<AttendanceStatus>,
    #[schema(example = "Late")]
    pub remark: Option<String>,
}

impl AttendanceCorrection {
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none()
            && self.attendance_date.is_none()
            && self.check_in.is_none()
            && self.check_out.is_none()
            && self.status.is_none()
            && self.remark.is_none()
    }
}

/// Column values resolved from a correction, ready for the ledger.
/// `class_id` is set only when the session changed.
#[derive(Debug, Clone, Default)]
pub struct AttendanceChanges {
    pub session_id: Option<SessionId>,
    pub class_id: Option<ClassId>,
    pub attendance_date: Option<NaiveDate>,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: Option<AttendanceStatus>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    #[param(value_type = Option<u64>)]
    #[schema(value_type = Option<u64>, example = 101)]
    pub student_id: Option<StudentId>,
    #[param(value_type = Option<u64>)]
    #[schema(value_type = Option<u64>, example = 5)]
    pub class_id: Option<ClassId>,
    #[param(value_type = Option<u64>)]
    #[schema(value_type = Option<u64>, example = 11)]
    pub session_id: Option<SessionId>,
    /// Matches through the session's subject
    #[param(value_type = Option<u64>)]
    #[schema(value_type = Option<u64>, example = 3)]
    pub subject_id: Option<SubjectId>,
    /// Matches through the session's teacher
    #[param(value_type = Option<u64>)]
    #[schema(value_type = Option<u64>, example = 7)]
    pub teacher_id: Option<TeacherId>,
    #[param(value_type = Option<String>)]
    pub status: Option<AttendanceStatus>,
    /// Inclusive lower bound
    #[param(value_type = Option<String>, format = "date")]
    #[schema(value_type = Option<String>, format = "date", example = "2025-03-01")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound
    #[param(value_type = Option<String>, format = "date")]
    #[schema(value_type = Option<String>, format = "date", example = "2025-03-31")]
    pub date_to: Option<NaiveDate>,
    /// Page size. Listings default to 100 rows and are capped at 1000
    #[schema(example = 50)]
    pub limit: Option<u32>,
    /// Rows to skip before the page starts
    #[schema(example = 0)]
    pub offset: Option<u32>,
}

impl AttendanceFilter {
    pub fn for_student_between(student_id: StudentId, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            student_id: Some(student_id),
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        }
    }
}

/// Display row for the "latest attendance" feed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct LatestAttendance {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "time", nullable = true)]
    pub check_in: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[schema(example = "Budi Santoso")]
    pub student_name: String,
    #[schema(example = "X IPA 1")]
    pub class_name: String,
    #[schema(example = "Mathematics")]
    pub subject_name: String,
}
