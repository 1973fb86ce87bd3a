//! Read-only attendance reports.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{Months, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AttendanceError, AttendanceResult};
use crate::model::attendance::{
    AttendanceFilter, AttendanceRecord, AttendanceStatus, LatestAttendance,
};
use crate::model::ids::{ClassId, SessionId, StudentId, TeacherId};
use crate::repository::{AttendanceLedger, ScheduleCatalog, StudentDirectory};
use crate::service::punctuality::Punctuality;

pub const DEFAULT_LATEST_LIMIT: u32 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusTally {
    pub present: u32,
    pub leave: u32,
    pub sick: u32,
    pub absent: u32,
}

impl StatusTally {
    fn add(&mut self, status: AttendanceStatus) {
        self.add_count(status, 1);
    }

    fn add_count(&mut self, status: AttendanceStatus, count: u32) {
        let slot = match status {
            AttendanceStatus::Present => &mut self.present,
            AttendanceStatus::Leave => &mut self.leave,
            AttendanceStatus::Sick => &mut self.sick,
            AttendanceStatus::Absent => &mut self.absent,
        };
        *slot = slot.saturating_add(count);
    }

    pub fn total(&self) -> u32 {
        self.present + self.leave + self.sick + self.absent
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MonthlyStudentReport {
    #[schema(value_type = u64)]
    pub student_id: StudentId,
    pub year: i32,
    pub month: u32,
    pub tally: StatusTally,
    pub on_time: u32,
    pub late: u32,
    /// Present rows over all rows, as a rounded percentage.
    pub attendance_rate: u32,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailyTally {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub tally: StatusTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StudentTally {
    #[schema(value_type = u64)]
    pub student_id: StudentId,
    #[serde(flatten)]
    pub tally: StatusTally,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    #[schema(value_type = u64)]
    pub session_id: SessionId,
    #[schema(value_type = u64)]
    pub class_id: ClassId,
    pub students: Vec<StudentTally>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerStats {
    pub total: u32,
    #[serde(flatten)]
    pub tally: StatusTally,
}

/// First and last day of a calendar month.
fn month_bounds(year: i32, month: u32) -> AttendanceResult<(NaiveDate, NaiveDate)> {
    let invalid = || AttendanceError::InvalidArgument(format!("invalid month {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((first, last))
}

fn tally(records: &[AttendanceRecord]) -> StatusTally {
    let mut tally = StatusTally::default();
    for record in records {
        tally.add(record.status);
    }
    tally
}

pub struct ReportAggregator {
    catalog: Arc<dyn ScheduleCatalog>,
    students: Arc<dyn StudentDirectory>,
    ledger: Arc<dyn AttendanceLedger>,
}

impl ReportAggregator {
    pub fn new(
        catalog: Arc<dyn ScheduleCatalog>,
        students: Arc<dyn StudentDirectory>,
        ledger: Arc<dyn AttendanceLedger>,
    ) -> Self {
        Self {
            catalog,
            students,
            ledger,
        }
    }

    pub async fn monthly_student_report(
        &self,
        student_id: StudentId,
        year: i32,
        month: u32,
    ) -> AttendanceResult<MonthlyStudentReport> {
        let (from, to) = month_bounds(year, month)?;
        let records = self
            .ledger
            .query(&AttendanceFilter::for_student_between(student_id, from, to))
            .await?;

        let tally = tally(&records);
        let present = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present);
        let on_time = present
            .clone()
            .filter(|r| r.remark.as_deref() == Some(Punctuality::OnTime.as_ref()))
            .count() as u32;
        let late = present
            .filter(|r| r.remark.as_deref() == Some(Punctuality::Late.as_ref()))
            .count() as u32;
        let attendance_rate = match tally.total() {
            0 => 0,
            total => (f64::from(tally.present) * 100.0 / f64::from(total)).round() as u32,
        };

        Ok(MonthlyStudentReport {
            student_id,
            year,
            month,
            tally,
            on_time,
            late,
            attendance_rate,
            records,
        })
    }

    /// Days without any row are omitted.
    pub async fn daily_breakdown(
        &self,
        year: i32,
        month: u32,
        class_id: Option<ClassId>,
        teacher_id: Option<TeacherId>,
    ) -> AttendanceResult<Vec<DailyTally>> {
        let (from, to) = month_bounds(year, month)?;
        let filter = AttendanceFilter {
            class_id,
            teacher_id,
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        };

        let mut days: BTreeMap<NaiveDate, StatusTally> = BTreeMap::new();
        for record in self.ledger.query(&filter).await? {
            days.entry(record.attendance_date)
                .or_default()
                .add(record.status);
        }

        Ok(days
            .into_iter()
            .map(|(date, tally)| DailyTally { date, tally })
            .collect())
    }

    pub async fn session_summary(&self, session_id: SessionId) -> AttendanceResult<SessionSummary> {
        let session = self
            .catalog
            .get_session(session_id)
            .await?
            .ok_or_else(|| AttendanceError::NotFound(format!("session {session_id}")))?;

        let roster = self.students.list_ids_by_class(session.class_id).await?;
        let filter = AttendanceFilter {
            session_id: Some(session.id),
            ..Default::default()
        };

        let mut per_student: HashMap<StudentId, StatusTally> = HashMap::new();
        for record in self.ledger.query(&filter).await? {
            per_student
                .entry(record.student_id)
                .or_default()
                .add(record.status);
        }

        let students = roster
            .into_iter()
            .map(|student_id| StudentTally {
                student_id,
                tally: per_student.get(&student_id).copied().unwrap_or_default(),
            })
            .collect();

        Ok(SessionSummary {
            session_id: session.id,
            class_id: session.class_id,
            students,
        })
    }

    /// One page of matching rows. Without a `limit` the first
    /// [`DEFAULT_PAGE_SIZE`] rows are returned; larger pages are capped at
    /// [`MAX_PAGE_SIZE`].
    pub async fn records(
        &self,
        filter: &AttendanceFilter,
    ) -> AttendanceResult<Vec<AttendanceRecord>> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(AttendanceError::InvalidArgument("date_from is after date_to".into()));
            }
        }
        if filter.limit == Some(0) {
            return Err(AttendanceError::InvalidArgument("limit must be positive".into()));
        }

        let page = AttendanceFilter {
            limit: Some(filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)),
            ..filter.clone()
        };
        Ok(self.ledger.query(&page).await?)
    }

    pub async fn latest(&self, limit: Option<u32>) -> AttendanceResult<Vec<LatestAttendance>> {
        let limit = limit.unwrap_or(DEFAULT_LATEST_LIMIT);
        if limit == 0 {
            return Err(AttendanceError::InvalidArgument("limit must be positive".into()));
        }
        Ok(self.ledger.latest(limit).await?)
    }

    /// Counted by the ledger, so the cost does not grow with its size.
    pub async fn stats(&self) -> AttendanceResult<LedgerStats> {
        let mut tally = StatusTally::default();
        for (status, count) in self.ledger.status_counts().await? {
            tally.add_count(status, u32::try_from(count).unwrap_or(u32::MAX));
        }
        Ok(LedgerStats {
            total: tally.total(),
            tally,
        })
    }
}
