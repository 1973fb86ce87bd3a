//! In-memory store for tests.
//!
//! Implements the catalog, directory and ledger over plain collections and
//! enforces the same (student, session, date) uniqueness key as the MySQL
//! schema. Inserts can be made to fail per student, and the session listing
//! can be paused on a [`Gate`] to hold a sweep mid-flight.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::Notify;

use super::{AttendanceLedger, ScheduleCatalog, StoreError, StoreResult, StudentDirectory};
use crate::model::attendance::{
    AttendanceChanges, AttendanceFilter, AttendanceRecord, AttendanceStatus, LatestAttendance,
    NewAttendance,
};
use crate::model::ids::{ClassId, SessionId, StudentId, SubjectId, TeacherId};
use crate::model::session::{ScheduleDay, Session};
use crate::model::student::Student;

#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct MemoryData {
    sessions: HashMap<SessionId, Session>,
    students: Vec<Student>,
    records: Vec<AttendanceRecord>,
    class_names: HashMap<ClassId, String>,
    subject_names: HashMap<SubjectId, String>,
    failing_inserts: HashSet<StudentId>,
    /// Rows written behind the ledger's back before the next insert,
    /// emulating a concurrent writer that wins the race.
    racing_rows: Vec<NewAttendance>,
    next_id: u64,
    gate: Option<Arc<Gate>>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&self, id: u64, name: &str) {
        self.lock().class_names.insert(ClassId(id), name.to_string());
    }

    pub fn add_subject(&self, id: u64, name: &str) {
        self.lock().subject_names.insert(SubjectId(id), name.to_string());
    }

    pub fn add_session(
        &self,
        id: u64,
        class_id: u64,
        day: ScheduleDay,
        start: (u32, u32),
        end: (u32, u32),
    ) -> Session {
        let session = Session {
            id: SessionId(id),
            class_id: ClassId(class_id),
            subject_id: SubjectId(1),
            teacher_id: TeacherId(1),
            day,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        };
        self.put_session(session.clone());
        session
    }

    pub fn put_session(&self, session: Session) {
        self.lock().sessions.insert(session.id, session);
    }

    pub fn remove_session(&self, id: u64) {
        self.lock().sessions.remove(&SessionId(id));
    }

    pub fn add_student(&self, id: u64, class_id: u64, scan_token: &str) -> Student {
        let student = Student {
            id: StudentId(id),
            name: format!("Student {id}"),
            class_id: ClassId(class_id),
            scan_token: scan_token.to_string(),
        };
        self.lock().students.push(student.clone());
        student
    }

    pub fn fail_inserts_for(&self, student_id: u64) {
        self.lock().failing_inserts.insert(StudentId(student_id));
    }

    pub fn race_next_insert_with(&self, row: NewAttendance) {
        self.lock().racing_rows.push(row);
    }

    pub fn gate_session_listing(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.lock().gate = Some(gate.clone());
        gate
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.lock().records.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryData> {
        self.data.lock().expect("memory store poisoned")
    }
}

impl MemoryData {
    fn key_taken(
        &self,
        student: StudentId,
        session: SessionId,
        date: NaiveDate,
        except: u64,
    ) -> bool {
        self.records.iter().any(|r| {
            r.id != except
                && r.student_id == student
                && r.session_id == session
                && r.attendance_date == date
        })
    }

    fn push(&mut self, new: NewAttendance) -> StoreResult<AttendanceRecord> {
        if self.key_taken(new.student_id, new.session_id, new.attendance_date, 0) {
            return Err(StoreError::Duplicate);
        }
        self.next_id += 1;
        let record = AttendanceRecord {
            id: self.next_id,
            student_id: new.student_id,
            session_id: new.session_id,
            class_id: new.class_id,
            attendance_date: new.attendance_date,
            check_in: new.check_in,
            check_out: new.check_out,
            status: new.status,
            remark: new.remark,
            created_at: new.recorded_at,
            updated_at: new.recorded_at,
        };
        self.records.push(record.clone());
        Ok(record)
    }

    fn matches(&self, record: &AttendanceRecord, filter: &AttendanceFilter) -> bool {
        let session = self.sessions.get(&record.session_id);
        filter.student_id.is_none_or(|v| record.student_id == v)
            && filter.class_id.is_none_or(|v| record.class_id == v)
            && filter.session_id.is_none_or(|v| record.session_id == v)
            && filter
                .subject_id
                .is_none_or(|v| session.is_some_and(|s| s.subject_id == v))
            && filter
                .teacher_id
                .is_none_or(|v| session.is_some_and(|s| s.teacher_id == v))
            && filter.status.is_none_or(|v| record.status == v)
            && filter.date_from.is_none_or(|v| record.attendance_date >= v)
            && filter.date_to.is_none_or(|v| record.attendance_date <= v)
    }
}

fn newest(records: impl Iterator<Item = AttendanceRecord>) -> Option<AttendanceRecord> {
    records.max_by_key(|r| (r.created_at, r.id))
}

#[async_trait]
impl ScheduleCatalog for MemoryStore {
    async fn get_session(&self, id: SessionId) -> StoreResult<Option<Session>> {
        Ok(self.lock().sessions.get(&id).cloned())
    }

    async fn list_sessions_by_day(&self, day: ScheduleDay) -> StoreResult<Vec<Session>> {
        let gate = self.lock().gate.take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut sessions: Vec<Session> = self
            .lock()
            .sessions
            .values()
            .filter(|s| s.day == day)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.end_time, s.id));
        Ok(sessions)
    }
}

#[async_trait]
impl StudentDirectory for MemoryStore {
    async fn find_by_scan_token(&self, token: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .lock()
            .students
            .iter()
            .find(|s| s.scan_token == token)
            .cloned())
    }

    async fn list_ids_by_class(&self, class_id: ClassId) -> StoreResult<Vec<StudentId>> {
        Ok(self
            .lock()
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.id)
            .collect())
    }
}

#[async_trait]
impl AttendanceLedger for MemoryStore {
    async fn get(&self, id: u64) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.lock().records.iter().find(|r| r.id == id).cloned())
    }

    async fn find_for_key(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let data = self.lock();
        Ok(newest(data.records.iter().cloned().filter(|r| {
            r.student_id == student_id && r.session_id == session_id && r.attendance_date == date
        })))
    }

    async fn latest_for_student_on(
        &self,
        student_id: StudentId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let data = self.lock();
        Ok(newest(
            data.records
                .iter()
                .cloned()
                .filter(|r| r.student_id == student_id && r.attendance_date == date),
        ))
    }

    async fn insert(&self, new: NewAttendance) -> StoreResult<AttendanceRecord> {
        let mut data = self.lock();
        for row in std::mem::take(&mut data.racing_rows) {
            data.push(row)?;
        }
        if data.failing_inserts.contains(&new.student_id) {
            return Err(StoreError::Unavailable(format!(
                "insert rejected for student {}",
                new.student_id
            )));
        }
        data.push(new)
    }

    async fn set_check_out(
        &self,
        id: u64,
        check_out: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut data = self.lock();
        Ok(data.records.iter_mut().find(|r| r.id == id).map(|r| {
            r.check_out = Some(check_out);
            r.updated_at = updated_at;
            r.clone()
        }))
    }

    async fn students_with_record(
        &self,
        session_id: SessionId,
        date: NaiveDate,
        students: &[StudentId],
    ) -> StoreResult<Vec<StudentId>> {
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|r| {
                r.session_id == session_id
                    && r.attendance_date == date
                    && students.contains(&r.student_id)
            })
            .map(|r| r.student_id)
            .collect())
    }

    async fn update(
        &self,
        id: u64,
        changes: AttendanceChanges,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut data = self.lock();
        let Some(current) = data.records.iter().find(|r| r.id == id).cloned() else {
            return Ok(None);
        };

        let session_id = changes.session_id.unwrap_or(current.session_id);
        let date = changes.attendance_date.unwrap_or(current.attendance_date);
        if data.key_taken(current.student_id, session_id, date, id) {
            return Err(StoreError::Duplicate);
        }

        let record = data
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .expect("row checked above");
        record.session_id = session_id;
        record.attendance_date = date;
        if let Some(class_id) = changes.class_id {
            record.class_id = class_id;
        }
        if let Some(check_in) = changes.check_in {
            record.check_in = Some(check_in);
        }
        if let Some(check_out) = changes.check_out {
            record.check_out = Some(check_out);
        }
        if let Some(status) = changes.status {
            record.status = status;
        }
        if let Some(remark) = changes.remark {
            record.remark = Some(remark);
        }
        record.updated_at = updated_at;
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let mut data = self.lock();
        let before = data.records.len();
        data.records.retain(|r| r.id != id);
        Ok(data.records.len() < before)
    }

    async fn query(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let data = self.lock();
        let mut rows: Vec<AttendanceRecord> = data
            .records
            .iter()
            .filter(|r| data.matches(r, filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.attendance_date
                .cmp(&a.attendance_date)
                .then(b.id.cmp(&a.id))
        });
        if let Some(limit) = filter.limit {
            let offset = filter.offset.unwrap_or(0) as usize;
            rows = rows.into_iter().skip(offset).take(limit as usize).collect();
        }
        Ok(rows)
    }

    async fn status_counts(&self) -> StoreResult<Vec<(AttendanceStatus, u64)>> {
        let mut counts: HashMap<AttendanceStatus, u64> = HashMap::new();
        for record in &self.lock().records {
            *counts.entry(record.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn latest(&self, limit: u32) -> StoreResult<Vec<LatestAttendance>> {
        let data = self.lock();
        let mut rows: Vec<&AttendanceRecord> = data.records.iter().collect();
        rows.sort_by(|a, b| {
            b.attendance_date
                .cmp(&a.attendance_date)
                .then(b.created_at.cmp(&a.created_at))
        });

        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|r| {
                let student_name = data
                    .students
                    .iter()
                    .find(|s| s.id == r.student_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                let subject_name = data
                    .sessions
                    .get(&r.session_id)
                    .and_then(|s| data.subject_names.get(&s.subject_id))
                    .cloned()
                    .unwrap_or_default();
                LatestAttendance {
                    id: r.id,
                    attendance_date: r.attendance_date,
                    check_in: r.check_in,
                    status: r.status,
                    student_name,
                    class_name: data.class_names.get(&r.class_id).cloned().unwrap_or_default(),
                    subject_name,
                }
            })
            .collect())
    }
}
