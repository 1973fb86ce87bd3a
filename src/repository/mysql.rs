use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::MySqlPool;

use super::{AttendanceLedger, ScheduleCatalog, StoreError, StoreResult, StudentDirectory};
use crate::model::attendance::{
    AttendanceChanges, AttendanceFilter, AttendanceRecord, AttendanceStatus, LatestAttendance,
    NewAttendance,
};
use crate::model::ids::{ClassId, SessionId, StudentId};
use crate::model::session::{ScheduleDay, Session};
use crate::model::student::Student;
use crate::utils::db_utils::{
    bind_query, bind_query_as, build_attendance_update, build_attendance_where, build_page_clause,
    placeholders,
};

const RECORD_COLUMNS: &str = "a.id, a.student_id, a.session_id, a.class_id, a.attendance_date, \
     a.check_in, a.check_out, a.status, a.remark, a.created_at, a.updated_at";

/// MySQL-backed catalog, directory and ledger sharing one pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Unique-key violations (MySQL 1062) become [`StoreError::Duplicate`].
fn store_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl ScheduleCatalog for MySqlStore {
    async fn get_session(&self, id: SessionId) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, class_id, subject_id, teacher_id, day, start_time, end_time
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn list_sessions_by_day(&self, day: ScheduleDay) -> StoreResult<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, class_id, subject_id, teacher_id, day, start_time, end_time
            FROM sessions
            WHERE day = ?
            ORDER BY end_time
            "#,
        )
        .bind(day.as_ref())
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

#[async_trait]
impl StudentDirectory for MySqlStore {
    async fn find_by_scan_token(&self, token: &str) -> StoreResult<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            SELECT id, name, class_id, scan_token
            FROM students
            WHERE scan_token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(student)
    }

    async fn list_ids_by_class(&self, class_id: ClassId) -> StoreResult<Vec<StudentId>> {
        let ids = sqlx::query_scalar::<_, StudentId>(
            "SELECT id FROM students WHERE class_id = ? ORDER BY id",
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl AttendanceLedger for MySqlStore {
    async fn get(&self, id: u64) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance a WHERE a.id = ?");
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn find_for_key(
        &self,
        student_id: StudentId,
        session_id: SessionId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance a
            WHERE a.student_id = ? AND a.session_id = ? AND a.attendance_date = ?
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT 1
            "#
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(student_id)
            .bind(session_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn latest_for_student_on(
        &self,
        student_id: StudentId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance a
            WHERE a.student_id = ? AND a.attendance_date = ?
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT 1
            "#
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(student_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn insert(&self, new: NewAttendance) -> StoreResult<AttendanceRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (student_id, session_id, class_id, attendance_date,
                 check_in, check_out, status, remark, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.student_id)
        .bind(new.session_id)
        .bind(new.class_id)
        .bind(new.attendance_date)
        .bind(new.check_in)
        .bind(new.check_out)
        .bind(new.status.as_ref())
        .bind(new.remark.as_deref())
        .bind(new.recorded_at)
        .bind(new.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        let id = result.last_insert_id();
        self.get(id).await?.ok_or_else(|| {
            StoreError::Unavailable(format!("attendance row {id} vanished after insert"))
        })
    }

    async fn set_check_out(
        &self,
        id: u64,
        check_out: NaiveTime,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Option<AttendanceRecord>> {
        sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(check_out)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        // A scan in the same second as the check-in changes nothing, and
        // MySQL then reports 0 affected rows.
        self.get(id).await
    }

    async fn students_with_record(
        &self,
        session_id: SessionId,
        date: NaiveDate,
        students: &[StudentId],
    ) -> StoreResult<Vec<StudentId>> {
        if students.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT student_id
            FROM attendance
            WHERE session_id = ? AND attendance_date = ? AND student_id IN ({})
            "#,
            placeholders(students.len())
        );

        let mut query = sqlx::query_scalar::<_, StudentId>(&sql)
            .bind(session_id)
            .bind(date);
        for student_id in students {
            query = query.bind(*student_id);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn update(
        &self,
        id: u64,
        changes: AttendanceChanges,
        updated_at: NaiveDateTime,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let Some(update) = build_attendance_update(&changes, updated_at, id) else {
            return self.get(id).await;
        };

        bind_query(sqlx::query(&update.sql), update.values)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        // MySQL reports 0 affected rows when the values did not change, so
        // existence is decided by re-reading the row.
        self.get(id).await
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, filter: &AttendanceFilter) -> StoreResult<Vec<AttendanceRecord>> {
        let mut clause = build_attendance_where(filter);
        let page = build_page_clause(filter);
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM attendance a
            JOIN sessions s ON s.id = a.session_id
            {}
            ORDER BY a.attendance_date DESC, a.id DESC
            {}
            "#,
            clause.sql, page.sql
        );
        clause.values.extend(page.values);

        let records = bind_query_as(sqlx::query_as::<_, AttendanceRecord>(&sql), clause.values)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    async fn status_counts(&self) -> StoreResult<Vec<(AttendanceStatus, u64)>> {
        let rows = sqlx::query_as::<_, (AttendanceStatus, i64)>(
            "SELECT status, COUNT(*) FROM attendance GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| (status, count.max(0) as u64))
            .collect())
    }

    async fn latest(&self, limit: u32) -> StoreResult<Vec<LatestAttendance>> {
        let rows = sqlx::query_as::<_, LatestAttendance>(
            r#"
                SELECT
                    a.id,
                    a.attendance_date,
                    a.check_in,
                    a.status,
                    st.name AS student_name,
                    c.name AS class_name,
                    sub.name AS subject_name
                FROM attendance a
                JOIN students st ON st.id = a.student_id
                JOIN classes c ON c.id = a.class_id
                JOIN sessions s ON s.id = a.session_id
                JOIN subjects sub ON sub.id = s.subject_id
                ORDER BY a.attendance_date DESC, a.created_at DESC
                LIMIT ?
                "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
