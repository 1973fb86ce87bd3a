use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{Query, QueryAs};

use crate::model::attendance::{AttendanceChanges, AttendanceFilter};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    U64(u64),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

/// ===============================
/// SQL fragment + its bind values
/// ===============================
#[derive(Debug, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build the UPDATE for a correction
/// ===============================
/// Returns `None` when no column changes.
pub fn build_attendance_update(
    changes: &AttendanceChanges,
    updated_at: NaiveDateTime,
    id: u64,
) -> Option<SqlFragment> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values = Vec::new();

    if let Some(session_id) = changes.session_id {
        sets.push("session_id = ?");
        values.push(SqlValue::U64(session_id.0));
    }
    if let Some(class_id) = changes.class_id {
        sets.push("class_id = ?");
        values.push(SqlValue::U64(class_id.0));
    }
    if let Some(date) = changes.attendance_date {
        sets.push("attendance_date = ?");
        values.push(SqlValue::Date(date));
    }
    if let Some(check_in) = changes.check_in {
        sets.push("check_in = ?");
        values.push(SqlValue::Time(check_in));
    }
    if let Some(check_out) = changes.check_out {
        sets.push("check_out = ?");
        values.push(SqlValue::Time(check_out));
    }
    if let Some(status) = changes.status {
        sets.push("status = ?");
        values.push(SqlValue::String(status.to_string()));
    }
    if let Some(remark) = &changes.remark {
        sets.push("remark = ?");
        values.push(SqlValue::String(remark.clone()));
    }

    if sets.is_empty() {
        return None;
    }

    sets.push("updated_at = ?");
    values.push(SqlValue::DateTime(updated_at));
    values.push(SqlValue::U64(id));

    Some(SqlFragment {
        sql: format!("UPDATE attendance SET {} WHERE id = ?", sets.join(", ")),
        values,
    })
}

/// ===============================
/// Build the WHERE clause for a filter
/// ===============================
/// Columns are qualified with `a` (attendance) and `s` (sessions), so the
/// caller must join `sessions s ON s.id = a.session_id`.
pub fn build_attendance_where(filter: &AttendanceFilter) -> SqlFragment {
    let mut sql = String::from(" WHERE 1=1");
    let mut values = Vec::new();

    if let Some(student_id) = filter.student_id {
        sql.push_str(" AND a.student_id = ?");
        values.push(SqlValue::U64(student_id.0));
    }
    if let Some(class_id) = filter.class_id {
        sql.push_str(" AND a.class_id = ?");
        values.push(SqlValue::U64(class_id.0));
    }
    if let Some(session_id) = filter.session_id {
        sql.push_str(" AND a.session_id = ?");
        values.push(SqlValue::U64(session_id.0));
    }
    if let Some(subject_id) = filter.subject_id {
        sql.push_str(" AND s.subject_id = ?");
        values.push(SqlValue::U64(subject_id.0));
    }
    if let Some(teacher_id) = filter.teacher_id {
        sql.push_str(" AND s.teacher_id = ?");
        values.push(SqlValue::U64(teacher_id.0));
    }
    if let Some(status) = filter.status {
        sql.push_str(" AND a.status = ?");
        values.push(SqlValue::String(status.to_string()));
    }
    if let Some(from) = filter.date_from {
        sql.push_str(" AND a.attendance_date >= ?");
        values.push(SqlValue::Date(from));
    }
    if let Some(to) = filter.date_to {
        sql.push_str(" AND a.attendance_date <= ?");
        values.push(SqlValue::Date(to));
    }

    SqlFragment { sql, values }
}

/// ===============================
/// Build the LIMIT clause for a filter
/// ===============================
/// Empty when the filter has no `limit`; `offset` alone is ignored.
pub fn build_page_clause(filter: &AttendanceFilter) -> SqlFragment {
    match filter.limit {
        Some(limit) => SqlFragment {
            sql: " LIMIT ? OFFSET ?".to_string(),
            values: vec![
                SqlValue::U64(u64::from(limit)),
                SqlValue::U64(u64::from(filter.offset.unwrap_or(0))),
            ],
        },
        None => SqlFragment::default(),
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub fn bind_query<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: Vec<SqlValue>,
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::U64(v) => query.bind(v),
            SqlValue::String(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
        };
    }
    query
}

pub fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: Vec<SqlValue>,
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::U64(v) => query.bind(v),
            SqlValue::String(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
        };
    }
    query
}
