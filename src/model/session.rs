use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::ids::{ClassId, SessionId, SubjectId, TeacherId};

/// Day of the week a session is timetabled on, stored by name.
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
    ToSchema,
    sqlx::Type,
)]
#[strum(ascii_case_insensitive)]
pub enum ScheduleDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl ScheduleDay {
    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => ScheduleDay::Monday,
            Weekday::Tue => ScheduleDay::Tuesday,
            Weekday::Wed => ScheduleDay::Wednesday,
            Weekday::Thu => ScheduleDay::Thursday,
            Weekday::Fri => ScheduleDay::Friday,
            Weekday::Sat => ScheduleDay::Saturday,
            Weekday::Sun => ScheduleDay::Sunday,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_weekday(date.weekday())
    }
}

/// A timetabled class meeting. Owned by schedule management; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Session {
    #[schema(value_type = u64, example = 11)]
    pub id: SessionId,
    #[schema(value_type = u64, example = 5)]
    pub class_id: ClassId,
    #[schema(value_type = u64, example = 3)]
    pub subject_id: SubjectId,
    #[schema(value_type = u64, example = 7)]
    pub teacher_id: TeacherId,
    pub day: ScheduleDay,
    #[schema(value_type = String, format = "time", example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, format = "time", example = "09:00:00")]
    pub end_time: NaiveTime,
}
