use chrono::NaiveTime;
use strum_macros::{AsRefStr, Display};

/// Remark used when a check-in cannot be compared with a schedule.
pub const GENERIC_PRESENT_REMARK: &str = "Present";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr)]
pub enum Punctuality {
    #[strum(serialize = "On time")]
    OnTime,
    #[strum(serialize = "Late")]
    Late,
}

/// Arriving exactly at the scheduled start still counts as on time.
pub fn classify(scheduled_start: NaiveTime, observed_check_in: NaiveTime) -> Punctuality {
    if observed_check_in <= scheduled_start {
        Punctuality::OnTime
    } else {
        Punctuality::Late
    }
}

/// Remark for a Present row. Falls back to the generic label when the
/// session's start time is unknown.
pub fn check_in_remark(scheduled_start: Option<NaiveTime>, observed_check_in: NaiveTime) -> String {
    match scheduled_start {
        Some(start) => classify(start, observed_check_in).to_string(),
        None => GENERIC_PRESENT_REMARK.to_string(),
    }
}
