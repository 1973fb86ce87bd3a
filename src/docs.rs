use crate::api::attendance::{MarkRequest, ScanRequest};
use crate::model::attendance::{
    AttendanceCorrection, AttendanceFilter, AttendanceRecord, AttendanceStatus, LatestAttendance,
};
use crate::service::recorder::ScanKind;
use crate::service::report::{
    DailyTally, LedgerStats, MonthlyStudentReport, SessionSummary, StatusTally, StudentTally,
};
use crate::service::sweeper::SweepReport;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Attendance API",
        version = "1.0.0",
        description = r#"
## School Attendance Engine

Records student attendance against a weekly class schedule.

### 🔹 Key Features
- **Scanning**
  - Check-in and check-out by barcode or student number, classified as *On time* or *Late*
- **Manual status**
  - Leave, Sick and Absent without scan times
- **Automatic absences**
  - Students with no record are marked Absent once a session has ended
- **Reports**
  - Monthly per-student reports, daily breakdowns, per-session summaries and ledger statistics

### 🔐 Security
All endpoints require a **JWT Bearer** access token.
Corrections and deletions are limited to **Admin** and **Teacher**; triggering a sweep is **Admin** only.

### 📦 Response Format
- JSON responses
- Errors are `{"success": false, "message": "..."}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::scan,
        crate::api::attendance::mark,
        crate::api::attendance::get_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::sweep,
        crate::api::attendance::list_attendance,

        crate::api::report::monthly,
        crate::api::report::daily,
        crate::api::report::session_summary,
        crate::api::report::latest,
        crate::api::report::stats
    ),
    components(
        schemas(
            ScanKind,
            ScanRequest,
            MarkRequest,
            AttendanceStatus,
            AttendanceRecord,
            AttendanceCorrection,
            AttendanceFilter,
            LatestAttendance,
            SweepReport,
            StatusTally,
            MonthlyStudentReport,
            DailyTally,
            StudentTally,
            SessionSummary,
            LedgerStats
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Scan, manual status and correction APIs"),
        (name = "Report", description = "Attendance reporting APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
