use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::model::attendance::{
    AttendanceCorrection, AttendanceFilter, AttendanceRecord, AttendanceStatus,
};
use crate::model::ids::SessionId;
use crate::service::recorder::{AttendanceRecorder, ScanKind};
use crate::service::report::ReportAggregator;
use crate::service::sweeper::{AbsenceSweeper, SweepReport, TickOutcome};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    #[schema(example = "0051234567")]
    pub scan_token: String,
    pub kind: ScanKind,
    #[schema(example = 11, value_type = u64)]
    pub session_id: SessionId,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkRequest {
    #[schema(example = "0051234567")]
    pub scan_token: String,
    #[schema(example = 11, value_type = u64)]
    pub session_id: SessionId,
    /// One of Leave, Sick, Absent
    #[schema(example = "Sick")]
    pub status: String,
}

/// Record a check-in or check-out scan
#[utoipa::path(
    post,
    path = "/api/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan recorded", body = Object, example = json!({
            "success": true,
            "message": "Checked in successfully",
            "data": {"id": 1, "status": "Present", "remark": "On time"}
        })),
        (status = 400, description = "Missing scan token"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Session belongs to another class"),
        (status = 404, description = "Unknown student, session or open record"),
        (status = 409, description = "Attendance already recorded for this session today", body = Object, example = json!({
            "success": false,
            "message": "Attendance already recorded for this session and date. It cannot be recorded twice."
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn scan(
    recorder: web::Data<AttendanceRecorder>,
    payload: web::Json<ScanRequest>,
) -> actix_web::Result<impl Responder> {
    let record = recorder
        .record_scan(payload.kind, &payload.scan_token, payload.session_id)
        .await?;

    let message = match payload.kind {
        ScanKind::CheckIn => "Checked in successfully",
        ScanKind::CheckOut => "Checked out successfully",
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "data": record
    })))
}

/// Mark a student as on leave, sick or absent
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkRequest,
    responses(
        (status = 201, description = "Status recorded", body = Object, example = json!({
            "success": true,
            "message": "Attendance marked",
            "data": {"id": 2, "status": "Sick", "remark": "Sick", "check_in": null}
        })),
        (status = 400, description = "Status is not Leave, Sick or Absent"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Session belongs to another class"),
        (status = 404, description = "Unknown student or session"),
        (status = 409, description = "Attendance already recorded for this session today"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark(
    recorder: web::Data<AttendanceRecorder>,
    payload: web::Json<MarkRequest>,
) -> actix_web::Result<impl Responder> {
    let status: AttendanceStatus = payload.status.trim().parse().map_err(|_| {
        AttendanceError::InvalidArgument(format!("Unknown status {:?}", payload.status))
    })?;

    let record = recorder
        .mark_status(&payload.scan_token, payload.session_id, status)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Attendance marked",
        "data": record
    })))
}

/// Get one attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record id")
    ),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRecord),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn get_attendance(
    recorder: web::Data<AttendanceRecorder>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record = recorder.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Correct an attendance record (Admin/Teacher)
#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record id")
    ),
    request_body = AttendanceCorrection,
    responses(
        (status = 200, description = "Attendance corrected", body = Object, example = json!({
            "success": true,
            "message": "Attendance updated",
            "data": {"id": 1, "check_in": "08:05:00", "remark": "Late"}
        })),
        (status = 400, description = "Empty correction"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record or session not found"),
        (status = 409, description = "Another record already holds that session and date"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
    path: web::Path<u64>,
    payload: web::Json<AttendanceCorrection>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_teacher()?;

    let id = path.into_inner();
    let record = recorder.correct(id, payload.into_inner()).await?;
    tracing::info!(
        attendance_id = id,
        user_id = auth.user_id,
        username = %auth.username,
        "Correction applied"
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance updated",
        "data": record
    })))
}

/// Delete an attendance record (Admin/Teacher)
#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(
        ("id" = u64, Path, description = "Attendance record id")
    ),
    responses(
        (status = 200, description = "Attendance deleted", body = Object, example = json!({
            "success": true,
            "message": "Attendance deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    auth: AuthUser,
    recorder: web::Data<AttendanceRecorder>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_teacher()?;

    let id = path.into_inner();
    recorder.delete(id).await?;
    tracing::info!(
        attendance_id = id,
        user_id = auth.user_id,
        username = %auth.username,
        "Attendance removed by user"
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance deleted"
    })))
}

/// Run one absence sweep now (Admin)
#[utoipa::path(
    post,
    path = "/api/attendance/sweep",
    responses(
        (status = 200, description = "Sweep finished", body = SweepReport),
        (status = 202, description = "A sweep is already running", body = Object, example = json!({
            "success": true,
            "message": "Sweep already running"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn sweep(
    auth: AuthUser,
    sweeper: web::Data<AbsenceSweeper>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    match sweeper.tick().await? {
        TickOutcome::Completed(report) => Ok(HttpResponse::Ok().json(report)),
        TickOutcome::Skipped => Ok(HttpResponse::Accepted().json(json!({
            "success": true,
            "message": "Sweep already running"
        }))),
    }
}

/// List attendance records, newest date first, one page at a time
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Matching attendance records", body = [AttendanceRecord]),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    reports: web::Data<ReportAggregator>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    let records = reports.records(&query).await?;
    Ok(HttpResponse::Ok().json(records))
}
