use crate::auth::auth::AuthUser;
use crate::model::attendance::LatestAttendance;
use crate::model::ids::{ClassId, SessionId, StudentId, TeacherId};
use crate::service::report::{
    DailyTally, LedgerStats, MonthlyStudentReport, ReportAggregator, SessionSummary,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthlyQuery {
    #[param(value_type = u64, example = 101)]
    pub student_id: StudentId,
    #[param(example = 2025)]
    pub year: i32,
    #[param(example = 3)]
    pub month: u32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DailyQuery {
    #[param(example = 2025)]
    pub year: i32,
    #[param(example = 3)]
    pub month: u32,
    #[param(value_type = Option<u64>)]
    pub class_id: Option<ClassId>,
    /// Teachers always see their own sessions; another id is rejected
    #[param(value_type = Option<u64>)]
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LatestQuery {
    /// Defaults to 10
    pub limit: Option<u32>,
}

/// Monthly attendance report for one student
#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    params(MonthlyQuery),
    responses(
        (status = 200, description = "Monthly report", body = MonthlyStudentReport),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn monthly(
    reports: web::Data<ReportAggregator>,
    query: web::Query<MonthlyQuery>,
) -> actix_web::Result<impl Responder> {
    let report = reports
        .monthly_student_report(query.student_id, query.year, query.month)
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Per-day status counts for a month
#[utoipa::path(
    get,
    path = "/api/reports/daily",
    params(DailyQuery),
    responses(
        (status = 200, description = "Daily breakdown", body = [DailyTally]),
        (status = 400, description = "Invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teacher asked for another teacher's sessions"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn daily(
    auth: AuthUser,
    reports: web::Data<ReportAggregator>,
    query: web::Query<DailyQuery>,
) -> actix_web::Result<impl Responder> {
    let teacher_id = auth.teacher_scope(query.teacher_id)?;

    let days = reports
        .daily_breakdown(query.year, query.month, query.class_id, teacher_id)
        .await?;
    Ok(HttpResponse::Ok().json(days))
}

/// Per-student tallies for one session
#[utoipa::path(
    get,
    path = "/api/reports/session/{id}",
    params(
        ("id" = u64, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Session summary", body = SessionSummary),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn session_summary(
    reports: web::Data<ReportAggregator>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let summary = reports.session_summary(SessionId(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Most recent attendance rows with names
#[utoipa::path(
    get,
    path = "/api/reports/latest",
    params(LatestQuery),
    responses(
        (status = 200, description = "Latest attendance", body = [LatestAttendance]),
        (status = 400, description = "Invalid limit"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn latest(
    reports: web::Data<ReportAggregator>,
    query: web::Query<LatestQuery>,
) -> actix_web::Result<impl Responder> {
    let rows = reports.latest(query.limit).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Row counts per status across the whole ledger
#[utoipa::path(
    get,
    path = "/api/reports/stats",
    responses(
        (status = 200, description = "Ledger statistics", body = LedgerStats),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Report"
)]
pub async fn stats(reports: web::Data<ReportAggregator>) -> actix_web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(reports.stats().await?))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use serde_json::Value;

    use crate::api::testing::{TestState, authed};
    use crate::model::role::Role;

    #[actix_web::test]
    async fn monthly_report_over_http() {
        let state = TestState::new();
        let app = test_app!(state);
        state.checked_in("NIS-10", 1).await;
        let token = state.token(Role::Teacher);

        let req = authed(
            test::TestRequest::get().uri("/api/reports/monthly?student_id=10&year=2025&month=3"),
            &token,
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["tally"]["present"], 1);
        assert_eq!(json["on_time"], 1);
        assert_eq!(json["attendance_rate"], 100);

        let req = authed(
            test::TestRequest::get().uri("/api/reports/monthly?student_id=10&year=2025&month=13"),
            &token,
        )
        .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn teachers_default_to_their_own_sessions() {
        let state = TestState::new();
        let app = test_app!(state);
        state.checked_in("NIS-10", 1).await;

        // sessions in the fixture are taught by teacher 1
        let req = authed(
            test::TestRequest::get().uri("/api/reports/daily?year=2025&month=3"),
            &state.teacher_token(2),
        )
        .to_request();
        let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert!(json.as_array().unwrap().is_empty());

        let req = authed(
            test::TestRequest::get().uri("/api/reports/daily?year=2025&month=3"),
            &state.teacher_token(1),
        )
        .to_request();
        let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(json[0]["date"], "2025-03-03");
        assert_eq!(json[0]["present"], 1);

        let req = authed(
            test::TestRequest::get().uri("/api/reports/daily?year=2025&month=3"),
            &state.token(Role::Admin),
        )
        .to_request();
        let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn teachers_cannot_widen_their_scope() {
        let state = TestState::new();
        let app = test_app!(state);
        state.checked_in("NIS-10", 1).await;

        let req = authed(
            test::TestRequest::get().uri("/api/reports/daily?year=2025&month=3&teacher_id=1"),
            &state.teacher_token(2),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["success"], false);

        // a teacher token without a teacher record sees nothing
        let req = authed(
            test::TestRequest::get().uri("/api/reports/daily?year=2025&month=3"),
            &state.token(Role::Teacher),
        )
        .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = authed(
            test::TestRequest::get().uri("/api/reports/daily?year=2025&month=3&teacher_id=1"),
            &state.teacher_token(1),
        )
        .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn session_summary_and_stats() {
        let state = TestState::new();
        let app = test_app!(state);
        state.checked_in("NIS-10", 1).await;
        let token = state.token(Role::Admin);

        let req = authed(test::TestRequest::get().uri("/api/reports/session/1"), &token)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json["students"][0]["student_id"], 10);
        assert_eq!(json["students"][0]["present"], 1);

        let req = authed(test::TestRequest::get().uri("/api/reports/session/99"), &token)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = authed(test::TestRequest::get().uri("/api/reports/stats"), &token).to_request();
        let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["present"], 1);
    }

    #[actix_web::test]
    async fn latest_feed() {
        let state = TestState::new();
        let app = test_app!(state);
        state.checked_in("NIS-10", 1).await;
        let token = state.token(Role::Operator);

        let req = authed(test::TestRequest::get().uri("/api/reports/latest"), &token).to_request();
        let json: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(json[0]["student_name"], "Student 10");
        assert_eq!(json[0]["class_name"], "X IPA 1");
        assert_eq!(json[0]["subject_name"], "Mathematics");

        let req = authed(test::TestRequest::get().uri("/api/reports/latest?limit=0"), &token)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
