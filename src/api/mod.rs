/// Builds the full routed app over a [`testing::TestState`].
#[cfg(test)]
macro_rules! test_app {
    ($state:expr) => {{
        let state: &$crate::api::testing::TestState = &$state;
        let config = state.config.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(state.config.clone()))
                .app_data(state.recorder())
                .app_data(state.sweeper())
                .app_data(state.reports())
                .configure(move |cfg| $crate::routes::configure(cfg, config)),
        )
        .await
    }};
}

pub mod attendance;
pub mod report;

#[cfg(test)]
pub mod testing {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use actix_web::test::TestRequest;
    use actix_web::web::Data;
    use chrono::NaiveDate;

    use crate::auth::jwt::testing::issue;
    use crate::clock::testing::FixedClock;
    use crate::config::Config;
    use crate::model::attendance::AttendanceRecord;
    use crate::model::ids::SessionId;
    use crate::model::role::Role;
    use crate::model::session::ScheduleDay;
    use crate::models::TokenType;
    use crate::repository::memory::MemoryStore;
    use crate::service::recorder::AttendanceRecorder;
    use crate::service::report::ReportAggregator;
    use crate::service::sweeper::AbsenceSweeper;

    const SECRET: &str = "test-secret";

    /// Monday 2025-03-03, 07:55 local.
    ///
    /// Class 1 ("X IPA 1") has session 1 (08:00-09:00) and student 10
    /// ("NIS-10"). Class 2 has session 3 (10:00-11:00) and student 20
    /// ("NIS-20"). All sessions teach subject 1 with teacher 1.
    pub struct TestState {
        pub store: MemoryStore,
        pub clock: Arc<FixedClock>,
        pub config: Config,
        recorder: Data<AttendanceRecorder>,
        sweeper: Data<AbsenceSweeper>,
        reports: Data<ReportAggregator>,
    }

    impl TestState {
        pub fn new() -> Self {
            let store = MemoryStore::new();
            store.add_class(1, "X IPA 1");
            store.add_class(2, "X IPA 2");
            store.add_subject(1, "Mathematics");
            store.add_session(1, 1, ScheduleDay::Monday, (8, 0), (9, 0));
            store.add_session(3, 2, ScheduleDay::Monday, (10, 0), (11, 0));
            store.add_student(10, 1, "NIS-10");
            store.add_student(20, 2, "NIS-20");

            let clock = Arc::new(FixedClock::at(
                NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
                7,
                55,
                0,
            ));
            let config = Config::for_tests(SECRET);
            let shared = Arc::new(store.clone());

            let recorder = AttendanceRecorder::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
                clock.clone(),
            );
            let sweeper = AbsenceSweeper::new(
                shared.clone(),
                shared.clone(),
                shared.clone(),
                clock.clone(),
                config.sweep_grace_minutes,
            );
            let reports = ReportAggregator::new(shared.clone(), shared.clone(), shared);

            Self {
                store,
                clock,
                config,
                recorder: Data::new(recorder),
                sweeper: Data::new(sweeper),
                reports: Data::new(reports),
            }
        }

        pub fn today(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
        }

        pub fn recorder(&self) -> Data<AttendanceRecorder> {
            self.recorder.clone()
        }

        pub fn sweeper(&self) -> Data<AbsenceSweeper> {
            self.sweeper.clone()
        }

        pub fn reports(&self) -> Data<ReportAggregator> {
            self.reports.clone()
        }

        pub fn token(&self, role: Role) -> String {
            issue(SECRET, role as u8, None, TokenType::Access, 600)
        }

        pub fn teacher_token(&self, teacher_id: u64) -> String {
            issue(SECRET, Role::Teacher as u8, Some(teacher_id), TokenType::Access, 600)
        }

        pub fn refresh_token(&self) -> String {
            issue(SECRET, Role::Admin as u8, None, TokenType::Refresh, 600)
        }

        pub async fn checked_in(&self, scan_token: &str, session_id: u64) -> AttendanceRecord {
            self.recorder
                .check_in(scan_token, SessionId(session_id))
                .await
                .unwrap()
        }
    }

    pub fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    /// Adds a bearer token and the peer address the rate limiter keys on.
    pub fn authed(req: TestRequest, token: &str) -> TestRequest {
        req.peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {token}")))
    }
}
