use crate::{
    api::{attendance, report},
    auth::middleware::auth_middleware,
    config::Config,
    error::AttendanceError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpRequest, middleware::from_fn, web};
use std::fmt::Display;
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    // finish() only rejects a zero period or burst
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

// Malformed bodies and query strings get the same JSON error body as handler errors
fn invalid_input<E: Display>(err: E, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Rejected request input");
    AttendanceError::InvalidArgument(err.to_string()).into()
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let scan_limiter = Arc::new(build_limiter(config.rate_scan_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .app_data(web::JsonConfig::default().error_handler(invalid_input))
            .app_data(web::QueryConfig::default().error_handler(invalid_input))
            .app_data(web::PathConfig::default().error_handler(invalid_input))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    // kiosk endpoints get their own, tighter budget
                    .service(
                        web::resource("/scan")
                            .wrap(scan_limiter.clone())
                            .route(web::post().to(attendance::scan)),
                    )
                    .service(
                        web::resource("/mark")
                            .wrap(scan_limiter)
                            .route(web::post().to(attendance::mark)),
                    )
                    .service(web::resource("/sweep").route(web::post().to(attendance::sweep)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(attendance::get_attendance))
                            .route(web::put().to(attendance::update_attendance))
                            .route(web::delete().to(attendance::delete_attendance)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/monthly").route(web::get().to(report::monthly)))
                    .service(web::resource("/daily").route(web::get().to(report::daily)))
                    .service(
                        web::resource("/session/{id}")
                            .route(web::get().to(report::session_summary)),
                    )
                    .service(web::resource("/latest").route(web::get().to(report::latest)))
                    .service(web::resource("/stats").route(web::get().to(report::stats))),
            ),
    );
}
