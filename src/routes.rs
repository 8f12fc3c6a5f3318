use crate::{
    api::{attendance, employee},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{guard, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let attendance_limiter = Arc::new(build_limiter(config.rate_attendance_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let query_limiter = Arc::new(build_limiter(config.rate_query_per_min));

    // Malformed bodies and query strings get the same envelope as service errors
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid query parameters: {err}")).into()
    }));

    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::mark_attendance)),
                    )
                    // /attendance/checkout
                    .service(
                        web::resource("/checkout")
                            .wrap(attendance_limiter)
                            .route(web::post().to(attendance::checkout)),
                    )
                    // /attendance/today
                    .service(
                        web::resource("/today")
                            .wrap(query_limiter.clone())
                            .route(web::get().to(attendance::today)),
                    )
                    // /attendance/history
                    .service(
                        web::resource("/history")
                            .wrap(query_limiter.clone())
                            .route(web::get().to(attendance::history)),
                    )
                    // /attendance/summary
                    .service(
                        web::resource("/summary")
                            .wrap(query_limiter.clone())
                            .route(web::get().to(attendance::summary)),
                    ),
            )
            .service(
                web::scope("/employee")
                    // GET /employee
                    .service(
                        web::resource("")
                            .guard(guard::Get())
                            .wrap(query_limiter)
                            .route(web::get().to(employee::get_employee)),
                    )
                    // POST /employee
                    .service(
                        web::resource("")
                            .wrap(register_limiter.clone())
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employee/photos
                    .service(
                        web::resource("/photos")
                            .wrap(register_limiter)
                            .route(web::post().to(employee::register_photos))
                            .route(web::delete().to(employee::remove_photo)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    use crate::api::testing::{mount, request};
    use crate::config::Config;
    use crate::state::AppState;
    use crate::utils::time::testing::FixedClock;
    use crate::verification::testing::ScriptedVerifier;

    #[actix_web::test]
    async fn query_routes_are_rate_limited_per_peer() {
        let state = AppState::for_tests(
            Arc::new(ScriptedVerifier::matching(90.0)),
            Arc::new(FixedClock::at(2026, 1, 5, 9, 0, 0)),
        );
        let mut config = Config::for_tests();
        config.rate_query_per_min = 2;
        let app = test::init_service(App::new().configure(mount(state, config))).await;

        let uri = "/api/attendance/today?employeeId=65a1b2c3d4e5f6a7b8c9d0aa";
        for _ in 0..2 {
            let resp = test::call_service(&app, request().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = test::call_service(&app, request().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn honours_a_custom_prefix() {
        let state = AppState::for_tests(
            Arc::new(ScriptedVerifier::matching(90.0)),
            Arc::new(FixedClock::at(2026, 1, 5, 9, 0, 0)),
        );
        let mut config = Config::for_tests();
        config.api_prefix = "/v2".into();
        let app = test::init_service(App::new().configure(mount(state, config))).await;

        let uri = "/v2/attendance/today?employeeId=65a1b2c3d4e5f6a7b8c9d0aa";
        let resp = test::call_service(&app, request().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let uri = "/api/attendance/today?employeeId=65a1b2c3d4e5f6a7b8c9d0aa";
        let resp = test::call_service(&app, request().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
