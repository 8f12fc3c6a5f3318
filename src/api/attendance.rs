use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use super::ok;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    #[schema(example = "65a1b2c3d4e5f6a7b8c9d0aa")]
    pub employee_id: Option<String>,
    /// Base64 image, optionally as a `data:image/...;base64,` URL
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQSkZJRg...")]
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[schema(example = "65a1b2c3d4e5f6a7b8c9d0aa")]
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EmployeeIdQuery {
    pub employee_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub employee_id: Option<String>,
    /// `YYYY-MM`
    pub month: Option<String>,
    /// Defaults to 1
    pub page: Option<u32>,
    /// Defaults to 10, at most 100
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub employee_id: Option<String>,
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
}

/// Mark attendance (check-in)
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 201, description = "Attendance marked", body = Object, example = json!({
            "success": true,
            "data": {
                "id": "65a1b2c3d4e5f6a7b8c9d0e1",
                "employeeId": "65a1b2c3d4e5f6a7b8c9d0aa",
                "date": "2026-01-15",
                "checkIn": "2026-01-15T03:25:10Z",
                "checkOut": null,
                "workingHours": 0.0,
                "status": "Present",
                "attendancePhoto": "https://res.cloudinary.com/demo/image/upload/v1/employee-attendance/65a1b2c3d4e5f6a7b8c9d0aa/attendance/a1.jpg",
                "createdAt": "2026-01-15T03:25:11Z"
            },
            "confidence": 91.27
        })),
        (status = 400, description = "Invalid input or no registered face photos", body = Object, example = json!({
            "success": false,
            "error": "Please register your face photos first",
            "code": "PRECONDITION_FAILED"
        })),
        (status = 401, description = "Face verification failed", body = Object, example = json!({
            "success": false,
            "error": "Face verification failed. Please try again.",
            "code": "UNAUTHORIZED",
            "confidence": 0.0
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Attendance already marked for today", body = Object, example = json!({
            "success": false,
            "error": "Attendance already marked for today",
            "code": "CONFLICT"
        })),
        (status = 502, description = "Photo storage failure"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    state: web::Data<AppState>,
    payload: web::Json<MarkAttendanceRequest>,
) -> actix_web::Result<impl Responder> {
    let MarkAttendanceRequest { employee_id, photo } = payload.into_inner();

    let check_in = state
        .attendance
        .mark_attendance(
            employee_id.as_deref().unwrap_or_default(),
            photo.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": check_in.record,
        "confidence": check_in.confidence,
    })))
}

/// Check out for today
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checked out", body = Object, example = json!({
            "success": true,
            "data": { "checkOut": "2026-01-15T11:55:00Z", "workingHours": 8.5 }
        })),
        (status = 400, description = "Invalid employee id"),
        (status = 404, description = "No check-in record found for today"),
        (status = 409, description = "Already checked out for today"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn checkout(
    state: web::Data<AppState>,
    payload: web::Json<CheckoutRequest>,
) -> actix_web::Result<impl Responder> {
    let employee_id = payload.into_inner().employee_id.unwrap_or_default();

    let check_out = state.attendance.mark_checkout(&employee_id).await?;
    Ok(ok(check_out))
}

/// Today's attendance record, `null` when not checked in
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    params(EmployeeIdQuery),
    responses(
        (status = 200, description = "Today's record or null", body = Object, example = json!({
            "success": true,
            "data": null
        })),
        (status = 400, description = "Invalid employee id"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn today(
    state: web::Data<AppState>,
    query: web::Query<EmployeeIdQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = query.into_inner().employee_id.unwrap_or_default();

    let record = state.attendance.today(&employee_id).await?;
    Ok(ok(record))
}

/// Paginated attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Attendance history", body = Object, example = json!({
            "success": true,
            "data": {
                "records": [],
                "pagination": { "total": 0, "page": 1, "limit": 10, "totalPages": 0 }
            }
        })),
        (status = 400, description = "Invalid employee id or month"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let HistoryQuery {
        employee_id,
        month,
        page,
        limit,
    } = query.into_inner();

    let history = state
        .attendance
        .history(
            employee_id.as_deref().unwrap_or_default(),
            month.as_deref(),
            page,
            limit,
        )
        .await?;

    Ok(ok(history))
}

/// Monthly attendance summary
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Monthly summary", body = crate::service::attendance::MonthlySummary),
        (status = 400, description = "Invalid employee id or month"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn summary(
    state: web::Data<AppState>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let SummaryQuery { employee_id, month } = query.into_inner();

    let summary = state
        .attendance
        .monthly_summary(employee_id.as_deref().unwrap_or_default(), month.as_deref())
        .await?;

    Ok(ok(summary))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::{Method, StatusCode};
    use actix_web::{App, test};
    use chrono::Duration;
    use serde_json::{Value, json};

    use crate::api::testing::{mount, request};
    use crate::config::Config;
    use crate::service::employee::testing::{PHOTO, photos};
    use crate::state::AppState;
    use crate::utils::time::testing::FixedClock;
    use crate::verification::FaceVerifier;
    use crate::verification::testing::ScriptedVerifier;

    async fn seeded(verifier: Arc<dyn FaceVerifier>, clock: Arc<FixedClock>) -> (AppState, String) {
        let state = AppState::for_tests(verifier, clock);
        let employee = state
            .employees
            .create_employee("Jane Doe", "jane@company.com", None)
            .await
            .unwrap();
        state
            .employees
            .register_photos(&employee.id, &photos(3))
            .await
            .unwrap();
        (state, employee.id)
    }

    #[actix_web::test]
    async fn check_in_then_checkout_round_trip() {
        let clock = Arc::new(FixedClock::at(2026, 1, 5, 9, 0, 0));
        let (state, id) = seeded(Arc::new(ScriptedVerifier::matching(88.0)), clock.clone()).await;
        let app = test::init_service(App::new().configure(mount(state, Config::for_tests()))).await;

        let req = request()
            .method(Method::POST)
            .uri("/api/attendance")
            .set_json(json!({ "employeeId": id, "photo": PHOTO }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["confidence"], 88.0);
        assert_eq!(body["data"]["date"], "2026-01-05");
        assert_eq!(body["data"]["status"], "Present");

        clock.advance(Duration::minutes(8 * 60 + 30));
        let req = request()
            .method(Method::POST)
            .uri("/api/attendance/checkout")
            .set_json(json!({ "employeeId": id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["workingHours"], 8.5);

        let req = request()
            .uri(&format!("/api/attendance/today?employeeId={id}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["workingHours"], 8.5);
        assert!(body["data"]["checkOut"].is_string());
    }

    #[actix_web::test]
    async fn failures_use_the_error_envelope() {
        let clock = Arc::new(FixedClock::at(2026, 1, 5, 9, 0, 0));
        let (state, id) = seeded(Arc::new(ScriptedVerifier::rejecting()), clock).await;
        let app = test::init_service(App::new().configure(mount(state, Config::for_tests()))).await;

        let req = request()
            .method(Method::POST)
            .uri("/api/attendance")
            .set_json(json!({ "employeeId": id, "photo": PHOTO }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["confidence"], 0.0);

        let req = request()
            .method(Method::POST)
            .uri("/api/attendance")
            .set_json(json!({ "photo": PHOTO }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Employee ID is required");

        let req = request()
            .method(Method::POST)
            .uri("/api/attendance/checkout")
            .set_json(json!({ "employeeId": id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn malformed_json_is_a_validation_error() {
        let clock = Arc::new(FixedClock::at(2026, 1, 5, 9, 0, 0));
        let state = AppState::for_tests(Arc::new(ScriptedVerifier::matching(90.0)), clock);
        let app = test::init_service(App::new().configure(mount(state, Config::for_tests()))).await;

        let req = request()
            .method(Method::POST)
            .uri("/api/attendance")
            .insert_header(("content-type", "application/json"))
            .set_payload("{ not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn history_and_summary_report_pagination_and_counts() {
        let clock = Arc::new(FixedClock::at(2026, 1, 5, 8, 0, 0));
        let (state, id) = seeded(Arc::new(ScriptedVerifier::matching(95.0)), clock.clone()).await;
        for day in [5, 6, 7] {
            clock.set(2026, 1, day, 8, 0, 0);
            state.attendance.mark_attendance(&id, PHOTO).await.unwrap();
        }
        let app = test::init_service(App::new().configure(mount(state, Config::for_tests()))).await;

        let req = request()
            .uri(&format!("/api/attendance/history?employeeId={id}&month=2026-01&page=1&limit=2"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["records"][0]["date"], "2026-01-07");
        assert_eq!(
            body["data"]["pagination"],
            json!({ "total": 3, "page": 1, "limit": 2, "totalPages": 2 })
        );

        let req = request()
            .uri(&format!("/api/attendance/summary?employeeId={id}&month=2026-01"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["present"], 3);
        assert_eq!(body["data"]["recordedDays"], 3);

        let req = request()
            .uri(&format!("/api/attendance/history?employeeId={id}&page=abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
