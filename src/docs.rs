use crate::api::attendance::{CheckoutRequest, MarkAttendanceRequest};
use crate::api::employee::{CreateEmployee, RegisterPhotos};
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::employee::Employee;
use crate::service::attendance::{CheckOut, History, MonthlySummary, Pagination};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Photo Attendance API",
        version = "1.0.0",
        description = r#"
## Photo-based Employee Attendance

Employees check in once per day with a live photo that is matched against the reference
photos they registered, and check out later the same day.

### 🔹 Key Features
- **Attendance**
  - Check-in with face verification, check-out with working hours
  - Today's record, paginated history and a monthly summary
- **Employees**
  - Create and look up employee profiles
  - Register 3 to 5 reference face photos, remove individual photos

### 📦 Response Format
- Success: `{ "success": true, "data": ... }`
- Failure: `{ "success": false, "error": "...", "code": "..." }`
- Field names are camelCase, timestamps are RFC 3339 UTC

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::checkout,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::summary,

        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::register_photos,
        crate::api::employee::remove_photo
    ),
    components(
        schemas(
            MarkAttendanceRequest,
            CheckoutRequest,
            Attendance,
            AttendanceStatus,
            CheckOut,
            History,
            Pagination,
            MonthlySummary,
            CreateEmployee,
            RegisterPhotos,
            Employee
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in, check-out and attendance queries"),
        (name = "Employee", description = "Employee profiles and reference photos"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        for path in [
            "/api/attendance",
            "/api/attendance/checkout",
            "/api/attendance/today",
            "/api/attendance/history",
            "/api/attendance/summary",
            "/api/employee",
            "/api/employee/photos",
        ] {
            assert!(paths.iter().any(|p| p == path), "missing {path}");
        }
    }

    #[test]
    fn responses_reference_their_schemas() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let body = |path: &str, method: &str, status: &str| {
            doc["paths"][path][method]["responses"][status]["content"]["application/json"]["schema"]
                ["$ref"]
                .clone()
        };

        assert_eq!(
            body("/api/attendance/summary", "get", "200"),
            "#/components/schemas/MonthlySummary"
        );
        assert_eq!(body("/api/employee", "get", "200"), "#/components/schemas/Employee");
        assert_eq!(body("/api/employee", "post", "201"), "#/components/schemas/Employee");
    }
}
