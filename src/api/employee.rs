use actix_web::{Responder, web};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use super::{created, ok};
use crate::config::Config;
use crate::error::AppError;
use crate::service::employee::EMPLOYEE_ID;
use crate::state::AppState;
use crate::utils::object_id::validate_object_id;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeLookup {
    /// Falls back to the configured demo employee when omitted
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "John Doe")]
    pub name: Option<String>,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: Option<String>,
    /// Defaults to `Employee`
    #[schema(example = "Developer")]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPhotos {
    #[schema(example = "65a1b2c3d4e5f6a7b8c9d0aa")]
    pub employee_id: Option<String>,
    /// 3 to 5 base64 images
    pub photos: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RemovePhoto {
    pub employee_id: Option<String>,
    pub photo_url: Option<String>,
}

/// Get employee profile
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeLookup),
    responses(
        (status = 200, description = "Employee profile", body = crate::model::employee::Employee),
        (status = 400, description = "Missing or malformed id", body = Object, example = json!({
            "success": false,
            "error": "Invalid Employee ID format. Must be a 24-character hexadecimal string",
            "code": "VALIDATION_ERROR"
        })),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    query: web::Query<EmployeeLookup>,
) -> actix_web::Result<impl Responder> {
    let id = query
        .into_inner()
        .id
        .filter(|id| !id.trim().is_empty())
        .or_else(|| config.demo_employee_id.clone())
        .unwrap_or_default();

    debug!(employee_id = %id, "Employee lookup");
    let employee = state.employees.get_employee(&id).await?;
    Ok(ok(employee))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = crate::model::employee::Employee),
        (status = 400, description = "Missing name or email", body = Object, example = json!({
            "success": false,
            "error": "Name and email are required",
            "code": "VALIDATION_ERROR"
        })),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "success": false,
            "error": "Employee with this email already exists",
            "code": "CONFLICT"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let CreateEmployee { name, email, role } = payload.into_inner();

    let employee = state
        .employees
        .create_employee(
            name.as_deref().unwrap_or_default(),
            email.as_deref().unwrap_or_default(),
            role.as_deref(),
        )
        .await?;

    Ok(created(employee))
}

/// Register reference face photos (replaces the current set)
#[utoipa::path(
    post,
    path = "/api/employee/photos",
    request_body = RegisterPhotos,
    responses(
        (status = 200, description = "Photos registered", body = Object, example = json!({
            "success": true,
            "data": {
                "faceImages": [
                    "https://res.cloudinary.com/demo/image/upload/v1/employee-attendance/65a1b2c3d4e5f6a7b8c9d0aa/registration/p1.jpg"
                ]
            }
        })),
        (status = 400, description = "Wrong number of photos or invalid image", body = Object, example = json!({
            "success": false,
            "error": "Please provide 3-5 photos",
            "code": "VALIDATION_ERROR"
        })),
        (status = 404, description = "Employee not found"),
        (status = 502, description = "Photo storage failure"),
        (status = 503, description = "Photo storage not configured")
    ),
    tag = "Employee"
)]
pub async fn register_photos(
    state: web::Data<AppState>,
    payload: web::Json<RegisterPhotos>,
) -> actix_web::Result<impl Responder> {
    let RegisterPhotos { employee_id, photos } = payload.into_inner();

    let employee_id =
        validate_object_id(employee_id.as_deref().unwrap_or_default(), EMPLOYEE_ID)?;
    let photos =
        photos.ok_or_else(|| AppError::Validation("Photos array is required".into()))?;

    let face_images = state
        .employees
        .register_photos(&employee_id, &photos)
        .await?;

    Ok(ok(json!({ "faceImages": face_images })))
}

/// Remove one reference photo
#[utoipa::path(
    delete,
    path = "/api/employee/photos",
    params(RemovePhoto),
    responses(
        (status = 200, description = "Remaining photos", body = Object, example = json!({
            "success": true,
            "data": { "faceImages": [] }
        })),
        (status = 400, description = "Missing id or photo url"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee"
)]
pub async fn remove_photo(
    state: web::Data<AppState>,
    query: web::Query<RemovePhoto>,
) -> actix_web::Result<impl Responder> {
    let RemovePhoto {
        employee_id,
        photo_url,
    } = query.into_inner();

    let face_images = state
        .employees
        .remove_photo(
            employee_id.as_deref().unwrap_or_default(),
            photo_url.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(ok(json!({ "faceImages": face_images })))
}
