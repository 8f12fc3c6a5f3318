use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::attendance::{Attendance, AttendanceStatus, HistoryFilter, NewAttendance};
use crate::photo::{PhotoCategory, PhotoStorage};
use crate::service::employee::{EMPLOYEE_ID, EmployeeService};
use crate::store::{AttendanceStore, StoreError};
use crate::utils::object_id::validate_object_id;
use crate::utils::time::{
    Clock, calculate_working_hours, days_in_month, derive_attendance_status, format_date, format_time,
    is_weekend, parse_month,
};
use crate::verification::FaceVerifier;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const ALREADY_MARKED: &str = "Attendance already marked for today";
const ALREADY_CHECKED_OUT: &str = "Already checked out for today";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckIn {
    pub record: Attendance,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckOut {
    pub check_out: DateTime<Utc>,
    pub working_hours: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct History {
    pub records: Vec<Attendance>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "month": "2026-01",
        "present": 15,
        "late": 3,
        "absent": 2,
        "recordedDays": 18,
        "totalHours": 148.5,
        "averageHours": 8.25,
        "punctuality": 83
    })
)]
pub struct MonthlySummary {
    pub month: String,
    pub present: u32,
    pub late: u32,
    /// Weekdays up to today without any record.
    pub absent: u32,
    pub recorded_days: u32,
    pub total_hours: f64,
    pub average_hours: f64,
    /// Share of on-time check-ins, 0..=100
    pub punctuality: u32,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Check-in, check-out and the attendance queries for one employee at a time.
pub struct AttendanceService {
    employees: Arc<EmployeeService>,
    store: Arc<dyn AttendanceStore>,
    verifier: Arc<dyn FaceVerifier>,
    photos: Arc<dyn PhotoStorage>,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(
        employees: Arc<EmployeeService>,
        store: Arc<dyn AttendanceStore>,
        verifier: Arc<dyn FaceVerifier>,
        photos: Arc<dyn PhotoStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            employees,
            store,
            verifier,
            photos,
            clock,
        }
    }

    #[instrument(name = "mark_attendance", skip(self, photo))]
    pub async fn mark_attendance(&self, employee_id: &str, photo: &str) -> Result<CheckIn, AppError> {
        let employee_id = validate_object_id(employee_id, EMPLOYEE_ID)?;
        let employee_id = employee_id.as_str();
        if photo.trim().is_empty() {
            return Err(AppError::Validation("Photo is required".into()));
        }

        let employee = self.employees.get_employee(employee_id).await?;
        if !employee.has_reference_photos() {
            return Err(AppError::PreconditionFailed(
                "Please register your face photos first".into(),
            ));
        }

        let now = self.clock.now();
        let today = format_date(&now);

        if self.store.find_by_date(employee_id, &today).await?.is_some() {
            return Err(AppError::Conflict(ALREADY_MARKED.into()));
        }

        let verification = self.verifier.verify(photo, &employee.face_images).await;
        if !verification.matched {
            info!(confidence = verification.confidence, "Face verification failed");
            return Err(AppError::Unauthorized {
                message: "Face verification failed. Please try again.".into(),
                confidence: verification.confidence,
            });
        }

        let attendance_photo = self
            .photos
            .upload(photo, employee_id, PhotoCategory::Attendance)
            .await?;

        let status = derive_attendance_status(&now);

        let created = self
            .store
            .create(NewAttendance {
                employee_id: employee_id.to_string(),
                date: today.clone(),
                check_in: now.with_timezone(&Utc),
                status,
                attendance_photo: attendance_photo.clone(),
            })
            .await;

        let record = match created {
            Ok(record) => record,
            Err(e) => {
                // a concurrent check-in won; the uploaded photo is orphaned
                if let Err(delete_err) = self.photos.delete(&attendance_photo).await {
                    warn!(error = %delete_err, "Failed to delete orphaned attendance photo");
                }
                return Err(match e {
                    StoreError::Duplicate => AppError::Conflict(ALREADY_MARKED.into()),
                    other => other.into(),
                });
            }
        };

        info!(
            date = %today,
            time = %format_time(&now),
            status = %status,
            confidence = verification.confidence,
            "Attendance marked"
        );

        Ok(CheckIn {
            record,
            confidence: verification.confidence,
        })
    }

    #[instrument(name = "mark_checkout", skip(self))]
    pub async fn mark_checkout(&self, employee_id: &str) -> Result<CheckOut, AppError> {
        let employee_id = validate_object_id(employee_id, EMPLOYEE_ID)?;
        let employee_id = employee_id.as_str();

        let now = self.clock.now();
        let today = format_date(&now);

        let record = self
            .store
            .find_by_date(employee_id, &today)
            .await?
            .ok_or_else(|| AppError::NotFound("No check-in record found for today".into()))?;

        if record.is_checked_out() {
            return Err(AppError::Conflict(ALREADY_CHECKED_OUT.into()));
        }

        let check_out = now.with_timezone(&Utc);
        if check_out < record.check_in {
            warn!(
                check_in = %record.check_in,
                check_out = %check_out,
                "Check-out precedes check-in, working hours clamped to 0"
            );
        }
        let working_hours = calculate_working_hours(&record.check_in, &check_out);

        if !self
            .store
            .record_checkout(&record.id, check_out, working_hours)
            .await?
        {
            return Err(AppError::Conflict(ALREADY_CHECKED_OUT.into()));
        }

        info!(date = %today, time = %format_time(&now), working_hours, "Checked out");
        Ok(CheckOut {
            check_out,
            working_hours,
        })
    }

    pub async fn today(&self, employee_id: &str) -> Result<Option<Attendance>, AppError> {
        let employee_id = validate_object_id(employee_id, EMPLOYEE_ID)?;
        let employee_id = employee_id.as_str();

        let today = format_date(&self.clock.now());
        Ok(self.store.find_by_date(employee_id, &today).await?)
    }

    pub async fn history(
        &self,
        employee_id: &str,
        month: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<History, AppError> {
        let employee_id = validate_object_id(employee_id, EMPLOYEE_ID)?;
        let employee_id = employee_id.as_str();

        let month = month.map(str::trim).filter(|m| !m.is_empty());
        if let Some(m) = month {
            parse_month(m).ok_or_else(invalid_month)?;
        }

        let filter = HistoryFilter {
            employee_id: employee_id.to_string(),
            month: month.map(str::to_string),
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        };

        let page = self.store.history(&filter).await?;

        Ok(History {
            records: page.records,
            pagination: Pagination {
                total: page.total,
                page: filter.page,
                limit: filter.limit,
                total_pages: page.total.div_ceil(u64::from(filter.limit)),
            },
        })
    }

    /// Present/late counts, hours and absences for a month (defaults to the current one).
    pub async fn monthly_summary(
        &self,
        employee_id: &str,
        month: Option<&str>,
    ) -> Result<MonthlySummary, AppError> {
        let employee_id = validate_object_id(employee_id, EMPLOYEE_ID)?;
        let employee_id = employee_id.as_str();

        let today = self.clock.now().date_naive();
        let first_day = match month.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => parse_month(m).ok_or_else(invalid_month)?,
            None => today.with_day(1).unwrap_or(today),
        };
        let month = first_day.format("%Y-%m").to_string();

        let records = self.store.list_month(employee_id, &month).await?;

        let count = |status: AttendanceStatus| records.iter().filter(|r| r.status == status).count() as u32;
        let present = count(AttendanceStatus::Present);
        let late = count(AttendanceStatus::Late);
        let recorded_days = records.len() as u32;

        let total_hours: f64 = records.iter().map(|r| r.working_hours).sum();
        let (average_hours, punctuality) = if recorded_days == 0 {
            (0.0, 0)
        } else {
            (
                total_hours / f64::from(recorded_days),
                (f64::from(present) / f64::from(recorded_days) * 100.0).round() as u32,
            )
        };

        let recorded: HashSet<&str> = records.iter().map(|r| r.date.as_str()).collect();
        let absent = (1..=days_in_month(first_day.year(), first_day.month()))
            .filter_map(|day| NaiveDate::from_ymd_opt(first_day.year(), first_day.month(), day))
            .filter(|date| *date <= today && !is_weekend(*date))
            .filter(|date| !recorded.contains(date.format("%Y-%m-%d").to_string().as_str()))
            .count() as u32;

        Ok(MonthlySummary {
            month,
            present,
            late,
            absent,
            recorded_days,
            total_hours: round2(total_hours),
            average_hours: round2(average_hours),
            punctuality,
        })
    }
}

fn invalid_month() -> AppError {
    AppError::Validation("Invalid month format. Expected YYYY-MM".into())
}
