use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum AttendanceStatus {
    Present,
    Late,
    /// Only ever derived for days without a record; never written at check-in.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": "65a1b2c3d4e5f6a7b8c9d0e1",
        "employeeId": "65a1b2c3d4e5f6a7b8c9d0aa",
        "date": "2026-01-15",
        "checkIn": "2026-01-15T03:25:10Z",
        "checkOut": null,
        "workingHours": 0.0,
        "status": "Present",
        "attendancePhoto": "https://res.cloudinary.com/demo/image/upload/v1/employee-attendance/65a1b2c3d4e5f6a7b8c9d0aa/attendance/a1.jpg",
        "createdAt": "2026-01-15T03:25:11Z"
    })
)]
pub struct Attendance {
    pub id: String,
    pub employee_id: String,
    /// `YYYY-MM-DD`, at most one record per employee and date
    pub date: String,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    /// 0 until check-out, then frozen
    pub working_hours: f64,
    pub status: AttendanceStatus,
    pub attendance_photo: String,
    pub created_at: DateTime<Utc>,
}

impl Attendance {
    pub fn is_checked_out(&self) -> bool {
        self.check_out.is_some()
    }
}

/// Fields fixed at check-in; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub employee_id: String,
    pub date: String,
    pub check_in: DateTime<Utc>,
    pub status: AttendanceStatus,
    pub attendance_photo: String,
}

#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub employee_id: String,
    /// `YYYY-MM` prefix matched against the date key
    pub month: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl HistoryFilter {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone)]
pub struct AttendancePage {
    pub records: Vec<Attendance>,
    pub total: u64,
}
