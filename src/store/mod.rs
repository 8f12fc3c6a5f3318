//! Persistence seams for employees and attendance records.
//!
//! Both stores enforce their invariants themselves: one attendance record per
//! (employee, date) and a unique, lowercase email per employee. Services pre-check
//! for friendlier errors, but a racing write is still rejected here as
//! [`StoreError::Duplicate`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use thiserror::Error;

use crate::model::attendance::{Attendance, AttendancePage, HistoryFilter, NewAttendance};
use crate::model::employee::{Employee, MAX_FACE_IMAGES, NewEmployee};

pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate entry")]
    Duplicate,

    #[error("record not found")]
    NotFound,

    #[error("at most {max} reference photos are allowed")]
    CapacityExceeded { max: usize },

    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate;
            }
            if db_err.is_check_violation() {
                return StoreError::CapacityExceeded { max: MAX_FACE_IMAGES };
            }
        }
        StoreError::Database(e)
    }
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the employee already has a record for the date.
    async fn create(&self, new: NewAttendance) -> Result<Attendance, StoreError>;

    async fn find_by_date(&self, employee_id: &str, date: &str) -> Result<Option<Attendance>, StoreError>;

    /// Sets check-out and working hours on a record that has no check-out yet.
    /// Returns `false` when no open record with that id exists.
    async fn record_checkout(
        &self,
        id: &str,
        check_out: DateTime<Utc>,
        working_hours: f64,
    ) -> Result<bool, StoreError>;

    /// Date-descending page plus the total number of matching records.
    async fn history(&self, filter: &HistoryFilter) -> Result<AttendancePage, StoreError>;

    async fn list_month(&self, employee_id: &str, month: &str) -> Result<Vec<Attendance>, StoreError>;
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn create(&self, new: NewEmployee) -> Result<Employee, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Employee>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, StoreError>;

    /// Replaces the reference photo list as a whole.
    async fn replace_photos(&self, id: &str, photos: &[String]) -> Result<Employee, StoreError>;

    /// Every stored email, for warming up the email filter.
    fn emails(&self) -> BoxStream<'_, Result<String, StoreError>>;
}
