use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream, stream::BoxStream};
use tokio::sync::RwLock;

use super::{AttendanceStore, EmployeeStore, StoreError};
use crate::model::attendance::{Attendance, AttendancePage, HistoryFilter, NewAttendance};
use crate::model::employee::{Employee, MAX_FACE_IMAGES, NewEmployee};
use crate::utils::object_id;

/// Records keyed by (employee id, date); the key is the uniqueness constraint.
#[derive(Default)]
pub struct InMemoryAttendanceStore {
    records: RwLock<HashMap<(String, String), Attendance>>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_desc(mut records: Vec<Attendance>) -> Vec<Attendance> {
        records.sort_by(|a, b| b.date.cmp(&a.date));
        records
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn create(&self, new: NewAttendance) -> Result<Attendance, StoreError> {
        let mut records = self.records.write().await;
        let key = (new.employee_id.clone(), new.date.clone());

        if records.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }

        let record = Attendance {
            id: object_id::generate(),
            employee_id: new.employee_id,
            date: new.date,
            check_in: new.check_in,
            check_out: None,
            working_hours: 0.0,
            status: new.status,
            attendance_photo: new.attendance_photo,
            created_at: Utc::now(),
        };
        records.insert(key, record.clone());
        Ok(record)
    }

    async fn find_by_date(&self, employee_id: &str, date: &str) -> Result<Option<Attendance>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(&(employee_id.to_string(), date.to_string()))
            .cloned())
    }

    async fn record_checkout(
        &self,
        id: &str,
        check_out: DateTime<Utc>,
        working_hours: f64,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;

        match records
            .values_mut()
            .find(|r| r.id == id && r.check_out.is_none())
        {
            Some(record) => {
                record.check_out = Some(check_out);
                record.working_hours = working_hours;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn history(&self, filter: &HistoryFilter) -> Result<AttendancePage, StoreError> {
        let records = self.records.read().await;

        let matching: Vec<Attendance> = records
            .values()
            .filter(|r| r.employee_id == filter.employee_id)
            .filter(|r| {
                filter
                    .month
                    .as_deref()
                    .is_none_or(|month| r.date.starts_with(month))
            })
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let records = Self::sorted_desc(matching)
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();

        Ok(AttendancePage { records, total })
    }

    async fn list_month(&self, employee_id: &str, month: &str) -> Result<Vec<Attendance>, StoreError> {
        let records = self.records.read().await;

        Ok(Self::sorted_desc(
            records
                .values()
                .filter(|r| r.employee_id == employee_id && r.date.starts_with(month))
                .cloned()
                .collect(),
        ))
    }
}

#[derive(Default)]
pub struct InMemoryEmployeeStore {
    employees: RwLock<HashMap<String, Employee>>,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    async fn create(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let mut employees = self.employees.write().await;

        if employees.values().any(|e| e.email == new.email) {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let employee = Employee {
            id: object_id::generate(),
            name: new.name,
            email: new.email,
            role: new.role,
            face_images: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        employees.insert(employee.id.clone(), employee.clone());
        Ok(employee)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self.employees.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .employees
            .read()
            .await
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn replace_photos(&self, id: &str, photos: &[String]) -> Result<Employee, StoreError> {
        if photos.len() > MAX_FACE_IMAGES {
            return Err(StoreError::CapacityExceeded { max: MAX_FACE_IMAGES });
        }

        let mut employees = self.employees.write().await;
        let employee = employees.get_mut(id).ok_or(StoreError::NotFound)?;
        employee.face_images = photos.to_vec();
        employee.updated_at = Utc::now();
        Ok(employee.clone())
    }

    fn emails(&self) -> BoxStream<'_, Result<String, StoreError>> {
        stream::once(async move {
            let emails: Vec<_> = self
                .employees
                .read()
                .await
                .values()
                .map(|e| Ok(e.email.clone()))
                .collect();
            stream::iter(emails)
        })
        .flatten()
        .boxed()
    }
}
