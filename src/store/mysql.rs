use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use sqlx::{FromRow, MySqlPool};
use tracing::debug;

use super::{AttendanceStore, EmployeeStore, StoreError};
use crate::model::attendance::{
    Attendance, AttendancePage, AttendanceStatus, HistoryFilter, NewAttendance,
};
use crate::model::employee::{Employee, MAX_FACE_IMAGES, NewEmployee};
use crate::utils::object_id;

/// DATETIME(3) keeps milliseconds; values handed back to callers match what was stored.
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[derive(FromRow)]
struct AttendanceRow {
    id: String,
    employee_id: String,
    date: String,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    working_hours: f64,
    status: String,
    attendance_photo: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for Attendance {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = AttendanceStatus::from_str(&row.status)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Attendance {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            working_hours: row.working_hours,
            status,
            attendance_photo: row.attendance_photo,
            created_at: row.created_at,
        })
    }
}

const ATTENDANCE_COLUMNS: &str = "id, employee_id, date, check_in, check_out, working_hours, \
                                  status, attendance_photo, created_at";

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn create(&self, new: NewAttendance) -> Result<Attendance, StoreError> {
        let id = object_id::generate();
        let check_in = new.check_in.trunc_subsecs(3);
        let created_at = now_millis();

        sqlx::query(
            r#"
            INSERT INTO attendance
                (id, employee_id, date, check_in, working_hours, status, attendance_photo, created_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.employee_id)
        .bind(&new.date)
        .bind(check_in)
        .bind(new.status.as_ref())
        .bind(&new.attendance_photo)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Attendance {
            id,
            employee_id: new.employee_id,
            date: new.date,
            check_in,
            check_out: None,
            working_hours: 0.0,
            status: new.status,
            attendance_photo: new.attendance_photo,
            created_at,
        })
    }

    async fn find_by_date(&self, employee_id: &str, date: &str) -> Result<Option<Attendance>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date = ?",
            ATTENDANCE_COLUMNS
        );

        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(Attendance::try_from)
            .transpose()
    }

    async fn record_checkout(
        &self,
        id: &str,
        check_out: DateTime<Utc>,
        working_hours: f64,
    ) -> Result<bool, StoreError> {
        // both fields in one statement; the IS NULL guard makes a second checkout a no-op
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, working_hours = ?
            WHERE id = ?
            AND check_out IS NULL
            "#,
        )
        .bind(check_out.trunc_subsecs(3))
        .bind(working_hours)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn history(&self, filter: &HistoryFilter) -> Result<AttendancePage, StoreError> {
        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE employee_id = ?");
        if filter.month.is_some() {
            where_sql.push_str(" AND date LIKE CONCAT(?, '%')");
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM attendance{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql).bind(&filter.employee_id);
        if let Some(month) = &filter.month {
            count_q = count_q.bind(month);
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {} FROM attendance{} ORDER BY date DESC LIMIT ? OFFSET ?",
            ATTENDANCE_COLUMNS, where_sql
        );
        debug!(sql = %data_sql, page = filter.page, limit = filter.limit, "Fetching attendance history");

        let mut data_q = sqlx::query_as::<_, AttendanceRow>(&data_sql).bind(&filter.employee_id);
        if let Some(month) = &filter.month {
            data_q = data_q.bind(month);
        }
        let rows = data_q
            .bind(i64::from(filter.limit))
            .bind(filter.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(Attendance::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AttendancePage {
            records,
            total: total.max(0) as u64,
        })
    }

    async fn list_month(&self, employee_id: &str, month: &str) -> Result<Vec<Attendance>, StoreError> {
        let sql = format!(
            "SELECT {} FROM attendance WHERE employee_id = ? AND date LIKE CONCAT(?, '%') ORDER BY date DESC",
            ATTENDANCE_COLUMNS
        );

        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(month)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Attendance::try_from)
            .collect()
    }
}

#[derive(FromRow)]
struct EmployeeRow {
    id: String,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EmployeeRow {
    fn with_photos(self, face_images: Vec<String>) -> Employee {
        Employee {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            face_images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct MySqlEmployeeStore {
    pool: MySqlPool,
}

impl MySqlEmployeeStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn photos_of(&self, employee_id: &str) -> Result<Vec<String>, StoreError> {
        let urls = sqlx::query_scalar::<_, String>(
            "SELECT url FROM employee_photos WHERE employee_id = ? ORDER BY position",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(urls)
    }

    async fn hydrate(&self, row: Option<EmployeeRow>) -> Result<Option<Employee>, StoreError> {
        match row {
            Some(row) => {
                let photos = self.photos_of(&row.id).await?;
                Ok(Some(row.with_photos(photos)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl EmployeeStore for MySqlEmployeeStore {
    async fn create(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let id = object_id::generate();
        let now = now_millis();

        sqlx::query(
            r#"
            INSERT INTO employees (id, name, email, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.role)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Employee {
            id,
            name: new.name,
            email: new.email,
            role: new.role,
            face_images: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Employee>, StoreError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, email, role, created_at, updated_at FROM employees WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate(row).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, StoreError> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            "SELECT id, name, email, role, created_at, updated_at FROM employees WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate(row).await
    }

    async fn replace_photos(&self, id: &str, photos: &[String]) -> Result<Employee, StoreError> {
        if photos.len() > MAX_FACE_IMAGES {
            return Err(StoreError::CapacityExceeded { max: MAX_FACE_IMAGES });
        }

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, String>("SELECT id FROM employees WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM employee_photos WHERE employee_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for (position, url) in photos.iter().enumerate() {
            sqlx::query("INSERT INTO employee_photos (employee_id, position, url) VALUES (?, ?, ?)")
                .bind(id)
                .bind(position as u8)
                .bind(url)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE employees SET updated_at = ? WHERE id = ?")
            .bind(now_millis())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.find_by_id(id).await?.ok_or(StoreError::NotFound)
    }

    fn emails(&self) -> BoxStream<'_, Result<String, StoreError>> {
        sqlx::query_scalar::<_, String>("SELECT email FROM employees")
            .fetch(&self.pool)
            .map_err(StoreError::from)
            .boxed()
    }
}
