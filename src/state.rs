use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::config::{Config, PhotoBackend, StorageBackend};
use crate::db::init_db;
use crate::photo::PhotoStorage;
use crate::photo::cloudinary::CloudinaryStorage;
use crate::photo::memory::InMemoryPhotoStorage;
use crate::service::attendance::AttendanceService;
use crate::service::employee::EmployeeService;
use crate::store::memory::{InMemoryAttendanceStore, InMemoryEmployeeStore};
use crate::store::mysql::{MySqlAttendanceStore, MySqlEmployeeStore};
use crate::store::{AttendanceStore, EmployeeStore};
use crate::utils::time::SystemClock;
use crate::verification::SimulatedVerifier;

/// Services shared by every worker; cloned per worker as `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub attendance: Arc<AttendanceService>,
    pub employees: Arc<EmployeeService>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (attendance_store, employee_store): (Arc<dyn AttendanceStore>, Arc<dyn EmployeeStore>) =
            match config.storage_backend {
                StorageBackend::MySql => {
                    let url = config
                        .database_url
                        .as_deref()
                        .context("DATABASE_URL is not set")?;
                    let pool = init_db(url, config.database_max_connections).await?;
                    (
                        Arc::new(MySqlAttendanceStore::new(pool.clone())),
                        Arc::new(MySqlEmployeeStore::new(pool)),
                    )
                }
                StorageBackend::Memory => {
                    warn!("Using in-memory storage, data is lost on restart");
                    (
                        Arc::new(InMemoryAttendanceStore::new()),
                        Arc::new(InMemoryEmployeeStore::new()),
                    )
                }
            };

        let photos: Arc<dyn PhotoStorage> = match config.photo_backend {
            PhotoBackend::Cloudinary => Arc::new(CloudinaryStorage::new(config.cloudinary.clone())),
            PhotoBackend::Memory => Arc::new(InMemoryPhotoStorage::new()),
        };

        info!(
            storage = %config.storage_backend,
            photos = %config.photo_backend,
            "Backends selected"
        );

        Ok(Self::assemble(employee_store, attendance_store, photos, config))
    }

    fn assemble(
        employee_store: Arc<dyn EmployeeStore>,
        attendance_store: Arc<dyn AttendanceStore>,
        photos: Arc<dyn PhotoStorage>,
        config: &Config,
    ) -> Self {
        let employees = Arc::new(EmployeeService::new(
            employee_store,
            photos.clone(),
            config.employee_cache_capacity,
            Duration::from_secs(config.employee_cache_ttl_secs),
        ));

        let attendance = Arc::new(AttendanceService::new(
            employees.clone(),
            attendance_store,
            Arc::new(SimulatedVerifier),
            photos,
            Arc::new(SystemClock),
        ));

        Self {
            attendance,
            employees,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory state driven by the given verifier and clock.
    pub fn for_tests(
        verifier: Arc<dyn crate::verification::FaceVerifier>,
        clock: Arc<dyn crate::utils::time::Clock>,
    ) -> Self {
        let photos = Arc::new(InMemoryPhotoStorage::new());
        let employees = Arc::new(crate::service::employee::testing::in_memory(photos.clone()));

        let attendance = Arc::new(AttendanceService::new(
            employees.clone(),
            Arc::new(InMemoryAttendanceStore::new()),
            verifier,
            photos,
            clock,
        ));

        Self {
            attendance,
            employees,
        }
    }
}
