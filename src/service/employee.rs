use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::error::AppError;
use crate::model::employee::{
    DEFAULT_ROLE, Employee, MAX_FACE_IMAGES, MIN_REGISTRATION_PHOTOS, NewEmployee, is_valid_email,
};
use crate::photo::{PhotoCategory, PhotoStorage};
use crate::store::{EmployeeStore, StoreError};
use crate::utils::email_filter::{self, EmailFilter};
use crate::utils::employee_cache::EmployeeCache;
use crate::utils::object_id::validate_object_id;

pub const EMPLOYEE_ID: &str = "Employee ID";

/// Employee registration, profile lookup and reference photo management.
pub struct EmployeeService {
    store: Arc<dyn EmployeeStore>,
    photos: Arc<dyn PhotoStorage>,
    cache: EmployeeCache,
    email_filter: EmailFilter,
}

impl EmployeeService {
    pub fn new(
        store: Arc<dyn EmployeeStore>,
        photos: Arc<dyn PhotoStorage>,
        cache_capacity: u64,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            photos,
            cache: EmployeeCache::new(cache_capacity, cache_ttl),
            email_filter: EmailFilter::default(),
        }
    }

    pub async fn warmup_email_filter(&self, batch_size: usize) -> anyhow::Result<usize> {
        self.email_filter
            .warmup(self.store.as_ref(), batch_size)
            .await
    }

    /// true  => email AVAILABLE
    /// false => email TAKEN
    async fn is_email_available(&self, email: &str) -> Result<bool, AppError> {
        // filter says no: definitely unused
        if !self.email_filter.might_exist(email) {
            return Ok(true);
        }

        Ok(self.store.find_by_email(email).await?.is_none())
    }

    #[instrument(name = "create_employee", skip(self, name, email, role), fields(email = %email))]
    pub async fn create_employee(
        &self,
        name: &str,
        email: &str,
        role: Option<&str>,
    ) -> Result<Employee, AppError> {
        let name = name.trim();
        let email = email_filter::normalize(email);

        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation("Name and email are required".into()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Please enter a valid email".into()));
        }

        const DUPLICATE: &str = "Employee with this email already exists";

        if !self.is_email_available(&email).await? {
            info!("Email already registered");
            return Err(AppError::Conflict(DUPLICATE.into()));
        }

        let role = role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE);

        let employee = self
            .store
            .create(NewEmployee {
                name: name.to_string(),
                email: email.clone(),
                role: role.to_string(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => AppError::Conflict(DUPLICATE.into()),
                other => other.into(),
            })?;

        self.email_filter.insert(&email);
        self.cache.insert(&employee).await;

        info!(employee_id = %employee.id, "Employee created");
        Ok(employee)
    }

    /// Read-through lookup; a miss falls back to the store and fills the cache.
    pub async fn get_employee(&self, id: &str) -> Result<Employee, AppError> {
        let id = validate_object_id(id, EMPLOYEE_ID)?;

        if let Some(employee) = self.cache.get(&id).await {
            debug!(employee_id = %id, "Employee cache hit");
            return Ok(employee);
        }

        let generation = self.cache.generation();
        let employee = self
            .store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("Employee not found".into()))?;

        self.cache.insert_loaded(&employee, generation).await;
        Ok(employee)
    }

    /// Uploads 3 to 5 photos and makes them the employee's reference set.
    #[instrument(name = "register_photos", skip(self, photos), fields(count = photos.len()))]
    pub async fn register_photos(&self, id: &str, photos: &[String]) -> Result<Vec<String>, AppError> {
        let id = validate_object_id(id, EMPLOYEE_ID)?;
        let id = id.as_str();

        if !(MIN_REGISTRATION_PHOTOS..=MAX_FACE_IMAGES).contains(&photos.len()) {
            return Err(AppError::Validation(format!(
                "Please provide {MIN_REGISTRATION_PHOTOS}-{MAX_FACE_IMAGES} photos"
            )));
        }
        if photos.iter().any(|photo| photo.trim().is_empty()) {
            return Err(AppError::Validation("Photo is required".into()));
        }

        let employee = self.get_employee(id).await?;

        let uploads = join_all(
            photos
                .iter()
                .map(|photo| self.photos.upload(photo, id, PhotoCategory::Registration)),
        )
        .await;

        let mut urls = Vec::with_capacity(uploads.len());
        let mut first_error = None;
        for upload in uploads {
            match upload {
                Ok(url) => urls.push(url),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }

        if let Some(e) = first_error {
            // keep storage clean when only part of the set made it
            self.delete_best_effort(&urls).await;
            return Err(e.into());
        }

        let updated = match self.store.replace_photos(id, &urls).await {
            Ok(updated) => updated,
            Err(e) => {
                self.delete_best_effort(&urls).await;
                return Err(e.into());
            }
        };
        self.cache.invalidate(id).await;

        let replaced: Vec<String> = employee
            .face_images
            .into_iter()
            .filter(|old| !updated.face_images.contains(old))
            .collect();
        self.delete_best_effort(&replaced).await;

        info!(employee_id = id, photos = updated.face_images.len(), "Reference photos registered");
        Ok(updated.face_images)
    }

    #[instrument(name = "remove_photo", skip(self))]
    pub async fn remove_photo(&self, id: &str, photo_url: &str) -> Result<Vec<String>, AppError> {
        let id = validate_object_id(id, EMPLOYEE_ID)?;
        let id = id.as_str();

        if photo_url.trim().is_empty() {
            return Err(AppError::Validation("Photo URL is required".into()));
        }

        let employee = self.get_employee(id).await?;

        if !employee.face_images.iter().any(|url| url == photo_url) {
            return Ok(employee.face_images);
        }

        let remaining: Vec<String> = employee
            .face_images
            .into_iter()
            .filter(|url| url != photo_url)
            .collect();

        let updated = self.store.replace_photos(id, &remaining).await?;
        self.cache.invalidate(id).await;
        self.delete_best_effort(&[photo_url.to_string()]).await;

        info!(employee_id = id, remaining = updated.face_images.len(), "Reference photo removed");
        Ok(updated.face_images)
    }

    async fn delete_best_effort(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.photos.delete(url).await {
                warn!(error = %e, url = %url, "Failed to delete photo from storage");
            }
        }
    }
}
