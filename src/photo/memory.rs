use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PhotoCategory, PhotoStorage, PhotoStorageError, decode_image};

const SCHEME: &str = "memory://";

/// Keeps decoded photos in process memory. Used with `PHOTO_BACKEND=memory` and in tests.
#[derive(Default)]
pub struct InMemoryPhotoStorage {
    photos: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryPhotoStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn contains(&self, url: &str) -> bool {
        self.photos.read().await.contains_key(url)
    }

    #[cfg(test)]
    pub async fn stored_count(&self) -> usize {
        self.photos.read().await.len()
    }
}

#[async_trait]
impl PhotoStorage for InMemoryPhotoStorage {
    async fn upload(
        &self,
        photo: &str,
        owner_id: &str,
        category: PhotoCategory,
    ) -> Result<String, PhotoStorageError> {
        let bytes = decode_image(photo)?;
        let url = format!(
            "{SCHEME}employee-attendance/{owner_id}/{category}/{}",
            Uuid::new_v4().simple()
        );

        self.photos.write().await.insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete(&self, reference: &str) -> Result<(), PhotoStorageError> {
        if !reference.starts_with(SCHEME) {
            return Err(PhotoStorageError::InvalidReference(reference.to_string()));
        }

        self.photos.write().await.remove(reference);
        Ok(())
    }
}
