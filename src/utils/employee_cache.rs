use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::model::employee::Employee;

/// Read-through copy of employee profiles, keyed by id.
///
/// Never authoritative: every successful mutation invalidates or refreshes the entry.
/// `generation` moves on every invalidation; a load that straddles one is not cached.
pub struct EmployeeCache {
    inner: Cache<String, Employee>,
    generation: AtomicU64,
}

impl EmployeeCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity) // tune based on memory
                .time_to_live(ttl)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Employee> {
        self.inner.get(id).await
    }

    pub async fn insert(&self, employee: &Employee) {
        self.inner
            .insert(employee.id.clone(), employee.clone())
            .await;
    }

    /// Read before loading from the store, then handed to [`Self::insert_loaded`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Fills the cache with a profile loaded from the store, unless an invalidation
    /// happened since `generation` was read.
    pub async fn insert_loaded(&self, employee: &Employee, generation: u64) {
        if self.generation() != generation {
            return;
        }
        self.insert(employee).await;
        // an invalidation may have landed between the check and the insert
        if self.generation() != generation {
            self.inner.invalidate(&employee.id).await;
        }
    }

    pub async fn invalidate(&self, id: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate(id).await;
    }
}
